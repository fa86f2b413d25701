//! # Easel Engines
//!
//! Concrete rendering engine adapters for the Easel editing core.
//!
//! ## Engines
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              AdapterRegistry                │
//! ├──────────────┬──────────────┬───────────────┤
//! │ fabric       │ konva        │ headless      │
//! │ (flat list,  │ (stage tree, │ (canonical    │
//! │  lossless)   │  no bindings)│  document)    │
//! └──────────────┴──────────────┴───────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;

pub use backend::fabric::{FabricEngine, FabricProject};
pub use backend::konva::{KonvaEngine, KonvaStage};
pub use backend::SceneHeader;

use easel_core::{AdapterRegistry, HeadlessEngine, SceneAdapter};

/// Engine used when none is configured or the configured one is unknown.
pub const DEFAULT_ENGINE: &str = "fabric";

/// Registry with every built-in engine.
#[must_use]
pub fn default_registry() -> AdapterRegistry {
    let mut registry = AdapterRegistry::new();
    registry.register_engine("fabric", FabricEngine::new);
    registry.register_engine("konva", KonvaEngine::new);
    registry.register_engine("headless", HeadlessEngine::default);
    registry
}

/// Create the adapter for `name`, falling back to [`DEFAULT_ENGINE`].
#[must_use]
pub fn create_adapter(registry: &AdapterRegistry, name: &str) -> Box<dyn SceneAdapter> {
    match registry.create(name) {
        Ok(adapter) => adapter,
        Err(e) => {
            tracing::warn!("Engine unavailable, falling back to {DEFAULT_ENGINE}: {e}");
            Box::new(easel_core::EngineAdapter::new(FabricEngine::new()))
        }
    }
}
