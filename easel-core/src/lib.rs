//! # Easel Core
//!
//! Engine-agnostic document editing core for visual content editors.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     EditorContext                         │
//! ├──────────────┬──────────────┬──────────────┬─────────────┤
//! │ CommandParser│   Executor   │   History    │ Reconciler  │
//! │ - rule table │ - selectors  │ - past/future│ - id diff   │
//! │ - tokens     │ - edit plans │ - inverses   │ - setters   │
//! ├──────────────┴──────┬───────┴──────────────┴─────────────┤
//! │   Document (source  │   SceneAdapter (one per engine,    │
//! │   of truth)         │   picked from AdapterRegistry)     │
//! └─────────────────────┴────────────────────────────────────┘
//! ```
//!
//! The canonical [`Document`] is always upstream of every rendering engine:
//! a command mutates the document first, the [`Reconciler`] diffs the change
//! second, and the active [`SceneAdapter`] is patched third.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Declares a string-backed identifier newtype.
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            /// Borrow the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

pub mod adapter;
pub mod command;
pub mod context;
pub mod document;
pub mod error;
pub mod event;
pub mod executor;
pub mod headless;
pub mod history;
pub mod metrics;
pub mod object;
pub mod parser;
pub mod reconcile;

pub use adapter::{
    AdapterFactory, AdapterRegistry, AdapterStats, Engine, EngineAdapter, Field, PatchOp,
    SceneAdapter, ScenePatch,
};
pub use command::{Action, Command, Direction, Selector, TargetPolicy};
pub use context::{ChangeCause, CommandReceipt, EditorConfig, EditorContext, PendingAsset};
pub use document::{Document, DocumentId, DocumentMetadata, DocumentMode, Edit, Page, PageId};
pub use error::{EditorError, EditorResult, TranslationError, ValidationError};
pub use event::EngineEvent;
pub use executor::{execute, resolve, Execution};
pub use headless::HeadlessEngine;
pub use history::{History, HistoryEntry, DEFAULT_HISTORY_LIMIT};
pub use object::{
    Binding, Bounds, FontWeight, GroupProps, ImageProps, ImageStatus, Object, ObjectId,
    ObjectProps, ObjectType, ShapeKind, ShapeProps, TextAlign, TextProps,
};
pub use parser::{CommandParser, ParseContext};
pub use reconcile::{Reconciler, Reconciliation};

/// Easel core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
