//! # Easel Sync
//!
//! Asynchronous collaborators of the editor core.
//!
//! - [`AutosaveHandle`]: debounced saves with retry, stale-response discard
//!   and a sticky version conflict
//! - [`PersistenceApi`]: the store behind auto-save, with an HTTP client and
//!   an in-memory implementation
//! - [`EditorSession`]: an editor context whose async work re-enters as
//!   commands

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod autosave;
pub mod error;
pub mod metrics;
pub mod persistence;
pub mod session;

pub use autosave::{
    AutosaveConfig, AutosaveHandle, AutosaveNotifier, AutosaveState, AutosaveStatus, RetryConfig,
    DEFAULT_DEBOUNCE,
};
pub use error::{AssetError, PersistenceError};
pub use persistence::{
    DocumentSummary, HttpPersistence, MemoryPersistence, PersistenceApi, SaveReceipt,
};
pub use session::{AssetResolver, EditorSession, UrlPrefixResolver};
