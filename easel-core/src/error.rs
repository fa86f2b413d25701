//! Error types for document editing.

use thiserror::Error;

use crate::document::PageId;
use crate::object::ObjectId;

/// Result type for editor operations.
pub type EditorResult<T> = Result<T, EditorError>;

/// Errors surfaced by the editing pipeline.
#[derive(Debug, Error)]
pub enum EditorError {
    /// A document, page or object failed an invariant check.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// A command selector matched no object.
    #[error("Target not found: {0}")]
    TargetNotFound(String),

    /// The parser found no rule for the instruction.
    #[error("Unsupported command: {0}")]
    UnsupportedCommand(String),

    /// A native scene could not be translated.
    #[error("Adapter translation failed: {0}")]
    Translation(#[from] TranslationError),

    /// No adapter factory is registered under the name.
    #[error("Unknown engine '{name}' (available: {available})")]
    UnknownEngine {
        /// Requested engine name.
        name: String,
        /// Comma separated registered names.
        available: String,
    },

    /// Document serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EditorError {
    /// Whether the error means the command was rejected with the document untouched.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::TargetNotFound(_) | Self::UnsupportedCommand(_)
        )
    }
}

/// Malformed document or object construction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Bounds contain NaN or infinity.
    #[error("object {0} has non-finite bounds")]
    NonFiniteBounds(ObjectId),

    /// Bounds contain a negative component.
    #[error("object {0} has negative bounds")]
    NegativeBounds(ObjectId),

    /// An id is already used elsewhere in the document.
    #[error("duplicate object id: {0}")]
    DuplicateId(ObjectId),

    /// A page id is used twice.
    #[error("duplicate page id: {0}")]
    DuplicatePage(PageId),

    /// The referenced object does not exist.
    #[error("unknown object: {0}")]
    UnknownObject(ObjectId),

    /// The referenced page does not exist.
    #[error("unknown page: {0}")]
    UnknownPage(PageId),

    /// The object exists but is not a group.
    #[error("object {0} is not a group")]
    NotAGroup(ObjectId),

    /// A property value is out of range or not applicable.
    #[error("invalid property on {id}: {reason}")]
    InvalidProperty {
        /// Offending object.
        id: ObjectId,
        /// What was wrong.
        reason: String,
    },

    /// A page has invalid dimensions or attributes.
    #[error("invalid page {id}: {reason}")]
    InvalidPage {
        /// Offending page.
        id: PageId,
        /// What was wrong.
        reason: String,
    },

    /// A command argument is invalid regardless of target.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A document must contain at least one page.
    #[error("document has no pages")]
    NoPages,
}

/// A native structure could not be represented canonically, or vice versa.
///
/// Node-level translation errors are logged and the node or field dropped;
/// only structural errors abort a translation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TranslationError {
    /// The native node type has no canonical counterpart.
    #[error("{engine}: unsupported node type '{kind}'")]
    UnknownNode {
        /// Engine name.
        engine: &'static str,
        /// Native type string.
        kind: String,
    },

    /// A canonical field has no native counterpart.
    #[error("{engine}: field '{field}' is not supported")]
    UnsupportedField {
        /// Engine name.
        engine: &'static str,
        /// Canonical field name.
        field: &'static str,
    },

    /// A native node required by a patch is missing.
    #[error("{engine}: no native node for object {id}")]
    NodeNotFound {
        /// Engine name.
        engine: &'static str,
        /// Canonical id.
        id: ObjectId,
    },

    /// A native page/layer required by a patch is missing.
    #[error("{engine}: no native page {id}")]
    PageNotFound {
        /// Engine name.
        engine: &'static str,
        /// Canonical page id.
        id: PageId,
    },

    /// The native payload is structurally unusable.
    #[error("{engine}: malformed native data: {reason}")]
    Malformed {
        /// Engine name.
        engine: &'static str,
        /// Description.
        reason: String,
    },
}
