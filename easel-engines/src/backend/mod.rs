//! Engine implementations.
//!
//! Each backend owns a native scene type that mirrors what the real engine
//! serializes to JSON, so a host can hand the scene to the renderer as-is.

pub mod fabric;
pub mod konva;

use serde::{Deserialize, Serialize};

use easel_core::{Document, DocumentId, DocumentMetadata, DocumentMode, Page, TranslationError};

/// Document-level data carried alongside a native scene.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneHeader {
    /// Canonical document id.
    pub document_id: String,
    /// Editing mode.
    #[serde(default)]
    pub mode: DocumentMode,
    /// Brand kit reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_kit_ref: Option<String>,
    /// Title, timestamps and generator data.
    #[serde(default)]
    pub metadata: DocumentMetadata,
}

impl SceneHeader {
    pub(crate) fn from_document(doc: &Document) -> Self {
        Self {
            document_id: doc.id.to_string(),
            mode: doc.mode,
            brand_kit_ref: doc.brand_kit_ref.clone(),
            metadata: doc.metadata.clone(),
        }
    }

    /// Assemble a canonical document from translated pages.
    pub(crate) fn into_document(
        self,
        engine: &'static str,
        pages: Vec<Page>,
    ) -> Result<Document, TranslationError> {
        let mut doc = Document::from_pages(
            DocumentId::from(self.document_id),
            self.metadata.title.clone(),
            pages,
        )
        .map_err(|e| TranslationError::Malformed {
            engine,
            reason: e.to_string(),
        })?;
        doc.mode = self.mode;
        doc.brand_kit_ref = self.brand_kit_ref;
        doc.metadata = self.metadata;
        Ok(doc)
    }
}

/// Log a node or field that could not be translated.
pub(crate) fn log_dropped(error: &TranslationError) {
    tracing::warn!(%error, "Dropped during translation");
}
