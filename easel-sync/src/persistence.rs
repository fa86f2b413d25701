//! Persistence API and its implementations.
//!
//! The editor only needs `save`, `load`, `list` and `delete`. Storage internals
//! live behind the trait; [`HttpPersistence`] talks JSON to a remote store and
//! [`MemoryPersistence`] keeps documents in-process with failure injection for
//! tests and dry runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use easel_core::{Document, DocumentId};

use crate::error::PersistenceError;

/// Request timeout for the HTTP client.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Acknowledgement of a successful save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveReceipt {
    /// Version the server now holds.
    pub version: u64,
}

/// Listing entry for a stored document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    /// Document id.
    pub id: String,
    /// Title.
    pub title: String,
    /// Stored version.
    pub version: u64,
}

impl DocumentSummary {
    fn of(doc: &Document) -> Self {
        Self {
            id: doc.id.to_string(),
            title: doc.metadata.title.clone(),
            version: doc.version(),
        }
    }
}

/// Body of a 409 response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConflictBody {
    remote_version: u64,
}

/// External document store.
#[async_trait]
pub trait PersistenceApi: Send + Sync {
    /// Store `doc` under its id. The payload carries the document version.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Conflict`] if the store holds a newer
    /// version, or a transport error.
    async fn save(&self, doc: &Document) -> Result<SaveReceipt, PersistenceError>;

    /// Fetch a stored document.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::NotFound`] for unknown ids.
    async fn load(&self, id: &DocumentId) -> Result<Document, PersistenceError>;

    /// List stored documents.
    ///
    /// # Errors
    ///
    /// Returns a transport error.
    async fn list(&self) -> Result<Vec<DocumentSummary>, PersistenceError>;

    /// Delete a stored document.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::NotFound`] for unknown ids.
    async fn delete(&self, id: &DocumentId) -> Result<(), PersistenceError>;
}

/// JSON client for a remote document store.
///
/// Routes: `POST/GET/DELETE {base}/documents/{id}` and `GET {base}/documents`.
/// A 409 answer to a save carries `{"remoteVersion": n}`.
#[derive(Debug, Clone)]
pub struct HttpPersistence {
    http: Client,
    base: Url,
}

impl HttpPersistence {
    /// Create a client for `base`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::InvalidUrl`] if `base` does not parse, or
    /// [`PersistenceError::Http`] if the client cannot be built.
    pub fn new(base: &str) -> Result<Self, PersistenceError> {
        let mut base = Url::parse(base).map_err(|e| PersistenceError::InvalidUrl(e.to_string()))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { http, base })
    }

    /// Base URL.
    #[must_use]
    pub fn base(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, PersistenceError> {
        self.base
            .join(path)
            .map_err(|e| PersistenceError::InvalidUrl(e.to_string()))
    }

    /// The id is pushed as one encoded path segment.
    fn document_url(&self, id: &DocumentId) -> Result<Url, PersistenceError> {
        let mut url = self.endpoint("documents")?;
        url.path_segments_mut()
            .map_err(|()| PersistenceError::InvalidUrl("base URL has no path".to_string()))?
            .push(id.as_str());
        Ok(url)
    }

    async fn unexpected(response: reqwest::Response) -> PersistenceError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        PersistenceError::Status { status, body }
    }
}

#[async_trait]
impl PersistenceApi for HttpPersistence {
    async fn save(&self, doc: &Document) -> Result<SaveReceipt, PersistenceError> {
        let url = self.document_url(&doc.id)?;
        tracing::debug!(%url, version = doc.version(), "Saving document");
        let response = self.http.post(url).json(doc).send().await?;
        match response.status() {
            status if status.is_success() => Ok(response.json().await?),
            StatusCode::CONFLICT => {
                let body: ConflictBody = response.json().await?;
                Err(PersistenceError::Conflict {
                    local_version: doc.version(),
                    remote_version: body.remote_version,
                })
            }
            _ => Err(Self::unexpected(response).await),
        }
    }

    async fn load(&self, id: &DocumentId) -> Result<Document, PersistenceError> {
        let response = self.http.get(self.document_url(id)?).send().await?;
        match response.status() {
            status if status.is_success() => Ok(response.json().await?),
            StatusCode::NOT_FOUND => Err(PersistenceError::NotFound(id.to_string())),
            _ => Err(Self::unexpected(response).await),
        }
    }

    async fn list(&self) -> Result<Vec<DocumentSummary>, PersistenceError> {
        let response = self.http.get(self.endpoint("documents")?).send().await?;
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(Self::unexpected(response).await)
        }
    }

    async fn delete(&self, id: &DocumentId) -> Result<(), PersistenceError> {
        let response = self.http.delete(self.document_url(id)?).send().await?;
        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(PersistenceError::NotFound(id.to_string())),
            _ => Err(Self::unexpected(response).await),
        }
    }
}

/// In-process store.
///
/// A save carrying a version older than the stored one is a conflict.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    documents: Mutex<HashMap<DocumentId, Document>>,
    saved_versions: Mutex<Vec<u64>>,
    failures: AtomicU32,
    latency: Mutex<Duration>,
}

impl MemoryPersistence {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` saves fail with a transient network error.
    pub fn fail_next(&self, count: u32) {
        self.failures.store(count, Ordering::SeqCst);
    }

    /// Delay every save by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap_or_else(PoisonError::into_inner) = latency;
    }

    /// Put a document straight into the store, bypassing conflict checks.
    pub fn insert(&self, doc: Document) {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(doc.id.clone(), doc);
    }

    /// Versions of every successful save, in completion order.
    #[must_use]
    pub fn saved_versions(&self) -> Vec<u64> {
        self.saved_versions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of successful saves.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saved_versions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn take_failure(&self) -> bool {
        self.failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl PersistenceApi for MemoryPersistence {
    async fn save(&self, doc: &Document) -> Result<SaveReceipt, PersistenceError> {
        let latency = *self.latency.lock().unwrap_or_else(PoisonError::into_inner);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if self.take_failure() {
            return Err(PersistenceError::Network("injected failure".to_string()));
        }
        let mut documents = self.documents.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(stored) = documents.get(&doc.id) {
            if stored.version() > doc.version() {
                return Err(PersistenceError::Conflict {
                    local_version: doc.version(),
                    remote_version: stored.version(),
                });
            }
        }
        documents.insert(doc.id.clone(), doc.clone());
        self.saved_versions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(doc.version());
        Ok(SaveReceipt {
            version: doc.version(),
        })
    }

    async fn load(&self, id: &DocumentId) -> Result<Document, PersistenceError> {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .ok_or_else(|| PersistenceError::NotFound(id.to_string()))
    }

    async fn list(&self) -> Result<Vec<DocumentSummary>, PersistenceError> {
        let documents = self.documents.lock().unwrap_or_else(PoisonError::into_inner);
        let mut summaries: Vec<DocumentSummary> =
            documents.values().map(DocumentSummary::of).collect();
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(summaries)
    }

    async fn delete(&self, id: &DocumentId) -> Result<(), PersistenceError> {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| PersistenceError::NotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_round_trip_and_list() {
        let store = MemoryPersistence::new();
        let doc = Document::new("Stored").with_id("d1");
        store.save(&doc).await.expect("save");
        let loaded = store.load(&"d1".into()).await.expect("load");
        assert_eq!(loaded, doc);
        let listed = store.list().await.expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "Stored");
        store.delete(&"d1".into()).await.expect("delete");
        assert!(matches!(
            store.load(&"d1".into()).await,
            Err(PersistenceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_memory_injected_failures_are_transient() {
        let store = MemoryPersistence::new();
        store.fail_next(2);
        let doc = Document::new("Flaky");
        assert!(store.save(&doc).await.is_err());
        assert!(store.save(&doc).await.is_err());
        assert!(store.save(&doc).await.is_ok());
        assert_eq!(store.save_count(), 1);
    }

    #[test]
    fn test_http_base_gets_trailing_slash() {
        let client = HttpPersistence::new("http://localhost:9000/api").expect("client");
        assert_eq!(client.base().as_str(), "http://localhost:9000/api/");
        let url = client.document_url(&"d1".into()).expect("url");
        assert_eq!(url.as_str(), "http://localhost:9000/api/documents/d1");
    }

    #[test]
    fn test_http_document_id_is_one_segment() {
        let client = HttpPersistence::new("http://localhost:9000/api/").expect("client");
        let url = client.document_url(&"a/b?c".into()).expect("url");
        assert_eq!(url.as_str(), "http://localhost:9000/api/documents/a%2Fb%3Fc");
        assert_eq!(url.query(), None);
    }

    #[test]
    fn test_http_rejects_invalid_url() {
        assert!(matches!(
            HttpPersistence::new("not a url"),
            Err(PersistenceError::InvalidUrl(_))
        ));
    }
}
