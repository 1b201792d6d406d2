//! Persistence for the single billing document.

use crate::error::BillingError;
use crate::models::Document;
use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// Whole-document persistence. `save` must be all-or-nothing for readers.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read the full document. Before the first save this is an empty
    /// skeleton; `load` never writes.
    async fn load(&self) -> Result<Document, BillingError>;

    /// Replace the persisted document as a whole.
    async fn save(&self, document: &Document) -> Result<(), BillingError>;
}

/// JSON document on the local filesystem.
#[derive(Debug, Clone)]
pub struct FileDocumentStore {
    path: PathBuf,
}

impl FileDocumentStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn unavailable(&self, action: &str, err: impl std::fmt::Display) -> BillingError {
        BillingError::StoreUnavailable(anyhow::anyhow!(
            "Failed to {} {}: {}",
            action,
            self.path.display(),
            err
        ))
    }
}

#[async_trait]
impl DocumentStore for FileDocumentStore {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn load(&self) -> Result<Document, BillingError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Document not found, using empty skeleton");
                return Ok(Document::skeleton());
            }
            Err(e) => return Err(self.unavailable("read", e)),
        };

        serde_json::from_slice(&bytes).map_err(|e| {
            BillingError::StoreCorrupt(anyhow::anyhow!(
                "Document at {} is not well-formed: {}",
                self.path.display(),
                e
            ))
        })
    }

    #[instrument(skip(self, document), fields(path = %self.path.display()))]
    async fn save(&self, document: &Document) -> Result<(), BillingError> {
        let bytes = serde_json::to_vec_pretty(document).map_err(|e| {
            BillingError::StoreCorrupt(anyhow::anyhow!("Failed to serialize document: {}", e))
        })?;
        let path = self.path.clone();

        // Write beside the target and rename over it, so readers see either
        // the old document or the new one.
        let result = tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let dir = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            };
            std::fs::create_dir_all(&dir)?;
            let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
            tmp.write_all(&bytes)?;
            tmp.as_file().sync_all()?;
            tmp.persist(&path).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| self.unavailable("write", e))?;

        result.map_err(|e| self.unavailable("write", e))?;
        debug!("Document saved");
        Ok(())
    }
}

/// Document held in memory. Used by tests and embedding callers.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    document: RwLock<Option<Document>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing document.
    pub fn with_document(document: Document) -> Self {
        Self {
            document: RwLock::new(Some(document)),
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn load(&self) -> Result<Document, BillingError> {
        let mut guard = self.document.write().await;
        Ok(guard.get_or_insert_with(Document::skeleton).clone())
    }

    async fn save(&self, document: &Document) -> Result<(), BillingError> {
        *self.document.write().await = Some(document.clone());
        Ok(())
    }
}
