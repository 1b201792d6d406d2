//! Database handle for cloud-billing: a document store plus the writer lock.

use crate::error::BillingError;
use crate::models::Document;
use crate::services::metrics::{record_error, STORE_OPERATION_DURATION};
use crate::services::store::{DocumentStore, FileDocumentStore};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, instrument};

/// Shared access to the billing document.
///
/// Every mutation runs load -> mutate -> save while holding a single
/// process-wide writer lock, so concurrent writers cannot lose each other's
/// changes. Reads take no lock and see the last saved document.
#[derive(Clone)]
pub struct Database {
    store: Arc<dyn DocumentStore>,
    writer: Arc<Mutex<()>>,
}

impl Database {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            writer: Arc::new(Mutex::new(())),
        }
    }

    /// Open a JSON document on disk.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        info!(path = %path.display(), "Opening billing document");
        Self::new(Arc::new(FileDocumentStore::new(path)))
    }

    /// Persist the skeleton on first use. Goes through the writer lock so it
    /// cannot overwrite a concurrent writer's save.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<(), BillingError> {
        self.write("initialize", |_| Ok(())).await
    }

    /// Check that the document can be loaded and parsed.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), BillingError> {
        self.read("health_check").await.map(|_| ())
    }

    /// Load the current document.
    #[instrument(skip(self))]
    pub async fn read(&self, operation: &'static str) -> Result<Document, BillingError> {
        let timer = STORE_OPERATION_DURATION
            .with_label_values(&[operation])
            .start_timer();

        let document = self.store.load().await.inspect_err(|e| {
            record_error(e.error_type(), operation);
        })?;

        timer.observe_duration();
        Ok(document)
    }

    /// Run `mutate` against a freshly loaded document and save the result.
    /// Nothing is saved when `mutate` fails.
    #[instrument(skip(self, mutate))]
    pub async fn write<T, F>(&self, operation: &'static str, mutate: F) -> Result<T, BillingError>
    where
        F: FnOnce(&mut Document) -> Result<T, BillingError> + Send,
        T: Send,
    {
        let _guard = self.writer.lock().await;
        let timer = STORE_OPERATION_DURATION
            .with_label_values(&[operation])
            .start_timer();

        let result = async {
            let mut document = self.store.load().await?;
            let output = mutate(&mut document)?;
            self.store.save(&document).await?;
            Ok::<T, BillingError>(output)
        }
        .await;

        match &result {
            Ok(_) => timer.observe_duration(),
            Err(e) => {
                timer.stop_and_discard();
                record_error(e.error_type(), operation);
            }
        }
        result
    }

    /// Replace the document with an empty skeleton.
    #[instrument(skip(self))]
    pub async fn reset(&self) -> Result<(), BillingError> {
        self.write("reset", |document| {
            *document = Document::skeleton();
            Ok(())
        })
        .await?;
        info!("Billing document reset");
        Ok(())
    }

    /// Whole document for reporting collaborators.
    pub async fn snapshot(&self) -> Result<Document, BillingError> {
        self.read("snapshot").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use crate::services::store::MemoryDocumentStore;

    fn category(id: i64) -> Category {
        Category {
            id,
            name: format!("Category {id}"),
            description: String::new(),
            workload: "batch".to_string(),
        }
    }

    #[tokio::test]
    async fn failed_mutation_is_not_saved() {
        let db = Database::new(Arc::new(MemoryDocumentStore::new()));

        let result: Result<(), BillingError> = db
            .write("test", |document| {
                document.categories.upsert(category(1));
                Err(BillingError::NotFound(anyhow::anyhow!("nope")))
            })
            .await;
        assert!(result.is_err());
        assert!(db.snapshot().await.unwrap().categories.is_empty());
    }

    #[tokio::test]
    async fn concurrent_writers_do_not_lose_updates() {
        let db = Database::new(Arc::new(MemoryDocumentStore::new()));

        let mut handles = Vec::new();
        for id in 0..20 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                db.write("test", move |document| {
                    document.categories.upsert(category(id));
                    Ok(())
                })
                .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(db.snapshot().await.unwrap().categories.len(), 20);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn first_read_does_not_clobber_concurrent_write() {
        for _ in 0..50 {
            let dir = tempfile::tempdir().unwrap();
            let db = Database::open(dir.path().join("billing.json"));

            let writer = {
                let db = db.clone();
                tokio::spawn(async move {
                    db.write("test", |document| {
                        document.categories.upsert(category(1));
                        Ok(())
                    })
                    .await
                })
            };
            let reader = {
                let db = db.clone();
                tokio::spawn(async move { db.read("test").await })
            };
            writer.await.unwrap().unwrap();
            reader.await.unwrap().unwrap();

            assert_eq!(db.snapshot().await.unwrap().categories.len(), 1);
        }
    }

    #[tokio::test]
    async fn initialize_persists_skeleton_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("billing.json");
        let db = Database::open(&path);

        db.read("test").await.unwrap();
        assert!(!path.exists());

        db.initialize().await.unwrap();
        assert!(path.exists());
        assert_eq!(db.snapshot().await.unwrap(), Document::skeleton());
    }

    #[tokio::test]
    async fn reset_clears_every_collection() {
        let db = Database::new(Arc::new(MemoryDocumentStore::new()));
        db.write("test", |document| {
            document.categories.upsert(category(1));
            document.next_invoice_id = 5;
            Ok(())
        })
        .await
        .unwrap();

        db.reset().await.unwrap();
        assert_eq!(db.snapshot().await.unwrap(), Document::skeleton());
    }
}
