//! Asynchronous store boundary
//!
//! Clients never hold the `DocumentStore` directly. They go through
//! `DocumentApi`, whose calls are suspension points. `StoreHandle` is the
//! production implementation: one store behind a mutex, each call run on
//! tokio's blocking pool so SQLite I/O never stalls the runtime.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::warn;

use crate::config::Config;
use crate::models::{Document, DocumentDraft, DocumentId, OrderAssignment};
use crate::storage::{StoreError, StoreResult};
use crate::store::DocumentStore;

/// Request/response operations exposed by the document store
#[async_trait]
pub trait DocumentApi: Send + Sync {
    async fn list(&self) -> StoreResult<Vec<Document>>;

    async fn get(&self, id: DocumentId) -> StoreResult<Document>;

    async fn create(&self, draft: DocumentDraft) -> StoreResult<Document>;

    async fn update(&self, id: DocumentId, draft: DocumentDraft) -> StoreResult<Document>;

    async fn delete(&self, id: DocumentId) -> StoreResult<bool>;

    async fn reorder(&self, assignments: Vec<OrderAssignment>) -> StoreResult<()>;
}

/// Shared, cloneable handle to a single `DocumentStore`
///
/// Concurrent callers are serialised by the mutex.
#[derive(Clone)]
pub struct StoreHandle {
    inner: Arc<Mutex<DocumentStore>>,
}

impl StoreHandle {
    pub fn new(store: DocumentStore) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    /// Open the configured store and wrap it
    pub fn open(config: &Config) -> StoreResult<Self> {
        DocumentStore::open(config).map(Self::new)
    }

    async fn run<T, F>(&self, op: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut DocumentStore) -> StoreResult<T> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);

        tokio::task::spawn_blocking(move || {
            // Open transactions roll back on unwind; a poisoned store is consistent
            let mut store = inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            op(&mut store)
        })
        .await
        .map_err(|e| {
            warn!("Store task failed: {}", e);
            StoreError::TaskFailed(e.to_string())
        })?
    }
}

#[async_trait]
impl DocumentApi for StoreHandle {
    async fn list(&self) -> StoreResult<Vec<Document>> {
        self.run(|store| store.list()).await
    }

    async fn get(&self, id: DocumentId) -> StoreResult<Document> {
        self.run(move |store| store.get(id)).await
    }

    async fn create(&self, draft: DocumentDraft) -> StoreResult<Document> {
        self.run(move |store| store.create(&draft)).await
    }

    async fn update(&self, id: DocumentId, draft: DocumentDraft) -> StoreResult<Document> {
        self.run(move |store| store.update(id, &draft)).await
    }

    async fn delete(&self, id: DocumentId) -> StoreResult<bool> {
        self.run(move |store| store.delete(id)).await
    }

    async fn reorder(&self, assignments: Vec<OrderAssignment>) -> StoreResult<()> {
        self.run(move |store| store.reorder(&assignments)).await
    }
}
