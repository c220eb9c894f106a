//! Client-side document list with optimistic reordering
//!
//! `DocumentList` is what the user sees. Reorders are applied locally the
//! moment an item is dropped and then confirmed or rolled back against the
//! store. Saves and deletes are applied only after the store accepts them,
//! so a failed call never leaves the visible list in a mixed state.

use std::mem;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::state::{ReorderPhase, ReorderState};
use crate::api::DocumentApi;
use crate::models::{Document, DocumentDraft, DocumentId, OrderAssignment};
use crate::ordering::{self, DropPosition, OrderingError};
use crate::storage::{StoreError, StoreResult};

/// Events published on the operator channel
#[derive(Debug, Clone)]
pub enum ListEvent {
    /// A reorder was persisted
    Reordered { count: usize },
    /// A reorder failed and the previous order was restored
    ReorderRolledBack { error: String },
    /// A document was created or updated
    Saved(Document),
    /// A document was removed
    Deleted(DocumentId),
}

#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("A reorder is already in progress")]
    Busy,

    #[error("No drag in progress")]
    NotDragging,

    #[error("No reorder awaiting confirmation")]
    NotReconciling,

    #[error("Document {0} is not in the list")]
    UnknownDocument(DocumentId),

    #[error(transparent)]
    Ordering(#[from] OrderingError),

    /// The store rejected the optimistic order; the snapshot was restored
    #[error("Reorder rolled back: {0}")]
    Reconciliation(#[source] StoreError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The in-memory document list and its reorder state machine
pub struct DocumentList {
    documents: Vec<Document>,
    state: ReorderState,
    event_tx: mpsc::UnboundedSender<ListEvent>,
    event_rx: Option<mpsc::UnboundedReceiver<ListEvent>>,
}

impl Default for DocumentList {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentList {
    pub fn new() -> Self {
        Self::with_documents(Vec::new())
    }

    /// Start from an already ordered list
    pub fn with_documents(documents: Vec<Document>) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        Self {
            documents,
            state: ReorderState::Idle,
            event_tx,
            event_rx: Some(event_rx),
        }
    }

    /// The list as currently shown
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn get(&self, id: DocumentId) -> Option<&Document> {
        self.documents.iter().find(|d| d.id == id)
    }

    pub fn phase(&self) -> ReorderPhase {
        self.state.phase()
    }

    /// Take the event receiver (can only be called once)
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<ListEvent>> {
        self.event_rx.take()
    }

    fn position(&self, id: DocumentId) -> Option<usize> {
        self.documents.iter().position(|d| d.id == id)
    }

    fn emit(&self, event: ListEvent) {
        let _ = self.event_tx.send(event);
    }

    // ==================== Reorder protocol ====================

    /// Start dragging a document, snapshotting the current order
    pub fn begin_drag(&mut self, id: DocumentId) -> Result<(), ControllerError> {
        if !self.phase().accepts_drag() {
            return Err(ControllerError::Busy);
        }
        if self.position(id).is_none() {
            return Err(ControllerError::UnknownDocument(id));
        }

        self.state = ReorderState::Dragging {
            dragged: id,
            snapshot: self.documents.clone(),
        };
        debug!("Drag started for {}", id);
        Ok(())
    }

    /// Abandon the current drag without changing the list
    pub fn cancel_drag(&mut self) -> Result<(), ControllerError> {
        match self.state {
            ReorderState::Dragging { .. } => {
                self.state = ReorderState::Idle;
                Ok(())
            }
            _ => Err(ControllerError::NotDragging),
        }
    }

    /// Drop indicator to show while hovering over `target`
    pub fn hover_position(&self, target: DocumentId) -> Option<DropPosition> {
        let ReorderState::Dragging { dragged, .. } = &self.state else {
            return None;
        };
        let source = self.position(*dragged)?;
        let target_index = self.position(target)?;

        (source != target_index).then(|| ordering::suggested_position(source, target_index))
    }

    /// Drop the dragged document beside `target`
    ///
    /// Applies the new order to the visible list immediately and returns the
    /// batch to persist. Returns `None` (and goes back to `Idle`) when the
    /// drop changes nothing: onto itself, or onto a document no longer listed.
    pub fn drop_on(
        &mut self,
        target: DocumentId,
        position: DropPosition,
    ) -> Result<Option<Vec<OrderAssignment>>, ControllerError> {
        let (dragged, snapshot) = match mem::take(&mut self.state) {
            ReorderState::Dragging { dragged, snapshot } => (dragged, snapshot),
            other => {
                self.state = other;
                return Err(ControllerError::NotDragging);
            }
        };

        let (Some(source), Some(target_index)) = (self.position(dragged), self.position(target))
        else {
            return Ok(None);
        };
        if source == target_index {
            return Ok(None);
        }

        let mut reordered = ordering::move_item(&self.documents, source, target_index, position)?;
        let batch = ordering::assign_contiguous(reordered.iter().map(|d| d.id));
        for (doc, assignment) in reordered.iter_mut().zip(&batch) {
            doc.display_order = assignment.order;
        }

        self.documents = reordered;
        self.state = ReorderState::Reconciling { snapshot };
        Ok(Some(batch))
    }

    /// Resolve the in-flight reorder with the store's answer
    ///
    /// On failure the pre-drag snapshot is restored verbatim and the error is
    /// returned as `Reconciliation`. Nothing is retried.
    pub fn complete(&mut self, result: StoreResult<()>) -> Result<(), ControllerError> {
        let snapshot = match mem::take(&mut self.state) {
            ReorderState::Reconciling { snapshot } => snapshot,
            other => {
                self.state = other;
                return Err(ControllerError::NotReconciling);
            }
        };

        match result {
            Ok(()) => {
                self.state = ReorderState::Committed;
                info!("Reorder committed ({} documents)", self.documents.len());
                self.emit(ListEvent::Reordered {
                    count: self.documents.len(),
                });
                Ok(())
            }
            Err(error) => {
                self.documents = snapshot;
                self.state = ReorderState::RolledBack;
                warn!("Failed to save document order, reverted: {}", error);
                self.emit(ListEvent::ReorderRolledBack {
                    error: error.to_string(),
                });
                Err(ControllerError::Reconciliation(error))
            }
        }
    }

    /// Return to `Idle` after a commit or rollback
    pub fn acknowledge(&mut self) {
        if matches!(
            self.state,
            ReorderState::Committed | ReorderState::RolledBack
        ) {
            self.state = ReorderState::Idle;
        }
    }

    /// Run one full drag: begin, drop, persist, reconcile
    ///
    /// Returns whether the order changed.
    pub async fn reorder(
        &mut self,
        api: &dyn DocumentApi,
        dragged: DocumentId,
        target: DocumentId,
        position: DropPosition,
    ) -> Result<bool, ControllerError> {
        self.begin_drag(dragged)?;

        let Some(batch) = self.drop_on(target, position)? else {
            return Ok(false);
        };

        let result = api.reorder(batch).await;
        self.complete(result)?;
        Ok(true)
    }

    // ==================== Store-confirmed changes ====================

    /// Replace the list with the store's current contents
    pub async fn load(&mut self, api: &dyn DocumentApi) -> Result<(), ControllerError> {
        if !self.phase().accepts_drag() {
            return Err(ControllerError::Busy);
        }

        self.documents = api.list().await?;
        self.state = ReorderState::Idle;
        debug!("Loaded {} documents", self.documents.len());
        Ok(())
    }

    /// Apply a document the store has just created or updated
    ///
    /// New documents go to the top, matching where the store puts them.
    /// An in-flight snapshot gets the same change so a rollback keeps it.
    pub fn apply_saved(&mut self, doc: Document) {
        upsert(&mut self.documents, doc.clone());
        if let Some(snapshot) = self.state.snapshot_mut() {
            upsert(snapshot, doc.clone());
        }
        self.emit(ListEvent::Saved(doc));
    }

    /// Remove a document the store has just deleted
    pub fn apply_deleted(&mut self, id: DocumentId) -> bool {
        let before = self.documents.len();
        self.documents.retain(|d| d.id != id);

        if let Some(snapshot) = self.state.snapshot_mut() {
            snapshot.retain(|d| d.id != id);
        }
        if matches!(self.state, ReorderState::Dragging { dragged, .. } if dragged == id) {
            self.state = ReorderState::Idle;
        }

        let removed = self.documents.len() < before;
        if removed {
            self.emit(ListEvent::Deleted(id));
        }
        removed
    }

    /// Rename a document, freezing its title against inference
    pub async fn rename(
        &mut self,
        api: &dyn DocumentApi,
        id: DocumentId,
        title: &str,
    ) -> Result<Document, ControllerError> {
        let doc = self.get(id).ok_or(ControllerError::UnknownDocument(id))?;
        let draft = DocumentDraft::new(title.trim(), doc.content.clone(), doc.preview.clone(), true);

        let renamed = api.update(id, draft).await?;
        self.apply_saved(renamed.clone());
        Ok(renamed)
    }

    /// Delete a document from the store, then from the list
    pub async fn delete(
        &mut self,
        api: &dyn DocumentApi,
        id: DocumentId,
    ) -> Result<bool, ControllerError> {
        let existed = api.delete(id).await?;
        self.apply_deleted(id);
        Ok(existed)
    }
}

fn upsert(documents: &mut Vec<Document>, doc: Document) {
    match documents.iter_mut().find(|d| d.id == doc.id) {
        Some(slot) => *slot = doc,
        None => documents.insert(0, doc),
    }
}
