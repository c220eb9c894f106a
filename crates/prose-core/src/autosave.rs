//! Debounced autosave
//!
//! Every edit resets a single timer. When the timer runs out, the session's
//! content is persisted: `create` the first time, `update` after that. A
//! manual save skips the timer but takes the same path.
//!
//! The timer lives in a background task driven over a channel, the same shape
//! as the other background workers in this crate:
//!
//! ```ignore
//! let mut autosave = spawn_autosave(api, config.autosave_debounce(), None);
//! autosave.edit("Draft\nfirst words").await?;
//! // ... 3 seconds later
//! if let Some(AutosaveEvent::Saved { document, created }) = autosave.next_event().await {
//!     list.apply_saved(document);
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::api::DocumentApi;
use crate::models::{make_preview, Document, DocumentDraft, DocumentId};
use crate::storage::StoreResult;

/// What the next save would do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingSave {
    Create(DocumentDraft),
    Update(DocumentId, DocumentDraft),
}

/// The document being edited and its unsaved content
#[derive(Debug, Clone, Default)]
pub struct EditSession {
    document: Option<Document>,
    content: String,
    dirty: bool,
}

impl EditSession {
    /// Session for a brand-new, not yet saved document
    pub fn new() -> Self {
        Self::default()
    }

    /// Session for an existing document
    pub fn open(document: Document) -> Self {
        Self {
            content: document.content.clone(),
            document: Some(document),
            dirty: false,
        }
    }

    /// The last saved version, if any
    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Whether there are edits not yet persisted
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Whether the content is worth saving at all
    pub fn has_content(&self) -> bool {
        !self.content.trim().is_empty()
    }

    pub fn edit(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.dirty = true;
    }

    /// Decide between create and update, and which title to send
    ///
    /// A manually set title is carried over as-is; otherwise the title is
    /// inferred from the content. Blank content yields nothing to save.
    pub fn pending_save(&self) -> Option<PendingSave> {
        if !self.has_content() {
            return None;
        }

        match &self.document {
            None => Some(PendingSave::Create(DocumentDraft::inferred(
                self.content.clone(),
            ))),
            Some(doc) => {
                let draft = if doc.title_manually_set {
                    DocumentDraft::new(
                        doc.title.clone(),
                        self.content.clone(),
                        make_preview(&self.content),
                        true,
                    )
                } else {
                    DocumentDraft::inferred(self.content.clone())
                };
                Some(PendingSave::Update(doc.id, draft))
            }
        }
    }

    /// Persist the current content
    ///
    /// Returns the stored document and whether it was newly created. On
    /// error the session stays dirty so a later save retries.
    pub async fn save(&mut self, api: &dyn DocumentApi) -> StoreResult<Option<(Document, bool)>> {
        let Some(pending) = self.pending_save() else {
            return Ok(None);
        };

        let (document, created) = match pending {
            PendingSave::Create(draft) => (api.create(draft).await?, true),
            PendingSave::Update(id, draft) => (api.update(id, draft).await?, false),
        };

        self.document = Some(document.clone());
        self.dirty = false;
        Ok(Some((document, created)))
    }
}

/// Commands accepted by the autosave task
#[derive(Debug)]
pub enum AutosaveCommand {
    /// Content changed; restart the debounce window
    Edit(String),
    /// Switch to another document (or a blank one), dropping any pending timer
    Open(Option<Document>),
    /// Save immediately
    SaveNow,
    /// Flush unsaved edits and stop
    Shutdown,
}

/// Results reported by the autosave task
#[derive(Debug, Clone)]
pub enum AutosaveEvent {
    Saved { document: Document, created: bool },
    SaveFailed { error: String },
}

#[derive(Error, Debug)]
pub enum AutosaveError {
    #[error("Autosave task has stopped")]
    Stopped,
}

/// Handle for controlling the background autosave task
pub struct AutosaveHandle {
    command_tx: mpsc::Sender<AutosaveCommand>,
    event_rx: mpsc::UnboundedReceiver<AutosaveEvent>,
    task: JoinHandle<()>,
}

impl AutosaveHandle {
    async fn send(&self, command: AutosaveCommand) -> Result<(), AutosaveError> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| AutosaveError::Stopped)
    }

    pub async fn edit(&self, content: impl Into<String>) -> Result<(), AutosaveError> {
        self.send(AutosaveCommand::Edit(content.into())).await
    }

    pub async fn open(&self, document: Option<Document>) -> Result<(), AutosaveError> {
        self.send(AutosaveCommand::Open(document)).await
    }

    pub async fn save_now(&self) -> Result<(), AutosaveError> {
        self.send(AutosaveCommand::SaveNow).await
    }

    /// Wait for the next save result
    pub async fn next_event(&mut self) -> Option<AutosaveEvent> {
        self.event_rx.recv().await
    }

    /// Next save result, if one is already waiting
    pub fn try_next_event(&mut self) -> Option<AutosaveEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Flush, stop the task, and return any results not yet consumed
    pub async fn shutdown(mut self) -> Vec<AutosaveEvent> {
        let _ = self.command_tx.send(AutosaveCommand::Shutdown).await;
        if let Err(e) = (&mut self.task).await {
            warn!("Autosave task ended abnormally: {}", e);
        }

        let mut remaining = Vec::new();
        while let Ok(event) = self.event_rx.try_recv() {
            remaining.push(event);
        }
        remaining
    }
}

/// Spawn the autosave task for one edit session
pub fn spawn_autosave(
    api: Arc<dyn DocumentApi>,
    debounce: Duration,
    document: Option<Document>,
) -> AutosaveHandle {
    let (command_tx, command_rx) = mpsc::channel(64);
    let (event_tx, event_rx) = mpsc::unbounded_channel();

    let session = document.map(EditSession::open).unwrap_or_default();
    let task = tokio::spawn(autosave_task(api, debounce, session, command_rx, event_tx));

    AutosaveHandle {
        command_tx,
        event_rx,
        task,
    }
}

async fn autosave_task(
    api: Arc<dyn DocumentApi>,
    debounce: Duration,
    mut session: EditSession,
    mut command_rx: mpsc::Receiver<AutosaveCommand>,
    event_tx: mpsc::UnboundedSender<AutosaveEvent>,
) {
    let mut deadline: Option<Instant> = None;

    loop {
        let timer = async move {
            match deadline {
                Some(at) => sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = timer => {
                deadline = None;
                debug!("Autosave timer fired");
                persist(api.as_ref(), &mut session, &event_tx).await;
            }
            cmd = command_rx.recv() => {
                match cmd {
                    Some(AutosaveCommand::Edit(content)) => {
                        session.edit(content);
                        deadline = session.has_content().then(|| Instant::now() + debounce);
                    }
                    Some(AutosaveCommand::Open(document)) => {
                        session = document.map(EditSession::open).unwrap_or_default();
                        deadline = None;
                    }
                    Some(AutosaveCommand::SaveNow) => {
                        deadline = None;
                        persist(api.as_ref(), &mut session, &event_tx).await;
                    }
                    Some(AutosaveCommand::Shutdown) | None => {
                        if session.is_dirty() {
                            persist(api.as_ref(), &mut session, &event_tx).await;
                        }
                        break;
                    }
                }
            }
        }
    }
}

async fn persist(
    api: &dyn DocumentApi,
    session: &mut EditSession,
    event_tx: &mpsc::UnboundedSender<AutosaveEvent>,
) {
    match session.save(api).await {
        Ok(Some((document, created))) => {
            info!(
                "Saved document {} ({})",
                document.id,
                if created { "created" } else { "updated" }
            );
            let _ = event_tx.send(AutosaveEvent::Saved { document, created });
        }
        Ok(None) => {}
        Err(e) => {
            warn!("Failed to save document: {}", e);
            let _ = event_tx.send(AutosaveEvent::SaveFailed {
                error: e.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OrderAssignment;
    use crate::storage::StoreError;
    use crate::store::DocumentStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::time::sleep;

    /// Runs store calls inline so paused test time stays deterministic
    struct InlineApi {
        store: Mutex<DocumentStore>,
        writes: AtomicUsize,
        fail_writes: AtomicBool,
    }

    impl InlineApi {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                store: Mutex::new(DocumentStore::open_in_memory().unwrap()),
                writes: AtomicUsize::new(0),
                fail_writes: AtomicBool::new(false),
            })
        }

        fn writes(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }

        fn check_fault(&self) -> StoreResult<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StoreError::StorageFault(rusqlite::Error::InvalidQuery));
            }
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[async_trait]
    impl DocumentApi for InlineApi {
        async fn list(&self) -> StoreResult<Vec<Document>> {
            self.store.lock().unwrap().list()
        }

        async fn get(&self, id: DocumentId) -> StoreResult<Document> {
            self.store.lock().unwrap().get(id)
        }

        async fn create(&self, draft: DocumentDraft) -> StoreResult<Document> {
            self.check_fault()?;
            self.store.lock().unwrap().create(&draft)
        }

        async fn update(&self, id: DocumentId, draft: DocumentDraft) -> StoreResult<Document> {
            self.check_fault()?;
            self.store.lock().unwrap().update(id, &draft)
        }

        async fn delete(&self, id: DocumentId) -> StoreResult<bool> {
            self.store.lock().unwrap().delete(id)
        }

        async fn reorder(&self, assignments: Vec<OrderAssignment>) -> StoreResult<()> {
            self.store.lock().unwrap().reorder(&assignments)
        }
    }

    const WINDOW: Duration = Duration::from_secs(3);

    fn saved(event: Option<AutosaveEvent>) -> (Document, bool) {
        match event {
            Some(AutosaveEvent::Saved { document, created }) => (document, created),
            other => panic!("expected a save, got {:?}", other),
        }
    }

    #[test]
    fn test_pending_save_for_new_document() {
        let mut session = EditSession::new();
        assert_eq!(session.pending_save(), None);

        session.edit("  \n ");
        assert_eq!(session.pending_save(), None);

        session.edit("Shopping list\n- eggs");
        match session.pending_save() {
            Some(PendingSave::Create(draft)) => {
                assert_eq!(draft.title, "Shopping list");
                assert!(!draft.title_manually_set);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_session_save_creates_then_updates() {
        let api = InlineApi::new();
        let mut session = EditSession::new();

        session.edit("First line\nbody");
        let (doc, created) = session.save(api.as_ref()).await.unwrap().unwrap();
        assert!(created);
        assert_eq!(doc.title, "First line");
        assert!(!session.is_dirty());

        session.edit("Retitled\nbody");
        let (updated, created) = session.save(api.as_ref()).await.unwrap().unwrap();
        assert!(!created);
        assert_eq!(updated.id, doc.id);
        assert_eq!(updated.title, "Retitled");
    }

    #[tokio::test]
    async fn test_session_keeps_manual_title() {
        let api = InlineApi::new();
        let doc = api
            .create(DocumentDraft::titled("Journal", "day one"))
            .await
            .unwrap();

        let mut session = EditSession::open(doc.clone());
        session.edit("Day two\nit rained");
        match session.pending_save() {
            Some(PendingSave::Update(id, draft)) => {
                assert_eq!(id, doc.id);
                assert_eq!(draft.title, "Journal");
                assert!(draft.title_manually_set);
                assert_eq!(draft.preview, "Day two\nit rained");
            }
            other => panic!("unexpected {:?}", other),
        }

        let (saved, _) = session.save(api.as_ref()).await.unwrap().unwrap();
        assert_eq!(saved.title, "Journal");
    }

    #[tokio::test(start_paused = true)]
    async fn test_edits_reset_the_timer() {
        let api = InlineApi::new();
        let mut autosave = spawn_autosave(api.clone(), WINDOW, None);

        autosave.edit("H").await.unwrap();
        sleep(Duration::from_secs(2)).await;
        autosave.edit("Hello").await.unwrap();
        sleep(Duration::from_secs(2)).await;

        // 4s since the first edit, 2s since the last
        assert_eq!(api.writes(), 0);
        assert!(autosave.try_next_event().is_none());

        sleep(Duration::from_millis(1500)).await;
        let (doc, created) = saved(autosave.next_event().await);
        assert!(created);
        assert_eq!(doc.content, "Hello");
        assert_eq!(api.writes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_save_updates_same_document() {
        let api = InlineApi::new();
        let mut autosave = spawn_autosave(api.clone(), WINDOW, None);

        autosave.edit("Draft one").await.unwrap();
        let (first, created) = saved(autosave.next_event().await);
        assert!(created);

        autosave.edit("Draft two\nmore").await.unwrap();
        let (second, created) = saved(autosave.next_event().await);
        assert!(!created);
        assert_eq!(second.id, first.id);
        assert_eq!(second.title, "Draft two");
        assert_eq!(api.list().await.unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_now_bypasses_and_cancels_timer() {
        let api = InlineApi::new();
        let mut autosave = spawn_autosave(api.clone(), WINDOW, None);

        autosave.edit("Quick note").await.unwrap();
        autosave.save_now().await.unwrap();
        let (doc, _) = saved(autosave.next_event().await);
        assert_eq!(doc.content, "Quick note");

        sleep(Duration::from_secs(10)).await;
        assert!(autosave.try_next_event().is_none());
        assert_eq!(api.writes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_content_is_never_saved() {
        let api = InlineApi::new();
        let mut autosave = spawn_autosave(api.clone(), WINDOW, None);

        autosave.edit("   ").await.unwrap();
        sleep(Duration::from_secs(10)).await;
        autosave.save_now().await.unwrap();
        sleep(Duration::from_secs(1)).await;

        assert!(autosave.try_next_event().is_none());
        assert_eq!(api.writes(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_title_survives_autosave() {
        let api = InlineApi::new();
        let doc = api
            .create(DocumentDraft::titled("Pinned", "original"))
            .await
            .unwrap();
        let mut autosave = spawn_autosave(api.clone(), WINDOW, Some(doc.clone()));

        autosave.edit("Something else entirely").await.unwrap();
        let (updated, created) = saved(autosave.next_event().await);
        assert!(!created);
        assert_eq!(updated.id, doc.id);
        assert_eq!(updated.title, "Pinned");
        assert_eq!(updated.content, "Something else entirely");
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_drops_pending_timer() {
        let api = InlineApi::new();
        let mut autosave = spawn_autosave(api.clone(), WINDOW, None);

        autosave.edit("Unsaved scratch").await.unwrap();
        autosave.open(None).await.unwrap();
        sleep(Duration::from_secs(10)).await;

        assert!(autosave.try_next_event().is_none());
        assert_eq!(api.writes(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_save_is_reported_and_retried() {
        let api = InlineApi::new();
        let mut autosave = spawn_autosave(api.clone(), WINDOW, None);

        api.fail_writes.store(true, Ordering::SeqCst);
        autosave.edit("Important").await.unwrap();
        assert!(matches!(
            autosave.next_event().await,
            Some(AutosaveEvent::SaveFailed { .. })
        ));

        api.fail_writes.store(false, Ordering::SeqCst);
        autosave.save_now().await.unwrap();
        let (doc, created) = saved(autosave.next_event().await);
        assert!(created);
        assert_eq!(doc.content, "Important");
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_flushes_pending_edit() {
        let api = InlineApi::new();
        let autosave = spawn_autosave(api.clone(), WINDOW, None);

        autosave.edit("Last words").await.unwrap();
        let remaining = autosave.shutdown().await;

        assert_eq!(remaining.len(), 1);
        assert!(matches!(&remaining[0], AutosaveEvent::Saved { created: true, .. }));
        assert_eq!(api.writes(), 1);
    }
}
