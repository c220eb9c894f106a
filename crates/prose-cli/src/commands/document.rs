//! Document command handlers

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use prose_core::{
    spawn_autosave, AutosaveEvent, ControllerError, Document, DocumentApi, DocumentDraft,
    DocumentId, DocumentList, DropPosition, EditSession, ListEvent, StoreHandle,
};

use crate::editor::{confirm, read_body};
use crate::output::Output;

/// List all documents in display order
pub async fn list(api: &StoreHandle, output: &Output) -> Result<()> {
    let docs = api.list().await.context("Failed to list documents")?;
    output.print_documents(&docs)
}

/// Show one document
pub async fn show(api: &StoreHandle, id: String, output: &Output) -> Result<()> {
    let id = parse_document_id(&id, api).await?;
    let doc = api.get(id).await?;
    output.print_document(&doc)
}

/// Create a document at the top of the list
///
/// Without `--title` the title is inferred from the first line, exactly as
/// the autosave path would do it.
pub async fn create(
    api: &StoreHandle,
    title: Option<String>,
    body: Option<String>,
    output: &Output,
) -> Result<()> {
    let content = read_body(body, "")?;

    let doc = match title {
        Some(title) => api
            .create(DocumentDraft::titled(title.trim(), content))
            .await
            .context("Failed to create document")?,
        None => {
            let mut session = EditSession::new();
            session.edit(content);
            match session.save(api).await.context("Failed to create document")? {
                Some((doc, _)) => doc,
                None => bail!("Document content cannot be empty"),
            }
        }
    };

    output.success(&format!("Created document {} - {}", doc.id.short(), doc.title));
    if output.is_quiet() {
        println!("{}", doc.id);
    }

    Ok(())
}

/// Replace a document's content through the autosave task
pub async fn edit(
    api: &StoreHandle,
    id: String,
    body: Option<String>,
    debounce: Duration,
    output: &Output,
) -> Result<()> {
    let id = parse_document_id(&id, api).await?;
    let doc = api.get(id).await?;

    let content = read_body(body, &doc.content)?;
    if content == doc.content {
        output.message("No changes.");
        return Ok(());
    }

    match save_through_autosave(api, doc, content, debounce).await? {
        Some(saved) => {
            output.success(&format!("Saved document {} - {}", saved.id.short(), saved.title));
            Ok(())
        }
        None => bail!("Document content cannot be empty"),
    }
}

/// Drive one edit through the autosave task and flush it immediately
async fn save_through_autosave(
    api: &StoreHandle,
    doc: Document,
    content: String,
    debounce: Duration,
) -> Result<Option<Document>> {
    let autosave = spawn_autosave(Arc::new(api.clone()), debounce, Some(doc));

    autosave.edit(content).await?;
    autosave.save_now().await?;

    let mut saved = None;
    for event in autosave.shutdown().await {
        match event {
            AutosaveEvent::Saved { document, .. } => saved = Some(document),
            AutosaveEvent::SaveFailed { error } => bail!("Failed to save document: {}", error),
        }
    }

    Ok(saved)
}

/// Set a title by hand; later edits no longer change it
pub async fn rename(api: &StoreHandle, id: String, title: String, output: &Output) -> Result<()> {
    if title.trim().is_empty() {
        bail!("Title cannot be empty");
    }

    let mut list = load_list(api).await?;
    let id = resolve_id(&id, list.documents())?;

    let doc = list.rename(api, id, &title).await?;
    output.success(&format!("Renamed {} to {}", doc.id.short(), doc.title));

    Ok(())
}

/// Delete a document
pub async fn delete(api: &StoreHandle, id: String, yes: bool, output: &Output) -> Result<()> {
    let mut list = load_list(api).await?;
    let id = resolve_id(&id, list.documents())?;

    if output.should_prompt() && !yes {
        if let Some(doc) = list.get(id) {
            println!("Delete document: {} - {}", doc.id.short(), doc.title);
        }
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    list.delete(api, id).await?;
    output.success(&format!("Deleted document: {}", id));

    Ok(())
}

/// Move a document before or after another one
pub async fn move_document(
    api: &StoreHandle,
    id: String,
    target: String,
    position: DropPosition,
    output: &Output,
) -> Result<()> {
    let mut list = load_list(api).await?;
    let mut events = list.take_events();

    let id = resolve_id(&id, list.documents())?;
    let target = resolve_id(&target, list.documents())?;

    match list.reorder(api, id, target, position).await {
        Ok(true) => {}
        Ok(false) => {
            output.message("Already in place.");
            return Ok(());
        }
        Err(ControllerError::Reconciliation(e)) => {
            return Err(e).context("Failed to save document order; previous order kept");
        }
        Err(e) => return Err(e.into()),
    }

    if let Some(rx) = events.as_mut() {
        while let Ok(event) = rx.try_recv() {
            if let ListEvent::Reordered { count } = event {
                tracing::debug!("Reorder persisted for {} documents", count);
            }
        }
    }

    let new_position = list
        .documents()
        .iter()
        .position(|d| d.id == id)
        .map(|i| i + 1)
        .unwrap_or_default();
    output.success(&format!("Moved {} to position {}", id.short(), new_position));

    Ok(())
}

async fn load_list(api: &StoreHandle) -> Result<DocumentList> {
    let mut list = DocumentList::new();
    list.load(api).await.context("Failed to load documents")?;
    Ok(list)
}

/// Parse a document ID (supports full UUID or prefix)
async fn parse_document_id(id: &str, api: &StoreHandle) -> Result<DocumentId> {
    if let Ok(id) = id.parse::<DocumentId>() {
        return Ok(id);
    }

    let docs = api.list().await?;
    resolve_id(id, &docs)
}

fn resolve_id(id: &str, docs: &[Document]) -> Result<DocumentId> {
    if let Ok(id) = id.parse::<DocumentId>() {
        return Ok(id);
    }

    let matches: Vec<_> = docs
        .iter()
        .filter(|d| d.id.to_string().starts_with(id))
        .collect();

    match matches.as_slice() {
        [] => bail!("No document found matching: {}", id),
        [doc] => Ok(doc.id),
        _ => {
            eprintln!("Multiple documents match '{}':", id);
            for doc in &matches {
                eprintln!("  {} - {}", doc.id, doc.title);
            }
            bail!("Ambiguous ID. Please provide more characters.");
        }
    }
}
