//! Document store
//!
//! The `DocumentStore` owns the SQLite connection and is the only component
//! that touches the database. It is an explicitly opened instance; drop it or
//! call [`DocumentStore::close`] to release the file.
//!
//! ## Ordering
//!
//! `display_order` is a sparse key. `create` assigns `min(existing) - 1` so a
//! new document sorts first without renumbering any other row. Contiguous
//! renumbering only happens through [`DocumentStore::reorder`], which writes
//! a whole batch inside one transaction.
//!
//! ## Usage
//!
//! ```ignore
//! let mut store = DocumentStore::open(&config)?;
//!
//! let doc = store.create(&DocumentDraft::inferred("Hello\nworld"))?;
//! let docs = store.list()?;
//! ```

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use tracing::{debug, info};

use crate::config::Config;
use crate::models::{Document, DocumentDraft, DocumentId, OrderAssignment};
use crate::storage::schema::{init_schema, needs_init};
use crate::storage::{StoreError, StoreResult};

const SELECT_COLUMNS: &str = "SELECT id, title, content, preview, title_manually_set, \
     display_order, created_at, updated_at FROM documents";

/// Durable, ordered collection of documents backed by SQLite
pub struct DocumentStore {
    conn: Connection,
}

impl DocumentStore {
    /// Open or create the database under the configured data directory
    pub fn open(config: &Config) -> StoreResult<Self> {
        let path = config.sqlite_path();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(&path)?;
        let store = Self::from_connection(conn)?;
        info!("Opened document store at {:?}", path);
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        if needs_init(&conn) {
            init_schema(&conn)?;
        }

        Ok(Self { conn })
    }

    /// Close the underlying connection, surfacing any error from SQLite
    pub fn close(self) -> StoreResult<()> {
        self.conn.close().map_err(|(_, e)| StoreError::from(e))
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    /// All documents, by `display_order` ascending then most recently updated
    pub fn list(&self) -> StoreResult<Vec<Document>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} ORDER BY display_order ASC, updated_at DESC, id DESC",
            SELECT_COLUMNS
        ))?;

        let docs = stmt
            .query_map([], document_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(docs)
    }

    /// Get a document by id
    pub fn get(&self, id: DocumentId) -> StoreResult<Document> {
        fetch(&self.conn, id)?.ok_or(StoreError::NotFound { id })
    }

    /// Number of stored documents
    pub fn count(&self) -> StoreResult<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))
            .map_err(Into::into)
    }

    /// Create a document at the top of the list
    pub fn create(&mut self, draft: &DocumentDraft) -> StoreResult<Document> {
        validate(draft)?;

        let tx = self.conn.transaction()?;

        let min_order: Option<i64> =
            tx.query_row("SELECT MIN(display_order) FROM documents", [], |row| row.get(0))?;
        let display_order = match min_order {
            None => 0,
            Some(min) => min.checked_sub(1).ok_or(StoreError::OrderExhausted)?,
        };

        let id = DocumentId::generate();
        let now = Utc::now().timestamp_millis();

        tx.execute(
            r#"
            INSERT INTO documents
                (id, title, content, preview, title_manually_set, display_order, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                id.to_string(),
                draft.title,
                draft.content,
                draft.preview,
                draft.title_manually_set,
                display_order,
                now,
                now,
            ],
        )?;

        let doc = fetch(&tx, id)?.ok_or(StoreError::NotFound { id })?;
        tx.commit()?;

        debug!("Created document {} at order {}", id, display_order);
        Ok(doc)
    }

    /// Update title, content, preview and title flag of an existing document
    ///
    /// Once a document's title is manually set, an update that does not also
    /// set the flag keeps the stored title. `display_order` is never touched.
    pub fn update(&mut self, id: DocumentId, draft: &DocumentDraft) -> StoreResult<Document> {
        validate(draft)?;

        let tx = self.conn.transaction()?;

        let existing = fetch(&tx, id)?.ok_or(StoreError::NotFound { id })?;

        let (title, title_manually_set) =
            if existing.title_manually_set && !draft.title_manually_set {
                (existing.title.as_str(), true)
            } else {
                (draft.title.as_str(), draft.title_manually_set)
            };

        let updated_at = Utc::now()
            .timestamp_millis()
            .max(existing.created_at.timestamp_millis());

        tx.execute(
            r#"
            UPDATE documents
            SET title = ?, content = ?, preview = ?, title_manually_set = ?, updated_at = ?
            WHERE id = ?
            "#,
            params![
                title,
                draft.content,
                draft.preview,
                title_manually_set,
                updated_at,
                id.to_string(),
            ],
        )?;

        let doc = fetch(&tx, id)?.ok_or(StoreError::NotFound { id })?;
        tx.commit()?;

        debug!("Updated document {}", id);
        Ok(doc)
    }

    /// Delete a document, returning whether it existed
    pub fn delete(&mut self, id: DocumentId) -> StoreResult<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM documents WHERE id = ?", params![id.to_string()])?;

        debug!("Delete document {}: removed={}", id, removed > 0);
        Ok(removed > 0)
    }

    /// Write a batch of order keys atomically
    ///
    /// Either every assignment is written or none is. An unknown id aborts
    /// the batch with `NotFound`; any database fault aborts it with
    /// `StorageFault`. `updated_at` is left alone.
    pub fn reorder(&mut self, assignments: &[OrderAssignment]) -> StoreResult<()> {
        if assignments.is_empty() {
            return Ok(());
        }

        let mut seen = HashSet::with_capacity(assignments.len());
        for assignment in assignments {
            if !seen.insert(assignment.id) {
                return Err(StoreError::DuplicateOrder { id: assignment.id });
            }
        }

        // Dropping the transaction on any early return rolls it back
        let tx = self.conn.transaction()?;
        apply_orders(&tx, assignments)?;
        tx.commit()?;

        info!("Reordered {} documents", assignments.len());
        Ok(())
    }
}

fn validate(draft: &DocumentDraft) -> StoreResult<()> {
    if draft.title.trim().is_empty() {
        return Err(StoreError::Validation { field: "title" });
    }
    if draft.content.trim().is_empty() {
        return Err(StoreError::Validation { field: "content" });
    }
    Ok(())
}

fn apply_orders(tx: &Transaction, assignments: &[OrderAssignment]) -> StoreResult<()> {
    let mut stmt = tx.prepare("UPDATE documents SET display_order = ? WHERE id = ?")?;

    for assignment in assignments {
        let changed = stmt.execute(params![assignment.order, assignment.id.to_string()])?;
        if changed == 0 {
            return Err(StoreError::NotFound { id: assignment.id });
        }
    }

    Ok(())
}

fn fetch(conn: &Connection, id: DocumentId) -> StoreResult<Option<Document>> {
    let doc = conn
        .query_row(
            &format!("{} WHERE id = ?", SELECT_COLUMNS),
            params![id.to_string()],
            document_from_row,
        )
        .optional()?;
    Ok(doc)
}

fn document_from_row(row: &Row) -> rusqlite::Result<Document> {
    let id: String = row.get(0)?;
    let id = id
        .parse::<DocumentId>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?;

    Ok(Document {
        id,
        title: row.get(1)?,
        content: row.get(2)?,
        preview: row.get(3)?,
        title_manually_set: row.get(4)?,
        display_order: row.get(5)?,
        created_at: timestamp(row, 6)?,
        updated_at: timestamp(row, 7)?,
    })
}

fn timestamp(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let millis: i64 = row.get(idx)?;
    DateTime::from_timestamp_millis(millis).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Integer,
            format!("timestamp out of range: {}", millis).into(),
        )
    })
}
