//! Prose Core Library
//!
//! This crate provides the core of Prose, a minimal markdown note-taking
//! application: an ordered collection of documents persisted in SQLite,
//! edited by a single interactive client.
//!
//! # Architecture
//!
//! - **DocumentStore**: owns the database; all writes are transactional
//! - **Ordering**: pure drag-and-drop arithmetic over the document list
//! - **DocumentList**: the client's view, reordered optimistically and rolled
//!   back when the store refuses
//! - **Autosave**: debounced persistence of the document being edited
//!
//! # Quick Start
//!
//! ```text
//! let api = StoreHandle::open(&Config::load()?)?;
//!
//! let mut list = DocumentList::new();
//! list.load(&api).await?;
//!
//! let doc = api.create(DocumentDraft::inferred("Hello\nworld")).await?;
//! list.apply_saved(doc);
//! ```
//!
//! # Modules
//!
//! - `store`: SQLite-backed document store (main entry point)
//! - `api`: async boundary used by clients
//! - `models`: documents, drafts, title and preview rules
//! - `ordering`: drag-and-drop ordering engine
//! - `sync`: optimistic list reconciliation
//! - `autosave`: debounced saving of an edit session
//! - `storage`: schema and store errors
//! - `config`: application configuration

pub mod api;
pub mod autosave;
pub mod config;
pub mod models;
pub mod ordering;
pub mod storage;
pub mod store;
pub mod sync;

pub use api::{DocumentApi, StoreHandle};
pub use autosave::{spawn_autosave, AutosaveEvent, AutosaveHandle, EditSession};
pub use config::Config;
pub use models::{Document, DocumentDraft, DocumentId, OrderAssignment};
pub use ordering::DropPosition;
pub use storage::{StoreError, StoreResult};
pub use store::DocumentStore;
pub use sync::{ControllerError, DocumentList, ListEvent, ReorderPhase};
