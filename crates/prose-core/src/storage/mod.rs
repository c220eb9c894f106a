//! Storage layer
//!
//! SQLite schema and the typed errors returned by the document store.
//!
//! ## Layout
//!
//! - `documents` - one row per document, keyed by id
//! - `schema_info` - schema version for migrations

pub mod error;
pub mod schema;

pub use error::{StoreError, StoreResult};
pub use schema::{init_schema, needs_init, SCHEMA_VERSION};
