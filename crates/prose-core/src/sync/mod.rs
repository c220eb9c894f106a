//! Reconciliation between the visible document list and the store
//!
//! ## Protocol
//!
//! 1. `begin_drag` snapshots the current list
//! 2. `drop_on` applies the new order locally and yields the batch to persist
//! 3. The batch goes to `DocumentApi::reorder`
//! 4. `complete` commits, or restores the snapshot on failure
//!
//! ## Usage
//!
//! ```ignore
//! let mut list = DocumentList::new();
//! list.load(&api).await?;
//! list.reorder(&api, dragged, target, DropPosition::Before).await?;
//! ```

mod controller;
mod state;

pub use controller::{ControllerError, DocumentList, ListEvent};
pub use state::ReorderPhase;
