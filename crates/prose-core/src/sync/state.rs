//! Reorder state machine
//!
//! `Idle → Dragging → Reconciling → (Committed | RolledBack) → Idle`
//!
//! The snapshot taken when a drag starts lives inside the state that needs
//! it, so there is no way to reach `Reconciling` without something to roll
//! back to.

use crate::models::{Document, DocumentId};

/// Observable phase of the reorder protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorderPhase {
    /// No drag in progress
    Idle,
    /// A document is being dragged
    Dragging,
    /// The optimistic order is applied and awaiting the store
    Reconciling,
    /// The store accepted the last reorder
    Committed,
    /// The store rejected the last reorder and the snapshot was restored
    RolledBack,
}

impl ReorderPhase {
    /// Whether a new drag may start
    pub fn accepts_drag(self) -> bool {
        !matches!(self, ReorderPhase::Dragging | ReorderPhase::Reconciling)
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) enum ReorderState {
    #[default]
    Idle,
    Dragging {
        dragged: DocumentId,
        snapshot: Vec<Document>,
    },
    Reconciling {
        snapshot: Vec<Document>,
    },
    Committed,
    RolledBack,
}

impl ReorderState {
    pub(crate) fn phase(&self) -> ReorderPhase {
        match self {
            ReorderState::Idle => ReorderPhase::Idle,
            ReorderState::Dragging { .. } => ReorderPhase::Dragging,
            ReorderState::Reconciling { .. } => ReorderPhase::Reconciling,
            ReorderState::Committed => ReorderPhase::Committed,
            ReorderState::RolledBack => ReorderPhase::RolledBack,
        }
    }

    /// The last known-good list held by `Dragging` or `Reconciling`
    pub(crate) fn snapshot_mut(&mut self) -> Option<&mut Vec<Document>> {
        match self {
            ReorderState::Dragging { snapshot, .. } | ReorderState::Reconciling { snapshot } => {
                Some(snapshot)
            }
            _ => None,
        }
    }
}
