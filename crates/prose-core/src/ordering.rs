//! Ordering engine
//!
//! Pure list arithmetic for drag-and-drop reordering. No I/O: the result is
//! a new sequence plus the contiguous `0..N-1` keys to persist for it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{DocumentId, OrderAssignment};

/// Where the drop indicator sits relative to the target item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DropPosition {
    Before,
    After,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderingError {
    #[error("Index {index} out of range for list of {len}")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Indicator shown while hovering: below the target when dragging down,
/// above it when dragging up
pub fn suggested_position(source: usize, target: usize) -> DropPosition {
    if source < target {
        DropPosition::After
    } else {
        DropPosition::Before
    }
}

/// Index at which the dragged item is inserted once it has been removed
///
/// Removing the source shifts every later index down by one, which is why
/// the result depends on whether the source preceded the target.
pub fn insertion_index(source: usize, target: usize, position: DropPosition) -> usize {
    match (position, source < target) {
        (DropPosition::After, true) => target,
        (DropPosition::After, false) => target + 1,
        (DropPosition::Before, true) => target - 1,
        (DropPosition::Before, false) => target,
    }
}

/// Move the item at `source` next to the item at `target`
///
/// Dropping an item onto itself returns the list unchanged.
pub fn move_item<T: Clone>(
    items: &[T],
    source: usize,
    target: usize,
    position: DropPosition,
) -> Result<Vec<T>, OrderingError> {
    let len = items.len();
    for index in [source, target] {
        if index >= len {
            return Err(OrderingError::IndexOutOfRange { index, len });
        }
    }

    let mut moved = items.to_vec();
    if source == target {
        return Ok(moved);
    }

    let item = moved.remove(source);
    moved.insert(insertion_index(source, target, position), item);
    Ok(moved)
}

/// Contiguous `0..N-1` keys for a sequence of ids
pub fn assign_contiguous(ids: impl IntoIterator<Item = DocumentId>) -> Vec<OrderAssignment> {
    ids.into_iter()
        .enumerate()
        .map(|(index, id)| OrderAssignment::new(id, index as i64))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letters() -> Vec<char> {
        vec!['A', 'B', 'C', 'D']
    }

    #[test]
    fn test_drag_last_before_first() {
        let moved = move_item(&['A', 'B', 'C'], 2, 0, DropPosition::Before).unwrap();
        assert_eq!(moved, vec!['C', 'A', 'B']);
    }

    #[test]
    fn test_drag_down_after() {
        let moved = move_item(&letters(), 0, 2, DropPosition::After).unwrap();
        assert_eq!(moved, vec!['B', 'C', 'A', 'D']);
    }

    #[test]
    fn test_drag_down_before() {
        let moved = move_item(&letters(), 0, 2, DropPosition::Before).unwrap();
        assert_eq!(moved, vec!['B', 'A', 'C', 'D']);
    }

    #[test]
    fn test_drag_up_after() {
        let moved = move_item(&letters(), 3, 1, DropPosition::After).unwrap();
        assert_eq!(moved, vec!['A', 'B', 'D', 'C']);
    }

    #[test]
    fn test_first_and_last_slots_reachable() {
        let to_front = move_item(&letters(), 2, 0, DropPosition::Before).unwrap();
        assert_eq!(to_front[0], 'C');

        let to_back = move_item(&letters(), 1, 3, DropPosition::After).unwrap();
        assert_eq!(to_back[3], 'B');
    }

    #[test]
    fn test_drop_on_self_is_noop() {
        for position in [DropPosition::Before, DropPosition::After] {
            assert_eq!(move_item(&letters(), 1, 1, position).unwrap(), letters());
        }
    }

    #[test]
    fn test_every_combination_is_a_permutation() {
        let items = letters();
        let len = items.len();

        for source in 0..len {
            for target in 0..len {
                for position in [DropPosition::Before, DropPosition::After] {
                    if source != target {
                        assert!(insertion_index(source, target, position) < len);
                    }

                    let mut moved = move_item(&items, source, target, position).unwrap();
                    assert_eq!(moved.len(), len);
                    moved.sort();
                    assert_eq!(moved, items);
                }
            }
        }
    }

    #[test]
    fn test_dragged_item_lands_beside_target() {
        let items = letters();
        for source in 0..items.len() {
            for target in 0..items.len() {
                if source == target {
                    continue;
                }
                let dragged = items[source];
                let anchor = items[target];

                let before = move_item(&items, source, target, DropPosition::Before).unwrap();
                let d = before.iter().position(|c| *c == dragged).unwrap();
                assert_eq!(before[d + 1], anchor);

                let after = move_item(&items, source, target, DropPosition::After).unwrap();
                let d = after.iter().position(|c| *c == dragged).unwrap();
                assert_eq!(after[d - 1], anchor);
            }
        }
    }

    #[test]
    fn test_out_of_range() {
        assert_eq!(
            move_item(&letters(), 4, 0, DropPosition::Before),
            Err(OrderingError::IndexOutOfRange { index: 4, len: 4 })
        );
        assert!(move_item::<char>(&[], 0, 0, DropPosition::After).is_err());
    }

    #[test]
    fn test_suggested_position() {
        assert_eq!(suggested_position(0, 3), DropPosition::After);
        assert_eq!(suggested_position(3, 0), DropPosition::Before);
    }

    #[test]
    fn test_assign_contiguous() {
        let ids: Vec<DocumentId> = (0..3).map(|_| DocumentId::generate()).collect();
        let batch = assign_contiguous(ids.clone());

        assert_eq!(batch.len(), 3);
        for (index, assignment) in batch.iter().enumerate() {
            assert_eq!(assignment.id, ids[index]);
            assert_eq!(assignment.order, index as i64);
        }
    }

    #[test]
    fn test_drop_position_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&DropPosition::Before).unwrap(),
            "\"before\""
        );
        let after: DropPosition = serde_json::from_str("\"after\"").unwrap();
        assert_eq!(after, DropPosition::After);
    }
}
