//! Data models for Prose
//!
//! Defines the `Document` record, its identifier, the draft payload used for
//! create/update, and the title/preview derivation rules.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Title used when the first line of content yields nothing
pub const UNTITLED: &str = "Untitled Document";

/// Maximum number of characters taken for an inferred title
pub const TITLE_MAX_CHARS: usize = 50;

/// Maximum number of characters of content kept in a preview
pub const PREVIEW_MAX_CHARS: usize = 50;

/// Opaque document identifier, assigned by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Generate a fresh identifier
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// First eight characters, for compact display
    pub fn short(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for DocumentId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// A persisted document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier
    pub id: DocumentId,
    /// Display title
    pub title: String,
    /// Full text body
    pub content: String,
    /// Short excerpt of the content for list rendering
    pub preview: String,
    /// Whether the user chose the title (freezes title inference)
    pub title_manually_set: bool,
    /// Sort key, lower values first
    pub display_order: i64,
    /// When this document was created
    pub created_at: DateTime<Utc>,
    /// When content or metadata last changed
    pub updated_at: DateTime<Utc>,
}

/// Payload for create and update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentDraft {
    pub title: String,
    pub content: String,
    pub preview: String,
    pub title_manually_set: bool,
}

impl DocumentDraft {
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        preview: impl Into<String>,
        title_manually_set: bool,
    ) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            preview: preview.into(),
            title_manually_set,
        }
    }

    /// Draft with an inferred title and derived preview
    pub fn inferred(content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            title: infer_title(&content),
            preview: make_preview(&content),
            content,
            title_manually_set: false,
        }
    }

    /// Draft with a user-chosen title and derived preview
    pub fn titled(title: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            title: title.into(),
            preview: make_preview(&content),
            content,
            title_manually_set: true,
        }
    }
}

/// One `(id, order)` pair of a reorder batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAssignment {
    pub id: DocumentId,
    pub order: i64,
}

impl OrderAssignment {
    pub fn new(id: DocumentId, order: i64) -> Self {
        Self { id, order }
    }
}

/// Infer a title from the first line of content
///
/// Takes at most `TITLE_MAX_CHARS` characters of the first line and falls
/// back to `UNTITLED` when that is blank.
pub fn infer_title(content: &str) -> String {
    let first_line = content.split('\n').next().unwrap_or("");
    let first_line = first_line.strip_suffix('\r').unwrap_or(first_line);
    let title: String = first_line.chars().take(TITLE_MAX_CHARS).collect();

    if title.trim().is_empty() {
        UNTITLED.to_string()
    } else {
        title
    }
}

/// Build the list preview: leading characters of content plus `...` when cut
pub fn make_preview(content: &str) -> String {
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(PREVIEW_MAX_CHARS).collect();

    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_title_first_line() {
        assert_eq!(infer_title("Hello\nworld"), "Hello");
        assert_eq!(infer_title("Windows\r\nline"), "Windows");
    }

    #[test]
    fn test_infer_title_truncates_to_fifty_chars() {
        let long = "a".repeat(80);
        assert_eq!(infer_title(&long).chars().count(), 50);

        // Character based, not byte based
        let accented = "é".repeat(60);
        assert_eq!(infer_title(&accented), "é".repeat(50));
    }

    #[test]
    fn test_infer_title_fallback() {
        assert_eq!(infer_title(""), UNTITLED);
        assert_eq!(infer_title("\nsecond line"), UNTITLED);
        assert_eq!(infer_title("   \nbody"), UNTITLED);
    }

    #[test]
    fn test_make_preview() {
        assert_eq!(make_preview("short"), "short");

        let exact = "b".repeat(50);
        assert_eq!(make_preview(&exact), exact);

        let long = format!("{}tail", "c".repeat(50));
        assert_eq!(make_preview(&long), format!("{}...", "c".repeat(50)));
    }

    #[test]
    fn test_preview_spans_lines() {
        assert_eq!(make_preview("line one\nline two"), "line one\nline two");
    }

    #[test]
    fn test_inferred_draft() {
        let draft = DocumentDraft::inferred("Groceries\n- milk");
        assert_eq!(draft.title, "Groceries");
        assert_eq!(draft.preview, "Groceries\n- milk");
        assert!(!draft.title_manually_set);
    }

    #[test]
    fn test_titled_draft() {
        let draft = DocumentDraft::titled("Shopping", "Groceries\n- milk");
        assert_eq!(draft.title, "Shopping");
        assert!(draft.title_manually_set);
    }

    #[test]
    fn test_document_id_roundtrip_display() {
        let id = DocumentId::generate();
        let parsed: DocumentId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert_eq!(id.short().len(), 8);
        assert!("not-a-uuid".parse::<DocumentId>().is_err());
    }

    #[test]
    fn test_serialized_shape() {
        let id = DocumentId::generate();
        let json = serde_json::to_value(OrderAssignment::new(id, 3)).unwrap();
        assert_eq!(json["id"], serde_json::json!(id.to_string()));
        assert_eq!(json["order"], 3);

        let draft = serde_json::to_value(DocumentDraft::titled("T", "body")).unwrap();
        assert_eq!(draft["title_manually_set"], true);
    }
}
