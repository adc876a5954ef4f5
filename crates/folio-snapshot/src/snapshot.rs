//! Snapshot data structures.

use chrono::{DateTime, Utc};
use folio_util::Identifier;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Unique identifier for a snapshot.
///
/// Ids are monotonic within a process, so comparing two ids tells which
/// snapshot was captured later.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotId(String);

impl SnapshotId {
    /// Mint a new snapshot ID.
    pub fn new() -> Self {
        Self(Identifier::snapshot())
    }

    /// Create a snapshot ID from a string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the ID as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SnapshotId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

/// Identifier of the document (chapter) a history belongs to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for DocumentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// How a snapshot came to be and whether retention may remove it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotKind {
    /// Captured by the auto-capture timer; subject to cap and age eviction.
    #[default]
    Auto,
    /// Marked by the user; never evicted.
    Milestone,
}

impl SnapshotKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotKind::Auto => "auto",
            SnapshotKind::Milestone => "milestone",
        }
    }
}

impl fmt::Display for SnapshotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Full copy of a document's content at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Unique identifier for this snapshot.
    pub id: SnapshotId,

    /// Document this snapshot belongs to.
    pub document_id: DocumentId,

    /// When the snapshot was captured.
    pub timestamp: DateTime<Utc>,

    /// Document title at capture time.
    pub title: String,

    /// Full document text at capture time.
    pub content: String,

    /// Auto or milestone.
    #[serde(default)]
    pub kind: SnapshotKind,
}

impl Snapshot {
    /// Create a new snapshot with a freshly minted id.
    pub fn new(
        document_id: DocumentId,
        timestamp: DateTime<Utc>,
        title: impl Into<String>,
        content: impl Into<String>,
        kind: SnapshotKind,
    ) -> Self {
        Self {
            id: SnapshotId::new(),
            document_id,
            timestamp,
            title: title.into(),
            content: content.into(),
            kind,
        }
    }

    pub fn is_milestone(&self) -> bool {
        self.kind == SnapshotKind::Milestone
    }

    pub fn is_auto(&self) -> bool {
        self.kind == SnapshotKind::Auto
    }

    /// Size of the stored content in bytes.
    pub fn size_bytes(&self) -> usize {
        self.content.len()
    }

    /// Whitespace-separated word count, as shown on the timeline.
    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }

    /// Presentation order: newest timestamp first, later id first on ties.
    pub fn newest_first(a: &Snapshot, b: &Snapshot) -> Ordering {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| b.id.cmp(&a.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn snapshot_ids_order_by_creation() {
        let first = SnapshotId::new();
        let second = SnapshotId::new();
        assert!(first < second);
        assert!(first.as_str().starts_with("snp_"));
    }

    #[test]
    fn newest_first_breaks_timestamp_ties_by_id() {
        let doc = DocumentId::from("doc1");
        let older = Snapshot::new(doc.clone(), at(0), "t", "a", SnapshotKind::Auto);
        let tie_first = Snapshot::new(doc.clone(), at(10), "t", "b", SnapshotKind::Auto);
        let tie_second = Snapshot::new(doc, at(10), "t", "c", SnapshotKind::Milestone);

        let mut all = vec![older, tie_first, tie_second];
        all.sort_by(Snapshot::newest_first);

        let contents: Vec<&str> = all.iter().map(|s| s.content.as_str()).collect();
        assert_eq!(contents, vec!["c", "b", "a"]);
    }

    #[test]
    fn counts_words_and_bytes() {
        let snapshot = Snapshot::new(
            DocumentId::from("doc1"),
            at(0),
            "Chapter 1",
            "It was a dark\nand stormy night.",
            SnapshotKind::Auto,
        );
        assert_eq!(snapshot.word_count(), 7);
        assert_eq!(snapshot.size_bytes(), 31);
        assert!(snapshot.is_auto());
        assert!(!snapshot.is_milestone());
    }

    #[test]
    fn empty_content_is_a_valid_snapshot() {
        let snapshot = Snapshot::new(DocumentId::from("d"), at(0), "", "", SnapshotKind::Auto);
        assert_eq!(snapshot.word_count(), 0);
        assert_eq!(snapshot.size_bytes(), 0);
    }

    #[test]
    fn kind_serializes_lowercase_and_defaults_to_auto() {
        assert_eq!(
            serde_json::to_string(&SnapshotKind::Milestone).unwrap(),
            "\"milestone\""
        );

        let json = r#"{
            "id": "snp_01hqxyz",
            "document_id": "doc1",
            "timestamp": "2024-01-01T00:00:00Z",
            "title": "t",
            "content": "c"
        }"#;
        let snapshot: Snapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.kind, SnapshotKind::Auto);
        assert_eq!(snapshot.document_id.as_str(), "doc1");
    }
}
