// ============================================================
// Layer 3 — Document Domain Type
// ============================================================
// The unit handed to the vector index: a piece of text plus
// the string metadata carried from the complaint it came from.
//
// A chunk is also a Document — its content is a contiguous
// piece of the parent's content and its metadata is an exact
// copy of the parent's.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::record::ComplaintRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Text that gets embedded and shown as a source excerpt
    pub content: String,

    /// Labels and identifiers (product, complaint id, issue, ...)
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Document {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content:  content.into(),
            metadata: BTreeMap::new(),
        }
    }

    #[cfg(test)]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Build a chunk of this document: new content, same metadata.
    pub fn derive(&self, content: impl Into<String>) -> Self {
        Self {
            content:  content.into(),
            metadata: self.metadata.clone(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }
}

/// One complaint row becomes exactly one Document.
impl From<ComplaintRecord> for Document {
    fn from(record: ComplaintRecord) -> Self {
        let mut doc = Document::new(record.narrative);
        doc.metadata = record.fields;
        doc
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_chunk_keeps_metadata() {
        let doc   = Document::new("full narrative").with_metadata("Product", "Credit card");
        let chunk = doc.derive("narrative");
        assert_eq!(chunk.content, "narrative");
        assert_eq!(chunk.metadata, doc.metadata);
    }

    #[test]
    fn test_record_converts_one_to_one() {
        let record = ComplaintRecord::new("late fee charged")
            .with_field("Product", "Credit card")
            .with_field("Complaint ID", "42");
        let doc = Document::from(record);
        assert_eq!(doc.content, "late fee charged");
        assert_eq!(doc.get("Complaint ID"), Some("42"));
        assert_eq!(doc.metadata.len(), 2);
    }
}
