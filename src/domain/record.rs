// ============================================================
// Layer 3 — ComplaintRecord Domain Type
// ============================================================
// One row of the source CSV after column mapping:
//   - narrative: the consumer's free-text complaint
//   - fields:    every other mapped column (labels such as
//                Product or risk_category, identifiers such
//                as Complaint ID or Issue)
//
// Records are never mutated after loading; the pipeline only
// filters, partitions and converts them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplaintRecord {
    pub narrative: String,
    pub fields:    BTreeMap<String, String>,
}

impl ComplaintRecord {
    pub fn new(narrative: impl Into<String>) -> Self {
        Self {
            narrative: narrative.into(),
            fields:    BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Value of a label or identifier column, if the row had one.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn has_narrative(&self) -> bool {
        !self.narrative.trim().is_empty()
    }
}
