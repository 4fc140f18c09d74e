// ============================================================
// Layer 4 — Record Filter
// ============================================================
// Narrows the raw export to the rows worth indexing:
//   - category (e.g. Product) must be in the allow-list,
//     compared case-insensitively after trimming
//   - narrative must contain something besides whitespace
//
// An empty allow-list keeps every category.

use crate::domain::record::ComplaintRecord;

#[derive(Debug, Clone)]
pub struct RecordFilter {
    category_field: String,
    allowed:        Vec<String>,
}

/// How many rows each rule removed, for the ingestion log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterReport {
    pub input:              usize,
    pub dropped_category:   usize,
    pub dropped_empty_text: usize,
    pub kept:               usize,
}

impl RecordFilter {
    pub fn new<S: AsRef<str>>(category_field: impl Into<String>, allowed: &[S]) -> Self {
        Self {
            category_field: category_field.into(),
            allowed:        allowed.iter().map(|s| normalise(s.as_ref())).collect(),
        }
    }

    pub fn accepts_category(&self, record: &ComplaintRecord) -> bool {
        if self.allowed.is_empty() {
            return true;
        }
        record
            .field(&self.category_field)
            .map(normalise)
            .map_or(false, |value| self.allowed.contains(&value))
    }

    pub fn apply(&self, records: Vec<ComplaintRecord>) -> (Vec<ComplaintRecord>, FilterReport) {
        let mut report = FilterReport { input: records.len(), ..FilterReport::default() };

        let kept: Vec<ComplaintRecord> = records
            .into_iter()
            .filter(|r| {
                if !self.accepts_category(r) {
                    report.dropped_category += 1;
                    false
                } else if !r.has_narrative() {
                    report.dropped_empty_text += 1;
                    false
                } else {
                    true
                }
            })
            .collect();

        report.kept = kept.len();
        (kept, report)
    }
}

fn normalise(value: &str) -> String {
    value.trim().to_lowercase()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn record(product: &str, text: &str) -> ComplaintRecord {
        ComplaintRecord::new(text).with_field("Product", product)
    }

    #[test]
    fn test_filters_category_and_empty_text() {
        let filter = RecordFilter::new("Product", &["Credit card", "Personal loan"]);
        let input = vec![
            record("Credit card", "charged twice"),
            record(" credit CARD ", "fee"),
            record("Mortgage", "escrow problem"),
            record("Personal loan", "   "),
            record("Personal loan", "prepayment penalty"),
        ];

        let (kept, report) = filter.apply(input);

        assert_eq!(kept.len(), 3);
        assert_eq!(
            report,
            FilterReport { input: 5, dropped_category: 1, dropped_empty_text: 1, kept: 3 }
        );
    }

    #[test]
    fn test_empty_allow_list_keeps_every_category() {
        let filter = RecordFilter::new::<&str>("Product", &[]);
        let (kept, _) = filter.apply(vec![record("Mortgage", "a"), record("Other", "b")]);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_missing_category_field_is_dropped() {
        let filter = RecordFilter::new("Product", &["Credit card"]);
        let (kept, report) = filter.apply(vec![ComplaintRecord::new("no product column")]);
        assert!(kept.is_empty());
        assert_eq!(report.dropped_category, 1);
    }
}
