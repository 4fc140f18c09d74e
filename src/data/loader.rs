// ============================================================
// Layer 4 — CSV Complaint Loader
// ============================================================
// Reads the complaint export with the csv crate and maps each
// row into a ComplaintRecord.
//
// Column mapping (all names configurable):
//   text column      → ComplaintRecord::narrative
//   label columns    → ComplaintRecord::fields (must exist)
//   carried columns  → ComplaintRecord::fields (if present)
//
// A missing file is a MissingResource error, not an empty
// corpus: ingesting nothing would silently wipe the index.
// A missing text or label column in the header is a
// configuration error. Empty carried values are skipped so
// they do not end up as blank metadata.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::domain::error::{RagError, Result};
use crate::domain::record::ComplaintRecord;
use crate::domain::traits::RecordSource;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMap {
    pub text:    String,
    pub labels:  Vec<String>,
    pub carried: Vec<String>,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            text:    "Consumer complaint narrative".to_string(),
            labels:  vec!["Product".to_string()],
            carried: vec!["Complaint ID".to_string(), "Issue".to_string()],
        }
    }
}

pub struct CsvLoader {
    path:    PathBuf,
    columns: ColumnMap,
}

impl CsvLoader {
    pub fn new(path: impl Into<PathBuf>, columns: ColumnMap) -> Self {
        Self { path: path.into(), columns }
    }
}

impl RecordSource for CsvLoader {
    fn load_all(&self) -> Result<Vec<ComplaintRecord>> {
        if !self.path.is_file() {
            return Err(RagError::missing("source CSV", &self.path));
        }

        let file = File::open(&self.path)
            .map_err(|e| RagError::io(format!("cannot open '{}'", self.path.display()), e))?;
        let records = read_records(file, &self.columns)?;

        tracing::info!(
            "Loaded {} rows from '{}'",
            records.len(),
            self.path.display()
        );
        Ok(records)
    }
}

/// Parse CSV from any reader. Split out so tests can feed in-memory text.
pub fn read_records<R: std::io::Read>(reader: R, columns: &ColumnMap) -> Result<Vec<ComplaintRecord>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let position = |name: &str| headers.iter().position(|h| h.trim() == name);

    let text_idx = position(&columns.text)
        .ok_or_else(|| RagError::config(format!("text column '{}' not in CSV header", columns.text)))?;

    let mut field_idx: Vec<(String, usize)> = Vec::new();
    for label in &columns.labels {
        let idx = position(label)
            .ok_or_else(|| RagError::config(format!("label column '{label}' not in CSV header")))?;
        field_idx.push((label.clone(), idx));
    }
    for name in &columns.carried {
        match position(name) {
            Some(idx) => field_idx.push((name.clone(), idx)),
            None => tracing::debug!("Carried column '{}' absent; skipping", name),
        }
    }

    let mut out = Vec::new();
    for row in csv_reader.records() {
        let row = row?;
        let narrative = row.get(text_idx).unwrap_or_default().to_string();

        let fields: BTreeMap<String, String> = field_idx
            .iter()
            .filter_map(|(name, idx)| {
                row.get(*idx)
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(|v| (name.clone(), v.to_string()))
            })
            .collect();

        out.push(ComplaintRecord { narrative, fields });
    }

    Ok(out)
}

/// Write records back out with the same column layout, e.g. the held-out
/// split. Columns are: carried columns, label columns, then text.
pub fn write_records(path: &Path, records: &[ComplaintRecord], columns: &ColumnMap) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;

    let mut header: Vec<&str> = Vec::new();
    for name in columns.carried.iter().chain(&columns.labels) {
        if !header.contains(&name.as_str()) {
            header.push(name);
        }
    }
    let field_count = header.len();
    header.push(&columns.text);
    writer.write_record(&header)?;

    for record in records {
        let mut row: Vec<&str> = header[..field_count]
            .iter()
            .map(|name| record.field(name).unwrap_or_default())
            .collect();
        row.push(&record.narrative);
        writer.write_record(&row)?;
    }

    writer.flush().map_err(|e| RagError::io(format!("cannot flush '{}'", path.display()), e))?;
    tracing::debug!("Wrote {} rows to '{}'", records.len(), path.display());
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Complaint ID,Product,Issue,Consumer complaint narrative
1,Credit card,Fees,\"I was charged a late fee,
even though I paid on time.\"
2,Savings account,,
3,Money transfers,Delay,Transfer stuck for 5 days.
";

    #[test]
    fn test_maps_columns_and_quoted_multiline_text() {
        let records = read_records(SAMPLE.as_bytes(), &ColumnMap::default()).unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(
            records[0].narrative,
            "I was charged a late fee,\neven though I paid on time."
        );
        assert_eq!(records[0].field("Product"), Some("Credit card"));
        assert_eq!(records[0].field("Complaint ID"), Some("1"));
        assert_eq!(records[0].field("Issue"), Some("Fees"));
    }

    #[test]
    fn test_empty_values_are_not_carried() {
        let records = read_records(SAMPLE.as_bytes(), &ColumnMap::default()).unwrap();
        assert_eq!(records[1].field("Issue"), None);
        assert!(!records[1].has_narrative());
    }

    #[test]
    fn test_missing_text_column_is_configuration_error() {
        let columns = ColumnMap { text: "text".into(), ..ColumnMap::default() };
        let err = read_records(SAMPLE.as_bytes(), &columns).unwrap_err();
        assert!(matches!(err, RagError::Configuration(_)));
    }

    #[test]
    fn test_missing_file_is_missing_resource() {
        let loader = CsvLoader::new("does/not/exist.csv", ColumnMap::default());
        assert!(matches!(loader.load_all(), Err(RagError::MissingResource { .. })));
    }

    #[test]
    fn test_written_records_load_back() {
        let dir     = tempfile::tempdir().unwrap();
        let path    = dir.path().join("held_out.csv");
        let columns = ColumnMap::default();
        let records = read_records(SAMPLE.as_bytes(), &columns).unwrap();

        write_records(&path, &records, &columns).unwrap();
        let back = CsvLoader::new(&path, columns).load_all().unwrap();
        assert_eq!(back, records);
    }

    #[test]
    fn test_loads_from_disk() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("complaints.csv");
        std::fs::write(&path, SAMPLE).unwrap();

        let records = CsvLoader::new(&path, ColumnMap::default()).load_all().unwrap();
        assert_eq!(records.len(), 3);
    }
}
