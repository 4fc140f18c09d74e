// ============================================================
// Layer 6 — Evaluation Results Writer
// ============================================================
// Records each evaluated question to a CSV table.
//
// Output file: rag_evaluation_results.csv (by default)
//
// Example:
//   Question,Generated Answer,Sources,Error
//   Why are Money Transfers being delayed?,Transfers are held ...,3;17,
//   Do customers like the Customer Service?,,,"generation failed ..."
//
// Sources are the retrieved complaint ids joined with ';'.
// A failed question still gets a row: empty answer, error set.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::domain::error::{RagError, Result};

/// One row of the evaluation table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRow {
    #[serde(rename = "Question")]
    pub question: String,

    #[serde(rename = "Generated Answer")]
    pub answer: String,

    #[serde(rename = "Sources")]
    pub sources: String,

    #[serde(rename = "Error")]
    pub error: String,
}

impl EvaluationRow {
    pub fn answered(question: impl Into<String>, answer: impl Into<String>, source_ids: &[String]) -> Self {
        Self {
            question: question.into(),
            answer:   answer.into(),
            sources:  source_ids.join(";"),
            error:    String::new(),
        }
    }

    pub fn failed(question: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer:   String::new(),
            sources:  String::new(),
            error:    error.into(),
        }
    }

    pub fn is_failure(&self) -> bool {
        !self.error.is_empty()
    }
}

pub struct ResultsWriter {
    path: PathBuf,
}

impl ResultsWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write all rows, replacing any previous file.
    pub fn write_all(&self, rows: &[EvaluationRow]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| RagError::io(format!("cannot create '{}'", parent.display()), e))?;
        }

        let mut writer = csv::Writer::from_path(&self.path)?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer
            .flush()
            .map_err(|e| RagError::io(format!("cannot flush '{}'", self.path.display()), e))?;

        tracing::debug!("Wrote {} evaluation rows to '{}'", rows.len(), self.path.display());
        Ok(())
    }
}
