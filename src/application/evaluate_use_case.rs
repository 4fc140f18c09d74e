// ============================================================
// Layer 2 — Evaluate Use Case
// ============================================================
// Runs a fixed list of analyst questions through the full
// question-answering flow and records each outcome.
//
// A failed question does not stop the run: it is logged,
// recorded with its error, and the next question is asked.

use anyhow::{Context, Result};
use std::path::Path;

use crate::domain::traits::QuestionAnswerer;
use crate::infra::results::{EvaluationRow, ResultsWriter};

pub const DEFAULT_QUESTIONS: [&str; 5] = [
    "What are the complaints about Credit Cards?",
    "Why are Money Transfers being delayed?",
    "What is the issue with Savings Accounts?",
    "Do customers like the Customer Service?",
    "What happens if I pay off my loan early?",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationSummary {
    pub asked:    usize,
    pub answered: usize,
    pub failed:   usize,
}

pub struct EvaluateUseCase {
    questions: Vec<String>,
    id_field:  String,
}

impl EvaluateUseCase {
    pub fn new(questions: Vec<String>, id_field: impl Into<String>) -> Self {
        Self { questions, id_field: id_field.into() }
    }

    pub fn with_default_questions(id_field: impl Into<String>) -> Self {
        Self::new(DEFAULT_QUESTIONS.iter().map(|q| q.to_string()).collect(), id_field)
    }

    /// Ask every question, in order. Never fails as a whole.
    pub fn run<Q: QuestionAnswerer + ?Sized>(&self, qa: &Q) -> Vec<EvaluationRow> {
        self.questions
            .iter()
            .enumerate()
            .map(|(i, question)| {
                tracing::info!("Asking {}/{}: {}", i + 1, self.questions.len(), question);
                match qa.answer(question) {
                    Ok(answer) => {
                        tracing::info!("Answer: {}", answer.text);
                        EvaluationRow::answered(
                            question.as_str(),
                            answer.text.as_str(),
                            &answer.source_ids(&self.id_field),
                        )
                    }
                    Err(e) => {
                        tracing::error!("Failed: {}", e);
                        EvaluationRow::failed(question.as_str(), e.to_string())
                    }
                }
            })
            .collect()
    }

    /// `run`, then write the table.
    pub fn execute<Q: QuestionAnswerer + ?Sized>(
        &self,
        qa:     &Q,
        writer: &ResultsWriter,
    ) -> Result<EvaluationSummary> {
        let rows = self.run(qa);
        writer
            .write_all(&rows)
            .with_context(|| format!("writing results to '{}'", writer.path().display()))?;

        let failed = rows.iter().filter(|r| r.is_failure()).count();
        Ok(EvaluationSummary { asked: rows.len(), answered: rows.len() - failed, failed })
    }
}

/// One question per line; blank lines and lines starting with '#' are skipped.
pub fn load_questions(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading questions from '{}'", path.display()))?;

    let questions: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect();

    if questions.is_empty() {
        anyhow::bail!("no questions found in '{}'", path.display());
    }
    Ok(questions)
}
