// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The seams between this crate and its external collaborators.
// The application layer is generic over these, so tests pass
// in-memory fakes and the CLI passes the real implementations:
//
//   RecordSource      ← CsvLoader
//   VectorIndex       ← LocalVectorIndex
//   LanguageModel     ← ChatCompletionClient
//   QuestionAnswerer  ← AskUseCase

use crate::domain::document::Document;
use crate::domain::error::Result;
use crate::domain::record::ComplaintRecord;

// ─── RecordSource ─────────────────────────────────────────────────────────────
/// Anything that can produce the raw complaint rows for one ingestion run.
pub trait RecordSource {
    fn load_all(&self) -> Result<Vec<ComplaintRecord>>;
}

// ─── VectorIndex ──────────────────────────────────────────────────────────────
/// Opaque similarity-search store. Embedding and persistence are its concern.
pub trait VectorIndex {
    /// Add one batch. When this returns Ok the batch is committed.
    fn index(&mut self, batch: &[Document]) -> Result<()>;

    /// Up to `k` documents, most relevant first.
    fn query(&self, text: &str, k: usize) -> Result<Vec<Document>>;

    /// Number of documents currently indexed.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ─── LanguageModel ────────────────────────────────────────────────────────────
/// A completion endpoint. Failures must classify themselves through
/// `RagError::is_transient` so the generation wrapper can decide to retry.
pub trait LanguageModel {
    fn complete(&self, prompt: &str) -> Result<String>;
}

impl<T: LanguageModel + ?Sized> LanguageModel for &T {
    fn complete(&self, prompt: &str) -> Result<String> {
        (**self).complete(prompt)
    }
}

// ─── QuestionAnswerer ─────────────────────────────────────────────────────────
/// Full question → answer flow, used by the evaluation run.
pub trait QuestionAnswerer {
    fn answer(&self, question: &str) -> Result<Answer>;
}

/// A generated answer and the excerpts it was conditioned on.
#[derive(Debug, Clone)]
pub struct Answer {
    pub text:    String,
    pub sources: Vec<Document>,
}

impl Answer {
    /// Identifier values of the sources, in retrieval order, skipping
    /// sources that lack the field.
    pub fn source_ids(&self, id_field: &str) -> Vec<String> {
        self.sources
            .iter()
            .filter_map(|d| d.get(id_field).map(str::to_string))
            .collect()
    }
}
