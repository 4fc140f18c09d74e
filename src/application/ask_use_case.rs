// ============================================================
// Layer 2 — Ask Use Case
// ============================================================
// Retrieval-augmented answering:
//   1. Retrieve the top-k complaint chunks for the question
//   2. Render the prompt from the question and the chunks
//   3. Complete the prompt with the language model
//
// The whole chain runs inside the generation wrapper, so a
// rate-limited or briefly unavailable model is retried with
// backoff; anything else fails the question at once.

use crate::domain::document::Document;
use crate::domain::error::{RagError, Result};
use crate::domain::traits::{Answer, LanguageModel, QuestionAnswerer, VectorIndex};
use crate::llm::generation::{generate, RetryPolicy};
use crate::llm::prompt::PromptTemplate;

pub const DEFAULT_TOP_K: usize = 3;

pub struct AskUseCase<I, L> {
    index:  I,
    model:  L,
    prompt: PromptTemplate,
    policy: RetryPolicy<RagError>,
    top_k:  usize,
}

impl<I: VectorIndex, L: LanguageModel> AskUseCase<I, L> {
    pub fn new(index: I, model: L) -> Self {
        Self {
            index,
            model,
            prompt: PromptTemplate::default(),
            policy: RetryPolicy::default(),
            top_k:  DEFAULT_TOP_K,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy<RagError>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }
}

impl<I: VectorIndex, L: LanguageModel> QuestionAnswerer for AskUseCase<I, L> {
    fn answer(&self, question: &str) -> Result<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RagError::config("question must not be empty"));
        }

        let mut sources: Vec<Document> = Vec::new();
        let text = generate(&self.policy, question, || {
            let retrieved = self.index.query(question, self.top_k)?;
            if retrieved.is_empty() {
                tracing::warn!("No complaint excerpts retrieved for '{}'", question);
            }
            let prompt = self.prompt.render(question, &retrieved);
            let text   = self.model.complete(&prompt)?;
            sources = retrieved;
            Ok(text)
        })?;

        tracing::debug!("Answered '{}' from {} excerpt(s)", question, sources.len());
        Ok(Answer { text, sources })
    }
}
