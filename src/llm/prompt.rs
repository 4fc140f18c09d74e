// ============================================================
// Layer 5 — Prompt Template
// ============================================================
// Builds the text sent to the language model from the question
// and the retrieved complaint excerpts. Excerpts are joined
// with a blank line, in retrieval order.

use crate::domain::document::Document;

pub const NO_ANSWER: &str = "I don't know";

pub struct PromptTemplate {
    instructions: String,
}

impl PromptTemplate {
    pub fn new(instructions: impl Into<String>) -> Self {
        Self { instructions: instructions.into() }
    }

    pub fn render(&self, question: &str, context: &[Document]) -> String {
        format!(
            "{}\n\nContext: {}\n\nQuestion: {}\n\nAnswer:",
            self.instructions,
            format_context(context),
            question.trim()
        )
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(format!(
            "You are a financial analyst assistant for a complaint-analysis team. \
             Use the customer complaint excerpts below to answer the question. \
             If the context does not contain the answer, say \"{NO_ANSWER}\"."
        ))
    }
}

pub fn format_context(docs: &[Document]) -> String {
    docs.iter()
        .map(|d| d.content.trim())
        .collect::<Vec<_>>()
        .join("\n\n")
}
