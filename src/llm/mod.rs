// ============================================================
// Layer 5 — Language Model Layer
// ============================================================
// Everything that talks to, or prepares text for, the model:
//
//   prompt.rs      — question + retrieved excerpts → prompt text
//
//   client.rs      — OpenAI-compatible chat completions client
//                    (one HTTP request per call, failures
//                    classified as transient or permanent)
//
//   generation.rs  — RetryPolicy and generate(): bounded retry
//                    with exponential backoff around any
//                    answer-producing closure
//
// The application layer composes these; nothing here knows
// about CSV files or the vector index.

/// Prompt template for retrieval-augmented answers
pub mod prompt;

/// Blocking HTTP client for chat completion endpoints
pub mod client;

/// Retry policy and the generation wrapper
pub mod generation;
