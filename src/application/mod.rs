// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates the other layers to accomplish one
// goal each: build the index, answer a question, or run the
// evaluation question set.
//
// Rules for this layer:
//   - No chunking, sampling or HTTP code here
//   - No printing here (that's Layer 1)
//   - Collaborators (record source, index, model) are passed
//     in through the domain traits, never constructed here
//
// Errors leave this layer as anyhow::Error with context; the
// underlying RagError stays reachable through downcast_ref.

/// Load → filter → split → chunk → index
pub mod ingest_use_case;

/// Retrieve → prompt → generate, with retry
pub mod ask_use_case;

/// Fixed question set → results CSV
pub mod evaluate_use_case;
