// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Concerns used by several layers that belong to none of them:
//
//   embedder.rs     — HashingEmbedder
//                     Deterministic feature-hashing embeddings,
//                     no model download required. The
//                     fingerprint ties an index to the exact
//                     embedder settings it was built with.
//
//   index_store.rs  — LocalVectorIndex
//                     Directory-backed VectorIndex: JSON-lines
//                     chunk store plus a manifest, brute-force
//                     cosine search on query.
//
//   results.rs      — Evaluation results table
//                     Writes one CSV row per evaluated question
//                     (answer, source ids, error).
//
// Swapping any of these (e.g. a hosted vector database) only
// means providing another VectorIndex implementation.

/// Feature-hashing text embedder
pub mod embedder;

/// Local on-disk vector index
pub mod index_store;

/// Evaluation results CSV writer
pub mod results;
