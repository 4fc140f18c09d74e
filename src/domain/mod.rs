// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain structs, the error taxonomy and the traits that the
// other layers implement. No file I/O, no HTTP, no CSV parsing
// happens in here.

// A complaint row after column mapping
pub mod record;

// Text + metadata handed to the vector index
pub mod document;

// RagError and the crate-wide Result alias
pub mod error;

// Seams to the external collaborators
pub mod traits;
