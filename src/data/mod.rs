// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between the raw complaint export and the index:
//
//   complaints.csv
//       │
//       ▼
//   CsvLoader         → rows mapped to ComplaintRecords
//       │
//       ▼
//   RecordFilter      → allowed products, non-empty narratives
//       │
//       ▼
//   stratified_split  → kept (indexed) / held_out (evaluation)
//       │
//       ▼
//   Preprocessor      → normalised narrative text
//       │
//       ▼
//   RecursiveChunker  → overlapping chunks ≤ max_size chars
//       │
//       ▼
//   IndexBatcher      → sequential batches into the index
//
// Each module does one step and is tested on its own.

/// Reads the complaint CSV into records
pub mod loader;

/// Drops rows outside the product allow-list or without text
pub mod filter;

/// Stratified (and plain random) seeded train/held-out split
pub mod splitter;

/// Normalises narrative text before chunking
pub mod preprocessor;

/// Splits documents into overlapping bounded chunks
pub mod chunker;

/// Submits chunks to the index in sequential batches
pub mod batcher;

/// Synthetic complaints for trying the pipeline out
pub mod demo;
