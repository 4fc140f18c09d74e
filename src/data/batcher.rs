// ============================================================
// Layer 4 — Index Batcher
// ============================================================
// Feeds chunks to the vector index in fixed-size batches.
//
// Batches go through ONE index handle, strictly one after
// another: each `index()` call must return before the next
// batch is submitted, so the store never sees interleaved or
// half-written batches. A failed batch stops the run; the
// batches before it stay committed.
//
//   chunks: [c0 c1 c2 c3 c4 c5 c6]   batch_size = 3
//   batch 1: [c0 c1 c2] → index()
//   batch 2: [c3 c4 c5] → index()
//   batch 3: [c6]       → index()

use crate::domain::document::Document;
use crate::domain::error::{RagError, Result};
use crate::domain::traits::VectorIndex;

pub struct IndexBatcher {
    batch_size: usize,
}

/// What a run submitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub batches:   usize,
    pub documents: usize,
}

impl IndexBatcher {
    pub fn new(batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(RagError::config("index batch size must be greater than zero"));
        }
        Ok(Self { batch_size })
    }

    pub fn batch_count(&self, documents: usize) -> usize {
        documents.div_ceil(self.batch_size)
    }

    /// Submit every chunk, batch by batch, through the one `index` handle.
    pub fn submit<I: VectorIndex + ?Sized>(
        &self,
        index:  &mut I,
        chunks: &[Document],
    ) -> Result<BatchReport> {
        let total = self.batch_count(chunks.len());
        let mut report = BatchReport::default();

        for (i, batch) in chunks.chunks(self.batch_size).enumerate() {
            index.index(batch)?;
            report.batches   += 1;
            report.documents += batch.len();

            tracing::debug!(
                "Indexed batch {}/{} ({} chunks, {} total)",
                i + 1,
                total,
                batch.len(),
                report.documents
            );
        }

        Ok(report)
    }
}
