// ============================================================
// Layer 2 — IngestUseCase
// ============================================================
// Orchestrates the ingestion pipeline in order:
//
//   Step 1: Load complaint rows          (Layer 4 - data)
//   Step 2: Filter products / empty text (Layer 4 - data)
//   Step 3: Stratified held-out split    (Layer 4 - data)
//   Step 4: Clean narratives             (Layer 4 - data)
//   Step 5: Chunk into overlapping docs  (Layer 4 - data)
//   ── index handle opened here ──
//   Step 6: Write held_out.csv + config  (index directory)
//   Step 7: Submit batches to the index  (Layer 4 → Layer 6)
//
// Steps 1–5 (`prepare`) touch nothing on disk, so a bad CSV
// or a failed split never clears an existing index. Only
// once the corpus is ready does the caller open the index
// and hand it to `commit`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::data::{
    batcher::{BatchReport, IndexBatcher},
    chunker::{RecursiveChunker, DEFAULT_SEPARATORS},
    filter::{FilterReport, RecordFilter},
    loader::{write_records, ColumnMap},
    preprocessor::Preprocessor,
    splitter::{random_split, stratified_split, SampleSplit},
};
use crate::domain::document::Document;
use crate::domain::error::RagError;
use crate::domain::record::ComplaintRecord;
use crate::domain::traits::{RecordSource, VectorIndex};

pub const HELD_OUT_FILE: &str = "held_out.csv";
pub const CONFIG_FILE: &str = "ingest_config.json";

// ─── Configuration ────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    pub chunk_size:    usize,
    pub chunk_overlap: usize,
    pub separators:    Vec<String>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size:    1000,
            chunk_overlap: 200,
            separators:    DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Everything one ingestion run needs. Saved next to the index as
/// `ingest_config.json` so `ask` can report how the index was built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    pub source_path:        String,
    pub index_dir:          String,
    pub columns:            ColumnMap,
    pub allowed_products:   Vec<String>,
    pub held_out_fraction:  f64,
    pub seed:               u64,
    pub allow_unstratified: bool,
    pub mask_redactions:    bool,
    pub chunking:           ChunkingConfig,
    pub batch_size:         usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            source_path:        "data/complaints.csv".to_string(),
            index_dir:          "vector_store".to_string(),
            columns:            ColumnMap::default(),
            allowed_products:   vec![
                "Credit card".to_string(),
                "Personal loan".to_string(),
                "Savings account".to_string(),
                "Money transfers".to_string(),
            ],
            held_out_fraction:  0.2,
            seed:               42,
            allow_unstratified: false,
            mask_redactions:    true,
            chunking:           ChunkingConfig::default(),
            batch_size:         128,
        }
    }
}

impl IngestConfig {
    /// The column the split is stratified on: the first label column.
    pub fn stratify_field(&self) -> Result<&str> {
        self.columns
            .labels
            .first()
            .map(String::as_str)
            .ok_or_else(|| RagError::config("at least one label column is required").into())
    }
}

// ─── Outputs ──────────────────────────────────────────────────────────────────
/// Chunks ready for indexing plus the rows set aside for evaluation.
#[derive(Debug, Clone)]
pub struct PreparedCorpus {
    pub filter:     FilterReport,
    pub kept:       usize,
    pub held_out:   Vec<ComplaintRecord>,
    pub chunks:     Vec<Document>,
    pub stratified: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IngestReport {
    pub filter:        FilterReport,
    pub kept:          usize,
    pub held_out:      usize,
    pub stratified:    bool,
    pub chunks:        usize,
    pub batches:       BatchReport,
    pub held_out_path: PathBuf,
}

// ─── IngestUseCase ────────────────────────────────────────────────────────────
pub struct IngestUseCase {
    config: IngestConfig,
}

impl IngestUseCase {
    pub fn new(config: IngestConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Load → filter → split → clean → chunk. Nothing is written.
    pub fn prepare<S: RecordSource + ?Sized>(&self, source: &S) -> Result<PreparedCorpus> {
        let cfg = &self.config;

        // Validate the chunker and batcher settings before any heavy work
        let chunker = RecursiveChunker::new(
            cfg.chunking.chunk_size,
            cfg.chunking.chunk_overlap,
            &cfg.chunking.separators,
        )?;
        IndexBatcher::new(cfg.batch_size)?;

        // ── Step 1: Load ──────────────────────────────────────────────────────
        let records = source.load_all().context("loading complaint records")?;

        // ── Step 2: Filter ────────────────────────────────────────────────────
        let category = cfg.stratify_field()?;
        let (records, filter) = RecordFilter::new(category, &cfg.allowed_products).apply(records);
        tracing::info!(
            "Filtered {} rows: {} kept, {} outside product list, {} without narrative",
            filter.input,
            filter.kept,
            filter.dropped_category,
            filter.dropped_empty_text
        );
        if records.is_empty() {
            return Err(RagError::config(
                "no complaints left after filtering; check the product list and column names",
            )
            .into());
        }

        // ── Step 3: Split ─────────────────────────────────────────────────────
        let (split, stratified) = self.split(records, category)?;
        tracing::info!(
            "Split complete. Indexed rows: {}, held-out rows: {}",
            split.kept.len(),
            split.held_out.len()
        );
        tracing::debug!("Split covered all {} filtered rows", split.total());

        // ── Step 4 + 5: Clean and chunk ───────────────────────────────────────
        let mut preprocessor = Preprocessor::new();
        if !cfg.mask_redactions {
            preprocessor = preprocessor.keep_redactions();
        }

        let kept = split.kept.len();
        let documents: Vec<Document> = split
            .kept
            .into_iter()
            .map(Document::from)
            .map(|mut doc| {
                doc.content = preprocessor.clean(&doc.content);
                doc
            })
            .collect();

        let chunks = chunker.chunk_all(&documents);
        tracing::info!(
            "Created {} chunks from {} narratives (size {}, overlap {})",
            chunks.len(),
            documents.len(),
            chunker.max_size(),
            chunker.overlap()
        );

        Ok(PreparedCorpus { filter, kept, held_out: split.held_out, chunks, stratified })
    }

    /// Write the side files and submit every chunk through `index`.
    pub fn commit<I: VectorIndex + ?Sized>(
        &self,
        corpus: PreparedCorpus,
        index:  &mut I,
    ) -> Result<IngestReport> {
        let cfg = &self.config;
        let dir = Path::new(&cfg.index_dir);
        fs::create_dir_all(dir)
            .with_context(|| format!("creating index directory '{}'", dir.display()))?;

        // ── Step 6: Held-out rows and config ──────────────────────────────────
        let held_out_path = dir.join(HELD_OUT_FILE);
        write_records(&held_out_path, &corpus.held_out, &cfg.columns)
            .with_context(|| format!("writing held-out rows to '{}'", held_out_path.display()))?;

        let config_path = dir.join(CONFIG_FILE);
        fs::write(&config_path, serde_json::to_string_pretty(cfg)?)
            .with_context(|| format!("writing '{}'", config_path.display()))?;
        tracing::debug!("Saved ingest config to '{}'", config_path.display());

        // ── Step 7: Index ─────────────────────────────────────────────────────
        let batcher = IndexBatcher::new(cfg.batch_size)?;
        tracing::info!(
            "Indexing {} chunks in {} batch(es) of up to {}",
            corpus.chunks.len(),
            batcher.batch_count(corpus.chunks.len()),
            cfg.batch_size
        );
        let batches = batcher.submit(index, &corpus.chunks).context("indexing chunks")?;

        Ok(IngestReport {
            filter:     corpus.filter,
            kept:       corpus.kept,
            held_out:   corpus.held_out.len(),
            stratified: corpus.stratified,
            chunks:     corpus.chunks.len(),
            batches,
            held_out_path,
        })
    }

    fn split(
        &self,
        records:  Vec<ComplaintRecord>,
        category: &str,
    ) -> Result<(SampleSplit<ComplaintRecord>, bool)> {
        let cfg = &self.config;

        if !cfg.allow_unstratified {
            let split = stratified_split(records, |r| r.field(category), cfg.held_out_fraction, cfg.seed)
                .context("stratified split (pass --allow-unstratified to fall back to a random split)")?;
            return Ok((split, true));
        }

        match stratified_split(records.clone(), |r| r.field(category), cfg.held_out_fraction, cfg.seed) {
            Ok(split) => Ok((split, true)),
            Err(RagError::Configuration(reason)) => {
                tracing::warn!("Stratified split not possible ({}); using a random split", reason);
                Ok((random_split(records, cfg.held_out_fraction, cfg.seed)?, false))
            }
            Err(e) => Err(e.into()),
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::CsvLoader;
    use crate::domain::error::Result as RagResult;

    struct FixedSource(Vec<ComplaintRecord>);

    impl RecordSource for FixedSource {
        fn load_all(&self) -> RagResult<Vec<ComplaintRecord>> {
            Ok(self.0.clone())
        }
    }

    #[derive(Default)]
    struct MemoryIndex {
        batches: Vec<usize>,
        docs:    Vec<Document>,
    }

    impl VectorIndex for MemoryIndex {
        fn index(&mut self, batch: &[Document]) -> RagResult<()> {
            self.batches.push(batch.len());
            self.docs.extend_from_slice(batch);
            Ok(())
        }

        fn query(&self, _text: &str, k: usize) -> RagResult<Vec<Document>> {
            Ok(self.docs.iter().take(k).cloned().collect())
        }

        fn len(&self) -> usize {
            self.docs.len()
        }
    }

    fn complaints(product: &str, count: usize, start_id: usize) -> Vec<ComplaintRecord> {
        (0..count)
            .map(|i| {
                ComplaintRecord::new(format!("Complaint about {product} number {i}. XXXX charged me twice."))
                    .with_field("Product", product)
                    .with_field("Complaint ID", (start_id + i).to_string())
            })
            .collect()
    }

    fn ingest<I: VectorIndex>(
        use_case: &IngestUseCase,
        source:   &FixedSource,
        index:    &mut I,
    ) -> Result<IngestReport> {
        let corpus = use_case.prepare(source)?;
        use_case.commit(corpus, index)
    }

    fn config_in(dir: &Path) -> IngestConfig {
        IngestConfig {
            index_dir:  dir.join("store").display().to_string(),
            batch_size: 4,
            ..IngestConfig::default()
        }
    }

    #[test]
    fn test_end_to_end_with_fakes() {
        let dir = tempfile::tempdir().unwrap();
        let mut records = complaints("Credit card", 10, 0);
        records.extend(complaints("Money transfers", 5, 100));
        records.extend(complaints("Mortgage", 3, 200));
        records.push(ComplaintRecord::new("   ").with_field("Product", "Credit card"));

        let use_case  = IngestUseCase::new(config_in(dir.path()));
        let mut index = MemoryIndex::default();
        let report    = ingest(&use_case, &FixedSource(records), &mut index).unwrap();

        assert_eq!(report.filter.dropped_category, 3);
        assert_eq!(report.filter.dropped_empty_text, 1);
        assert_eq!(report.held_out, 3);
        assert_eq!(report.kept, 12);
        assert!(report.stratified);
        assert_eq!(report.chunks, 12);
        assert_eq!(index.batches, vec![4, 4, 4]);
        assert_eq!(report.batches.batches, 3);

        // narratives were cleaned and metadata carried
        assert!(index.docs.iter().all(|d| d.content.contains("[redacted]")));
        assert!(index.docs.iter().all(|d| d.get("Complaint ID").is_some()));
    }

    #[test]
    fn test_held_out_and_config_written() {
        let dir      = tempfile::tempdir().unwrap();
        let config   = config_in(dir.path());
        let use_case = IngestUseCase::new(config.clone());
        let mut records = complaints("Credit card", 10, 0);
        records.extend(complaints("Savings account", 10, 50));

        let report = ingest(&use_case, &FixedSource(records), &mut MemoryIndex::default()).unwrap();

        let held = CsvLoader::new(&report.held_out_path, config.columns.clone()).load_all().unwrap();
        assert_eq!(held.len(), 4);
        assert_eq!(held.iter().filter(|r| r.field("Product") == Some("Credit card")).count(), 2);

        let saved: IngestConfig = serde_json::from_str(
            &fs::read_to_string(Path::new(&config.index_dir).join(CONFIG_FILE)).unwrap(),
        )
        .unwrap();
        assert_eq!(saved.chunking.chunk_size, 1000);
        assert_eq!(saved.seed, 42);
    }

    #[test]
    fn test_long_narratives_are_chunked() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.chunking.chunk_size    = 100;
        config.chunking.chunk_overlap = 20;

        let long = "The bank kept charging a monthly fee. ".repeat(20);
        let records: Vec<ComplaintRecord> = (0..5)
            .map(|i| {
                ComplaintRecord::new(long.clone())
                    .with_field("Product", "Personal loan")
                    .with_field("Complaint ID", i.to_string())
            })
            .collect();

        let mut index = MemoryIndex::default();
        let report = ingest(&IngestUseCase::new(config), &FixedSource(records), &mut index).unwrap();

        assert!(report.chunks > report.kept);
        assert!(index.docs.iter().all(|d| d.content.chars().count() <= 100));
    }

    #[test]
    fn test_singleton_label_fails_unless_fallback_allowed() {
        let dir = tempfile::tempdir().unwrap();
        let mut records = complaints("Credit card", 8, 0);
        records.extend(complaints("Savings account", 1, 99));

        let strict = IngestUseCase::new(config_in(dir.path()));
        let err = strict.prepare(&FixedSource(records.clone())).unwrap_err();
        assert!(matches!(err.downcast_ref::<RagError>(), Some(RagError::Configuration(_))));

        let lenient = IngestUseCase::new(IngestConfig { allow_unstratified: true, ..config_in(dir.path()) });
        let corpus = lenient.prepare(&FixedSource(records)).unwrap();
        assert!(!corpus.stratified);
        assert_eq!(corpus.held_out.len(), 2);
        assert_eq!(corpus.kept, 7);
    }

    #[test]
    fn test_nothing_after_filter_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = IngestUseCase::new(config_in(dir.path()))
            .prepare(&FixedSource(complaints("Mortgage", 4, 0)))
            .unwrap_err();
        assert!(err.to_string().contains("no complaints left"));
    }

    #[test]
    fn test_invalid_chunking_rejected_before_loading() {
        struct PanickingSource;
        impl RecordSource for PanickingSource {
            fn load_all(&self) -> RagResult<Vec<ComplaintRecord>> {
                panic!("should not be called");
            }
        }

        let mut config = IngestConfig::default();
        config.chunking.chunk_overlap = config.chunking.chunk_size;
        assert!(IngestUseCase::new(config).prepare(&PanickingSource).is_err());
    }

    #[test]
    fn test_missing_source_surfaces_missing_resource() {
        let loader = CsvLoader::new("no/such/file.csv", ColumnMap::default());
        let err = IngestUseCase::new(IngestConfig::default()).prepare(&loader).unwrap_err();
        assert!(matches!(err.downcast_ref::<RagError>(), Some(RagError::MissingResource { .. })));
    }
}
