// ============================================================
// Layer 6 — Local Vector Index
// ============================================================
// Default VectorIndex: brute-force cosine search over hashed
// embeddings, persisted in a directory.
//
// Files:
//   vector_store/
//     manifest.json       ← format version, dimensions,
//                           embedder fingerprint, chunk count
//     chunks.jsonl        ← one {content, metadata, vector}
//                           object per line, append-only
//     ingest_config.json  ← how the index was built
//     held_out.csv        ← evaluation rows from the split
//
// One handle lives for the whole ingestion run. Each batch is
// appended to chunks.jsonl and synced, then the manifest is
// rewritten through a temp file + rename, so after any
// successful index() the directory is consistent.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::domain::document::Document;
use crate::domain::error::{RagError, Result};
use crate::domain::traits::VectorIndex;
use crate::infra::embedder::{cosine, HashingEmbedder};

const FORMAT_VERSION: u32 = 1;
const MANIFEST: &str = "manifest.json";
const CHUNKS: &str = "chunks.jsonl";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Manifest {
    pub version:              u32,
    pub dimensions:           usize,
    pub embedder_fingerprint: u64,
    pub chunk_count:          usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredChunk {
    #[serde(flatten)]
    document: Document,
    vector:   Vec<f32>,
}

pub struct LocalVectorIndex {
    dir:      PathBuf,
    embedder: HashingEmbedder,
    manifest: Manifest,
    entries:  Vec<StoredChunk>,
}

impl LocalVectorIndex {
    /// Start a fresh index in `dir`, removing whatever was there.
    pub fn create(dir: impl Into<PathBuf>, embedder: HashingEmbedder) -> Result<Self> {
        let dir = dir.into();
        if dir.exists() {
            tracing::info!("Clearing existing index at '{}'", dir.display());
            fs::remove_dir_all(&dir)
                .map_err(|e| RagError::io(format!("cannot clear '{}'", dir.display()), e))?;
        }
        fs::create_dir_all(&dir)
            .map_err(|e| RagError::io(format!("cannot create '{}'", dir.display()), e))?;
        File::create(dir.join(CHUNKS))
            .map_err(|e| RagError::io("cannot create chunk file", e))?;

        let index = Self {
            manifest: Manifest {
                version:              FORMAT_VERSION,
                dimensions:           embedder.dimensions(),
                embedder_fingerprint: embedder.fingerprint(),
                chunk_count:          0,
            },
            dir,
            embedder,
            entries: Vec::new(),
        };
        index.write_manifest()?;
        Ok(index)
    }

    /// Open an index written by `create` + `index`.
    pub fn open(dir: impl Into<PathBuf>, embedder: HashingEmbedder) -> Result<Self> {
        let dir = dir.into();
        let manifest_path = dir.join(MANIFEST);
        if !manifest_path.is_file() {
            return Err(RagError::missing("vector index", &dir));
        }

        let manifest: Manifest = read_json(&manifest_path)?;
        if manifest.version != FORMAT_VERSION {
            return Err(RagError::config(format!(
                "index format version {} is not supported (expected {FORMAT_VERSION}); re-run ingest",
                manifest.version
            )));
        }
        if manifest.embedder_fingerprint != embedder.fingerprint() {
            return Err(RagError::config(
                "index was built with a different embedder configuration or by a different build \
                 of this tool; re-run ingest",
            ));
        }

        let file = File::open(dir.join(CHUNKS))
            .map_err(|e| RagError::io(format!("cannot open chunks in '{}'", dir.display()), e))?;

        let mut entries = Vec::with_capacity(manifest.chunk_count);
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|e| RagError::io("cannot read chunk file", e))?;
            if line.trim().is_empty() {
                continue;
            }
            entries.push(serde_json::from_str::<StoredChunk>(&line)?);
        }

        if entries.len() != manifest.chunk_count {
            tracing::warn!(
                "Manifest lists {} chunks but {} were read; using what is on disk",
                manifest.chunk_count,
                entries.len()
            );
        }

        tracing::info!("Opened index '{}' with {} chunks", dir.display(), entries.len());
        Ok(Self { dir, embedder, manifest, entries })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Read a JSON file stored next to the index, e.g. the ingest config.
    pub fn read_side_file<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let path = self.dir.join(name);
        if !path.is_file() {
            return Err(RagError::missing(name, &path));
        }
        read_json(&path)
    }

    fn write_manifest(&self) -> Result<()> {
        let tmp  = self.dir.join(format!("{MANIFEST}.tmp"));
        let dest = self.dir.join(MANIFEST);
        fs::write(&tmp, serde_json::to_vec_pretty(&self.manifest)?)
            .map_err(|e| RagError::io("cannot write manifest", e))?;
        fs::rename(&tmp, &dest).map_err(|e| RagError::io("cannot replace manifest", e))
    }
}

impl VectorIndex for LocalVectorIndex {
    fn index(&mut self, batch: &[Document]) -> Result<()> {
        let stored: Vec<StoredChunk> = batch
            .iter()
            .map(|doc| StoredChunk {
                vector:   self.embedder.embed(&doc.content),
                document: doc.clone(),
            })
            .collect();

        let file = OpenOptions::new()
            .append(true)
            .open(self.dir.join(CHUNKS))
            .map_err(|e| RagError::io("cannot open chunk file for append", e))?;
        let mut writer = BufWriter::new(file);
        for chunk in &stored {
            serde_json::to_writer(&mut writer, chunk)?;
            writer.write_all(b"\n").map_err(|e| RagError::io("cannot append chunk", e))?;
        }
        let file = writer
            .into_inner()
            .map_err(|e| RagError::io("cannot flush chunk file", e.into_error()))?;
        file.sync_data().map_err(|e| RagError::io("cannot sync chunk file", e))?;

        self.entries.extend(stored);
        self.manifest.chunk_count = self.entries.len();
        self.write_manifest()
    }

    fn query(&self, text: &str, k: usize) -> Result<Vec<Document>> {
        if k == 0 || self.entries.is_empty() {
            return Ok(Vec::new());
        }

        let q = self.embedder.embed(text);
        let mut scored: Vec<(f32, &StoredChunk)> = self
            .entries
            .iter()
            .map(|e| (cosine(&q, &e.vector), e))
            .collect();

        // stable sort: equal scores keep insertion order
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(_, e)| e.document.clone())
            .collect())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)
        .map_err(|e| RagError::io(format!("cannot read '{}'", path.display()), e))?;
    Ok(serde_json::from_str(&text)?)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn complaint(id: &str, text: &str) -> Document {
        Document::new(text).with_metadata("Complaint ID", id)
    }

    #[test]
    fn test_query_ranks_by_similarity() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = LocalVectorIndex::create(dir.path().join("store"), HashingEmbedder::default()).unwrap();
        index
            .index(&[
                complaint("1", "Money transfer to Kenya stuck pending for five days"),
                complaint("2", "Credit card late fee charged even though I paid on time"),
                complaint("3", "Savings account advertised APY was not paid"),
            ])
            .unwrap();

        let hits = index.query("why was I charged a late fee on my credit card", 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].get("Complaint ID"), Some("2"));
    }

    #[test]
    fn test_batches_append_and_reopen() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("store");
        {
            let mut index = LocalVectorIndex::create(&path, HashingEmbedder::default()).unwrap();
            index.index(&[complaint("1", "first batch")]).unwrap();
            index.index(&[complaint("2", "second batch"), complaint("3", "more")]).unwrap();
            assert_eq!(index.manifest().chunk_count, 3);
        }

        let reopened = LocalVectorIndex::open(&path, HashingEmbedder::default()).unwrap();
        assert_eq!(reopened.len(), 3);
        assert_eq!(reopened.manifest().chunk_count, 3);
    }

    #[test]
    fn test_create_clears_previous_contents() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("store");
        let mut first = LocalVectorIndex::create(&path, HashingEmbedder::default()).unwrap();
        first.index(&[complaint("1", "old data")]).unwrap();

        let second = LocalVectorIndex::create(&path, HashingEmbedder::default()).unwrap();
        assert!(second.is_empty());
        assert!(LocalVectorIndex::open(&path, HashingEmbedder::default()).unwrap().is_empty());
    }

    #[test]
    fn test_open_missing_index() {
        let dir = tempfile::tempdir().unwrap();
        let err = LocalVectorIndex::open(dir.path().join("nope"), HashingEmbedder::default());
        assert!(matches!(err, Err(RagError::MissingResource { .. })));
    }

    #[test]
    fn test_open_with_other_embedder_is_rejected() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("store");
        LocalVectorIndex::create(&path, HashingEmbedder::new(64, 0)).unwrap();

        let err = LocalVectorIndex::open(&path, HashingEmbedder::new(128, 0));
        assert!(matches!(err, Err(RagError::Configuration(_))));
    }

    #[test]
    fn test_fingerprint_mismatch_asks_for_reingest() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("store");
        LocalVectorIndex::create(&path, HashingEmbedder::new(64, 0)).unwrap();

        let err = LocalVectorIndex::open(&path, HashingEmbedder::new(64, 1)).err().unwrap();
        let message = err.to_string();
        assert!(message.contains("different build"), "{message}");
        assert!(message.contains("re-run ingest"), "{message}");
    }

    #[test]
    fn test_query_empty_index_or_zero_k() {
        let dir   = tempfile::tempdir().unwrap();
        let index = LocalVectorIndex::create(dir.path().join("s"), HashingEmbedder::default()).unwrap();
        assert!(index.query("anything", 3).unwrap().is_empty());
        assert!(index.query("anything", 0).unwrap().is_empty());
    }

    #[test]
    fn test_side_files_round_trip() {
        let dir   = tempfile::tempdir().unwrap();
        let index = LocalVectorIndex::create(dir.path().join("s"), HashingEmbedder::default()).unwrap();
        fs::write(index.dir().join("note.json"), "[1, 2, 3]").unwrap();
        let back: Vec<i32> = index.read_side_file("note.json").unwrap();
        assert_eq!(back, vec![1, 2, 3]);
        assert!(matches!(
            index.read_side_file::<Vec<i32>>("absent.json"),
            Err(RagError::MissingResource { .. })
        ));
    }
}
