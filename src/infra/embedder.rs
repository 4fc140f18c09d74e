// ============================================================
// Layer 6 — Hashing Embedder
// ============================================================
// A stand-in embedding function for the local index: each
// lower-cased word (and each adjacent word pair) is hashed
// into one of `dimensions` buckets with a ±1 sign, and the
// vector is L2-normalised. Texts that share vocabulary end up
// with a high cosine similarity.
//
// This is NOT a language model embedding. It exists so the
// pipeline runs without network access or model downloads.
//
// The fingerprint is the embedding of a fixed reference text;
// an index stores it and refuses to be queried by an embedder
// that produces a different one.
//
// Buckets come from std's DefaultHasher, whose output is not
// guaranteed across Rust releases. A binary built with another
// toolchain may compute a different fingerprint; the index then
// has to be rebuilt with `ingest`.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

pub const DEFAULT_DIMENSIONS: usize = 384;

const REFERENCE_TEXT: &str = "credit card late fee money transfer delayed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashingEmbedder {
    dimensions: usize,
    seed:       u64,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize, seed: u64) -> Self {
        Self { dimensions: dimensions.max(1), seed }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        let words = tokenize(text);

        for word in &words {
            self.add_feature(&mut vector, &[word.as_str()]);
        }
        for pair in words.windows(2) {
            self.add_feature(&mut vector, &[pair[0].as_str(), pair[1].as_str()]);
        }

        normalize(&mut vector);
        vector
    }

    pub fn fingerprint(&self) -> u64 {
        let reference = self.embed(REFERENCE_TEXT);
        let mut hasher = DefaultHasher::new();
        self.dimensions.hash(&mut hasher);
        for v in reference {
            v.to_bits().hash(&mut hasher);
        }
        hasher.finish()
    }

    fn add_feature(&self, vector: &mut [f32], parts: &[&str]) {
        let mut hasher = DefaultHasher::new();
        self.seed.hash(&mut hasher);
        parts.hash(&mut hasher);
        let h = hasher.finish();

        let bucket = (h % self.dimensions as u64) as usize;
        let sign   = if (h >> 63) == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign;
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSIONS, 0)
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() > 1)
        .map(str::to_lowercase)
        .collect()
}

fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}

/// Dot product of two normalised vectors. Mismatched lengths score 0.
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
