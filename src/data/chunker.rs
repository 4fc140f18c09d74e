// ============================================================
// Layer 4 — Recursive Text Chunker
// ============================================================
// Splits complaint narratives into overlapping pieces of at
// most `max_size` characters, preferring natural boundaries.
//
// Separators are tried coarsest first:
//   "\n\n" → paragraphs
//   "\n"   → lines
//   " "    → words
//   ""     → anywhere (always succeeds)
//
// For each piece of text:
//   1. Pick the first separator that occurs in it
//   2. Cut so every separator starts the piece after it
//   3. Greedily merge small pieces into windows ≤ max_size
//   4. Recurse into any single piece that is still too big,
//      using only the finer separators
//
// When a window is emitted, pieces are dropped from its front
// until at most `overlap` characters remain; those open the
// next window, so context near a boundary appears in both.
//
// Lengths are counted in chars, not bytes, so multi-byte text
// never gets cut in the middle of a code point.
//
// Reference: Rust Book §8 (Strings), §13 (Iterators)

use std::collections::VecDeque;

use crate::domain::document::Document;
use crate::domain::error::{RagError, Result};

pub const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    /// Upper bound on chunk length in characters
    max_size: usize,
    /// Characters carried from the end of one chunk into the next
    overlap: usize,
    /// Coarsest first; always ends with ""
    separators: Vec<String>,
}

impl RecursiveChunker {
    /// Fails if `max_size` is zero or `overlap >= max_size`; with such a
    /// window the merge step could never make progress.
    pub fn new<S: AsRef<str>>(max_size: usize, overlap: usize, separators: &[S]) -> Result<Self> {
        if max_size == 0 {
            return Err(RagError::config("chunk size must be greater than zero"));
        }
        if overlap >= max_size {
            return Err(RagError::config(format!(
                "chunk overlap ({overlap}) must be less than chunk size ({max_size})"
            )));
        }

        let mut separators: Vec<String> = separators.iter().map(|s| s.as_ref().to_string()).collect();
        if separators.last().map_or(true, |s| !s.is_empty()) {
            separators.push(String::new());
        }

        Ok(Self { max_size, overlap, separators })
    }

    #[cfg(test)]
    pub fn with_default_separators(max_size: usize, overlap: usize) -> Result<Self> {
        Self::new(max_size, overlap, &DEFAULT_SEPARATORS)
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split a document; every chunk carries a copy of its metadata.
    pub fn chunk(&self, document: &Document) -> Vec<Document> {
        self.chunk_text(&document.content)
            .into_iter()
            .map(|text| document.derive(text))
            .collect()
    }

    pub fn chunk_all(&self, documents: &[Document]) -> Vec<Document> {
        documents.iter().flat_map(|d| self.chunk(d)).collect()
    }

    pub fn chunk_text(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        if char_len(text) <= self.max_size {
            return vec![text.to_string()];
        }

        let mut chunks = Vec::new();
        self.split_recursive(text, &self.separators, &mut chunks);
        chunks
    }

    fn split_recursive(&self, text: &str, separators: &[String], out: &mut Vec<String>) {
        let (separator, finer) = pick_separator(text, separators);
        let pieces = split_keeping_separator(text, separator);

        let mut pending: Vec<&str> = Vec::new();
        for piece in pieces {
            if char_len(piece) < self.max_size {
                pending.push(piece);
                continue;
            }

            if !pending.is_empty() {
                self.merge(&pending, out);
                pending.clear();
            }
            if finer.is_empty() {
                // only single characters reach here, when max_size is 1
                out.extend(hard_cut(piece, self.max_size));
            } else {
                self.split_recursive(piece, finer, out);
            }
        }

        if !pending.is_empty() {
            self.merge(&pending, out);
        }
    }

    /// Greedy window merge. Each piece is shorter than max_size.
    fn merge(&self, pieces: &[&str], out: &mut Vec<String>) {
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);

            if total + len > self.max_size && !window.is_empty() {
                emit(&window, out);

                while total > self.overlap || (total + len > self.max_size && total > 0) {
                    match window.pop_front() {
                        Some(front) => total -= char_len(front),
                        None => break,
                    }
                }
            }

            window.push_back(piece);
            total += len;
        }

        emit(&window, out);
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// First separator present in `text` and the finer ones after it.
/// The empty separator always matches.
fn pick_separator<'s>(text: &str, separators: &'s [String]) -> (&'s str, &'s [String]) {
    for (i, sep) in separators.iter().enumerate() {
        if sep.is_empty() || text.contains(sep.as_str()) {
            return (sep.as_str(), &separators[i + 1..]);
        }
    }
    ("", &[])
}

/// Split so that each occurrence of `separator` begins the following piece.
/// The empty separator splits between every character. Empty pieces are dropped.
fn split_keeping_separator<'t>(text: &'t str, separator: &str) -> Vec<&'t str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0usize;
    for (idx, _) in text.match_indices(separator) {
        if idx > start {
            pieces.push(&text[start..idx]);
        }
        start = idx;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

fn emit(window: &VecDeque<&str>, out: &mut Vec<String>) {
    let joined: String = window.iter().copied().collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

fn hard_cut(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(size).map(|c| c.iter().collect()).collect()
}
