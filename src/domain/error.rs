// ============================================================
// Layer 3 — Error Taxonomy
// ============================================================
// Every library-level component returns RagError. The
// application and CLI layers wrap it in anyhow with context.
//
//   Configuration     → bad parameters, surfaced immediately
//   TransientUpstream → rate limit / 5xx / network, retried
//   Upstream          → permanent upstream failure, not retried
//   Generation        → retries exhausted or permanent failure
//   MissingResource   → source file or index not on disk
//
// Only the generation wrapper (llm::generation) recovers from
// anything, and only from TransientUpstream.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RagError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("transient upstream failure: {0}")]
    TransientUpstream(String),

    #[error("upstream failure: {0}")]
    Upstream(String),

    #[error("generation failed after {attempts} attempt(s): {message}")]
    Generation { attempts: u32, message: String },

    #[error("{what} not found at '{}'", path.display())]
    MissingResource { what: String, path: PathBuf },

    #[error("I/O error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RagError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn missing(what: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::MissingResource {
            what: what.into(),
            path: path.into(),
        }
    }

    /// Whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientUpstream(_))
    }
}

pub type Result<T> = std::result::Result<T, RagError>;

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transient_upstream_is_retryable() {
        assert!(RagError::TransientUpstream("429".into()).is_transient());
        assert!(!RagError::Upstream("401".into()).is_transient());
        assert!(!RagError::config("bad").is_transient());
        assert!(!RagError::Generation { attempts: 3, message: "x".into() }.is_transient());
    }

    #[test]
    fn test_missing_resource_names_the_path() {
        let err = RagError::missing("source CSV", "data/complaints.csv");
        assert_eq!(err.to_string(), "source CSV not found at 'data/complaints.csv'");
    }
}
