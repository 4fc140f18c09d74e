// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the four subcommands and all their flags:
//
//   ingest     CSV → filtered, split, chunked → vector_store/
//   ask        one question → answer + source complaint ids
//   evaluate   fixed question set → rag_evaluation_results.csv
//   demo-data  write a synthetic data/complaints.csv
//
// Every flag has a default, so each command runs bare. The
// model endpoint can also come from the environment
// (OPENAI_API_KEY, OPENAI_BASE_URL, RAG_MODEL).

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::ingest_use_case::{ChunkingConfig, IngestConfig};
use crate::data::chunker::DEFAULT_SEPARATORS;
use crate::data::loader::ColumnMap;
use crate::llm::client::LlmConfig;
use crate::llm::generation::RetryConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the vector index from the complaint CSV
    Ingest(IngestArgs),

    /// Answer one question from the indexed complaints
    Ask(AskArgs),

    /// Run the evaluation question set and save the answers as CSV
    Evaluate(EvaluateArgs),

    /// Write a small synthetic complaint CSV to try the pipeline
    DemoData(DemoDataArgs),
}

// ─── ingest ───────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct IngestArgs {
    /// Complaint export to read
    #[arg(long, default_value = "data/complaints.csv")]
    pub source: String,

    /// Directory the index is written to (existing contents are replaced)
    #[arg(long, default_value = "vector_store")]
    pub index_dir: String,

    /// Column holding the complaint narrative
    #[arg(long, default_value = "Consumer complaint narrative")]
    pub text_column: String,

    /// Column used for the product filter and for stratification
    #[arg(long, default_value = "Product")]
    pub label_column: String,

    /// Products to keep, comma separated (case-insensitive)
    #[arg(
        long,
        value_delimiter = ',',
        default_values = ["Credit card", "Personal loan", "Savings account", "Money transfers"]
    )]
    pub products: Vec<String>,

    /// Keep every product instead of the --products list
    #[arg(long)]
    pub all_products: bool,

    /// Fraction of rows held out of the index for evaluation
    #[arg(long, default_value_t = 0.2)]
    pub held_out_fraction: f64,

    /// Seed for the held-out sample
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Fall back to a random split when a product has a single row
    #[arg(long)]
    pub allow_unstratified: bool,

    /// Maximum characters per chunk
    #[arg(long, default_value_t = 1000)]
    pub chunk_size: usize,

    /// Characters shared between neighbouring chunks
    #[arg(long, default_value_t = 200)]
    pub chunk_overlap: usize,

    /// Chunks per index call
    #[arg(long, default_value_t = 128)]
    pub batch_size: usize,

    /// Leave "XXXX" redaction masks in the narratives
    #[arg(long)]
    pub keep_redactions: bool,
}

impl From<IngestArgs> for IngestConfig {
    fn from(a: IngestArgs) -> Self {
        let carried = ColumnMap::default().carried;
        IngestConfig {
            source_path:        a.source,
            index_dir:          a.index_dir,
            columns:            ColumnMap { text: a.text_column, labels: vec![a.label_column], carried },
            allowed_products:   if a.all_products { Vec::new() } else { a.products },
            held_out_fraction:  a.held_out_fraction,
            seed:               a.seed,
            allow_unstratified: a.allow_unstratified,
            mask_redactions:    !a.keep_redactions,
            chunking:           ChunkingConfig {
                chunk_size:    a.chunk_size,
                chunk_overlap: a.chunk_overlap,
                separators:    DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
            },
            batch_size:         a.batch_size,
        }
    }
}

// ─── shared by ask / evaluate ─────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct QaArgs {
    /// Directory written by `ingest`
    #[arg(long, default_value = "vector_store")]
    pub index_dir: String,

    /// Number of complaint excerpts given to the model
    #[arg(long, default_value_t = 3)]
    pub top_k: usize,

    /// Chat model name
    #[arg(long, env = "RAG_MODEL", default_value = "gpt-4o-mini")]
    pub model: String,

    /// OpenAI-compatible API base URL
    #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com/v1")]
    pub base_url: String,

    /// API key sent as a bearer token
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[arg(long, default_value_t = 0.1)]
    pub temperature: f64,

    /// Upper bound on generated tokens per answer
    #[arg(long, default_value_t = 200)]
    pub max_tokens: u32,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 60)]
    pub timeout_secs: u64,

    /// Total generation attempts per question
    #[arg(long, default_value_t = 3)]
    pub max_attempts: u32,
}

impl From<&QaArgs> for LlmConfig {
    fn from(a: &QaArgs) -> Self {
        LlmConfig {
            base_url:     a.base_url.clone(),
            model:        a.model.clone(),
            api_key:      a.api_key.clone(),
            temperature:  a.temperature,
            max_tokens:   a.max_tokens,
            timeout_secs: a.timeout_secs,
        }
    }
}

impl From<&QaArgs> for RetryConfig {
    fn from(a: &QaArgs) -> Self {
        RetryConfig { max_attempts: a.max_attempts, ..RetryConfig::default() }
    }
}

// ─── ask ──────────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct AskArgs {
    /// The question to answer
    #[arg(long)]
    pub question: String,

    #[command(flatten)]
    pub qa: QaArgs,

    /// Reveal the answer word by word with this delay (0 prints at once)
    #[arg(long, default_value_t = 0)]
    pub reveal_ms: u64,
}

// ─── evaluate ─────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    #[command(flatten)]
    pub qa: QaArgs,

    /// File with one question per line (default: built-in question set)
    #[arg(long)]
    pub questions: Option<PathBuf>,

    /// Where to write the results table
    #[arg(long, default_value = "rag_evaluation_results.csv")]
    pub output: PathBuf,
}

// ─── demo-data ────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct DemoDataArgs {
    /// Where to write the synthetic CSV
    #[arg(long, default_value = "data/complaints.csv")]
    pub output: PathBuf,

    /// Copies of each complaint template
    #[arg(long, default_value_t = 20)]
    pub repeat: usize,
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_ingest_defaults_match_config_defaults() {
        let cli = Cli::try_parse_from(["complaint-rag", "ingest"]).unwrap();
        let Commands::Ingest(args) = cli.command else { panic!("expected ingest") };

        let config   = IngestConfig::from(args);
        let defaults = IngestConfig::default();
        assert_eq!(config.source_path, defaults.source_path);
        assert_eq!(config.index_dir, defaults.index_dir);
        assert_eq!(config.allowed_products, defaults.allowed_products);
        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.chunking.chunk_overlap, 200);
        assert_eq!(config.batch_size, 128);
        assert!(config.mask_redactions);
    }

    #[test]
    fn test_products_flag_and_all_products() {
        let cli = Cli::try_parse_from([
            "complaint-rag", "ingest", "--products", "Mortgage,Student loan",
        ])
        .unwrap();
        let Commands::Ingest(args) = cli.command else { panic!("expected ingest") };
        assert_eq!(args.products, vec!["Mortgage", "Student loan"]);

        let cli = Cli::try_parse_from(["complaint-rag", "ingest", "--all-products"]).unwrap();
        let Commands::Ingest(args) = cli.command else { panic!("expected ingest") };
        assert!(IngestConfig::from(args).allowed_products.is_empty());
    }

    #[test]
    fn test_ask_requires_question() {
        assert!(Cli::try_parse_from(["complaint-rag", "ask"]).is_err());

        let cli = Cli::try_parse_from([
            "complaint-rag", "ask", "--question", "Why fees?", "--max-attempts", "5",
        ])
        .unwrap();
        let Commands::Ask(args) = cli.command else { panic!("expected ask") };
        assert_eq!(args.qa.top_k, 3);
        assert_eq!(RetryConfig::from(&args.qa).max_attempts, 5);
    }
}
