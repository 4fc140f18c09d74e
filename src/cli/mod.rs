// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction. Parses arguments with
// clap, builds the concrete collaborators (CSV loader, local
// index, HTTP model client) and hands them to Layer 2.
// Printing happens here and nowhere else.

pub mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::time::Duration;

use commands::{AskArgs, Commands, DemoDataArgs, EvaluateArgs, IngestArgs, QaArgs};

use crate::application::ask_use_case::AskUseCase;
use crate::application::evaluate_use_case::{load_questions, EvaluateUseCase};
use crate::application::ingest_use_case::{IngestConfig, IngestUseCase, CONFIG_FILE};
use crate::data::{demo::demo_records, loader::{write_records, ColumnMap, CsvLoader}};
use crate::domain::error::RagError;
use crate::domain::traits::{QuestionAnswerer, VectorIndex};
use crate::infra::{embedder::HashingEmbedder, index_store::LocalVectorIndex, results::ResultsWriter};
use crate::llm::client::{ChatCompletionClient, LlmConfig};
use crate::llm::generation::RetryConfig;

#[derive(Parser, Debug)]
#[command(
    name = "complaint-rag",
    version,
    about = "Index consumer complaints and answer analyst questions over them."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

type Answerer = AskUseCase<LocalVectorIndex, ChatCompletionClient>;

impl Cli {
    /// Dispatch to the matching handler. Handlers only route and print.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Ingest(args)   => run_ingest(args),
            Commands::Ask(args)      => run_ask(args),
            Commands::Evaluate(args) => run_evaluate(args),
            Commands::DemoData(args) => run_demo_data(args),
        }
    }
}

fn run_ingest(args: IngestArgs) -> Result<()> {
    let config: IngestConfig = args.into();
    tracing::info!("Starting ingestion of '{}'", config.source_path);

    let loader   = CsvLoader::new(&config.source_path, config.columns.clone());
    let use_case = IngestUseCase::new(config);
    let corpus   = use_case.prepare(&loader)?;

    // The old index is cleared only once the new corpus is ready
    let index_dir = &use_case.config().index_dir;
    let mut index = LocalVectorIndex::create(index_dir, HashingEmbedder::default())?;
    let report    = use_case.commit(corpus, &mut index)?;

    println!(
        "Ingestion complete. {} complaints indexed as {} chunks in '{}'.",
        report.kept,
        report.chunks,
        index.dir().display()
    );
    println!(
        "{} complaints held out for evaluation ({}split) in '{}'.",
        report.held_out,
        if report.stratified { "stratified " } else { "random " },
        report.held_out_path.display()
    );
    Ok(())
}

fn run_ask(args: AskArgs) -> Result<()> {
    let (use_case, id_field) = build_answerer(&args.qa)?;

    let answer = match use_case.answer(&args.question) {
        Ok(answer) => answer,
        Err(e @ RagError::Generation { .. }) => {
            eprintln!("Sorry, an answer could not be generated right now. Please try again later.");
            return Err(e.into());
        }
        Err(e) => return Err(e).context("answering question"),
    };

    print!("\nAnswer: ");
    reveal(&answer.text, Duration::from_millis(args.reveal_ms))?;

    let ids = answer.source_ids(&id_field);
    if !ids.is_empty() {
        println!("\nSources ({id_field}): {}", ids.join(", "));
    }
    for (i, doc) in answer.sources.iter().enumerate() {
        println!("  [{}] {}", i + 1, excerpt(&doc.content, 160));
    }
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    let (use_case, id_field) = build_answerer(&args.qa)?;

    let evaluation = match &args.questions {
        Some(path) => EvaluateUseCase::new(load_questions(path)?, id_field),
        None       => EvaluateUseCase::with_default_questions(id_field),
    };

    let writer  = ResultsWriter::new(&args.output);
    let summary = evaluation.execute(&use_case, &writer)?;

    println!(
        "Evaluation complete. {} of {} questions answered. Results saved to '{}'.",
        summary.answered,
        summary.asked,
        writer.path().display()
    );
    Ok(())
}

fn run_demo_data(args: DemoDataArgs) -> Result<()> {
    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating '{}'", parent.display()))?;
    }

    let records = demo_records(args.repeat);
    write_records(&args.output, &records, &ColumnMap::default())?;

    println!("Created demo data at '{}' ({} complaints).", args.output.display(), records.len());
    Ok(())
}

/// Open the index and model client behind `ask` / `evaluate`. Also returns the
/// column that identifies a source complaint.
fn build_answerer(qa: &QaArgs) -> Result<(Answerer, String)> {
    let index = LocalVectorIndex::open(&qa.index_dir, HashingEmbedder::default())
        .context("opening the vector index (run `complaint-rag ingest` first)")?;
    let manifest = index.manifest();
    tracing::info!(
        "Index '{}': {} chunks, {}-dimensional embeddings",
        index.dir().display(),
        manifest.chunk_count,
        manifest.dimensions
    );
    if index.is_empty() {
        tracing::warn!("Index '{}' contains no chunks", qa.index_dir);
    }

    let id_field = match index.read_side_file::<IngestConfig>(CONFIG_FILE) {
        Ok(config) => {
            tracing::debug!(
                "Index built from '{}' (chunk size {}, overlap {})",
                config.source_path,
                config.chunking.chunk_size,
                config.chunking.chunk_overlap
            );
            config.columns.carried.into_iter().next()
        }
        Err(e) => {
            tracing::warn!("Could not read ingest config: {}", e);
            None
        }
    }
    .unwrap_or_else(|| "Complaint ID".to_string());

    let llm = LlmConfig::from(qa);
    if llm.api_key.is_none() {
        tracing::warn!("No API key set (OPENAI_API_KEY); requests to '{}' may be rejected", llm.base_url);
    }
    tracing::info!("Using model '{}' at '{}'", llm.model, llm.base_url);

    let client = ChatCompletionClient::new(llm)?;
    let policy = RetryConfig::from(qa).to_policy()?;

    let use_case = AskUseCase::new(index, client)
        .with_policy(policy)
        .with_top_k(qa.top_k);
    Ok((use_case, id_field))
}

/// Print `text` word by word, pausing `delay` between words.
fn reveal(text: &str, delay: Duration) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    if delay.is_zero() {
        writeln!(stdout, "{text}")?;
        return Ok(());
    }
    for (i, word) in text.split_whitespace().enumerate() {
        if i > 0 {
            write!(stdout, " ")?;
        }
        write!(stdout, "{word}")?;
        stdout.flush()?;
        std::thread::sleep(delay);
    }
    writeln!(stdout)?;
    Ok(())
}

/// First `max_chars` characters of a chunk on one line.
fn excerpt(content: &str, max_chars: usize) -> String {
    let flat = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let cut: String = flat.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}
