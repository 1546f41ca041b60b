//! DocQA Bench CLI
//!
//! Benchmarks a retrieval-augmented question answering pipeline on one document.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use docqa_bench::{
    benchmark::{Benchmark, BenchmarkConfig},
    chunker::RecursiveChunker,
    config::Config,
    document::{ContentSource, DirectorySource, FileSource, PdfSource},
    embedder::{Embedder, HashingEmbedder, OpenAiEmbedder},
    evaluator::{Evaluator, F1Evaluator, LlmJudgeEvaluator},
    generation::{LlmAnswerGenerator, LlmQuestionGenerator},
    llm::LlmClient,
    report::RunReport,
    vector_store::InMemoryVectorStore,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// DocQA Bench - end-to-end benchmark for retrieval-augmented question answering
#[derive(Parser)]
#[command(name = "docqa-bench")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Benchmark a text or PDF file, or a directory of .txt/.md files
    Run {
        /// Path to the document file or directory
        path: PathBuf,

        #[command(flatten)]
        options: RunOptions,
    },

    /// Benchmark literal text passed on the command line
    Text {
        /// The document text
        text: String,

        #[command(flatten)]
        options: RunOptions,
    },

    /// Show the effective configuration
    Config,

    /// Test LLM connection
    Test,
}

#[derive(Args)]
struct RunOptions {
    /// Maximum chunk length in characters
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Characters shared by consecutive chunks
    #[arg(long)]
    chunk_overlap: Option<usize>,

    /// Number of questions to generate
    #[arg(short = 'n', long)]
    questions: Option<usize>,

    /// Chunks retrieved per question
    #[arg(short = 'k', long)]
    top_k: Option<usize>,

    /// Embedding model name
    #[arg(long)]
    embedding_model: Option<String>,

    /// Chat model name
    #[arg(short, long)]
    model: Option<String>,

    /// Vector collection name
    #[arg(long)]
    collection: Option<String>,

    /// Questions processed concurrently
    #[arg(long)]
    concurrency: Option<usize>,

    /// Use the local hashing embedder instead of the embeddings API
    #[arg(long)]
    offline: bool,

    /// Use a local sentence-transformers model for embeddings
    #[cfg(feature = "local-embeddings")]
    #[arg(long, conflicts_with = "offline")]
    local: bool,

    /// Score answers with an LLM judge instead of token F1
    #[arg(long)]
    judge: bool,

    /// Write the report as JSON to this file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl RunOptions {
    fn apply(&self, config: &mut Config) {
        if let Some(size) = self.chunk_size {
            config.chunking.chunk_size = size;
        }
        if let Some(overlap) = self.chunk_overlap {
            config.chunking.chunk_overlap = overlap;
        }
        if let Some(n) = self.questions {
            config.benchmark.num_questions = n;
        }
        if let Some(k) = self.top_k {
            config.benchmark.top_k = k;
        }
        if let Some(model) = &self.embedding_model {
            config.embedding.model = model.clone();
        }
        if let Some(model) = &self.model {
            config.llm.model = model.clone();
        }
        if let Some(name) = &self.collection {
            config.benchmark.collection_name = name.clone();
        }
        if let Some(concurrency) = self.concurrency {
            config.benchmark.question_concurrency = concurrency;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { path, options } => cmd_run(path, options).await,
        Commands::Text { text, options } => cmd_text(text, options).await,
        Commands::Config => cmd_config(),
        Commands::Test => cmd_test().await,
    }
}

fn load_config(options: &RunOptions) -> Result<Config> {
    let mut config = Config::load().context("Failed to load configuration")?;
    options.apply(&mut config);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

struct Pipeline {
    chunker: Arc<RecursiveChunker>,
    embedder: Arc<dyn Embedder>,
    vector_store: Arc<InMemoryVectorStore>,
    question_generator: Arc<LlmQuestionGenerator>,
    answer_generator: Arc<LlmAnswerGenerator>,
    evaluator: Arc<dyn Evaluator>,
}

fn build_pipeline(config: &Config, options: &RunOptions) -> Result<Pipeline> {
    let client = LlmClient::new(config.llm.clone()).context("Failed to create LLM client")?;
    let chunker =
        RecursiveChunker::from_config(&config.chunking).context("Invalid chunking settings")?;

    let embedder: Arc<dyn Embedder> = if options.offline {
        Arc::new(HashingEmbedder::default())
    } else if let Some(embedder) = local_embedder(config, options)? {
        embedder
    } else {
        Arc::new(
            OpenAiEmbedder::new(config.resolved_embedding())
                .context("Failed to create embedding client")?,
        )
    };

    let evaluator: Arc<dyn Evaluator> = if options.judge {
        Arc::new(LlmJudgeEvaluator::new(client.clone()))
    } else {
        Arc::new(F1Evaluator)
    };

    Ok(Pipeline {
        chunker: Arc::new(chunker),
        embedder,
        vector_store: Arc::new(InMemoryVectorStore::new(
            config.benchmark.collection_name.clone(),
        )),
        question_generator: Arc::new(LlmQuestionGenerator::new(client.clone())),
        answer_generator: Arc::new(LlmAnswerGenerator::new(client)),
        evaluator,
    })
}

#[cfg(feature = "local-embeddings")]
fn local_embedder(config: &Config, options: &RunOptions) -> Result<Option<Arc<dyn Embedder>>> {
    if !options.local {
        return Ok(None);
    }
    println!("Loading local embedding model...");
    let embedder = docqa_bench::embedder::CandleEmbedder::load_minilm()?
        .with_batch_size(config.embedding.batch_size);
    Ok(Some(Arc::new(embedder)))
}

#[cfg(not(feature = "local-embeddings"))]
fn local_embedder(_config: &Config, _options: &RunOptions) -> Result<Option<Arc<dyn Embedder>>> {
    Ok(None)
}

fn print_settings(config: &Config, options: &RunOptions) {
    println!("Using model: {}", config.llm.model);
    if options.offline {
        println!("Embeddings:  local hashing");
    } else {
        println!("Embeddings:  {}", config.embedding.model);
    }
    println!(
        "Chunking:    {} chars, {} overlap",
        config.chunking.chunk_size, config.chunking.chunk_overlap
    );
    println!(
        "Questions:   {} (top-k {}, concurrency {})",
        config.benchmark.num_questions,
        config.benchmark.top_k,
        config.benchmark.question_concurrency
    );
    println!(
        "Evaluator:   {}",
        if options.judge { "LLM judge" } else { "token F1" }
    );
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

async fn cmd_run(path: PathBuf, options: RunOptions) -> Result<()> {
    println!("Loading configuration...");
    let config = load_config(&options)?;

    if !path.exists() {
        anyhow::bail!("Document not found at '{}'", path.display());
    }

    let source: Arc<dyn ContentSource> = if path.is_dir() {
        Arc::new(DirectorySource::new(&path))
    } else if is_pdf(&path) {
        Arc::new(PdfSource::new(&path))
    } else {
        Arc::new(FileSource::new(&path))
    };

    println!("Benchmarking document: {}", path.display());
    print_settings(&config, &options);

    let pipeline = build_pipeline(&config, &options)?;
    let benchmark = Benchmark::new(
        source,
        pipeline.chunker,
        pipeline.embedder,
        pipeline.vector_store,
        pipeline.question_generator,
        pipeline.answer_generator,
        pipeline.evaluator,
    )
    .with_config(BenchmarkConfig::from(&config.benchmark));

    let start = Instant::now();
    let report = benchmark.run_report().await.context("Benchmark failed")?;

    finish(report, start, options.output)
}

async fn cmd_text(text: String, options: RunOptions) -> Result<()> {
    println!("Loading configuration...");
    let config = load_config(&options)?;

    println!("Benchmarking {} characters of text", text.chars().count());
    print_settings(&config, &options);

    let pipeline = build_pipeline(&config, &options)?;

    let start = Instant::now();
    let report = Benchmark::evaluate_scraped_content_with_config(
        text,
        BenchmarkConfig::from(&config.benchmark),
        pipeline.chunker,
        pipeline.embedder,
        pipeline.vector_store,
        pipeline.question_generator,
        pipeline.answer_generator,
        pipeline.evaluator,
    )
    .await
    .context("Benchmark failed")?;

    finish(report, start, options.output)
}

fn finish(report: RunReport, start: Instant, output: Option<PathBuf>) -> Result<()> {
    println!();
    print!("{}", report.summary());
    println!("Completed in {:.2?}", start.elapsed());

    match output {
        Some(path) => {
            report.save(&path).context("Failed to save report")?;
            println!("\nReport saved to: {}", path.display());
        }
        None => {
            let json = report.to_json().context("Failed to serialize report")?;
            println!("\n{}", json);
        }
    }

    Ok(())
}

fn mask(secret: &str) -> String {
    if secret.is_empty() {
        return "(not set)".to_string();
    }
    let prefix: String = secret.chars().take(8).collect();
    format!("{}...", prefix)
}

fn cmd_config() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    let embedding = config.resolved_embedding();

    println!("Configuration");
    println!("{}", "─".repeat(40));
    match Config::config_file_path() {
        Some(path) if path.exists() => println!("  Config file:      {}", path.display()),
        Some(path) => println!("  Config file:      {} (not found)", path.display()),
        None => println!("  Config file:      (unavailable)"),
    }
    println!("  LLM API Base:     {}", config.llm.api_base);
    println!("  LLM API Key:      {}", mask(&config.llm.api_key));
    println!("  LLM Model:        {}", config.llm.model);
    println!("  Max tokens:       {}", config.llm.max_tokens);
    println!("  Temperature:      {}", config.llm.temperature);
    println!("  Embedding Base:   {}", embedding.api_base);
    println!("  Embedding Key:    {}", mask(&embedding.api_key));
    println!("  Embedding Model:  {}", embedding.model);
    println!("  Batch size:       {}", embedding.batch_size);
    println!("  Chunk size:       {}", config.chunking.chunk_size);
    println!("  Chunk overlap:    {}", config.chunking.chunk_overlap);
    println!("  Questions:        {}", config.benchmark.num_questions);
    println!("  Top-k:            {}", config.benchmark.top_k);
    println!("  Collection:       {}", config.benchmark.collection_name);
    println!("  Concurrency:      {}", config.benchmark.question_concurrency);

    if let Err(e) = config.validate() {
        println!("\nConfiguration error: {}", e);
    }

    Ok(())
}

async fn cmd_test() -> Result<()> {
    println!("Testing LLM connection...\n");

    let config = Config::load().context("Failed to load configuration")?;

    println!("Configuration:");
    println!("  API Base:  {}", config.llm.api_base);
    println!("  Model:     {}", config.llm.model);
    println!("  API Key:   {}", mask(&config.llm.api_key));
    println!();

    if let Err(e) = config.validate() {
        println!("Configuration error: {}", e);
        return Ok(());
    }

    let client = LlmClient::new(config.llm).context("Failed to create LLM client")?;

    println!("Sending test request...");
    match client.test_connection().await {
        Ok(()) => {
            println!("Connection successful!");
        }
        Err(e) => {
            println!("Connection failed: {}", e);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_paths_are_detected() {
        assert!(is_pdf(Path::new("paper.pdf")));
        assert!(is_pdf(Path::new("/tmp/Report.PDF")));
        assert!(!is_pdf(Path::new("notes.txt")));
        assert!(!is_pdf(Path::new("pdf")));
    }

    #[test]
    fn test_text_options_override_benchmark_settings() {
        let cli = Cli::parse_from([
            "docqa-bench",
            "text",
            "The quick brown fox.",
            "-n",
            "3",
            "-k",
            "5",
            "--concurrency",
            "4",
        ]);
        let Commands::Text { options, .. } = cli.command else {
            panic!("expected the text command");
        };

        let mut config = Config::default();
        options.apply(&mut config);
        let bench = BenchmarkConfig::from(&config.benchmark);
        assert_eq!(bench.num_questions, 3);
        assert_eq!(bench.top_k, 5);
        assert_eq!(bench.question_concurrency, 4);
    }
}
