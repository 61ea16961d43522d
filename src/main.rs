// src/main.rs
mod aggregate;
mod classifier;
mod config;
mod edgar;
mod extractors;
mod pipeline;
mod storage;
mod utils;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use classifier::anthropic::{DEFAULT_MAX_TOKENS, DEFAULT_MODEL};
use classifier::AnthropicClassifier;
use edgar::{DirectoryFilingSource, FilingWindow};
use extractors::KeywordVocabulary;
use pipeline::{extraction_output, FilingProcessor, PipelineConfig, PipelineDriver};
use storage::StorageManager;
use utils::AppError;

/// Scores AI adoption in 10-K filings, per company and year
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract keyword-bearing paragraphs only, grouped by year per company
    Extract(ExtractArgs),
    /// Extract, classify and aggregate; resumes from existing logs in the output directory
    Run(RunArgs),
    /// Rewrite a JSONL log, keeping the last record per key and dropping broken lines
    Compact {
        /// Path of the .jsonl file to rewrite
        path: PathBuf,
    },
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// CIK to process (repeatable)
    #[arg(short, long = "cik")]
    ciks: Vec<String>,

    /// File listing CIKs, one per line or as a `cik` CSV column
    #[arg(long)]
    cik_file: Option<PathBuf>,

    /// Directory holding downloaded full-submission .txt files
    #[arg(short, long, default_value = "./10k_filings")]
    filings_dir: PathBuf,

    /// First reporting year to consider (inclusive)
    #[arg(long)]
    start_year: u32,

    /// Last reporting year to consider (inclusive)
    #[arg(long)]
    end_year: u32,

    /// Sub-document type to isolate inside each submission
    #[arg(long, default_value = extractors::document::DEFAULT_TARGET_FORM)]
    form: String,

    /// Output directory for logs and extracted content
    #[arg(short, long, default_value = "./output")]
    output_dir: PathBuf,
}

#[derive(Args, Debug)]
struct ExtractArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Debug mode - save section HTML with keyword hits highlighted
    #[arg(short, long)]
    debug: bool,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// API key for the classification service
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model used to classify fragments
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,

    #[arg(long, default_value_t = DEFAULT_MAX_TOKENS)]
    max_tokens: u32,

    /// Fragments with a lower ai_relevance_score carry no weight
    #[arg(long, default_value_t = aggregate::DEFAULT_RELEVANCE_THRESHOLD)]
    relevance_threshold: f64,

    /// Seconds to wait after a rate-limit response before retrying
    #[arg(long, default_value_t = pipeline::DEFAULT_RATE_LIMIT_BACKOFF.as_secs())]
    rate_limit_backoff_secs: u64,

    /// Seconds to pause after every successful classifier call
    #[arg(long, default_value_t = pipeline::DEFAULT_POST_CALL_PAUSE.as_secs())]
    pause_secs: u64,
}

impl CommonArgs {
    fn pipeline_config(&self) -> Result<PipelineConfig, AppError> {
        let window = FilingWindow::new(self.start_year, self.end_year).ok_or_else(|| {
            AppError::Config(format!("--start-year {} is after --end-year {}", self.start_year, self.end_year))
        })?;
        let mut config = PipelineConfig::new(window);
        config.target_form = self.form.clone();
        Ok(config)
    }

    fn ciks(&self) -> Result<Vec<String>, AppError> {
        config::load_ciks(&self.ciks, self.cik_file.as_deref())
    }
}

async fn extract(args: ExtractArgs) -> Result<(), AppError> {
    let config = args.common.pipeline_config()?;
    let ciks = args.common.ciks()?;
    let storage = StorageManager::new(&args.common.output_dir)?;
    let source = DirectoryFilingSource::new(&args.common.filings_dir);
    let processor = FilingProcessor::new(&config, KeywordVocabulary::default());

    let mut success_count = 0;
    let mut failure_count = 0;

    for cik in &ciks {
        let sections = match processor.sections(&source, cik).await {
            Ok(sections) => sections,
            Err(e) => {
                tracing::error!("Failed to extract CIK {}: {}", cik, e);
                failure_count += 1;
                continue;
            }
        };

        if args.debug {
            for segmented in &sections {
                let section = &segmented.section;
                let path = storage.debug_dir(cik, section.year).join("section_keywords.html");
                if let Err(e) = utils::html_debug::save_keyword_debug_html(&section.markup, &path, processor.vocabulary()) {
                    tracing::warn!("Failed to create debug HTML: {}", e);
                }
            }
        }

        if sections.is_empty() {
            tracing::info!("No {} section in window for CIK {}", config.target_form, cik);
        }
        storage.save_extraction(&extraction_output(cik, &sections))?;
        success_count += 1;
    }

    tracing::info!("Extraction finished. Success: {}, Failures: {}", success_count, failure_count);
    Ok(())
}

async fn run(args: RunArgs) -> Result<(), AppError> {
    // Nothing can be classified without a key; stop before touching any filing
    let api_key = args
        .api_key
        .as_deref()
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .ok_or_else(|| AppError::Config("ANTHROPIC_API_KEY is not set (or pass --api-key)".to_string()))?;

    let mut config = args.common.pipeline_config()?;
    config.relevance_threshold = args.relevance_threshold;
    config.rate_limit_backoff = Duration::from_secs(args.rate_limit_backoff_secs);
    config.post_call_pause = Duration::from_secs(args.pause_secs);

    let ciks = args.common.ciks()?;
    let storage = StorageManager::new(&args.common.output_dir)?;
    let source = DirectoryFilingSource::new(&args.common.filings_dir);
    let classifier = AnthropicClassifier::new(api_key, &args.model, args.max_tokens)?;
    tracing::info!("Classifying with model {} for {} CIK(s)", classifier.model(), ciks.len());

    let mut driver = PipelineDriver::open(config, KeywordVocabulary::default(), source, classifier, &storage)?;
    let summary = driver.run(&ciks).await?;

    tracing::info!(
        "Processing finished. Companies: {}, records written: {}, classifier calls: {}, reused: {}, failed fragments: {}",
        summary.companies, summary.records_written, summary.classifier_calls, summary.reused, summary.failed_fragments
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Parse CLI Arguments
    let cli = Cli::parse();

    // 2. Setup Logging (reads RUST_LOG env var)
    utils::logging::setup_logging(cli.verbose);

    // 3. Dispatch
    match cli.command {
        Command::Extract(args) => extract(args).await,
        Command::Run(args) => run(args).await,
        Command::Compact { path } => {
            storage::compact(&path)?;
            Ok(())
        }
    }
}
