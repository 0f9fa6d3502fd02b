// notescope - what are these notes about?
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use notescope::{
    AnalysisOrchestrator, AnalysisReport, AnalysisState, AnalyzerConfig, CandidateLabels,
    HubModelLoader, LopdfExtractor, ModelProvider, TextExtractor, UploadedDocument,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Config file. Falls back to $NOTESCOPE_CONFIG, then ./notescope.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract text from a PDF and detect its topic
    Analyze {
        pdf: PathBuf,
        /// Comma-separated labels to score instead of the configured ones
        #[arg(long, value_delimiter = ',')]
        labels: Vec<String>,
        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the text that would be classified
    Extract { pdf: PathBuf },
    /// List the configured candidate labels
    Labels,
    /// Download the model into the local cache and check it loads
    FetchModel,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(notescope::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config = AnalyzerConfig::load(args.config.as_deref())?;

    match args.command {
        Command::Analyze { pdf, labels, json } => analyze(&config, &pdf, labels, json).await,
        Command::Extract { pdf } => extract(&config, &pdf).await,
        Command::Labels => {
            for label in config.classifier.candidate_labels()?.iter() {
                println!("{label}");
            }
            Ok(())
        }
        Command::FetchModel => fetch_model(&config).await,
    }
}

fn read_document(path: &Path) -> Result<UploadedDocument> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(UploadedDocument::new(name, bytes).with_mime_type("application/pdf"))
}

async fn analyze(config: &AnalyzerConfig, pdf: &Path, labels: Vec<String>, json: bool) -> Result<()> {
    let document = read_document(pdf)?;
    let provider = Arc::new(ModelProvider::from_config(&config.model));
    let mut orchestrator = AnalysisOrchestrator::from_config(config, provider)?;
    if !labels.is_empty() {
        orchestrator = orchestrator.with_labels(CandidateLabels::new(labels)?);
    }

    let mut progress = orchestrator.subscribe();
    let printer = tokio::spawn(async move {
        while let Some(event) = progress.recv().await {
            let last = event.state.is_terminal();
            // failures are reported once, by the caller
            if !event.message.is_empty() && !matches!(event.state, AnalysisState::Failed(_)) {
                // keep stdout clean for --json
                if json {
                    eprintln!("{}", event.message);
                } else {
                    println!("{}", event.message);
                }
            }
            if last {
                break;
            }
        }
    });

    let outcome = orchestrator.analyze(document).await;
    drop(orchestrator);
    let _ = printer.await;

    match outcome {
        Ok(report) if json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Ok(report) => {
            print_report(&report);
            Ok(())
        }
        Err(e) => {
            if e.kind().is_retryable() {
                eprintln!("This may be temporary, please try again.");
            }
            Err(e).context("analysis failed")
        }
    }
}

fn print_report(report: &AnalysisReport) {
    let result = &report.classification;
    println!();
    println!("Document:   {}", report.document);
    println!("Topic:      {}", result.top_topic);
    println!("Confidence: {:.1}%", result.confidence * 100.0);
    println!(
        "Words:      {} ({} of {} pages)",
        report.word_count, report.pages_processed, report.total_pages
    );
    println!();
    for score in &result.all_scores {
        println!("  {:<20} {:>5.1}%", score.label, score.score * 100.0);
    }
}

async fn extract(config: &AnalyzerConfig, pdf: &Path) -> Result<()> {
    let document = read_document(pdf)?;
    let extractor = LopdfExtractor::new(config.extraction.max_pages);
    let extracted = extractor.extract_text(&document).await?;

    println!("Pages: {}/{}", extracted.pages_processed, extracted.total_pages);
    println!("Characters: {}", extracted.char_count());
    println!("Words: {}", extracted.word_count());
    println!();
    println!("{}", extracted.text);
    Ok(())
}

async fn fetch_model(config: &AnalyzerConfig) -> Result<()> {
    let files = HubModelLoader::new(config.model.clone()).prefetch().await?;
    println!("Model files in {}", files.dir.display());

    let provider = ModelProvider::from_config(&config.model);
    provider.get().await?;
    println!("Model {} loaded", config.model.repo);
    Ok(())
}
