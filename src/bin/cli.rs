//! confsieve CLI - acquisition and classification of a paper corpus
//!
//! Usage: confsieve [OPTIONS] <COMMAND>
//!
//! `run` drives the whole pipeline; `fetch`, `classify` and `scan` expose
//! the individual phases, including replay of a persisted failure list.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use confsieve::index::{self, FALLBACK_YEAR};
use confsieve::pipeline::{self, PaperReport, PipelineOptions};
use confsieve::{classifier, FetchConfig, FetchOrchestrator, KeywordConfig, PaperRecord};

#[derive(Parser)]
#[command(name = "confsieve", version, about = "Conference-paper corpus curation")]
struct Cli {
    /// Directory holding the per-conference index CSV files
    #[arg(long, default_value = "index", global = true)]
    index_dir: PathBuf,

    /// Corpus root where PDFs live
    #[arg(long, default_value = "data", global = true)]
    data_dir: PathBuf,

    /// Keyword configuration JSON (built-in defaults when omitted)
    #[arg(long, global = true)]
    keywords: Option<PathBuf>,

    /// Report CSV output path
    #[arg(long, default_value = "stats.csv", global = true)]
    out: PathBuf,

    /// Where the fetch failure list is persisted
    #[arg(long, default_value = "failed_list.json", global = true)]
    failures: PathBuf,

    /// Fetch worker-pool width
    #[arg(long, default_value_t = 32, global = true)]
    concurrency: usize,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30, global = true)]
    timeout: u64,

    /// Reject PDFs larger than this many megabytes
    #[arg(long, default_value_t = 20, global = true)]
    max_pdf_mb: u32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Full pipeline: fetch missing PDFs, classify, optionally scan bodies
    Run {
        /// Confirm relevant papers by scanning their PDF text for keyword groups
        #[arg(long)]
        scan: bool,
    },
    /// Acquisition only
    Fetch {
        /// Replay a persisted failure list instead of loading the index
        #[arg(long)]
        retry: Option<PathBuf>,
    },
    /// Title/abstract classification only; writes a report for every record
    Classify,
    /// Classify and scan PDF bodies without fetching
    Scan,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    let keywords = match &cli.keywords {
        Some(path) => KeywordConfig::load(path)?,
        None => KeywordConfig::default(),
    };

    let fetch_config = FetchConfig {
        data_dir: cli.data_dir.clone(),
        concurrency: cli.concurrency,
        timeout_secs: cli.timeout,
        max_pdf_mb: cli.max_pdf_mb,
        ..FetchConfig::default()
    };

    match cli.command {
        Commands::Run { scan } => {
            let records = index::load_index(&cli.index_dir, FALLBACK_YEAR)
                .map_err(|e| e.to_string())?;
            let options = PipelineOptions { fetch: true, scan, ..Default::default() };
            let outcome = pipeline::run(records, &keywords, fetch_config, options)
                .await
                .map_err(|e| e.to_string())?;

            index::write_report(&cli.out, &outcome.reports).map_err(|e| e.to_string())?;
            println!("[cli] wrote {} rows to {:?}", outcome.reports.len(), cli.out);

            if !outcome.failures.is_empty() {
                index::save_failures(&cli.failures, &outcome.failures)
                    .map_err(|e| e.to_string())?;
                println!(
                    "[cli] {} failed fetches saved to {:?} (replay with `confsieve fetch --retry`)",
                    outcome.failures.len(),
                    cli.failures
                );
            }
        }
        Commands::Fetch { retry } => {
            let records: Vec<PaperRecord> = match retry {
                Some(path) => {
                    let failures = index::load_failures(&path).map_err(|e| e.to_string())?;
                    println!("[cli] replaying {} failed fetches from {:?}", failures.len(), path);
                    failures.records().cloned().collect()
                }
                None => index::load_index(&cli.index_dir, FALLBACK_YEAR)
                    .map_err(|e| e.to_string())?,
            };

            let orchestrator = FetchOrchestrator::new(fetch_config).map_err(|e| e.to_string())?;
            let report = orchestrator.fetch_missing(&records).await.map_err(|e| e.to_string())?;
            println!(
                "[cli] fetched {}, skipped {}, failed {}",
                report.fetched,
                report.skipped,
                report.failures.len()
            );

            if !report.failures.is_empty() {
                index::save_failures(&cli.failures, &report.failures)
                    .map_err(|e| e.to_string())?;
                println!("[cli] failure list saved to {:?}", cli.failures);
            }
        }
        Commands::Classify => {
            let records = index::load_index(&cli.index_dir, FALLBACK_YEAR)
                .map_err(|e| e.to_string())?;
            let tiers = keywords.compiled_tiers();
            let reports: Vec<PaperReport> = records
                .into_iter()
                .map(|record| {
                    let relevant = classifier::classify(&tiers, &record);
                    PaperReport { record, relevant, groups: None, confirmed: None }
                })
                .collect();
            let relevant = reports.iter().filter(|r| r.relevant).count();
            println!("[cli] {} of {} records relevant", relevant, reports.len());

            index::write_report(&cli.out, &reports).map_err(|e| e.to_string())?;
            println!("[cli] wrote {} rows to {:?}", reports.len(), cli.out);
        }
        Commands::Scan => {
            let records = index::load_index(&cli.index_dir, FALLBACK_YEAR)
                .map_err(|e| e.to_string())?;
            let options = PipelineOptions { fetch: false, scan: true, ..Default::default() };
            let outcome = pipeline::run(records, &keywords, fetch_config, options)
                .await
                .map_err(|e| e.to_string())?;

            index::write_report(&cli.out, &outcome.reports).map_err(|e| e.to_string())?;
            println!("[cli] wrote {} rows to {:?}", outcome.reports.len(), cli.out);
        }
    }

    Ok(())
}
