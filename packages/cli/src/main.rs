#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line dashboard for regional civil-defense shelter statistics.
//!
//! Fetches the configured open-data sources (or reads a saved response),
//! runs the unwrap-then-normalize pipeline, and prints headline aggregates,
//! capacity-level buckets, and a ranking of regions.
//!
//! Uses `indicatif-log-bridge` (via [`shelter_stats_cli_utils::init_logger`])
//! so that log lines and the page progress bar never fight for the terminal.

mod render;

use std::io::Read as _;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use shelter_stats_cli_utils::{IndicatifProgress, MultiProgress};
use shelter_stats_source::fetch::fetch_pages;
use shelter_stats_source::registry::{all_sources, enabled_sources, find_source};
use shelter_stats_source::sample::sample_payload;
use shelter_stats_source::source_def::SourceDefinition;
use shelter_stats_source::{
    FetchOptions, NormalizeConfig, SourceError, process_bytes, process_pages, process_payload,
};
use shelter_stats_source_models::{MissingValuePolicy, PipelineOutput};

use crate::render::{ReportArgs, build_report, render_json, render_table};

#[derive(Parser)]
#[command(name = "shelter_stats", about = "Regional civil-defense shelter statistics")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all configured data sources
    Sources,
    /// Fetch, normalize, and summarize live data
    Fetch {
        /// Source identifier (defaults to every enabled source; see
        /// `SHELTER_STATS_SOURCES`)
        #[arg(long)]
        source: Option<String>,
        /// Override the source's page limit
        #[arg(long)]
        max_pages: Option<u32>,
        /// Use the built-in sample when the API cannot be reached
        #[arg(long)]
        sample_on_failure: bool,
        #[command(flatten)]
        report: ReportArgs,
    },
    /// Normalize a saved API response (`-` reads stdin)
    Normalize {
        /// Path to a JSON response body
        file: PathBuf,
        #[command(flatten)]
        report: ReportArgs,
    },
    /// Summarize the built-in two-region sample
    Sample {
        #[command(flatten)]
        report: ReportArgs,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = shelter_stats_cli_utils::init_logger();
    let cli = Cli::parse();

    match cli.command {
        Commands::Sources => {
            println!("{:<28} {:<10} NAME", "ID", "PAGES");
            println!("{}", "-".repeat(72));
            for source in &all_sources() {
                println!(
                    "{:<28} {:<10} {}",
                    source.id,
                    format!("{}x{}", source.max_pages, source.page_size),
                    source.name
                );
            }
        }
        Commands::Fetch {
            source,
            max_pages,
            sample_on_failure,
            report,
        } => {
            let sources = match source {
                Some(id) => vec![find_source(&id).ok_or_else(|| format!("Unknown source: {id}"))?],
                None => enabled_sources(None),
            };
            if sources.is_empty() {
                return Err("No sources enabled".into());
            }

            for def in &sources {
                let config = def.normalize_config(report.missing_values);
                let output = match fetch_source(def, max_pages, &multi).await {
                    Ok(pages) => process_pages(&pages, &config),
                    Err(e) if sample_on_failure => {
                        log::warn!("[{}] Fetch failed ({e}); using built-in sample", def.id);
                        process_payload(&sample_payload(), &config)
                    }
                    Err(e) => return Err(e.into()),
                };
                print_report(&def.id, output, &report)?;
            }
        }
        Commands::Normalize { file, report } => {
            let bytes = read_input(&file)?;
            let config =
                NormalizeConfig::with_policy(report.policy_or(MissingValuePolicy::default()));
            let output = process_bytes(&bytes, &config)?;
            print_report(&file.display().to_string(), output, &report)?;
        }
        Commands::Sample { report } => {
            let config =
                NormalizeConfig::with_policy(report.policy_or(MissingValuePolicy::default()));
            let output = process_payload(&sample_payload(), &config);
            print_report("sample", output, &report)?;
        }
    }

    Ok(())
}

async fn fetch_source(
    def: &SourceDefinition,
    max_pages: Option<u32>,
    multi: &MultiProgress,
) -> Result<Vec<serde_json::Value>, SourceError> {
    let options = FetchOptions {
        service_key: def.service_key()?,
        max_pages,
    };
    let progress = IndicatifProgress::pages_bar(multi, &def.name);
    fetch_pages(def, &options, &progress).await
}

fn read_input(path: &Path) -> Result<Vec<u8>, SourceError> {
    if path.as_os_str() == "-" {
        let mut bytes = Vec::new();
        std::io::stdin().read_to_end(&mut bytes)?;
        return Ok(bytes);
    }
    Ok(std::fs::read(path)?)
}

fn print_report(
    origin: &str,
    output: PipelineOutput,
    args: &ReportArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let report = build_report(origin, output, args)?;
    if args.json {
        println!("{}", render_json(&report)?);
    } else {
        print!("{}", render_table(&report, &args.rank_by));
    }
    Ok(())
}
