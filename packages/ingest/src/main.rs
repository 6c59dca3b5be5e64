#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the issue tracker ingestion tool.

use clap::{Parser, Subcommand};
use issue_scraper_ingest::config::load_config;
use issue_scraper_ingest::service::IngestService;
use issue_scraper_ingest_models::PartitionOutcome;
use serde::Serialize;

#[derive(Parser)]
#[command(name = "issue_scraper", about = "Issue tracker ingestion tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest every configured project, resuming from the last checkpoint
    Run {
        /// Comma-separated list of project keys (overrides `ISSUE_SCRAPER_PROJECTS`)
        #[arg(long)]
        projects: Option<String>,
    },
    /// Show the last-known run status and per-project progress
    Status,
    /// Delete the dataset, checkpoint, and status files
    Reset,
    /// Print aggregate statistics over the dataset
    Stats,
    /// Flatten the dataset into a training file
    Transform,
    /// List the configured projects
    Projects,
}

fn print_json(value: &impl Serialize) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let projects = match &cli.command {
        Commands::Run { projects } => projects.as_deref(),
        _ => None,
    };
    let config = load_config(projects)?;

    match cli.command {
        Commands::Projects => {
            for project in &config.partitions {
                println!("{project}");
            }
        }
        Commands::Run { .. } => {
            let service = IngestService::from_config(config)?;
            let summary = service.run_to_completion().await?;

            println!("{:<12} {:<14} {:>10} {:>10}", "PROJECT", "OUTCOME", "WRITTEN", "OFFSET");
            println!("{}", "-".repeat(49));
            for report in &summary.partitions {
                println!(
                    "{:<12} {:<14} {:>10} {:>10}",
                    report.partition,
                    report.outcome.as_ref(),
                    report.records_written,
                    report.offset
                );
            }

            let aborted = summary
                .partitions
                .iter()
                .filter(|p| p.outcome == PartitionOutcome::Aborted)
                .count();
            if aborted > 0 {
                log::warn!("{aborted} project(s) did not finish; run again to resume");
            }
        }
        Commands::Status => {
            let service = IngestService::from_config(config)?;
            print_json(&service.last_known_status()?)?;
        }
        Commands::Reset => {
            let service = IngestService::from_config(config)?;
            let report = service.reset()?;
            if report.files_deleted.is_empty() {
                log::info!("Nothing to delete");
            }
            print_json(&report)?;
        }
        Commands::Stats => {
            let service = IngestService::from_config(config)?;
            print_json(&service.stats()?)?;
        }
        Commands::Transform => {
            let service = IngestService::from_config(config)?;
            let report = service.transform()?;
            log::info!(
                "Wrote {} records to {} ({} unreadable lines skipped)",
                report.records_written,
                report.output_path.display(),
                report.lines_skipped
            );
        }
    }

    Ok(())
}
