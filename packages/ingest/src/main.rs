#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the parcel risk ingestion tool.

use std::path::PathBuf;

use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use parcel_watch_ingest::config::load_scoring_config;
use parcel_watch_ingest::{prepare, run};
use parcel_watch_ingest_models::{IngestConfig, IngestReport};

const DEFAULT_RAW_DIR: &str = "data/raw";
const DEFAULT_DERIVED_DIR: &str = "data/derived";

#[derive(Parser)]
#[command(
    name = "parcel_watch_ingest",
    about = "Parcel risk scoring from municipal open-data extracts"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Score the raw extracts and publish the derived JSON documents
    Run {
        /// Directory holding parcels.csv, cases.csv, complaints.csv, and permits.csv
        #[arg(long, default_value = DEFAULT_RAW_DIR)]
        raw_dir: PathBuf,
        /// Directory the derived documents are written to
        #[arg(long, default_value = DEFAULT_DERIVED_DIR)]
        derived_dir: PathBuf,
        /// Scoring config TOML (defaults to the built-in weights)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Reference date for the court case window, `YYYY-MM-DD` (defaults to today, UTC)
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Score the raw extracts and print the data-quality report without writing anything
    Validate {
        /// Directory holding the raw extracts
        #[arg(long, default_value = DEFAULT_RAW_DIR)]
        raw_dir: PathBuf,
        /// Scoring config TOML (defaults to the built-in weights)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Reference date for the court case window, `YYYY-MM-DD`
        #[arg(long)]
        as_of: Option<NaiveDate>,
        /// Print every data-quality issue, not just the counts
        #[arg(long)]
        verbose: bool,
    },
    /// Print the effective scoring config as TOML
    Config {
        /// Scoring config TOML to merge over the defaults
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn print_report(report: &IngestReport, verbose: bool) {
    println!("{:<12} {:>8} {:>8} {:>8}", "EXTRACT", "READ", "KEPT", "SKIPPED");
    println!("{}", "-".repeat(40));
    for (name, counts) in [
        ("parcels", report.parcels),
        ("cases", report.cases),
        ("complaints", report.complaints),
        ("permits", report.permits),
    ] {
        println!(
            "{name:<12} {:>8} {:>8} {:>8}",
            counts.rows_read,
            counts.records_kept,
            counts.rows_skipped()
        );
    }
    println!();

    let quality = &report.data_quality;
    println!("Cases outside window:  {}", report.cases_outside_window);
    println!("Undated cases:         {}", report.undated_cases);
    println!("Orphaned cases:        {}", quality.orphaned_cases);
    println!("Orphaned complaints:   {}", quality.orphaned_complaints);
    println!("Orphaned permits:      {}", quality.orphaned_permits);
    println!("Rejected permits:      {}", quality.rejected_permits);
    println!("Unlinked permits:      {}", quality.unlinked_permits);

    if verbose && !quality.is_clean() {
        println!();
        for issue in &quality.issues {
            println!("{issue}");
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let command = cli.command.unwrap_or(Commands::Run {
        raw_dir: PathBuf::from(DEFAULT_RAW_DIR),
        derived_dir: PathBuf::from(DEFAULT_DERIVED_DIR),
        config: None,
        as_of: None,
    });

    match command {
        Commands::Run {
            raw_dir,
            derived_dir,
            config,
            as_of,
        } => {
            let result = run(&IngestConfig {
                raw_dir,
                derived_dir,
                as_of: as_of.unwrap_or_else(today),
                config_path: config,
            })?;
            for path in &result.files_written {
                log::info!("Wrote {}", path.display());
            }
        }
        Commands::Validate {
            raw_dir,
            config,
            as_of,
            verbose,
        } => {
            let outputs = prepare(&IngestConfig {
                raw_dir,
                derived_dir: PathBuf::from(DEFAULT_DERIVED_DIR),
                as_of: as_of.unwrap_or_else(today),
                config_path: config,
            })?;
            print_report(&outputs.report, verbose);
            println!();
            println!(
                "{} parcels scored, {} permits on the watchlist",
                outputs.leaderboard.len(),
                outputs.watchlist.len()
            );
        }
        Commands::Config { config } => {
            let scoring = load_scoring_config(config.as_deref())?;
            print!("{}", scoring.to_toml_string()?);
        }
    }

    Ok(())
}
