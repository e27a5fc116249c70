#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Ingestion configuration, report, and metadata types.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use parcel_watch_risk_models::config::RiskWeights;
use parcel_watch_risk_models::quality::DataQualityReport;
use serde::{Deserialize, Serialize};

/// Parcel roll extract.
pub const PARCELS_FILE: &str = "parcels.csv";
/// Court case extract.
pub const CASES_FILE: &str = "cases.csv";
/// Code complaint extract.
pub const COMPLAINTS_FILE: &str = "complaints.csv";
/// Building permit extract.
pub const PERMITS_FILE: &str = "permits.csv";

/// Risk leaderboard output.
pub const PARCEL_RISK_FILE: &str = "parcel_risk.json";
/// KPI summary output.
pub const KPI_SUMMARY_FILE: &str = "kpi_summary.json";
/// Permit watchlist output.
pub const PERMIT_WATCHLIST_FILE: &str = "permit_watchlist.json";
/// Weekly trend output.
pub const OFFENSE_TRENDS_FILE: &str = "offense_trends.json";
/// Provenance metadata output.
pub const METADATA_FILE: &str = "metadata.json";
/// Data-quality report output.
pub const INGEST_REPORT_FILE: &str = "ingest_report.json";

/// Configuration for one ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Directory holding the raw CSV extracts.
    pub raw_dir: PathBuf,
    /// Directory the derived JSON documents are written to.
    pub derived_dir: PathBuf,
    /// Reference date for the trailing court case window.
    pub as_of: NaiveDate,
    /// Optional scoring config TOML. The embedded default is used when unset.
    pub config_path: Option<PathBuf>,
}

/// Number of rows read and kept per extract.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractCounts {
    /// Data rows in the file.
    pub rows_read: u64,
    /// Rows that parsed into a usable record.
    pub records_kept: u64,
}

impl ExtractCounts {
    /// Rows dropped while parsing.
    #[must_use]
    pub const fn rows_skipped(&self) -> u64 {
        self.rows_read.saturating_sub(self.records_kept)
    }
}

/// Summary of a completed ingestion run, written next to the derived data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    /// Parcel roll counts.
    pub parcels: ExtractCounts,
    /// Court case counts.
    pub cases: ExtractCounts,
    /// Complaint counts.
    pub complaints: ExtractCounts,
    /// Permit counts.
    pub permits: ExtractCounts,
    /// Dated cases left out of scoring because they fall outside the window.
    pub cases_outside_window: u64,
    /// Cases left out of scoring because they carry no usable date.
    pub undated_cases: u64,
    /// Per-record problems from parsing and scoring.
    pub data_quality: DataQualityReport,
}

/// Result of a completed ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResult {
    /// Run summary.
    pub report: IngestReport,
    /// Parcels on the published leaderboard.
    pub parcels_published: u64,
    /// Permits on the published watchlist.
    pub watchlist_size: u64,
    /// Files written to the derived directory.
    pub files_written: Vec<PathBuf>,
    /// How long the run took.
    pub duration: Duration,
}

/// Provenance document describing how the derived data was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// When the run finished scoring.
    pub generated_at: DateTime<Utc>,
    /// Weights used by the scoring formula.
    pub weights: RiskWeights,
    /// Raw extract file names that were read, sorted.
    pub source_files: Vec<String>,
}
