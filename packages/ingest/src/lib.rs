#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Batch ingestion for parcel risk scoring.
//!
//! Reads the four raw CSV extracts (parcel roll, court cases, code
//! complaints, building permits), scores every parcel with
//! [`parcel_watch_risk`], and publishes the derived JSON documents the
//! dashboard reads. Each document is replaced atomically on its own; a run
//! that fails partway through writing can leave a mix of new and previous
//! documents.

pub mod config;
pub mod extract;
pub mod parsing;

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write as _};
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Days, NaiveDate, Utc};
use parcel_watch_ingest_models::{
    CASES_FILE, COMPLAINTS_FILE, INGEST_REPORT_FILE, IngestConfig, IngestReport, IngestResult,
    KPI_SUMMARY_FILE, METADATA_FILE, Metadata, OFFENSE_TRENDS_FILE, PARCEL_RISK_FILE,
    PARCELS_FILE, PERMIT_WATCHLIST_FILE, PERMITS_FILE,
};
use parcel_watch_parcel_models::{
    ComplaintEvent, CourtCaseEvent, ParcelIdentity, ParcelRiskRecord, PermitRecord,
};
use parcel_watch_risk::engine::check_invariants;
use parcel_watch_risk::kpi::summarize;
use parcel_watch_risk::trends::weekly_trends;
use parcel_watch_risk::watchlist::build_watchlist;
use parcel_watch_risk::{RiskEngine, RiskError, RiskInputs};
use parcel_watch_risk_models::config::ConfigError;
use parcel_watch_risk_models::quality::{DataQualityReport, EventSource};
use parcel_watch_risk_models::{KpiSummary, TrendPoint, WatchlistEntry};
use serde::Serialize;
use thiserror::Error;

/// Errors that abort an ingestion run.
#[derive(Debug, Error)]
pub enum IngestError {
    /// A required raw extract does not exist.
    #[error("Missing input file: {}", path.display())]
    MissingInput {
        /// Path that was expected.
        path: PathBuf,
    },

    /// I/O error (file read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The CSV reader failed at the file level.
    #[error("CSV error in {extract} extract: {error}")]
    Csv {
        /// Extract being read.
        extract: EventSource,
        /// Underlying reader error.
        #[source]
        error: csv::Error,
    },

    /// An extract has no header row.
    #[error("The {extract} extract is empty")]
    EmptyExtract {
        /// Extract being read.
        extract: EventSource,
    },

    /// An extract's header lacks a required column.
    #[error("The {extract} extract has no {column:?} column")]
    MissingColumn {
        /// Extract being read.
        extract: EventSource,
        /// Name of the absent column.
        column: String,
    },

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The scoring configuration is unusable.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Scoring produced an inconsistent leaderboard.
    #[error("Risk error: {0}")]
    Risk(#[from] RiskError),
}

impl IngestError {
    pub(crate) const fn csv(extract: EventSource, error: csv::Error) -> Self {
        Self::Csv { extract, error }
    }
}

/// Parsed contents of the four raw extracts.
#[derive(Debug, Clone, Default)]
pub struct RawExtracts {
    /// The parcel roll.
    pub parcels: Vec<ParcelIdentity>,
    /// Every parsed court case, before the scoring window is applied.
    pub cases: Vec<CourtCaseEvent>,
    /// Parsed complaints.
    pub complaints: Vec<ComplaintEvent>,
    /// Parsed permits.
    pub permits: Vec<PermitRecord>,
    /// Names of the CSV files found in the raw directory, sorted.
    pub source_files: Vec<String>,
    /// Row counts and parse-time issues.
    pub report: IngestReport,
}

impl RawExtracts {
    /// Reads the four extracts from `raw_dir`.
    ///
    /// # Errors
    ///
    /// * [`IngestError::MissingInput`] if any of the four files is absent
    /// * [`IngestError::Csv`] or [`IngestError::Io`] if a file cannot be read
    pub fn from_dir(raw_dir: &Path) -> Result<Self, IngestError> {
        let open = |name: &str| -> Result<BufReader<File>, IngestError> {
            let path = raw_dir.join(name);
            if !path.is_file() {
                return Err(IngestError::MissingInput { path });
            }
            log::debug!("Reading {}", path.display());
            Ok(BufReader::new(File::open(&path)?))
        };

        let mut extracts = Self::from_readers(
            open(PARCELS_FILE)?,
            open(CASES_FILE)?,
            open(COMPLAINTS_FILE)?,
            open(PERMITS_FILE)?,
        )?;
        extracts.source_files = list_csv_files(raw_dir)?;
        Ok(extracts)
    }

    /// Reads the four extracts from arbitrary readers.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError`] if any extract fails at the file level.
    pub fn from_readers(
        parcels: impl Read,
        cases: impl Read,
        complaints: impl Read,
        permits: impl Read,
    ) -> Result<Self, IngestError> {
        let mut quality = DataQualityReport::default();

        let (parcels, parcel_counts) = extract::read_parcels(parcels, &mut quality)?;
        let (cases, case_counts) = extract::read_cases(cases, &mut quality)?;
        let (complaints, complaint_counts) = extract::read_complaints(complaints, &mut quality)?;
        let (permits, permit_counts) = extract::read_permits(permits, &mut quality)?;

        Ok(Self {
            parcels,
            cases,
            complaints,
            permits,
            source_files: Vec::new(),
            report: IngestReport {
                parcels: parcel_counts,
                cases: case_counts,
                complaints: complaint_counts,
                permits: permit_counts,
                data_quality: quality,
                ..IngestReport::default()
            },
        })
    }
}

fn list_csv_files(dir: &Path) -> Result<Vec<String>, IngestError> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "csv")
            && let Some(name) = path.file_name().and_then(|n| n.to_str())
        {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

/// Court cases split by the trailing scoring window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaseWindow {
    /// Cases dated within the window.
    pub in_window: Vec<CourtCaseEvent>,
    /// Dated cases before the window start or after the reference date.
    pub outside: u64,
    /// Cases with no usable date.
    pub undated: u64,
}

/// Keeps the cases dated within `window_days` before `as_of`, inclusive on
/// both ends. A window reaching past the earliest representable date starts
/// there instead.
#[must_use]
pub fn apply_case_window(
    cases: &[CourtCaseEvent],
    as_of: NaiveDate,
    window_days: u32,
) -> CaseWindow {
    let start = as_of
        .checked_sub_days(Days::new(u64::from(window_days)))
        .unwrap_or(NaiveDate::MIN);
    let mut window = CaseWindow::default();

    for case in cases {
        match case.offense_date {
            Some(date) if date >= start && date <= as_of => window.in_window.push(case.clone()),
            Some(_) => window.outside += 1,
            None => window.undated += 1,
        }
    }

    log::debug!(
        "Case window {start}..={as_of}: {} kept, {} outside, {} undated",
        window.in_window.len(),
        window.outside,
        window.undated,
    );

    window
}

/// Every document a run publishes.
#[derive(Debug, Clone)]
pub struct DerivedOutputs {
    /// Risk leaderboard, highest score first.
    pub leaderboard: Vec<ParcelRiskRecord>,
    /// Headline numbers over the full leaderboard.
    pub kpis: KpiSummary,
    /// Flagged permits, highest valuation first.
    pub watchlist: Vec<WatchlistEntry>,
    /// Weekly case and complaint counts.
    pub trends: Vec<TrendPoint>,
    /// Provenance document.
    pub metadata: Metadata,
    /// Row counts and data-quality issues.
    pub report: IngestReport,
}

/// Scores the extracts and derives every published document.
///
/// KPIs are computed over the full leaderboard before the optional
/// leaderboard limit is applied.
///
/// # Errors
///
/// Returns [`IngestError::Risk`] if the leaderboard breaks an engine
/// invariant.
pub fn build_outputs(
    extracts: RawExtracts,
    engine: &RiskEngine,
    as_of: NaiveDate,
    generated_at: DateTime<Utc>,
) -> Result<DerivedOutputs, IngestError> {
    let config = engine.config();
    let window = apply_case_window(&extracts.cases, as_of, config.case_window_days);

    let computation = engine.compute(&RiskInputs {
        parcels: &extracts.parcels,
        cases: &window.in_window,
        complaints: &extracts.complaints,
        permits: &extracts.permits,
    });
    check_invariants(&computation.records, &config.thresholds)?;

    let kpis = summarize(&computation.records, generated_at);

    let mut leaderboard = computation.records;
    for record in &mut leaderboard {
        record.truncate_offenses(config.top_offense_limit);
    }
    if let Some(limit) = config.leaderboard_limit {
        leaderboard.truncate(limit);
    }

    let watchlist = build_watchlist(&extracts.permits, config);
    let trends = weekly_trends(&extracts.cases, &extracts.complaints);

    let mut report = extracts.report;
    report.cases_outside_window = window.outside;
    report.undated_cases = window.undated;
    report.data_quality.merge(computation.report);

    Ok(DerivedOutputs {
        leaderboard,
        kpis,
        watchlist,
        trends,
        metadata: Metadata {
            generated_at,
            weights: config.weights,
            source_files: extracts.source_files,
        },
        report,
    })
}

/// Writes every derived document into `dir` as pretty-printed JSON.
///
/// Each document is written to a temporary file and renamed over the old
/// one, so a reader never sees a partially written document.
///
/// # Errors
///
/// Returns [`IngestError`] if the directory cannot be created or a
/// document cannot be written.
pub fn write_outputs(dir: &Path, outputs: &DerivedOutputs) -> Result<Vec<PathBuf>, IngestError> {
    fs::create_dir_all(dir)?;

    Ok(vec![
        write_json(dir, PARCEL_RISK_FILE, &outputs.leaderboard)?,
        write_json(dir, KPI_SUMMARY_FILE, &outputs.kpis)?,
        write_json(dir, PERMIT_WATCHLIST_FILE, &outputs.watchlist)?,
        write_json(dir, OFFENSE_TRENDS_FILE, &outputs.trends)?,
        write_json(dir, METADATA_FILE, &outputs.metadata)?,
        write_json(dir, INGEST_REPORT_FILE, &outputs.report)?,
    ])
}

fn write_json<T: Serialize + ?Sized>(
    dir: &Path,
    name: &str,
    value: &T,
) -> Result<PathBuf, IngestError> {
    let path = dir.join(name);
    let tmp = dir.join(format!(".{name}.tmp"));

    let mut writer = BufWriter::new(File::create(&tmp)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    drop(writer);

    fs::rename(&tmp, &path)?;
    log::debug!("Wrote {}", path.display());
    Ok(path)
}

/// Reads, scores, and derives everything without writing any output.
///
/// # Errors
///
/// Returns [`IngestError`] if the config or an extract cannot be loaded, or
/// the leaderboard breaks an engine invariant.
pub fn prepare(config: &IngestConfig) -> Result<DerivedOutputs, IngestError> {
    let scoring = config::load_scoring_config(config.config_path.as_deref())?;
    let engine = RiskEngine::new(scoring)?;
    let extracts = RawExtracts::from_dir(&config.raw_dir)?;
    build_outputs(extracts, &engine, config.as_of, Utc::now())
}

/// Runs a full ingestion: read, score, and publish.
///
/// # Errors
///
/// Returns [`IngestError`] on any file-level failure. Per-record problems
/// are reported in [`IngestResult::report`] instead.
pub fn run(config: &IngestConfig) -> Result<IngestResult, IngestError> {
    let start = Instant::now();
    log::info!(
        "Ingesting {} into {} (as of {})",
        config.raw_dir.display(),
        config.derived_dir.display(),
        config.as_of,
    );

    let outputs = prepare(config)?;
    let files_written = write_outputs(&config.derived_dir, &outputs)?;

    let result = IngestResult {
        parcels_published: outputs.leaderboard.len() as u64,
        watchlist_size: outputs.watchlist.len() as u64,
        report: outputs.report,
        files_written,
        duration: start.elapsed(),
    };

    log::info!(
        "Published {} parcels and {} watchlist permits in {:.1}s ({} data-quality issues)",
        result.parcels_published,
        result.watchlist_size,
        result.duration.as_secs_f64(),
        result.report.data_quality.issues.len(),
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use parcel_watch_parcel_models::RiskLevel;
    use parcel_watch_risk_models::WatchReason;
    use parcel_watch_risk_models::config::ScoringConfig;
    use parcel_watch_risk_models::quality::DataQualityKind;

    use super::*;

    const PARCELS: &str = "taxpin,address,owner,land_use\n\
                           P1,100 MAIN ST,ACME LLC,Commercial\n\
                           P2,200 MAIN ST,,Residential\n\
                           P3,300 MAIN ST,,Vacant\n";

    const CASES: &str = "case_id,taxpin,offense_type,offense_date\n\
                         C1,P1,Burglary,2025-02-03\n\
                         C2,P1,Burglary,2025-02-05\n\
                         C3,P1,Assault,2025-02-12\n\
                         C4,P1,Vandalism,2023-01-01\n\
                         C5,P2,Theft,\n\
                         C6,P9,Theft,2025-02-04\n";

    const COMPLAINTS: &str = "complaint_id,taxpin,status,complaint_date\n\
                              K1,P1,Open,2025-02-04\n\
                              K2,P1,Closed,2025-02-11\n\
                              K3,P2,Closed,2025-02-11\n";

    const PERMITS: &str = "permit_id,property_id,address,permit_type,status,valuation,issue_date\n\
                           B1,P1,100 MAIN ST,New Construction,Issued,\"$250,000\",2025-01-10\n\
                           B2,,9 SIDE ST,Alteration,Pending,5000,2025-01-12\n\
                           B3,P3,300 MAIN ST,Demolition,Issued,bad,2025-01-15\n";

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, 28).unwrap()
    }

    fn generated_at() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-02-28T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn fixture_outputs(config: ScoringConfig) -> DerivedOutputs {
        let extracts = RawExtracts::from_readers(
            PARCELS.as_bytes(),
            CASES.as_bytes(),
            COMPLAINTS.as_bytes(),
            PERMITS.as_bytes(),
        )
        .unwrap();
        let engine = RiskEngine::new(config).unwrap();
        build_outputs(extracts, &engine, as_of(), generated_at()).unwrap()
    }

    fn case(id: &str, date: Option<&str>) -> CourtCaseEvent {
        CourtCaseEvent {
            case_id: id.to_string(),
            taxpin: "P1".to_string(),
            offense_type: "Theft".to_string(),
            offense_date: date.map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").unwrap()),
        }
    }

    #[test]
    fn case_window_is_inclusive_on_both_ends() {
        let cases = [
            case("edge-start", Some("2024-09-01")),
            case("before", Some("2024-08-31")),
            case("edge-end", Some("2025-02-28")),
            case("future", Some("2025-03-01")),
            case("undated", None),
        ];
        let window = apply_case_window(&cases, as_of(), 180);
        let kept: Vec<&str> = window.in_window.iter().map(|c| c.case_id.as_str()).collect();
        assert_eq!(kept, ["edge-start", "edge-end"]);
        assert_eq!(window.outside, 2);
        assert_eq!(window.undated, 1);
    }

    #[test]
    fn case_window_clamps_at_calendar_start() {
        let earliest = CourtCaseEvent {
            offense_date: Some(NaiveDate::MIN),
            ..case("earliest", None)
        };
        let as_of = NaiveDate::MIN.checked_add_days(Days::new(10)).unwrap();
        let window = apply_case_window(&[earliest], as_of, 36_500);
        assert_eq!(window.in_window.len(), 1);
        assert_eq!(window.outside, 0);
    }

    #[test]
    fn far_future_dates_do_not_abort_the_batch() {
        let cases = format!("{CASES}C7,P1,Theft,+262142-12-31\n");
        let extracts = RawExtracts::from_readers(
            PARCELS.as_bytes(),
            cases.as_bytes(),
            COMPLAINTS.as_bytes(),
            PERMITS.as_bytes(),
        )
        .unwrap();
        let engine = RiskEngine::new(ScoringConfig::default()).unwrap();
        let outputs = build_outputs(extracts, &engine, as_of(), generated_at()).unwrap();

        assert_eq!(outputs.report.undated_cases, 2);
        assert_eq!(
            outputs.report.data_quality.count(DataQualityKind::UnparseableDate),
            1
        );
        assert!((outputs.leaderboard[0].risk_score - 12.5).abs() < f64::EPSILON);
    }

    #[test]
    fn fixture_scores_and_ranks_parcels() {
        let outputs = fixture_outputs(ScoringConfig::default());
        let board = &outputs.leaderboard;

        assert_eq!(board.len(), 3);
        // 3 cases * 2.0 + 2 complaints * 1.5 + 1 open * 0.5 + 1 high-value * 3.0
        assert_eq!(board[0].taxpin, "P1");
        assert!((board[0].risk_score - 12.5).abs() < f64::EPSILON);
        assert_eq!(board[0].risk_level, RiskLevel::Critical);
        assert_eq!(board[0].top_offenses[0].offense_type, "Burglary");
        assert_eq!(board[0].top_offenses[0].count, 2);

        assert_eq!(board[1].taxpin, "P2");
        assert!((board[1].risk_score - 1.5).abs() < f64::EPSILON);
        assert_eq!(board[1].case_count, 0);

        assert_eq!(board[2].taxpin, "P3");
        assert!(board[2].risk_score.abs() < f64::EPSILON);
        assert_eq!(board[2].risk_level, RiskLevel::Low);
    }

    #[test]
    fn fixture_report_counts_every_dropped_record() {
        let outputs = fixture_outputs(ScoringConfig::default());
        let report = &outputs.report;

        assert_eq!(report.cases.rows_read, 6);
        assert_eq!(report.cases_outside_window, 1);
        assert_eq!(report.undated_cases, 1);
        assert_eq!(report.permits.rows_skipped(), 1);
        assert_eq!(report.data_quality.rejected_permits, 1);
        assert_eq!(report.data_quality.orphaned_cases, 1);
        assert_eq!(report.data_quality.unlinked_permits, 1);
        assert_eq!(
            report.data_quality.count(DataQualityKind::MalformedValuation),
            1
        );
    }

    #[test]
    fn fixture_kpis_watchlist_and_trends() {
        let outputs = fixture_outputs(ScoringConfig::default());

        assert_eq!(outputs.kpis.total_cases, 3);
        assert_eq!(outputs.kpis.open_complaints, 1);
        assert_eq!(outputs.kpis.high_risk_sites, 1);
        assert_eq!(outputs.kpis.high_value_permits, 1);
        assert_eq!(outputs.kpis.generated_at, generated_at());

        let ids: Vec<&str> = outputs.watchlist.iter().map(|w| w.permit_id.as_str()).collect();
        assert_eq!(ids, ["B1", "B2"]);
        assert_eq!(outputs.watchlist[0].reasons, [WatchReason::HighValuation]);
        assert_eq!(outputs.watchlist[1].reasons, [WatchReason::PendingReview]);
        assert_eq!(outputs.watchlist[1].property_id, None);

        // Trends count every dated event, including the stale and orphaned cases.
        let first = &outputs.trends[0];
        assert_eq!(first.period, "2022-12-26/2023-01-01");
        assert_eq!(first.case_count, 1);
        let feb = outputs
            .trends
            .iter()
            .find(|t| t.period == "2025-02-03/2025-02-09")
            .unwrap();
        assert_eq!(feb.case_count, 3);
        assert_eq!(feb.complaint_count, 1);
    }

    #[test]
    fn leaderboard_limit_applies_after_kpis() {
        let config = ScoringConfig {
            leaderboard_limit: Some(1),
            top_offense_limit: 1,
            ..ScoringConfig::default()
        };
        let outputs = fixture_outputs(config);

        assert_eq!(outputs.leaderboard.len(), 1);
        assert_eq!(outputs.leaderboard[0].top_offenses.len(), 1);
        assert_eq!(outputs.kpis.total_cases, 3);
    }

    #[test]
    fn metadata_carries_weights() {
        let outputs = fixture_outputs(ScoringConfig::default());
        assert_eq!(outputs.metadata.weights, ScoringConfig::default().weights);
        assert!(outputs.metadata.source_files.is_empty());
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "parcel_watch_ingest_{name}_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn run_reads_raw_dir_and_replaces_outputs() {
        let root = scratch_dir("run");
        let raw_dir = root.join("raw");
        let derived_dir = root.join("derived");
        fs::create_dir_all(&raw_dir).unwrap();
        fs::write(raw_dir.join(PARCELS_FILE), PARCELS).unwrap();
        fs::write(raw_dir.join(CASES_FILE), CASES).unwrap();
        fs::write(raw_dir.join(COMPLAINTS_FILE), COMPLAINTS).unwrap();
        fs::write(raw_dir.join(PERMITS_FILE), PERMITS).unwrap();
        fs::write(raw_dir.join("notes.txt"), "ignored").unwrap();

        fs::create_dir_all(&derived_dir).unwrap();
        fs::write(derived_dir.join(PARCEL_RISK_FILE), "stale").unwrap();

        let config = IngestConfig {
            raw_dir,
            derived_dir: derived_dir.clone(),
            as_of: as_of(),
            config_path: None,
        };
        let result = run(&config).unwrap();

        assert_eq!(result.parcels_published, 3);
        assert_eq!(result.watchlist_size, 2);
        assert_eq!(result.files_written.len(), 6);

        let board: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(derived_dir.join(PARCEL_RISK_FILE)).unwrap())
                .unwrap();
        assert_eq!(board[0]["taxpin"], "P1");
        assert_eq!(board[0]["risk_level"], "Critical");

        let metadata: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(derived_dir.join(METADATA_FILE)).unwrap())
                .unwrap();
        assert_eq!(
            metadata["source_files"],
            serde_json::json!(["cases.csv", "complaints.csv", "parcels.csv", "permits.csv"])
        );

        let leftovers = fs::read_dir(&derived_dir)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn missing_extract_aborts_before_writing() {
        let root = scratch_dir("missing");
        let raw_dir = root.join("raw");
        fs::create_dir_all(&raw_dir).unwrap();
        fs::write(raw_dir.join(PARCELS_FILE), PARCELS).unwrap();

        let config = IngestConfig {
            raw_dir,
            derived_dir: root.join("derived"),
            as_of: as_of(),
            config_path: None,
        };
        let err = run(&config).unwrap_err();

        assert!(matches!(err, IngestError::MissingInput { ref path } if path.ends_with(CASES_FILE)));
        assert!(!root.join("derived").exists());

        fs::remove_dir_all(&root).unwrap();
    }
}
