//! CSV extract readers.
//!
//! Each reader decodes one raw extract into model records. Rows that cannot
//! be used are skipped and described in the run's [`DataQualityReport`];
//! only a file-level failure (unreadable header, I/O error) aborts the run.

use std::collections::BTreeMap;
use std::io::Read;
use std::str::FromStr as _;

use parcel_watch_ingest_models::ExtractCounts;
use parcel_watch_parcel_models::{
    ComplaintEvent, ComplaintStatus, CourtCaseEvent, ParcelIdentity, PermitRecord,
};
use parcel_watch_risk_models::quality::{
    DataQualityIssue, DataQualityKind, DataQualityReport, EventSource,
};

use crate::IngestError;
use crate::parsing::{non_empty, parse_date, parse_valuation};

/// Offense type recorded for cases whose extract row leaves it blank.
pub const UNKNOWN_OFFENSE: &str = "Unknown";

/// Columns the parcel roll must carry. `owner` and `land_use` are optional.
pub const PARCEL_COLUMNS: &[&str] = &["taxpin", "address"];
/// Columns the court case extract must carry.
pub const CASE_COLUMNS: &[&str] = &["case_id", "taxpin", "offense_type", "offense_date"];
/// Columns the complaint extract must carry.
pub const COMPLAINT_COLUMNS: &[&str] =
    &["complaint_id", "taxpin", "status", "complaint_date"];
/// Columns the permit extract must carry.
pub const PERMIT_COLUMNS: &[&str] = &[
    "permit_id",
    "property_id",
    "address",
    "permit_type",
    "status",
    "valuation",
    "issue_date",
];

/// One decoded CSV row keyed by trimmed header name.
struct RawRow {
    /// `"row N"`, counting the header as row 1.
    label: String,
    values: BTreeMap<String, String>,
}

impl RawRow {
    /// Returns the cell under `column`, or `""` when the row is short or
    /// the column is absent.
    fn get(&self, column: &str) -> &str {
        self.values.get(column).map_or("", String::as_str)
    }
}

/// Decodes every row of a CSV extract into header-keyed maps.
///
/// The header must name every column in `required`. Rows that fail to
/// decode (bad UTF-8, for example) are skipped and reported. I/O failures
/// abort.
fn read_rows(
    reader: impl Read,
    source: EventSource,
    required: &[&str],
    report: &mut DataQualityReport,
) -> Result<(Vec<RawRow>, u64), IngestError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()
        .map_err(|e| IngestError::csv(source, e))?
        .iter()
        .map(|h| h.trim().to_owned())
        .collect();
    if headers.iter().all(String::is_empty) {
        return Err(IngestError::EmptyExtract { extract: source });
    }
    if let Some(column) = required.iter().find(|c| !headers.iter().any(|h| h == *c)) {
        return Err(IngestError::MissingColumn {
            extract: source,
            column: (*column).to_string(),
        });
    }

    let mut rows = Vec::new();
    let mut rows_read = 0u64;

    for (i, result) in csv_reader.records().enumerate() {
        rows_read += 1;
        let label = format!("row {}", i + 2);
        let record = match result {
            Ok(record) => record,
            Err(e) if e.is_io_error() => return Err(IngestError::csv(source, e)),
            Err(e) => {
                log::warn!("Skipping {source} {label}: {e}");
                report.record(DataQualityIssue::new(
                    DataQualityKind::MalformedRow,
                    source,
                    label,
                    e.to_string(),
                ));
                continue;
            }
        };

        let values = headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                (header.clone(), record.get(i).unwrap_or("").to_owned())
            })
            .collect();
        rows.push(RawRow { label, values });
    }

    log::debug!("Read {rows_read} {source} rows");

    Ok((rows, rows_read))
}

fn skip(
    report: &mut DataQualityReport,
    kind: DataQualityKind,
    source: EventSource,
    id: &str,
    message: String,
) {
    log::warn!("Skipping {source} record {id}: {message}");
    report.record(DataQualityIssue::new(kind, source, id, message));
}

fn parse_optional_date(
    raw: &str,
    column: &str,
    source: EventSource,
    id: &str,
    report: &mut DataQualityReport,
) -> Option<chrono::NaiveDate> {
    if raw.is_empty() {
        return None;
    }
    let parsed = parse_date(raw);
    if parsed.is_none() {
        report.record(DataQualityIssue::new(
            DataQualityKind::UnparseableDate,
            source,
            id,
            format!("{column} {raw:?} is not a recognized date"),
        ));
    }
    parsed
}

/// Reads the parcel roll (`taxpin,address,owner,land_use`).
///
/// # Errors
///
/// Returns [`IngestError`] if the CSV header or a raw row cannot be read,
/// or the header lacks a required column.
pub fn read_parcels(
    reader: impl Read,
    report: &mut DataQualityReport,
) -> Result<(Vec<ParcelIdentity>, ExtractCounts), IngestError> {
    let source = EventSource::Parcels;
    let (rows, rows_read) = read_rows(reader, source, PARCEL_COLUMNS, report)?;
    let mut parcels = Vec::with_capacity(rows.len());

    for row in rows {
        let Some(taxpin) = non_empty(row.get("taxpin")) else {
            skip(
                report,
                DataQualityKind::MissingField,
                source,
                &row.label,
                "taxpin is empty".to_string(),
            );
            continue;
        };
        parcels.push(ParcelIdentity {
            taxpin,
            address: row.get("address").to_string(),
            owner: non_empty(row.get("owner")),
            land_use: non_empty(row.get("land_use")),
        });
    }

    let counts = ExtractCounts {
        rows_read,
        records_kept: parcels.len() as u64,
    };
    Ok((parcels, counts))
}

/// Reads court cases (`case_id,taxpin,offense_type,offense_date`).
///
/// # Errors
///
/// Returns [`IngestError`] if the CSV header or a raw row cannot be read,
/// or the header lacks a required column.
pub fn read_cases(
    reader: impl Read,
    report: &mut DataQualityReport,
) -> Result<(Vec<CourtCaseEvent>, ExtractCounts), IngestError> {
    let source = EventSource::Cases;
    let (rows, rows_read) = read_rows(reader, source, CASE_COLUMNS, report)?;
    let mut cases = Vec::with_capacity(rows.len());

    for row in rows {
        let case_id = non_empty(row.get("case_id")).unwrap_or_else(|| row.label.clone());
        let Some(taxpin) = non_empty(row.get("taxpin")) else {
            skip(
                report,
                DataQualityKind::MissingField,
                source,
                &case_id,
                "taxpin is empty".to_string(),
            );
            continue;
        };
        let offense_type = non_empty(row.get("offense_type")).unwrap_or_else(|| {
            report.record(DataQualityIssue::new(
                DataQualityKind::MissingField,
                source,
                &case_id,
                format!("offense_type is empty, recorded as {UNKNOWN_OFFENSE}"),
            ));
            UNKNOWN_OFFENSE.to_string()
        });
        let offense_date =
            parse_optional_date(row.get("offense_date"), "offense_date", source, &case_id, report);
        cases.push(CourtCaseEvent {
            case_id,
            taxpin,
            offense_type,
            offense_date,
        });
    }

    let counts = ExtractCounts {
        rows_read,
        records_kept: cases.len() as u64,
    };
    Ok((cases, counts))
}

/// Reads code complaints (`complaint_id,taxpin,status,complaint_date`).
///
/// Status must be `Open` or `Closed` in any letter case.
///
/// # Errors
///
/// Returns [`IngestError`] if the CSV header or a raw row cannot be read,
/// or the header lacks a required column.
pub fn read_complaints(
    reader: impl Read,
    report: &mut DataQualityReport,
) -> Result<(Vec<ComplaintEvent>, ExtractCounts), IngestError> {
    let source = EventSource::Complaints;
    let (rows, rows_read) = read_rows(reader, source, COMPLAINT_COLUMNS, report)?;
    let mut complaints = Vec::with_capacity(rows.len());

    for row in rows {
        let complaint_id =
            non_empty(row.get("complaint_id")).unwrap_or_else(|| row.label.clone());
        let Some(taxpin) = non_empty(row.get("taxpin")) else {
            skip(
                report,
                DataQualityKind::MissingField,
                source,
                &complaint_id,
                "taxpin is empty".to_string(),
            );
            continue;
        };
        let raw_status = row.get("status");
        let Ok(status) = ComplaintStatus::from_str(raw_status) else {
            skip(
                report,
                DataQualityKind::UnknownStatus,
                source,
                &complaint_id,
                format!("status {raw_status:?} is not Open or Closed"),
            );
            continue;
        };
        let complaint_date = parse_optional_date(
            row.get("complaint_date"),
            "complaint_date",
            source,
            &complaint_id,
            report,
        );
        complaints.push(ComplaintEvent {
            complaint_id,
            taxpin,
            status,
            complaint_date,
        });
    }

    let counts = ExtractCounts {
        rows_read,
        records_kept: complaints.len() as u64,
    };
    Ok((complaints, counts))
}

/// Reads building permits
/// (`permit_id,property_id,address,permit_type,status,valuation,issue_date`).
///
/// An empty `property_id` makes the permit unlinked.
///
/// # Errors
///
/// Returns [`IngestError`] if the CSV header or a raw row cannot be read,
/// or the header lacks a required column.
pub fn read_permits(
    reader: impl Read,
    report: &mut DataQualityReport,
) -> Result<(Vec<PermitRecord>, ExtractCounts), IngestError> {
    let source = EventSource::Permits;
    let (rows, rows_read) = read_rows(reader, source, PERMIT_COLUMNS, report)?;
    let mut permits = Vec::with_capacity(rows.len());

    for row in rows {
        let Some(permit_id) = non_empty(row.get("permit_id")) else {
            skip(
                report,
                DataQualityKind::MissingField,
                source,
                &row.label,
                "permit_id is empty".to_string(),
            );
            continue;
        };
        let valuation = match parse_valuation(row.get("valuation")) {
            Ok(v) => v,
            Err(e) => {
                skip(
                    report,
                    DataQualityKind::MalformedValuation,
                    source,
                    &permit_id,
                    e.to_string(),
                );
                continue;
            }
        };
        let issue_date =
            parse_optional_date(row.get("issue_date"), "issue_date", source, &permit_id, report);
        permits.push(PermitRecord {
            permit_id,
            taxpin: non_empty(row.get("property_id")),
            address: row.get("address").to_string(),
            permit_type: row.get("permit_type").to_string(),
            status: row.get("status").to_string(),
            valuation,
            issue_date,
        });
    }

    let counts = ExtractCounts {
        rows_read,
        records_kept: permits.len() as u64,
    };
    Ok((permits, counts))
}
