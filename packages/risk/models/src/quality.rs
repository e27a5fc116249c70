//! Data-quality diagnostics collected during a scoring run.
//!
//! Per-record problems never abort a batch. The offending record is skipped,
//! described by a [`DataQualityIssue`], and tallied in a
//! [`DataQualityReport`] that ships alongside the derived outputs.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Which raw extract a record came from.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventSource {
    /// The parcel roll.
    Parcels,
    /// Court cases.
    Cases,
    /// Code-enforcement complaints.
    Complaints,
    /// Building permits.
    Permits,
}

/// Category of a per-record data-quality problem.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DataQualityKind {
    /// Permit valuation is non-numeric, negative, or not finite.
    MalformedValuation,
    /// Event references a parcel key missing from the roll.
    OrphanedParcel,
    /// Status text is not one of the recognized values.
    UnknownStatus,
    /// A required column is empty.
    MissingField,
    /// A date column could not be parsed and was dropped.
    UnparseableDate,
    /// The parcel roll lists the same key more than once.
    DuplicateParcel,
    /// A CSV row could not be decoded at all.
    MalformedRow,
}

/// One skipped or degraded record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataQualityIssue {
    /// What went wrong.
    pub kind: DataQualityKind,
    /// Extract the record came from.
    pub source: EventSource,
    /// Identifier of the record (case id, permit id, row number, ...).
    pub record_id: String,
    /// Human-readable detail.
    pub message: String,
}

impl DataQualityIssue {
    /// Creates a new issue.
    #[must_use]
    pub fn new(
        kind: DataQualityKind,
        source: EventSource,
        record_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            source,
            record_id: record_id.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for DataQualityIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {} {}: {}",
            self.kind, self.source, self.record_id, self.message
        )
    }
}

/// Aggregate data-quality counts for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataQualityReport {
    /// Every issue in the order it was found.
    pub issues: Vec<DataQualityIssue>,
    /// Court cases whose parcel is not in the roll.
    pub orphaned_cases: u64,
    /// Complaints whose parcel is not in the roll.
    pub orphaned_complaints: u64,
    /// Linked permits whose parcel is not in the roll.
    pub orphaned_permits: u64,
    /// Permits rejected for a malformed valuation.
    pub rejected_permits: u64,
    /// Permits with no parcel key. Not an error; they only feed the
    /// watchlist.
    pub unlinked_permits: u64,
}

impl DataQualityReport {
    /// Records an issue, bumping the matching counter.
    pub fn record(&mut self, issue: DataQualityIssue) {
        match (issue.kind, issue.source) {
            (DataQualityKind::OrphanedParcel, EventSource::Cases) => self.orphaned_cases += 1,
            (DataQualityKind::OrphanedParcel, EventSource::Complaints) => {
                self.orphaned_complaints += 1;
            }
            (DataQualityKind::OrphanedParcel, EventSource::Permits) => self.orphaned_permits += 1,
            (DataQualityKind::MalformedValuation, _) => self.rejected_permits += 1,
            _ => {}
        }
        self.issues.push(issue);
    }

    /// Total events dropped because their parcel is not in the roll.
    #[must_use]
    pub const fn orphaned_events(&self) -> u64 {
        self.orphaned_cases + self.orphaned_complaints + self.orphaned_permits
    }

    /// Number of issues of the given kind.
    #[must_use]
    pub fn count(&self, kind: DataQualityKind) -> usize {
        self.issues.iter().filter(|i| i.kind == kind).count()
    }

    /// Returns `true` if no issue was recorded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Folds another report into this one.
    pub fn merge(&mut self, other: Self) {
        self.orphaned_cases += other.orphaned_cases;
        self.orphaned_complaints += other.orphaned_complaints;
        self.orphaned_permits += other.orphaned_permits;
        self.rejected_permits += other.rejected_permits;
        self.unlinked_permits += other.unlinked_permits;
        self.issues.extend(other.issues);
    }
}
