#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Parcel identity, municipal event, and derived risk record types.
//!
//! Raw events (court cases, code complaints, building permits) are keyed by
//! a parcel's TAXPIN. The scoring engine folds them into one
//! [`ParcelRiskRecord`] per parcel in the roll. JSON field names follow the
//! snake_case contract of the published dashboard API.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Discrete risk tier derived from a parcel's risk score.
///
/// Variants are declared in ascending order so the derived [`Ord`] matches
/// severity: a higher score never yields a lower tier.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
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
pub enum RiskLevel {
    /// Score below the moderate threshold.
    #[default]
    Low,
    /// Score at or above the moderate threshold.
    Moderate,
    /// Score at or above the high threshold.
    High,
    /// Score at or above the critical threshold.
    Critical,
}

impl RiskLevel {
    /// Returns `true` for the tiers counted as high-risk sites.
    #[must_use]
    pub const fn is_elevated(self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }

    /// Returns all variants of this enum, lowest tier first.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Low, Self::Moderate, Self::High, Self::Critical]
    }
}

/// Open/closed state of a code-enforcement complaint.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum ComplaintStatus {
    /// Complaint is still under investigation.
    Open,
    /// Complaint has been resolved.
    Closed,
}

/// A parcel from the parcel roll.
///
/// Reference data: rebuilt wholesale on each ingestion cycle and never
/// mutated in between.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParcelIdentity {
    /// Unique parcel key.
    pub taxpin: String,
    /// Street address.
    pub address: String,
    /// Owner of record, if published.
    pub owner: Option<String>,
    /// Land-use classification (e.g. "Residential", "Commercial").
    pub land_use: Option<String>,
}

/// A court case tied to a parcel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourtCaseEvent {
    /// Case identifier from the court extract.
    pub case_id: String,
    /// Parcel the case is tied to.
    pub taxpin: String,
    /// Offense type as published (e.g. "Burglary").
    pub offense_type: String,
    /// When the offense occurred. `None` when the extract has no usable date.
    pub offense_date: Option<NaiveDate>,
}

/// A code-enforcement complaint tied to a parcel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplaintEvent {
    /// Complaint identifier from the extract.
    pub complaint_id: String,
    /// Parcel the complaint is tied to.
    pub taxpin: String,
    /// Whether the complaint is still open.
    pub status: ComplaintStatus,
    /// When the complaint was filed.
    pub complaint_date: Option<NaiveDate>,
}

impl ComplaintEvent {
    /// Returns `true` if the complaint is still open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status == ComplaintStatus::Open
    }
}

/// A building permit. Permits may be unlinked from any parcel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermitRecord {
    /// Permit identifier.
    pub permit_id: String,
    /// Parcel the permit is filed against, if linked.
    pub taxpin: Option<String>,
    /// Site address as written on the permit.
    pub address: String,
    /// Permit type (e.g. "New Construction").
    pub permit_type: String,
    /// Free-text permit status (e.g. "Issued", "Pending", "Issued - Hold").
    pub status: String,
    /// Declared project valuation in dollars.
    pub valuation: f64,
    /// Date the permit was issued.
    pub issue_date: Option<NaiveDate>,
}

/// Count of court cases of one offense type at a parcel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffenseCount {
    /// Offense type name.
    pub offense_type: String,
    /// Number of cases of this type.
    pub count: u64,
}

/// Derived per-parcel risk summary produced by the scoring engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParcelRiskRecord {
    /// Parcel key.
    pub taxpin: String,
    /// Street address from the parcel roll.
    pub address: String,
    /// Owner of record.
    pub owner: Option<String>,
    /// Land-use classification.
    pub land_use: Option<String>,
    /// Court cases within the scoring window.
    pub case_count: u64,
    /// All complaints, open and closed.
    pub complaint_count: u64,
    /// Subset of `complaint_count` still open.
    pub open_complaints: u64,
    /// Permits at or above the high-value threshold.
    pub high_value_permits: u64,
    /// Permits in a stall-indicating status.
    pub stalled_permits: u64,
    /// Weighted risk score.
    pub risk_score: f64,
    /// Tier derived from `risk_score`.
    pub risk_level: RiskLevel,
    /// Offense types by descending count, ties broken by name.
    #[serde(default)]
    pub top_offenses: Vec<OffenseCount>,
}

impl ParcelRiskRecord {
    /// Returns the `n` most frequent offense types.
    #[must_use]
    pub fn top_offenses(&self, n: usize) -> &[OffenseCount] {
        &self.top_offenses[..n.min(self.top_offenses.len())]
    }

    /// Drops all but the `n` most frequent offense types.
    pub fn truncate_offenses(&mut self, n: usize) {
        self.top_offenses.truncate(n);
    }

    /// Total events that contributed to this record.
    #[must_use]
    pub const fn event_count(&self) -> u64 {
        self.case_count + self.complaint_count + self.high_value_permits + self.stalled_permits
    }
}
