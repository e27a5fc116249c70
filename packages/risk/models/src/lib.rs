#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Scoring configuration and derived output types for parcel risk.
//!
//! Defines the tunable [`config::ScoringConfig`], the documents published
//! next to the risk leaderboard (KPI summary, permit watchlist, weekly
//! trends), and the [`quality::DataQualityReport`] that accompanies every
//! run.

pub mod config;
pub mod quality;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Dashboard headline numbers reduced from the risk leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KpiSummary {
    /// When the summary was produced.
    pub generated_at: DateTime<Utc>,
    /// Court cases across all parcels.
    pub total_cases: u64,
    /// Open complaints across all parcels.
    pub open_complaints: u64,
    /// Parcels at the High or Critical tier.
    pub high_risk_sites: u64,
    /// High-value permits across all parcels.
    pub high_value_permits: u64,
}

/// Why a permit landed on the watchlist.
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
pub enum WatchReason {
    /// Valuation at or above the high-value threshold.
    #[serde(rename = "High valuation")]
    #[strum(serialize = "High valuation")]
    HighValuation,
    /// Status is one of the stalled statuses.
    #[serde(rename = "Pending review")]
    #[strum(serialize = "Pending review")]
    PendingReview,
}

/// A permit flagged for review, whether or not it is linked to a parcel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchlistEntry {
    /// Permit identifier.
    pub permit_id: String,
    /// Linked parcel key, if any.
    pub property_id: Option<String>,
    /// Site address.
    pub address: String,
    /// Permit type.
    pub permit_type: String,
    /// Status as published.
    pub status: String,
    /// Declared valuation in dollars.
    pub valuation: f64,
    /// Issue date.
    pub issue_date: Option<NaiveDate>,
    /// Conditions that triggered inclusion. Never empty.
    pub reasons: Vec<WatchReason>,
}

/// Case and complaint counts for one week.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrendPoint {
    /// Week label, `"YYYY-MM-DD/YYYY-MM-DD"` from Monday through Sunday.
    pub period: String,
    /// Court cases dated within the week.
    pub case_count: u64,
    /// Complaints dated within the week.
    pub complaint_count: u64,
}
