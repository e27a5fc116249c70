#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Parcel risk aggregation engine.
//!
//! Folds court cases, code complaints, and building permits into one
//! [`ParcelRiskRecord`](parcel_watch_parcel_models::ParcelRiskRecord) per
//! parcel, then derives the documents published next to the leaderboard.
//! Every function here is a pure computation over in-memory snapshots;
//! reading extracts and writing outputs belong to the ingestion layer.

pub mod engine;
pub mod kpi;
pub mod trends;
pub mod watchlist;

use parcel_watch_risk_models::config::ConfigError;
use thiserror::Error;

pub use engine::{RiskComputation, RiskEngine, RiskInputs, compute_parcel_risk};

/// Errors that can occur while setting up or checking a scoring run.
#[derive(Debug, Error)]
pub enum RiskError {
    /// The scoring configuration is unusable.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// A derived record breaks an invariant the engine guarantees.
    #[error("Invariant violation for parcel {taxpin}: {message}")]
    InvariantViolation {
        /// Parcel whose record is inconsistent.
        taxpin: String,
        /// Description of what went wrong.
        message: String,
    },
}
