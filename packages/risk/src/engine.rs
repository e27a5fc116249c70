//! Per-parcel aggregation, scoring, and leaderboard ordering.
//!
//! The engine walks each event collection once, tallying into a map keyed
//! by TAXPIN that is seeded from the parcel roll. Events whose parcel is not
//! in the roll are dropped and counted. Every roll parcel yields exactly one
//! record, including parcels with no events at all.

use std::collections::{BTreeMap, BTreeSet};

use parcel_watch_parcel_models::{
    ComplaintEvent, CourtCaseEvent, OffenseCount, ParcelIdentity, ParcelRiskRecord, PermitRecord,
};
use parcel_watch_risk_models::config::{RiskThresholds, RiskWeights, ScoringConfig};
use parcel_watch_risk_models::quality::{
    DataQualityIssue, DataQualityKind, DataQualityReport, EventSource,
};

use crate::RiskError;

/// Borrowed snapshot of everything one scoring run reads.
#[derive(Debug, Clone, Copy)]
pub struct RiskInputs<'a> {
    /// The parcel roll.
    pub parcels: &'a [ParcelIdentity],
    /// Court cases, already restricted to the scoring window by the caller.
    pub cases: &'a [CourtCaseEvent],
    /// Code-enforcement complaints.
    pub complaints: &'a [ComplaintEvent],
    /// Building permits, linked or not.
    pub permits: &'a [PermitRecord],
}

/// Output of a scoring run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RiskComputation {
    /// One record per roll parcel, highest score first.
    pub records: Vec<ParcelRiskRecord>,
    /// Skipped records and orphan counts.
    pub report: DataQualityReport,
}

/// A scoring engine bound to a validated configuration.
#[derive(Debug, Clone)]
pub struct RiskEngine {
    config: ScoringConfig,
}

impl RiskEngine {
    /// Creates an engine after validating the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RiskError::Config`] if the weights or thresholds are
    /// unusable.
    pub fn new(config: ScoringConfig) -> Result<Self, RiskError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The configuration this engine scores with.
    #[must_use]
    pub const fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Runs [`compute_parcel_risk`] with this engine's configuration.
    #[must_use]
    pub fn compute(&self, inputs: &RiskInputs<'_>) -> RiskComputation {
        compute_parcel_risk(inputs, &self.config)
    }
}

#[derive(Debug, Default)]
struct ParcelTally<'a> {
    case_count: u64,
    complaint_count: u64,
    open_complaints: u64,
    high_value_permits: u64,
    stalled_permits: u64,
    offenses: BTreeMap<&'a str, u64>,
}

/// Returns `true` if the permit's valuation can be scored.
///
/// Negative and non-finite valuations are malformed.
#[must_use]
pub fn has_valid_valuation(permit: &PermitRecord) -> bool {
    permit.valuation.is_finite() && permit.valuation >= 0.0
}

/// Builds the risk leaderboard.
///
/// Records come back sorted by descending score with ties broken by
/// ascending TAXPIN. Per-record problems are reported in
/// [`RiskComputation::report`] and never abort the run.
#[must_use]
pub fn compute_parcel_risk(inputs: &RiskInputs<'_>, config: &ScoringConfig) -> RiskComputation {
    let mut report = DataQualityReport::default();
    let mut parcels: BTreeMap<&str, (&ParcelIdentity, ParcelTally<'_>)> = BTreeMap::new();

    for parcel in inputs.parcels {
        if parcels.contains_key(parcel.taxpin.as_str()) {
            log::warn!("Duplicate parcel {} in roll, keeping first entry", parcel.taxpin);
            report.record(DataQualityIssue::new(
                DataQualityKind::DuplicateParcel,
                EventSource::Parcels,
                &parcel.taxpin,
                "parcel appears more than once in the roll",
            ));
            continue;
        }
        parcels.insert(&parcel.taxpin, (parcel, ParcelTally::default()));
    }

    for case in inputs.cases {
        let Some((_, tally)) = parcels.get_mut(case.taxpin.as_str()) else {
            record_orphan(&mut report, EventSource::Cases, &case.case_id, &case.taxpin);
            continue;
        };
        tally.case_count += 1;
        *tally.offenses.entry(case.offense_type.as_str()).or_default() += 1;
    }

    for complaint in inputs.complaints {
        let Some((_, tally)) = parcels.get_mut(complaint.taxpin.as_str()) else {
            record_orphan(
                &mut report,
                EventSource::Complaints,
                &complaint.complaint_id,
                &complaint.taxpin,
            );
            continue;
        };
        tally.complaint_count += 1;
        if complaint.is_open() {
            tally.open_complaints += 1;
        }
    }

    for permit in inputs.permits {
        if !has_valid_valuation(permit) {
            log::warn!(
                "Rejecting permit {}: malformed valuation {}",
                permit.permit_id,
                permit.valuation
            );
            report.record(DataQualityIssue::new(
                DataQualityKind::MalformedValuation,
                EventSource::Permits,
                &permit.permit_id,
                format!("valuation {} is negative or not finite", permit.valuation),
            ));
            continue;
        }
        let Some(taxpin) = permit.taxpin.as_deref().filter(|t| !t.is_empty()) else {
            report.unlinked_permits += 1;
            continue;
        };
        let Some((_, tally)) = parcels.get_mut(taxpin) else {
            record_orphan(&mut report, EventSource::Permits, &permit.permit_id, taxpin);
            continue;
        };
        if config.is_high_value(permit.valuation) {
            tally.high_value_permits += 1;
        }
        if config.is_stalled(&permit.status) {
            tally.stalled_permits += 1;
        }
    }

    let mut records: Vec<ParcelRiskRecord> = parcels
        .into_values()
        .map(|(parcel, tally)| build_record(parcel, tally, config))
        .collect();
    sort_leaderboard(&mut records);

    log::info!(
        "Scored {} parcels ({} orphaned events, {} rejected permits, {} unlinked permits)",
        records.len(),
        report.orphaned_events(),
        report.rejected_permits,
        report.unlinked_permits,
    );

    RiskComputation { records, report }
}

fn record_orphan(report: &mut DataQualityReport, source: EventSource, id: &str, taxpin: &str) {
    log::warn!("Dropping {source} record {id}: parcel {taxpin:?} is not in the roll");
    report.record(DataQualityIssue::new(
        DataQualityKind::OrphanedParcel,
        source,
        id,
        format!("parcel {taxpin:?} is not in the roll"),
    ));
}

fn build_record(
    parcel: &ParcelIdentity,
    tally: ParcelTally<'_>,
    config: &ScoringConfig,
) -> ParcelRiskRecord {
    debug_assert!(tally.open_complaints <= tally.complaint_count);

    let risk_score = round_score(weighted_score(&tally, &config.weights));
    let risk_level = config.thresholds.classify(risk_score);

    ParcelRiskRecord {
        taxpin: parcel.taxpin.clone(),
        address: parcel.address.clone(),
        owner: parcel.owner.clone(),
        land_use: parcel.land_use.clone(),
        case_count: tally.case_count,
        complaint_count: tally.complaint_count,
        open_complaints: tally.open_complaints,
        high_value_permits: tally.high_value_permits,
        stalled_permits: tally.stalled_permits,
        risk_score,
        risk_level,
        top_offenses: rank_offenses(tally.offenses),
    }
}

#[allow(clippy::cast_precision_loss)]
fn weighted_score(tally: &ParcelTally<'_>, weights: &RiskWeights) -> f64 {
    weights.case * tally.case_count as f64
        + weights.complaint * tally.complaint_count as f64
        + weights.open_complaint_bonus * tally.open_complaints as f64
        + weights.high_value_permit * tally.high_value_permits as f64
        + weights.stalled_permit * tally.stalled_permits as f64
}

/// Rounds to two decimals, the precision of the published score.
///
/// Classification runs on the rounded value, so a raw 11.996 lands in
/// Critical rather than High as it would if the unrounded score were tiered.
fn round_score(score: f64) -> f64 {
    (score * 100.0).round() / 100.0
}

/// Orders offense counts by descending count, then ascending offense type.
fn rank_offenses(offenses: BTreeMap<&str, u64>) -> Vec<OffenseCount> {
    // BTreeMap iterates by name, and the sort is stable, so equal counts
    // stay in name order.
    let mut ranked: Vec<OffenseCount> = offenses
        .into_iter()
        .map(|(offense_type, count)| OffenseCount {
            offense_type: offense_type.to_string(),
            count,
        })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked
}

/// Sorts records by descending score, then ascending TAXPIN.
pub fn sort_leaderboard(records: &mut [ParcelRiskRecord]) {
    records.sort_by(|a, b| {
        b.risk_score
            .total_cmp(&a.risk_score)
            .then_with(|| a.taxpin.cmp(&b.taxpin))
    });
}

/// Verifies the invariants every engine-produced leaderboard satisfies.
///
/// # Errors
///
/// Returns [`RiskError::InvariantViolation`] for the first record that
/// breaks an invariant.
pub fn check_invariants(
    records: &[ParcelRiskRecord],
    thresholds: &RiskThresholds,
) -> Result<(), RiskError> {
    let violation = |record: &ParcelRiskRecord, message: String| RiskError::InvariantViolation {
        taxpin: record.taxpin.clone(),
        message,
    };

    for record in records {
        if record.open_complaints > record.complaint_count {
            return Err(violation(
                record,
                format!(
                    "open_complaints {} exceeds complaint_count {}",
                    record.open_complaints, record.complaint_count
                ),
            ));
        }
        let expected = thresholds.classify(record.risk_score);
        if record.risk_level != expected {
            return Err(violation(
                record,
                format!(
                    "risk_level {} does not match score {} (expected {expected})",
                    record.risk_level, record.risk_score
                ),
            ));
        }
        let mut seen = BTreeSet::new();
        for offense in &record.top_offenses {
            if !seen.insert(offense.offense_type.as_str()) {
                return Err(violation(
                    record,
                    format!("offense type {:?} listed twice", offense.offense_type),
                ));
            }
        }
    }

    for pair in records.windows(2) {
        let ordered = pair[0]
            .risk_score
            .total_cmp(&pair[1].risk_score)
            .then_with(|| pair[1].taxpin.cmp(&pair[0].taxpin))
            .is_gt();
        if !ordered {
            return Err(violation(
                &pair[1],
                format!("out of order after parcel {}", pair[0].taxpin),
            ));
        }
    }

    Ok(())
}
