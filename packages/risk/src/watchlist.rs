//! Permit watchlist selection.
//!
//! A permit qualifies when its valuation meets the high-value threshold or
//! its status is stalled. Parcel linkage plays no part, so unlinked permits
//! show up here even though they never touch a parcel score.

use parcel_watch_parcel_models::PermitRecord;
use parcel_watch_risk_models::config::ScoringConfig;
use parcel_watch_risk_models::{WatchReason, WatchlistEntry};

use crate::engine::has_valid_valuation;

/// Returns the conditions under which `permit` qualifies, in a fixed order.
#[must_use]
pub fn watch_reasons(permit: &PermitRecord, config: &ScoringConfig) -> Vec<WatchReason> {
    let mut reasons = Vec::new();
    if config.is_high_value(permit.valuation) {
        reasons.push(WatchReason::HighValuation);
    }
    if config.is_stalled(&permit.status) {
        reasons.push(WatchReason::PendingReview);
    }
    reasons
}

/// Selects qualifying permits, highest valuation first.
///
/// Permits with a malformed valuation are skipped; the engine already
/// reports them.
#[must_use]
pub fn build_watchlist(permits: &[PermitRecord], config: &ScoringConfig) -> Vec<WatchlistEntry> {
    let mut entries: Vec<WatchlistEntry> = permits
        .iter()
        .filter(|p| has_valid_valuation(p))
        .filter_map(|permit| {
            let reasons = watch_reasons(permit, config);
            if reasons.is_empty() {
                return None;
            }
            Some(WatchlistEntry {
                permit_id: permit.permit_id.clone(),
                property_id: permit.taxpin.clone().filter(|t| !t.is_empty()),
                address: permit.address.clone(),
                permit_type: permit.permit_type.clone(),
                status: permit.status.clone(),
                valuation: permit.valuation,
                issue_date: permit.issue_date,
                reasons,
            })
        })
        .collect();

    entries.sort_by(|a, b| {
        b.valuation
            .total_cmp(&a.valuation)
            .then_with(|| a.permit_id.cmp(&b.permit_id))
    });

    log::debug!("{} of {} permits on the watchlist", entries.len(), permits.len());

    entries
}
