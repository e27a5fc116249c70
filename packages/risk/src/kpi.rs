//! Dashboard KPI reduction over a scored leaderboard.

use chrono::{DateTime, Utc};
use parcel_watch_parcel_models::ParcelRiskRecord;
use parcel_watch_risk_models::KpiSummary;

/// Reduces the full leaderboard to the dashboard's headline numbers.
///
/// Pass the complete leaderboard, not a top-N slice, or the totals will
/// undercount.
#[must_use]
pub fn summarize(records: &[ParcelRiskRecord], generated_at: DateTime<Utc>) -> KpiSummary {
    KpiSummary {
        generated_at,
        total_cases: records.iter().map(|r| r.case_count).sum(),
        open_complaints: records.iter().map(|r| r.open_complaints).sum(),
        high_risk_sites: records
            .iter()
            .filter(|r| r.risk_level.is_elevated())
            .count() as u64,
        high_value_permits: records.iter().map(|r| r.high_value_permits).sum(),
    }
}

#[cfg(test)]
mod tests {
    use parcel_watch_parcel_models::RiskLevel;

    use super::*;

    fn record(
        taxpin: &str,
        cases: u64,
        open: u64,
        high_value: u64,
        level: RiskLevel,
    ) -> ParcelRiskRecord {
        ParcelRiskRecord {
            taxpin: taxpin.to_string(),
            address: String::new(),
            owner: None,
            land_use: None,
            case_count: cases,
            complaint_count: open,
            open_complaints: open,
            high_value_permits: high_value,
            stalled_permits: 0,
            risk_score: 0.0,
            risk_level: level,
            top_offenses: Vec::new(),
        }
    }

    #[test]
    fn sums_counts_and_elevated_tiers() {
        let now = Utc::now();
        let summary = summarize(
            &[
                record("P1", 3, 1, 1, RiskLevel::Critical),
                record("P2", 2, 0, 0, RiskLevel::High),
                record("P3", 1, 2, 1, RiskLevel::Moderate),
                record("P4", 0, 0, 0, RiskLevel::Low),
            ],
            now,
        );
        assert_eq!(summary.generated_at, now);
        assert_eq!(summary.total_cases, 6);
        assert_eq!(summary.open_complaints, 3);
        assert_eq!(summary.high_risk_sites, 2);
        assert_eq!(summary.high_value_permits, 2);
    }

    #[test]
    fn empty_leaderboard_is_all_zero() {
        let summary = summarize(&[], Utc::now());
        assert_eq!(summary.total_cases, 0);
        assert_eq!(summary.high_risk_sites, 0);
    }
}
