//! Weekly case and complaint counts.

use std::collections::BTreeMap;

use chrono::{Datelike as _, Days, NaiveDate};
use parcel_watch_parcel_models::{ComplaintEvent, CourtCaseEvent};
use parcel_watch_risk_models::TrendPoint;

/// Monday of the week containing `date`, or `None` if that Monday falls
/// before the earliest representable date.
#[must_use]
pub fn week_start(date: NaiveDate) -> Option<NaiveDate> {
    date.checked_sub_days(Days::new(u64::from(date.weekday().num_days_from_monday())))
}

/// Formats the Monday–Sunday label for the week starting on `monday`, or
/// `None` if the Sunday is past the latest representable date.
#[must_use]
pub fn week_label(monday: NaiveDate) -> Option<String> {
    let sunday = monday.checked_add_days(Days::new(6))?;
    Some(format!(
        "{}/{}",
        monday.format("%Y-%m-%d"),
        sunday.format("%Y-%m-%d")
    ))
}

/// Counts cases and complaints per week, oldest week first.
///
/// Weeks where only one kind of event occurred report zero for the other.
/// Undated events are left out, as are events in a week that runs off
/// either end of the calendar.
#[must_use]
pub fn weekly_trends(cases: &[CourtCaseEvent], complaints: &[ComplaintEvent]) -> Vec<TrendPoint> {
    let mut weeks: BTreeMap<NaiveDate, (u64, u64)> = BTreeMap::new();

    for monday in cases.iter().filter_map(|c| c.offense_date.and_then(week_start)) {
        weeks.entry(monday).or_default().0 += 1;
    }
    for monday in complaints
        .iter()
        .filter_map(|c| c.complaint_date.and_then(week_start))
    {
        weeks.entry(monday).or_default().1 += 1;
    }

    weeks
        .into_iter()
        .filter_map(|(monday, (case_count, complaint_count))| {
            let Some(period) = week_label(monday) else {
                log::warn!("Dropping trend week starting {monday}: week end is out of range");
                return None;
            };
            Some(TrendPoint {
                period,
                case_count,
                complaint_count,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use parcel_watch_parcel_models::ComplaintStatus;

    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn case_on(day: Option<&str>) -> CourtCaseEvent {
        CourtCaseEvent {
            case_id: "C".to_string(),
            taxpin: "P1".to_string(),
            offense_type: "Theft".to_string(),
            offense_date: day.map(date),
        }
    }

    fn complaint_on(day: &str) -> ComplaintEvent {
        ComplaintEvent {
            complaint_id: "K".to_string(),
            taxpin: "P1".to_string(),
            status: ComplaintStatus::Open,
            complaint_date: Some(date(day)),
        }
    }

    #[test]
    fn week_starts_on_monday() {
        // 2024-03-06 is a Wednesday, 2024-03-10 a Sunday.
        assert_eq!(week_start(date("2024-03-06")), Some(date("2024-03-04")));
        assert_eq!(week_start(date("2024-03-10")), Some(date("2024-03-04")));
        assert_eq!(week_start(date("2024-03-04")), Some(date("2024-03-04")));
        assert_eq!(
            week_label(date("2024-03-04")).as_deref(),
            Some("2024-03-04/2024-03-10")
        );
    }

    #[test]
    fn outer_joins_weeks_in_order() {
        let trends = weekly_trends(
            &[
                case_on(Some("2024-03-12")),
                case_on(Some("2024-03-05")),
                case_on(Some("2024-03-06")),
                case_on(None),
            ],
            &[complaint_on("2024-02-28"), complaint_on("2024-03-10")],
        );
        assert_eq!(
            trends,
            vec![
                TrendPoint {
                    period: "2024-02-26/2024-03-03".to_string(),
                    case_count: 0,
                    complaint_count: 1,
                },
                TrendPoint {
                    period: "2024-03-04/2024-03-10".to_string(),
                    case_count: 2,
                    complaint_count: 1,
                },
                TrendPoint {
                    period: "2024-03-11/2024-03-17".to_string(),
                    case_count: 1,
                    complaint_count: 0,
                },
            ]
        );
    }

    #[test]
    fn weeks_past_the_calendar_end_are_dropped() {
        let last_week = CourtCaseEvent {
            offense_date: Some(NaiveDate::MAX),
            ..case_on(None)
        };
        let trends = weekly_trends(&[last_week, case_on(Some("2024-03-05"))], &[]);
        assert_eq!(trends.len(), 1);
        assert_eq!(trends[0].period, "2024-03-04/2024-03-10");
        assert!(week_label(week_start(NaiveDate::MAX).unwrap()).is_none());
    }

    #[test]
    fn no_events_yields_no_points() {
        assert!(weekly_trends(&[], &[]).is_empty());
    }
}
