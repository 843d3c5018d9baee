//! Pure aggregation helpers shared by the company and admin reports.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::db::AdActivityRow;
use crate::models::format_timestamp;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DailyActivity {
    pub date: String,
    pub ads_created: u64,
    pub evaluations: u64,
}

/// Inclusive UTC reporting window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Longest window a report may cover.
pub const MAX_PERIOD_DAYS: i64 = 366;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PeriodError {
    #[error("start_date must not be after end_date")]
    Reversed,

    #[error("Date range cannot exceed {} days", MAX_PERIOD_DAYS)]
    TooLong,
}

impl Period {
    /// Window from caller-supplied bounds, refusing reversed or oversized ranges.
    pub fn bounded(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, PeriodError> {
        if start > end {
            return Err(PeriodError::Reversed);
        }
        if end - start > Duration::days(MAX_PERIOD_DAYS) {
            return Err(PeriodError::TooLong);
        }
        Ok(Self { start, end })
    }

    #[must_use]
    pub fn last_days(now: DateTime<Utc>, days: i64) -> Self {
        Self {
            start: now - Duration::days(days),
            end: now,
        }
    }

    #[must_use]
    pub fn start_key(&self) -> String {
        format_timestamp(self.start)
    }

    #[must_use]
    pub fn end_key(&self) -> String {
        format_timestamp(self.end)
    }
}

#[must_use]
pub fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let first = NaiveDate::from_ymd_opt(now.year(), now.month(), 1).unwrap_or(now.date_naive());
    Utc.from_utc_datetime(&first.and_time(NaiveTime::MIN))
}

#[must_use]
pub fn day_start(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.from_utc_datetime(&now.date_naive().and_time(NaiveTime::MIN))
}

/// Accepts RFC 3339 or a bare `YYYY-MM-DD`. A bare date used as an end
/// bound covers the whole day.
pub fn parse_bound(raw: &str, end_of_day: bool) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    let start = Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN));
    Some(if end_of_day {
        start + Duration::days(1) - Duration::microseconds(1)
    } else {
        start
    })
}

/// One entry per calendar day in `period`, including days with no ads.
#[must_use]
pub fn daily_activity(rows: &[AdActivityRow], period: &Period) -> Vec<DailyActivity> {
    let mut per_day: BTreeMap<&str, (u64, u64)> = BTreeMap::new();
    for row in rows {
        let day = row.created_at.get(..10).unwrap_or(&row.created_at);
        let entry = per_day.entry(day).or_default();
        entry.0 += 1;
        if row.evaluation_score.is_some() {
            entry.1 += 1;
        }
    }

    let last = period.end.date_naive();
    let mut current = period.start.date_naive();
    let mut days = Vec::new();
    while current <= last {
        let date = current.format("%Y-%m-%d").to_string();
        let (ads_created, evaluations) = per_day.get(date.as_str()).copied().unwrap_or_default();
        days.push(DailyActivity {
            date,
            ads_created,
            evaluations,
        });
        match current.succ_opt() {
            Some(next) => current = next,
            None => break,
        }
    }

    days
}

/// How often each platform was recommended across `rows`.
#[must_use]
pub fn platform_distribution(rows: &[AdActivityRow]) -> BTreeMap<String, u64> {
    let mut counts = BTreeMap::new();
    for platform in rows.iter().flat_map(AdActivityRow::platform_list) {
        *counts.entry(platform).or_insert(0) += 1;
    }
    counts
}

/// Buckets scores into 0-2, 2-4, 4-6, 6-8 and 8-10 using inclusive upper bounds.
#[must_use]
pub fn score_distribution(scores: impl IntoIterator<Item = f64>) -> BTreeMap<&'static str, u64> {
    const BUCKETS: [(f64, &str); 4] = [(2.0, "0-2"), (4.0, "2-4"), (6.0, "4-6"), (8.0, "6-8")];

    let mut counts: BTreeMap<&'static str, u64> = BUCKETS
        .iter()
        .map(|(_, label)| (*label, 0))
        .chain(std::iter::once(("8-10", 0)))
        .collect();

    for score in scores {
        let label = BUCKETS
            .iter()
            .find(|(upper, _)| score <= *upper)
            .map_or("8-10", |(_, label)| *label);
        *counts.entry(label).or_insert(0) += 1;
    }

    counts
}

#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i32, created_at: &str, platforms: &str, score: Option<f64>) -> AdActivityRow {
        AdActivityRow {
            id,
            company_id: 1,
            user_id: 1,
            created_at: created_at.to_string(),
            platforms: platforms.to_string(),
            evaluation_score: score,
        }
    }

    #[test]
    fn test_score_buckets_use_inclusive_upper_bounds() {
        let dist = score_distribution([0.0, 2.0, 2.01, 4.0, 6.5, 8.0, 8.5, 10.0]);

        assert_eq!(dist["0-2"], 2);
        assert_eq!(dist["2-4"], 2);
        assert_eq!(dist["4-6"], 0);
        assert_eq!(dist["6-8"], 2);
        assert_eq!(dist["8-10"], 2);
        assert_eq!(dist.len(), 5);
    }

    #[test]
    fn test_daily_activity_fills_gaps() {
        let period = Period {
            start: parse_bound("2026-03-01", false).unwrap(),
            end: parse_bound("2026-03-03", true).unwrap(),
        };
        let rows = [
            row(1, "2026-03-01T10:00:00.000000Z", "[]", Some(7.0)),
            row(2, "2026-03-01T11:00:00.000000Z", "[]", None),
            row(3, "2026-03-03T09:00:00.000000Z", "[]", None),
        ];

        let days = daily_activity(&rows, &period);
        assert_eq!(days.len(), 3);
        assert_eq!(days[0].ads_created, 2);
        assert_eq!(days[0].evaluations, 1);
        assert_eq!(days[1].ads_created, 0);
        assert_eq!(days[2].date, "2026-03-03");
    }

    #[test]
    fn test_bounded_period_caps_window() {
        let day = |s| parse_bound(s, false).unwrap();

        let leap_year = parse_bound("2024-12-31", true).unwrap();
        assert!(Period::bounded(day("2024-01-01"), leap_year).is_ok());

        assert_eq!(
            Period::bounded(day("0001-01-01"), parse_bound("9999-12-31", true).unwrap()),
            Err(PeriodError::TooLong)
        );
        assert_eq!(
            Period::bounded(day("2026-05-02"), day("2026-05-01")),
            Err(PeriodError::Reversed)
        );
    }

    #[test]
    fn test_platform_distribution_counts_each_mention() {
        let rows = [
            row(1, "2026-03-01T00:00:00.000000Z", r#"["google_ads","meta_ads"]"#, None),
            row(2, "2026-03-01T00:00:00.000000Z", r#"["google_ads"]"#, None),
            row(3, "2026-03-01T00:00:00.000000Z", "garbage", None),
        ];

        let dist = platform_distribution(&rows);
        assert_eq!(dist["google_ads"], 2);
        assert_eq!(dist["meta_ads"], 1);
        assert_eq!(dist.len(), 2);
    }

    #[test]
    fn test_bounds_and_month_start() {
        let end = parse_bound("2026-02-28", true).unwrap();
        assert_eq!(format_timestamp(end), "2026-02-28T23:59:59.999999Z");
        assert!(parse_bound("28/02/2026", false).is_none());

        let now = parse_bound("2026-05-17T13:45:00Z", false).unwrap();
        assert_eq!(format_timestamp(month_start(now)), "2026-05-01T00:00:00.000000Z");
        assert_eq!(format_timestamp(day_start(now)), "2026-05-17T00:00:00.000000Z");
        assert!((round2(7.456) - 7.46).abs() < f64::EPSILON);
    }
}
