//! Day-level traffic records
//!
//! `DailyRecord` is the atomic unit of aggregation. Sources hand over
//! `RawDailyRecord`s, which pass through [`sanitize_records`] before anything
//! downstream sees them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// The six traffic metrics shared by days, weeks and months
///
/// Counts are summed when rolled up; `bounce_rate` and `avg_duration` are
/// averaged over member days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TrafficMetrics {
    pub visitors: u64,
    pub pageviews: u64,
    pub sessions: u64,
    #[serde(rename = "newUsers")]
    pub new_users: u64,
    /// Percentage, 0-100
    #[serde(rename = "bounceRate")]
    pub bounce_rate: f64,
    /// Seconds
    #[serde(rename = "avgDuration")]
    pub avg_duration: f64,
}

impl TrafficMetrics {
    /// Roll up a group of metrics: sum counts, average rates
    ///
    /// An empty group yields all-zero metrics.
    pub fn rollup<'a, I>(items: I) -> Self
    where
        I: IntoIterator<Item = &'a TrafficMetrics>,
    {
        let mut total = TrafficMetrics::default();
        let mut count = 0usize;

        for m in items {
            total.visitors = total.visitors.saturating_add(m.visitors);
            total.pageviews = total.pageviews.saturating_add(m.pageviews);
            total.sessions = total.sessions.saturating_add(m.sessions);
            total.new_users = total.new_users.saturating_add(m.new_users);
            total.bounce_rate += m.bounce_rate;
            total.avg_duration += m.avg_duration;
            count += 1;
        }

        if count > 0 {
            total.bounce_rate /= count as f64;
            total.avg_duration /= count as f64;
        }

        total
    }

    /// Visitors that were not new in the period
    pub fn returning_users(&self) -> u64 {
        self.visitors.saturating_sub(self.new_users)
    }
}

/// One calendar day of traffic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    /// Calendar day, serialized as `YYYY-MM-DD`
    pub date: NaiveDate,
    #[serde(flatten)]
    pub metrics: TrafficMetrics,
}

impl DailyRecord {
    pub fn new(date: NaiveDate, metrics: TrafficMetrics) -> Self {
        Self { date, metrics }
    }
}

/// Unvalidated record as delivered by a source or the cache store
///
/// Every metric is optional and numeric fields accept integers or floats,
/// so a sparse row from a spreadsheet-style store still parses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDailyRecord {
    pub date: String,
    #[serde(default)]
    pub visitors: Option<f64>,
    #[serde(default)]
    pub pageviews: Option<f64>,
    #[serde(default)]
    pub sessions: Option<f64>,
    #[serde(default, alias = "new_users")]
    pub new_users: Option<f64>,
    #[serde(default, alias = "bounce_rate")]
    pub bounce_rate: Option<f64>,
    #[serde(default, alias = "avg_duration")]
    pub avg_duration: Option<f64>,
}

/// Why a raw record was dropped at the input boundary
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordIssue {
    #[error("invalid date '{value}'")]
    InvalidDate { value: String },
    #[error("duplicate date {date}")]
    DuplicateDate { date: NaiveDate },
}

/// Result of sanitizing a batch of raw records
#[derive(Debug, Clone, Default)]
pub struct Sanitized {
    pub records: Vec<DailyRecord>,
    pub issues: Vec<RecordIssue>,
}

/// Parse a day key: `YYYY-MM-DD`, or the compact `YYYYMMDD` analytics exports use
pub fn parse_day(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y%m%d"))
        .ok()
}

fn to_count(value: Option<f64>) -> u64 {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => v.round() as u64,
        _ => 0,
    }
}

fn to_rate(value: Option<f64>, max: f64) -> f64 {
    match value {
        Some(v) if v.is_finite() => v.clamp(0.0, max),
        _ => 0.0,
    }
}

impl RawDailyRecord {
    /// Convert into a typed record, clamping metrics into their domains
    pub fn into_record(self) -> Result<DailyRecord, RecordIssue> {
        let date = parse_day(&self.date).ok_or(RecordIssue::InvalidDate {
            value: self.date.clone(),
        })?;

        Ok(DailyRecord {
            date,
            metrics: TrafficMetrics {
                visitors: to_count(self.visitors),
                pageviews: to_count(self.pageviews),
                sessions: to_count(self.sessions),
                new_users: to_count(self.new_users),
                bounce_rate: to_rate(self.bounce_rate, 100.0),
                avg_duration: to_rate(self.avg_duration, f64::MAX),
            },
        })
    }
}

impl From<&DailyRecord> for RawDailyRecord {
    fn from(record: &DailyRecord) -> Self {
        Self {
            date: record.date.to_string(),
            visitors: Some(record.metrics.visitors as f64),
            pageviews: Some(record.metrics.pageviews as f64),
            sessions: Some(record.metrics.sessions as f64),
            new_users: Some(record.metrics.new_users as f64),
            bounce_rate: Some(record.metrics.bounce_rate),
            avg_duration: Some(record.metrics.avg_duration),
        }
    }
}

/// Validate raw records at the input boundary
///
/// Malformed dates are skipped. Duplicate dates are rejected, keeping the
/// first occurrence. Every drop is logged and reported in `issues`.
pub fn sanitize_records(raw: Vec<RawDailyRecord>) -> Sanitized {
    let mut seen = HashSet::with_capacity(raw.len());
    let mut out = Sanitized {
        records: Vec::with_capacity(raw.len()),
        issues: Vec::new(),
    };

    for item in raw {
        match item.into_record() {
            Ok(record) => {
                if seen.insert(record.date) {
                    out.records.push(record);
                } else {
                    tracing::warn!(date = %record.date, "Duplicate day-level record, keeping first");
                    out.issues.push(RecordIssue::DuplicateDate { date: record.date });
                }
            }
            Err(issue) => {
                tracing::warn!(issue = %issue, "Skipping malformed day-level record");
                out.issues.push(issue);
            }
        }
    }

    out
}
