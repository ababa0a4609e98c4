//! Whole-range summary

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{DailyRecord, TrafficMetrics};

/// Inclusive date range covered by the available data
///
/// Both ends are empty strings when there is no data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: start.to_string(),
            end: end.to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_empty() && self.end.is_empty()
    }
}

/// Scalar rollup over every day in the input
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_visitors: u64,
    pub total_pageviews: u64,
    pub total_sessions: u64,
    pub avg_bounce_rate: f64,
    pub avg_session_duration: f64,
    pub date_range: DateRange,
}

/// Summarize day-level records
///
/// The date range is the min/max of `date`, so input order does not matter.
pub fn calculate_summary(daily: &[DailyRecord]) -> Summary {
    let totals = TrafficMetrics::rollup(daily.iter().map(|d| &d.metrics));

    let first = daily.iter().map(|d| d.date).min();
    let last = daily.iter().map(|d| d.date).max();
    let date_range = match (first, last) {
        (Some(start), Some(end)) => DateRange::new(start, end),
        _ => DateRange::default(),
    };

    Summary {
        total_visitors: totals.visitors,
        total_pageviews: totals.pageviews,
        total_sessions: totals.sessions,
        avg_bounce_rate: totals.bounce_rate,
        avg_session_duration: totals.avg_duration,
        date_range,
    }
}
