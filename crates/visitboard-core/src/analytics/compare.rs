//! Period comparison
//!
//! Compares two inclusive date spans (e.g. this week so far vs last week)
//! over the same day-level records, using the same change policy as the
//! weekly/monthly buckets.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::calendar::{month_start, week_start};
use super::change::percent_change;
use crate::error::CoreError;
use crate::models::{DailyRecord, TrafficMetrics};

/// Inclusive date span
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodSpan {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl PeriodSpan {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, CoreError> {
        if start > end {
            return Err(CoreError::InvalidPeriod { start, end });
        }
        Ok(Self { start, end })
    }

    /// Number of days in the span
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Named comparison presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComparePreset {
    /// This week so far vs the whole previous week
    #[default]
    Week,
    /// This month so far vs the whole previous month
    Month,
}

impl FromStr for ComparePreset {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "week" => Ok(ComparePreset::Week),
            "month" => Ok(ComparePreset::Month),
            _ => Err(CoreError::InvalidPreset {
                value: s.to_string(),
            }),
        }
    }
}

impl ComparePreset {
    /// `(current, previous)` spans relative to `today`
    pub fn spans(self, today: NaiveDate) -> (PeriodSpan, PeriodSpan) {
        match self {
            ComparePreset::Week => {
                let this_monday = week_start(today);
                let last_monday = this_monday - Duration::days(7);
                (
                    PeriodSpan {
                        start: this_monday,
                        end: today,
                    },
                    PeriodSpan {
                        start: last_monday,
                        end: this_monday - Duration::days(1),
                    },
                )
            }
            ComparePreset::Month => {
                let this_first = month_start(today);
                let last_day_prev = this_first - Duration::days(1);
                (
                    PeriodSpan {
                        start: this_first,
                        end: today,
                    },
                    PeriodSpan {
                        start: month_start(last_day_prev),
                        end: last_day_prev,
                    },
                )
            }
        }
    }
}

/// Rolled-up metrics for one span
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodMetrics {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub visitors: u64,
    pub pageviews: u64,
    pub sessions: u64,
    pub bounce_rate: f64,
    pub avg_duration: f64,
    pub new_users: u64,
    pub returning_users: u64,
    /// Days with data inside the span
    pub day_count: usize,
}

/// Percent change of every metric, current vs previous
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodChanges {
    pub visitors_percent: f64,
    pub pageviews_percent: f64,
    pub sessions_percent: f64,
    #[serde(rename = "bounceRate_percent")]
    pub bounce_rate_percent: f64,
    #[serde(rename = "avgDuration_percent")]
    pub avg_duration_percent: f64,
    #[serde(rename = "newUsers_percent")]
    pub new_users_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodComparison {
    pub current: PeriodMetrics,
    pub previous: PeriodMetrics,
    pub changes: PeriodChanges,
}

/// Roll up the records that fall inside `span`
pub fn period_metrics(daily: &[DailyRecord], span: PeriodSpan) -> PeriodMetrics {
    let members: Vec<&TrafficMetrics> = daily
        .iter()
        .filter(|d| span.contains(d.date))
        .map(|d| &d.metrics)
        .collect();
    let day_count = members.len();
    let totals = TrafficMetrics::rollup(members);

    PeriodMetrics {
        start_date: span.start,
        end_date: span.end,
        visitors: totals.visitors,
        pageviews: totals.pageviews,
        sessions: totals.sessions,
        bounce_rate: totals.bounce_rate,
        avg_duration: totals.avg_duration,
        new_users: totals.new_users,
        returning_users: totals.returning_users(),
        day_count,
    }
}

/// Compare two spans over the same records
pub fn compare_periods(
    daily: &[DailyRecord],
    current: PeriodSpan,
    previous: PeriodSpan,
) -> PeriodComparison {
    let current = period_metrics(daily, current);
    let previous = period_metrics(daily, previous);

    let changes = PeriodChanges {
        visitors_percent: percent_change(current.visitors as f64, previous.visitors as f64),
        pageviews_percent: percent_change(current.pageviews as f64, previous.pageviews as f64),
        sessions_percent: percent_change(current.sessions as f64, previous.sessions as f64),
        bounce_rate_percent: percent_change(current.bounce_rate, previous.bounce_rate),
        avg_duration_percent: percent_change(current.avg_duration, previous.avg_duration),
        new_users_percent: percent_change(current.new_users as f64, previous.new_users as f64),
    };

    PeriodComparison {
        current,
        previous,
        changes,
    }
}
