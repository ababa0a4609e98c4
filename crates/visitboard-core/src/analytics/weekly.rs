//! Daily → weekly rollup

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::calendar::{iso_week_label, week_end, week_start};
use super::change::{chain_changes, MetricChanges, PeriodBucket};
use crate::models::{DailyRecord, TrafficMetrics};

/// One Monday-to-Sunday week of traffic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyBucket {
    /// ISO week number, e.g. `"W51"`
    pub week_label: String,
    /// Monday
    pub week_start: NaiveDate,
    /// Sunday, inclusive
    pub week_end: NaiveDate,
    /// Number of day-level records in this week
    pub day_count: usize,
    #[serde(flatten)]
    pub metrics: TrafficMetrics,
    #[serde(flatten)]
    pub changes: MetricChanges,
}

impl WeeklyBucket {
    /// Whether `date` falls inside this week
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.week_start && date <= self.week_end
    }
}

impl PeriodBucket for WeeklyBucket {
    fn metrics(&self) -> &TrafficMetrics {
        &self.metrics
    }

    fn set_changes(&mut self, changes: MetricChanges) {
        self.changes = changes;
    }
}

/// Aggregate day-level records into weeks, newest week first
///
/// Input may be empty or unsorted. Duplicate dates are summed into their
/// week; rejecting them is the input boundary's job.
pub fn aggregate_to_weekly(daily: &[DailyRecord]) -> Vec<WeeklyBucket> {
    let mut groups: BTreeMap<NaiveDate, Vec<&TrafficMetrics>> = BTreeMap::new();
    for record in daily {
        groups
            .entry(week_start(record.date))
            .or_default()
            .push(&record.metrics);
    }

    let mut weeks: Vec<WeeklyBucket> = groups
        .into_iter()
        .rev()
        .map(|(start, members)| WeeklyBucket {
            week_label: iso_week_label(start),
            week_start: start,
            week_end: week_end(start),
            day_count: members.len(),
            metrics: TrafficMetrics::rollup(members),
            changes: MetricChanges::default(),
        })
        .collect();

    chain_changes(&mut weeks);
    weeks
}
