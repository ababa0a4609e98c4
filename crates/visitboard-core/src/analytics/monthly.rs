//! Daily → monthly rollup with weekly drill-down

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::calendar::{month_end, month_key, month_label, month_start, ranges_overlap};
use super::change::{chain_changes, MetricChanges, PeriodBucket};
use super::weekly::WeeklyBucket;
use crate::models::{DailyRecord, TrafficMetrics};

/// One calendar month of traffic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyBucket {
    /// `"YYYY-MM"`
    pub month: String,
    /// e.g. `"Dec 2025"`
    pub month_label: String,
    /// Number of day-level records in this month
    pub day_count: usize,
    #[serde(flatten)]
    pub metrics: TrafficMetrics,
    #[serde(flatten)]
    pub changes: MetricChanges,
    /// Weeks touching this month, newest first
    ///
    /// A week crossing a month boundary is listed under both months, so
    /// the week totals here can exceed this month's own days.
    pub weeks: Vec<WeeklyBucket>,
}

impl PeriodBucket for MonthlyBucket {
    fn metrics(&self) -> &TrafficMetrics {
        &self.metrics
    }

    fn set_changes(&mut self, changes: MetricChanges) {
        self.changes = changes;
    }
}

/// Aggregate day-level records into months, newest month first
///
/// `weekly` is the output of [`super::aggregate_to_weekly`] over the same
/// records; every week overlapping a month is attached to it.
pub fn aggregate_to_monthly(daily: &[DailyRecord], weekly: &[WeeklyBucket]) -> Vec<MonthlyBucket> {
    let mut groups: BTreeMap<NaiveDate, Vec<&TrafficMetrics>> = BTreeMap::new();
    for record in daily {
        groups
            .entry(month_start(record.date))
            .or_default()
            .push(&record.metrics);
    }

    let mut months: Vec<MonthlyBucket> = groups
        .into_iter()
        .rev()
        .map(|(first_day, members)| {
            let last_day = month_end(first_day);
            let weeks = weekly
                .iter()
                .filter(|w| ranges_overlap(w.week_start, w.week_end, first_day, last_day))
                .cloned()
                .collect();

            MonthlyBucket {
                month: month_key(first_day),
                month_label: month_label(first_day),
                day_count: members.len(),
                metrics: TrafficMetrics::rollup(members),
                changes: MetricChanges::default(),
                weeks,
            }
        })
        .collect();

    chain_changes(&mut months);
    months
}
