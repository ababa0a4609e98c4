//! Temporal aggregation of day-level traffic
//!
//! Turns day-level records into weekly and monthly rollups with
//! period-over-period change rates, plus a whole-range summary. Every
//! function here is pure: no I/O, no shared state, safe to call from any
//! number of requests at once.

use serde::{Deserialize, Serialize};

use crate::models::DailyRecord;

pub mod calendar;
pub mod change;
pub mod compare;
pub mod monthly;
pub mod summary;
pub mod weekly;


pub use change::{percent_change, MetricChanges};
pub use compare::{
    compare_periods, period_metrics, ComparePreset, PeriodChanges, PeriodComparison,
    PeriodMetrics, PeriodSpan,
};
pub use monthly::{aggregate_to_monthly, MonthlyBucket};
pub use summary::{calculate_summary, DateRange, Summary};
pub use weekly::{aggregate_to_weekly, WeeklyBucket};

/// Lookback window in days for the aggregated view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Lookback(u32);

impl Lookback {
    /// Used when the caller gives no window
    pub const DEFAULT_DAYS: u32 = 90;
    /// Upper bound on a requested window (two years of days)
    pub const MAX_DAYS: u32 = 730;

    /// Clamp to `1..=MAX_DAYS`
    pub fn new(days: u32) -> Self {
        Self(days.clamp(1, Self::MAX_DAYS))
    }

    /// Parse a query value; missing or non-numeric input falls back to `default`
    pub fn from_query(value: Option<&str>, default: u32) -> Self {
        let days = value
            .and_then(|v| v.trim().parse::<i64>().ok())
            .map(|v| v.clamp(1, Self::MAX_DAYS as i64) as u32)
            .unwrap_or(default);
        Self::new(days)
    }

    pub fn days(&self) -> u32 {
        self.0
    }

    /// Display label
    pub fn display(&self) -> String {
        format!("Last {} days", self.0)
    }
}

impl Default for Lookback {
    fn default() -> Self {
        Self(Self::DEFAULT_DAYS)
    }
}

/// Day, week and month views of the same records, plus their summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregatedVisitorData {
    /// Newest day first
    pub daily: Vec<DailyRecord>,
    /// Newest week first
    pub weekly: Vec<WeeklyBucket>,
    /// Newest month first
    pub monthly: Vec<MonthlyBucket>,
    pub summary: Summary,
}

impl AggregatedVisitorData {
    /// Run the full pipeline: daily → weekly → monthly, plus summary
    ///
    /// Sorts `daily` newest first before aggregating.
    pub fn compute(mut daily: Vec<DailyRecord>) -> Self {
        daily.sort_by(|a, b| b.date.cmp(&a.date));

        let weekly = aggregate_to_weekly(&daily);
        let monthly = aggregate_to_monthly(&daily, &weekly);
        let summary = calculate_summary(&daily);

        Self {
            daily,
            weekly,
            monthly,
            summary,
        }
    }

    /// Well-formed empty state: empty lists, zeroed summary
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.daily.is_empty()
    }
}

/// Aggregate day-level records into every view
pub fn aggregate(daily: Vec<DailyRecord>) -> AggregatedVisitorData {
    AggregatedVisitorData::compute(daily)
}
