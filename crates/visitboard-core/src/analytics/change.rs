//! Period-over-period change rates

use serde::{Deserialize, Serialize};

use crate::models::TrafficMetrics;

/// Percent change from `previous` to `current`
///
/// Reported as `0.0` when `previous` is zero; consumers expect a number.
pub fn percent_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return 0.0;
    }
    (current - previous) / previous * 100.0
}

/// Change of every metric against the chronologically preceding bucket
///
/// All fields are `None` on the oldest bucket of a list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visitors_change: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pageviews_change: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sessions_change: Option<f64>,
    #[serde(
        rename = "newUsers_change",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub new_users_change: Option<f64>,
    #[serde(
        rename = "bounceRate_change",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub bounce_rate_change: Option<f64>,
    #[serde(
        rename = "avgDuration_change",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub avg_duration_change: Option<f64>,
}

impl MetricChanges {
    pub fn between(current: &TrafficMetrics, previous: &TrafficMetrics) -> Self {
        Self {
            visitors_change: Some(percent_change(
                current.visitors as f64,
                previous.visitors as f64,
            )),
            pageviews_change: Some(percent_change(
                current.pageviews as f64,
                previous.pageviews as f64,
            )),
            sessions_change: Some(percent_change(
                current.sessions as f64,
                previous.sessions as f64,
            )),
            new_users_change: Some(percent_change(
                current.new_users as f64,
                previous.new_users as f64,
            )),
            bounce_rate_change: Some(percent_change(current.bounce_rate, previous.bounce_rate)),
            avg_duration_change: Some(percent_change(
                current.avg_duration,
                previous.avg_duration,
            )),
        }
    }

    /// True when no previous period was available
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A rollup that carries metrics and change rates
pub trait PeriodBucket {
    fn metrics(&self) -> &TrafficMetrics;
    fn set_changes(&mut self, changes: MetricChanges);
}

/// Fill change rates on a list sorted newest first
///
/// Each bucket is compared with the next element (the older one). The last
/// bucket keeps empty changes.
pub fn chain_changes<B: PeriodBucket>(buckets: &mut [B]) {
    for i in 1..buckets.len() {
        let changes = MetricChanges::between(buckets[i - 1].metrics(), buckets[i].metrics());
        buckets[i - 1].set_changes(changes);
    }
}
