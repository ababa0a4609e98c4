//! Generated demo traffic
//!
//! Weekdays hover around 280 visitors and weekends around 150, with a
//! ±40 variation. Variation is seeded from the date so the same day always
//! produces the same numbers.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::models::{DailyRecord, TrafficMetrics};

const WEEKDAY_BASE: i64 = 280;
const WEEKEND_BASE: i64 = 150;

/// Deterministic demo data generator
#[derive(Debug, Clone, Copy, Default)]
pub struct DemoSource {
    seed: u64,
}

impl DemoSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Different seeds give different (but still stable) series
    pub fn with_seed(seed: u64) -> Self {
        Self { seed }
    }

    /// `days` records ending at `today`, newest first
    pub fn generate(&self, days: u32, today: NaiveDate) -> Vec<DailyRecord> {
        (0..days as i64)
            .map(|offset| self.day(today - Duration::days(offset)))
            .collect()
    }

    /// The record for one date
    pub fn day(&self, date: NaiveDate) -> DailyRecord {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed ^ date.num_days_from_ce() as u64);

        let base = match date.weekday() {
            Weekday::Sat | Weekday::Sun => WEEKEND_BASE,
            _ => WEEKDAY_BASE,
        };
        let level = base + rng.gen_range(-40..40);

        DailyRecord::new(
            date,
            TrafficMetrics {
                visitors: level.max(50) as u64,
                pageviews: (level * 3).max(100) as u64,
                sessions: ((level as f64 * 1.2).floor() as i64).max(60) as u64,
                new_users: ((level as f64 * 0.6).floor() as i64).max(30) as u64,
                bounce_rate: 35.0 + rng.gen::<f64>() * 15.0,
                avg_duration: 120.0 + rng.gen::<f64>() * 120.0,
            },
        )
    }
}
