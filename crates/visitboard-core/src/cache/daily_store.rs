//! Persistent day-level cache contract
//!
//! The collector writes day-level records plus one metadata row per
//! collection key; the analytics service reads them back when the metadata
//! says the last collection succeeded recently enough.

use anyhow::Result;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::DailyRecord;

/// Collection keys tracked in the metadata table
pub mod keys {
    /// Day-level traffic records
    pub const DAILY_ANALYTICS: &str = "daily_analytics";
}

/// Outcome of the last collection for a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    Success,
    Error,
    Pending,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Success => "success",
            CacheStatus::Error => "error",
            CacheStatus::Pending => "pending",
        }
    }

    /// Unknown values read back from storage map to `Pending`
    pub fn parse(value: &str) -> Self {
        match value {
            "success" => CacheStatus::Success,
            "error" => CacheStatus::Error,
            _ => CacheStatus::Pending,
        }
    }
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bookkeeping row for one collection key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheMetadata {
    pub key: String,
    pub last_updated: DateTime<Utc>,
    pub record_count: usize,
    pub status: CacheStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl CacheMetadata {
    pub fn success(key: impl Into<String>, record_count: usize, now: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            last_updated: now,
            record_count,
            status: CacheStatus::Success,
            error_message: None,
        }
    }

    pub fn error(key: impl Into<String>, message: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            last_updated: now,
            record_count: 0,
            status: CacheStatus::Error,
            error_message: Some(message.into()),
        }
    }

    /// Successful and younger than `max_age`
    pub fn is_fresh(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        self.status == CacheStatus::Success && now - self.last_updated < max_age
    }

    /// Age in whole hours (negative if the clock went backwards)
    pub fn age_hours(&self, now: DateTime<Utc>) -> i64 {
        (now - self.last_updated).num_hours()
    }
}

/// Persistent day-level cache
///
/// Implementations are internally synchronized and shared behind `Arc`.
pub trait DailyStore: Send + Sync {
    /// Short backend name for logs and health output
    fn kind(&self) -> &'static str;

    /// Insert or replace records by date, returns the number written
    fn upsert_daily(&self, records: &[DailyRecord]) -> Result<usize>;

    /// Records with `date >= since`, newest first
    fn daily_since(&self, since: NaiveDate) -> Result<Vec<DailyRecord>>;

    fn metadata(&self, key: &str) -> Result<Option<CacheMetadata>>;

    fn update_metadata(&self, meta: &CacheMetadata) -> Result<()>;

    /// Drop all records and metadata
    fn clear(&self) -> Result<()>;

    fn record_count(&self) -> Result<usize>;

    /// Whether the last collection for `key` succeeded within `max_age`
    ///
    /// Missing metadata, an error/pending status or a stale timestamp are
    /// all invalid.
    fn is_cache_valid(&self, key: &str, max_age: Duration, now: DateTime<Utc>) -> Result<bool> {
        Ok(self
            .metadata(key)?
            .is_some_and(|meta| meta.is_fresh(max_age, now)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 12, 20, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_fresh_success() {
        let meta = CacheMetadata::success(keys::DAILY_ANALYTICS, 30, now() - Duration::hours(2));
        assert!(meta.is_fresh(Duration::hours(24), now()));
        assert_eq!(meta.age_hours(now()), 2);
    }

    #[test]
    fn test_stale_success() {
        let meta = CacheMetadata::success(keys::DAILY_ANALYTICS, 30, now() - Duration::hours(25));
        assert!(!meta.is_fresh(Duration::hours(24), now()));
    }

    #[test]
    fn test_exact_max_age_is_stale() {
        let meta = CacheMetadata::success(keys::DAILY_ANALYTICS, 30, now() - Duration::hours(24));
        assert!(!meta.is_fresh(Duration::hours(24), now()));
    }

    #[test]
    fn test_error_status_never_fresh() {
        let meta = CacheMetadata::error(keys::DAILY_ANALYTICS, "quota exceeded", now());
        assert!(!meta.is_fresh(Duration::hours(24), now()));
        assert_eq!(meta.record_count, 0);
    }

    #[test]
    fn test_status_roundtrip_strings() {
        for status in [CacheStatus::Success, CacheStatus::Error, CacheStatus::Pending] {
            assert_eq!(CacheStatus::parse(status.as_str()), status);
        }
        assert_eq!(CacheStatus::parse("garbage"), CacheStatus::Pending);
    }

    #[test]
    fn test_metadata_json_shape() {
        let meta = CacheMetadata::success(keys::DAILY_ANALYTICS, 7, now());
        let value = serde_json::to_value(&meta).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["recordCount"], 7);
        assert!(value.get("errorMessage").is_none());
    }
}
