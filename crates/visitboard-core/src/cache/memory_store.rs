//! In-process day-level cache
//!
//! Same contract as the SQLite store without persistence. Used when no
//! database is configured and in tests.

use anyhow::Result;
use chrono::NaiveDate;
use dashmap::DashMap;

use super::daily_store::{CacheMetadata, DailyStore};
use crate::models::{DailyRecord, TrafficMetrics};

/// DashMap-backed [`DailyStore`]
#[derive(Default)]
pub struct MemoryDailyStore {
    records: DashMap<NaiveDate, TrafficMetrics>,
    metadata: DashMap<String, CacheMetadata>,
}

impl MemoryDailyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DailyStore for MemoryDailyStore {
    fn kind(&self) -> &'static str {
        "memory"
    }

    fn upsert_daily(&self, records: &[DailyRecord]) -> Result<usize> {
        for record in records {
            self.records.insert(record.date, record.metrics);
        }
        Ok(records.len())
    }

    fn daily_since(&self, since: NaiveDate) -> Result<Vec<DailyRecord>> {
        let mut records: Vec<DailyRecord> = self
            .records
            .iter()
            .filter(|entry| *entry.key() >= since)
            .map(|entry| DailyRecord::new(*entry.key(), *entry.value()))
            .collect();
        records.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(records)
    }

    fn metadata(&self, key: &str) -> Result<Option<CacheMetadata>> {
        Ok(self.metadata.get(key).map(|entry| entry.value().clone()))
    }

    fn update_metadata(&self, meta: &CacheMetadata) -> Result<()> {
        self.metadata.insert(meta.key.clone(), meta.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.records.clear();
        self.metadata.clear();
        Ok(())
    }

    fn record_count(&self) -> Result<usize> {
        Ok(self.records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::daily_store::keys;
    use chrono::{Duration, Utc};

    fn record(day: u32, visitors: u64) -> DailyRecord {
        DailyRecord::new(
            NaiveDate::from_ymd_opt(2025, 12, day).unwrap(),
            TrafficMetrics {
                visitors,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_daily_since_filters_and_sorts() {
        let store = MemoryDailyStore::new();
        store
            .upsert_daily(&[record(3, 3), record(1, 1), record(5, 5), record(4, 4)])
            .unwrap();

        let since = NaiveDate::from_ymd_opt(2025, 12, 3).unwrap();
        let records = store.daily_since(since).unwrap();
        let visitors: Vec<u64> = records.iter().map(|r| r.metrics.visitors).collect();
        assert_eq!(visitors, vec![5, 4, 3]);
    }

    #[test]
    fn test_upsert_replaces() {
        let store = MemoryDailyStore::new();
        store.upsert_daily(&[record(1, 1)]).unwrap();
        store.upsert_daily(&[record(1, 9)]).unwrap();
        assert_eq!(store.record_count().unwrap(), 1);
    }

    #[test]
    fn test_cache_validity_tracks_metadata() {
        let store = MemoryDailyStore::new();
        let now = Utc::now();
        let max_age = Duration::hours(24);

        assert!(!store.is_cache_valid(keys::DAILY_ANALYTICS, max_age, now).unwrap());

        store
            .update_metadata(&CacheMetadata::success(
                keys::DAILY_ANALYTICS,
                3,
                now - Duration::hours(30),
            ))
            .unwrap();
        assert!(!store.is_cache_valid(keys::DAILY_ANALYTICS, max_age, now).unwrap());

        store
            .update_metadata(&CacheMetadata::success(keys::DAILY_ANALYTICS, 3, now))
            .unwrap();
        assert!(store.is_cache_valid(keys::DAILY_ANALYTICS, max_age, now).unwrap());

        store.clear().unwrap();
        assert!(store.metadata(keys::DAILY_ANALYTICS).unwrap().is_none());
    }
}
