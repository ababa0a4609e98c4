//! Scheduled collection into the day-level store
//!
//! Re-fetches the most recent days from the source, upserts them and
//! records the outcome in the metadata table. Only day-level records are
//! persisted; aggregates are always recomputed on read.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info};

use crate::cache::{keys, CacheMetadata, CacheStatus, DailyStore};
use crate::error::CoreError;
use crate::service::ResponseCache;
use crate::source::DailySource;

/// Outcome for one collection key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionOutcome {
    pub status: CacheStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CollectionOutcome {
    fn success(count: usize) -> Self {
        Self {
            status: CacheStatus::Success,
            count: Some(count),
            error: None,
        }
    }

    fn failure(message: String) -> Self {
        Self {
            status: CacheStatus::Error,
            count: None,
            error: Some(message),
        }
    }
}

/// Result of one collection run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionReport {
    pub timestamp: DateTime<Utc>,
    /// True when every collection succeeded
    pub success: bool,
    pub collections: BTreeMap<String, CollectionOutcome>,
}

impl CollectionReport {
    /// Total records written across collections
    pub fn total_saved(&self) -> usize {
        self.collections.values().filter_map(|o| o.count).sum()
    }
}

pub struct Collector {
    source: DailySource,
    store: Option<Arc<dyn DailyStore>>,
    responses: ResponseCache,
    days: u32,
}

impl Collector {
    pub fn new(
        source: DailySource,
        store: Option<Arc<dyn DailyStore>>,
        responses: ResponseCache,
        days: u32,
    ) -> Self {
        Self {
            source,
            store,
            responses,
            days: days.max(1),
        }
    }

    pub fn days(&self) -> u32 {
        self.days
    }

    pub async fn collect(&self) -> CollectionReport {
        let now = Utc::now();
        self.collect_on(now.date_naive(), now).await
    }

    pub async fn collect_on(&self, today: NaiveDate, now: DateTime<Utc>) -> CollectionReport {
        let mut collections = BTreeMap::new();

        let outcome = match self.collect_daily(today, now).await {
            Ok(count) => {
                info!(count, days = self.days, "Daily analytics collected");
                CollectionOutcome::success(count)
            }
            Err(e) => {
                error!(error = %e, "Daily analytics collection failed");
                if let Some(store) = &self.store {
                    let meta = CacheMetadata::error(keys::DAILY_ANALYTICS, e.to_string(), now);
                    if let Err(meta_err) = store.update_metadata(&meta) {
                        error!(error = %meta_err, "Failed to record collection error");
                    }
                }
                CollectionOutcome::failure(e.to_string())
            }
        };
        collections.insert(keys::DAILY_ANALYTICS.to_string(), outcome);

        // Stored data changed (or failed); cached responses may be stale
        self.responses.invalidate_all();

        let success = collections
            .values()
            .all(|o| o.status == CacheStatus::Success);

        CollectionReport {
            timestamp: now,
            success,
            collections,
        }
    }

    async fn collect_daily(&self, today: NaiveDate, now: DateTime<Utc>) -> Result<usize, CoreError> {
        let store = self.store.as_ref().ok_or(CoreError::StoreNotConfigured)?;

        let records = self.source.fetch(self.days, today).await?;
        let saved = store
            .upsert_daily(&records)
            .map_err(|e| CoreError::store("failed to save daily analytics", e))?;

        store
            .update_metadata(&CacheMetadata::success(keys::DAILY_ANALYTICS, saved, now))
            .map_err(|e| CoreError::store("failed to update cache metadata", e))?;

        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::AggregatedVisitorData;
    use crate::cache::{MemoryDailyStore, MokaTtlCache, NoopCache, TtlCache};
    use crate::source::{DemoSource, FileSource};
    use chrono::TimeZone;
    use std::time::Duration;
    use tempfile::tempdir;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 12, 21, 3, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_collect_success() {
        let store = Arc::new(MemoryDailyStore::new());
        let collector = Collector::new(
            DailySource::Demo(DemoSource::new()),
            Some(store.clone()),
            Arc::new(NoopCache),
            7,
        );

        let report = collector.collect_on(now().date_naive(), now()).await;

        assert!(report.success);
        assert_eq!(report.total_saved(), 7);
        assert_eq!(store.record_count().unwrap(), 7);

        let meta = store.metadata(keys::DAILY_ANALYTICS).unwrap().unwrap();
        assert_eq!(meta.status, CacheStatus::Success);
        assert_eq!(meta.record_count, 7);
        assert!(store
            .is_cache_valid(keys::DAILY_ANALYTICS, chrono::Duration::hours(24), now())
            .unwrap());
    }

    #[tokio::test]
    async fn test_collect_failure_records_error() {
        let dir = tempdir().unwrap();
        let store = Arc::new(MemoryDailyStore::new());
        let collector = Collector::new(
            DailySource::File(FileSource::new(dir.path().join("missing.json"))),
            Some(store.clone()),
            Arc::new(NoopCache),
            7,
        );

        let report = collector.collect_on(now().date_naive(), now()).await;

        assert!(!report.success);
        let outcome = &report.collections[keys::DAILY_ANALYTICS];
        assert_eq!(outcome.status, CacheStatus::Error);
        assert!(outcome.error.as_deref().unwrap().contains("missing.json"));

        let meta = store.metadata(keys::DAILY_ANALYTICS).unwrap().unwrap();
        assert_eq!(meta.status, CacheStatus::Error);
        assert!(meta.error_message.is_some());
    }

    #[tokio::test]
    async fn test_collect_without_store() {
        let collector = Collector::new(
            DailySource::Demo(DemoSource::new()),
            None,
            Arc::new(NoopCache),
            7,
        );
        let report = collector.collect_on(now().date_naive(), now()).await;
        assert!(!report.success);
    }

    #[tokio::test]
    async fn test_collect_invalidates_responses() {
        let responses = Arc::new(MokaTtlCache::<AggregatedVisitorData>::new(8));
        responses.set("aggregated:90", AggregatedVisitorData::empty(), Duration::from_secs(60));

        let collector = Collector::new(
            DailySource::Demo(DemoSource::new()),
            Some(Arc::new(MemoryDailyStore::new())),
            responses.clone(),
            3,
        );
        collector.collect_on(now().date_naive(), now()).await;

        assert!(responses.get("aggregated:90").is_none());
    }

    #[test]
    fn test_report_json_shape() {
        let mut collections = BTreeMap::new();
        collections.insert(keys::DAILY_ANALYTICS.to_string(), CollectionOutcome::success(7));
        let report = CollectionReport {
            timestamp: now(),
            success: true,
            collections,
        };

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["collections"]["daily_analytics"]["status"], "success");
        assert_eq!(value["collections"]["daily_analytics"]["count"], 7);
        assert!(value["collections"]["daily_analytics"].get("error").is_none());
    }
}
