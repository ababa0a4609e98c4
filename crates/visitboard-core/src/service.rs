//! Analytics service: the aggregated read path
//!
//! Day-level records are looked up in order:
//! 1. demo source (nothing else consulted)
//! 2. persistent store, when its last collection is fresh
//! 3. in-process response cache, keyed by lookback
//! 4. the upstream source
//!
//! Upstream failures never surface to the dashboard; they degrade to an
//! empty aggregate tagged `empty`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::analytics::{
    compare_periods, AggregatedVisitorData, ComparePreset, Lookback, PeriodComparison, PeriodSpan,
};
use crate::cache::{
    keys, CacheMetadata, CacheStatus, DailyStore, MemoryDailyStore, MokaTtlCache, NoopCache,
    SqliteDailyStore, TtlCache,
};
use crate::collector::Collector;
use crate::config::{CacheBackend, DashboardConfig};
use crate::error::{CoreError, DegradedState};
use crate::models::DailyRecord;
use crate::source::{window_start, DailySource};

/// Shared response cache handle
pub type ResponseCache = Arc<dyn TtlCache<AggregatedVisitorData>>;

/// Where the day-level input of a response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Demo,
    Cache,
    Memory,
    Live,
    Empty,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Origin::Demo => "demo",
            Origin::Cache => "cache",
            Origin::Memory => "memory",
            Origin::Live => "live",
            Origin::Empty => "empty",
        })
    }
}

/// Aggregated view plus its origin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedResponse {
    #[serde(flatten)]
    pub data: AggregatedVisitorData,
    pub origin: Origin,
}

/// Which two spans to compare
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareRequest {
    Preset(ComparePreset),
    Explicit {
        current: PeriodSpan,
        previous: PeriodSpan,
    },
}

impl CompareRequest {
    pub fn spans(&self, today: NaiveDate) -> (PeriodSpan, PeriodSpan) {
        match *self {
            CompareRequest::Preset(preset) => preset.spans(today),
            CompareRequest::Explicit { current, previous } => (current, previous),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompareResponse {
    #[serde(flatten)]
    pub comparison: PeriodComparison,
    pub origin: Origin,
}

/// Backend status for `/api/health`
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub source: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_backend: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_records: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_collection: Option<CacheMetadata>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Read side of the dashboard backend, shared across requests
pub struct AnalyticsService {
    source: DailySource,
    store: Option<Arc<dyn DailyStore>>,
    responses: ResponseCache,
    max_age: chrono::Duration,
    memory_ttl: Duration,
    default_days: u32,
}

impl AnalyticsService {
    /// Service over `source` with no store and no response cache
    pub fn new(source: DailySource) -> Self {
        Self {
            source,
            store: None,
            responses: Arc::new(NoopCache),
            max_age: chrono::Duration::hours(24),
            memory_ttl: Duration::from_secs(300),
            default_days: Lookback::DEFAULT_DAYS,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn DailyStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_response_cache(mut self, cache: ResponseCache) -> Self {
        self.responses = cache;
        self
    }

    pub fn with_max_age(mut self, max_age: chrono::Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn with_memory_ttl(mut self, ttl: Duration) -> Self {
        self.memory_ttl = ttl;
        self
    }

    pub fn with_default_days(mut self, days: u32) -> Self {
        self.default_days = Lookback::new(days).days();
        self
    }

    /// Wire source, store and response cache from configuration
    pub fn from_config(config: &DashboardConfig) -> Result<Self, CoreError> {
        config.validate()?;
        let source = DailySource::from_config(&config.source)?;

        let store: Option<Arc<dyn DailyStore>> = match config.cache.backend {
            CacheBackend::Sqlite => {
                let path = config
                    .cache
                    .resolved_db_path()
                    .ok_or(CoreError::StoreNotConfigured)?;
                let store = SqliteDailyStore::open(&path)
                    .map_err(|e| CoreError::store("failed to open sqlite store", e))?;
                Some(Arc::new(store))
            }
            CacheBackend::Memory => Some(Arc::new(MemoryDailyStore::new())),
            CacheBackend::None => None,
        };

        let responses: ResponseCache = if config.cache.memory_ttl_secs > 0 {
            Arc::new(MokaTtlCache::<AggregatedVisitorData>::new(
                config.cache.memory_capacity,
            ))
        } else {
            Arc::new(NoopCache)
        };

        let mut service = Self::new(source)
            .with_response_cache(responses)
            .with_max_age(config.cache.max_age())
            .with_memory_ttl(config.cache.memory_ttl())
            .with_default_days(config.default_days);
        if let Some(store) = store {
            service = service.with_store(store);
        }

        info!(
            source = service.source.kind(),
            store = service.store.as_ref().map(|s| s.kind()).unwrap_or("none"),
            "Analytics service configured"
        );

        Ok(service)
    }

    pub fn source(&self) -> &DailySource {
        &self.source
    }

    pub fn store(&self) -> Option<&Arc<dyn DailyStore>> {
        self.store.as_ref()
    }

    pub fn default_lookback(&self) -> Lookback {
        Lookback::new(self.default_days)
    }

    /// Collector sharing this service's source, store and response cache
    pub fn collector(&self, days: u32) -> Collector {
        Collector::new(
            self.source.clone(),
            self.store.clone(),
            Arc::clone(&self.responses),
            days,
        )
    }

    /// Aggregated view for the last `lookback` days, as of now
    pub async fn aggregated(&self, lookback: Lookback, force_refresh: bool) -> AggregatedResponse {
        let now = Utc::now();
        self.aggregated_on(lookback, force_refresh, now.date_naive(), now)
            .await
    }

    /// Aggregated view with an explicit clock
    pub async fn aggregated_on(
        &self,
        lookback: Lookback,
        force_refresh: bool,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> AggregatedResponse {
        let days = lookback.days();

        if let DailySource::Demo(demo) = &self.source {
            debug!(days, "Serving demo data");
            return AggregatedResponse {
                data: AggregatedVisitorData::compute(demo.generate(days, today)),
                origin: Origin::Demo,
            };
        }

        if !force_refresh {
            if let Some(daily) = self.read_store(window_start(days, today), today, now) {
                return AggregatedResponse {
                    data: AggregatedVisitorData::compute(daily),
                    origin: Origin::Cache,
                };
            }

            if let Some(data) = self.responses.get(&response_key(days)) {
                debug!(days, "Response cache hit");
                return AggregatedResponse {
                    data,
                    origin: Origin::Memory,
                };
            }
        }

        match self.source.fetch(days, today).await {
            Ok(daily) if !daily.is_empty() => {
                let data = AggregatedVisitorData::compute(daily);
                self.responses
                    .set(&response_key(days), data.clone(), self.memory_ttl);
                info!(
                    days,
                    records = data.daily.len(),
                    weeks = data.weekly.len(),
                    "Aggregated live data"
                );
                AggregatedResponse {
                    data,
                    origin: Origin::Live,
                }
            }
            Ok(_) => {
                info!(days, source = self.source.kind(), "Source returned no records");
                empty_response()
            }
            Err(e) => {
                warn!(error = %e, source = self.source.kind(), "Upstream fetch failed, serving empty data");
                empty_response()
            }
        }
    }

    /// Compare two periods, as of today
    pub async fn compare(&self, request: CompareRequest) -> Result<CompareResponse, CoreError> {
        let now = Utc::now();
        self.compare_on(request, now.date_naive(), now).await
    }

    pub async fn compare_on(
        &self,
        request: CompareRequest,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<CompareResponse, CoreError> {
        let (current, previous) = request.spans(today);
        let earliest = current.start.min(previous.start);
        let (daily, origin) = self.daily_since(earliest, today, now).await?;

        Ok(CompareResponse {
            comparison: compare_periods(&daily, current, previous),
            origin,
        })
    }

    /// Day-level records from `since` through `today`
    ///
    /// Store first (when fresh), then the source. Unlike the aggregated
    /// view, a source failure is returned to the caller.
    pub async fn daily_since(
        &self,
        since: NaiveDate,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<(Vec<DailyRecord>, Origin), CoreError> {
        let days = ((today - since).num_days() + 1).clamp(1, Lookback::MAX_DAYS as i64) as u32;

        if !self.source.is_demo() {
            if let Some(daily) = self.read_store(since, today, now) {
                return Ok((daily, Origin::Cache));
            }
        }

        let daily = self.source.fetch(days, today).await?;
        let origin = match (&self.source, daily.is_empty()) {
            (DailySource::Demo(_), _) => Origin::Demo,
            (_, true) => Origin::Empty,
            (_, false) => Origin::Live,
        };
        Ok((daily, origin))
    }

    /// Drop everything cached, persistent and in-process
    pub fn clear_cache(&self) -> Result<(), CoreError> {
        self.responses.invalidate_all();
        if let Some(store) = &self.store {
            store
                .clear()
                .map_err(|e| CoreError::store("failed to clear store", e))?;
        }
        info!("Caches cleared");
        Ok(())
    }

    /// Current degradation state of the backend
    pub fn degraded_state(&self, now: DateTime<Utc>) -> DegradedState {
        if self.source.is_demo() {
            return DegradedState::Healthy;
        }
        let Some(store) = &self.store else {
            return DegradedState::Healthy;
        };

        match store.metadata(keys::DAILY_ANALYTICS) {
            Ok(Some(meta)) if meta.is_fresh(self.max_age, now) => DegradedState::Healthy,
            Ok(Some(meta)) if meta.status == CacheStatus::Error => DegradedState::PartialData {
                missing: vec![keys::DAILY_ANALYTICS.to_string()],
                reason: meta
                    .error_message
                    .unwrap_or_else(|| "last collection failed".to_string()),
            },
            Ok(Some(meta)) => DegradedState::PartialData {
                missing: vec![keys::DAILY_ANALYTICS.to_string()],
                reason: format!("last collection {}h ago", meta.age_hours(now)),
            },
            Ok(None) => DegradedState::PartialData {
                missing: vec![keys::DAILY_ANALYTICS.to_string()],
                reason: "never collected".to_string(),
            },
            Err(e) => DegradedState::PartialData {
                missing: vec![keys::DAILY_ANALYTICS.to_string()],
                reason: format!("store unreadable: {}", e),
            },
        }
    }

    pub fn health(&self) -> HealthReport {
        let now = Utc::now();
        let mut warnings = Vec::new();

        let (cache_records, last_collection) = match &self.store {
            Some(store) => {
                let records = store
                    .record_count()
                    .map_err(|e| warnings.push(format!("record count: {}", e)))
                    .ok();
                let meta = store
                    .metadata(keys::DAILY_ANALYTICS)
                    .map_err(|e| warnings.push(format!("metadata: {}", e)))
                    .ok()
                    .flatten();
                (records, meta)
            }
            None => (None, None),
        };

        let state = self.degraded_state(now);
        if let DegradedState::PartialData { reason, .. } = &state {
            warnings.push(reason.clone());
        }

        HealthReport {
            status: if state.is_healthy() { "ok" } else { "degraded" },
            source: self.source.kind(),
            cache_backend: self.store.as_ref().map(|s| s.kind()),
            cache_records,
            last_collection,
            warnings,
        }
    }

    /// Fresh, non-empty store contents in `[since, today]`, or None
    fn read_store(
        &self,
        since: NaiveDate,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Option<Vec<DailyRecord>> {
        let store = self.store.as_ref()?;

        match store.is_cache_valid(keys::DAILY_ANALYTICS, self.max_age, now) {
            Ok(true) => {}
            Ok(false) => {
                debug!("Store cache stale or missing");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "Store metadata unreadable, skipping");
                return None;
            }
        }

        match store.daily_since(since) {
            Ok(mut daily) => {
                daily.retain(|r| r.date <= today);
                if daily.is_empty() {
                    debug!(%since, "Store cache valid but empty for window");
                    None
                } else {
                    debug!(records = daily.len(), "Store cache hit");
                    Some(daily)
                }
            }
            Err(e) => {
                warn!(error = %e, "Store read failed, skipping");
                None
            }
        }
    }
}

/// Response cache key for a lookback
pub fn response_key(days: u32) -> String {
    format!("aggregated:{}", days)
}

fn empty_response() -> AggregatedResponse {
    AggregatedResponse {
        data: AggregatedVisitorData::empty(),
        origin: Origin::Empty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TrafficMetrics;
    use crate::source::{DemoSource, FileSource};
    use chrono::{Duration as ChronoDuration, TimeZone};
    use tempfile::{tempdir, TempDir};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 12, 21).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 12, 21, 9, 0, 0).unwrap()
    }

    fn record(day: u32, visitors: u64) -> DailyRecord {
        DailyRecord::new(
            NaiveDate::from_ymd_opt(2025, 12, day).unwrap(),
            TrafficMetrics {
                visitors,
                pageviews: visitors * 2,
                sessions: visitors,
                new_users: visitors / 2,
                bounce_rate: 40.0,
                avg_duration: 150.0,
            },
        )
    }

    /// File source with `visitors` per day from Dec 15 to Dec 21
    fn file_source(visitors: u64) -> (TempDir, DailySource) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("daily.json");
        let rows: Vec<String> = (15..=21)
            .map(|d| format!(r#"{{"date":"2025-12-{:02}","visitors":{}}}"#, d, visitors))
            .collect();
        std::fs::write(&path, format!("[{}]", rows.join(","))).unwrap();
        (dir, DailySource::File(FileSource::new(path)))
    }

    fn broken_source() -> (TempDir, DailySource) {
        let dir = tempdir().unwrap();
        let source = DailySource::File(FileSource::new(dir.path().join("missing.json")));
        (dir, source)
    }

    #[tokio::test]
    async fn test_demo_origin() {
        let service = AnalyticsService::new(DailySource::Demo(DemoSource::new()));
        let response = service
            .aggregated_on(Lookback::new(14), false, today(), now())
            .await;
        assert_eq!(response.origin, Origin::Demo);
        assert_eq!(response.data.daily.len(), 14);
    }

    #[tokio::test]
    async fn test_live_then_memory() {
        let (_dir, source) = file_source(100);
        let service = AnalyticsService::new(source)
            .with_response_cache(Arc::new(MokaTtlCache::<AggregatedVisitorData>::new(8)));

        let first = service
            .aggregated_on(Lookback::new(7), false, today(), now())
            .await;
        assert_eq!(first.origin, Origin::Live);
        assert_eq!(first.data.summary.total_visitors, 700);

        let second = service
            .aggregated_on(Lookback::new(7), false, today(), now())
            .await;
        assert_eq!(second.origin, Origin::Memory);
        assert_eq!(second.data, first.data);

        // Different lookback is a different key
        let other = service
            .aggregated_on(Lookback::new(3), false, today(), now())
            .await;
        assert_eq!(other.origin, Origin::Live);
        assert_eq!(other.data.daily.len(), 3);

        let forced = service
            .aggregated_on(Lookback::new(7), true, today(), now())
            .await;
        assert_eq!(forced.origin, Origin::Live);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_empty() {
        let (_dir, source) = broken_source();
        let service = AnalyticsService::new(source);

        let response = service
            .aggregated_on(Lookback::default(), false, today(), now())
            .await;
        assert_eq!(response.origin, Origin::Empty);
        assert!(response.data.is_empty());
        assert!(response.data.summary.date_range.is_empty());
    }

    #[tokio::test]
    async fn test_fresh_store_wins() {
        let (_dir, source) = broken_source();
        let store = Arc::new(MemoryDailyStore::new());
        store.upsert_daily(&[record(20, 5), record(21, 6)]).unwrap();
        store
            .update_metadata(&CacheMetadata::success(keys::DAILY_ANALYTICS, 2, now()))
            .unwrap();

        let service = AnalyticsService::new(source).with_store(store);
        let response = service
            .aggregated_on(Lookback::new(30), false, today(), now())
            .await;

        assert_eq!(response.origin, Origin::Cache);
        assert_eq!(response.data.summary.total_visitors, 11);
    }

    #[tokio::test]
    async fn test_stale_store_falls_through() {
        let (_dir, source) = file_source(10);
        let store = Arc::new(MemoryDailyStore::new());
        store.upsert_daily(&[record(21, 999)]).unwrap();
        store
            .update_metadata(&CacheMetadata::success(
                keys::DAILY_ANALYTICS,
                1,
                now() - ChronoDuration::hours(48),
            ))
            .unwrap();

        let service = AnalyticsService::new(source).with_store(store);
        let response = service
            .aggregated_on(Lookback::new(7), false, today(), now())
            .await;
        assert_eq!(response.origin, Origin::Live);
        assert_eq!(response.data.summary.total_visitors, 70);
    }

    #[tokio::test]
    async fn test_force_refresh_skips_store() {
        let (_dir, source) = file_source(10);
        let store = Arc::new(MemoryDailyStore::new());
        store.upsert_daily(&[record(21, 999)]).unwrap();
        store
            .update_metadata(&CacheMetadata::success(keys::DAILY_ANALYTICS, 1, now()))
            .unwrap();

        let service = AnalyticsService::new(source).with_store(store);
        let response = service
            .aggregated_on(Lookback::new(7), true, today(), now())
            .await;
        assert_eq!(response.origin, Origin::Live);
    }

    #[tokio::test]
    async fn test_compare_preset() {
        let (_dir, source) = file_source(100);
        let service = AnalyticsService::new(source);

        let response = service
            .compare_on(CompareRequest::Preset(ComparePreset::Week), today(), now())
            .await
            .unwrap();
        assert_eq!(response.origin, Origin::Live);
        assert_eq!(response.comparison.current.visitors, 700);
        assert_eq!(response.comparison.previous.visitors, 0);
        assert_eq!(response.comparison.changes.visitors_percent, 0.0);
    }

    #[tokio::test]
    async fn test_compare_propagates_upstream_error() {
        let (_dir, source) = broken_source();
        let service = AnalyticsService::new(source);
        let err = service
            .compare_on(CompareRequest::Preset(ComparePreset::Month), today(), now())
            .await
            .unwrap_err();
        assert!(err.is_upstream());
    }

    #[tokio::test]
    async fn test_clear_cache() {
        let (_dir, source) = file_source(1);
        let store = Arc::new(MemoryDailyStore::new());
        store.upsert_daily(&[record(21, 1)]).unwrap();

        let service = AnalyticsService::new(source)
            .with_store(store.clone())
            .with_response_cache(Arc::new(MokaTtlCache::<AggregatedVisitorData>::new(8)));
        service
            .aggregated_on(Lookback::new(7), false, today(), now())
            .await;

        service.clear_cache().unwrap();
        assert_eq!(store.record_count().unwrap(), 0);
        let again = service
            .aggregated_on(Lookback::new(7), false, today(), now())
            .await;
        assert_eq!(again.origin, Origin::Live);
    }

    #[test]
    fn test_degraded_state() {
        let (_dir, source) = broken_source();
        let store = Arc::new(MemoryDailyStore::new());
        let service = AnalyticsService::new(source).with_store(store.clone());

        assert!(service.degraded_state(now()).is_degraded());

        store
            .update_metadata(&CacheMetadata::success(keys::DAILY_ANALYTICS, 3, now()))
            .unwrap();
        assert!(service.degraded_state(now()).is_healthy());

        store
            .update_metadata(&CacheMetadata::error(keys::DAILY_ANALYTICS, "quota", now()))
            .unwrap();
        match service.degraded_state(now()) {
            DegradedState::PartialData { reason, .. } => assert_eq!(reason, "quota"),
            other => panic!("expected degraded, got {:?}", other),
        }
    }

    #[test]
    fn test_response_json_has_origin() {
        let value = serde_json::to_value(empty_response()).unwrap();
        assert_eq!(value["origin"], "empty");
        assert!(value["daily"].as_array().unwrap().is_empty());
        assert_eq!(value["summary"]["date_range"]["start"], "");
    }

    #[test]
    fn test_from_config_memory_backend() {
        let mut config = DashboardConfig::default();
        config.cache.backend = CacheBackend::Memory;
        let service = AnalyticsService::from_config(&config).unwrap();
        assert_eq!(service.source().kind(), "demo");
        assert_eq!(service.store().map(|s| s.kind()), Some("memory"));
        assert_eq!(service.health().status, "ok");
    }

    #[test]
    fn test_from_config_rejects_out_of_range_max_age() {
        let mut config = DashboardConfig::default();
        config.cache.backend = CacheBackend::Memory;
        config.cache.max_age_hours = 9_000_000_000_000_000;
        assert!(matches!(
            AnalyticsService::from_config(&config),
            Err(CoreError::InvalidConfig { .. })
        ));
    }
}
