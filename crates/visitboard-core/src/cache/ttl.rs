//! Short-lived response cache
//!
//! Holds computed responses keyed by request shape (e.g. `aggregated:90`)
//! so repeated dashboard loads don't hit the upstream source. Owned by the
//! service that uses it; there is no process-wide instance.

use moka::sync::Cache;
use moka::Expiry;
use std::time::{Duration, Instant};

/// Key/value cache where every entry carries its own time-to-live
pub trait TtlCache<V>: Send + Sync {
    fn get(&self, key: &str) -> Option<V>;

    fn set(&self, key: &str, value: V, ttl: Duration);

    /// Drop every entry, e.g. after a collection refreshed the data
    fn invalidate_all(&self);
}

#[derive(Clone)]
struct Timed<V> {
    value: V,
    ttl: Duration,
}

struct PerEntryTtl;

impl<V> Expiry<String, Timed<V>> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Timed<V>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Timed<V>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Moka-backed [`TtlCache`]
pub struct MokaTtlCache<V> {
    inner: Cache<String, Timed<V>>,
}

impl<V> MokaTtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// `max_entries` bounds memory; one entry per distinct request key
    pub fn new(max_entries: u64) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_entries)
            .expire_after(PerEntryTtl)
            .build();
        Self { inner }
    }

    pub fn entry_count(&self) -> u64 {
        self.inner.run_pending_tasks();
        self.inner.entry_count()
    }
}

impl<V> TtlCache<V> for MokaTtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn get(&self, key: &str) -> Option<V> {
        self.inner.get(key).map(|timed| timed.value)
    }

    fn set(&self, key: &str, value: V, ttl: Duration) {
        self.inner.insert(key.to_string(), Timed { value, ttl });
    }

    fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }
}

/// Cache that stores nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCache;

impl<V> TtlCache<V> for NoopCache {
    fn get(&self, _key: &str) -> Option<V> {
        None
    }

    fn set(&self, _key: &str, _value: V, _ttl: Duration) {}

    fn invalidate_all(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set() {
        let cache: MokaTtlCache<u32> = MokaTtlCache::new(16);
        assert_eq!(cache.get("a"), None);

        cache.set("a", 1, Duration::from_secs(60));
        assert_eq!(cache.get("a"), Some(1));

        cache.set("a", 2, Duration::from_secs(60));
        assert_eq!(cache.get("a"), Some(2));
        assert_eq!(cache.entry_count(), 1);
    }

    #[test]
    fn test_entry_expires() {
        let cache: MokaTtlCache<u32> = MokaTtlCache::new(16);
        cache.set("short", 1, Duration::from_millis(20));
        cache.set("long", 2, Duration::from_secs(60));

        std::thread::sleep(Duration::from_millis(80));

        assert_eq!(cache.get("short"), None);
        assert_eq!(cache.get("long"), Some(2));
    }

    #[test]
    fn test_invalidate_all() {
        let cache: MokaTtlCache<String> = MokaTtlCache::new(16);
        cache.set("aggregated:30", "x".into(), Duration::from_secs(60));
        cache.set("aggregated:90", "y".into(), Duration::from_secs(60));

        cache.invalidate_all();

        assert_eq!(cache.get("aggregated:30"), None);
        assert_eq!(cache.get("aggregated:90"), None);
    }

    #[test]
    fn test_noop_never_holds() {
        let cache = NoopCache;
        TtlCache::<u32>::set(&cache, "a", 1, Duration::from_secs(60));
        assert_eq!(TtlCache::<u32>::get(&cache, "a"), None);
    }
}
