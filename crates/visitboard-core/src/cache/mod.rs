//! Caching layer for visitboard-core
//!
//! Two tiers: a persistent day-level store the collector fills and a
//! short-lived response cache in front of the upstream source.

pub mod daily_store;
pub mod memory_store;
pub mod sqlite_store;
pub mod ttl;

pub use daily_store::{keys, CacheMetadata, CacheStatus, DailyStore};
pub use memory_store::MemoryDailyStore;
pub use sqlite_store::{SqliteDailyStore, DB_FILE_NAME};
pub use ttl::{MokaTtlCache, NoopCache, TtlCache};
