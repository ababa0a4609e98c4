//! SQLite day-level cache
//!
//! Schema:
//! - daily_analytics: one row per calendar day, date stored as `YYYY-MM-DD`
//!   so lexical order is date order
//! - cache_metadata: one row per collection key
//! - store_info: schema version
//!
//! A schema version mismatch on open drops every cached row; the next
//! collection repopulates them.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::daily_store::{CacheMetadata, CacheStatus, DailyStore};
use crate::models::{DailyRecord, TrafficMetrics};

/// Current schema version
///
/// Increment when the column layout or stored units change.
const SCHEMA_VERSION: i32 = 1;

/// Default database file name inside the cache directory
pub const DB_FILE_NAME: &str = "visitboard.db";

/// SQLite-backed [`DailyStore`] (thread-safe)
pub struct SqliteDailyStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl SqliteDailyStore {
    /// Create or open the database at `db_path`, creating parent directories
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create cache directory: {}", parent.display())
                })?;
            }
        }

        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open cache database: {}", db_path.display()))?;

        conn.pragma_update(None, "journal_mode", "WAL")
            .context("Failed to enable WAL mode")?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS store_info (
                key TEXT PRIMARY KEY,
                value INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS daily_analytics (
                date TEXT PRIMARY KEY,
                visitors INTEGER NOT NULL,
                pageviews INTEGER NOT NULL,
                sessions INTEGER NOT NULL,
                new_users INTEGER NOT NULL,
                bounce_rate REAL NOT NULL,
                avg_duration REAL NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS cache_metadata (
                key TEXT PRIMARY KEY,
                last_updated TEXT NOT NULL,
                record_count INTEGER NOT NULL,
                status TEXT NOT NULL,
                error_message TEXT
            );
            "#,
        )
        .context("Failed to create schema")?;

        let stored_version: Option<i32> = conn
            .query_row(
                "SELECT value FROM store_info WHERE key = 'version'",
                [],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to query schema version")?;

        match stored_version {
            Some(v) if v != SCHEMA_VERSION => {
                warn!(
                    stored = v,
                    current = SCHEMA_VERSION,
                    "Schema version mismatch, clearing cached analytics"
                );
                conn.execute_batch("DELETE FROM daily_analytics; DELETE FROM cache_metadata;")
                    .context("Failed to clear stale cache")?;
                conn.execute(
                    "INSERT OR REPLACE INTO store_info (key, value) VALUES ('version', ?)",
                    params![SCHEMA_VERSION],
                )
                .context("Failed to update schema version")?;
            }
            None => {
                conn.execute(
                    "INSERT INTO store_info (key, value) VALUES ('version', ?)",
                    params![SCHEMA_VERSION],
                )
                .context("Failed to initialize schema version")?;
                debug!("Schema version initialized to {}", SCHEMA_VERSION);
            }
            Some(_) => {}
        }

        debug!(path = %db_path.display(), "Daily store opened");

        Ok(Self {
            conn: Mutex::new(conn),
            db_path: db_path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }
}

fn parse_stored_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("Corrupt date in cache: {}", value))
}

fn parse_stored_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .with_context(|| format!("Corrupt timestamp in cache: {}", value))
}

impl DailyStore for SqliteDailyStore {
    fn kind(&self) -> &'static str {
        "sqlite"
    }

    fn upsert_daily(&self, records: &[DailyRecord]) -> Result<usize> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().context("Failed to begin transaction")?;
        let updated_at = Utc::now().to_rfc3339();

        {
            let mut stmt = tx
                .prepare(
                    r#"
                    INSERT OR REPLACE INTO daily_analytics
                    (date, visitors, pageviews, sessions, new_users, bounce_rate, avg_duration, updated_at)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .context("Failed to prepare upsert")?;

            for record in records {
                let m = &record.metrics;
                stmt.execute(params![
                    record.date.format("%Y-%m-%d").to_string(),
                    m.visitors as i64,
                    m.pageviews as i64,
                    m.sessions as i64,
                    m.new_users as i64,
                    m.bounce_rate,
                    m.avg_duration,
                    &updated_at,
                ])
                .with_context(|| format!("Failed to upsert record for {}", record.date))?;
            }
        }

        tx.commit().context("Failed to commit upsert")?;
        debug!(count = records.len(), "Daily records upserted");
        Ok(records.len())
    }

    fn daily_since(&self, since: NaiveDate) -> Result<Vec<DailyRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                r#"
                SELECT date, visitors, pageviews, sessions, new_users, bounce_rate, avg_duration
                FROM daily_analytics
                WHERE date >= ?
                ORDER BY date DESC
                "#,
            )
            .context("Failed to prepare query")?;

        let rows = stmt
            .query_map(params![since.format("%Y-%m-%d").to_string()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, f64>(5)?,
                    row.get::<_, f64>(6)?,
                ))
            })
            .context("Failed to query daily records")?;

        let mut records = Vec::new();
        for row in rows {
            let (date, visitors, pageviews, sessions, new_users, bounce_rate, avg_duration) =
                row.context("Failed to read row")?;
            records.push(DailyRecord::new(
                parse_stored_date(&date)?,
                TrafficMetrics {
                    visitors: visitors.max(0) as u64,
                    pageviews: pageviews.max(0) as u64,
                    sessions: sessions.max(0) as u64,
                    new_users: new_users.max(0) as u64,
                    bounce_rate,
                    avg_duration,
                },
            ));
        }

        Ok(records)
    }

    fn metadata(&self, key: &str) -> Result<Option<CacheMetadata>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT last_updated, record_count, status, error_message FROM cache_metadata WHERE key = ?",
                params![key],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<String>>(3)?,
                    ))
                },
            )
            .optional()
            .context("Failed to query cache metadata")?;

        let Some((last_updated, record_count, status, error_message)) = row else {
            return Ok(None);
        };

        Ok(Some(CacheMetadata {
            key: key.to_string(),
            last_updated: parse_stored_timestamp(&last_updated)?,
            record_count: record_count.max(0) as usize,
            status: CacheStatus::parse(&status),
            error_message,
        }))
    }

    fn update_metadata(&self, meta: &CacheMetadata) -> Result<()> {
        self.conn
            .lock()
            .execute(
                r#"
                INSERT OR REPLACE INTO cache_metadata
                (key, last_updated, record_count, status, error_message)
                VALUES (?, ?, ?, ?, ?)
                "#,
                params![
                    &meta.key,
                    meta.last_updated.to_rfc3339(),
                    meta.record_count as i64,
                    meta.status.as_str(),
                    &meta.error_message,
                ],
            )
            .context("Failed to update cache metadata")?;

        debug!(key = %meta.key, status = %meta.status, "Cache metadata updated");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.conn
            .lock()
            .execute_batch("DELETE FROM daily_analytics; DELETE FROM cache_metadata;")
            .context("Failed to clear cache")?;
        debug!("Daily store cleared");
        Ok(())
    }

    fn record_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .lock()
            .query_row("SELECT COUNT(*) FROM daily_analytics", [], |row| row.get(0))
            .context("Failed to count records")?;
        Ok(count.max(0) as usize)
    }
}

impl Drop for SqliteDailyStore {
    fn drop(&mut self) {
        // Flush WAL into the main file so it doesn't grow across restarts
        let conn = self.conn.lock();
        if let Err(e) = conn.pragma_update(None, "wal_checkpoint", "TRUNCATE") {
            warn!("Failed to checkpoint WAL on drop: {}", e);
        }
    }
}
