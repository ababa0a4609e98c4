//! Day-level record sources
//!
//! Every source hands back sanitized records inside the requested window,
//! newest first. Fewer days than requested is normal (young sites, gaps).

mod demo;
mod file;
mod http;

pub use demo::DemoSource;
pub use file::FileSource;
pub use http::HttpSource;

use chrono::{Duration, NaiveDate};
use serde::Deserialize;

use crate::config::{SourceConfig, SourceKind};
use crate::error::CoreError;
use crate::models::{sanitize_records, DailyRecord, RawDailyRecord};

/// Accepted JSON payload shapes
#[derive(Deserialize)]
#[serde(untagged)]
enum Payload {
    Records(Vec<RawDailyRecord>),
    Wrapped { daily: Vec<RawDailyRecord> },
}

/// Parse a bare array of records or an object with a `daily` array
pub(crate) fn parse_payload(text: &str, origin: &str) -> Result<Vec<RawDailyRecord>, CoreError> {
    let payload: Payload = serde_json::from_str(text).map_err(|source| CoreError::JsonParse {
        origin: origin.to_string(),
        message: source.to_string(),
        source,
    })?;

    Ok(match payload {
        Payload::Records(records) => records,
        Payload::Wrapped { daily } => daily,
    })
}

/// First day of a `days`-long window ending at `today`
pub fn window_start(days: u32, today: NaiveDate) -> NaiveDate {
    today - Duration::days(days.max(1) as i64 - 1)
}

/// Configured upstream for day-level records
#[derive(Debug, Clone)]
pub enum DailySource {
    Demo(DemoSource),
    File(FileSource),
    Http(HttpSource),
}

impl DailySource {
    pub fn from_config(config: &SourceConfig) -> Result<Self, CoreError> {
        match config.kind {
            SourceKind::Demo => Ok(DailySource::Demo(DemoSource::new())),
            SourceKind::File => {
                let path = config.path.clone().ok_or_else(|| CoreError::InvalidConfig {
                    message: "file source requires a path".into(),
                })?;
                Ok(DailySource::File(FileSource::new(path)))
            }
            SourceKind::Http => {
                let url = config.url.clone().ok_or_else(|| CoreError::InvalidConfig {
                    message: "http source requires a url".into(),
                })?;
                Ok(DailySource::Http(HttpSource::new(url, config.timeout())?))
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            DailySource::Demo(_) => "demo",
            DailySource::File(_) => "file",
            DailySource::Http(_) => "http",
        }
    }

    pub fn is_demo(&self) -> bool {
        matches!(self, DailySource::Demo(_))
    }

    /// Records in `[today - days + 1, today]`, sanitized, newest first
    pub async fn fetch(&self, days: u32, today: NaiveDate) -> Result<Vec<DailyRecord>, CoreError> {
        let raw = match self {
            DailySource::Demo(demo) => return Ok(demo.generate(days.max(1), today)),
            DailySource::File(file) => file.load().await?,
            DailySource::Http(http) => http.fetch_raw(days).await?,
        };

        let received = raw.len();
        let sanitized = sanitize_records(raw);
        let since = window_start(days, today);

        let mut records: Vec<DailyRecord> = sanitized
            .records
            .into_iter()
            .filter(|r| r.date >= since && r.date <= today)
            .collect();
        records.sort_by(|a, b| b.date.cmp(&a.date));

        tracing::debug!(
            source = self.kind(),
            received,
            dropped = sanitized.issues.len(),
            kept = records.len(),
            "Day-level records fetched"
        );

        Ok(records)
    }
}
