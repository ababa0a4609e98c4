//! Data models for visitboard

pub mod traffic;

pub use traffic::{
    parse_day, sanitize_records, DailyRecord, RawDailyRecord, RecordIssue, Sanitized,
    TrafficMetrics,
};
