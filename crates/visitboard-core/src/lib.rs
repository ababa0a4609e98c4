//! visitboard-core - Core library for visitboard
//!
//! Provides day-level traffic models, the temporal aggregator (weekly and
//! monthly rollups, summaries, period comparison), day-level sources, the
//! cache store, and the services the web layer and CLI sit on.

pub mod analytics;
pub mod cache;
pub mod collector;
pub mod config;
pub mod error;
pub mod models;
pub mod service;
pub mod source;

pub use analytics::{
    aggregate, aggregate_to_monthly, aggregate_to_weekly, calculate_summary, AggregatedVisitorData,
    ComparePreset, Lookback, PeriodComparison, PeriodSpan,
};
pub use collector::{CollectionOutcome, CollectionReport, Collector};
pub use config::DashboardConfig;
pub use error::{CoreError, DegradedState};
pub use models::{DailyRecord, TrafficMetrics};
pub use service::{AggregatedResponse, AnalyticsService, CompareRequest, CompareResponse, Origin};
pub use source::DailySource;
