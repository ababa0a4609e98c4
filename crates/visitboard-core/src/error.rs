//! Error types for visitboard-core
//!
//! Provides the error hierarchy with thiserror. Aggregation itself never fails;
//! everything here belongs to the edges (sources, config, cache store, periods).

use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

/// Core error type for visitboard operations
#[derive(Error, Debug)]
pub enum CoreError {
    // ===================
    // IO Errors
    // ===================
    #[error("Failed to read file: {path}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    // ===================
    // Parse Errors
    // ===================
    #[error("Failed to parse JSON from {origin}: {message}")]
    JsonParse {
        origin: String,
        message: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to parse config {path}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid date '{value}' (expected YYYY-MM-DD)")]
    InvalidDate { value: String },

    #[error("Invalid period: start {start} is after end {end}")]
    InvalidPeriod { start: NaiveDate, end: NaiveDate },

    #[error("Unknown compare preset '{value}' (expected week|month)")]
    InvalidPreset { value: String },

    // ===================
    // Source Errors
    // ===================
    #[error("Day-level source '{kind}' unavailable: {message}")]
    SourceUnavailable { kind: &'static str, message: String },

    #[error("HTTP request to {url} failed")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Operation timed out after {timeout_secs}s: {operation}")]
    Timeout {
        operation: String,
        timeout_secs: u64,
    },

    // ===================
    // Cache Store Errors
    // ===================
    #[error("Cache store not configured")]
    StoreNotConfigured,

    #[error("Cache store error: {message}")]
    Store {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    // ===================
    // Config Errors
    // ===================
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl CoreError {
    /// Wrap an anyhow error coming out of a cache store backend
    pub fn store(message: impl Into<String>, source: anyhow::Error) -> Self {
        CoreError::Store {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Whether the error comes from the upstream day-level source
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            CoreError::SourceUnavailable { .. }
                | CoreError::Http { .. }
                | CoreError::Timeout { .. }
                | CoreError::FileRead { .. }
                | CoreError::FileNotFound { .. }
                | CoreError::JsonParse { .. }
        )
    }
}

/// Degraded state indicator for the dashboard backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DegradedState {
    /// Everything available
    Healthy,
    /// Serving, but some input is stale or missing
    PartialData { missing: Vec<String>, reason: String },
}

impl DegradedState {
    pub fn is_healthy(&self) -> bool {
        matches!(self, DegradedState::Healthy)
    }

    pub fn is_degraded(&self) -> bool {
        !self.is_healthy()
    }
}
