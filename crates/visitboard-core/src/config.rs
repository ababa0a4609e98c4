//! Dashboard configuration
//!
//! Loaded from `~/.config/visitboard/config.toml` (or an explicit path).
//! Every field has a default, so a missing file or a partial file is fine.
//!
//! ```toml
//! default_days = 90
//!
//! [server]
//! port = 3333
//!
//! [source]
//! kind = "http"
//! url = "https://collector.internal/daily"
//!
//! [cache]
//! backend = "sqlite"
//! max_age_hours = 24
//!
//! [cron]
//! secret = "change-me"
//! ```

use chrono::Duration as ChronoDuration;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::DB_FILE_NAME;
use crate::error::CoreError;

/// Where day-level records come from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Generated data, no upstream
    #[default]
    Demo,
    /// JSON file on disk
    File,
    /// JSON over HTTP
    Http,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SourceKind::Demo => "demo",
            SourceKind::File => "file",
            SourceKind::Http => "http",
        })
    }
}

/// Persistent day-level cache backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Sqlite,
    Memory,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3333,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    /// Required for `file`
    pub path: Option<PathBuf>,
    /// Required for `http`
    pub url: Option<String>,
    /// Upstream request timeout
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Demo,
            path: None,
            url: None,
            timeout_secs: 30,
        }
    }
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    /// SQLite file, defaults to `~/.cache/visitboard/visitboard.db`
    pub db_path: Option<PathBuf>,
    /// A successful collection older than this is stale
    pub max_age_hours: i64,
    /// Lifetime of computed responses in the in-process cache (0 disables it)
    pub memory_ttl_secs: u64,
    pub memory_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Sqlite,
            db_path: None,
            max_age_hours: 24,
            memory_ttl_secs: 300,
            memory_capacity: 64,
        }
    }
}

impl CacheConfig {
    /// Upper bound on `max_age_hours` (one year)
    pub const MAX_AGE_HOURS: i64 = 24 * 365;

    /// Clamped to `1..=MAX_AGE_HOURS`
    pub fn max_age(&self) -> ChronoDuration {
        ChronoDuration::hours(self.max_age_hours.clamp(1, Self::MAX_AGE_HOURS))
    }

    pub fn memory_ttl(&self) -> Duration {
        Duration::from_secs(self.memory_ttl_secs)
    }

    /// Configured database path, or the default under the user cache dir
    pub fn resolved_db_path(&self) -> Option<PathBuf> {
        self.db_path
            .clone()
            .or_else(|| dirs::cache_dir().map(|d| d.join("visitboard").join(DB_FILE_NAME)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CronConfig {
    /// Bearer token required by the collection endpoint (open when unset)
    pub secret: Option<String>,
    /// Days re-fetched per collection
    pub collect_days: u32,
}

impl Default for CronConfig {
    fn default() -> Self {
        Self {
            secret: None,
            collect_days: 7,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub server: ServerConfig,
    pub source: SourceConfig,
    pub cache: CacheConfig,
    pub cron: CronConfig,
    /// Lookback used when a request gives none
    pub default_days: u32,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            source: SourceConfig::default(),
            cache: CacheConfig::default(),
            cron: CronConfig::default(),
            default_days: 90,
        }
    }
}

impl DashboardConfig {
    /// `~/.config/visitboard/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("visitboard").join("config.toml"))
    }

    /// Load and validate; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let config = match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml_str(&text, path)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file, using defaults");
                Self::default()
            }
            Err(source) => {
                return Err(CoreError::FileRead {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if given, else from the default location
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, CoreError> {
        match path.map(Path::to_path_buf).or_else(Self::default_path) {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_toml_str(text: &str, path: &Path) -> Result<Self, CoreError> {
        toml::from_str(text).map_err(|source| CoreError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reject combinations that can't work at runtime
    pub fn validate(&self) -> Result<(), CoreError> {
        match self.source.kind {
            SourceKind::File if self.source.path.is_none() => {
                return Err(CoreError::InvalidConfig {
                    message: "source.kind = \"file\" requires source.path".into(),
                })
            }
            SourceKind::Http if self.source.url.is_none() => {
                return Err(CoreError::InvalidConfig {
                    message: "source.kind = \"http\" requires source.url".into(),
                })
            }
            _ => {}
        }

        if self.source.timeout_secs == 0 {
            return Err(CoreError::InvalidConfig {
                message: "source.timeout_secs must be positive".into(),
            });
        }
        if self.cache.max_age_hours <= 0 {
            return Err(CoreError::InvalidConfig {
                message: "cache.max_age_hours must be positive".into(),
            });
        }
        if self.cache.max_age_hours > CacheConfig::MAX_AGE_HOURS {
            return Err(CoreError::InvalidConfig {
                message: format!(
                    "cache.max_age_hours must be at most {}",
                    CacheConfig::MAX_AGE_HOURS
                ),
            });
        }
        if self.cron.collect_days == 0 {
            return Err(CoreError::InvalidConfig {
                message: "cron.collect_days must be positive".into(),
            });
        }
        if self.default_days == 0 {
            return Err(CoreError::InvalidConfig {
                message: "default_days must be positive".into(),
            });
        }

        Ok(())
    }

    /// `host:port` for the HTTP server
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = DashboardConfig::default();
        assert_eq!(config.default_days, 90);
        assert_eq!(config.source.kind, SourceKind::Demo);
        assert_eq!(config.cache.max_age_hours, 24);
        assert_eq!(config.cron.collect_days, 7);
        assert_eq!(config.bind_address(), "127.0.0.1:3333");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let text = r#"
            default_days = 30

            [source]
            kind = "http"
            url = "http://localhost:9000/daily"
        "#;
        let config = DashboardConfig::from_toml_str(text, Path::new("inline")).unwrap();
        assert_eq!(config.default_days, 30);
        assert_eq!(config.source.kind, SourceKind::Http);
        assert_eq!(config.source.timeout_secs, 30);
        assert_eq!(config.server.port, 3333);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = DashboardConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, DashboardConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[cache]\nbackend = \"memory\"\n[cron]\nsecret = \"s3cret\"\n").unwrap();

        let config = DashboardConfig::load(&path).unwrap();
        assert_eq!(config.cache.backend, CacheBackend::Memory);
        assert_eq!(config.cron.secret.as_deref(), Some("s3cret"));
    }

    #[test]
    fn test_invalid_toml() {
        let err = DashboardConfig::from_toml_str("default_days = \"many\"", Path::new("bad.toml"))
            .unwrap_err();
        assert!(matches!(err, CoreError::ConfigParse { .. }));
    }

    #[test]
    fn test_validate_rejects_incomplete_source() {
        let mut config = DashboardConfig::default();
        config.source.kind = SourceKind::File;
        assert!(matches!(
            config.validate(),
            Err(CoreError::InvalidConfig { .. })
        ));

        config.source.kind = SourceKind::Http;
        assert!(config.validate().is_err());
        config.source.url = Some("http://localhost".into());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let mut config = DashboardConfig::default();
        config.cache.max_age_hours = 0;
        assert!(config.validate().is_err());

        let mut config = DashboardConfig::default();
        config.cron.collect_days = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_huge_max_age_rejected_not_panicking() {
        let text = "[cache]\nbackend = \"memory\"\nmax_age_hours = 9000000000000000\n";
        let config = DashboardConfig::from_toml_str(text, Path::new("inline")).unwrap();
        assert!(matches!(
            config.validate(),
            Err(CoreError::InvalidConfig { .. })
        ));
        assert_eq!(config.cache.max_age(), ChronoDuration::hours(24 * 365));

        let mut config = DashboardConfig::default();
        config.cache.max_age_hours = CacheConfig::MAX_AGE_HOURS;
        assert!(config.validate().is_ok());
    }
}
