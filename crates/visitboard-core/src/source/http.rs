//! Day-level records from an HTTP endpoint
//!
//! `GET {url}?days=N` returning the same JSON payload the file source reads.

use std::time::Duration;

use super::parse_payload;
use crate::error::CoreError;
use crate::models::RawDailyRecord;

#[derive(Debug, Clone)]
pub struct HttpSource {
    url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, CoreError> {
        let url = url.into();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("visitboard/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| CoreError::Http {
                url: url.clone(),
                source,
            })?;

        Ok(Self {
            url,
            client,
            timeout,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn fetch_raw(&self, days: u32) -> Result<Vec<RawDailyRecord>, CoreError> {
        tracing::debug!(url = %self.url, days, "Fetching day-level records");

        let response = self
            .client
            .get(&self.url)
            .query(&[("days", days)])
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CoreError::SourceUnavailable {
                kind: "http",
                message: format!("{} returned {}", self.url, status),
            });
        }

        let text = response.text().await.map_err(|e| self.map_error(e))?;

        parse_payload(&text, &self.url)
    }

    fn map_error(&self, source: reqwest::Error) -> CoreError {
        if source.is_timeout() {
            CoreError::Timeout {
                operation: format!("GET {}", self.url),
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            CoreError::Http {
                url: self.url.clone(),
                source,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_host_is_upstream_error() {
        // Port 9 (discard) on localhost is closed in test environments
        let source = HttpSource::new("http://127.0.0.1:9/daily", Duration::from_secs(2)).unwrap();
        let err = source.fetch_raw(7).await.unwrap_err();
        assert!(err.is_upstream(), "unexpected error: {}", err);
    }
}
