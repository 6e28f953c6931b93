//! Trusted clocks used to decide whether a license has expired.
//!
//! A [`TimeSource`] answers exactly one question: has this instant passed?
//! The reference implementation, [`HttpTimeSource`], reads the `Date` header
//! of an HTTPS response from a well-known host. The host is only used as a
//! clock; the response body is ignored.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use reqwest::header::DATE;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Host consulted by the default time source.
pub const DEFAULT_TIME_URL: &str = "https://www.google.com";

/// Errors raised by a time source.
#[derive(Debug, Error)]
pub enum TimeSourceError {
    /// The clock endpoint could not be reached.
    #[error("network error: {0}")]
    Network(String),

    /// The response carried no `Date` header.
    #[error("response has no Date header")]
    MissingDateHeader,

    /// The `Date` header could not be parsed.
    #[error("invalid date: {0}")]
    InvalidDate(String),

    /// The time source could not be set up or is otherwise unusable.
    #[error("time source unavailable: {0}")]
    Unavailable(String),
}

/// Something that can tell if a given instant has passed yet.
#[async_trait]
pub trait TimeSource: Send + Sync {
    /// Returns true if trusted now is strictly after `instant` (seconds since
    /// the Unix epoch).
    async fn has_passed(&self, instant: i64) -> Result<bool, TimeSourceError>;
}

#[async_trait]
impl<T: TimeSource + ?Sized> TimeSource for Arc<T> {
    async fn has_passed(&self, instant: i64) -> Result<bool, TimeSourceError> {
        (**self).has_passed(instant).await
    }
}

// ── HTTP Date header ─────────────────────────────────────────────

/// Configuration for [`HttpTimeSource`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpTimeSourceConfig {
    /// URL whose response `Date` header is trusted.
    pub url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for HttpTimeSourceConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_TIME_URL.to_string(),
            timeout_secs: 10,
        }
    }
}

/// Uses the `Date` header returned by an HTTP request as the current time.
#[derive(Debug, Clone)]
pub struct HttpTimeSource {
    config: HttpTimeSourceConfig,
    client: Client,
}

impl HttpTimeSource {
    /// Creates a time source with the given configuration.
    pub fn new(config: HttpTimeSourceConfig) -> Result<Self, TimeSourceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TimeSourceError::Unavailable(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    /// Creates a time source trusting `url`.
    pub fn with_url(url: impl Into<String>) -> Result<Self, TimeSourceError> {
        Self::new(HttpTimeSourceConfig {
            url: url.into(),
            ..Default::default()
        })
    }

    /// Creates a time source trusting [`DEFAULT_TIME_URL`].
    pub fn default_source() -> Result<Self, TimeSourceError> {
        Self::new(HttpTimeSourceConfig::default())
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &HttpTimeSourceConfig {
        &self.config
    }

    /// Fetches the current time from the configured endpoint.
    pub async fn now(&self) -> Result<DateTime<Utc>, TimeSourceError> {
        let response = self
            .client
            .get(&self.config.url)
            .send()
            .await
            .map_err(|e| TimeSourceError::Network(e.to_string()))?;

        let header = response
            .headers()
            .get(DATE)
            .ok_or(TimeSourceError::MissingDateHeader)?;
        let text = header
            .to_str()
            .map_err(|e| TimeSourceError::InvalidDate(e.to_string()))?;
        let parsed = DateTime::parse_from_rfc2822(text)
            .map_err(|e| TimeSourceError::InvalidDate(format!("{text:?}: {e}")))?;

        debug!(url = %self.config.url, date = text, "fetched trusted time");
        Ok(parsed.with_timezone(&Utc))
    }
}

#[async_trait]
impl TimeSource for HttpTimeSource {
    async fn has_passed(&self, instant: i64) -> Result<bool, TimeSourceError> {
        Ok(self.now().await?.timestamp() > instant)
    }
}

// ── Local and fixed clocks ───────────────────────────────────────

/// The local system clock. Not trustworthy against a user who can set it.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

#[async_trait]
impl TimeSource for SystemTimeSource {
    async fn has_passed(&self, instant: i64) -> Result<bool, TimeSourceError> {
        Ok(Utc::now().timestamp() > instant)
    }
}

/// A clock stopped at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedTimeSource {
    now: i64,
}

impl FixedTimeSource {
    /// Creates a clock reading `now` (seconds since the Unix epoch).
    #[must_use]
    pub const fn new(now: i64) -> Self {
        Self { now }
    }

    /// Creates a clock reading `now`.
    #[must_use]
    pub fn at(now: DateTime<Utc>) -> Self {
        Self::new(now.timestamp())
    }

    /// Returns the instant the clock reads.
    #[must_use]
    pub const fn now(&self) -> i64 {
        self.now
    }
}

#[async_trait]
impl TimeSource for FixedTimeSource {
    async fn has_passed(&self, instant: i64) -> Result<bool, TimeSourceError> {
        Ok(self.now > instant)
    }
}
