//! Centralized configuration management for secfetch

use crate::errors::SecFetchError;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Download root (filings, manifest and index cache live under it)
    pub data_dir: PathBuf,
    /// Maximum number of filings fetched at once
    pub concurrency: usize,
    /// Rate limiting configuration
    pub rate_limits: RateLimits,
    /// HTTP client configuration
    pub http: HttpConfig,
}

/// Rate limiting configuration for EDGAR
#[derive(Debug, Clone)]
pub struct RateLimits {
    /// Minimum spacing between request starts (milliseconds)
    pub request_delay_ms: u64,
    /// Attempts per request before giving up
    pub max_retries: u32,
}

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// User agent string. EDGAR requires a contact name and email.
    pub user_agent: Option<String>,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            request_delay_ms: 100,
            max_retries: 3,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            user_agent: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            concurrency: 6,
            rate_limits: RateLimits::default(),
            http: HttpConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables and defaults
    pub fn from_env() -> Result<Self> {
        let defaults = Config::default();

        let data_dir = std::env::var("SECFETCH_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let rate_limits = RateLimits {
            request_delay_ms: parse_env_var("SECFETCH_REQUEST_DELAY_MS")?
                .unwrap_or(defaults.rate_limits.request_delay_ms),
            max_retries: parse_env_var("SECFETCH_MAX_RETRIES")?
                .unwrap_or(defaults.rate_limits.max_retries),
        };

        let http = HttpConfig {
            timeout_seconds: parse_env_var("SECFETCH_HTTP_TIMEOUT_SECONDS")?
                .unwrap_or(defaults.http.timeout_seconds),
            user_agent: std::env::var("SECFETCH_USER_AGENT")
                .ok()
                .filter(|ua| !ua.trim().is_empty()),
        };

        Ok(Config {
            data_dir,
            concurrency: parse_env_var("SECFETCH_CONCURRENCY")?.unwrap_or(defaults.concurrency),
            rate_limits,
            http,
        })
    }

    /// Get request spacing as Duration
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.rate_limits.request_delay_ms)
    }

    /// Get HTTP timeout as Duration
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_seconds)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 || self.concurrency > Semaphore::MAX_PERMITS {
            return Err(SecFetchError::Config(format!(
                "Concurrency must be between 1 and {}, got {}",
                Semaphore::MAX_PERMITS,
                self.concurrency
            ))
            .into());
        }

        std::fs::create_dir_all(&self.data_dir).with_context(|| {
            format!("Cannot create data directory: {}", self.data_dir.display())
        })?;

        Ok(())
    }
}

/// Helper function to parse environment variable as a specific type
fn parse_env_var<T>(var_name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display + Send + Sync + std::error::Error + 'static,
{
    match std::env::var(var_name) {
        Ok(val) => val.parse().map(Some).with_context(|| {
            format!("Failed to parse environment variable {} = '{}'", var_name, val)
        }),
        Err(_) => Ok(None),
    }
}
