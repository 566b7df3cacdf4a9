//! HTTP client for EDGAR with throttling and retries

use crate::config::Config;
use crate::edgar::source::FilingSource;
use crate::errors::SecFetchError;
use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

/// EDGAR client. Every request carries the configured user agent and
/// request starts are spaced by `request_delay`.
pub struct SecClient {
    client: Client,
    request_delay: Duration,
    max_retries: u32,
    last_request: Mutex<Option<Instant>>,
}

impl SecClient {
    pub fn new(config: &Config) -> Result<Self> {
        let user_agent = config
            .http
            .user_agent
            .as_deref()
            .map(str::trim)
            .filter(|ua| !ua.is_empty())
            .ok_or(SecFetchError::MissingUserAgent)?;

        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(config.http_timeout())
            .build()
            .map_err(SecFetchError::from)?;

        Ok(Self {
            client,
            request_delay: config.request_delay(),
            max_retries: config.rate_limits.max_retries.max(1),
            last_request: Mutex::new(None),
        })
    }

    async fn throttle(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let ready_at = previous + self.request_delay;
            if ready_at > Instant::now() {
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn fetch(&self, url: &str, accept: &str) -> Result<Vec<u8>> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            self.throttle().await;
            debug!("GET {} (attempt {})", url, attempt);

            let response = match self.client.get(url).header("Accept", accept).send().await {
                Ok(resp) => resp,
                Err(e) => {
                    warn!("Request failed for {} (attempt {}): {}", url, attempt, e);
                    if attempt < self.max_retries {
                        tokio::time::sleep(Duration::from_millis(1000 * attempt as u64)).await;
                        continue;
                    }
                    return Err(SecFetchError::Http(e).into());
                }
            };

            let status = response.status();
            if status.is_success() {
                match response.bytes().await {
                    Ok(body) => return Ok(body.to_vec()),
                    Err(e) => {
                        warn!("Failed to read response body from {}: {}", url, e);
                        if attempt < self.max_retries {
                            tokio::time::sleep(Duration::from_millis(1000 * attempt as u64)).await;
                            continue;
                        }
                        return Err(SecFetchError::Http(e).into());
                    }
                }
            }

            let retryable = status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
            if retryable && attempt < self.max_retries {
                if status == StatusCode::TOO_MANY_REQUESTS {
                    // Rate limited - wait longer before retry
                    warn!("Rate limited by EDGAR, waiting before retry...");
                    tokio::time::sleep(Duration::from_secs(5)).await;
                } else {
                    warn!("HTTP {} for {} (attempt {})", status, url, attempt);
                    tokio::time::sleep(Duration::from_millis(1000 * attempt as u64)).await;
                }
                continue;
            }

            return Err(SecFetchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }
            .into());
        }
    }
}

#[async_trait]
impl FilingSource for SecClient {
    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        self.fetch(url, "*/*").await
    }

    async fn get_json(&self, url: &str) -> Result<serde_json::Value> {
        let body = self.fetch(url, "application/json").await?;
        Ok(serde_json::from_slice(&body).map_err(SecFetchError::from)?)
    }
}
