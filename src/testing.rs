//! Test doubles shared by unit tests

use crate::edgar::source::FilingSource;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Serves canned responses keyed by URL and records every request.
#[derive(Default)]
pub struct FakeSource {
    bytes: HashMap<String, Vec<u8>>,
    json: HashMap<String, serde_json::Value>,
    latency: Option<Duration>,
    requests: Mutex<Vec<String>>,
    active: AtomicUsize,
    peak_active: AtomicUsize,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bytes(mut self, url: &str, body: &[u8]) -> Self {
        self.bytes.insert(url.to_string(), body.to_vec());
        self
    }

    pub fn with_json(mut self, url: &str, body: serde_json::Value) -> Self {
        self.json.insert(url.to_string(), body);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_matching(&self, needle: &str) -> usize {
        self.requests().iter().filter(|url| url.contains(needle)).count()
    }

    /// Highest number of requests that were in progress at the same time
    pub fn peak_concurrency(&self) -> usize {
        self.peak_active.load(Ordering::SeqCst)
    }

    async fn enter(&self, url: &str) {
        self.requests.lock().unwrap().push(url.to_string());
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_active.fetch_max(now, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl FilingSource for FakeSource {
    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        self.enter(url).await;
        self.bytes
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("404 Not Found: {}", url))
    }

    async fn get_json(&self, url: &str) -> Result<serde_json::Value> {
        self.enter(url).await;
        self.json
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("404 Not Found: {}", url))
    }
}

/// Build master index text with one record per `(cik, form, date, accession)`
pub fn master_index_text(rows: &[(&str, &str, &str, &str)]) -> String {
    let mut lines = vec![
        "Description:           Master Index of EDGAR Dissemination Feed".to_string(),
        "Last Data Received:    2024-01-02".to_string(),
        String::new(),
        "CIK|Company Name|Form Type|Date Filed|Filename".to_string(),
        "--------------------------------------------------------------------------------"
            .to_string(),
    ];
    for (cik, form_type, date_filed, accession) in rows {
        lines.push(format!(
            "{}|TEST CORP|{}|{}|edgar/data/{}/{}/{}.txt",
            cik,
            form_type,
            date_filed,
            cik,
            accession.replace('-', ""),
            accession
        ));
    }
    lines.push(String::new());
    lines.join("\n")
}
