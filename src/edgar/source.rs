//! Network seam used by the download engine

use anyhow::Result;
use async_trait::async_trait;

/// Something that can fetch EDGAR resources by URL.
///
/// Implementations apply their own identification headers and retry policy;
/// any error returned is final for that call.
#[async_trait]
pub trait FilingSource: Send + Sync {
    /// Fetch raw bytes
    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>>;

    /// Fetch and decode a JSON document
    async fn get_json(&self, url: &str) -> Result<serde_json::Value>;
}
