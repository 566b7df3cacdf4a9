use anyhow::Result;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::Config;
use crate::edgar::SecClient;
use crate::errors::SecFetchError;
use crate::models::DownloadResult;
use crate::storage::layout::{default_manifest_path, filings_dir_for_quarter};
use crate::storage::Manifest;

pub mod engine;
pub mod filter;
pub mod progress;

pub use engine::FilingDownloader;
pub use filter::{filter_master_rows, FilingFilter};
pub use progress::ProgressObserver;

pub const DEFAULT_FILE_TYPES: &[&str] = &[".htm", ".html", ".xml", ".xbrl", ".pdf"];
pub const DEFAULT_QUARTERS: &[u32] = &[1, 2, 3, 4];

/// Everything a download run needs besides the period.
///
/// Data directory, concurrency, user agent and HTTP settings come from `config`.
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    pub config: Config,
    pub forms: Vec<String>,
    pub file_types: Vec<String>,
    pub include_amended: bool,
    /// Defaults to `<data_dir>/_state/manifest.json`
    pub manifest_path: Option<PathBuf>,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            config: Config::default(),
            forms: vec!["10-Q".to_string()],
            file_types: DEFAULT_FILE_TYPES.iter().map(|s| s.to_string()).collect(),
            include_amended: false,
            manifest_path: None,
        }
    }
}

/// Download one quarter from EDGAR
pub async fn download_quarter(
    options: &DownloadOptions,
    year: i32,
    quarter: u32,
    redownload: bool,
    observer: Option<Arc<dyn ProgressObserver>>,
) -> Result<Vec<DownloadResult>> {
    let downloader = build_downloader(options, observer)?;
    downloader.download_quarter(year, quarter, redownload).await
}

/// Download several quarters of one year from EDGAR, in the order given
pub async fn download_year(
    options: &DownloadOptions,
    year: i32,
    quarters: &[u32],
    redownload: bool,
    observer: Option<Arc<dyn ProgressObserver>>,
) -> Result<Vec<DownloadResult>> {
    let downloader = build_downloader(options, observer)?;
    downloader.download_year(year, quarters, redownload).await
}

fn build_downloader(
    options: &DownloadOptions,
    observer: Option<Arc<dyn ProgressObserver>>,
) -> Result<FilingDownloader> {
    let client = SecClient::new(&options.config)?;
    let downloader = FilingDownloader::new(options, Arc::new(client))?;
    Ok(match observer {
        Some(observer) => downloader.with_observer(observer),
        None => downloader,
    })
}

/// True if the manifest has entries for the quarter or its filings
/// directory is non-empty.
pub fn has_existing_data_for_quarter(
    data_dir: &Path,
    year: i32,
    quarter: u32,
    manifest_path: Option<&Path>,
) -> Result<bool> {
    let path = manifest_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_manifest_path(data_dir));
    if path.exists() && Manifest::open(path)?.has_entries_for(year, quarter) {
        return Ok(true);
    }

    let quarter_dir = filings_dir_for_quarter(data_dir, year, quarter);
    Ok(match std::fs::read_dir(&quarter_dir) {
        Ok(mut entries) => entries.next().is_some(),
        Err(_) => false,
    })
}

/// Lowercase, ensure a leading dot, drop blanks and duplicates.
pub fn normalize_file_types(file_types: &[String]) -> Result<Vec<String>, SecFetchError> {
    let normalized: BTreeSet<String> = file_types
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .map(|t| if t.starts_with('.') { t } else { format!(".{}", t) })
        .collect();

    if normalized.is_empty() {
        return Err(SecFetchError::EmptyFileTypes);
    }
    Ok(normalized.into_iter().collect())
}

/// Whether a listed file name ends with one of the normalized suffixes
pub fn matches_file_type(name: &str, file_types: &[String]) -> bool {
    let name = name.to_lowercase();
    file_types.iter().any(|ext| name.ends_with(ext.as_str()))
}
