//! Index-driven filing downloader
//!
//! For each quarter: fetch the master index, keep rows for the requested
//! forms, then download every matching filing under one shared concurrency
//! limit. A filing is staged in `<accession>.tmp` and renamed into place only
//! once all of its selected files are written, so a filing directory is
//! either absent or complete. The manifest is saved once per quarter, after
//! every row has finished.

use crate::downloader::filter::{filter_master_rows, FilingFilter};
use crate::downloader::progress::{ProgressObserver, ProgressTracker};
use crate::downloader::{matches_file_type, normalize_file_types, DownloadOptions};
use crate::edgar::{
    download_master_index, extract_listing_files, filing_folder_url, filing_index_json_url,
    load_accepted_form_types, load_master_index, validate_forms, EdgarApi, FilingSource,
};
use crate::errors::SecFetchError;
use crate::models::{DownloadResult, IndexRow, Outcome};
use crate::storage::layout::{
    default_manifest_path, filing_dir, filings_dir_for_quarter, pad_cik, staging_dir,
};
use crate::storage::{Manifest, ManifestEntry};
use anyhow::{Context, Result};
use futures::future::join_all;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::fs;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

pub struct FilingDownloader {
    data_dir: PathBuf,
    forms: Vec<String>,
    file_types: Vec<String>,
    include_amended: bool,
    concurrency: usize,
    source: Arc<dyn FilingSource>,
    manifest: Mutex<Manifest>,
    observer: Option<Arc<dyn ProgressObserver>>,
}

impl FilingDownloader {
    /// Validate options and load the manifest. Configuration problems and a
    /// corrupt manifest are reported here, before any network access.
    pub fn new(options: &DownloadOptions, source: Arc<dyn FilingSource>) -> Result<Self> {
        let data_dir = options.config.data_dir.clone();
        let file_types = normalize_file_types(&options.file_types)?;

        let accepted = load_accepted_form_types(&data_dir)?;
        let forms = validate_forms(&options.forms, &accepted)?;

        let concurrency = match options.config.concurrency {
            0 => {
                warn!("Concurrency 0 requested, using 1");
                1
            }
            n if n > Semaphore::MAX_PERMITS => {
                warn!(
                    "Concurrency {} exceeds the permit limit, using {}",
                    n,
                    Semaphore::MAX_PERMITS
                );
                Semaphore::MAX_PERMITS
            }
            n => n,
        };

        let manifest_path = options
            .manifest_path
            .clone()
            .unwrap_or_else(|| default_manifest_path(&data_dir));
        let manifest = Manifest::open(manifest_path)?;

        debug!(
            "Downloader ready: forms={:?} file_types={:?} concurrency={} manifest_entries={}",
            forms,
            file_types,
            concurrency,
            manifest.len()
        );

        Ok(Self {
            data_dir,
            forms,
            file_types,
            include_amended: options.include_amended,
            concurrency,
            source,
            manifest: Mutex::new(manifest),
            observer: None,
        })
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn forms(&self) -> &[String] {
        &self.forms
    }

    pub fn file_types(&self) -> &[String] {
        &self.file_types
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn manifest(&self) -> MutexGuard<'_, Manifest> {
        self.manifest.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Download all matching filings for one quarter.
    ///
    /// Row failures are reported in the returned results. Errors are returned
    /// only for an invalid quarter, a failed redownload reset, an unavailable
    /// master index or a failed manifest save.
    pub async fn download_quarter(
        &self,
        year: i32,
        quarter: u32,
        redownload: bool,
    ) -> Result<Vec<DownloadResult>> {
        if !(1..=4).contains(&quarter) {
            return Err(SecFetchError::InvalidQuarter(quarter).into());
        }

        if redownload {
            self.reset_quarter(year, quarter).await?;
        }

        // The index is always fetched: it decides which filings exist, the
        // manifest only decides which are already complete.
        let index_path = self
            .fetch_index(year, quarter)
            .await
            .map_err(|e| SecFetchError::IndexUnavailable {
                year,
                quarter,
                reason: format!("{:#}", e),
            })?;
        let rows = load_master_index(&index_path)
            .await
            .map_err(|e| SecFetchError::IndexUnavailable {
                year,
                quarter,
                reason: format!("{:#}", e),
            })?;

        let filter = FilingFilter::new(self.forms.iter().cloned(), self.include_amended);
        let matched = filter_master_rows(rows, &filter);
        let total = matched.len();
        info!(
            "{} QTR{}: {} filings match forms {:?}",
            year, quarter, total, self.forms
        );

        let progress = ProgressTracker::new(total, self.observer.as_deref());
        progress.start();

        let semaphore = Semaphore::new(self.concurrency);
        let jobs = matched
            .iter()
            .map(|row| self.run_row(row, year, quarter, &semaphore, &progress));
        let results = join_all(jobs).await;

        self.save_manifest()
            .await
            .context("Failed to save manifest")?;

        let downloaded = results
            .iter()
            .filter(|r| matches!(r.outcome, Outcome::Downloaded { .. }))
            .count();
        let skipped = results
            .iter()
            .filter(|r| matches!(r.outcome, Outcome::Skipped))
            .count();
        let failed = results.iter().filter(|r| r.is_error()).count();
        info!(
            "{} QTR{} finished: {} downloaded, {} skipped, {} failed",
            year, quarter, downloaded, skipped, failed
        );

        if failed == 0 {
            self.remove_index_cache(&index_path).await;
        } else {
            info!(
                "Keeping cached master index {} for retry",
                index_path.display()
            );
        }

        Ok(results)
    }

    /// Run several quarters of one year in the given order.
    ///
    /// A quarter whose master index cannot be fetched is logged and skipped;
    /// any other error stops the batch.
    pub async fn download_year(
        &self,
        year: i32,
        quarters: &[u32],
        redownload: bool,
    ) -> Result<Vec<DownloadResult>> {
        if let Some(&bad) = quarters.iter().find(|q| !(1..=4).contains(*q)) {
            return Err(SecFetchError::InvalidQuarter(bad).into());
        }

        let mut all = Vec::new();
        for &quarter in quarters {
            match self.download_quarter(year, quarter, redownload).await {
                Ok(results) => all.extend(results),
                Err(e) => match e.downcast_ref::<SecFetchError>() {
                    Some(SecFetchError::IndexUnavailable { .. }) => {
                        error!("Skipping {} QTR{}: {:#}", year, quarter, e);
                    }
                    _ => return Err(e),
                },
            }
        }
        Ok(all)
    }

    /// Persist a snapshot of the manifest off the async worker threads.
    async fn save_manifest(&self) -> Result<()> {
        let snapshot = self.manifest().clone();
        tokio::task::spawn_blocking(move || snapshot.save_atomic())
            .await
            .context("Manifest save task panicked")?
    }

    async fn fetch_index(&self, year: i32, quarter: u32) -> Result<PathBuf> {
        download_master_index(self.source.as_ref(), &self.data_dir, year, quarter).await
    }

    /// Forget a quarter: drop its manifest entries, persist, then delete its
    /// filings directory.
    async fn reset_quarter(&self, year: i32, quarter: u32) -> Result<()> {
        let removed = self.manifest().remove_entries_for(year, quarter);
        self.save_manifest()
            .await
            .context("Failed to save manifest during redownload reset")?;

        let quarter_dir = filings_dir_for_quarter(&self.data_dir, year, quarter);
        remove_dir_if_exists(&quarter_dir).await.with_context(|| {
            format!("Failed to remove {} for redownload", quarter_dir.display())
        })?;

        info!(
            "Redownload {} QTR{}: removed {} manifest entries and {}",
            year,
            quarter,
            removed,
            quarter_dir.display()
        );
        Ok(())
    }

    async fn remove_index_cache(&self, index_path: &Path) {
        let Some(dir) = index_path.parent() else {
            return;
        };
        match remove_dir_if_exists(dir).await {
            Ok(()) => debug!("Removed cached master index {}", dir.display()),
            Err(e) => warn!("Could not remove cached master index {}: {}", dir.display(), e),
        }
    }

    async fn run_row(
        &self,
        row: &IndexRow,
        year: i32,
        quarter: u32,
        semaphore: &Semaphore,
        progress: &ProgressTracker<'_>,
    ) -> DownloadResult {
        let permit = semaphore.acquire().await;
        progress.admitted();

        let result = match &permit {
            Ok(_) => self.download_one(row, year, quarter).await,
            Err(e) => DownloadResult::new(
                row,
                Outcome::Failed {
                    reason: e.to_string(),
                },
            ),
        };

        progress.finished(&result);
        drop(permit);
        result
    }

    async fn download_one(&self, row: &IndexRow, year: i32, quarter: u32) -> DownloadResult {
        let already_done = self.manifest().has(&row.accession);
        if already_done {
            debug!("Skipping {}: already in manifest", row.accession);
            return DownloadResult::new(row, Outcome::Skipped);
        }

        let out_dir = filing_dir(
            &self.data_dir,
            year,
            quarter,
            &row.form_type,
            &row.cik,
            &row.accession,
        );
        let tmp_dir = staging_dir(&out_dir);

        match self.fetch_and_commit(row, &out_dir, &tmp_dir).await {
            Ok(file_count) => {
                self.manifest().upsert(ManifestEntry {
                    accession: row.accession.clone(),
                    cik: pad_cik(&row.cik),
                    date_filed: row.date_filed.format("%Y-%m-%d").to_string(),
                    form_type: row.form_type.clone(),
                    quarter: Some(quarter),
                    strategy: EdgarApi::INDEX_STRATEGY.to_string(),
                    year: Some(year),
                });
                debug!(
                    "✓ {} {} ({} files) -> {}",
                    row.form_type,
                    row.accession,
                    file_count,
                    out_dir.display()
                );
                DownloadResult::new(row, Outcome::Downloaded { output_dir: out_dir })
            }
            Err(e) => {
                if let Err(cleanup) = remove_dir_if_exists(&tmp_dir).await {
                    warn!("Could not remove {}: {}", tmp_dir.display(), cleanup);
                }
                warn!("✗ Failed to download {}: {:#}", row.accession, e);
                DownloadResult::new(
                    row,
                    Outcome::Failed {
                        reason: format!("{:#}", e),
                    },
                )
            }
        }
    }

    /// Stage the selected files of one filing and rename them into place.
    /// Returns the number of files written.
    async fn fetch_and_commit(
        &self,
        row: &IndexRow,
        out_dir: &Path,
        tmp_dir: &Path,
    ) -> Result<usize> {
        remove_dir_if_exists(tmp_dir).await?;
        fs::create_dir_all(tmp_dir).await?;

        let listing_url = filing_index_json_url(&row.cik, &row.accession);
        let listing = self
            .source
            .get_json(&listing_url)
            .await
            .with_context(|| format!("Failed to fetch listing {}", listing_url))?;
        let files = extract_listing_files(&listing, &filing_folder_url(&row.cik, &row.accession))?;

        let selected: Vec<_> = files
            .into_iter()
            .filter(|f| matches_file_type(&f.name, &self.file_types))
            .collect();
        if selected.is_empty() {
            return Err(SecFetchError::NoFilesMatched {
                accession: row.accession.clone(),
                file_types: self.file_types.clone(),
            }
            .into());
        }

        for file in &selected {
            let content = self
                .source
                .get_bytes(&file.href)
                .await
                .with_context(|| format!("Failed to fetch {}", file.href))?;
            fs::write(tmp_dir.join(&file.name), content).await?;
        }

        if let Some(parent) = out_dir.parent() {
            fs::create_dir_all(parent).await?;
        }
        remove_dir_if_exists(out_dir).await?;
        fs::rename(tmp_dir, out_dir).await?;

        Ok(selected.len())
    }
}

async fn remove_dir_if_exists(path: &Path) -> std::io::Result<()> {
    match fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
