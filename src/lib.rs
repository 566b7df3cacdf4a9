//! secfetch: index-driven, resumable downloads of SEC EDGAR filings
//!
//! For a year/quarter and a set of form types, secfetch reads the EDGAR
//! master index, downloads the requested file types of every matching
//! filing under `<data_dir>/filings/`, and records completed filings in
//! `<data_dir>/_state/manifest.json` so later runs resume where they stopped.

pub mod config;
pub mod downloader;
pub mod edgar;
pub mod errors;
pub mod models;
pub mod storage;

#[cfg(test)]
pub(crate) mod testing;

pub use downloader::{
    download_quarter, download_year, has_existing_data_for_quarter, DownloadOptions,
    FilingDownloader, ProgressObserver,
};
pub use errors::SecFetchError;
pub use models::{DownloadResult, IndexRow, Outcome};
