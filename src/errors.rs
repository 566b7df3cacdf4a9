//! Error types for secfetch

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SecFetchError {
    #[error("file_types must be non-empty (e.g. ['.xml', '.htm', '.html'])")]
    EmptyFileTypes,

    #[error("No form types requested")]
    NoForms,

    #[error(
        "Unknown form type(s): {}. Add them to config/form_types.json to allow them",
        .0.join(", ")
    )]
    UnknownForms(Vec<String>),

    #[error("Quarter must be between 1 and 4, got {0}")]
    InvalidQuarter(u32),

    #[error(
        "SEC user agent not configured. Pass --user-agent or set SECFETCH_USER_AGENT \
         (e.g. \"Jane Doe jane@example.com\")"
    )]
    MissingUserAgent,

    #[error("Manifest {} is corrupt or unreadable: {source}", path.display())]
    CorruptManifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Form catalog {} is invalid: {source}", path.display())]
    InvalidFormCatalog {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Master index for {year} QTR{quarter} unavailable: {reason}")]
    IndexUnavailable {
        year: i32,
        quarter: u32,
        reason: String,
    },

    #[error("No files matched file_types={file_types:?} for accession {accession}")]
    NoFilesMatched {
        accession: String,
        file_types: Vec<String>,
    },

    #[error("Malformed filing listing: {0}")]
    InvalidListing(String),

    #[error("Request to {url} failed with HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}
