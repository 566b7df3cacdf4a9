//! Quarterly master index: download, cache and parse
//!
//! The file is a header followed by a dashed separator line, then one
//! `CIK|Company Name|Form Type|Date Filed|Filename` record per line.

use crate::edgar::source::FilingSource;
use crate::edgar::types::master_index_url;
use crate::errors::SecFetchError;
use crate::models::IndexRow;
use crate::storage::layout::{index_dir_for_quarter, pad_cik};
use anyhow::Result;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

const MASTER_INDEX_FILE: &str = "master.idx";

/// Return the local path of a quarter's master index, fetching it unless a
/// non-empty cached copy already exists.
pub async fn download_master_index(
    source: &dyn FilingSource,
    data_dir: &Path,
    year: i32,
    quarter: u32,
) -> Result<PathBuf> {
    let dir = index_dir_for_quarter(data_dir, year, quarter);
    let path = dir.join(MASTER_INDEX_FILE);

    if let Ok(meta) = fs::metadata(&path).await {
        if meta.is_file() && meta.len() > 0 {
            debug!("Reusing cached master index {}", path.display());
            return Ok(path);
        }
    }

    let url = master_index_url(year, quarter);
    info!("Fetching master index for {} QTR{} from {}", year, quarter, url);
    let content = source.get_bytes(&url).await?;

    fs::create_dir_all(&dir).await.map_err(SecFetchError::from)?;
    let tmp_path = dir.join(format!("{}.tmp", MASTER_INDEX_FILE));
    fs::write(&tmp_path, &content).await.map_err(SecFetchError::from)?;
    fs::rename(&tmp_path, &path).await.map_err(SecFetchError::from)?;

    Ok(path)
}

/// Read and parse a master index file
pub async fn load_master_index(path: &Path) -> Result<Vec<IndexRow>> {
    let raw = fs::read(path).await.map_err(SecFetchError::from)?;
    Ok(parse_master_index(&String::from_utf8_lossy(&raw)))
}

/// Parse master index text into rows, preserving file order
pub fn parse_master_index(text: &str) -> Vec<IndexRow> {
    let mut lines = text.lines();

    // Records start after the separator below the column header. Without a
    // header the whole text is treated as records.
    let has_header = text.lines().any(is_separator);
    if has_header {
        for line in lines.by_ref() {
            if is_separator(line) {
                break;
            }
        }
    }

    let mut rows = Vec::new();
    for (line_no, line) in lines.enumerate() {
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        match parse_row(line) {
            Some(row) => rows.push(row),
            None => warn!("Skipping malformed master index line {}: {}", line_no + 1, line),
        }
    }
    rows
}

fn is_separator(line: &str) -> bool {
    let line = line.trim();
    line.len() >= 3 && line.chars().all(|c| c == '-')
}

fn parse_row(line: &str) -> Option<IndexRow> {
    let fields: Vec<&str> = line.split('|').map(str::trim).collect();
    let [cik, company_name, form_type, date_filed, filename] = fields.as_slice() else {
        return None;
    };

    if cik.is_empty() || !cik.chars().all(|c| c.is_ascii_digit()) || form_type.is_empty() {
        return None;
    }
    let date_filed = NaiveDate::parse_from_str(date_filed, "%Y-%m-%d").ok()?;
    let accession = accession_from_filename(filename)?;

    Some(IndexRow {
        cik: pad_cik(cik),
        company_name: company_name.to_string(),
        form_type: form_type.to_string(),
        date_filed,
        accession,
    })
}

/// `edgar/data/1000045/0001000045-24-000001.txt` -> `0001000045-24-000001`
fn accession_from_filename(filename: &str) -> Option<String> {
    let last = filename.rsplit('/').next()?;
    let stem = last.strip_suffix(".txt").unwrap_or(last);
    if stem.is_empty() {
        None
    } else {
        Some(stem.to_string())
    }
}
