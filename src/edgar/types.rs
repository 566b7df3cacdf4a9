//! EDGAR endpoints and folder listing types

use crate::errors::SecFetchError;
use serde_json::Value;

/// EDGAR endpoints and constants
pub struct EdgarApi;

impl EdgarApi {
    /// Base URL for the EDGAR archives
    pub const ARCHIVES_URL: &'static str = "https://www.sec.gov/Archives/edgar";
    /// Strategy tag recorded for filings found through the quarterly master index
    pub const INDEX_STRATEGY: &'static str = "index";
}

/// Quarterly master index: `.../full-index/<year>/QTR<q>/master.idx`
pub fn master_index_url(year: i32, quarter: u32) -> String {
    format!(
        "{}/full-index/{}/QTR{}/master.idx",
        EdgarApi::ARCHIVES_URL,
        year,
        quarter
    )
}

/// Folder holding one filing's files. EDGAR uses the unpadded CIK and the
/// accession number without dashes.
pub fn filing_folder_url(cik: &str, accession: &str) -> String {
    let trimmed = cik.trim_start_matches('0');
    let cik_num = if trimmed.is_empty() { "0" } else { trimmed };
    format!(
        "{}/data/{}/{}/",
        EdgarApi::ARCHIVES_URL,
        cik_num,
        accession.replace('-', "")
    )
}

/// JSON listing of a filing folder
pub fn filing_index_json_url(cik: &str, accession: &str) -> String {
    format!("{}index.json", filing_folder_url(cik, accession))
}

/// One file available in a filing folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedFile {
    pub name: String,
    pub href: String,
}

/// Parse a folder `index.json` response into downloadable files.
///
/// Items that are not objects, lack a name, or whose name would escape the
/// folder are ignored.
pub fn extract_listing_files(
    payload: &Value,
    base_folder_url: &str,
) -> Result<Vec<ListedFile>, SecFetchError> {
    let object = payload.as_object().ok_or_else(|| {
        SecFetchError::InvalidListing("index.json payload was not an object".into())
    })?;

    let directory = object
        .get("directory")
        .and_then(Value::as_object)
        .ok_or_else(|| {
            SecFetchError::InvalidListing("index.json missing 'directory' object".into())
        })?;

    let items = directory
        .get("item")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            SecFetchError::InvalidListing("index.json missing 'directory.item' array".into())
        })?;

    Ok(items
        .iter()
        .filter_map(|item| item.get("name").and_then(Value::as_str))
        .filter(|name| is_plain_file_name(name))
        .map(|name| ListedFile {
            name: name.to_string(),
            href: format!("{}{}", base_folder_url, name),
        })
        .collect())
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}
