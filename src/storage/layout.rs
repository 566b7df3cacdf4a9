//! On-disk layout of the download root
//!
//! ```text
//! <root>/filings/<year>/QTR<q>/<form>/<cik10>/<accession>/<files...>
//! <root>/_state/manifest.json
//! <root>/index/master/<year>/QTR<q>/master.idx
//! ```

use std::path::{Path, PathBuf};

/// Convert a form type into a directory name, e.g. "10-Q/A" -> "10-Q_A"
pub fn form_dir_name(form_type: &str) -> String {
    form_type
        .trim()
        .replace('/', "_")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

/// Left-pad a CIK with zeros to 10 digits
pub fn pad_cik(cik: &str) -> String {
    format!("{:0>10}", cik.trim())
}

pub fn filings_root(data_dir: &Path) -> PathBuf {
    data_dir.join("filings")
}

/// All filings of a quarter: `<root>/filings/<year>/QTR<q>`
pub fn filings_dir_for_quarter(data_dir: &Path, year: i32, quarter: u32) -> PathBuf {
    filings_root(data_dir)
        .join(year.to_string())
        .join(format!("QTR{}", quarter))
}

/// One filing: `<root>/filings/<year>/QTR<q>/<form>/<cik10>/<accession>`
pub fn filing_dir(
    data_dir: &Path,
    year: i32,
    quarter: u32,
    form_type: &str,
    cik: &str,
    accession: &str,
) -> PathBuf {
    filings_dir_for_quarter(data_dir, year, quarter)
        .join(form_dir_name(form_type))
        .join(pad_cik(cik))
        .join(accession)
}

/// Staging directory a filing is written into before commit
pub fn staging_dir(filing_dir: &Path) -> PathBuf {
    let mut name = filing_dir
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    filing_dir.with_file_name(name)
}

/// Cached master index for a quarter: `<root>/index/master/<year>/QTR<q>`
pub fn index_dir_for_quarter(data_dir: &Path, year: i32, quarter: u32) -> PathBuf {
    data_dir
        .join("index")
        .join("master")
        .join(year.to_string())
        .join(format!("QTR{}", quarter))
}

pub fn default_manifest_path(data_dir: &Path) -> PathBuf {
    data_dir.join("_state").join("manifest.json")
}
