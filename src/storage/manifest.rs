//! Persistent ledger of completed downloads, keyed by accession number
//!
//! An accession present here means its filing directory was committed in full.

use crate::errors::SecFetchError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

fn default_strategy() -> String {
    "index".to_string()
}

/// One completed download. Fields are declared in key order so the
/// written JSON is sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    #[serde(default)]
    pub accession: String,
    pub cik: String,
    pub date_filed: String,
    pub form_type: String,
    #[serde(default)]
    pub quarter: Option<u32>,
    #[serde(default = "default_strategy")]
    pub strategy: String,
    #[serde(default)]
    pub year: Option<i32>,
}

impl ManifestEntry {
    fn belongs_to(&self, year: i32, quarter: u32) -> bool {
        self.year == Some(year) && self.quarter == Some(quarter)
    }
}

#[derive(Debug, Clone)]
pub struct Manifest {
    path: PathBuf,
    entries: BTreeMap<String, ManifestEntry>,
}

impl Manifest {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Open and load the manifest at `path`
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let mut manifest = Self::new(path);
        manifest.load()?;
        Ok(manifest)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load persisted state. A missing file is an empty manifest; a corrupt one is an error.
    pub fn load(&mut self) -> Result<()> {
        if !self.path.exists() {
            self.entries.clear();
            return Ok(());
        }

        let raw = fs::read(&self.path).map_err(SecFetchError::from)?;
        let parsed: BTreeMap<String, ManifestEntry> =
            serde_json::from_slice(&raw).map_err(|source| SecFetchError::CorruptManifest {
                path: self.path.clone(),
                source,
            })?;

        self.entries = parsed
            .into_iter()
            .map(|(accession, mut entry)| {
                entry.accession = accession.clone();
                (accession, entry)
            })
            .collect();

        debug!(
            "Loaded {} manifest entries from {}",
            self.entries.len(),
            self.path.display()
        );
        Ok(())
    }

    pub fn has(&self, accession: &str) -> bool {
        self.entries.contains_key(accession)
    }

    pub fn get(&self, accession: &str) -> Option<&ManifestEntry> {
        self.entries.get(accession)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn upsert(&mut self, entry: ManifestEntry) {
        self.entries.insert(entry.accession.clone(), entry);
    }

    /// Remove all entries recorded for a year/quarter. Returns the number removed.
    pub fn remove_entries_for(&mut self, year: i32, quarter: u32) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.belongs_to(year, quarter));
        before - self.entries.len()
    }

    pub fn has_entries_for(&self, year: i32, quarter: u32) -> bool {
        self.entries.values().any(|entry| entry.belongs_to(year, quarter))
    }

    /// Write to `<path>.tmp` in the same directory, then rename over the live file.
    pub fn save_atomic(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(SecFetchError::from)?;
        }

        let mut tmp_name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        tmp_name.push(".tmp");
        let tmp_path = self.path.with_file_name(tmp_name);

        let content = serde_json::to_vec_pretty(&self.entries).map_err(SecFetchError::from)?;
        {
            let mut file = fs::File::create(&tmp_path).map_err(SecFetchError::from)?;
            file.write_all(&content).map_err(SecFetchError::from)?;
            file.sync_all().map_err(SecFetchError::from)?;
        }
        fs::rename(&tmp_path, &self.path).map_err(SecFetchError::from)?;

        debug!(
            "Saved {} manifest entries to {}",
            self.entries.len(),
            self.path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(accession: &str, year: i32, quarter: u32) -> ManifestEntry {
        ManifestEntry {
            accession: accession.to_string(),
            cik: "0001000045".to_string(),
            date_filed: "2024-01-02".to_string(),
            form_type: "10-Q".to_string(),
            quarter: Some(quarter),
            strategy: "index".to_string(),
            year: Some(year),
        }
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let temp_dir = TempDir::new().unwrap();
        let manifest = Manifest::open(temp_dir.path().join("_state/manifest.json")).unwrap();
        assert!(manifest.is_empty());
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("_state/manifest.json");

        let mut manifest = Manifest::new(&path);
        manifest.upsert(entry("0001000045-24-000001", 2024, 1));
        manifest.upsert(entry("0001000045-24-000002", 2024, 2));
        manifest.upsert(ManifestEntry {
            year: None,
            quarter: None,
            ..entry("0000320193-23-000077", 2023, 4)
        });
        manifest.save_atomic().unwrap();

        assert!(!temp_dir.path().join("_state/manifest.json.tmp").exists());

        let reloaded = Manifest::open(&path).unwrap();
        assert_eq!(reloaded.len(), 3);
        for accession in [
            "0001000045-24-000001",
            "0001000045-24-000002",
            "0000320193-23-000077",
        ] {
            assert_eq!(reloaded.get(accession), manifest.get(accession));
        }
    }

    #[test]
    fn test_file_format() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("manifest.json");
        let mut manifest = Manifest::new(&path);
        manifest.upsert(entry("0001000045-24-000001", 2024, 1));
        manifest.save_atomic().unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let value = &raw["0001000045-24-000001"];
        assert_eq!(value["cik"], "0001000045");
        assert_eq!(value["form_type"], "10-Q");
        assert_eq!(value["date_filed"], "2024-01-02");
        assert_eq!(value["strategy"], "index");
        assert_eq!(value["year"], 2024);
        assert_eq!(value["quarter"], 1);
    }

    #[test]
    fn test_key_is_authoritative_and_strategy_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("manifest.json");
        fs::write(
            &path,
            concat!(
                r#"{"0001-24-1": {"form_type": "8-K", "cik": "0000000001", "#,
                r#""date_filed": "2024-02-01", "year": 2024, "quarter": 1}}"#,
            ),
        )
        .unwrap();

        let manifest = Manifest::open(&path).unwrap();
        let loaded = manifest.get("0001-24-1").unwrap();
        assert_eq!(loaded.accession, "0001-24-1");
        assert_eq!(loaded.strategy, "index");
    }

    #[test]
    fn test_corrupt_manifest_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("manifest.json");
        fs::write(&path, "{ not json").unwrap();

        let err = Manifest::open(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SecFetchError>(),
            Some(SecFetchError::CorruptManifest { .. })
        ));
    }

    #[test]
    fn test_remove_and_query_by_period() {
        let mut manifest = Manifest::new("unused.json");
        manifest.upsert(entry("a", 2024, 1));
        manifest.upsert(entry("b", 2024, 1));
        manifest.upsert(entry("c", 2024, 2));

        assert!(manifest.has_entries_for(2024, 1));
        assert!(!manifest.has_entries_for(2023, 1));
        assert_eq!(manifest.remove_entries_for(2024, 1), 2);
        assert!(!manifest.has_entries_for(2024, 1));
        assert!(manifest.has("c"));
        assert_eq!(manifest.remove_entries_for(2024, 1), 0);
    }
}
