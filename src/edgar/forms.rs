//! Accepted form types
//!
//! A download root may carry `config/form_types.json`
//! (`{"accepted_form_types": [...]}`) to override the built-in catalog.

use crate::errors::SecFetchError;
use anyhow::Result;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::debug;

const BUILTIN_FORM_TYPES: &[&str] = &[
    "10-K", "10-K405", "10-KT", "10-Q", "10-QT", "8-K", "8-K12B", "6-K", "20-F", "40-F",
    "11-K", "S-1", "S-3", "S-4", "S-8", "F-1", "F-3", "F-4", "424B1", "424B2", "424B3",
    "424B4", "424B5", "DEF 14A", "DEFA14A", "PRE 14A", "DEFM14A", "SC 13D", "SC 13G",
    "SC TO-T", "13F-HR", "13F-NT", "3", "4", "5", "144", "N-CSR", "N-CSRS", "N-PORT-P",
    "485BPOS", "497", "D", "ARS", "NT 10-K", "NT 10-Q", "10-D", "ABS-EE", "SD",
];

#[derive(Debug, Deserialize)]
struct FormCatalogFile {
    accepted_form_types: Vec<String>,
}

pub fn form_catalog_path(data_dir: &Path) -> PathBuf {
    data_dir.join("config").join("form_types.json")
}

/// Load the accepted form types for a download root.
///
/// The built-in catalog includes the `/A` amendment of every form.
pub fn load_accepted_form_types(data_dir: &Path) -> Result<BTreeSet<String>> {
    let path = form_catalog_path(data_dir);
    if path.exists() {
        let raw = std::fs::read(&path).map_err(SecFetchError::from)?;
        let catalog: FormCatalogFile = serde_json::from_slice(&raw)
            .map_err(|source| SecFetchError::InvalidFormCatalog {
                path: path.clone(),
                source,
            })?;
        debug!(
            "Loaded {} accepted form types from {}",
            catalog.accepted_form_types.len(),
            path.display()
        );
        return Ok(catalog
            .accepted_form_types
            .iter()
            .map(|f| normalize_form(f))
            .filter(|f| !f.is_empty())
            .collect());
    }

    Ok(BUILTIN_FORM_TYPES
        .iter()
        .flat_map(|form| [form.to_string(), format!("{}/A", form)])
        .collect())
}

fn normalize_form(form: &str) -> String {
    form.trim().to_uppercase()
}

/// Normalize requested forms and check them against the catalog.
///
/// Returns the forms trimmed, uppercased and de-duplicated in request order.
pub fn validate_forms(forms: &[String], accepted: &BTreeSet<String>) -> Result<Vec<String>> {
    let mut seen = BTreeSet::new();
    let normalized: Vec<String> = forms
        .iter()
        .map(|f| normalize_form(f))
        .filter(|f| !f.is_empty())
        .filter(|f| seen.insert(f.clone()))
        .collect();

    if normalized.is_empty() {
        return Err(SecFetchError::NoForms.into());
    }

    let unknown: Vec<String> = normalized
        .iter()
        .filter(|f| !accepted.contains(*f))
        .cloned()
        .collect();
    if !unknown.is_empty() {
        return Err(SecFetchError::UnknownForms(unknown).into());
    }

    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn forms(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_builtin_catalog_has_amendments() {
        let temp_dir = TempDir::new().unwrap();
        let accepted = load_accepted_form_types(temp_dir.path()).unwrap();
        assert!(accepted.contains("10-Q"));
        assert!(accepted.contains("10-Q/A"));
        assert!(accepted.contains("DEF 14A"));
    }

    #[test]
    fn test_catalog_file_overrides_builtin() {
        let temp_dir = TempDir::new().unwrap();
        let path = form_catalog_path(temp_dir.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{"accepted_form_types": ["10-q", "S-1"]}"#).unwrap();

        let accepted = load_accepted_form_types(temp_dir.path()).unwrap();
        assert_eq!(accepted, BTreeSet::from(["10-Q".to_string(), "S-1".to_string()]));
    }

    #[test]
    fn test_invalid_catalog_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = form_catalog_path(temp_dir.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{"forms": []}"#).unwrap();

        let err = load_accepted_form_types(temp_dir.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SecFetchError>(),
            Some(SecFetchError::InvalidFormCatalog { .. })
        ));
    }

    #[test]
    fn test_validate_forms() {
        let accepted = BTreeSet::from(["10-Q".to_string(), "10-K".to_string()]);

        let valid = validate_forms(&forms(&[" 10-q", "10-K", "10-Q"]), &accepted).unwrap();
        assert_eq!(valid, forms(&["10-Q", "10-K"]));

        let err = validate_forms(&forms(&["10-Q", "FOO", "BAR"]), &accepted).unwrap_err();
        match err.downcast_ref::<SecFetchError>() {
            Some(SecFetchError::UnknownForms(unknown)) => {
                assert_eq!(unknown, &forms(&["FOO", "BAR"]))
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let err = validate_forms(&forms(&["  "]), &accepted).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SecFetchError>(),
            Some(SecFetchError::NoForms)
        ));
    }
}
