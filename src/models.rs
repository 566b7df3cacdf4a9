use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One row of a quarterly EDGAR master index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRow {
    /// CIK, zero-padded to 10 digits
    pub cik: String,
    pub company_name: String,
    /// Form type as listed, e.g. "10-Q" or "10-Q/A"
    pub form_type: String,
    pub date_filed: NaiveDate,
    /// Dashed accession number, e.g. "0001000045-24-000001"
    pub accession: String,
}

/// How a single matched index row ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Outcome {
    Downloaded { output_dir: PathBuf },
    Skipped,
    #[serde(rename = "error")]
    Failed {
        #[serde(rename = "error")]
        reason: String,
    },
}

/// Result record for one matched index row. Returned to the caller, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadResult {
    pub accession: String,
    pub cik: String,
    pub form_type: String,
    pub date_filed: NaiveDate,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl DownloadResult {
    pub fn new(row: &IndexRow, outcome: Outcome) -> Self {
        Self {
            accession: row.accession.clone(),
            cik: row.cik.clone(),
            form_type: row.form_type.clone(),
            date_filed: row.date_filed,
            outcome,
        }
    }

    pub fn status(&self) -> &str {
        match self.outcome {
            Outcome::Downloaded { .. } => "downloaded",
            Outcome::Skipped => "skipped",
            Outcome::Failed { .. } => "error",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, Outcome::Failed { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Failed { reason } => Some(reason),
            _ => None,
        }
    }

    pub fn output_dir(&self) -> Option<&PathBuf> {
        match &self.outcome {
            Outcome::Downloaded { output_dir } => Some(output_dir),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> IndexRow {
        IndexRow {
            cik: "0001000045".to_string(),
            company_name: "TEST CORP".to_string(),
            form_type: "10-Q".to_string(),
            date_filed: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            accession: "0001000045-24-000001".to_string(),
        }
    }

    #[test]
    fn test_result_serializes_flat() {
        let result = DownloadResult::new(
            &row(),
            Outcome::Failed {
                reason: "boom".to_string(),
            },
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["error"], "boom");
        assert_eq!(json["date_filed"], "2024-01-02");
        assert_eq!(json["accession"], "0001000045-24-000001");
    }

    #[test]
    fn test_downloaded_result_accessors() {
        let result = DownloadResult::new(
            &row(),
            Outcome::Downloaded {
                output_dir: PathBuf::from("data/x"),
            },
        );
        assert_eq!(result.status(), "downloaded");
        assert!(!result.is_error());
        assert_eq!(result.output_dir(), Some(&PathBuf::from("data/x")));
        assert_eq!(result.error(), None);

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["output_dir"], "data/x");
    }
}
