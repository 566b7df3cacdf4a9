//! Selection of master index rows by form type

use crate::models::IndexRow;
use std::collections::BTreeSet;

const AMENDMENT_SUFFIX: &str = "/A";

/// Matches rows whose form type was requested, optionally including the
/// amended (`/A`) variant of each requested form.
#[derive(Debug, Clone)]
pub struct FilingFilter {
    forms: BTreeSet<String>,
    include_amended: bool,
}

impl FilingFilter {
    pub fn new<I, S>(forms: I, include_amended: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            forms: forms.into_iter().map(Into::into).collect(),
            include_amended,
        }
    }

    pub fn matches(&self, row: &IndexRow) -> bool {
        if self.forms.contains(&row.form_type) {
            return true;
        }
        self.include_amended
            && row
                .form_type
                .strip_suffix(AMENDMENT_SUFFIX)
                .map_or(false, |base| self.forms.contains(base))
    }
}

/// Keep matching rows in index order
pub fn filter_master_rows(rows: Vec<IndexRow>, filter: &FilingFilter) -> Vec<IndexRow> {
    rows.into_iter().filter(|row| filter.matches(row)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(form_type: &str, accession: &str) -> IndexRow {
        IndexRow {
            cik: "0001000045".to_string(),
            company_name: "TEST CORP".to_string(),
            form_type: form_type.to_string(),
            date_filed: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            accession: accession.to_string(),
        }
    }

    fn rows() -> Vec<IndexRow> {
        vec![
            row("10-Q/A", "a1"),
            row("8-K", "a2"),
            row("10-Q", "a3"),
            row("10-K", "a4"),
            row("10-Q", "a5"),
            row("10-QT", "a6"),
        ]
    }

    fn accessions(rows: &[IndexRow]) -> Vec<&str> {
        rows.iter().map(|r| r.accession.as_str()).collect()
    }

    #[test]
    fn test_exact_form_match_preserves_order() {
        let filter = FilingFilter::new(["10-Q", "8-K"], false);
        let matched = filter_master_rows(rows(), &filter);
        assert_eq!(accessions(&matched), vec!["a2", "a3", "a5"]);
    }

    #[test]
    fn test_amendments_only_when_enabled() {
        let filter = FilingFilter::new(["10-Q"], true);
        let matched = filter_master_rows(rows(), &filter);
        assert_eq!(accessions(&matched), vec!["a1", "a3", "a5"]);
    }

    #[test]
    fn test_explicit_amendment_request() {
        let filter = FilingFilter::new(["10-Q/A"], false);
        assert!(filter.matches(&row("10-Q/A", "x")));
        assert!(!filter.matches(&row("10-Q", "x")));
    }
}
