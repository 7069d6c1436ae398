//! Per-record import outcomes
//!
//! One `ImportResult` exists per input row, created exactly once by the batch
//! processor and never mutated afterwards.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Classification of a single record. Mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportResultStatus {
    Valid,
    Risky,
    Invalid,
    Duplicate,
}

/// Named checks reported by the validator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationDetails {
    pub syntax_valid: bool,
    pub is_disposable: bool,
    pub is_role_account: bool,
    pub has_typos: bool,
    /// Which validator produced these checks.
    pub provider: String,
}

/// Outcome for one input row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub id: Uuid,
    /// 1-based position in the source file, header excluded.
    pub row_number: u64,
    pub email: String,
    pub status: ImportResultStatus,
    /// Validator confidence, 0-100.
    pub confidence_score: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_details: Option<ValidationDetails>,
    /// Human-readable defects, in the order they were detected.
    pub issues: Vec<String>,
    /// Corrective hints, e.g. typo fixes.
    pub suggestions: Vec<String>,
    /// Whether the record was actually persisted downstream.
    pub imported: bool,
    /// Terminal per-record failure (validator or sink fault).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ImportResult {
    pub fn new(row_number: u64, email: String, status: ImportResultStatus) -> Self {
        Self {
            id: Uuid::new_v4(),
            row_number,
            email,
            status,
            confidence_score: 0,
            validation_details: None,
            issues: Vec::new(),
            suggestions: Vec::new(),
            imported: false,
            error: None,
        }
    }

    /// Invalid outcome with a single explanatory issue.
    pub fn invalid(row_number: u64, email: String, issue: &str) -> Self {
        let mut result = Self::new(row_number, email, ImportResultStatus::Invalid);
        result.issues.push(issue.to_string());
        result
    }

    /// True if the free-text `needle` matches email, issues or suggestions.
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.email.to_lowercase().contains(&needle)
            || self.issues.iter().any(|i| i.to_lowercase().contains(&needle))
            || self.suggestions.iter().any(|s| s.to_lowercase().contains(&needle))
    }
}

/// Read-side filter over a job's result set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ImportResultStatus>,
    /// Free-text search over email, issues and suggestions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

/// One page of results.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultPage {
    pub results: Vec<ImportResult>,
    /// Total results matching the filter, across all pages.
    pub total: usize,
    pub page: usize,
    pub limit: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_status_serializes_lowercase() {
        let json = serde_json::to_string(&ImportResultStatus::Duplicate).unwrap();
        assert_eq!(json, "\"duplicate\"");
    }

    #[test]
    fn test_result_serializes_to_camel_case() {
        let result = ImportResult::new(3, "a@b.cz".to_string(), ImportResultStatus::Valid);
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("rowNumber"));
        assert!(json.contains("confidenceScore"));
        assert!(!json.contains("row_number"));
    }

    #[test]
    fn test_result_omits_empty_error() {
        let result = ImportResult::new(1, "a@b.cz".to_string(), ImportResultStatus::Valid);
        let json = serde_json::to_string(&result).unwrap();
        assert!(!json.contains("\"error\""));
    }

    #[test]
    fn test_invalid_constructor_records_issue() {
        let result = ImportResult::invalid(7, "broken".to_string(), "missing required field");
        assert_eq!(result.status, ImportResultStatus::Invalid);
        assert_eq!(result.issues, vec!["missing required field"]);
        assert!(!result.imported);
    }

    #[test]
    fn test_matches_search_over_email_and_issues() {
        let mut result = ImportResult::invalid(1, "jan@firma.cz".to_string(), "No MX record");
        result.suggestions.push("Did you mean: jan@gmail.com?".to_string());

        assert!(result.matches_search("FIRMA"));
        assert!(result.matches_search("mx record"));
        assert!(result.matches_search("gmail"));
        assert!(!result.matches_search("unrelated"));
    }
}
