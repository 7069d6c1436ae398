//! Report generation
//!
//! The report is regenerated on demand from the stored result set, never a
//! one-shot side effect of completion. Results are immutable and serialized
//! in `row_number` order, so repeated downloads are byte-identical.

use anyhow::{Context, Result};

use crate::types::{ImportResult, ImportResultStatus};

const HEADERS: [&str; 8] = [
    "rowNumber",
    "email",
    "status",
    "confidenceScore",
    "imported",
    "issues",
    "suggestions",
    "error",
];

fn status_label(status: ImportResultStatus) -> &'static str {
    match status {
        ImportResultStatus::Valid => "valid",
        ImportResultStatus::Risky => "risky",
        ImportResultStatus::Invalid => "invalid",
        ImportResultStatus::Duplicate => "duplicate",
    }
}

/// Serialize the full result set into a downloadable CSV artifact.
/// `results` must already be in `row_number` order (the store guarantees it).
pub fn generate_report(results: &[ImportResult]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(HEADERS).context("writing report header")?;

    for result in results {
        writer
            .write_record([
                result.row_number.to_string(),
                result.email.clone(),
                status_label(result.status).to_string(),
                result.confidence_score.to_string(),
                result.imported.to_string(),
                result.issues.join("; "),
                result.suggestions.join("; "),
                result.error.clone().unwrap_or_default(),
            ])
            .with_context(|| format!("writing report row {}", result.row_number))?;
    }

    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("flushing report buffer: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(row: u64, email: &str, status: ImportResultStatus) -> ImportResult {
        let mut r = ImportResult::new(row, email.to_string(), status);
        r.confidence_score = 90;
        r
    }

    #[test]
    fn test_report_has_header_and_one_row_per_result() {
        let results = vec![
            result(1, "a@firma.cz", ImportResultStatus::Valid),
            result(2, "b@firma.cz", ImportResultStatus::Duplicate),
        ];
        let bytes = generate_report(&results).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("rowNumber,email,status"));
        assert!(lines[1].contains("a@firma.cz"));
        assert!(lines[2].contains("duplicate"));
    }

    #[test]
    fn test_report_preserves_row_number_order() {
        let results = vec![
            result(1, "a@firma.cz", ImportResultStatus::Valid),
            result(2, "b@firma.cz", ImportResultStatus::Invalid),
            result(3, "c@firma.cz", ImportResultStatus::Risky),
        ];
        let text = String::from_utf8(generate_report(&results).unwrap()).unwrap();
        let rows: Vec<&str> = text.lines().skip(1).collect();
        assert!(rows[0].starts_with("1,"));
        assert!(rows[1].starts_with("2,"));
        assert!(rows[2].starts_with("3,"));
    }

    #[test]
    fn test_report_is_byte_identical_across_generations() {
        let mut r = result(1, "jan@gmial.com", ImportResultStatus::Invalid);
        r.issues.push("Possible typo in email address".to_string());
        r.suggestions.push("Did you mean: jan@gmail.com?".to_string());
        let results = vec![r];

        let first = generate_report(&results).unwrap();
        let second = generate_report(&results).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_report_joins_multiple_issues() {
        let mut r = result(1, "abuse@gmial.com", ImportResultStatus::Risky);
        r.issues.push("Role-based email address".to_string());
        r.issues.push("Possible typo in email address".to_string());

        let text = String::from_utf8(generate_report(&[r]).unwrap()).unwrap();
        assert!(text.contains("Role-based email address; Possible typo in email address"));
    }

    #[test]
    fn test_empty_result_set_yields_header_only() {
        let bytes = generate_report(&[]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text.lines().count(), 1);
    }
}
