//! Record decoder for uploaded CSV files
//!
//! Streams the file in a single pass, translating each row into a canonical
//! field map through the caller's column mapping. The whole file is never
//! materialized; memory stays bounded by the batch the processor pulls.

use std::collections::HashMap;
use std::io::Read;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ConfigurationError;
use crate::types::IDENTIFIER_FIELD;

/// One decoded row: 1-based position (header excluded) plus the canonical
/// field map. Columns absent from the mapping are dropped.
#[derive(Debug, Clone)]
pub struct RawRecord {
    pub row_number: u64,
    pub fields: HashMap<String, String>,
}

impl RawRecord {
    /// Value of the identifying field, trimmed; None when missing or blank.
    pub fn identifier(&self) -> Option<&str> {
        self.fields
            .get(IDENTIFIER_FIELD)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

/// Streaming CSV decoder bound to one job's column mapping.
pub struct RecordDecoder {
    reader: csv::Reader<Box<dyn Read + Send>>,
    /// Per-column canonical field name, positionally aligned with the header.
    column_fields: Vec<Option<String>>,
    rows_seen: u64,
}

impl RecordDecoder {
    /// Read and validate the header row. Fails with a `ConfigurationError`
    /// before any job exists when the file is empty or no header column is
    /// mapped to the identifying field.
    pub fn new(
        stream: Box<dyn Read + Send>,
        column_mapping: &HashMap<String, String>,
    ) -> Result<Self, ConfigurationError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(stream);

        let headers = reader
            .headers()
            .map_err(|e| ConfigurationError::UnreadableFile(e.to_string()))?
            .clone();
        if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
            return Err(ConfigurationError::EmptyFile);
        }

        let column_fields: Vec<Option<String>> = headers
            .iter()
            .map(|h| column_mapping.get(h).cloned())
            .collect();

        let has_identifier = column_fields
            .iter()
            .flatten()
            .any(|f| f == IDENTIFIER_FIELD);
        if !has_identifier {
            return Err(ConfigurationError::MissingIdentifierColumn);
        }

        Ok(Self {
            reader,
            column_fields,
            rows_seen: 0,
        })
    }

    /// Pull up to `size` records, preserving source order. An empty vec
    /// means the stream is drained and [`rows_seen`](Self::rows_seen) is now
    /// the final total.
    pub fn next_batch(&mut self, size: usize) -> Result<Vec<RawRecord>> {
        let mut batch = Vec::with_capacity(size.min(1024));
        let mut row = csv::StringRecord::new();

        while batch.len() < size {
            let more = self
                .reader
                .read_record(&mut row)
                .context("reading CSV record")?;
            if !more {
                break;
            }
            self.rows_seen += 1;

            let mut fields = HashMap::new();
            for (idx, value) in row.iter().enumerate() {
                if let Some(Some(field)) = self.column_fields.get(idx) {
                    fields.insert(field.clone(), value.to_string());
                }
            }
            batch.push(RawRecord {
                row_number: self.rows_seen,
                fields,
            });
        }

        Ok(batch)
    }

    /// Rows decoded so far; the job's `total_records` once the stream ends.
    pub fn rows_seen(&self) -> u64 {
        self.rows_seen
    }
}

// ==========================================================================
// Column auto-detection
// ==========================================================================

static FIELD_PATTERNS: Lazy<Vec<(&'static str, Vec<Regex>)>> = Lazy::new(|| {
    let compile = |patterns: &[&str]| {
        patterns
            .iter()
            .map(|p| Regex::new(p).expect("static field pattern"))
            .collect::<Vec<_>>()
    };
    vec![
        (
            "email",
            compile(&[
                r"(?i)^e?-?mail$",
                r"(?i)^email.*address$",
                r"(?i)^contact.*email$",
                r"(?i)^subscriber.*email$",
            ]),
        ),
        (
            "firstName",
            compile(&[r"(?i)^first.*name$", r"(?i)^fname$", r"(?i)^given.*name$"]),
        ),
        (
            "lastName",
            compile(&[r"(?i)^last.*name$", r"(?i)^lname$", r"(?i)^surname$"]),
        ),
        (
            "phone",
            compile(&[r"(?i)^phone$", r"(?i)^telephone$", r"(?i)^mobile$"]),
        ),
        (
            "company",
            compile(&[r"(?i)^company$", r"(?i)^organi[sz]ation$", r"(?i)^business$"]),
        ),
    ]
});

/// Suggest a source-header -> canonical-field mapping from header names.
/// First matching header wins per field.
pub fn suggest_mapping(headers: &[String]) -> HashMap<String, String> {
    let mut mapping = HashMap::new();
    for (field, patterns) in FIELD_PATTERNS.iter() {
        for header in headers {
            if mapping.contains_key(header) {
                continue;
            }
            if patterns.iter().any(|p| p.is_match(header)) {
                mapping.insert(header.clone(), field.to_string());
                break;
            }
        }
    }
    mapping
}

/// Count the data rows of a stream in one cheap pass, so a job knows its
/// total before the first batch is processed. Skips the header row.
pub fn count_rows(stream: Box<dyn Read + Send>) -> Result<u64, ConfigurationError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(stream);
    let mut record = csv::ByteRecord::new();
    let mut rows = 0u64;
    loop {
        let more = reader
            .read_byte_record(&mut record)
            .map_err(|e| ConfigurationError::UnreadableFile(e.to_string()))?;
        if !more {
            break;
        }
        rows += 1;
    }
    Ok(rows)
}

/// Read just the header row of a stream, for mapping suggestions.
pub fn read_headers(stream: Box<dyn Read + Send>) -> Result<Vec<String>, ConfigurationError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(stream);
    let headers = reader
        .headers()
        .map_err(|e| ConfigurationError::UnreadableFile(e.to_string()))?;
    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(ConfigurationError::EmptyFile);
    }
    Ok(headers.iter().map(|h| h.to_string()).collect())
}
