//! Import job configuration
//!
//! Options are captured as an immutable snapshot at job creation, so a later
//! change of defaults can never alter an in-flight job. Unknown keys in the
//! incoming JSON are rejected rather than silently dropped.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Canonical name of the identifying field every import must map.
pub const IDENTIFIER_FIELD: &str = "email";

/// What to do when a record's identifying key was already imported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateHandling {
    /// Keep the first occurrence, record later ones as duplicates.
    Skip,
    /// Hand the duplicate to the persistence sink for an update.
    Update,
    /// Hand the duplicate to the persistence sink for a replace.
    Replace,
}

impl Default for DuplicateHandling {
    fn default() -> Self {
        Self::Skip
    }
}

/// Caller-supplied configuration for one import job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ImportOptions {
    /// Source CSV header -> canonical field name (e.g. "E-Mail" -> "email").
    /// Must contain at least one entry mapping to [`IDENTIFIER_FIELD`].
    pub column_mapping: HashMap<String, String>,
    /// Duplicate policy, default `skip`.
    #[serde(default)]
    pub duplicate_handling: DuplicateHandling,
    /// Confidence score below which an otherwise acceptable record is
    /// classified risky. Default 70.
    #[serde(default = "default_validation_threshold")]
    pub validation_threshold: u8,
    /// Records per processing batch. Default 500.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Opaque downstream group identifiers, passed through untouched.
    #[serde(default)]
    pub group_ids: Vec<String>,
    /// Opaque downstream segment identifiers, passed through untouched.
    #[serde(default)]
    pub segment_ids: Vec<String>,
}

fn default_validation_threshold() -> u8 {
    70
}

fn default_batch_size() -> usize {
    500
}

impl ImportOptions {
    /// Minimal options with defaults and a single identifier mapping.
    pub fn with_email_column(column: &str) -> Self {
        let mut mapping = HashMap::new();
        mapping.insert(column.to_string(), IDENTIFIER_FIELD.to_string());
        Self {
            column_mapping: mapping,
            duplicate_handling: DuplicateHandling::default(),
            validation_threshold: default_validation_threshold(),
            batch_size: default_batch_size(),
            group_ids: Vec::new(),
            segment_ids: Vec::new(),
        }
    }

    /// Check the invariants that must hold before a job may be created.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.batch_size == 0 {
            return Err(ConfigurationError::InvalidBatchSize);
        }
        if self.validation_threshold > 100 {
            return Err(ConfigurationError::InvalidThreshold(self.validation_threshold));
        }
        if !self.column_mapping.values().any(|f| f == IDENTIFIER_FIELD) {
            return Err(ConfigurationError::MissingIdentifierMapping);
        }
        Ok(())
    }
}
