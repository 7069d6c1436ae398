//! Import job lifecycle types
//!
//! A job moves `Pending -> Processing -> {Completed | Failed}`; the two
//! terminal states absorb. All counters live in the job state store; the
//! snapshot here is what polling clients see.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::options::ImportOptions;

// ==========================================================================
// Tests First (TDD)
// ==========================================================================


// ==========================================================================
// Implementation
// ==========================================================================

/// Lifecycle state of an import job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportJobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ImportJobStatus {
    /// No transition leaves a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Aggregate numbers attached to a job once it reaches a terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationSummary {
    pub total_processed: u64,
    pub valid_emails: u64,
    pub invalid_emails: u64,
    pub risky_emails: u64,
    pub duplicates: u64,
    pub average_confidence_score: u8,
    pub processing_time_ms: u64,
}

/// Point-in-time view of one import job, as read by polling clients.
/// Internally consistent: `processed_records` always equals the sum of the
/// four outcome counters at the instant the snapshot was taken.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportJobSnapshot {
    pub id: Uuid,
    pub file_name: String,
    pub status: ImportJobStatus,
    /// Counted in a pre-pass at submission; `None` only while pending.
    pub total_records: Option<u64>,
    pub processed_records: u64,
    pub valid_records: u64,
    pub risky_records: u64,
    pub invalid_records: u64,
    pub duplicate_records: u64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Immutable snapshot of the caller's configuration.
    pub options: ImportOptions,
    /// Submitting user, for audit and cancel ownership.
    pub user_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_summary: Option<ValidationSummary>,
}

impl ImportJobSnapshot {
    /// Percentage complete, guarded to 0 while the total is unknown or zero.
    pub fn progress_percentage(&self) -> f64 {
        match self.total_records {
            Some(total) if total > 0 => (self.processed_records as f64 / total as f64) * 100.0,
            _ => 0.0,
        }
    }
}

/// One page of job summaries, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPage {
    pub jobs: Vec<ImportJobSnapshot>,
    pub total: usize,
    pub page: usize,
    pub limit: usize,
}

/// Dashboard statistics over all jobs (optionally one user's).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportStatistics {
    pub total_jobs: usize,
    pub completed_jobs: usize,
    pub failed_jobs: usize,
    pub total_records_processed: u64,
    pub total_valid_records: u64,
    /// Valid / processed over all jobs, as a percentage.
    pub average_success_rate: f64,
}
