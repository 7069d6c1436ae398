//! In-memory job state store
//!
//! The only mutable structure shared between the batch processor and the
//! polling read side. Every mutation happens under one write lock so readers
//! always see an internally consistent snapshot: `processed_records` equals
//! the sum of the four outcome counters at any observable instant.
//!
//! Terminal states are absorbing. Once a job is completed or failed, all
//! writes against it become no-ops (idempotent-write guard); a process
//! restart strands running jobs in `processing` — there is no durable
//! checkpointing here by design.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::warn;
use uuid::Uuid;

use crate::types::{
    ImportJobSnapshot, ImportJobStatus, ImportOptions, ImportResult, ImportResultStatus,
    ImportStatistics, JobPage, ResultFilter, ResultPage, ValidationSummary,
};

struct JobState {
    snapshot: ImportJobSnapshot,
    results: Vec<ImportResult>,
}

/// Thread-safe registry of all import jobs and their per-record results.
#[derive(Default)]
pub struct JobStore {
    jobs: RwLock<HashMap<Uuid, JobState>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new job in `pending` state and return its first snapshot.
    pub fn create(
        &self,
        file_name: &str,
        options: ImportOptions,
        user_id: Uuid,
    ) -> ImportJobSnapshot {
        let snapshot = ImportJobSnapshot {
            id: Uuid::new_v4(),
            file_name: file_name.to_string(),
            status: ImportJobStatus::Pending,
            total_records: None,
            processed_records: 0,
            valid_records: 0,
            risky_records: 0,
            invalid_records: 0,
            duplicate_records: 0,
            created_at: chrono::Utc::now(),
            completed_at: None,
            error: None,
            options,
            user_id,
            validation_summary: None,
        };
        self.jobs.write().insert(
            snapshot.id,
            JobState {
                snapshot: snapshot.clone(),
                results: Vec::new(),
            },
        );
        snapshot
    }

    /// `pending -> processing`. Called synchronously during job submission.
    pub fn mark_processing(&self, job_id: Uuid) {
        let mut jobs = self.jobs.write();
        if let Some(state) = jobs.get_mut(&job_id) {
            if state.snapshot.status == ImportJobStatus::Pending {
                state.snapshot.status = ImportJobStatus::Processing;
            }
        }
    }

    /// Fold one record outcome into the job: append the result, bump exactly
    /// one outcome counter and `processed_records`, all under a single lock.
    pub fn record_outcome(&self, job_id: Uuid, result: ImportResult) {
        let mut jobs = self.jobs.write();
        let Some(state) = jobs.get_mut(&job_id) else {
            return;
        };
        if state.snapshot.status.is_terminal() {
            warn!(%job_id, row = result.row_number, "dropping outcome for terminal job");
            return;
        }
        match result.status {
            ImportResultStatus::Valid => state.snapshot.valid_records += 1,
            ImportResultStatus::Risky => state.snapshot.risky_records += 1,
            ImportResultStatus::Invalid => state.snapshot.invalid_records += 1,
            ImportResultStatus::Duplicate => state.snapshot.duplicate_records += 1,
        }
        state.snapshot.processed_records += 1;
        state.results.push(result);
    }

    /// Record the job's row count. Set from the counting pre-pass at
    /// submission and re-affirmed once the decoder drains the stream.
    pub fn set_total(&self, job_id: Uuid, total: u64) {
        let mut jobs = self.jobs.write();
        if let Some(state) = jobs.get_mut(&job_id) {
            if !state.snapshot.status.is_terminal() {
                state.snapshot.total_records = Some(total);
            }
        }
    }

    /// Terminal transition to `completed`, freezing all counters and
    /// attaching the validation summary.
    pub fn complete(&self, job_id: Uuid, processing_time_ms: u64) {
        let mut jobs = self.jobs.write();
        let Some(state) = jobs.get_mut(&job_id) else {
            return;
        };
        if state.snapshot.status.is_terminal() {
            return;
        }
        let average = average_confidence(&state.results);
        let s = &mut state.snapshot;
        s.validation_summary = Some(ValidationSummary {
            total_processed: s.processed_records,
            valid_emails: s.valid_records,
            invalid_emails: s.invalid_records,
            risky_emails: s.risky_records,
            duplicates: s.duplicate_records,
            average_confidence_score: average,
            processing_time_ms,
        });
        s.status = ImportJobStatus::Completed;
        s.completed_at = Some(chrono::Utc::now());
    }

    /// Terminal transition to `failed`. Already-recorded results stay
    /// queryable and reportable.
    pub fn fail(&self, job_id: Uuid, error: &str) {
        let mut jobs = self.jobs.write();
        let Some(state) = jobs.get_mut(&job_id) else {
            return;
        };
        if state.snapshot.status.is_terminal() {
            return;
        }
        state.snapshot.status = ImportJobStatus::Failed;
        state.snapshot.error = Some(error.to_string());
        state.snapshot.completed_at = Some(chrono::Utc::now());
    }

    /// Current snapshot of one job.
    pub fn snapshot(&self, job_id: Uuid) -> Option<ImportJobSnapshot> {
        self.jobs.read().get(&job_id).map(|s| s.snapshot.clone())
    }

    /// Paginated, filterable view over a job's results, `row_number` order.
    pub fn results_page(
        &self,
        job_id: Uuid,
        filter: &ResultFilter,
        page: usize,
        limit: usize,
    ) -> Option<ResultPage> {
        let jobs = self.jobs.read();
        let state = jobs.get(&job_id)?;

        let mut matching: Vec<&ImportResult> = state
            .results
            .iter()
            .filter(|r| filter.status.map_or(true, |s| r.status == s))
            .filter(|r| {
                filter
                    .search
                    .as_deref()
                    .map_or(true, |needle| r.matches_search(needle))
            })
            .collect();
        matching.sort_by_key(|r| r.row_number);

        let total = matching.len();
        let page = page.max(1);
        let results = matching
            .into_iter()
            .skip((page - 1) * limit)
            .take(limit)
            .cloned()
            .collect();

        Some(ResultPage {
            results,
            total,
            page,
            limit,
        })
    }

    /// Full result set in `row_number` order, for report generation.
    pub fn all_results(&self, job_id: Uuid) -> Option<Vec<ImportResult>> {
        let jobs = self.jobs.read();
        let state = jobs.get(&job_id)?;
        let mut results = state.results.clone();
        results.sort_by_key(|r| r.row_number);
        Some(results)
    }

    /// Job summaries, newest first, optionally one user's / one status.
    pub fn list_jobs(
        &self,
        user_id: Option<Uuid>,
        status: Option<ImportJobStatus>,
        page: usize,
        limit: usize,
    ) -> JobPage {
        let jobs = self.jobs.read();
        let mut matching: Vec<&JobState> = jobs
            .values()
            .filter(|s| user_id.map_or(true, |u| s.snapshot.user_id == u))
            .filter(|s| status.map_or(true, |st| s.snapshot.status == st))
            .collect();
        matching.sort_by(|a, b| b.snapshot.created_at.cmp(&a.snapshot.created_at));

        let total = matching.len();
        let page = page.max(1);
        let jobs = matching
            .into_iter()
            .skip((page - 1) * limit)
            .take(limit)
            .map(|s| s.snapshot.clone())
            .collect();

        JobPage {
            jobs,
            total,
            page,
            limit,
        }
    }

    /// Drop terminal jobs that finished before `cutoff`, with their result
    /// sets. Running and pending jobs are never touched. Returns how many
    /// jobs were removed.
    pub fn cleanup_old_jobs(&self, cutoff: chrono::DateTime<chrono::Utc>) -> usize {
        let mut jobs = self.jobs.write();
        let before = jobs.len();
        jobs.retain(|_, state| {
            let s = &state.snapshot;
            !(s.status.is_terminal() && s.completed_at.map_or(false, |t| t < cutoff))
        });
        before - jobs.len()
    }

    /// Dashboard aggregates over all (or one user's) jobs.
    pub fn statistics(&self, user_id: Option<Uuid>) -> ImportStatistics {
        let jobs = self.jobs.read();
        let selected: Vec<&ImportJobSnapshot> = jobs
            .values()
            .map(|s| &s.snapshot)
            .filter(|s| user_id.map_or(true, |u| s.user_id == u))
            .collect();

        let total_jobs = selected.len();
        let completed_jobs = selected
            .iter()
            .filter(|s| s.status == ImportJobStatus::Completed)
            .count();
        let failed_jobs = selected
            .iter()
            .filter(|s| s.status == ImportJobStatus::Failed)
            .count();
        let total_records_processed: u64 = selected.iter().map(|s| s.processed_records).sum();
        let total_valid_records: u64 = selected.iter().map(|s| s.valid_records).sum();
        let average_success_rate = if total_records_processed > 0 {
            (total_valid_records as f64 / total_records_processed as f64) * 100.0
        } else {
            0.0
        };

        ImportStatistics {
            total_jobs,
            completed_jobs,
            failed_jobs,
            total_records_processed,
            total_valid_records,
            average_success_rate,
        }
    }
}

fn average_confidence(results: &[ImportResult]) -> u8 {
    if results.is_empty() {
        return 0;
    }
    let sum: u64 = results.iter().map(|r| r.confidence_score as u64).sum();
    (sum as f64 / results.len() as f64).round() as u8
}
