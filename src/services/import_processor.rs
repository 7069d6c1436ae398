//! Batch import processor
//!
//! Orchestrates one import job end to end: preflight checks, streaming
//! decode, duplicate detection, concurrent validation, persistence and the
//! terminal transition. Batches are consumed strictly in source order; the
//! next batch starts only after every outcome of the previous one has been
//! folded into the store, so progress counters only ever move forward.
//!
//! Within a batch the work happens in two phases. Duplicate check-and-set
//! runs sequentially in row order, which guarantees the earliest occurrence
//! of a key always wins. Validation and persistence of the survivors then
//! run concurrently, and the outcomes are folded back sorted by row number.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::ImportError;
use crate::services::cancellation::{CancelOutcome, CancellationRegistry, JobGuard};
use crate::services::decoder::{self, RawRecord, RecordDecoder};
use crate::services::deduplicator::Deduplicator;
use crate::services::job_store::JobStore;
use crate::services::persistence::{SubscriberRecord, SubscriberSink};
use crate::services::report;
use crate::services::storage::FileStore;
use crate::services::validator::EmailValidator;
use crate::types::{
    DuplicateHandling, ImportJobSnapshot, ImportJobStatus, ImportOptions, ImportResult,
    ImportResultStatus, ImportStatistics, JobPage, ResultFilter, ResultPage,
};

/// Sentinel recorded on a result whose validation attempt timed out.
const VALIDATION_TIMEOUT: &str = "validation timed out";

/// Runtime knobs of the batch processor, independent of any single job.
#[derive(Debug, Clone)]
pub struct ProcessorSettings {
    /// Budget for a single validator call; an overrun makes the record
    /// invalid rather than stalling the batch.
    pub record_timeout: Duration,
    /// Consecutive timed-out records after which the validator is presumed
    /// unresponsive and the whole job is failed.
    pub max_consecutive_timeouts: u32,
}

impl Default for ProcessorSettings {
    fn default() -> Self {
        Self {
            record_timeout: Duration::from_millis(5_000),
            max_consecutive_timeouts: 25,
        }
    }
}

/// Front door of the import pipeline: job submission, the background batch
/// loop, and the polling read side.
#[derive(Clone)]
pub struct ImportService {
    store: Arc<JobStore>,
    validator: Arc<dyn EmailValidator>,
    sink: Arc<dyn SubscriberSink>,
    files: Arc<dyn FileStore>,
    cancellation: CancellationRegistry,
    settings: ProcessorSettings,
}

impl ImportService {
    pub fn new(
        validator: Arc<dyn EmailValidator>,
        sink: Arc<dyn SubscriberSink>,
        files: Arc<dyn FileStore>,
        settings: ProcessorSettings,
    ) -> Self {
        Self {
            store: Arc::new(JobStore::new()),
            validator,
            sink,
            files,
            cancellation: CancellationRegistry::default(),
            settings,
        }
    }

    /// Submit an import. Preflight (options, file readability, header) runs
    /// first; if any check fails the error comes back directly and no job
    /// record exists. On success the job is already `processing` and the
    /// batch loop runs in a background task.
    pub async fn create_job(
        &self,
        file_ref: &str,
        options: ImportOptions,
        user_id: Uuid,
    ) -> Result<ImportJobSnapshot, ImportError> {
        options.validate()?;
        let stream = self.files.open_stream(file_ref)?;
        let decoder = RecordDecoder::new(stream, &options.column_mapping)?;
        // Counting pre-pass on a fresh stream: the total is known before the
        // first batch runs, so percentage and ETA are live from the start.
        let total = decoder::count_rows(self.files.open_stream(file_ref)?)?;

        let job = self.store.create(file_ref, options.clone(), user_id);
        self.store.mark_processing(job.id);
        self.store.set_total(job.id, total);
        let guard = self.cancellation.register(job.id, user_id);

        let service = self.clone();
        let job_id = job.id;
        tokio::spawn(async move {
            service.run_job(job_id, options, decoder, guard).await;
        });

        info!(%job_id, file = file_ref, "import job started");
        self.store
            .snapshot(job_id)
            .ok_or(ImportError::JobNotFound(job_id))
    }

    async fn run_job(
        &self,
        job_id: Uuid,
        options: ImportOptions,
        mut decoder: RecordDecoder,
        _guard: JobGuard,
    ) {
        let started = Instant::now();
        // Seed with already-persisted keys so re-imports are duplicates from
        // row one. A sink that cannot answer degrades to within-file dedup.
        let dedup = match self.sink.known_identifiers().await {
            Ok(keys) => Deduplicator::with_known_keys(keys),
            Err(e) => {
                warn!(%job_id, error = %e, "could not load known identifiers");
                Deduplicator::new()
            }
        };
        let mut consecutive_timeouts: u32 = 0;

        loop {
            // Checked between batches only, so counters never freeze in a
            // partially-folded state.
            if self.cancellation.is_cancelled(&job_id) {
                info!(%job_id, "import job cancelled");
                self.store.fail(job_id, "cancelled");
                return;
            }

            let batch = match decoder.next_batch(options.batch_size) {
                Ok(batch) => batch,
                Err(e) => {
                    error!(%job_id, error = %e, "decoding failed");
                    self.store.fail(job_id, &format!("decoding failed: {e:#}"));
                    return;
                }
            };
            if batch.is_empty() {
                break;
            }

            // Phase 1: row-order duplicate check-and-set.
            let mut outcomes: Vec<ImportResult> = Vec::with_capacity(batch.len());
            let mut survivors = Vec::new();
            for record in batch {
                let Some(email) = record.identifier().map(str::to_string) else {
                    outcomes.push(ImportResult::invalid(
                        record.row_number,
                        String::new(),
                        "Missing required field 'email'",
                    ));
                    continue;
                };
                let is_duplicate = !dedup.first_occurrence(&email);
                if is_duplicate && options.duplicate_handling == DuplicateHandling::Skip {
                    let mut result = ImportResult::new(
                        record.row_number,
                        email,
                        ImportResultStatus::Duplicate,
                    );
                    result.issues.push("Duplicate email address".to_string());
                    outcomes.push(result);
                } else {
                    survivors.push((record, email, is_duplicate));
                }
            }

            // Phase 2: concurrent validation and persistence.
            let validated = futures::future::join_all(
                survivors
                    .into_iter()
                    .map(|(record, email, dup)| self.process_record(record, email, dup, &options)),
            )
            .await;
            outcomes.extend(validated);
            outcomes.sort_by_key(|r| r.row_number);

            for result in outcomes {
                let timed_out = result.error.as_deref() == Some(VALIDATION_TIMEOUT);
                self.store.record_outcome(job_id, result);
                if timed_out {
                    consecutive_timeouts += 1;
                    if consecutive_timeouts >= self.settings.max_consecutive_timeouts {
                        error!(
                            %job_id,
                            consecutive_timeouts,
                            "validator unresponsive, aborting job"
                        );
                        self.store.fail(
                            job_id,
                            "validator unresponsive: too many consecutive timeouts",
                        );
                        return;
                    }
                } else {
                    consecutive_timeouts = 0;
                }
            }
        }

        self.store.set_total(job_id, decoder.rows_seen());
        let elapsed = started.elapsed().as_millis() as u64;
        self.store.complete(job_id, elapsed);
        info!(%job_id, elapsed_ms = elapsed, rows = decoder.rows_seen(), "import job completed");
    }

    async fn process_record(
        &self,
        record: RawRecord,
        email: String,
        is_duplicate: bool,
        options: &ImportOptions,
    ) -> ImportResult {
        // A duplicate under update/replace skips validation: the address was
        // already classified at its first occurrence.
        if is_duplicate {
            let mut result = ImportResult::new(
                record.row_number,
                email.clone(),
                ImportResultStatus::Duplicate,
            );
            result.issues.push("Duplicate email address".to_string());
            let subscriber = SubscriberRecord {
                row_number: record.row_number,
                email,
                fields: record.fields,
                is_duplicate: true,
            };
            match self.sink.persist(&subscriber, options).await {
                Ok(imported) => result.imported = imported,
                Err(e) => {
                    warn!(row = result.row_number, error = %e, "persistence failed");
                    result.error = Some(format!("persistence failed: {e:#}"));
                }
            }
            return result;
        }

        let validation = tokio::time::timeout(
            self.settings.record_timeout,
            self.validator.validate(&email, options.validation_threshold),
        )
        .await;

        let validation = match validation {
            Err(_elapsed) => {
                warn!(row = record.row_number, "validation timed out");
                let mut result =
                    ImportResult::invalid(record.row_number, email, "Validation timed out");
                result.error = Some(VALIDATION_TIMEOUT.to_string());
                return result;
            }
            Ok(Err(e)) => {
                warn!(row = record.row_number, error = %e, "validator failed");
                let mut result =
                    ImportResult::invalid(record.row_number, email, "Validation failed");
                result.error = Some(format!("validator error: {e:#}"));
                return result;
            }
            Ok(Ok(validation)) => validation,
        };

        let mut result = ImportResult::new(record.row_number, email.clone(), validation.status);
        result.confidence_score = validation.confidence_score;
        result.validation_details = Some(validation.details);
        result.issues = validation.issues;
        result.suggestions = validation.suggestions;

        // Only records that passed the threshold are persisted downstream;
        // risky and invalid ones stay report-only.
        if validation.status == ImportResultStatus::Valid {
            let subscriber = SubscriberRecord {
                row_number: record.row_number,
                email,
                fields: record.fields,
                is_duplicate: false,
            };
            match self.sink.persist(&subscriber, options).await {
                Ok(imported) => result.imported = imported,
                Err(e) => {
                    warn!(row = result.row_number, error = %e, "persistence failed");
                    result.error = Some(format!("persistence failed: {e:#}"));
                }
            }
        }
        result
    }

    // ----------------------------------------------------------------------
    // Read side
    // ----------------------------------------------------------------------

    /// Current snapshot of one job.
    pub fn get_job(&self, job_id: Uuid) -> Result<ImportJobSnapshot, ImportError> {
        self.store
            .snapshot(job_id)
            .ok_or(ImportError::JobNotFound(job_id))
    }

    /// Paginated, filterable results of one job, in row order.
    pub fn get_results(
        &self,
        job_id: Uuid,
        filter: &ResultFilter,
        page: usize,
        limit: usize,
    ) -> Result<ResultPage, ImportError> {
        self.store
            .results_page(job_id, filter, page, limit)
            .ok_or(ImportError::JobNotFound(job_id))
    }

    /// Job summaries, newest first.
    pub fn list_jobs(
        &self,
        user_id: Option<Uuid>,
        status: Option<ImportJobStatus>,
        page: usize,
        limit: usize,
    ) -> JobPage {
        self.store.list_jobs(user_id, status, page, limit)
    }

    /// Dashboard aggregates.
    pub fn statistics(&self, user_id: Option<Uuid>) -> ImportStatistics {
        self.store.statistics(user_id)
    }

    /// Retention sweep: drop terminal jobs that finished before `cutoff`.
    pub fn cleanup_old_jobs(&self, cutoff: chrono::DateTime<chrono::Utc>) -> usize {
        let removed = self.store.cleanup_old_jobs(cutoff);
        if removed > 0 {
            info!(removed, "cleaned up old import jobs");
        }
        removed
    }

    /// Request cancellation of a running job. Owner-verified; takes effect
    /// at the next batch boundary.
    pub fn cancel_job(&self, job_id: Uuid, caller_id: Uuid) -> Result<(), ImportError> {
        match self.cancellation.cancel(&job_id, caller_id) {
            CancelOutcome::Cancelled => Ok(()),
            CancelOutcome::NotOwner => Err(ImportError::NotOwner(job_id)),
            // Not in the registry: either it finished (still in the store)
            // or it never existed.
            CancelOutcome::NotFound => match self.store.snapshot(job_id) {
                Some(snapshot) if snapshot.user_id != caller_id => {
                    Err(ImportError::NotOwner(job_id))
                }
                Some(_) => Err(ImportError::JobAlreadyFinished(job_id)),
                None => Err(ImportError::JobNotFound(job_id)),
            },
        }
    }

    /// CSV report over the full result set. Only available once the job has
    /// reached a terminal state; repeated downloads are byte-identical.
    pub fn download_report(&self, job_id: Uuid) -> Result<Vec<u8>, ImportError> {
        let snapshot = self
            .store
            .snapshot(job_id)
            .ok_or(ImportError::JobNotFound(job_id))?;
        if !snapshot.status.is_terminal() {
            return Err(ImportError::JobNotFinished(job_id));
        }
        let results = self
            .store
            .all_results(job_id)
            .ok_or(ImportError::JobNotFound(job_id))?;
        report::generate_report(&results).map_err(ImportError::Internal)
    }
}
