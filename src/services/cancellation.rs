//! Cancellation of running import jobs
//!
//! Cooperative and owner-verified: a cancel request flips a token that the
//! batch loop reads between batches, never mid-batch, so a cancelled job's
//! counters always cover whole batches. Each running job holds a `JobGuard`;
//! dropping it (normal exit or panic) deregisters the job.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

struct ActiveJob {
    token: CancellationToken,
    owner_id: Uuid,
}

/// What a cancel request achieved. `NotFound` also covers jobs that already
/// finished, since finished jobs leave the registry; the caller decides how
/// to report that.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// Token flipped; the job will stop at its next batch boundary.
    Cancelled,
    /// No active job under this id.
    NotFound,
    /// Active job, but owned by a different user. The token is untouched.
    NotOwner,
}

/// Deregisters its job when dropped.
pub struct JobGuard {
    job_id: Uuid,
    registry: CancellationRegistry,
}

impl Drop for JobGuard {
    fn drop(&mut self) {
        self.registry.jobs.lock().remove(&self.job_id);
    }
}

/// Shared map of active jobs, keyed by job id.
#[derive(Clone, Default)]
pub struct CancellationRegistry {
    jobs: Arc<Mutex<HashMap<Uuid, ActiveJob>>>,
}

impl CancellationRegistry {
    /// Track a job for the duration of the returned guard.
    pub fn register(&self, job_id: Uuid, owner_id: Uuid) -> JobGuard {
        self.jobs.lock().insert(
            job_id,
            ActiveJob {
                token: CancellationToken::new(),
                owner_id,
            },
        );
        JobGuard {
            job_id,
            registry: self.clone(),
        }
    }

    /// Flip the job's token, provided `caller_id` owns it.
    pub fn cancel(&self, job_id: &Uuid, caller_id: Uuid) -> CancelOutcome {
        let jobs = self.jobs.lock();
        let Some(job) = jobs.get(job_id) else {
            return CancelOutcome::NotFound;
        };
        if job.owner_id != caller_id {
            return CancelOutcome::NotOwner;
        }
        job.token.cancel();
        CancelOutcome::Cancelled
    }

    /// Read by the batch loop between batches.
    pub fn is_cancelled(&self, job_id: &Uuid) -> bool {
        match self.jobs.lock().get(job_id) {
            Some(job) => job.token.is_cancelled(),
            None => false,
        }
    }

    #[cfg(test)]
    fn contains(&self, job_id: &Uuid) -> bool {
        self.jobs.lock().contains_key(job_id)
    }
}
