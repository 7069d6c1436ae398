//! Progress reporting
//!
//! Rate and ETA are derived by whoever samples the job twice, against a
//! monotonic clock. The job store itself carries no polling-client state.

use std::time::Instant;

use crate::types::{ImportJobSnapshot, ProgressSample};

/// Derives throughput and ETA from successive job snapshots. One reporter
/// per observing client; its memory is just the previous observation.
#[derive(Debug, Default)]
pub struct ProgressReporter {
    last: Option<(Instant, u64)>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one snapshot into the reporter and return the derived view.
    pub fn observe(&mut self, job: &ImportJobSnapshot) -> ProgressSample {
        self.observe_at(Instant::now(), job)
    }

    fn observe_at(&mut self, now: Instant, job: &ImportJobSnapshot) -> ProgressSample {
        let processed = job.processed_records;
        let rate = match self.last {
            Some((then, prev)) if processed >= prev => {
                let secs = now.duration_since(then).as_secs_f64();
                if secs > 0.0 {
                    (processed - prev) as f64 / secs
                } else {
                    0.0
                }
            }
            _ => 0.0,
        };
        self.last = Some((now, processed));

        let eta_seconds = match job.total_records {
            Some(total) if rate > 0.0 && processed < total => {
                Some(((total - processed) as f64 / rate).ceil() as u64)
            }
            _ => None,
        };

        ProgressSample {
            processed,
            total: job.total_records,
            percentage: job.progress_percentage(),
            rate,
            eta_seconds,
        }
    }
}
