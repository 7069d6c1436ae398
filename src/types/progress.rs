//! Progress reporting DTO
//!
//! Rate and ETA are derived from repeated snapshots by the reporter, never
//! stored on the job itself.

use serde::{Deserialize, Serialize};

/// Derived progress view for a polling client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSample {
    pub processed: u64,
    /// None while the decoder has not finished counting rows.
    pub total: Option<u64>,
    /// 0 when the total is unknown or zero.
    pub percentage: f64,
    /// Records per second observed between the last two samples.
    pub rate: f64,
    /// None when no throughput has been observed yet or the job is done.
    /// "No ETA" is a valid, displayable state, not an error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta_seconds: Option<u64>,
}
