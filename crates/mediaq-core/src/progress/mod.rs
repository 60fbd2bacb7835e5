//! Progress normalization.
//!
//! The download tool reports progress in several shapes (exact byte counts,
//! estimated totals, or only a formatted percentage). `ProgressReporter`
//! folds them into one `ProgressEvent` and republishes it on the event bus.

mod notification;
mod reporter;

pub use notification::{Notification, NotificationInfo, NotificationStatus};
pub use reporter::{ProgressReporter, Report};

use crate::job::JobId;

pub const IDLE_RATE: &str = "0 KiB/s";
pub const IDLE_ETA: &str = "00:00";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Downloading,
    Finished,
    Error,
}

/// Canonical progress event for one job.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub job_id: JobId,
    pub phase: Phase,
    /// Always within [0, 100].
    pub progress_pct: f64,
    pub transfer_rate: String,
    pub eta: String,
    pub bytes_done: u64,
    pub bytes_total: Option<u64>,
    /// Tool error text, only for `Phase::Error`.
    pub error: Option<String>,
}
