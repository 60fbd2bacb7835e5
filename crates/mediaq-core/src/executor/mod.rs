//! Executor adapter: turns a job into an invocation of the external download
//! tool and streams its notifications back.
//!
//! `Backend` is the seam between the scheduler and the tool. `YtDlp` is the
//! production implementation; tests drive the scheduler with scripted backends.

mod line;
mod options;
mod outcome;
mod process;
mod ytdlp;

pub use options::{DownloadOptions, Postprocessor, AUDIO_FORMAT_SELECTOR, OUTPUT_NAME_TEMPLATE};
pub use outcome::{classify_exit, ExitReport};
pub use ytdlp::YtDlp;

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::{ExecError, ProbeError};
use crate::job::JobRequest;
use crate::probe::InfoJson;
use crate::progress::Notification;

/// Where a backend delivers progress notifications for one job.
///
/// Delivery must not block: the scheduler's handler only takes short locks
/// and publishes with non-blocking sends.
#[derive(Clone)]
pub struct NotificationSink(Arc<dyn Fn(Notification) + Send + Sync>);

impl NotificationSink {
    pub fn new(f: impl Fn(Notification) + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn send(&self, n: Notification) {
        (self.0)(n)
    }
}

impl fmt::Debug for NotificationSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NotificationSink")
    }
}

#[async_trait]
pub trait Backend: Send + Sync {
    /// Run one download to completion.
    ///
    /// Returns `Ok(())` when the job should be marked completed. When `cancel`
    /// fires the backend stops the work and returns `ExecError::Cancelled`.
    async fn download(
        &self,
        request: &JobRequest,
        options: &DownloadOptions,
        sink: NotificationSink,
        cancel: CancellationToken,
    ) -> Result<(), ExecError>;

    /// Fetch the info document for `url` without downloading.
    async fn probe(&self, url: &str) -> Result<InfoJson, ProbeError>;
}
