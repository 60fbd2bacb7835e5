//! Per-job worker: runs the backend and reports one outcome.

use std::sync::Arc;

use crate::executor::{DownloadOptions, NotificationSink};

use super::queue::Admission;
use super::Shared;

/// How the executor finished, before the scheduler applies it.
#[derive(Debug)]
pub(super) enum Outcome {
    Completed,
    Failed(String),
}

pub(super) async fn run(shared: Arc<Shared>, admission: Admission) {
    let Admission {
        id,
        request,
        cancel,
    } = admission;
    let options = DownloadOptions::for_job(&request, &shared.cfg);

    let sink = {
        let shared = Arc::clone(&shared);
        NotificationSink::new(move |n| shared.on_notification(id, n))
    };
    let backend = Arc::clone(&shared.backend);

    // Separate task so a panicking backend is reported as a failure.
    let task = tokio::spawn(async move { backend.download(&request, &options, sink, cancel).await });

    let outcome = match task.await {
        Ok(Ok(())) => Outcome::Completed,
        // Also reached for a cancelled job; `finish` ignores jobs no longer active.
        Ok(Err(e)) => Outcome::Failed(e.to_string()),
        Err(e) => Outcome::Failed(format!("download task failed: {e}")),
    };
    shared.finish(id, outcome);
}
