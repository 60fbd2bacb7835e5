//! Job scheduler: bounded active set, FIFO pending queue, cancellation, and
//! the terminal-transition path into history.
//!
//! All queue state sits behind one mutex. Admission (inspect active count,
//! pop queue head, promote) happens entirely inside that lock, so concurrent
//! callers never over-commit the concurrency ceiling. Workers run on the
//! Tokio runtime; nothing here blocks on a download or on disk I/O.
//!
//! Terminal transitions race (cancel vs. completion); whichever removes the
//! job from the active set first wins and the other is ignored.

mod queue;
mod worker;


use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;

use crate::config::MediaqConfig;
use crate::error::RequestError;
use crate::events::{EventBus, JobEvent, SubscriberId, Subscription};
use crate::executor::Backend;
use crate::history::{HistoryRecord, HistoryStore, PendingWrite};
use crate::job::{Job, JobId, JobIdGen, JobRequest, JobStatus};
use crate::probe::{MetadataProber, ProbeResult};
use crate::progress::{Notification, Phase, ProgressEvent, ProgressReporter, IDLE_ETA, IDLE_RATE};

use queue::QueueState;
use worker::Outcome;

/// Cloneable handle; all clones drive the same queue.
#[derive(Clone)]
pub struct Scheduler {
    shared: Arc<Shared>,
}

pub(crate) struct Shared {
    cfg: MediaqConfig,
    state: Mutex<QueueState>,
    /// Locked after `state` when both are needed.
    history: Mutex<HistoryStore>,
    ids: JobIdGen,
    bus: EventBus,
    reporter: ProgressReporter,
    backend: Arc<dyn Backend>,
    prober: MetadataProber,
    runtime: Handle,
}

impl Scheduler {
    /// Workers and history writes are spawned on `runtime`.
    pub fn new(
        cfg: MediaqConfig,
        backend: Arc<dyn Backend>,
        history: HistoryStore,
        runtime: Handle,
    ) -> Self {
        let bus = EventBus::new(cfg.event_buffer);
        let prober = MetadataProber::new(Arc::clone(&backend), cfg.audio_codec.clone());
        tracing::debug!(
            ceiling = cfg.max_concurrent_downloads,
            history = history.len(),
            "scheduler created"
        );
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState::new(cfg.max_concurrent_downloads)),
                history: Mutex::new(history),
                ids: JobIdGen::new(),
                reporter: ProgressReporter::new(bus.clone()),
                bus,
                backend,
                prober,
                runtime,
                cfg,
            }),
        }
    }

    /// Validate and enqueue a request, then try to admit it. Never waits.
    pub fn submit(&self, request: JobRequest) -> Result<JobId, RequestError> {
        request.validate()?;
        let shared = &self.shared;
        let id = shared.ids.next();
        let url = request.url.clone();
        {
            let mut state = shared.lock_state();
            state.enqueue(Job::new(id, request));
            shared.bus.publish(JobEvent::Created { job_id: id, url });
            shared.bus.publish(JobEvent::StatusChanged {
                job_id: id,
                status: JobStatus::Queued,
            });
        }
        tracing::info!(job_id = %id, "job queued");
        shared.admit_next();
        Ok(id)
    }

    /// Cancel a queued or running job. Returns false if the id is not live
    /// (unknown or already terminal).
    pub fn cancel(&self, id: JobId) -> bool {
        self.shared.cancel(id)
    }

    /// Cancel every live job. Returns how many were cancelled.
    pub fn cancel_all(&self) -> usize {
        let ids = self.shared.lock_state().live_ids();
        ids.into_iter().filter(|id| self.shared.cancel(*id)).count()
    }

    /// Active jobs (by id) followed by queued jobs (FIFO order).
    pub fn snapshot(&self) -> Vec<Job> {
        self.shared.lock_state().snapshot()
    }

    pub fn job(&self, id: JobId) -> Option<Job> {
        self.shared.lock_state().get(id).cloned()
    }

    /// Live status, else the status recorded in history.
    pub fn status(&self, id: JobId) -> Option<JobStatus> {
        if let Some(job) = self.shared.lock_state().get(id) {
            return Some(job.status);
        }
        self.shared
            .lock_history()
            .records()
            .iter()
            .find(|r| r.download_id == id)
            .map(|r| r.status)
    }

    pub fn active_count(&self) -> usize {
        self.shared.lock_state().active_len()
    }

    pub fn queued_count(&self) -> usize {
        self.shared.lock_state().pending_len()
    }

    pub fn concurrency_limit(&self) -> usize {
        self.shared.lock_state().ceiling()
    }

    /// No queued or active jobs.
    pub fn is_idle(&self) -> bool {
        let state = self.shared.lock_state();
        state.active_len() == 0 && state.pending_len() == 0
    }

    /// Newest first.
    pub fn history(&self) -> Vec<HistoryRecord> {
        self.shared.lock_history().records().to_vec()
    }

    pub fn clear_history(&self) {
        let pending = {
            let mut history = self.shared.lock_history();
            history.clear_records();
            history.pending_write()
        };
        tracing::info!("history cleared");
        self.shared.persist(pending);
    }

    /// Drop one history entry. Returns false if no record has that id.
    pub fn forget(&self, id: JobId) -> bool {
        let pending = {
            let mut history = self.shared.lock_history();
            if !history.remove(id) {
                return false;
            }
            history.pending_write()
        };
        self.shared.persist(pending);
        true
    }

    /// Write the current history synchronously. Used before process exit.
    pub fn save_history(&self) {
        let pending = self.shared.lock_history().pending_write();
        if let Some(p) = pending {
            p.write();
        }
    }

    pub fn subscribe(&self) -> Subscription {
        self.shared.bus.subscribe()
    }

    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.shared.bus.unsubscribe(id)
    }

    /// Formats and subtitles for `url`; empty on any failure.
    pub async fn probe(&self, url: &str) -> ProbeResult {
        self.shared.prober.probe(url).await
    }
}

impl Shared {
    fn lock_state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_history(&self) -> MutexGuard<'_, HistoryStore> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fill free slots from the queue head and start a worker for each.
    fn admit_next(self: &Arc<Self>) {
        let mut state = self.lock_state();
        while let Some(admission) = state.promote_next() {
            tracing::info!(job_id = %admission.id, active = state.active_len(), "job started");
            self.bus.publish(JobEvent::StatusChanged {
                job_id: admission.id,
                status: JobStatus::Downloading,
            });
            self.runtime
                .spawn(worker::run(Arc::clone(self), admission));
        }
    }

    /// Executor notification for `id`. Dropped if the job is no longer active.
    fn on_notification(&self, id: JobId, n: Notification) {
        let mut state = self.lock_state();
        let Some(active) = state.active_mut(id) else {
            tracing::trace!(job_id = %id, "notification for inactive job dropped");
            return;
        };
        let mut report = self.reporter.translate(id, &n);
        if report.event.phase == Phase::Error {
            tracing::debug!(job_id = %id, error = ?report.event.error, "tool reported error");
            active.last_error = report.event.error.clone();
        } else {
            report.event.progress_pct = active.job.apply_progress(&report.event);
        }
        if let Some(ref title) = report.title {
            active.job.title = Some(title.clone());
        }
        if let Some(ref thumbnail) = report.thumbnail {
            active.job.thumbnail = Some(thumbnail.clone());
        }
        self.reporter.publish(&report);
    }

    /// Terminal transition reported by a worker.
    fn finish(self: &Arc<Self>, id: JobId, outcome: Outcome) {
        let pending = {
            let mut state = self.lock_state();
            let Some(active) = state.remove_active(id) else {
                tracing::debug!(job_id = %id, ?outcome, "outcome for inactive job ignored");
                return;
            };
            let mut job = active.job;
            match outcome {
                Outcome::Completed => {
                    self.complete_progress(&mut job);
                    job.finish(JobStatus::Completed, None);
                    tracing::info!(job_id = %id, title = ?job.title, "job completed");
                }
                Outcome::Failed(message) => {
                    let message = Some(message)
                        .filter(|m| !m.trim().is_empty())
                        .or(active.last_error);
                    job.finish(JobStatus::Error, message);
                    tracing::warn!(job_id = %id, error = ?job.error_message, "job failed");
                }
            }
            self.commit_terminal(&job)
        };
        self.persist(pending);
        self.admit_next();
    }

    fn cancel(self: &Arc<Self>, id: JobId) -> bool {
        let (pending, was_active) = {
            let mut state = self.lock_state();
            let (mut job, was_active) = if let Some(job) = state.remove_pending(id) {
                (job, false)
            } else if let Some(active) = state.remove_active(id) {
                active.cancel.cancel();
                (active.job, true)
            } else {
                return false;
            };
            job.finish(JobStatus::Cancelled, None);
            tracing::info!(job_id = %id, was_active, "job cancelled");
            (self.commit_terminal(&job), was_active)
        };
        self.persist(pending);
        if was_active {
            self.admit_next();
        }
        true
    }

    /// Publish a final 100% event if the tool never reported one.
    fn complete_progress(&self, job: &mut Job) {
        let size = job.file_size.max(job.downloaded_bytes);
        let event = ProgressEvent {
            job_id: job.id,
            phase: Phase::Finished,
            progress_pct: 100.0,
            transfer_rate: IDLE_RATE.to_string(),
            eta: IDLE_ETA.to_string(),
            bytes_done: size,
            bytes_total: Some(size),
            error: None,
        };
        let already_done = job.progress >= 100.0;
        job.apply_progress(&event);
        if !already_done {
            self.bus.publish(JobEvent::Progress(event));
        }
    }

    /// Announce the terminal state and record it. Caller holds the state lock.
    fn commit_terminal(&self, job: &Job) -> Option<PendingWrite> {
        self.reporter.forget(job.id);
        self.bus.publish(JobEvent::StatusChanged {
            job_id: job.id,
            status: job.status,
        });
        self.bus.publish(JobEvent::Finished {
            job_id: job.id,
            status: job.status,
            error: job.error_message.clone(),
        });
        let mut history = self.lock_history();
        history.push(job.to_record());
        history.pending_write()
    }

    /// Write a history snapshot off the caller's path.
    fn persist(&self, pending: Option<PendingWrite>) {
        if let Some(p) = pending {
            self.runtime.spawn_blocking(move || p.write());
        }
    }
}
