//! Translate raw notifications into `ProgressEvent`s and publish them.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::events::{EventBus, JobEvent};
use crate::job::JobId;

use super::{Notification, NotificationStatus, Phase, ProgressEvent, IDLE_ETA, IDLE_RATE};

/// Which metadata fields have already been resolved for a job.
#[derive(Debug, Default, Clone, Copy)]
struct Latch {
    title: bool,
    thumbnail: bool,
}

/// Result of translating one notification.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub event: ProgressEvent,
    /// Set only the first time a title is seen for the job.
    pub title: Option<String>,
    /// Set only the first time a thumbnail is seen for the job.
    pub thumbnail: Option<String>,
}

/// Stateless apart from per-job latch flags. Publishing uses the bus's
/// non-blocking send, so callers on an executor path never wait on subscribers.
pub struct ProgressReporter {
    bus: EventBus,
    latches: Mutex<HashMap<JobId, Latch>>,
}

impl ProgressReporter {
    pub fn new(bus: EventBus) -> Self {
        Self {
            bus,
            latches: Mutex::new(HashMap::new()),
        }
    }

    /// Normalize `n` for `job_id`. Metadata latches are updated here.
    pub fn translate(&self, job_id: JobId, n: &Notification) -> Report {
        let event = normalize(job_id, n);

        let mut latches = self.latches.lock().unwrap_or_else(PoisonError::into_inner);
        let latch = latches.entry(job_id).or_default();
        let title = non_empty(n.info.title.as_deref()).filter(|_| !latch.title);
        if title.is_some() {
            latch.title = true;
        }
        let thumbnail = non_empty(n.info.thumbnail.as_deref()).filter(|_| !latch.thumbnail);
        if thumbnail.is_some() {
            latch.thumbnail = true;
        }

        Report {
            event,
            title,
            thumbnail,
        }
    }

    /// Send the report's events to subscribers. Error-phase events are not
    /// republished as progress; the scheduler turns them into a terminal status.
    pub fn publish(&self, report: &Report) {
        let job_id = report.event.job_id;
        if let Some(ref title) = report.title {
            self.bus.publish(JobEvent::TitleResolved {
                job_id,
                title: title.clone(),
            });
        }
        if let Some(ref thumbnail) = report.thumbnail {
            self.bus.publish(JobEvent::ThumbnailResolved {
                job_id,
                thumbnail: thumbnail.clone(),
            });
        }
        if report.event.phase != Phase::Error {
            self.bus.publish(JobEvent::Progress(report.event.clone()));
        }
    }

    /// Drop latch state once the job is terminal.
    pub fn forget(&self, job_id: JobId) {
        self.latches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&job_id);
    }
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

fn normalize(job_id: JobId, n: &Notification) -> ProgressEvent {
    let done = n.done().unwrap_or(0);
    let total = n.total();
    match n.status {
        NotificationStatus::Finished => {
            let total = total.unwrap_or(done);
            ProgressEvent {
                job_id,
                phase: Phase::Finished,
                progress_pct: 100.0,
                transfer_rate: IDLE_RATE.to_string(),
                eta: IDLE_ETA.to_string(),
                bytes_done: total,
                bytes_total: Some(total),
                error: None,
            }
        }
        NotificationStatus::Error => ProgressEvent {
            job_id,
            phase: Phase::Error,
            progress_pct: 0.0,
            transfer_rate: IDLE_RATE.to_string(),
            eta: IDLE_ETA.to_string(),
            bytes_done: done,
            bytes_total: total,
            error: Some(
                n.error
                    .clone()
                    .unwrap_or_else(|| "Unknown error".to_string()),
            ),
        },
        NotificationStatus::Downloading | NotificationStatus::Unknown => {
            let pct = match (n.done(), total) {
                (Some(done), Some(total)) => done as f64 / total as f64 * 100.0,
                _ => n.percent_str.as_deref().and_then(parse_percent).unwrap_or(0.0),
            };
            ProgressEvent {
                job_id,
                phase: Phase::Downloading,
                progress_pct: clamp_pct(pct),
                transfer_rate: display_or(n.speed_str.as_deref(), IDLE_RATE),
                eta: display_or(n.eta_str.as_deref(), IDLE_ETA),
                bytes_done: done,
                bytes_total: total,
                error: None,
            }
        }
    }
}

fn clamp_pct(pct: f64) -> f64 {
    if pct.is_nan() {
        return 0.0;
    }
    pct.clamp(0.0, 100.0)
}

fn display_or(s: Option<&str>, fallback: &str) -> String {
    s.map(strip_ansi)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

/// Parse strings like `" 42.5%"` or `"\x1b[0;94m 42.5%\x1b[0m"`.
pub(crate) fn parse_percent(s: &str) -> Option<f64> {
    let cleaned = strip_ansi(s);
    cleaned
        .trim()
        .trim_end_matches('%')
        .trim()
        .parse::<f64>()
        .ok()
}

/// Remove ANSI CSI escape sequences (colour codes the tool adds to display strings).
fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\u{1b}' {
            if chars.peek() == Some(&'[') {
                chars.next();
                for c in chars.by_ref() {
                    if c.is_ascii_alphabetic() {
                        break;
                    }
                }
            }
            continue;
        }
        out.push(c);
    }
    out
}
