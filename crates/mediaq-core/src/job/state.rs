//! Runtime state of one job.

use crate::history::HistoryRecord;
use crate::progress::{ProgressEvent, IDLE_ETA, IDLE_RATE};

use super::{unix_timestamp, JobId, JobRequest, JobStatus};

/// A job as held by the scheduler.
///
/// While queued the scheduler owns it; while active only the job's worker
/// writes the progress fields and the scheduler only touches `status` and
/// `completed_at` at the terminal transition.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub request: JobRequest,
    pub status: JobStatus,
    pub progress: f64,
    pub speed: String,
    pub eta: String,
    pub title: Option<String>,
    pub thumbnail: Option<String>,
    pub error_message: Option<String>,
    pub file_size: u64,
    pub downloaded_bytes: u64,
    pub completed_at: Option<i64>,
}

impl Job {
    pub fn new(id: JobId, request: JobRequest) -> Self {
        Self {
            id,
            request,
            status: JobStatus::Queued,
            progress: 0.0,
            speed: IDLE_RATE.to_string(),
            eta: IDLE_ETA.to_string(),
            title: None,
            thumbnail: None,
            error_message: None,
            file_size: 0,
            downloaded_bytes: 0,
            completed_at: None,
        }
    }

    /// Fold a progress event into the job and return the progress value to
    /// publish. Progress never decreases and a known size never shrinks, even
    /// when the tool moves on to the next stream or playlist item.
    pub fn apply_progress(&mut self, event: &ProgressEvent) -> f64 {
        if event.progress_pct > self.progress {
            self.progress = event.progress_pct.min(100.0);
        }
        self.speed = event.transfer_rate.clone();
        self.eta = event.eta.clone();
        if let Some(total) = event.bytes_total {
            self.file_size = self.file_size.max(total);
        }
        self.downloaded_bytes = event.bytes_done;
        self.progress
    }

    /// Move to a terminal status and stamp the completion time.
    pub(crate) fn finish(&mut self, status: JobStatus, error: Option<String>) {
        debug_assert!(status.is_terminal());
        self.status = status;
        self.completed_at = Some(unix_timestamp());
        if status == JobStatus::Error {
            self.error_message = error.or_else(|| Some("Unknown error".to_string()));
        }
    }

    pub fn to_record(&self) -> HistoryRecord {
        HistoryRecord {
            download_id: self.id,
            url: self.request.url.clone(),
            output_path: self.request.output_dir.clone(),
            format_id: self.request.format_id.clone(),
            audio_only: self.request.audio_only,
            embed_subtitles: self.request.embed_subtitles,
            subtitle_lang: self.request.subtitle_lang.clone(),
            playlist: self.request.playlist,
            status: self.status,
            title: self.title.clone().unwrap_or_default(),
            thumbnail: self.thumbnail.clone().unwrap_or_default(),
            error_message: self.error_message.clone(),
            completed_time: self.completed_at,
            file_size: self.file_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::Phase;

    fn event(pct: f64, done: u64, total: Option<u64>) -> ProgressEvent {
        ProgressEvent {
            job_id: JobId(1),
            phase: Phase::Downloading,
            progress_pct: pct,
            transfer_rate: "1MiB/s".into(),
            eta: "00:10".into(),
            bytes_done: done,
            bytes_total: total,
            error: None,
        }
    }

    fn job() -> Job {
        Job::new(JobId(1), JobRequest::new("https://example.com/v", "/tmp"))
    }

    #[test]
    fn new_job_has_defaults() {
        let j = job();
        assert_eq!(j.status, JobStatus::Queued);
        assert_eq!(j.progress, 0.0);
        assert_eq!(j.speed, IDLE_RATE);
        assert_eq!(j.eta, IDLE_ETA);
        assert!(j.completed_at.is_none());
    }

    #[test]
    fn progress_never_decreases() {
        let mut j = job();
        assert_eq!(j.apply_progress(&event(40.0, 40, Some(100))), 40.0);
        // Second stream starts from zero.
        assert_eq!(j.apply_progress(&event(5.0, 5, Some(50))), 40.0);
        assert_eq!(j.apply_progress(&event(90.0, 45, Some(50))), 90.0);
        assert_eq!(j.progress, 90.0);
    }

    #[test]
    fn file_size_never_shrinks() {
        let mut j = job();
        j.apply_progress(&event(10.0, 10, Some(100)));
        j.apply_progress(&event(20.0, 10, Some(50)));
        assert_eq!(j.file_size, 100);
        j.apply_progress(&event(30.0, 10, None));
        assert_eq!(j.file_size, 100);
        assert_eq!(j.downloaded_bytes, 10);
    }

    #[test]
    fn finish_error_keeps_message() {
        let mut j = job();
        j.finish(JobStatus::Error, Some("boom".into()));
        assert_eq!(j.status, JobStatus::Error);
        assert_eq!(j.error_message.as_deref(), Some("boom"));
        assert!(j.completed_at.is_some());
    }

    #[test]
    fn record_snapshots_request_and_runtime() {
        let mut j = job();
        j.title = Some("T".into());
        j.file_size = 42;
        j.finish(JobStatus::Completed, None);
        let r = j.to_record();
        assert_eq!(r.download_id, JobId(1));
        assert_eq!(r.status, JobStatus::Completed);
        assert_eq!(r.title, "T");
        assert_eq!(r.thumbnail, "");
        assert_eq!(r.file_size, 42);
        assert!(r.error_message.is_none());
        assert_eq!(r.format_id, "best");
    }
}
