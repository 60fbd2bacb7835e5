//! Types shared by the scheduler, executor and history.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::error::RequestError;

/// Format sentinel for "best combined audio+video".
pub const BEST_FORMAT: &str = "best";

/// Opaque job identifier (Unix milliseconds at creation, strictly increasing per process).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(JobId)
    }
}

/// Lifecycle state: `queued → downloading → {completed | error | cancelled}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Downloading,
    Completed,
    Error,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Downloading => "downloading",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
            JobStatus::Cancelled => "cancelled",
        }
    }

    /// Completed, error and cancelled admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Error | JobStatus::Cancelled
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the caller asked for. Immutable once the job exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRequest {
    pub url: String,
    pub output_dir: PathBuf,
    /// Format id from a probe, or `"best"`. Ignored for audio-only jobs.
    pub format_id: String,
    pub audio_only: bool,
    pub embed_subtitles: bool,
    pub subtitle_lang: Option<String>,
    pub playlist: bool,
}

impl JobRequest {
    /// Single-item, best-quality request.
    pub fn new(url: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            output_dir: output_dir.into(),
            format_id: BEST_FORMAT.to_string(),
            audio_only: false,
            embed_subtitles: false,
            subtitle_lang: None,
            playlist: false,
        }
    }

    pub fn with_format(mut self, format_id: impl Into<String>) -> Self {
        self.format_id = format_id.into();
        self
    }

    pub fn audio_only(mut self, audio_only: bool) -> Self {
        self.audio_only = audio_only;
        self
    }

    pub fn with_subtitles(mut self, lang: impl Into<String>) -> Self {
        self.embed_subtitles = true;
        self.subtitle_lang = Some(lang.into());
        self
    }

    pub fn playlist(mut self, playlist: bool) -> Self {
        self.playlist = playlist;
        self
    }

    /// Subtitle language to embed, if embedding is requested with a real language.
    pub fn subtitle_language(&self) -> Option<&str> {
        if !self.embed_subtitles {
            return None;
        }
        self.subtitle_lang
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty() && *l != "none")
    }

    /// Reject requests the scheduler must never see.
    pub fn validate(&self) -> Result<(), RequestError> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(RequestError::EmptyUrl);
        }
        if let Err(e) = url::Url::parse(url) {
            return Err(RequestError::InvalidUrl {
                url: url.to_string(),
                reason: e.to_string(),
            });
        }
        if !self.audio_only && self.format_id.trim().is_empty() {
            return Err(RequestError::EmptyFormat);
        }
        if self.embed_subtitles && self.subtitle_language().is_none() {
            return Err(RequestError::MissingSubtitleLanguage);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_terminal_states() {
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Downloading.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Error.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&JobStatus::Cancelled).unwrap();
        assert_eq!(json, "\"cancelled\"");
        let back: JobStatus = serde_json::from_str("\"downloading\"").unwrap();
        assert_eq!(back, JobStatus::Downloading);
    }

    #[test]
    fn validate_rejects_empty_and_malformed_urls() {
        assert_eq!(
            JobRequest::new("  ", "/tmp").validate(),
            Err(RequestError::EmptyUrl)
        );
        assert!(matches!(
            JobRequest::new("not a url", "/tmp").validate(),
            Err(RequestError::InvalidUrl { .. })
        ));
        assert!(JobRequest::new("https://example.com/watch?v=1", "/tmp")
            .validate()
            .is_ok());
    }

    #[test]
    fn validate_format_only_matters_for_video() {
        let req = JobRequest::new("https://example.com/v", "/tmp").with_format("");
        assert_eq!(req.validate(), Err(RequestError::EmptyFormat));
        assert!(req.audio_only(true).validate().is_ok());
    }

    #[test]
    fn subtitle_language_requires_real_code() {
        let mut req = JobRequest::new("https://example.com/v", "/tmp").with_subtitles("none");
        assert_eq!(req.subtitle_language(), None);
        assert_eq!(req.validate(), Err(RequestError::MissingSubtitleLanguage));

        req.subtitle_lang = Some("en".into());
        assert_eq!(req.subtitle_language(), Some("en"));
        assert!(req.validate().is_ok());

        req.embed_subtitles = false;
        assert_eq!(req.subtitle_language(), None);
    }

    #[test]
    fn job_id_parses_and_displays() {
        let id: JobId = " 1700000000123 ".parse().unwrap();
        assert_eq!(id, JobId(1_700_000_000_123));
        assert_eq!(id.to_string(), "1700000000123");
    }
}
