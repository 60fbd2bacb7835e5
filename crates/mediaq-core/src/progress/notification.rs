//! Raw progress notifications as the download tool reports them.
//!
//! The field names follow the tool's progress dictionary so a JSON dump of
//! that dictionary deserializes directly. Every field is optional: the tool
//! is not trusted to send any particular subset.

use serde::Deserialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    #[default]
    Downloading,
    Finished,
    Error,
    #[serde(other)]
    Unknown,
}

/// Metadata about the item being downloaded, when the tool knows it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NotificationInfo {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

/// One progress callback from the external tool.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Notification {
    #[serde(default)]
    pub status: NotificationStatus,
    #[serde(default)]
    pub downloaded_bytes: Option<f64>,
    #[serde(default)]
    pub total_bytes: Option<f64>,
    #[serde(default)]
    pub total_bytes_estimate: Option<f64>,
    #[serde(default, rename = "_speed_str")]
    pub speed_str: Option<String>,
    #[serde(default, rename = "_eta_str")]
    pub eta_str: Option<String>,
    #[serde(default, rename = "_percent_str")]
    pub percent_str: Option<String>,
    #[serde(default)]
    pub info: NotificationInfo,
    #[serde(default)]
    pub error: Option<String>,
}

impl Notification {
    pub fn downloading() -> Self {
        Self::default()
    }

    pub fn finished() -> Self {
        Self {
            status: NotificationStatus::Finished,
            ..Self::default()
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: NotificationStatus::Error,
            error: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn bytes(mut self, done: u64, total: Option<u64>) -> Self {
        self.downloaded_bytes = Some(done as f64);
        self.total_bytes = total.map(|t| t as f64);
        self
    }

    pub fn estimate(mut self, done: u64, estimate: u64) -> Self {
        self.downloaded_bytes = Some(done as f64);
        self.total_bytes_estimate = Some(estimate as f64);
        self
    }

    pub fn percent(mut self, percent: impl Into<String>) -> Self {
        self.percent_str = Some(percent.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.info.title = Some(title.into());
        self
    }

    pub fn thumbnail(mut self, thumbnail: impl Into<String>) -> Self {
        self.info.thumbnail = Some(thumbnail.into());
        self
    }

    /// Definite total if present and positive, else a positive estimate.
    pub(crate) fn total(&self) -> Option<u64> {
        self.total_bytes
            .filter(|t| t.is_finite() && *t > 0.0)
            .or_else(|| {
                self.total_bytes_estimate
                    .filter(|t| t.is_finite() && *t > 0.0)
            })
            .map(|t| t.round() as u64)
    }

    pub(crate) fn done(&self) -> Option<u64> {
        self.downloaded_bytes
            .filter(|d| d.is_finite() && *d >= 0.0)
            .map(|d| d.round() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_tool_progress_dict() {
        let json = r#"{
            "status": "downloading",
            "downloaded_bytes": 1024,
            "total_bytes": null,
            "total_bytes_estimate": 4096.5,
            "_speed_str": "1.00MiB/s",
            "_eta_str": "00:03",
            "_percent_str": " 25.0%",
            "filename": "x.mp4"
        }"#;
        let n: Notification = serde_json::from_str(json).unwrap();
        assert_eq!(n.status, NotificationStatus::Downloading);
        assert_eq!(n.done(), Some(1024));
        assert_eq!(n.total(), Some(4097));
        assert_eq!(n.speed_str.as_deref(), Some("1.00MiB/s"));
        assert_eq!(n.info, NotificationInfo::default());
    }

    #[test]
    fn unknown_status_is_tolerated() {
        let n: Notification = serde_json::from_str(r#"{"status": "started"}"#).unwrap();
        assert_eq!(n.status, NotificationStatus::Unknown);
    }

    #[test]
    fn zero_total_is_treated_as_unknown() {
        let n = Notification::downloading().bytes(10, Some(0));
        assert_eq!(n.total(), None);
    }
}
