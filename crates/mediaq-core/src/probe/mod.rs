//! Read-only format/subtitle discovery for a URL before a job is created.
//!
//! Probing never fails from the caller's point of view: any backend error
//! yields an empty result with `is_playlist = false`.

mod info;

pub use info::{InfoJson, RawFormat};

use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

use crate::executor::Backend;
use crate::job::BEST_FORMAT;

/// Format id of the audio-only pseudo-format.
pub const AUDIO_ONLY_FORMAT: &str = "audio_only";
/// Language code of the "no subtitles" sentinel.
pub const NO_SUBTITLES: &str = "none";

/// One selectable format. Pseudo-formats (`audio_only`, `best`) are included.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormatOption {
    pub format_id: String,
    pub format_note: String,
    pub ext: String,
    /// `{height}p`, `Best`, `Audio only` or `unknown`.
    pub resolution: String,
    #[serde(skip)]
    pub height: Option<u32>,
    pub vcodec: String,
    pub acodec: String,
    pub filesize: Option<u64>,
    pub audio_only: bool,
}

impl FormatOption {
    fn audio_only(codec: &str) -> Self {
        Self {
            format_id: AUDIO_ONLY_FORMAT.to_string(),
            format_note: format!("Audio only ({})", codec.to_uppercase()),
            ext: codec.to_string(),
            resolution: "Audio only".to_string(),
            height: None,
            vcodec: "none".to_string(),
            acodec: codec.to_string(),
            filesize: None,
            audio_only: true,
        }
    }

    fn best() -> Self {
        Self {
            format_id: BEST_FORMAT.to_string(),
            format_note: "Best quality".to_string(),
            ext: "mp4".to_string(),
            resolution: "Best".to_string(),
            height: None,
            vcodec: "best".to_string(),
            acodec: "best".to_string(),
            filesize: None,
            audio_only: false,
        }
    }

    fn from_raw(f: &RawFormat) -> Self {
        let height = f.height_px();
        Self {
            format_id: f.format_id.clone().unwrap_or_default(),
            format_note: f.format_note.clone().unwrap_or_default(),
            ext: f.ext.clone().unwrap_or_else(|| "mp4".to_string()),
            resolution: height.map_or_else(|| "unknown".to_string(), |h| format!("{h}p")),
            height,
            vcodec: f.vcodec.clone().unwrap_or_else(|| "unknown".to_string()),
            acodec: f.acodec.clone().unwrap_or_else(|| "unknown".to_string()),
            filesize: f.size(),
            audio_only: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubtitleOption {
    pub lang_code: String,
    pub lang_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeResult {
    pub formats: Vec<FormatOption>,
    pub subtitles: Vec<SubtitleOption>,
    pub is_playlist: bool,
}

impl ProbeResult {
    pub fn empty() -> Self {
        Self {
            formats: Vec::new(),
            subtitles: Vec::new(),
            is_playlist: false,
        }
    }

    /// Build the selectable lists from an info document. Collections are
    /// described by their first entry.
    pub fn from_info(info: &InfoJson, audio_codec: &str) -> Self {
        let is_playlist = info.is_playlist();
        let item = if is_playlist {
            match info.first_entry() {
                Some(first) => first,
                None => {
                    return Self {
                        is_playlist,
                        ..Self::empty()
                    }
                }
            }
        } else {
            info
        };
        Self {
            formats: format_options(item, audio_codec),
            subtitles: subtitle_options(item),
            is_playlist,
        }
    }
}

fn format_options(item: &InfoJson, audio_codec: &str) -> Vec<FormatOption> {
    let mut seen = HashSet::new();
    let mut video: Vec<FormatOption> = item
        .formats
        .iter()
        .flatten()
        .filter(|f| f.vcodec.as_deref() != Some("none"))
        .filter(|f| {
            let key = (f.width_px().unwrap_or(0), f.height_px().unwrap_or(0));
            seen.insert(key)
        })
        .map(FormatOption::from_raw)
        .collect();
    // Stable: equal heights keep first-seen order.
    video.sort_by(|a, b| b.height.unwrap_or(0).cmp(&a.height.unwrap_or(0)));

    let mut out = Vec::with_capacity(video.len() + 2);
    out.push(FormatOption::audio_only(audio_codec));
    out.push(FormatOption::best());
    out.extend(video);
    out
}

fn subtitle_options(item: &InfoJson) -> Vec<SubtitleOption> {
    let mut out = vec![SubtitleOption {
        lang_code: NO_SUBTITLES.to_string(),
        lang_name: "None".to_string(),
    }];
    for (code, tracks) in item.subtitles.iter().flatten() {
        let name = tracks
            .as_array()
            .and_then(|t| t.first())
            .and_then(|t| t.get("name"))
            .and_then(Value::as_str)
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(code);
        out.push(SubtitleOption {
            lang_code: code.clone(),
            lang_name: name.to_string(),
        });
    }
    out
}

/// Runs probes through a backend and folds failures into an empty result.
#[derive(Clone)]
pub struct MetadataProber {
    backend: Arc<dyn Backend>,
    audio_codec: String,
}

impl MetadataProber {
    pub fn new(backend: Arc<dyn Backend>, audio_codec: impl Into<String>) -> Self {
        Self {
            backend,
            audio_codec: audio_codec.into(),
        }
    }

    pub async fn probe(&self, url: &str) -> ProbeResult {
        let url = url.trim();
        if url.is_empty() {
            tracing::warn!("probe requested for empty URL");
            return ProbeResult::empty();
        }
        match self.backend.probe(url).await {
            Ok(info) => {
                let result = ProbeResult::from_info(&info, &self.audio_codec);
                tracing::debug!(
                    url,
                    formats = result.formats.len(),
                    subtitles = result.subtitles.len(),
                    is_playlist = result.is_playlist,
                    "probe finished"
                );
                result
            }
            Err(e) => {
                tracing::warn!(url, "probe failed: {}", e);
                ProbeResult::empty()
            }
        }
    }
}
