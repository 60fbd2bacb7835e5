//! The subset of the tool's info JSON the prober reads.

use serde::Deserialize;
use serde_json::{Map, Value};

/// Top-level info document. Playlists carry `entries`; single items carry
/// `formats` and `subtitles` directly.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InfoJson {
    #[serde(default, rename = "_type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub entries: Option<Vec<Option<InfoJson>>>,
    #[serde(default)]
    pub formats: Option<Vec<RawFormat>>,
    /// Language code to list of tracks, in document order.
    #[serde(default)]
    pub subtitles: Option<Map<String, Value>>,
}

impl InfoJson {
    pub fn is_playlist(&self) -> bool {
        self.entries.is_some() || self.kind.as_deref() == Some("playlist")
    }

    /// First resolvable playlist entry.
    pub fn first_entry(&self) -> Option<&InfoJson> {
        self.entries.as_ref()?.iter().flatten().next()
    }
}

/// One format as listed by the tool. Numeric fields are read as floats: the
/// tool sometimes reports sizes and dimensions with a fractional part.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFormat {
    #[serde(default)]
    pub format_id: Option<String>,
    #[serde(default)]
    pub format_note: Option<String>,
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub vcodec: Option<String>,
    #[serde(default)]
    pub acodec: Option<String>,
    #[serde(default)]
    pub filesize: Option<f64>,
    #[serde(default)]
    pub filesize_approx: Option<f64>,
}

impl RawFormat {
    pub(crate) fn width_px(&self) -> Option<u32> {
        positive_u32(self.width)
    }

    pub(crate) fn height_px(&self) -> Option<u32> {
        positive_u32(self.height)
    }

    pub(crate) fn size(&self) -> Option<u64> {
        self.filesize
            .or(self.filesize_approx)
            .filter(|s| s.is_finite() && *s > 0.0)
            .map(|s| s.round() as u64)
    }
}

fn positive_u32(v: Option<f64>) -> Option<u32> {
    v.filter(|v| v.is_finite() && *v > 0.0)
        .map(|v| v.round().min(u32::MAX as f64) as u32)
}
