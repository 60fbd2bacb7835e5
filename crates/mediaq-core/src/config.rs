use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Optional output extras passed through to the download tool (`[extras]` in config.toml).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtrasConfig {
    /// Embed the thumbnail as cover art.
    #[serde(default)]
    pub embed_thumbnail: bool,
    /// Write title/uploader/etc. into the container metadata.
    #[serde(default)]
    pub embed_metadata: bool,
    /// Do not overwrite files that already exist in the output directory.
    #[serde(default)]
    pub skip_existing: bool,
}

/// Global configuration loaded from `~/.config/mediaq/config.toml`.
///
/// Constructed once by the front end and handed to the scheduler by value;
/// nothing in the core reads configuration from a global.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaqConfig {
    /// Maximum number of jobs in the `downloading` state at once.
    pub max_concurrent_downloads: usize,
    /// Maximum number of history records kept (newest first).
    pub history_limit: usize,
    /// Path or name of the yt-dlp executable.
    pub ytdlp_path: PathBuf,
    /// Directory (or binary) passed to `--ffmpeg-location`; None = let the tool search PATH.
    #[serde(default)]
    pub ffmpeg_location: Option<PathBuf>,
    /// Default output directory for new jobs; None = current directory.
    #[serde(default)]
    pub download_dir: Option<PathBuf>,
    /// Target codec for audio-only jobs.
    pub audio_codec: String,
    /// Target quality for audio-only jobs (kbit/s for lossy codecs).
    pub audio_quality: String,
    /// Seconds between SIGTERM to a cancelled job's process group and SIGKILL.
    pub kill_grace_secs: u64,
    /// Per-subscriber event channel capacity; events beyond it are dropped for that subscriber.
    pub event_buffer: usize,
    #[serde(default)]
    pub extras: ExtrasConfig,
}

impl Default for MediaqConfig {
    fn default() -> Self {
        Self {
            max_concurrent_downloads: 3,
            history_limit: 100,
            ytdlp_path: PathBuf::from("yt-dlp"),
            ffmpeg_location: None,
            download_dir: None,
            audio_codec: "mp3".to_string(),
            audio_quality: "192".to_string(),
            kill_grace_secs: 5,
            event_buffer: 256,
            extras: ExtrasConfig::default(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("mediaq")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<MediaqConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = MediaqConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: MediaqConfig =
        toml::from_str(&data).with_context(|| format!("parse config: {}", path.display()))?;
    Ok(cfg)
}
