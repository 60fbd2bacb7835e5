//! Derive the download tool's configuration from a job request.

use std::path::{Path, PathBuf};

use crate::config::{ExtrasConfig, MediaqConfig};
use crate::job::JobRequest;

use super::line;

/// Format selector used for audio-only jobs.
pub const AUDIO_FORMAT_SELECTOR: &str = "bestaudio/best";

/// Output file name template: resolved title plus original extension.
pub const OUTPUT_NAME_TEMPLATE: &str = "%(title)s.%(ext)s";

/// Steps the tool runs after a file is downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Postprocessor {
    /// Transcode/extract the audio stream at a fixed quality.
    ExtractAudio { codec: String, quality: String },
    /// Embed the fetched subtitle track into the container. Skipped when the
    /// track is already present in the output.
    EmbedSubtitle { already_have_subtitle: bool },
}

/// Everything the tool needs to run one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOptions {
    pub format_selector: String,
    pub output_template: PathBuf,
    /// Unavailable playlist entries are skipped instead of failing the job.
    pub skip_unavailable_playlist_items: bool,
    /// Download only the addressed item even if the URL names a collection.
    pub restrict_to_single_item: bool,
    pub write_subtitles: bool,
    pub subtitle_languages: Vec<String>,
    pub postprocessors: Vec<Postprocessor>,
    pub ffmpeg_location: Option<PathBuf>,
    pub extras: ExtrasConfig,
}

impl DownloadOptions {
    pub fn for_job(request: &JobRequest, cfg: &MediaqConfig) -> Self {
        let format_selector = if request.audio_only {
            AUDIO_FORMAT_SELECTOR.to_string()
        } else {
            request.format_id.trim().to_string()
        };

        let mut postprocessors = Vec::new();
        if request.audio_only {
            postprocessors.push(Postprocessor::ExtractAudio {
                codec: cfg.audio_codec.clone(),
                quality: cfg.audio_quality.clone(),
            });
        }

        let (write_subtitles, subtitle_languages) = match request.subtitle_language() {
            Some(lang) => {
                postprocessors.push(Postprocessor::EmbedSubtitle {
                    already_have_subtitle: false,
                });
                (true, vec![lang.to_string()])
            }
            None => (false, Vec::new()),
        };

        Self {
            format_selector,
            output_template: output_template(&request.output_dir),
            skip_unavailable_playlist_items: true,
            restrict_to_single_item: !request.playlist,
            write_subtitles,
            subtitle_languages,
            postprocessors,
            ffmpeg_location: cfg.ffmpeg_location.clone(),
            extras: cfg.extras.clone(),
        }
    }

    fn embeds_subtitles(&self) -> bool {
        self.postprocessors.iter().any(|p| {
            matches!(
                p,
                Postprocessor::EmbedSubtitle {
                    already_have_subtitle: false
                }
            )
        })
    }

    /// Render as command-line arguments (URL not included).
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "-f".to_string(),
            self.format_selector.clone(),
            "-o".to_string(),
            self.output_template.to_string_lossy().into_owned(),
        ];

        if self.skip_unavailable_playlist_items {
            args.push("--ignore-errors".to_string());
        }
        args.push(if self.restrict_to_single_item {
            "--no-playlist".to_string()
        } else {
            "--yes-playlist".to_string()
        });

        if self.write_subtitles && !self.subtitle_languages.is_empty() {
            // Embedding implies writing; the standalone file is removed after embedding.
            if !self.embeds_subtitles() {
                args.push("--write-subs".to_string());
            }
            args.push("--sub-langs".to_string());
            args.push(self.subtitle_languages.join(","));
        }

        for pp in &self.postprocessors {
            match pp {
                Postprocessor::ExtractAudio { codec, quality } => {
                    args.extend([
                        "-x".to_string(),
                        "--audio-format".to_string(),
                        codec.clone(),
                        "--audio-quality".to_string(),
                        quality.clone(),
                    ]);
                }
                Postprocessor::EmbedSubtitle {
                    already_have_subtitle,
                } => {
                    if !already_have_subtitle && self.write_subtitles {
                        args.push("--embed-subs".to_string());
                    }
                }
            }
        }

        if let Some(ref loc) = self.ffmpeg_location {
            args.push("--ffmpeg-location".to_string());
            args.push(loc.to_string_lossy().into_owned());
        }
        if self.extras.embed_thumbnail {
            args.push("--embed-thumbnail".to_string());
        }
        if self.extras.embed_metadata {
            args.push("--embed-metadata".to_string());
        }
        if self.extras.skip_existing {
            args.push("--no-overwrites".to_string());
        }

        args.extend([
            "--newline".to_string(),
            "--progress-template".to_string(),
            line::progress_template(),
        ]);
        args
    }
}

fn output_template(dir: &Path) -> PathBuf {
    dir.join(OUTPUT_NAME_TEMPLATE)
}
