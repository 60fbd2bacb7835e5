//! `mediaq probe` – list formats and subtitle tracks for a URL.

use anyhow::{bail, Result};
use mediaq_core::config::MediaqConfig;
use mediaq_core::probe::MetadataProber;
use mediaq_core::YtDlp;
use std::sync::Arc;

use crate::cli::format;

pub async fn run_probe(cfg: &MediaqConfig, url: &str, json: bool) -> Result<()> {
    let prober = MetadataProber::new(Arc::new(YtDlp::from_config(cfg)), cfg.audio_codec.clone());
    let result = prober.probe(url).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }
    if result.formats.is_empty() {
        bail!("no formats found for {url} (details in the log)");
    }
    if result.is_playlist {
        println!("Playlist: showing formats of the first item.\n");
    }

    println!(
        "{:<14} {:<11} {:<6} {:<14} {:<10} {}",
        "ID", "RESOLUTION", "EXT", "VCODEC", "SIZE", "NOTE"
    );
    for f in &result.formats {
        let size = f.filesize.map(format::size).unwrap_or_else(|| "-".to_string());
        println!(
            "{:<14} {:<11} {:<6} {:<14} {:<10} {}",
            f.format_id,
            f.resolution,
            f.ext,
            format::ellipsize(&f.vcodec, 14),
            size,
            f.format_note
        );
    }

    println!("\n{:<10} {}", "SUBTITLES", "NAME");
    for s in &result.subtitles {
        println!("{:<10} {}", s.lang_code, s.lang_name);
    }
    Ok(())
}
