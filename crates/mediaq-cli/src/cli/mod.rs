//! CLI for the mediaq download queue.

mod commands;
mod format;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use mediaq_core::config;
use std::path::PathBuf;

use commands::{run_clear_history, run_forget, run_get, run_history, run_probe};

/// Top-level CLI for the mediaq download queue.
#[derive(Debug, Parser)]
#[command(name = "mediaq")]
#[command(about = "mediaq: concurrent media download queue driven by yt-dlp", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Queue one or more URLs and download them, showing progress until all finish.
    Get(GetArgs),

    /// List the formats and subtitle tracks available for a URL.
    Probe {
        /// Page or media URL.
        url: String,

        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show finished, failed and cancelled downloads, newest first.
    History {
        /// Show at most N entries.
        #[arg(long, short = 'n', value_name = "N")]
        limit: Option<usize>,
    },

    /// Delete all history entries.
    ClearHistory,

    /// Delete one history entry by job ID.
    Forget {
        /// Job identifier.
        id: u64,
    },
}

#[derive(Debug, Clone, Args)]
pub struct GetArgs {
    /// Page or media URLs.
    #[arg(required = true)]
    pub urls: Vec<String>,

    /// Output directory (default: `download_dir` from config, else current directory).
    #[arg(long, short = 'd', value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Format ID from `mediaq probe`, `best`, or `audio_only`.
    #[arg(long, short = 'f', default_value = "best", value_name = "ID")]
    pub format: String,

    /// Download audio only and transcode it (codec/quality from config).
    #[arg(long)]
    pub audio_only: bool,

    /// Fetch and embed subtitles in this language.
    #[arg(long, value_name = "LANG")]
    pub subs: Option<String>,

    /// Download every item when the URL is a playlist.
    #[arg(long)]
    pub playlist: bool,

    /// Run up to N downloads at once (default: `max_concurrent_downloads` from config).
    #[arg(long, short = 'j', value_name = "N")]
    pub jobs: Option<usize>,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Get(args) => run_get(cfg, args).await?,
            CliCommand::Probe { url, json } => run_probe(&cfg, &url, json).await?,
            CliCommand::History { limit } => run_history(&cfg, limit)?,
            CliCommand::ClearHistory => run_clear_history(&cfg)?,
            CliCommand::Forget { id } => run_forget(&cfg, id)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
