//! Error types for the core. Everything that crosses a component boundary is
//! one of these; front ends convert to `anyhow` at the edge.

use thiserror::Error;

/// A download request that cannot become a job.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("URL is empty")]
    EmptyUrl,
    #[error("invalid URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("format id is empty")]
    EmptyFormat,
    #[error("subtitle embedding requested without a language code")]
    MissingSubtitleLanguage,
}

/// Failure while running the external tool for one job.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{0}")]
    Tool(String),
    #[error("download cancelled")]
    Cancelled,
    #[error("i/o while supervising download: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure while probing a URL for formats. Never escapes `MetadataProber::probe`.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("probe exited with status {code:?}: {stderr}")]
    Exit { code: Option<i32>, stderr: String },
    #[error("probe output is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
