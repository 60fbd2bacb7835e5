//! `Backend` implementation that drives the `yt-dlp` executable.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::BufReader;
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::MediaqConfig;
use crate::error::{ExecError, ProbeError};
use crate::job::JobRequest;
use crate::probe::InfoJson;
use crate::progress::{Notification, NotificationStatus};

use super::{line, process, Backend, DownloadOptions, ExitReport, NotificationSink};

/// Lines of stderr kept for probe error messages.
const PROBE_STDERR_TAIL: usize = 5;

#[derive(Debug, Clone)]
pub struct YtDlp {
    program: PathBuf,
    kill_grace: Duration,
}

impl YtDlp {
    pub fn new(program: impl Into<PathBuf>, kill_grace: Duration) -> Self {
        Self {
            program: program.into(),
            kill_grace,
        }
    }

    pub fn from_config(cfg: &MediaqConfig) -> Self {
        Self::new(
            cfg.ytdlp_path.clone(),
            Duration::from_secs(cfg.kill_grace_secs),
        )
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.stdin(Stdio::null()).kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);
        cmd
    }

    fn program_name(&self) -> String {
        self.program.display().to_string()
    }
}

#[async_trait]
impl Backend for YtDlp {
    async fn download(
        &self,
        request: &JobRequest,
        options: &DownloadOptions,
        sink: NotificationSink,
        cancel: CancellationToken,
    ) -> Result<(), ExecError> {
        let mut args = options.to_args();
        args.push("--".to_string());
        args.push(request.url.clone());
        tracing::debug!(program = %self.program.display(), ?args, "spawning download");

        let mut child = self
            .command()
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ExecError::Spawn {
                program: self.program_name(),
                source,
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ExecError::Tool("stdout not captured".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ExecError::Tool("stderr not captured".into()))?;

        let stdout_sink = sink.clone();
        let stdout_reader = tokio::spawn(async move {
            let mut finished = 0usize;
            let mut reader = BufReader::new(stdout);
            let mut buf = Vec::new();
            loop {
                let l = match line::next_line_lossy(&mut reader, &mut buf).await {
                    Ok(Some(l)) => l,
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!("reading yt-dlp stdout: {}", e);
                        break;
                    }
                };
                match line::parse_progress_line(&l) {
                    Some(n) => {
                        if n.status == NotificationStatus::Finished {
                            finished += 1;
                        }
                        stdout_sink.send(n);
                    }
                    None => tracing::trace!("yt-dlp: {}", l),
                }
            }
            finished
        });

        let stderr_sink = sink;
        let stderr_reader = tokio::spawn(async move {
            let mut errors = Vec::new();
            let mut reader = BufReader::new(stderr);
            let mut buf = Vec::new();
            loop {
                let l = match line::next_line_lossy(&mut reader, &mut buf).await {
                    Ok(Some(l)) => l,
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!("reading yt-dlp stderr: {}", e);
                        break;
                    }
                };
                match line::parse_error_line(&l) {
                    Some(msg) => {
                        stderr_sink.send(Notification::error(msg));
                        errors.push(msg.to_string());
                    }
                    None => tracing::debug!("yt-dlp stderr: {}", l),
                }
            }
            errors
        });

        let status = tokio::select! {
            s = child.wait() => s?,
            _ = cancel.cancelled() => {
                process::terminate(&mut child, self.kill_grace).await;
                join_reader(stdout_reader, self.kill_grace).await;
                join_reader(stderr_reader, self.kill_grace).await;
                return Err(ExecError::Cancelled);
            }
        };

        let items_finished = join_reader(stdout_reader, self.kill_grace)
            .await
            .unwrap_or_default();
        let errors = join_reader(stderr_reader, self.kill_grace)
            .await
            .unwrap_or_default();
        let report = ExitReport {
            success: status.success(),
            code: status.code(),
            playlist: request.playlist,
            items_finished,
            errors,
        };
        tracing::debug!(?report, "yt-dlp exited");
        super::classify_exit(&report)
    }

    async fn probe(&self, url: &str) -> Result<InfoJson, ProbeError> {
        let output = self
            .command()
            .args([
                "-J",
                "--no-warnings",
                "--skip-download",
                "--playlist-items",
                "1",
                "--",
                url,
            ])
            .output()
            .await
            .map_err(|source| ProbeError::Spawn {
                program: self.program_name(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
            let tail = lines[lines.len().saturating_sub(PROBE_STDERR_TAIL)..].join("\n");
            return Err(ProbeError::Exit {
                code: output.status.code(),
                stderr: tail,
            });
        }
        Ok(serde_json::from_slice(&output.stdout)?)
    }
}

/// Wait for a pipe reader to reach end of output. A descendant that left the
/// process group can keep the pipe open after the tool exits; past `limit`
/// the reader is aborted and its result discarded.
async fn join_reader<T>(mut reader: JoinHandle<T>, limit: Duration) -> Option<T> {
    match tokio::time::timeout(limit, &mut reader).await {
        Ok(joined) => joined.ok(),
        Err(_) => {
            tracing::warn!("yt-dlp output still open {:?} after exit; abandoning reader", limit);
            reader.abort();
            None
        }
    }
}
