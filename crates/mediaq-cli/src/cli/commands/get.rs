//! `mediaq get` – queue URLs and download them, printing progress until idle.

use anyhow::{bail, Result};
use mediaq_core::config::MediaqConfig;
use mediaq_core::probe::{AUDIO_ONLY_FORMAT, NO_SUBTITLES};
use mediaq_core::progress::Phase;
use mediaq_core::{Backend, JobEvent, JobId, JobRequest, JobStatus, Scheduler, YtDlp};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;

use super::open_history;
use crate::cli::{format, GetArgs};

const PROGRESS_INTERVAL_MS: u64 = 500;
const IDLE_POLL_MS: u64 = 250;

pub async fn run_get(mut cfg: MediaqConfig, args: GetArgs) -> Result<()> {
    if let Some(jobs) = args.jobs {
        cfg.max_concurrent_downloads = jobs.max(1);
    }
    let output_dir = output_dir(&args, &cfg)?;
    let backend: Arc<dyn Backend> = Arc::new(YtDlp::from_config(&cfg));
    let history = open_history(&cfg);
    let scheduler = Scheduler::new(cfg, backend, history, Handle::current());
    let mut sub = scheduler.subscribe();

    let mut board = Board::default();
    for url in &args.urls {
        match scheduler.submit(build_request(url, &output_dir, &args)) {
            Ok(id) => {
                println!("queued    {id}  {url}");
                board.track(id, url);
            }
            Err(e) => eprintln!("skipped   {url}: {e}"),
        }
    }
    if board.jobs.is_empty() {
        bail!("no valid URLs to download");
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;
    let mut idle_tick = tokio::time::interval(Duration::from_millis(IDLE_POLL_MS));

    loop {
        tokio::select! {
            Some(ev) = sub.events.recv() => board.handle(ev),
            res = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                match res {
                    Ok(()) => {
                        let n = scheduler.cancel_all();
                        println!("interrupted: cancelling {n} job(s)");
                    }
                    Err(e) => tracing::warn!("ctrl-c handler unavailable: {}", e),
                }
            }
            _ = idle_tick.tick() => {
                if scheduler.is_idle() {
                    break;
                }
            }
        }
    }
    while let Ok(ev) = sub.events.try_recv() {
        board.handle(ev);
    }
    scheduler.unsubscribe(sub.id);
    scheduler.save_history();

    // Lagging subscribers can miss events; the scheduler has the final word.
    let mut failed = 0usize;
    let mut completed = 0usize;
    for id in board.jobs.keys() {
        match scheduler.status(*id) {
            Some(JobStatus::Completed) => completed += 1,
            Some(JobStatus::Error) => failed += 1,
            _ => {}
        }
    }
    let total = board.jobs.len();
    println!("{completed} of {total} download(s) completed");
    if failed > 0 {
        bail!("{failed} of {total} download(s) failed");
    }
    Ok(())
}

fn output_dir(args: &GetArgs, cfg: &MediaqConfig) -> Result<PathBuf> {
    match args.dir.as_ref().or(cfg.download_dir.as_ref()) {
        Some(dir) => Ok(dir.clone()),
        None => Ok(std::env::current_dir()?),
    }
}

fn build_request(url: &str, dir: &Path, args: &GetArgs) -> JobRequest {
    let format = args.format.trim();
    let audio_only = args.audio_only || format == AUDIO_ONLY_FORMAT;
    let mut request = JobRequest::new(url.trim(), dir)
        .with_format(format)
        .audio_only(audio_only)
        .playlist(args.playlist);
    if let Some(lang) = args.subs.as_deref().map(str::trim) {
        if !lang.eq_ignore_ascii_case(NO_SUBTITLES) {
            request = request.with_subtitles(lang);
        }
    }
    request
}

struct Line {
    label: String,
    last_print: Option<Instant>,
}

/// Terminal view of the jobs submitted by this invocation.
#[derive(Default)]
struct Board {
    jobs: HashMap<JobId, Line>,
}

impl Board {
    fn track(&mut self, id: JobId, url: &str) {
        self.jobs.insert(
            id,
            Line {
                label: url.to_string(),
                last_print: None,
            },
        );
    }

    fn handle(&mut self, ev: JobEvent) {
        let Some(line) = self.jobs.get_mut(&ev.job_id()) else {
            return;
        };
        match ev {
            JobEvent::StatusChanged {
                job_id,
                status: JobStatus::Downloading,
            } => println!("started   {job_id}  {}", line.label),
            JobEvent::TitleResolved { title, .. } => line.label = title,
            JobEvent::Progress(p) => {
                let due = line
                    .last_print
                    .map_or(true, |t| t.elapsed() >= Duration::from_millis(PROGRESS_INTERVAL_MS));
                if due || p.phase == Phase::Finished {
                    println!(
                        "  {}  {:5.1}%  {:>12}  ETA {:<8}  {}",
                        p.job_id,
                        p.progress_pct,
                        p.transfer_rate,
                        p.eta,
                        format::ellipsize(&line.label, 50)
                    );
                    line.last_print = Some(Instant::now());
                }
            }
            JobEvent::Finished {
                job_id,
                status,
                error,
            } => match error {
                Some(e) => println!("{:<9} {job_id}  {}: {e}", status.as_str(), line.label),
                None => println!("{:<9} {job_id}  {}", status.as_str(), line.label),
            },
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(format: &str) -> GetArgs {
        GetArgs {
            urls: vec!["https://media.example.com/v".into()],
            dir: None,
            format: format.into(),
            audio_only: false,
            subs: None,
            playlist: false,
            jobs: None,
        }
    }

    #[test]
    fn request_from_defaults() {
        let req = build_request(" https://media.example.com/v ", Path::new("/media"), &args("best"));
        assert_eq!(req.url, "https://media.example.com/v");
        assert_eq!(req.output_dir, PathBuf::from("/media"));
        assert_eq!(req.format_id, "best");
        assert!(!req.audio_only);
        assert!(!req.embed_subtitles);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn audio_only_pseudo_format_sets_flag() {
        let req = build_request("https://e.com/v", Path::new("/m"), &args(AUDIO_ONLY_FORMAT));
        assert!(req.audio_only);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn subtitles_and_playlist_flags() {
        let mut a = args("22");
        a.subs = Some("en".into());
        a.playlist = true;
        let req = build_request("https://e.com/list", Path::new("/m"), &a);
        assert!(req.embed_subtitles);
        assert_eq!(req.subtitle_lang.as_deref(), Some("en"));
        assert!(req.playlist);

        a.subs = Some("none".into());
        let req = build_request("https://e.com/list", Path::new("/m"), &a);
        assert!(!req.embed_subtitles);
    }

    #[test]
    fn output_dir_prefers_flag_then_config() {
        let mut cfg = MediaqConfig::default();
        cfg.download_dir = Some(PathBuf::from("/srv/media"));
        let mut a = args("best");
        assert_eq!(output_dir(&a, &cfg).unwrap(), PathBuf::from("/srv/media"));
        a.dir = Some(PathBuf::from("/tmp/x"));
        assert_eq!(output_dir(&a, &cfg).unwrap(), PathBuf::from("/tmp/x"));
    }

    #[test]
    fn board_ignores_foreign_jobs_and_latches_title() {
        let mut board = Board::default();
        board.track(JobId(1), "https://e.com/v");
        board.handle(JobEvent::TitleResolved {
            job_id: JobId(2),
            title: "other".into(),
        });
        assert_eq!(board.jobs[&JobId(1)].label, "https://e.com/v");
        board.handle(JobEvent::TitleResolved {
            job_id: JobId(1),
            title: "Mine".into(),
        });
        assert_eq!(board.jobs[&JobId(1)].label, "Mine");
    }
}
