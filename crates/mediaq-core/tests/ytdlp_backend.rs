//! Integration test: the real `YtDlp` backend driving a fake tool script,
//! end to end through the scheduler.
#![cfg(unix)]

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use mediaq_core::config::MediaqConfig;
use mediaq_core::{
    Backend, DownloadOptions, ExecError, HistoryStore, JobEvent, JobRequest, JobStatus,
    NotificationSink, Scheduler, YtDlp,
};
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

fn config() -> MediaqConfig {
    MediaqConfig {
        ytdlp_path: common::fake_ytdlp::path().to_path_buf(),
        kill_grace_secs: 1,
        ..MediaqConfig::default()
    }
}

fn scheduler(cfg: MediaqConfig) -> Scheduler {
    let backend: Arc<dyn Backend> = Arc::new(YtDlp::from_config(&cfg));
    Scheduler::new(cfg, backend, HistoryStore::in_memory(100), Handle::current())
}

async fn wait_idle(s: &Scheduler) {
    tokio::time::timeout(Duration::from_secs(15), async {
        while !s.is_idle() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("scheduler did not become idle");
}

#[tokio::test]
async fn single_download_completes_with_metadata() {
    let s = scheduler(config());
    let mut sub = s.subscribe();
    let dir = tempfile::tempdir().unwrap();
    let id = s
        .submit(JobRequest::new("https://media.example.com/single", dir.path()))
        .unwrap();
    wait_idle(&s).await;

    assert_eq!(s.status(id), Some(JobStatus::Completed));
    let rec = &s.history()[0];
    assert_eq!(rec.title, "Clip");
    assert_eq!(rec.thumbnail, "https://i.example.com/clip.jpg");
    assert_eq!(rec.file_size, 200);

    let mut pcts = Vec::new();
    while let Ok(ev) = sub.events.try_recv() {
        if let JobEvent::Progress(p) = ev {
            pcts.push(p.progress_pct);
        }
    }
    assert_eq!(pcts, vec![25.0, 100.0]);
}

#[tokio::test]
async fn playlist_skips_unavailable_item() {
    let s = scheduler(config());
    let dir = tempfile::tempdir().unwrap();
    let url = "https://media.example.com/playlist?list=demo";

    let listed = s
        .submit(JobRequest::new(url, dir.path()).playlist(true))
        .unwrap();
    wait_idle(&s).await;
    assert_eq!(s.status(listed), Some(JobStatus::Completed));

    let single = s.submit(JobRequest::new(url, dir.path())).unwrap();
    wait_idle(&s).await;
    assert_eq!(s.status(single), Some(JobStatus::Error));
    assert_eq!(
        s.history()[0].error_message.as_deref(),
        Some("[generic] item2: Video unavailable")
    );
}

#[tokio::test]
async fn tool_failure_carries_error_line() {
    let s = scheduler(config());
    let dir = tempfile::tempdir().unwrap();
    let id = s
        .submit(JobRequest::new("https://media.example.com/nothing-here", dir.path()))
        .unwrap();
    wait_idle(&s).await;

    assert_eq!(s.status(id), Some(JobStatus::Error));
    let msg = s.history()[0].error_message.clone().unwrap();
    assert!(msg.starts_with("[generic] Unsupported URL"), "{msg}");
}

#[tokio::test]
async fn missing_executable_is_an_error_not_a_panic() {
    let cfg = MediaqConfig {
        ytdlp_path: "/nonexistent/mediaq/yt-dlp".into(),
        ..MediaqConfig::default()
    };
    let s = scheduler(cfg);
    let id = s
        .submit(JobRequest::new("https://media.example.com/single", "/tmp"))
        .unwrap();
    wait_idle(&s).await;

    assert_eq!(s.status(id), Some(JobStatus::Error));
    let msg = s.history()[0].error_message.clone().unwrap();
    assert!(msg.contains("failed to start"), "{msg}");
    assert!(s.probe("https://media.example.com/single").await.formats.is_empty());
}

/// Start a download of `url`, cancel it after the first notification, and
/// return its result with the time cancellation took.
async fn cancel_after_first_progress(url: &str) -> (Result<(), ExecError>, Duration) {
    let backend = YtDlp::new(common::fake_ytdlp::path(), Duration::from_millis(500));
    let request = JobRequest::new(url, "/tmp");
    let options = DownloadOptions::for_job(&request, &MediaqConfig::default());
    let seen = Arc::new(AtomicUsize::new(0));
    let sink = {
        let seen = Arc::clone(&seen);
        NotificationSink::new(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        })
    };
    let cancel = CancellationToken::new();

    let token = cancel.clone();
    let task = tokio::spawn(async move { backend.download(&request, &options, sink, token).await });

    tokio::time::timeout(Duration::from_secs(10), async {
        while seen.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("no progress from tool");

    let started = Instant::now();
    cancel.cancel();
    let result = tokio::time::timeout(Duration::from_secs(10), task)
        .await
        .expect("tool not terminated")
        .unwrap();
    (result, started.elapsed())
}

#[tokio::test]
async fn cancellation_terminates_the_tool() {
    let (result, _) = cancel_after_first_progress("https://media.example.com/slow").await;
    assert!(matches!(result, Err(ExecError::Cancelled)));
}

#[tokio::test]
async fn cancellation_does_not_wait_on_detached_pipe_holders() {
    let (result, took) = cancel_after_first_progress("https://media.example.com/detached").await;
    assert!(matches!(result, Err(ExecError::Cancelled)));
    assert!(took < Duration::from_secs(5), "cancel took {took:?}");
}

#[tokio::test]
async fn non_utf8_output_does_not_stop_reading() {
    let s = scheduler(config());
    let dir = tempfile::tempdir().unwrap();
    let id = s
        .submit(JobRequest::new("https://media.example.com/latin1", dir.path()))
        .unwrap();
    wait_idle(&s).await;

    assert_eq!(s.status(id), Some(JobStatus::Completed));
    let rec = &s.history()[0];
    assert_eq!(rec.title, "Clip");
    assert_eq!(rec.file_size, 200);
    assert!(rec.error_message.is_none());
}

#[tokio::test]
async fn probe_reads_info_document() {
    let s = scheduler(config());

    let result = s.probe("https://media.example.com/single").await;
    let ids: Vec<_> = result.formats.iter().map(|f| f.format_id.as_str()).collect();
    assert_eq!(ids, vec!["audio_only", "best", "22", "18"]);
    assert_eq!(result.subtitles.len(), 2);
    assert!(!result.is_playlist);

    let failed = s.probe("https://media.example.com/broken").await;
    assert!(failed.formats.is_empty());
    assert!(failed.subtitles.is_empty());
}
