//! Shell script standing in for the `yt-dlp` executable in integration tests.
//!
//! Behavior is picked by the last argument (the URL):
//! - `-J ...`: prints an info document, or fails for URLs containing `broken`.
//! - `*single*`: two progress lines with title/thumbnail, exit 0.
//! - `*playlist*`: items 1, 3, 4, 5 finish; item 2 is unavailable; exit 1.
//! - `*latin1*`: a Latin-1 filename line on stdout and stderr, enough progress
//!   lines to fill the pipe, then `finished` with a title; exit 0.
//! - `*slow*`: one progress line, then waits on a child `sleep` until killed.
//! - `*detached*`: like `slow`, but the `sleep` runs in its own session, so it
//!   survives the group kill and keeps the output pipes open.
//! - anything else: an `ERROR:` line and exit 1.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tempfile::TempDir;

const SCRIPT: &str = "#!/bin/sh
for url; do :; done
if [ \"$1\" = \"-J\" ]; then
  case \"$url\" in
    *broken*) echo \"ERROR: Unsupported URL: $url\" >&2; exit 1 ;;
  esac
  echo '{\"title\": \"Clip\", \"formats\": [{\"format_id\": \"18\", \"height\": 360, \"vcodec\": \"avc1\"}, {\"format_id\": \"22\", \"height\": 720, \"vcodec\": \"avc1\"}, {\"format_id\": \"140\", \"vcodec\": \"none\"}], \"subtitles\": {\"en\": [{\"name\": \"English\"}]}}'
  exit 0
fi
case \"$url\" in
  *single*)
    echo \"[generic] Extracting URL: $url\"
    echo 'mediaq-progress {\"status\": \"downloading\", \"downloaded_bytes\": 50, \"total_bytes\": 200}\t\"Clip\"\t\"https://i.example.com/clip.jpg\"'
    echo 'mediaq-progress {\"status\": \"finished\", \"downloaded_bytes\": 200, \"total_bytes\": 200}\t\"Clip\"\tNA'
    exit 0
    ;;
  *playlist*)
    for i in 1 3 4 5; do
      echo \"mediaq-progress {\\\"status\\\": \\\"finished\\\", \\\"downloaded_bytes\\\": 10}\t\\\"Item $i\\\"\tNA\"
    done
    echo \"ERROR: [generic] item2: Video unavailable\" >&2
    exit 1
    ;;
  *latin1*)
    printf '[download] Destination: caf\\351.mp4\\n'
    printf 'WARNING: [generic] caf\\351: no thumbnail\\n' >&2
    i=0
    while [ $i -lt 2000 ]; do
      echo 'mediaq-progress {\"status\": \"downloading\", \"downloaded_bytes\": 100, \"total_bytes\": 200}\tNA\tNA'
      i=$((i + 1))
    done
    echo 'mediaq-progress {\"status\": \"finished\", \"downloaded_bytes\": 200, \"total_bytes\": 200}\t\"Clip\"\tNA'
    exit 0
    ;;
  *detached*)
    if command -v setsid >/dev/null 2>&1; then
      setsid sleep 20 &
    else
      sleep 20 &
    fi
    echo 'mediaq-progress {\"status\": \"downloading\", \"_percent_str\": \"  5.0%\"}\tNA\tNA'
    wait
    exit 0
    ;;
  *slow*)
    echo 'mediaq-progress {\"status\": \"downloading\", \"_percent_str\": \"  5.0%\"}\tNA\tNA'
    sleep 30 &
    wait
    exit 0
    ;;
  *)
    echo \"ERROR: [generic] Unsupported URL: $url\" >&2
    exit 1
    ;;
esac
";

struct FakeTool {
    _dir: TempDir,
    path: PathBuf,
}

static TOOL: OnceLock<FakeTool> = OnceLock::new();

/// Path of the fake executable. Written once per test binary, before any
/// test spawns it, so no write handle is open when it is executed.
pub fn path() -> &'static Path {
    &TOOL
        .get_or_init(|| {
            let dir = tempfile::tempdir().expect("tempdir");
            let path = dir.path().join("yt-dlp");
            std::fs::write(&path, SCRIPT).expect("write script");
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
                .expect("chmod script");
            FakeTool { _dir: dir, path }
        })
        .path
}
