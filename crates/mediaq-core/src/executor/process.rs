//! Process-group termination for the tool and its children (ffmpeg).

use std::time::Duration;
use tokio::process::Child;

#[cfg(unix)]
fn signal_group(pid: u32, signal: libc::c_int) -> std::io::Result<()> {
    // SAFETY: killpg only sends a signal; the child was spawned as leader of its own group.
    let rc = unsafe { libc::killpg(pid as libc::pid_t, signal) };
    if rc == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

/// SIGTERM the child's process group, wait up to `grace`, then SIGKILL.
/// Always reaps the child.
pub(super) async fn terminate(child: &mut Child, grace: Duration) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        if let Err(e) = signal_group(pid, libc::SIGTERM) {
            tracing::debug!(pid, "SIGTERM to process group failed: {}", e);
        }
        if tokio::time::timeout(grace, child.wait()).await.is_ok() {
            return;
        }
        tracing::debug!(pid, "grace period elapsed, killing process group");
        if let Err(e) = signal_group(pid, libc::SIGKILL) {
            tracing::debug!(pid, "SIGKILL to process group failed: {}", e);
        }
    }
    #[cfg(not(unix))]
    let _ = grace;

    if let Err(e) = child.kill().await {
        tracing::debug!("kill child: {}", e);
    }
}
