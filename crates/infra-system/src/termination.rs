// Graceful child termination: SIGTERM first, SIGKILL after a grace period

use std::time::Duration;
use tokio::process::Child;
use tracing::{info, warn};

/// Stop a still-running child and reap it
///
/// On Unix the child gets SIGTERM and `grace_period` to exit before being
/// killed. Elsewhere it is killed right away.
pub(crate) async fn terminate_gracefully(mut child: Child, grace_period: Duration) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if let Some(pid) = child.id() {
            info!(pid = %pid, "Sending SIGTERM for graceful shutdown");
            if kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok()
                && tokio::time::timeout(grace_period, child.wait()).await.is_ok()
            {
                info!(pid = %pid, "Process exited gracefully after SIGTERM");
                return;
            }
            warn!(pid = %pid, "Process did not exit after SIGTERM, sending SIGKILL");
        }
    }

    #[cfg(not(unix))]
    let _ = grace_period;

    if let Err(e) = child.kill().await {
        warn!(error = %e, "Failed to kill child process");
    }
}

/// Hand a child to a background task for termination
///
/// Used from `Drop`, where awaiting is impossible. Without a runtime the
/// child's `kill_on_drop` takes over.
pub(crate) fn terminate_in_background(child: Child, grace_period: Duration) {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(terminate_gracefully(child, grace_period));
        }
        Err(_) => drop(child),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::process::Stdio;
    use tokio::process::Command;

    #[tokio::test]
    async fn test_sigterm_stops_sleeping_child() {
        let child = Command::new("sleep")
            .arg("30")
            .stdout(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .unwrap();

        let started = std::time::Instant::now();
        terminate_gracefully(child, Duration::from_secs(5)).await;
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_sigkill_after_ignored_sigterm() {
        let child = Command::new("sh")
            .args(["-c", "trap '' TERM; sleep 30"])
            .stdout(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .unwrap();
        // Let the shell install its trap
        tokio::time::sleep(Duration::from_millis(200)).await;

        let started = std::time::Instant::now();
        terminate_gracefully(child, Duration::from_millis(200)).await;
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
