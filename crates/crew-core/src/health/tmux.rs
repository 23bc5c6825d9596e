//! Liveness and content observation for tmux panes

use super::ProbeSignal;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tracing::debug;

/// Hard cap on any tmux invocation. A wedged tmux server must degrade to a
/// status, not stall the monitoring loop.
const TMUX_TIMEOUT: Duration = Duration::from_secs(5);

const KILL_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Probes tmux panes by shelling out to the `tmux` binary.
#[derive(Debug, Default)]
pub struct TmuxProbe;

impl TmuxProbe {
    /// Observe one pane: liveness first, then content.
    pub fn probe_pane(&self, pane_id: &str) -> ProbeSignal {
        match self.pane_dead(pane_id) {
            Some(false) => {}
            // Missing pane, dead pane, tmux absent, or timeout.
            _ => return ProbeSignal::PaneGone,
        }

        match self.capture_pane(pane_id) {
            Some(content) => ProbeSignal::Content {
                hash: blake3::hash(&content).to_hex().to_string(),
            },
            None => ProbeSignal::CaptureFailed,
        }
    }

    /// `#{pane_dead}` for the pane: Some(true/false), or None when the
    /// pane cannot be queried at all.
    fn pane_dead(&self, pane_id: &str) -> Option<bool> {
        let output = run_with_timeout(
            Command::new("tmux")
                .args(["display-message", "-p", "-t", pane_id, "#{pane_dead}"]),
            TMUX_TIMEOUT,
        )?;
        if !output.success {
            return None;
        }
        match String::from_utf8_lossy(&output.stdout).trim() {
            "0" => Some(false),
            "1" => Some(true),
            other => {
                debug!(pane_id, value = other, "unexpected pane_dead value");
                None
            }
        }
    }

    fn capture_pane(&self, pane_id: &str) -> Option<Vec<u8>> {
        let output = run_with_timeout(
            Command::new("tmux").args(["capture-pane", "-p", "-t", pane_id]),
            TMUX_TIMEOUT,
        )?;
        output.success.then_some(output.stdout)
    }
}

struct CommandOutput {
    success: bool,
    stdout: Vec<u8>,
}

/// Run a command, killing it if it exceeds `timeout`. Returns None on
/// spawn failure, timeout, or unreadable output.
fn run_with_timeout(command: &mut Command, timeout: Duration) -> Option<CommandOutput> {
    use std::io::Read;

    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .ok()?;

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if Instant::now() >= deadline {
                    debug!(?command, "command timed out, killing");
                    let _ = child.kill();
                    let _ = child.wait();
                    return None;
                }
                std::thread::sleep(KILL_POLL_INTERVAL);
            }
            Err(_) => {
                let _ = child.kill();
                return None;
            }
        }
    };

    let mut stdout = Vec::new();
    if let Some(mut pipe) = child.stdout.take() {
        pipe.read_to_end(&mut stdout).ok()?;
    }
    Some(CommandOutput {
        success: status.success(),
        stdout,
    })
}
