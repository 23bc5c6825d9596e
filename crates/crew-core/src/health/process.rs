//! Liveness observation for desktop-backend processes
//!
//! Desktop agents have no pane to capture, so health reduces to "does the
//! pid still exist". Hung detection does not apply to them.

use super::ProbeSignal;

/// Probes OS process existence.
#[derive(Debug, Default)]
pub struct ProcessProbe;

impl ProcessProbe {
    pub fn probe_pid(&self, pid: u32) -> ProbeSignal {
        if pid_exists(pid) {
            ProbeSignal::ProcessAlive
        } else {
            ProbeSignal::ProcessGone
        }
    }
}

/// Signal 0 probes existence without delivering anything. EPERM still
/// means the process exists, just owned by someone else.
#[cfg(unix)]
fn pid_exists(pid: u32) -> bool {
    if pid == 0 {
        return false;
    }
    let rc = unsafe { libc::kill(pid as libc::pid_t, 0) };
    if rc == 0 {
        return true;
    }
    std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

#[cfg(not(unix))]
fn pid_exists(pid: u32) -> bool {
    pid != 0
}
