/// Process-group termination and liveness probing
use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use serde::{Deserialize, Serialize};

/// Signal escalation report for a timed-out or interrupted stage
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct KillReport {
    pub term_sent: bool,
    pub kill_sent: bool,
    pub waited_ms: u64,
    pub notes: Vec<String>,
}

fn to_pid(pid: u32) -> Option<Pid> {
    i32::try_from(pid).ok().filter(|p| *p > 0).map(Pid::from_raw)
}

/// Send `sig` to the group led by `pgid`, falling back to the leader alone.
///
/// Returns a note when the fallback was needed.
pub fn signal_group(pgid: u32, sig: Signal) -> Option<String> {
    let pid = to_pid(pgid)?;
    match signal::killpg(pid, sig) {
        Ok(()) => None,
        Err(Errno::ESRCH) => None,
        Err(group_err) => {
            let _ = signal::kill(pid, sig);
            Some(format!("group {} fallback used: {}", sig.as_str(), group_err))
        }
    }
}

/// True while `pid` names a live, non-zombie process.
pub fn is_alive(pid: u32) -> bool {
    let Some(pid) = to_pid(pid) else {
        return false;
    };

    match signal::kill(pid, None) {
        Ok(()) => !is_zombie(pid),
        // exists but owned by someone else
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

#[cfg(target_os = "linux")]
fn is_zombie(pid: Pid) -> bool {
    let Ok(stat) = std::fs::read_to_string(format!("/proc/{}/stat", pid.as_raw())) else {
        return false;
    };
    // comm may contain spaces and parens; the state follows the last ')'
    stat.rsplit_once(')')
        .and_then(|(_, rest)| rest.split_whitespace().next())
        .map(|state| state == "Z" || state == "X")
        .unwrap_or(false)
}

#[cfg(not(target_os = "linux"))]
fn is_zombie(_pid: Pid) -> bool {
    false
}
