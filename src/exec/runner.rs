/// Stage runner: one external tool, one bounded wait
///
/// stdout and stderr share a single pipe so tools that only print diagnostics
/// on stderr still surface them. Every child leads its own process group; the
/// whole group is killed on timeout or interrupt, and swept once more after a
/// normal exit so no descendant outlives the stage.
use crate::config::types::{OutputIntegrity, Result, ScopeError, StageOutcome};
use crate::kernel::process::{self, KillReport};
use crate::kernel::signal;
use crate::observability::audit::{events, Correlation};
use crate::utils::output::OutputCollector;
use nix::sys::signal::Signal;
use std::fs::File;
use std::os::fd::OwnedFd;
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One external-tool invocation
#[derive(Debug, Clone)]
pub struct StageCommand {
    /// Short stage name used in logs and error messages
    pub label: String,
    pub argv: Vec<String>,
    pub working_dir: PathBuf,
    pub timeout: Duration,
}

impl StageCommand {
    pub fn new(
        label: impl Into<String>,
        argv: Vec<String>,
        working_dir: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Self {
        Self {
            label: label.into(),
            argv,
            working_dir: working_dir.into(),
            timeout,
        }
    }

    pub fn program(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or("")
    }
}

/// Runs stage commands with bounded waits and group-wide termination
#[derive(Debug, Clone)]
pub struct StageRunner {
    collector: OutputCollector,
    poll_interval: Duration,
    term_grace: Duration,
    drain_timeout: Duration,
    interrupt: Arc<AtomicBool>,
    correlation: Option<Correlation>,
}

impl StageRunner {
    /// Runner observing the process-wide interrupt flag
    pub fn new(max_output_bytes: usize) -> Self {
        Self {
            collector: OutputCollector::new(max_output_bytes),
            poll_interval: Duration::from_millis(10),
            term_grace: Duration::from_millis(200),
            drain_timeout: Duration::from_secs(2),
            interrupt: signal::global_interrupt_flag(),
            correlation: None,
        }
    }

    /// Observe `flag` instead of the process-wide interrupt flag
    pub fn with_interrupt_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = flag;
        self
    }

    pub fn with_term_grace(mut self, grace: Duration) -> Self {
        self.term_grace = grace;
        self
    }

    /// Tag every stage event this runner emits with the run's correlation
    pub fn with_correlation(mut self, correlation: Correlation) -> Self {
        self.correlation = Some(correlation);
        self
    }

    pub fn correlation(&self) -> Option<&Correlation> {
        self.correlation.as_ref()
    }

    /// Launch `cmd`, wait up to its timeout and classify the result.
    ///
    /// `Err` is reserved for orchestration faults (empty argv, pipe setup,
    /// wait failure) and for interruption; tool behaviour is always an
    /// `Ok(StageOutcome)`.
    pub fn run(&self, cmd: &StageCommand) -> Result<StageOutcome> {
        if cmd.argv.is_empty() {
            return Err(ScopeError::Config(format!(
                "empty command for stage {}",
                cmd.label
            )));
        }

        let (reader, writer) = cloexec_pipe()?;
        let stderr_writer = writer.try_clone()?;

        let mut command = Command::new(&cmd.argv[0]);
        command
            .args(&cmd.argv[1..])
            .current_dir(&cmd.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(writer))
            .stderr(Stdio::from(stderr_writer))
            .process_group(0);

        log::debug!("[{}] launching {:?}", cmd.label, cmd.argv);
        let spawned = command.spawn();
        // the parent's copies of the write end must close or EOF never arrives
        drop(command);

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                log::warn!("[{}] failed to launch {}: {}", cmd.label, cmd.program(), e);
                events::launch_failed(self.correlation(), &cmd.label, &e.to_string());
                return Ok(StageOutcome::LaunchFailed(e.to_string()));
            }
        };

        let pid = child.id();
        events::stage_start(self.correlation(), &cmd.label, pid);
        let pending = self.collector.spawn(File::from(reader));

        let started = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if self.interrupt.load(Ordering::SeqCst) {
                        let report = self.terminate(&mut child);
                        events::stage_interrupted(self.correlation(), &cmd.label, pid);
                        events::forced_kill(self.correlation(), &cmd.label, pid, &report);
                        let _ = pending.finish(self.drain_timeout);
                        // the flag stays raised for the caller
                        return Err(ScopeError::Interrupted(cmd.label.clone()));
                    }
                    if started.elapsed() >= cmd.timeout {
                        let report = self.terminate(&mut child);
                        log::warn!(
                            "[{}] timed out after {:?}; process group {} killed",
                            cmd.label,
                            cmd.timeout,
                            pid
                        );
                        events::stage_timed_out(self.correlation(), &cmd.label, pid, cmd.timeout);
                        events::forced_kill(self.correlation(), &cmd.label, pid, &report);
                        let partial = pending.finish(self.drain_timeout);
                        return Ok(StageOutcome::TimedOut {
                            output: partial.text(),
                        });
                    }
                    std::thread::sleep(self.poll_interval);
                }
                Err(e) => {
                    let _ = self.terminate(&mut child);
                    let _ = pending.finish(self.drain_timeout);
                    return Err(ScopeError::Io(std::io::Error::new(
                        e.kind(),
                        format!("wait failed for stage {}: {}", cmd.label, e),
                    )));
                }
            }
        };

        // sweep descendants that outlived the leader
        if let Some(note) = process::signal_group(pid, Signal::SIGKILL) {
            log::debug!("[{}] post-exit sweep: {}", cmd.label, note);
        }

        let collected = pending.finish(self.drain_timeout);
        if collected.integrity == OutputIntegrity::TruncatedByLimit {
            events::output_truncated(
                self.correlation(),
                &cmd.label,
                collected.total_bytes,
                self.collector.limit(),
            );
        }

        let exit_code = exit_code_of(status);
        log::debug!(
            "[{}] exited with {} after {:?} ({} bytes, {})",
            cmd.label,
            exit_code,
            started.elapsed(),
            collected.total_bytes,
            collected.integrity
        );

        Ok(StageOutcome::Completed {
            exit_code,
            output: collected.text(),
            integrity: collected.integrity,
        })
    }

    /// SIGTERM the group, give it a short grace period, SIGKILL, reap.
    fn terminate(&self, child: &mut Child) -> KillReport {
        let pid = child.id();
        let mut report = KillReport::default();
        let start = Instant::now();

        if let Some(note) = process::signal_group(pid, Signal::SIGTERM) {
            report.notes.push(note);
        }
        report.term_sent = true;

        while start.elapsed() < self.term_grace {
            if matches!(child.try_wait(), Ok(Some(_))) {
                break;
            }
            std::thread::sleep(self.poll_interval);
        }

        // always: the leader may be gone while descendants linger
        if let Some(note) = process::signal_group(pid, Signal::SIGKILL) {
            report.notes.push(note);
        }
        report.kill_sent = true;

        if let Err(e) = child.wait() {
            report.notes.push(format!("reap failed: {}", e));
        }

        report.waited_ms = start.elapsed().as_millis() as u64;
        report
    }
}

/// Exit code, or `128 + signo` for a signal death
fn exit_code_of(status: ExitStatus) -> i32 {
    status
        .code()
        .unwrap_or_else(|| 128 + status.signal().unwrap_or(0))
}

#[cfg(target_os = "linux")]
fn cloexec_pipe() -> Result<(OwnedFd, OwnedFd)> {
    use nix::fcntl::OFlag;
    nix::unistd::pipe2(OFlag::O_CLOEXEC)
        .map_err(|e| ScopeError::Io(std::io::Error::from(e)))
}

#[cfg(not(target_os = "linux"))]
fn cloexec_pipe() -> Result<(OwnedFd, OwnedFd)> {
    use nix::fcntl::{fcntl, FcntlArg, FdFlag};
    use std::os::fd::AsRawFd;

    let (reader, writer) =
        nix::unistd::pipe().map_err(|e| ScopeError::Io(std::io::Error::from(e)))?;
    for fd in [&reader, &writer] {
        fcntl(fd.as_raw_fd(), FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC))
            .map_err(|e| ScopeError::Io(std::io::Error::from(e)))?;
    }
    Ok((reader, writer))
}
