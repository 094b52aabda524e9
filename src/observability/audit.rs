/// Structured audit events for pipeline runs
///
/// Every event is emitted as one JSON object on the `jvmscope::audit` log
/// target. When `init_audit_logger` has been called the same line is also
/// appended to an audit file.
use crate::config::types::{Result, ScopeError};
use crate::kernel::process::KillReport;
use log::Level;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use std::time::{Duration, SystemTime};
use uuid::Uuid;

pub const AUDIT_TARGET: &str = "jvmscope::audit";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AuditSeverity {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PipelineEventType {
    // Run lifecycle
    RunStart,
    RunEnd,

    // Stage lifecycle
    StageStart,
    StageTimedOut,
    StageInterrupted,
    LaunchFailed,
    ForcedKill,
    OutputTruncated,

    // Cleanup
    CleanupSuccess,
    CleanupFailure,
    OrphansReaped,
}

impl PipelineEventType {
    pub fn default_severity(&self) -> AuditSeverity {
        match self {
            PipelineEventType::RunStart | PipelineEventType::RunEnd => AuditSeverity::Low,
            PipelineEventType::StageStart => AuditSeverity::Low,
            PipelineEventType::StageTimedOut => AuditSeverity::Medium,
            PipelineEventType::StageInterrupted => AuditSeverity::Medium,
            PipelineEventType::LaunchFailed => AuditSeverity::Medium,
            PipelineEventType::ForcedKill => AuditSeverity::Medium,
            PipelineEventType::OutputTruncated => AuditSeverity::Low,
            PipelineEventType::CleanupSuccess => AuditSeverity::Low,
            PipelineEventType::CleanupFailure => AuditSeverity::High,
            PipelineEventType::OrphansReaped => AuditSeverity::Medium,
        }
    }
}

/// Identifiers tying the events of one run together
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Correlation {
    pub request_id: String,
    pub view: String,
    pub workspace: Option<String>,
}

impl Correlation {
    pub fn new(view: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            view: view.into(),
            workspace: None,
        }
    }

    pub fn with_workspace(mut self, workspace: impl Into<String>) -> Self {
        self.workspace = Some(workspace.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineEvent {
    pub event_type: PipelineEventType,
    pub severity: AuditSeverity,
    pub timestamp: SystemTime,
    pub details: String,
    pub correlation: Option<Correlation>,
    pub stage: Option<String>,
    pub pid: Option<u32>,
}

impl PipelineEvent {
    pub fn new(event_type: PipelineEventType, details: String) -> Self {
        Self {
            event_type,
            severity: event_type.default_severity(),
            timestamp: SystemTime::now(),
            details,
            correlation: None,
            stage: None,
            pid: None,
        }
    }

    pub fn with_correlation(mut self, correlation: Correlation) -> Self {
        self.correlation = Some(correlation);
        self
    }

    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = Some(stage.into());
        self
    }

    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = Some(pid);
        self
    }

    /// One-line JSON representation
    pub fn to_json(&self) -> serde_json::Value {
        let mut entry = serde_json::json!({
            "timestamp": self.timestamp
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64,
            "event_type": self.event_type,
            "severity": self.severity,
            "details": self.details,
            "process_id": std::process::id(),
        });

        if let Some(correlation) = &self.correlation {
            entry["correlation"] = serde_json::json!({
                "request_id": correlation.request_id,
                "view": correlation.view,
                "workspace": correlation.workspace,
            });
        }
        if let Some(stage) = &self.stage {
            entry["stage"] = serde_json::json!(stage);
        }
        if let Some(pid) = self.pid {
            entry["pid"] = serde_json::json!(pid);
        }
        entry
    }
}

/// Append-only audit file sink
pub struct AuditLogger {
    audit_file: Mutex<File>,
    audit_path: PathBuf,
}

impl AuditLogger {
    pub fn new(audit_path: &Path) -> Result<Self> {
        if let Some(parent) = audit_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ScopeError::Config(format!("Failed to create audit log directory: {}", e))
            })?;
        }

        let audit_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(audit_path)
            .map_err(|e| ScopeError::Config(format!("Failed to open audit log: {}", e)))?;

        Ok(Self {
            audit_file: Mutex::new(audit_file),
            audit_path: audit_path.to_path_buf(),
        })
    }

    pub fn audit_path(&self) -> &Path {
        &self.audit_path
    }

    fn append(&self, line: &str) {
        let mut file = match self.audit_file.lock() {
            Ok(file) => file,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = writeln!(file, "{}", line) {
            log::warn!("Failed to write audit log {}: {}", self.audit_path.display(), e);
        }
    }
}

static AUDIT_LOGGER: OnceLock<AuditLogger> = OnceLock::new();

/// Route audit events to a file in addition to the log target.
///
/// Only the first call takes effect.
pub fn init_audit_logger(audit_path: &Path) -> Result<()> {
    let logger = AuditLogger::new(audit_path)?;
    if AUDIT_LOGGER.set(logger).is_err() {
        log::debug!("Audit logger already initialized");
    }
    Ok(())
}

pub fn log_event(event: PipelineEvent) {
    let line = event.to_json().to_string();
    let level = match event.severity {
        AuditSeverity::High => Level::Error,
        AuditSeverity::Medium => Level::Warn,
        AuditSeverity::Low => Level::Debug,
    };
    log::log!(target: AUDIT_TARGET, level, "{}", line);

    if let Some(logger) = AUDIT_LOGGER.get() {
        logger.append(&line);
    }
}

/// Convenience constructors for the events the pipeline emits
pub mod events {
    use super::*;

    pub fn run_start(correlation: &Correlation, symbol: &str) {
        log_event(
            PipelineEvent::new(
                PipelineEventType::RunStart,
                format!("symbol={}", symbol),
            )
            .with_correlation(correlation.clone()),
        );
    }

    pub fn run_end(correlation: &Correlation, succeeded: bool, elapsed: Duration) {
        log_event(
            PipelineEvent::new(
                PipelineEventType::RunEnd,
                format!("succeeded={} elapsed_ms={}", succeeded, elapsed.as_millis()),
            )
            .with_correlation(correlation.clone()),
        );
    }

    pub(crate) fn tagged(event: PipelineEvent, correlation: Option<&Correlation>) -> PipelineEvent {
        match correlation {
            Some(correlation) => event.with_correlation(correlation.clone()),
            None => event,
        }
    }

    pub fn stage_start(correlation: Option<&Correlation>, stage: &str, pid: u32) {
        log_event(tagged(
            PipelineEvent::new(PipelineEventType::StageStart, "spawned".to_string())
                .with_stage(stage)
                .with_pid(pid),
            correlation,
        ));
    }

    pub fn stage_timed_out(
        correlation: Option<&Correlation>,
        stage: &str,
        pid: u32,
        timeout: Duration,
    ) {
        log_event(tagged(
            PipelineEvent::new(
                PipelineEventType::StageTimedOut,
                format!("exceeded {}ms", timeout.as_millis()),
            )
            .with_stage(stage)
            .with_pid(pid),
            correlation,
        ));
    }

    pub fn stage_interrupted(correlation: Option<&Correlation>, stage: &str, pid: u32) {
        log_event(tagged(
            PipelineEvent::new(
                PipelineEventType::StageInterrupted,
                "orchestrator interrupt".to_string(),
            )
            .with_stage(stage)
            .with_pid(pid),
            correlation,
        ));
    }

    pub fn launch_failed(correlation: Option<&Correlation>, stage: &str, cause: &str) {
        log_event(tagged(
            PipelineEvent::new(PipelineEventType::LaunchFailed, cause.to_string())
                .with_stage(stage),
            correlation,
        ));
    }

    pub fn forced_kill(
        correlation: Option<&Correlation>,
        stage: &str,
        pid: u32,
        report: &KillReport,
    ) {
        log_event(tagged(
            PipelineEvent::new(
                PipelineEventType::ForcedKill,
                format!(
                    "term_sent={} kill_sent={} waited_ms={} notes={:?}",
                    report.term_sent, report.kill_sent, report.waited_ms, report.notes
                ),
            )
            .with_stage(stage)
            .with_pid(pid),
            correlation,
        ));
    }

    pub fn output_truncated(
        correlation: Option<&Correlation>,
        stage: &str,
        total_bytes: usize,
        limit: usize,
    ) {
        log_event(tagged(
            PipelineEvent::new(
                PipelineEventType::OutputTruncated,
                format!("total_bytes={} limit={}", total_bytes, limit),
            )
            .with_stage(stage),
            correlation,
        ));
    }

    pub fn cleanup_success(correlation: &Correlation) {
        log_event(
            PipelineEvent::new(PipelineEventType::CleanupSuccess, "workspace removed".to_string())
                .with_correlation(correlation.clone()),
        );
    }

    pub fn cleanup_failure(correlation: &Correlation, error: &str) {
        log_event(
            PipelineEvent::new(PipelineEventType::CleanupFailure, error.to_string())
                .with_correlation(correlation.clone()),
        );
    }

    pub fn orphans_reaped(count: usize, temp_root: &Path) {
        log_event(PipelineEvent::new(
            PipelineEventType::OrphansReaped,
            format!("count={} root={}", count, temp_root.display()),
        ));
    }
}
