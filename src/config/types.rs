/// Core types shared by every pipeline stage
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How completely a stage's output stream was captured
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum OutputIntegrity {
    #[serde(rename = "complete")]
    Complete,
    #[serde(rename = "truncated_by_limit")]
    TruncatedByLimit,
    #[serde(rename = "read_error")]
    ReadError,
    /// A descendant still held the stream open when the stage ended
    #[serde(rename = "unterminated")]
    Unterminated,
}

impl std::fmt::Display for OutputIntegrity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputIntegrity::Complete => write!(f, "complete"),
            OutputIntegrity::TruncatedByLimit => write!(f, "truncated_by_limit"),
            OutputIntegrity::ReadError => write!(f, "read_error"),
            OutputIntegrity::Unterminated => write!(f, "unterminated"),
        }
    }
}

impl Default for OutputIntegrity {
    fn default() -> Self {
        OutputIntegrity::Complete
    }
}

/// Result of one bounded external-tool invocation.
///
/// `TimedOut` is only ever produced after the child's process group has been
/// killed and the child reaped. It keeps whatever the tool printed before the
/// kill.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StageOutcome {
    /// The process exited on its own. Signal deaths map to `128 + signo`.
    Completed {
        exit_code: i32,
        output: String,
        integrity: OutputIntegrity,
    },
    /// The stage exceeded its bound and was forcibly terminated.
    TimedOut { output: String },
    /// The program could not be started at all (usually: not installed).
    LaunchFailed(String),
}

impl StageOutcome {
    /// True only for a clean zero exit
    pub fn succeeded(&self) -> bool {
        matches!(self, StageOutcome::Completed { exit_code: 0, .. })
    }

    /// Captured output, if the process ran to completion
    pub fn output(&self) -> Option<&str> {
        match self {
            StageOutcome::Completed { output, .. } => Some(output),
            _ => None,
        }
    }

    /// Output captured before the stage was killed on timeout
    pub fn partial_output(&self) -> Option<&str> {
        match self {
            StageOutcome::TimedOut { output } => Some(output),
            _ => None,
        }
    }
}

/// Errors raised by the disassembly pipeline
#[derive(Error, Debug)]
pub enum ScopeError {
    #[error("Workspace error: {0}")]
    Workspace(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A tool ran but did not produce what the next stage needs.
    /// The message is shown to the caller as-is.
    #[error("{message}")]
    Stage {
        message: String,
        tool_output: Option<String>,
    },

    #[error("Failed to launch {program}: {cause}")]
    Launch { program: String, cause: String },

    #[error("{0}")]
    Timeout(String),

    #[error("Compilation failed")]
    Compilation { diagnostics: String },

    #[error("Interrupted while waiting for {0}")]
    Interrupted(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ScopeError {
    pub fn stage(message: impl Into<String>) -> Self {
        ScopeError::Stage {
            message: message.into(),
            tool_output: None,
        }
    }

    /// Stage failure whose message is followed by the tool's own output
    pub fn stage_with_output(message: impl Into<String>, tool_output: impl Into<String>) -> Self {
        ScopeError::Stage {
            message: message.into(),
            tool_output: Some(tool_output.into()),
        }
    }

    /// Message handed back to the caller in a failed `DisassemblyResult`.
    ///
    /// Compiler diagnostics are only appended when `surface_diagnostics` is set.
    pub fn caller_message(&self, surface_diagnostics: bool) -> String {
        match self {
            ScopeError::Stage {
                message,
                tool_output: Some(output),
            } if !output.trim().is_empty() => format!("{message}\n{output}"),
            ScopeError::Compilation { diagnostics }
                if surface_diagnostics && !diagnostics.trim().is_empty() =>
            {
                format!("Compilation failed\n{}", diagnostics.trim_end())
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScopeError>;
