/// Toolchain availability check
use crate::config::presets::Toolchain;
use crate::config::types::StageOutcome;
use crate::exec::runner::{StageCommand, StageRunner};
use serde::Serialize;
use std::time::Duration;

const CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of asking one tool for its version
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ToolStatus {
    /// Role of the tool in the pipeline ("compiler", "disassembler", ...)
    pub role: String,
    pub program: String,
    pub available: bool,
    /// First line the tool printed, or why it could not be run
    pub detail: String,
}

/// Check every tool in `toolchain`.
///
/// A tool counts as available when it launches and exits cleanly.
pub fn check_toolchain(toolchain: &Toolchain) -> Vec<ToolStatus> {
    check_toolchain_with(&StageRunner::new(64 * 1024), toolchain)
}

pub fn check_toolchain_with(runner: &StageRunner, toolchain: &Toolchain) -> Vec<ToolStatus> {
    let cwd = std::env::temp_dir();

    toolchain
        .version_checks()
        .into_iter()
        .map(|(role, spec, version_arg)| {
            let cmd = StageCommand::new(
                "version-check",
                spec.argv([version_arg]),
                cwd.clone(),
                CHECK_TIMEOUT,
            );
            let (available, detail) = match runner.run(&cmd) {
                Ok(StageOutcome::Completed {
                    exit_code: 0,
                    output,
                    ..
                }) => (
                    true,
                    output
                        .lines()
                        .map(str::trim)
                        .find(|line| !line.is_empty())
                        .unwrap_or("")
                        .to_string(),
                ),
                Ok(StageOutcome::Completed { exit_code, .. }) => {
                    (false, format!("exited with {}", exit_code))
                }
                Ok(StageOutcome::TimedOut { .. }) => (false, "timed out".to_string()),
                Ok(StageOutcome::LaunchFailed(cause)) => (false, format!("not found ({})", cause)),
                Err(e) => (false, e.to_string()),
            };

            ToolStatus {
                role: role.to_string(),
                program: spec.program.clone(),
                available,
                detail,
            }
        })
        .collect()
}
