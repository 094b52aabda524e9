/// AOT view: native-image build, objdump, then the listing filter
use crate::config::types::{Result, ScopeError, StageOutcome};
use crate::core::compile::artifact_path;
use crate::core::types::ViewKind;
use crate::exec::runner::StageCommand;
use crate::utils::sanitize::sanitize_for_log;
use crate::views::adapter::{DisassemblyView, ViewContext};
use crate::views::aot_filter::filter_listing;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

const DISASSEMBLER_ARGS: [&str; 5] = ["-d", "-C", "-M", "intel", "--no-show-raw-insn"];

#[derive(Debug, Clone, Default)]
pub struct AotView;

impl DisassemblyView for AotView {
    fn kind(&self) -> ViewKind {
        ViewKind::Aot
    }

    fn render(&self, ctx: &ViewContext<'_>) -> Result<String> {
        capture_aot_output(ctx)
    }
}

/// Where native-image is told to write the executable
pub fn native_binary_path(ctx: &ViewContext<'_>) -> PathBuf {
    ctx.workspace.file(&ctx.symbol.to_lowercase())
}

pub fn capture_aot_output(ctx: &ViewContext<'_>) -> Result<String> {
    let artifact = artifact_path(ctx.workspace, &ctx.config.toolchain, ctx.symbol);
    if !artifact.is_file() {
        return Err(ScopeError::stage("Class file not found"));
    }

    let binary = build_native_image(ctx)?;

    std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o755))?;

    let listing = run_disassembler(ctx, &binary)?;
    Ok(filter_listing(&listing, ctx.symbol))
}

fn build_native_image(ctx: &ViewContext<'_>) -> Result<PathBuf> {
    let native = &ctx.config.toolchain.native_compiler;
    let binary = native_binary_path(ctx);
    let argv = native.argv([
        "--no-fallback".to_string(),
        "-cp".to_string(),
        ctx.workspace.path().to_string_lossy().into_owned(),
        "-o".to_string(),
        binary.to_string_lossy().into_owned(),
        ctx.symbol.to_string(),
    ]);
    let cmd = StageCommand::new(
        "native-image",
        argv,
        ctx.workspace.path(),
        ctx.config.native_build_timeout(),
    );

    match ctx.runner.run(&cmd)? {
        StageOutcome::Completed {
            exit_code: 0,
            output,
            ..
        } => {
            if binary.is_file() {
                Ok(binary)
            } else {
                Err(ScopeError::stage_with_output(
                    "Native image generation did not produce an executable",
                    output,
                ))
            }
        }
        StageOutcome::Completed {
            exit_code, output, ..
        } => {
            log::info!("native-image exited with {}", exit_code);
            Err(ScopeError::stage_with_output(
                "Native image generation failed",
                output,
            ))
        }
        StageOutcome::TimedOut { output } => Err(ScopeError::stage_with_output(
            "Native image generation timed out",
            output,
        )),
        StageOutcome::LaunchFailed(cause) => Err(ScopeError::Launch {
            program: native.program.clone(),
            cause,
        }),
    }
}

/// Try each configured disassembler in order; the first clean, non-empty
/// listing wins.
///
/// Candidates that are missing, fail, or print nothing are skipped. Each one
/// is bounded by the disassembler timeout, and one that hangs is fatal.
pub fn run_disassembler(ctx: &ViewContext<'_>, binary: &Path) -> Result<String> {
    let binary_arg = binary.to_string_lossy().into_owned();

    for candidate in &ctx.config.toolchain.disassembler_candidates {
        let argv = candidate.argv(
            DISASSEMBLER_ARGS
                .iter()
                .map(|a| a.to_string())
                .chain(std::iter::once(binary_arg.clone())),
        );
        let cmd = StageCommand::new(
            "disassemble",
            argv,
            ctx.workspace.path(),
            ctx.config.disassembler_timeout(),
        );

        match ctx.runner.run(&cmd)? {
            StageOutcome::Completed {
                exit_code: 0,
                output,
                ..
            } if !output.trim().is_empty() => {
                log::debug!("Disassembled with {}", candidate.program);
                return Ok(output);
            }
            StageOutcome::Completed { exit_code, .. } => {
                log::debug!(
                    "Disassembler {} gave no listing (exit {})",
                    sanitize_for_log(&candidate.program),
                    exit_code
                );
            }
            StageOutcome::LaunchFailed(cause) => {
                log::debug!(
                    "Disassembler {} unavailable: {}",
                    sanitize_for_log(&candidate.program),
                    cause
                );
            }
            StageOutcome::TimedOut { .. } => {
                return Err(ScopeError::Timeout(
                    "Native disassembly timed out".to_string(),
                ))
            }
        }
    }

    Err(ScopeError::stage(
        "Could not disassemble the native executable. objdump is required \
         (install binutils; on macOS: brew install binutils)",
    ))
}
