/// Source materialization and the compile stage
use crate::config::presets::Toolchain;
use crate::config::types::{Result, ScopeError, StageOutcome};
use crate::exec::runner::{StageCommand, StageRunner};
use crate::safety::workspace::Workspace;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Write `source` to `<symbol>.<ext>` inside the workspace.
///
/// The file is created exclusively; a second write into the same workspace
/// fails instead of silently replacing the first submission.
pub fn write_source(
    workspace: &Workspace,
    toolchain: &Toolchain,
    symbol: &str,
    source: &str,
) -> Result<PathBuf> {
    let path = workspace.file(&format!("{}.{}", symbol, toolchain.source_extension));

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .map_err(|e| {
            ScopeError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to write source file {}: {}", path.display(), e),
            ))
        })?;
    file.write_all(source.as_bytes())?;
    file.sync_all()?;

    log::debug!("Wrote {} bytes to {}", source.len(), path.display());
    Ok(path)
}

/// Path of the artifact the compiler is expected to leave behind
pub fn artifact_path(workspace: &Workspace, toolchain: &Toolchain, symbol: &str) -> PathBuf {
    workspace.file(&format!("{}.{}", symbol, toolchain.artifact_extension))
}

/// Compile `source_file` inside the workspace.
///
/// Only a zero exit counts as success. Compiler diagnostics travel inside
/// `ScopeError::Compilation`; whether the caller sees them is decided at the
/// pipeline boundary.
pub fn compile(
    runner: &StageRunner,
    toolchain: &Toolchain,
    workspace: &Workspace,
    source_file: &Path,
    timeout: Duration,
) -> Result<()> {
    let argv = toolchain
        .compiler
        .argv([source_file.to_string_lossy().into_owned()]);
    let cmd = StageCommand::new("compile", argv, workspace.path(), timeout);

    match runner.run(&cmd)? {
        StageOutcome::Completed { exit_code: 0, .. } => {
            log::debug!("Compiled {}", source_file.display());
            Ok(())
        }
        StageOutcome::Completed {
            exit_code, output, ..
        } => {
            log::info!("Compiler exited with {} for {}", exit_code, source_file.display());
            Err(ScopeError::Compilation {
                diagnostics: output,
            })
        }
        StageOutcome::TimedOut { .. } => {
            Err(ScopeError::Timeout("Compilation timed out".to_string()))
        }
        StageOutcome::LaunchFailed(cause) => Err(ScopeError::Launch {
            program: toolchain.compiler.program.clone(),
            cause,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::presets::LaunchSpec;
    use crate::safety::workspace::WorkspaceManager;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    fn manager() -> (PathBuf, WorkspaceManager) {
        let root = std::env::temp_dir().join(format!("jvmscope_compile_{}", uuid::Uuid::new_v4()));
        let manager = WorkspaceManager::new(root.clone(), "ws-").unwrap();
        (root, manager)
    }

    fn runner() -> StageRunner {
        StageRunner::new(64 * 1024).with_interrupt_flag(Arc::new(AtomicBool::new(false)))
    }

    fn sh_compiler(script: &str) -> Toolchain {
        Toolchain {
            compiler: LaunchSpec::new("/bin/sh").with_leading_args(["-c", script, "compiler"]),
            ..Toolchain::default()
        }
    }

    #[test]
    fn source_lands_under_symbol_name() {
        let (root, manager) = manager();
        let workspace = manager.acquire().unwrap();
        let toolchain = Toolchain::default();

        let path = write_source(&workspace, &toolchain, "Hello", "class Hello {}").unwrap();
        assert_eq!(path, workspace.path().join("Hello.java"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "class Hello {}");

        assert!(write_source(&workspace, &toolchain, "Hello", "again").is_err());

        workspace.release().unwrap();
        std::fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn non_zero_exit_keeps_diagnostics() {
        let (root, manager) = manager();
        let workspace = manager.acquire().unwrap();
        let toolchain = sh_compiler("echo \"$1:1: error: ';' expected\"; exit 1");
        let source = write_source(&workspace, &toolchain, "Bad", "invalid code").unwrap();

        let err = compile(&runner(), &toolchain, &workspace, &source, Duration::from_secs(5))
            .unwrap_err();
        match err {
            ScopeError::Compilation { diagnostics } => {
                assert!(diagnostics.contains("error: ';' expected"))
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(
            ScopeError::Compilation {
                diagnostics: "x".into()
            }
            .to_string(),
            "Compilation failed"
        );

        workspace.release().unwrap();
        std::fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn slow_compiler_times_out() {
        let (root, manager) = manager();
        let workspace = manager.acquire().unwrap();
        let toolchain = sh_compiler("sleep 30");
        let source = write_source(&workspace, &toolchain, "Slow", "class Slow {}").unwrap();

        let err = compile(
            &runner(),
            &toolchain,
            &workspace,
            &source,
            Duration::from_millis(200),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Compilation timed out");

        workspace.release().unwrap();
        std::fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn missing_compiler_is_a_launch_error() {
        let (root, manager) = manager();
        let workspace = manager.acquire().unwrap();
        let toolchain = Toolchain {
            compiler: LaunchSpec::new("jvmscope-no-such-javac"),
            ..Toolchain::default()
        };
        let source = write_source(&workspace, &toolchain, "A", "class A {}").unwrap();

        let err = compile(&runner(), &toolchain, &workspace, &source, Duration::from_secs(5))
            .unwrap_err();
        assert!(matches!(
            err,
            ScopeError::Launch { ref program, .. } if program == "jvmscope-no-such-javac"
        ));

        workspace.release().unwrap();
        std::fs::remove_dir_all(root).unwrap();
    }
}
