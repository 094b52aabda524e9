/// JIT view: HotSpot's PrintAssembly output for the target class
///
/// PrintAssembly needs the separately installed hsdis plugin. Without it the
/// JVM prints a warning instead of machine code, so the raw output is
/// classified before it is returned.
use crate::config::types::{Result, ScopeError, StageOutcome};
use crate::core::types::ViewKind;
use crate::exec::runner::StageCommand;
use crate::views::adapter::{DisassemblyView, ViewContext};

const HSDIS_LOAD_FAILURE: &str = "Could not load hsdis";
const PRINT_ASSEMBLY_WARNING: &str = "PrintAssembly is enabled";
const ASSEMBLY_MARKERS: [&str; 2] = ["<nmethod", "Assembly"];

/// What a JIT run actually produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JitClassification {
    /// Output carries (or may carry) disassembled code; return it as-is
    Assembly,
    /// The disassembler backend is missing; only a warning was printed
    BackendUnavailable,
}

/// Classify raw JVM output.
///
/// The warning line itself contains "PrintAssembly", so assembly markers are
/// only looked for in lines other than the warning.
pub fn classify_jit_output(output: &str) -> JitClassification {
    if output.contains(HSDIS_LOAD_FAILURE) {
        return JitClassification::BackendUnavailable;
    }
    if !output.contains(PRINT_ASSEMBLY_WARNING) {
        return JitClassification::Assembly;
    }

    let has_code = output
        .lines()
        .filter(|line| !line.contains(PRINT_ASSEMBLY_WARNING))
        .any(|line| ASSEMBLY_MARKERS.iter().any(|marker| line.contains(marker)));

    if has_code {
        JitClassification::Assembly
    } else {
        JitClassification::BackendUnavailable
    }
}

/// Install guidance followed by the JVM's own output
pub fn hsdis_remediation(raw_output: &str) -> String {
    format!(
        "HotSpot Disassembler (hsdis) plugin is not installed.\n\n\
         To use the JIT assembly view, install the hsdis plugin for your JVM:\n\n\
         1. Download or build the hsdis library for your platform:\n   \
            https://github.com/openjdk/jdk/tree/master/src/utils/hsdis\n\n\
         2. Place the library (hsdis-<arch>.so, .dylib or .dll) in your JDK's lib directory:\n   \
            - Linux/Mac: $JAVA_HOME/lib/\n   \
            - Windows: $JAVA_HOME\\lib\\\n\n\
         Original output:\n{}",
        raw_output
    )
}

#[derive(Debug, Clone, Default)]
pub struct JitView;

impl DisassemblyView for JitView {
    fn kind(&self) -> ViewKind {
        ViewKind::Jit
    }

    fn render(&self, ctx: &ViewContext<'_>) -> Result<String> {
        capture_jit_output(ctx)
    }
}

/// Run the class under the JVM with PrintAssembly restricted to its methods.
pub fn capture_jit_output(ctx: &ViewContext<'_>) -> Result<String> {
    let runtime = &ctx.config.toolchain.runtime;
    let argv = runtime.argv([
        "-XX:+UnlockDiagnosticVMOptions".to_string(),
        "-XX:+PrintAssembly".to_string(),
        format!("-XX:CompileOnly={}::*", ctx.symbol),
        ctx.symbol.to_string(),
    ]);
    let cmd = StageCommand::new("jit", argv, ctx.workspace.path(), ctx.config.stage_timeout());

    let output = match ctx.runner.run(&cmd)? {
        StageOutcome::Completed { output, .. } => output,
        StageOutcome::TimedOut { .. } => {
            return Err(ScopeError::Timeout("JIT disassembly timed out".to_string()))
        }
        StageOutcome::LaunchFailed(cause) => {
            return Err(ScopeError::Launch {
                program: runtime.program.clone(),
                cause,
            })
        }
    };

    match classify_jit_output(&output) {
        JitClassification::Assembly => Ok(output),
        JitClassification::BackendUnavailable => {
            log::info!("hsdis not available; returning install guidance");
            Ok(hsdis_remediation(&output))
        }
    }
}
