/// Bytecode view: the class printer's verbose listing, unmodified
use crate::config::types::{Result, ScopeError, StageOutcome};
use crate::core::types::ViewKind;
use crate::exec::runner::StageCommand;
use crate::views::adapter::{DisassemblyView, ViewContext};

#[derive(Debug, Clone, Default)]
pub struct BytecodeView;

impl DisassemblyView for BytecodeView {
    fn kind(&self) -> ViewKind {
        ViewKind::Bytecode
    }

    fn render(&self, ctx: &ViewContext<'_>) -> Result<String> {
        disassemble_bytecode(ctx)
    }
}

/// Run `javap -c -verbose -p <symbol>` in the workspace and return its output.
///
/// The printer's exit status is not interpreted; whatever it printed is the
/// listing, including its own error text.
pub fn disassemble_bytecode(ctx: &ViewContext<'_>) -> Result<String> {
    let printer = &ctx.config.toolchain.bytecode_printer;
    let argv = printer.argv(["-c", "-verbose", "-p", ctx.symbol]);
    let cmd = StageCommand::new(
        "bytecode",
        argv,
        ctx.workspace.path(),
        ctx.config.stage_timeout(),
    );

    match ctx.runner.run(&cmd)? {
        StageOutcome::Completed {
            exit_code, output, ..
        } => {
            if exit_code != 0 {
                log::info!("Bytecode printer exited with {}", exit_code);
            }
            Ok(output)
        }
        StageOutcome::TimedOut { .. } => {
            Err(ScopeError::Timeout("Disassembly timed out".to_string()))
        }
        StageOutcome::LaunchFailed(cause) => Err(ScopeError::Launch {
            program: printer.program.clone(),
            cause,
        }),
    }
}
