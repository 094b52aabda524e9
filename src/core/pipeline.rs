/// Pipeline orchestrator
///
/// One run: acquire a workspace, write the source, compile, render the
/// requested view, release the workspace. Every failure (panics included) is
/// converted into a failed `DisassemblyResult` here; nothing escapes.
use crate::config::config::PipelineConfig;
use crate::config::types::Result;
use crate::core::compile;
use crate::core::types::{CompilationRequest, DisassemblyResult, RawCompilationRequest, ViewKind};
use crate::exec::runner::StageRunner;
use crate::observability::audit::{events, Correlation};
use crate::safety::workspace::{Workspace, WorkspaceManager};
use crate::utils::sanitize::sanitize_for_log;
use crate::views::adapter::ViewContext;
use crate::views::registry::view_for;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

pub struct Pipeline {
    config: PipelineConfig,
    workspaces: WorkspaceManager,
    runner: StageRunner,
}

impl Pipeline {
    /// Validate `config`, prepare the temp root and sweep stale workspaces.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let workspaces =
            WorkspaceManager::new(config.temp_root.clone(), config.workspace_prefix.clone())?;

        match workspaces.reap_orphans(config.orphan_max_age()) {
            Ok(0) => {}
            Ok(count) => events::orphans_reaped(count, workspaces.temp_root()),
            Err(e) => log::warn!("Orphan sweep failed: {}", e),
        }

        let runner = StageRunner::new(config.max_output_bytes);
        Ok(Self {
            config,
            workspaces,
            runner,
        })
    }

    /// Replace the stage runner (custom interrupt flag, grace period)
    pub fn with_runner(mut self, runner: StageRunner) -> Self {
        self.runner = runner;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn workspaces(&self) -> &WorkspaceManager {
        &self.workspaces
    }

    pub fn bytecode(&self, request: &CompilationRequest) -> DisassemblyResult {
        self.run(ViewKind::Bytecode, request)
    }

    pub fn jit(&self, request: &CompilationRequest) -> DisassemblyResult {
        self.run(ViewKind::Jit, request)
    }

    pub fn aot(&self, request: &CompilationRequest) -> DisassemblyResult {
        self.run(ViewKind::Aot, request)
    }

    /// Sanitize a wire request and run it; invalid input becomes a failed result.
    pub fn submit(&self, kind: ViewKind, raw: RawCompilationRequest) -> DisassemblyResult {
        match CompilationRequest::try_from(raw) {
            Ok(request) => self.run(kind, &request),
            Err(e) => DisassemblyResult::failure(e.to_string()),
        }
    }

    pub fn run(&self, kind: ViewKind, request: &CompilationRequest) -> DisassemblyResult {
        let started = Instant::now();
        let mut correlation = Correlation::new(kind.as_str());
        events::run_start(&correlation, request.symbol_name());

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.execute(kind, request, &mut correlation)
        }));

        let result = match outcome {
            Ok(Ok(text)) => DisassemblyResult::success(text),
            Ok(Err(e)) => {
                log::info!(
                    "{} view failed for {}: {}",
                    kind,
                    sanitize_for_log(request.symbol_name()),
                    e
                );
                let surface = self.config.surface_compiler_diagnostics;
                DisassemblyResult::failure(e.caller_message(surface))
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                log::error!("{} view panicked: {}", kind, message);
                DisassemblyResult::failure(format!("Internal error: {}", message))
            }
        };

        events::run_end(&correlation, result.succeeded, started.elapsed());
        result
    }

    fn execute(
        &self,
        kind: ViewKind,
        request: &CompilationRequest,
        correlation: &mut Correlation,
    ) -> Result<String> {
        let workspace = self.workspaces.acquire()?;
        *correlation = correlation.clone().with_workspace(workspace.name());

        // stage events of this run carry its request id and workspace
        let runner = self.runner.clone().with_correlation(correlation.clone());
        let rendered = self.render_in(&runner, &workspace, kind, request);

        // the view's own result wins over a cleanup failure
        match workspace.release() {
            Ok(()) => events::cleanup_success(correlation),
            Err(e) => {
                log::warn!("Workspace cleanup failed: {}", e);
                events::cleanup_failure(correlation, &e.to_string());
            }
        }

        rendered
    }

    fn render_in(
        &self,
        runner: &StageRunner,
        workspace: &Workspace,
        kind: ViewKind,
        request: &CompilationRequest,
    ) -> Result<String> {
        let toolchain = &self.config.toolchain;
        let symbol = request.symbol_name();

        let source = compile::write_source(workspace, toolchain, symbol, request.source_text())?;
        compile::compile(
            runner,
            toolchain,
            workspace,
            &source,
            self.config.stage_timeout(),
        )?;

        let ctx = ViewContext {
            runner,
            config: &self.config,
            workspace,
            symbol,
        };
        view_for(kind).render(&ctx)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
