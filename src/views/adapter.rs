use crate::config::config::PipelineConfig;
use crate::config::types::Result;
use crate::core::types::ViewKind;
use crate::exec::runner::StageRunner;
use crate::safety::workspace::Workspace;

/// Everything a view needs once the compile stage has succeeded
pub struct ViewContext<'a> {
    pub runner: &'a StageRunner,
    pub config: &'a PipelineConfig,
    pub workspace: &'a Workspace,
    /// Sanitized class name; the compiled artifact is `<symbol>.class`
    pub symbol: &'a str,
}

/// View contract: turn a compiled workspace into one textual representation.
pub trait DisassemblyView: Send + Sync {
    fn kind(&self) -> ViewKind;
    fn render(&self, ctx: &ViewContext<'_>) -> Result<String>;
}
