//! jvmscope: bytecode, JIT and AOT disassembly views for Java snippets
//!
//! Submitted source is compiled in a throwaway workspace and inspected with
//! external JDK / GraalVM / binutils tools. Every tool invocation is bounded,
//! every workspace is removed, and every failure comes back as a
//! [`core::types::DisassemblyResult`].
//!
//! # Architecture
//!
//! ## Core ([`core`])
//! - [`core::pipeline`]: Orchestrator (workspace, compile, view, cleanup)
//! - [`core::compile`]: Source materialization and the compile stage
//! - [`core::types`]: Request, result and view kinds
//! - [`core::deps`]: Toolchain availability check
//!
//! ## Views ([`views`])
//! - [`views::bytecode`]: `javap -c -verbose -p`
//! - [`views::jit`]: HotSpot PrintAssembly with hsdis detection
//! - [`views::aot`]: native-image build and objdump probing
//! - [`views::aot_filter`]: Listing reduction to the class's functions
//!
//! ## Execution Control ([`exec`])
//! - [`exec::runner`]: Bounded stage runner with merged output
//!
//! ## Kernel Primitives ([`kernel`])
//! - [`kernel::process`]: Process-group signalling and liveness
//! - [`kernel::signal`]: Interrupt flag and handlers
//!
//! ## Safety & Cleanup ([`safety`])
//! - [`safety::workspace`]: Request-scoped workspaces and the orphan reaper
//! - [`safety::safe_cleanup`]: Symlink-safe recursive removal
//!
//! ## Observability ([`observability`])
//! - [`observability::audit`]: Structured pipeline events
//!
//! ## Configuration ([`config`])
//! - [`config::config`]: Pipeline configuration loading and validation
//! - [`config::presets`]: Toolchain program names
//! - [`config::types`]: Error taxonomy and stage outcomes
//!
//! ## Utilities ([`utils`])
//! - [`utils::output`]: Bounded output collection
//! - [`utils::sanitize`]: Input and log sanitization

// Kernel Primitives
pub mod kernel;

// Execution Control
pub mod exec;

// Orchestration
pub mod core;

// Disassembly views
pub mod views;

// Safety & Cleanup
pub mod safety;

// Observability
pub mod observability;

// Configuration
pub mod config;

// Utilities
pub mod utils;

// CLI entrypoint for the jvmscope binary
pub mod cli;

pub use crate::config::config::PipelineConfig;
pub use crate::config::types::{Result, ScopeError, StageOutcome};
pub use crate::core::pipeline::Pipeline;
pub use crate::core::types::{CompilationRequest, DisassemblyResult, ViewKind};
