//! Disassembly core.
//!
//! Request types, the compile stage, the orchestrator that ties workspace,
//! compile and view together, and the toolchain check.

pub mod compile;
pub mod deps;
pub mod pipeline;
pub mod types;
