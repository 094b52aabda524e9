//! Execution control
//!
//! Bounded invocation of external tools.

pub mod runner;
