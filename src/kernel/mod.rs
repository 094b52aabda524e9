//! Kernel primitives
//!
//! - [`process`]: process-group signalling and liveness checks
//! - [`signal`]: async-safe interrupt flag

pub mod process;
pub mod signal;
