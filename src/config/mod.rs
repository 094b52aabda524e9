//! Configuration
//!
//! Pipeline configuration, toolchain presets and shared type definitions.

pub mod config;
pub mod presets;
pub mod types;
