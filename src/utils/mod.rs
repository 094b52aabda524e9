//! Utilities
//!
//! Bounded output collection and input sanitization.

pub mod output;
pub mod sanitize;
