//! Observability
//!
//! Structured audit events for pipeline runs and stages.

pub mod audit;
