//! Safety and cleanup
//!
//! Request-scoped workspaces and the tree removal that guarantees they never
//! outlive their run.

pub mod safe_cleanup;
pub mod workspace;
