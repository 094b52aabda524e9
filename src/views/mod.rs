//! Disassembly views
//!
//! Each view consumes a workspace holding a compiled class and produces one
//! textual representation: JVM bytecode, JIT machine code or AOT machine code.

pub mod adapter;
pub mod aot;
pub mod aot_filter;
pub mod bytecode;
pub mod jit;
pub mod registry;
