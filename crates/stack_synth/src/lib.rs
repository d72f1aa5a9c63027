//! Command-line surface and container tooling for stack synthesis.
//!
//! This crate owns settings resolution and the docker-backed artifact
//! builder. Stack semantics live in `stack_core`.

pub mod adapters;
pub mod cli;
