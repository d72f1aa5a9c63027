//! Stack assembly primitives for a single HTTP-triggered function.
//!
//! This crate turns resolved deployment settings into a CloudFormation
//! template and cloud assembly. It intentionally excludes settings
//! resolution and container tooling; those live in `stack_synth`.

pub mod artifact;
pub mod assembler;
pub mod assembly;
pub mod compute;
pub mod error;
pub mod gateway;
pub mod permissions;
pub mod settings;
pub mod synth;
pub mod tags;
pub mod template;
pub mod unit;
