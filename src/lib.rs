//! Deterministic routing and policy gates for prompt-driven coding agents.
//!
//! The library side of `prompt-gates`: classify a prompt's intent, pick an
//! agent, assemble working-tree context, extract and apply returned diffs,
//! and validate written files against the house style/scope/docs/simplicity
//! rules. Everything is synchronous and I/O-light; the CLI in `main.rs`
//! wires these pieces into hook-friendly JSON commands.

pub mod budget;
pub mod config;
pub mod context;
pub mod errors;
pub mod patch;
pub mod router;
pub mod runner;
pub mod telemetry;
pub mod validators;

pub use config::GateConfig;
pub use errors::{GateError, Result};
