//! Error taxonomy for the routing/validation gate layer.
//!
//! Callers can query `is_retry_signal()` instead of string matching. Rule
//! violations are NOT errors — they come back as structured verdicts with
//! their own exit code. Errors here are tooling faults: bad input framing,
//! patch machinery, external commands, configuration.

use std::time::Duration;

use thiserror::Error;

/// Unified error type for all gate operations.
#[derive(Debug, Error)]
pub enum GateError {
    /// Input framing was wrong (bad JSON on stdin, unreadable file).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A patch could not be parsed out of the response or its headers.
    #[error("patch error: {0}")]
    Patch(String),

    /// A hunk failed to apply at a specific line.
    #[error("hunk apply error at line {line}: {message}")]
    HunkApply { line: usize, message: String },

    /// The external command binary does not exist on this host.
    #[error("command not found: {0}")]
    CommandNotFound(String),

    /// The external command exceeded its wall-clock budget and was killed.
    #[error("command timed out after {0:?}: {1}")]
    CommandTimeout(Duration, String),

    /// Configuration is invalid or missing required fields.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Any other fault that doesn't fit the above categories.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl GateError {
    /// `true` when the orchestrator should treat this as "try again later"
    /// rather than a terminal fault: patch misfires and flaky commands are
    /// surfaced as retry signals, never fatal to the caller.
    pub fn is_retry_signal(&self) -> bool {
        matches!(
            self,
            Self::Patch(_)
                | Self::HunkApply { .. }
                | Self::CommandNotFound(_)
                | Self::CommandTimeout(_, _)
        )
    }
}

pub type Result<T> = std::result::Result<T, GateError>;
