//! Session invocation budget, persisted as a single integer counter.
//!
//! The counter lives in a well-known file under the system temp directory.
//! Writes go through a temp file + atomic rename so readers never observe a
//! torn value. There is deliberately NO lock: concurrent callers can lose an
//! update to each other. That race is an accepted limitation of the budget
//! model — the counter is an estimate, not an accounting ledger.

use std::path::{Path, PathBuf};

use tracing::warn;

/// Environment variable that overrides the default budget estimate — the
/// fallback used when no counter file exists. A persisted counter still
/// wins over it.
pub const BUDGET_ENV_VAR: &str = "CLAUDE_REMAINING_PROMPTS";

/// Read/write access to the remaining-invocation counter.
pub trait BudgetStore {
    /// Current remaining budget. Falls back to the default estimate when no
    /// persisted value exists or it cannot be parsed.
    fn read(&self) -> i64;

    /// Persist a new remaining budget. Best-effort: failures are logged and
    /// swallowed so budget bookkeeping never blocks a routing verdict.
    fn write(&self, remaining: i64);
}

/// File-backed budget counter.
pub struct FileBudgetStore {
    path: PathBuf,
    default_estimate: i64,
}

impl FileBudgetStore {
    pub fn new(path: impl Into<PathBuf>, default_estimate: i64) -> Self {
        Self {
            path: path.into(),
            default_estimate,
        }
    }

    /// The well-known counter location under the system temp directory. The
    /// environment override applies here, replacing `default_estimate`.
    pub fn at_default_path(default_estimate: i64) -> Self {
        Self::new(
            std::env::temp_dir().join("prompt-gates-budget"),
            Self::default_estimate_from_env(default_estimate),
        )
    }

    /// Resolve the default estimate: the `CLAUDE_REMAINING_PROMPTS` value
    /// when set and parseable, otherwise `fallback`.
    pub fn default_estimate_from_env(fallback: i64) -> i64 {
        std::env::var(BUDGET_ENV_VAR)
            .ok()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .unwrap_or(fallback)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read, decrement (floored at 0), persist, and return the NEW value.
    pub fn consume(&self) -> i64 {
        let remaining = (self.read() - 1).max(0);
        self.write(remaining);
        remaining
    }

}

impl BudgetStore for FileBudgetStore {
    fn read(&self) -> i64 {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw.trim().parse::<i64>().unwrap_or(self.default_estimate),
            Err(_) => self.default_estimate,
        }
    }

    fn write(&self, remaining: i64) {
        let tmp = self.path.with_extension("tmp");
        let result = std::fs::write(&tmp, format!("{remaining}\n"))
            .and_then(|_| std::fs::rename(&tmp, &self.path));
        if let Err(e) = result {
            warn!(path = %self.path.display(), "Failed to persist budget counter: {e}");
        }
    }
}
