//! Diff extraction from agent responses, and patch application.
//!
//! Extraction walks an ordered set of fenced-code-block patterns: the first
//! pattern with any match wins and all of its blocks are concatenated. A
//! response that already looks like a raw diff (starts with `---`, `diff`,
//! or `@@`) is used verbatim.
//!
//! Application writes the patch to a scoped temp file (removed on every exit
//! path), dry-runs `git apply --check`, then applies. When git is not
//! available the in-process hunk applier takes over. Failures are reported
//! as retry signals, never fatal to the caller.

use std::io::Write;
use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::{GateError, Result};
use crate::runner;

// ── Extraction ───────────────────────────────────────────────────────────────

/// Fenced-block patterns in preference order. `(?s)` so blocks span lines.
static FENCE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?s)```diff\s*\n(.*?)```",
        r"(?s)```patch\s*\n(.*?)```",
        r"(?s)```\s*\n(.*?)```",
    ]
    .iter()
    .map(|s| Regex::new(s).expect("fence pattern should compile"))
    .collect()
});

fn looks_like_raw_diff(text: &str) -> bool {
    let head = text.trim_start();
    head.starts_with("---") || head.starts_with("diff") || head.starts_with("@@")
}

/// Pull unified-diff text out of a free-text agent response.
///
/// Returns `None` when the response contains nothing patch-shaped.
pub fn extract(response: &str) -> Option<String> {
    for (i, pattern) in FENCE_PATTERNS.iter().enumerate() {
        let blocks: Vec<&str> = pattern
            .captures_iter(response)
            .filter_map(|c| c.get(1).map(|m| m.as_str()))
            .collect();
        if blocks.is_empty() {
            continue;
        }
        // The bare-fence fallback only counts when the content is diff-shaped.
        if i == 2 && !blocks.iter().any(|b| looks_like_raw_diff(b) || b.contains("@@")) {
            continue;
        }
        let joined = blocks.join("\n");
        debug!(pattern = i, blocks = blocks.len(), "Extracted fenced patch");
        return Some(joined);
    }

    if looks_like_raw_diff(response) {
        return Some(response.to_string());
    }
    None
}

// ── Application ──────────────────────────────────────────────────────────────

/// Result of a patch application attempt. Failure is a retry signal for the
/// orchestrator, not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyOutcome {
    pub success: bool,
    pub message: String,
}

/// Applies extracted patches inside one working directory.
pub struct PatchApplier {
    working_dir: PathBuf,
    timeout: Duration,
}

impl PatchApplier {
    pub fn new(working_dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            working_dir: working_dir.into(),
            timeout,
        }
    }

    /// Dry-run check, then apply. Prefers `git apply`; falls back to the
    /// in-process applier when git is missing.
    pub fn apply(&self, patch: &str) -> ApplyOutcome {
        let mut normalized = patch.to_string();
        if !normalized.ends_with('\n') {
            normalized.push('\n');
        }

        // NamedTempFile removes itself on drop — every exit path included.
        let tmp = match tempfile::NamedTempFile::new() {
            Ok(mut f) => match f.write_all(normalized.as_bytes()) {
                Ok(()) => f,
                Err(e) => {
                    return ApplyOutcome {
                        success: false,
                        message: format!("failed to stage patch: {e}"),
                    }
                }
            },
            Err(e) => {
                return ApplyOutcome {
                    success: false,
                    message: format!("failed to create patch temp file: {e}"),
                }
            }
        };
        let tmp_path = tmp.path().display().to_string();

        match self.git_apply(&tmp_path, true) {
            Ok(true) => {}
            Ok(false) => {
                return ApplyOutcome {
                    success: false,
                    message: "patch does not apply cleanly (dry-run rejected)".to_string(),
                }
            }
            Err(GateError::CommandNotFound(_)) => {
                debug!("git not available, using in-process applier");
                return self.apply_in_process(&normalized);
            }
            Err(e) => {
                warn!("git apply dry-run failed: {e}");
                return ApplyOutcome {
                    success: false,
                    message: format!("dry-run failed: {e}"),
                };
            }
        }

        match self.git_apply(&tmp_path, false) {
            Ok(true) => ApplyOutcome {
                success: true,
                message: "patch applied".to_string(),
            },
            Ok(false) => ApplyOutcome {
                success: false,
                message: "git apply rejected the patch after a clean dry-run".to_string(),
            },
            Err(e) => ApplyOutcome {
                success: false,
                message: format!("git apply failed: {e}"),
            },
        }
    }

    fn git_apply(&self, patch_path: &str, check_only: bool) -> Result<bool> {
        let mut args = vec!["apply".to_string()];
        if check_only {
            args.push("--check".to_string());
        }
        args.push(patch_path.to_string());
        let output = runner::run_with_timeout("git", &args, &self.working_dir, self.timeout)?;
        Ok(output.exit_code == Some(0))
    }

    fn apply_in_process(&self, patch: &str) -> ApplyOutcome {
        let segments = match split_by_file(patch) {
            Ok(s) => s,
            Err(e) => {
                return ApplyOutcome {
                    success: false,
                    message: e.to_string(),
                }
            }
        };
        if segments.is_empty() {
            return ApplyOutcome {
                success: false,
                message: "patch names no target files".to_string(),
            };
        }

        // Dry-run every segment before writing anything.
        let mut patched: Vec<(PathBuf, String)> = Vec::new();
        for segment in &segments {
            let target = self.working_dir.join(&segment.path);
            let original = std::fs::read_to_string(&target).unwrap_or_default();
            match apply_unified_diff(&original, &segment.diff) {
                Ok(result) => patched.push((target, result.patched)),
                Err(e) => {
                    return ApplyOutcome {
                        success: false,
                        message: format!("{}: {e}", segment.path),
                    }
                }
            }
        }
        for (target, content) in &patched {
            if let Some(parent) = target.parent() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    return ApplyOutcome {
                        success: false,
                        message: format!("{}: {e}", target.display()),
                    };
                }
            }
            if let Err(e) = std::fs::write(target, content) {
                return ApplyOutcome {
                    success: false,
                    message: format!("{}: {e}", target.display()),
                };
            }
        }
        ApplyOutcome {
            success: true,
            message: format!("patch applied to {} file(s)", patched.len()),
        }
    }
}

// ── In-process unified diff applier ──────────────────────────────────────────

struct FileSegment {
    path: String,
    diff: String,
}

/// Split a multi-file unified diff into per-file segments keyed by the
/// `+++ b/<path>` header. A `+++ /dev/null` target marks a file deletion,
/// which this applier does not support.
fn split_by_file(patch: &str) -> Result<Vec<FileSegment>> {
    let mut segments: Vec<FileSegment> = Vec::new();
    let mut current: Option<FileSegment> = None;

    for line in patch.lines() {
        if let Some(rest) = line
            .strip_prefix("+++ b/")
            .or_else(|| line.strip_prefix("+++ "))
        {
            if rest.trim() == "/dev/null" {
                return Err(GateError::Patch(
                    "patch deletes a file; deletions need git apply".to_string(),
                ));
            }
            if let Some(seg) = current.take() {
                segments.push(seg);
            }
            current = Some(FileSegment {
                path: rest.trim().to_string(),
                diff: String::new(),
            });
        } else if let Some(ref mut seg) = current {
            if line.starts_with("diff ") || line.starts_with("--- ") {
                continue;
            }
            seg.diff.push_str(line);
            seg.diff.push('\n');
        }
    }
    if let Some(seg) = current {
        segments.push(seg);
    }

    if segments.is_empty() && patch.contains("@@") {
        return Err(GateError::Patch(
            "diff has hunks but no '+++ b/<path>' file header".to_string(),
        ));
    }
    Ok(segments)
}

#[derive(Debug)]
struct PatchResult {
    patched: String,
}

#[derive(Debug)]
struct Hunk {
    orig_start: usize,
    /// Lines with their diff prefix: ' ' (context), '-' (remove), '+' (add).
    lines: Vec<(char, String)>,
}

/// Parse and apply single-file unified-diff hunks to `original` text.
fn apply_unified_diff(original: &str, diff: &str) -> Result<PatchResult> {
    let hunks = parse_hunks(diff)?;
    if hunks.is_empty() {
        return Err(GateError::Patch("no hunks in patch".to_string()));
    }

    let mut result: Vec<String> = original.lines().map(|l| l.to_string()).collect();
    let mut offset: i64 = 0;

    for hunk in &hunks {
        let adjusted_start = (hunk.orig_start as i64 + offset - 1).max(0) as usize;

        let expected_orig: Vec<&str> = hunk
            .lines
            .iter()
            .filter(|(op, _)| *op == ' ' || *op == '-')
            .map(|(_, c)| c.as_str())
            .collect();

        for (i, &expected) in expected_orig.iter().enumerate() {
            let file_idx = adjusted_start + i;
            if file_idx >= result.len() {
                return Err(GateError::HunkApply {
                    line: file_idx + 1,
                    message: format!(
                        "file has {} lines but hunk expects line {}",
                        result.len(),
                        file_idx + 1
                    ),
                });
            }
            if result[file_idx] != expected {
                return Err(GateError::HunkApply {
                    line: file_idx + 1,
                    message: format!(
                        "context mismatch: expected {:?}, found {:?}",
                        expected, result[file_idx]
                    ),
                });
            }
        }

        let replacement: Vec<String> = hunk
            .lines
            .iter()
            .filter(|(op, _)| *op == ' ' || *op == '+')
            .map(|(_, c)| c.clone())
            .collect();

        let orig_span = expected_orig.len();
        result.splice(adjusted_start..adjusted_start + orig_span, replacement.iter().cloned());
        offset += replacement.len() as i64 - orig_span as i64;
    }

    let mut patched = result.join("\n");
    if original.is_empty() || original.ends_with('\n') {
        patched.push('\n');
    }

    Ok(PatchResult { patched })
}

fn parse_hunks(diff: &str) -> Result<Vec<Hunk>> {
    let mut hunks: Vec<Hunk> = Vec::new();
    let mut current: Option<Hunk> = None;

    for (lineno, line) in diff.lines().enumerate() {
        if line.starts_with("@@") {
            if let Some(h) = current.take() {
                hunks.push(h);
            }
            let orig_start = parse_hunk_header(line)
                .map_err(|e| GateError::Patch(format!("line {}: {e}", lineno + 1)))?;
            current = Some(Hunk {
                orig_start,
                lines: Vec::new(),
            });
        } else if line.starts_with("---") || line.starts_with("+++") {
            continue;
        } else if let Some(ref mut hunk) = current {
            if let Some(stripped) = line.strip_prefix('-') {
                hunk.lines.push(('-', stripped.to_string()));
            } else if let Some(stripped) = line.strip_prefix('+') {
                hunk.lines.push(('+', stripped.to_string()));
            } else {
                let stripped = line.strip_prefix(' ').unwrap_or(line);
                hunk.lines.push((' ', stripped.to_string()));
            }
        }
        // Lines before the first @@ header (index, stats) are ignored.
    }
    if let Some(h) = current {
        hunks.push(h);
    }
    Ok(hunks)
}

/// Parse `@@ -L[,N] +L[,N] @@` and return the original start line.
fn parse_hunk_header(header: &str) -> std::result::Result<usize, String> {
    let inner = header
        .split("@@")
        .nth(1)
        .ok_or_else(|| "malformed hunk header".to_string())?
        .trim();
    let orig = inner
        .split_whitespace()
        .next()
        .ok_or_else(|| format!("empty hunk header: {header}"))?
        .trim_start_matches('-');
    let start = orig.split(',').next().unwrap_or(orig);
    start
        .parse::<usize>()
        .map_err(|e| format!("bad line number '{start}': {e}"))
}

/// Round-trip helper used by the verify path: apply `diff` to `original`
/// purely in memory.
pub fn apply_to_text(original: &str, diff: &str) -> Result<String> {
    apply_unified_diff(original, diff).map(|r| r.patched)
}
