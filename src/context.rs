//! Prompt context assembly for routed agents.
//!
//! Builds the additional-context block that ships alongside a routed prompt:
//! a short header naming the selected agent, the task text, a capped list of
//! touched files, and as much of the working-tree diff as fits a character
//! budget. Diff collection shells out to git and degrades to nothing when
//! git or a repo is unavailable.

use std::path::Path;
use std::time::Duration;

use tracing::debug;

use crate::router::RoutingDecision;
use crate::runner;

/// Maximum file names listed before collapsing to a "+N more" tail.
const MAX_LISTED_FILES: usize = 5;

const GIT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct ContextAssembler {
    char_budget: usize,
}

impl ContextAssembler {
    pub fn new(char_budget: usize) -> Self {
        Self { char_budget }
    }

    /// Assemble the context block. `diffs` is `(path, diff_text)` pairs; the
    /// character budget applies to diff content only, not the framing.
    pub fn assemble(
        &self,
        decision: &RoutingDecision,
        prompt: &str,
        diffs: &[(String, String)],
    ) -> String {
        let mut out = String::new();

        let mode = if decision.specialized {
            "specialized"
        } else {
            "general"
        };
        out.push_str(&format!(
            "Agent: {} ({mode} routing, reason: {})\n",
            decision.agent, decision.reason
        ));
        out.push_str("Return only a unified diff plus a one-line title.\n\n");

        out.push_str("Task:\n");
        out.push_str(prompt.trim());
        out.push('\n');

        if diffs.is_empty() {
            return out;
        }

        out.push_str("\nTouched files:\n");
        for (path, _) in diffs.iter().take(MAX_LISTED_FILES) {
            out.push_str(&format!("  {path}\n"));
        }
        if diffs.len() > MAX_LISTED_FILES {
            out.push_str(&format!("  +{} more\n", diffs.len() - MAX_LISTED_FILES));
        }

        let mut remaining = self.char_budget;
        for (path, diff) in diffs {
            if remaining == 0 {
                break;
            }
            out.push_str(&format!("\n--- diff: {path} ---\n"));
            if diff.len() <= remaining {
                out.push_str(diff);
                remaining -= diff.len();
            } else {
                // Cut on a char boundary at the budget edge.
                let mut cut = remaining;
                while cut > 0 && !diff.is_char_boundary(cut) {
                    cut -= 1;
                }
                out.push_str(&diff[..cut]);
                out.push_str("\n[truncated]\n");
                remaining = 0;
            }
            if !out.ends_with('\n') {
                out.push('\n');
            }
        }

        out
    }
}

/// Collect per-file diffs from the working tree, best effort.
///
/// Prefers `git diff HEAD` so staged changes show up; falls back to the
/// unstaged diff in repos with no commits yet. Any git failure yields an
/// empty list rather than an error.
pub fn collect_diffs(repo: impl AsRef<Path>, max_total_chars: usize) -> Vec<(String, String)> {
    let repo = repo.as_ref();

    let (names, against_head) = match list_changed_files(repo) {
        Some(found) => found,
        None => return Vec::new(),
    };

    let mut collected = 0usize;
    let mut diffs = Vec::new();
    for name in names {
        if collected >= max_total_chars {
            break;
        }
        let mut args = vec!["diff".to_string()];
        if against_head {
            args.push("HEAD".to_string());
        }
        args.push("--".to_string());
        args.push(name.clone());
        let diff = match runner::run_with_timeout("git", &args, repo, GIT_TIMEOUT) {
            Ok(out) if out.success() && !out.stdout.is_empty() => out.stdout,
            _ => continue,
        };
        collected += diff.len();
        diffs.push((name, diff));
    }
    debug!(files = diffs.len(), chars = collected, "Collected working-tree diffs");
    diffs
}

fn list_changed_files(repo: &Path) -> Option<(Vec<String>, bool)> {
    for against_head in [true, false] {
        let mut args = vec!["diff".to_string(), "--name-only".to_string()];
        if against_head {
            args.push("HEAD".to_string());
        }
        match runner::run_with_timeout("git", &args, repo, GIT_TIMEOUT) {
            Ok(out) if out.success() => {
                let names: Vec<String> = out
                    .stdout
                    .lines()
                    .map(|l| l.trim().to_string())
                    .filter(|l| !l.is_empty())
                    .collect();
                return Some((names, against_head));
            }
            Ok(_) => continue,
            Err(_) => return None,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::{AgentKind, RouteReason};

    fn decision() -> RoutingDecision {
        RoutingDecision {
            agent: AgentKind::Tester,
            reason: RouteReason::ExplicitTest,
            specialized: true,
        }
    }

    #[test]
    fn header_names_agent_and_directive() {
        let ctx = ContextAssembler::new(1000).assemble(&decision(), "run the tests", &[]);
        assert!(ctx.contains("Agent: tester"));
        assert!(ctx.contains("explicit_test"));
        assert!(ctx.contains("Return only a unified diff"));
        assert!(ctx.contains("run the tests"));
    }

    #[test]
    fn no_diffs_means_no_file_section() {
        let ctx = ContextAssembler::new(1000).assemble(&decision(), "task", &[]);
        assert!(!ctx.contains("Touched files"));
    }

    #[test]
    fn file_list_caps_at_five_with_more_tail() {
        let diffs: Vec<(String, String)> = (0..8)
            .map(|i| (format!("f{i}.py"), format!("@@ diff {i}\n")))
            .collect();
        let ctx = ContextAssembler::new(10_000).assemble(&decision(), "task", &diffs);
        assert!(ctx.contains("f4.py"));
        assert!(!ctx.contains("  f5.py\n"));
        assert!(ctx.contains("+3 more"));
    }

    #[test]
    fn budget_truncates_oversized_diff() {
        let big = "x".repeat(500);
        let diffs = vec![("a.py".to_string(), big)];
        let ctx = ContextAssembler::new(100).assemble(&decision(), "task", &diffs);
        assert!(ctx.contains("[truncated]"));
        // 100 chars of diff content, not 500.
        assert!(!ctx.contains(&"x".repeat(101)));
        assert!(ctx.contains(&"x".repeat(100)));
    }

    #[test]
    fn later_files_skipped_when_budget_spent() {
        let diffs = vec![
            ("a.py".to_string(), "y".repeat(100)),
            ("b.py".to_string(), "z".repeat(100)),
        ];
        let ctx = ContextAssembler::new(100).assemble(&decision(), "task", &diffs);
        assert!(ctx.contains("--- diff: a.py ---"));
        assert!(!ctx.contains("--- diff: b.py ---"));
    }

    #[test]
    fn collect_diffs_outside_a_repo_is_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(collect_diffs(dir.path(), 10_000).is_empty());
    }
}
