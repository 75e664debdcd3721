//! Scope rule family: session path policy, forbidden constructs in core
//! directories, bracket balance, and indentation consistency.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::GateConfig;
use crate::validators::source::{indent_width, mask_code, ParseOutcome};
use crate::validators::Violation;

pub const RULE_PATH: &str = "scope.path";
pub const RULE_FORBIDDEN_CONSTRUCT: &str = "scope.forbidden_construct";
pub const RULE_BRACKET_BALANCE: &str = "scope.bracket_balance";
pub const RULE_INDENTATION: &str = "scope.indentation";

/// Debug/test constructs disallowed inside core directories.
struct ForbiddenConstruct {
    pattern: &'static str,
    label: &'static str,
}

const FORBIDDEN_CONSTRUCTS: &[ForbiddenConstruct] = &[
    ForbiddenConstruct {
        pattern: r"^\s*assert\b",
        label: "assert statement",
    },
    ForbiddenConstruct {
        pattern: r"^\s*(?:async\s+)?def\s+test_\w+",
        label: "test function",
    },
    ForbiddenConstruct {
        pattern: r"\bbreakpoint\s*\(",
        label: "breakpoint call",
    },
    ForbiddenConstruct {
        pattern: r"\bpdb\.set_trace\s*\(",
        label: "pdb.set_trace call",
    },
    ForbiddenConstruct {
        // The "__main__" literal itself sits in a (masked) string, so match
        // on the comparison head only.
        pattern: r"^\s*if\s+__name__\s*==",
        label: "__main__ guard",
    },
];

static FORBIDDEN_RES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    FORBIDDEN_CONSTRUCTS
        .iter()
        .map(|c| {
            (
                Regex::new(c.pattern).expect("forbidden-construct pattern should compile"),
                c.label,
            )
        })
        .collect()
});

/// Run every scope rule against one file.
pub fn validate(
    config: &GateConfig,
    file_path: &str,
    content: &str,
    _outcome: &ParseOutcome,
) -> Vec<Violation> {
    let mut violations = Vec::new();

    check_path_policy(file_path, &mut violations);
    let masked = mask_code(content);
    if config.is_core_path(file_path) {
        check_forbidden_constructs(&masked, &mut violations);
    }
    check_bracket_balance(&masked, &mut violations);
    check_indentation(content, &masked, &mut violations);

    violations
}

/// Permissive by default: everything is in scope except `.git` internals and
/// dotfiles.
fn check_path_policy(file_path: &str, violations: &mut Vec<Violation>) {
    let normalized = file_path.replace('\\', "/");
    let dotted = Path::new(&normalized).components().any(|c| {
        matches!(c, std::path::Component::Normal(name)
            if name.to_str().is_some_and(|n| n.starts_with('.')))
    });
    if dotted {
        violations.push(Violation::new(
            RULE_PATH,
            None,
            format!("'{file_path}' is outside the session scope (dotfile or .git path)"),
        ));
    }
}

fn check_forbidden_constructs(masked: &[String], violations: &mut Vec<Violation>) {
    for (idx, line) in masked.iter().enumerate() {
        for (pattern, label) in FORBIDDEN_RES.iter() {
            if pattern.is_match(line) {
                violations.push(Violation::new(
                    RULE_FORBIDDEN_CONSTRUCT,
                    Some(idx + 1),
                    format!("{label} is not allowed in core directories"),
                ));
            }
        }
    }
}

/// Net balance per bracket pair over the whole file, string/comment spans
/// excluded. Nesting order is deliberately ignored: `)(` nets to zero and
/// passes. That is a known limitation of this heuristic, preserved as-is.
fn check_bracket_balance(masked: &[String], violations: &mut Vec<Violation>) {
    let pairs = [('(', ')'), ('[', ']'), ('{', '}')];
    let mut nets = [0i64; 3];

    for line in masked {
        for c in line.chars() {
            for (i, (open, close)) in pairs.iter().enumerate() {
                if c == *open {
                    nets[i] += 1;
                } else if c == *close {
                    nets[i] -= 1;
                }
            }
        }
    }

    for (i, (open, close)) in pairs.iter().enumerate() {
        if nets[i] != 0 {
            let (symbol, count) = if nets[i] > 0 {
                (open, nets[i])
            } else {
                (close, -nets[i])
            };
            violations.push(Violation::new(
                RULE_BRACKET_BALANCE,
                None,
                format!("net imbalance of +{count} '{symbol}'"),
            ));
        }
    }
}

/// Tabs/spaces mix detection plus stack-based expected-indent tracking.
///
/// Indent tracking only runs on tab-free files, outside bracket
/// continuations, and skips lines following an explicit `\` continuation.
fn check_indentation(content: &str, masked: &[String], violations: &mut Vec<Violation>) {
    let mut saw_tab_indent = false;
    let mut saw_space_indent = false;
    let mut first_mixed_line = None;

    for (idx, line) in content.lines().enumerate() {
        let leading: String = line.chars().take_while(|c| c.is_whitespace()).collect();
        if leading.contains('\t') {
            saw_tab_indent = true;
            if first_mixed_line.is_none() && saw_space_indent {
                first_mixed_line = Some(idx + 1);
            }
        }
        if leading.contains(' ') {
            saw_space_indent = true;
            if first_mixed_line.is_none() && saw_tab_indent {
                first_mixed_line = Some(idx + 1);
            }
        }
    }

    if saw_tab_indent && saw_space_indent {
        violations.push(Violation::new(
            RULE_INDENTATION,
            first_mixed_line,
            "file mixes tab and space indentation",
        ));
        // Expected-indent tracking is unreliable on mixed files.
        return;
    }
    if saw_tab_indent {
        return;
    }

    let mut stack: Vec<usize> = vec![0];
    let mut bracket_depth: i64 = 0;
    let mut prev_code: Option<String> = None;
    let mut prev_continuation = false;

    for (idx, raw) in content.lines().enumerate() {
        let code = masked.get(idx).map(String::as_str).unwrap_or("");
        if raw.trim().is_empty() || code.trim().is_empty() {
            continue;
        }

        let continuation = bracket_depth > 0 || prev_continuation;
        for c in code.chars() {
            match c {
                '(' | '[' | '{' => bracket_depth += 1,
                ')' | ']' | '}' => bracket_depth -= 1,
                _ => {}
            }
        }
        prev_continuation = code.trim_end().ends_with('\\');

        if continuation {
            continue;
        }

        let indent = indent_width(raw);
        let top = *stack.last().unwrap_or(&0);
        if indent > top {
            let opens_block = prev_code
                .as_deref()
                .map(|p| p.trim_end().ends_with(':'))
                .unwrap_or(false);
            if opens_block {
                stack.push(indent);
            } else {
                violations.push(Violation::new(
                    RULE_INDENTATION,
                    Some(idx + 1),
                    "unexpected indent: previous statement does not open a block",
                ));
            }
        } else if indent < top {
            while stack.len() > 1 && *stack.last().unwrap() > indent {
                stack.pop();
            }
            if *stack.last().unwrap() != indent {
                violations.push(Violation::new(
                    RULE_INDENTATION,
                    Some(idx + 1),
                    "dedent does not match any outer indentation level",
                ));
                stack.push(indent);
            }
        }

        prev_code = Some(code.to_string());
    }
}
