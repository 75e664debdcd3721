//! KISS rule family: complexity ceilings, magic numbers, and the exception
//! policy.
//!
//! Cyclomatic complexity here is an approximation over masked source text:
//! 1 + branching constructs + boolean operators + comprehensions. The try
//! rule is not a threshold — ANY `try` block in gated code is a violation.
//! That is the policy, not a bug.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::GateConfig;
use crate::validators::source::{mask_code, ParseOutcome};
use crate::validators::Violation;

pub const RULE_CYCLOMATIC: &str = "kiss.cyclomatic_complexity";
pub const RULE_METHOD_COUNT: &str = "kiss.method_count";
pub const RULE_MAGIC_NUMBER: &str = "kiss.magic_number";
pub const RULE_EXCEPTION_HANDLING: &str = "kiss.exception_handling";

static BRANCH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:if|elif|for|while|except)\b").expect("branch pattern should compile")
});

static BOOL_OP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:and|or)\b").expect("bool-op pattern should compile"));

/// `for` inside an open bracket on the same line — comprehension heuristic.
static COMPREHENSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\[\{\(][^\]\})]*\bfor\b").expect("comprehension pattern should compile")
});

static TRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*try\s*:").expect("try pattern should compile"));

static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\d+\.\d+(?:[eE][+-]?\d+)?\b|\b\d+[eE][+-]?\d+\b|\b\d+\b")
        .expect("number pattern should compile")
});

/// Named-constant assignment, e.g. `GRAVITY = 9.81`. Exempt from the magic
/// number rule: defining a constant is how you fix the violation.
static CONSTANT_DEF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*[A-Z][A-Z0-9_]*\s*=").expect("constant-def pattern should compile")
});

/// Literals that are never "magic": structural small integers plus the
/// physical constants the analyzed codebase legitimately inlines.
static ALLOWED_LITERALS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "0", "1", "2", "0.0", "1.0", "0.5", "10", "100", "1000",
        // Physical constants.
        "3.14159", "2.71828", "9.81", "8.314", "6.022e23", "1.38e-23", "299792458",
    ]
    .into_iter()
    .collect()
});

/// Run every KISS rule against one file.
pub fn validate(
    config: &GateConfig,
    _file_path: &str,
    content: &str,
    outcome: &ParseOutcome,
) -> Vec<Violation> {
    let mut violations = Vec::new();
    let masked = mask_code(content);

    check_try_blocks(&masked, &mut violations);
    check_magic_numbers(&masked, &mut violations);

    if let Some(structure) = outcome.structure() {
        for def in structure.functions() {
            let complexity = cyclomatic(&masked, def.line, def.end_line);
            if complexity > config.max_cyclomatic {
                violations.push(Violation::new(
                    RULE_CYCLOMATIC,
                    Some(def.line),
                    format!(
                        "function '{}' has cyclomatic complexity {} (max {})",
                        def.name, complexity, config.max_cyclomatic
                    ),
                ));
            }
        }
        for class in structure.classes() {
            let methods = structure.methods_of(class).len();
            if methods > config.max_class_methods {
                violations.push(Violation::new(
                    RULE_METHOD_COUNT,
                    Some(class.line),
                    format!(
                        "class '{}' has {} methods (max {})",
                        class.name, methods, config.max_class_methods
                    ),
                ));
            }
        }
    }

    violations
}

/// Approximate cyclomatic complexity of the body spanning 1-based lines
/// `start..=end` (the def line itself is excluded from branch counting).
fn cyclomatic(masked: &[String], start: usize, end: usize) -> u32 {
    let mut complexity = 1u32;
    for line in masked.iter().take(end.min(masked.len())).skip(start) {
        // A comprehension's `for` would otherwise also match the branch
        // pattern; count it once, as a comprehension.
        let comp_spans: Vec<(usize, usize)> = COMPREHENSION_RE
            .find_iter(line)
            .map(|m| (m.start(), m.end()))
            .collect();
        complexity += BRANCH_RE
            .find_iter(line)
            .filter(|m| {
                !(m.as_str() == "for"
                    && comp_spans.iter().any(|&(s, e)| m.start() >= s && m.start() < e))
            })
            .count() as u32;
        complexity += BOOL_OP_RE.find_iter(line).count() as u32;
        complexity += comp_spans.len() as u32;
    }
    complexity
}

fn check_try_blocks(masked: &[String], violations: &mut Vec<Violation>) {
    for (idx, line) in masked.iter().enumerate() {
        if TRY_RE.is_match(line) {
            violations.push(Violation::new(
                RULE_EXCEPTION_HANDLING,
                Some(idx + 1),
                "try block: exception handling is prohibited in gated code",
            ));
        }
    }
}

fn check_magic_numbers(masked: &[String], violations: &mut Vec<Violation>) {
    for (idx, line) in masked.iter().enumerate() {
        if CONSTANT_DEF_RE.is_match(line) {
            continue;
        }
        for m in NUMBER_RE.find_iter(line) {
            if !ALLOWED_LITERALS.contains(m.as_str()) {
                violations.push(Violation::new(
                    RULE_MAGIC_NUMBER,
                    Some(idx + 1),
                    format!("hardcoded numeric literal {}", m.as_str()),
                ));
            }
        }
    }
}
