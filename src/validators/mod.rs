//! Policy validators: style, scope, documentation, and KISS rule families.
//!
//! Each family is an independent pure function over `(path, content)` that
//! returns a violation list. Families never error for input content — an
//! unparseable file degrades to the textual check subset (see
//! [`source::ParseOutcome`]). A non-empty combined list maps to a blocking
//! verdict for the calling orchestrator.

pub mod docs;
pub mod kiss;
pub mod scope;
pub mod source;
pub mod style;

use serde::{Deserialize, Serialize};

use crate::config::GateConfig;

/// One detected deviation from a policy rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// 1-based source line, when the rule is line-anchored.
    pub line: Option<usize>,
    pub message: String,
    /// Stable rule identifier, e.g. `kiss.cyclomatic_complexity`.
    pub rule_id: String,
}

impl Violation {
    pub fn new(rule_id: &str, line: Option<usize>, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
            rule_id: rule_id.to_string(),
        }
    }
}

/// Terminal verdict for one file scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationVerdict {
    pub status: VerdictStatus,
    pub file: String,
    pub violations: Vec<Violation>,
    /// Sorted, de-duplicated rule ids with at least one hit.
    pub rules_violated: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictStatus {
    Ok,
    Error,
}

impl ValidationVerdict {
    /// Blocking verdicts carry process exit code 2 at the CLI boundary.
    pub fn is_blocking(&self) -> bool {
        self.status == VerdictStatus::Error
    }
}

/// Run every rule family against one file's text.
pub fn validate_file(config: &GateConfig, file_path: &str, content: &str) -> ValidationVerdict {
    let outcome = source::parse(content);

    let mut violations = Vec::new();
    violations.extend(style::validate(config, file_path, content, &outcome));
    violations.extend(scope::validate(config, file_path, content, &outcome));
    violations.extend(docs::validate(config, file_path, content, &outcome));
    violations.extend(kiss::validate(config, file_path, content, &outcome));

    let mut rules_violated: Vec<String> =
        violations.iter().map(|v| v.rule_id.clone()).collect();
    rules_violated.sort();
    rules_violated.dedup();

    let status = if violations.is_empty() {
        VerdictStatus::Ok
    } else {
        VerdictStatus::Error
    };

    ValidationVerdict {
        status,
        file: file_path.to_string(),
        violations,
        rules_violated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_file_passes() {
        let content = "\
# Engine driver.
\"\"\"Module header.\"\"\"


def run_step(state):
    \"\"\"Advance one step.\"\"\"
    return state
";
        let verdict = validate_file(&GateConfig::default(), "scripts/driver.py", content);
        assert_eq!(verdict.status, VerdictStatus::Ok, "{:?}", verdict.violations);
        assert!(!verdict.is_blocking());
        assert!(verdict.rules_violated.is_empty());
    }

    #[test]
    fn dirty_file_blocks_with_deduplicated_rules() {
        let content = "\
def BadName():
    try:
        pass
    except ValueError:
        pass

def OtherBad():
    pass
";
        let verdict = validate_file(&GateConfig::default(), "scripts/x.py", content);
        assert!(verdict.is_blocking());
        let naming_hits = verdict
            .violations
            .iter()
            .filter(|v| v.rule_id == "style.function_naming")
            .count();
        assert_eq!(naming_hits, 2);
        let naming_rule_entries = verdict
            .rules_violated
            .iter()
            .filter(|r| *r == "style.function_naming")
            .count();
        assert_eq!(naming_rule_entries, 1);
    }

    #[test]
    fn validators_are_total_over_garbage() {
        let config = GateConfig::default();
        let long_line = "x".repeat(500_000);
        for content in ["", "\u{0}\u{1}\u{2}", long_line.as_str(), "((((((\n"] {
            // Must not panic; verdict may or may not carry violations.
            let _ = validate_file(&config, "scripts/fuzz.py", content);
        }
    }
}
