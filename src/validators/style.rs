//! Style rule family: lengths, naming, comment language, step markers, and
//! unauthorized output statements.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::GateConfig;
use crate::validators::source::{DefKind, ParseOutcome};
use crate::validators::{source, Violation};

pub const RULE_FUNCTION_LENGTH: &str = "style.function_length";
pub const RULE_FUNCTION_NAMING: &str = "style.function_naming";
pub const RULE_CLASS_NAMING: &str = "style.class_naming";
pub const RULE_FILENAME: &str = "style.filename";
pub const RULE_COMMENT_LANGUAGE: &str = "style.comment_language";
pub const RULE_STEP_MARKERS: &str = "style.step_markers";
pub const RULE_OUTPUT_STATEMENTS: &str = "style.output_statements";

static SNAKE_CASE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^_{0,2}[a-z][a-z0-9_]*$").expect("snake_case pattern should compile")
});

static PASCAL_CASE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^_?[A-Z][A-Za-z0-9]*$").expect("PascalCase pattern should compile")
});

/// Numbered comment like `# 1.`, `# 2)`, `# 3:` — a step-like marker.
static STEP_LIKE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\s*[.):]").expect("step-like pattern should compile"));

/// Canonical `# Step N` marker.
static STEP_CANONICAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^step\s+\d+").expect("step marker pattern should compile"));

static OUTPUT_CALL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bprint\s*\(|\blogging\.\w+\s*\(|\blogger\.\w+\s*\(")
        .expect("output-call pattern should compile")
});

/// Function-word lists for the non-English comment heuristic. Two or more
/// distinct hits from one list flag the comment.
const LANGUAGE_MARKERS: &[(&str, &[&str])] = &[
    (
        "German",
        &["der", "die", "das", "und", "nicht", "ist", "mit", "wird", "für"],
    ),
    (
        "Spanish",
        &["el", "los", "las", "es", "una", "pero", "para", "que", "como"],
    ),
    (
        "French",
        &["le", "les", "une", "est", "et", "pour", "dans", "avec", "sur"],
    ),
];

/// Run every style rule against one file.
pub fn validate(
    config: &GateConfig,
    file_path: &str,
    content: &str,
    outcome: &ParseOutcome,
) -> Vec<Violation> {
    let mut violations = Vec::new();

    check_filename(config, file_path, &mut violations);
    check_comment_language(content, &mut violations);
    check_output_statements(config, file_path, content, &mut violations);

    // Structure-dependent checks: skipped when the scan failed.
    if let Some(structure) = outcome.structure() {
        for def in &structure.defs {
            match def.kind {
                DefKind::Function => {
                    if def.len_lines() > config.max_function_lines {
                        violations.push(Violation::new(
                            RULE_FUNCTION_LENGTH,
                            Some(def.line),
                            format!(
                                "function '{}' is {} lines (max {})",
                                def.name,
                                def.len_lines(),
                                config.max_function_lines
                            ),
                        ));
                    }
                    if !SNAKE_CASE_RE.is_match(&def.name) {
                        violations.push(Violation::new(
                            RULE_FUNCTION_NAMING,
                            Some(def.line),
                            format!("function '{}' is not snake_case", def.name),
                        ));
                    }
                }
                DefKind::Class => {
                    if !PASCAL_CASE_RE.is_match(&def.name) {
                        violations.push(Violation::new(
                            RULE_CLASS_NAMING,
                            Some(def.line),
                            format!("class '{}' is not PascalCase", def.name),
                        ));
                    }
                }
            }
        }
        check_step_markers(content, structure, &mut violations);
    }

    violations
}

fn check_filename(config: &GateConfig, file_path: &str, violations: &mut Vec<Violation>) {
    let Some(stem) = Path::new(file_path).file_stem().and_then(|s| s.to_str()) else {
        return;
    };
    if !SNAKE_CASE_RE.is_match(stem) {
        violations.push(Violation::new(
            RULE_FILENAME,
            None,
            format!("filename '{stem}' is not snake_case"),
        ));
    }
    if let Some(prefix) = &config.filename_prefix {
        if !stem.starts_with(prefix.as_str()) {
            violations.push(Violation::new(
                RULE_FILENAME,
                None,
                format!("filename '{stem}' is missing required prefix '{prefix}'"),
            ));
        }
    }
}

fn check_comment_language(content: &str, violations: &mut Vec<Violation>) {
    for (line, text) in source::comments(content) {
        let words: Vec<String> = text
            .split(|c: char| !c.is_alphabetic())
            .filter(|w| !w.is_empty())
            .map(|w| w.to_lowercase())
            .collect();
        for (language, markers) in LANGUAGE_MARKERS {
            let mut hits: Vec<&str> = markers
                .iter()
                .copied()
                .filter(|m| words.iter().any(|w| w == m))
                .collect();
            hits.dedup();
            if hits.len() >= 2 {
                violations.push(Violation::new(
                    RULE_COMMENT_LANGUAGE,
                    Some(line),
                    format!("comment appears to be {language}; comments must be in English"),
                ));
                break;
            }
        }
    }
}

/// Functions with three or more numbered step-like comments must use the
/// canonical `# Step N` form so the structure stays searchable.
fn check_step_markers(
    content: &str,
    structure: &source::SourceStructure,
    violations: &mut Vec<Violation>,
) {
    let all_comments = source::comments(content);
    for def in structure.functions() {
        let in_body: Vec<&(usize, String)> = all_comments
            .iter()
            .filter(|(line, _)| *line > def.line && *line <= def.end_line)
            .collect();
        let step_like = in_body
            .iter()
            .filter(|(_, text)| STEP_LIKE_RE.is_match(text))
            .count();
        let canonical = in_body
            .iter()
            .any(|(_, text)| STEP_CANONICAL_RE.is_match(text));
        if step_like >= 3 && !canonical {
            violations.push(Violation::new(
                RULE_STEP_MARKERS,
                Some(def.line),
                format!(
                    "function '{}' has {} numbered comments; use explicit 'Step N' markers",
                    def.name, step_like
                ),
            ));
        }
    }
}

fn check_output_statements(
    config: &GateConfig,
    file_path: &str,
    content: &str,
    violations: &mut Vec<Violation>,
) {
    if config.is_output_allowed(file_path) {
        return;
    }
    for (idx, line) in source::mask_code(content).iter().enumerate() {
        if OUTPUT_CALL_RE.is_match(line) {
            violations.push(Violation::new(
                RULE_OUTPUT_STATEMENTS,
                Some(idx + 1),
                "print/log call outside an output-allowed directory",
            ));
        }
    }
}
