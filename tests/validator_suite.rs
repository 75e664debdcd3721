//! Validator suite integration tests — whole-file verdicts across the four
//! rule families, exactly as the `validate` command produces them.

use prompt_gates::config::GateConfig;
use prompt_gates::validators::{validate_file, VerdictStatus};

fn config() -> GateConfig {
    GateConfig::default()
}

fn rule_hits(verdict: &prompt_gates::validators::ValidationVerdict, rule: &str) -> usize {
    verdict
        .violations
        .iter()
        .filter(|v| v.rule_id == rule)
        .count()
}

#[test]
fn well_formed_module_is_clean() {
    let content = "\
# Orbit propagation helpers.


def advance(state):
    \"\"\"Advance the state one tick.\"\"\"
    return state


def _scratch(state):
    return state
";
    let verdict = validate_file(&config(), "scripts/orbit.py", content);
    assert_eq!(verdict.status, VerdictStatus::Ok, "{:?}", verdict.violations);
    assert!(verdict.rules_violated.is_empty());
}

#[test]
fn core_path_forbids_debug_constructs_that_scripts_allow() {
    let content = "\
# header
\"\"\"Module.\"\"\"


def check(value):
    \"\"\"Check a value.\"\"\"
    assert value
    breakpoint()
    return value
";
    let core = validate_file(&config(), "src/engine.py", content);
    assert!(core.is_blocking());
    assert_eq!(rule_hits(&core, "scope.forbidden_construct"), 2);

    let script = validate_file(&config(), "scripts/poke.py", content);
    assert_eq!(rule_hits(&script, "scope.forbidden_construct"), 0);
}

#[test]
fn print_is_flagged_in_core_but_not_in_output_dirs() {
    let content = "\
# header


def report(value):
    \"\"\"Report a value.\"\"\"
    print(value)
    return value
";
    let core = validate_file(&config(), "src/engine.py", content);
    assert_eq!(rule_hits(&core, "style.output_statements"), 1);

    let script = validate_file(&config(), "scripts/report.py", content);
    assert_eq!(rule_hits(&script, "style.output_statements"), 0);
}

#[test]
fn multi_family_violations_deduplicate_in_rules_violated() {
    let content = "\
def DoThing(x):
    timeout = 37
    try:
        pass
    except ValueError:
        pass
    return x
";
    let verdict = validate_file(&config(), "scripts/mess.py", content);
    assert!(verdict.is_blocking());

    for rule in [
        "docs.file_header",
        "docs.missing_docstring",
        "style.function_naming",
        "kiss.magic_number",
        "kiss.exception_handling",
    ] {
        assert!(
            verdict.rules_violated.iter().any(|r| r == rule),
            "expected {rule} in {:?}",
            verdict.rules_violated
        );
    }

    let mut sorted = verdict.rules_violated.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(sorted, verdict.rules_violated);
}

#[test]
fn net_bracket_imbalance_blocks() {
    let content = "# header\nvalues = [1, 2, 3\n";
    let verdict = validate_file(&config(), "scripts/x.py", content);
    assert_eq!(rule_hits(&verdict, "scope.bracket_balance"), 1);
}

#[test]
fn brackets_inside_strings_do_not_count() {
    let content = "# header\nlabel = \"(((\"\n";
    let verdict = validate_file(&config(), "scripts/x.py", content);
    assert_eq!(rule_hits(&verdict, "scope.bracket_balance"), 0);
}

#[test]
fn unparseable_bytes_still_get_textual_checks() {
    // NUL bytes defeat structure parsing; the header rule still fires.
    let content = "x = 1\n\u{0}garbage\u{0}\n";
    let verdict = validate_file(&config(), "scripts/x.py", content);
    assert!(verdict.is_blocking());
    assert_eq!(rule_hits(&verdict, "docs.file_header"), 1);
    assert_eq!(rule_hits(&verdict, "docs.missing_docstring"), 0);
}

#[test]
fn dotfile_paths_are_out_of_scope() {
    let verdict = validate_file(&config(), ".git/hooks/pre-commit.py", "# header\n");
    assert_eq!(rule_hits(&verdict, "scope.path"), 1);
}

#[test]
fn oversized_function_is_flagged_once() {
    let mut content = String::from("# header\n\n\ndef bulk(x):\n    \"\"\"Bulk op.\"\"\"\n");
    for _ in 0..45 {
        content.push_str("    x = x\n");
    }
    content.push_str("    return x\n");
    let verdict = validate_file(&config(), "scripts/big.py", &content);
    assert_eq!(rule_hits(&verdict, "style.function_length"), 1);
}
