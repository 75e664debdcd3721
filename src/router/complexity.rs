//! Structural complexity estimation and the orchestration gate.
//!
//! Three weighted pattern tiers feed a conservative escalation policy: any
//! unambiguous high-complexity signal (or enough medium signals) escalates
//! regardless of prompt length; weak signals only escalate on sufficiently
//! long prompts. Short prompts are assumed simple even when they
//! superficially match a low-tier pattern.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Complexity verdict for one prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for ComplexityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Prompts longer than this many words let low-tier signals escalate.
const LONG_PROMPT_WORDS: usize = 20;

/// More than this many medium-tier hits escalates straight to high.
const MEDIUM_SATURATION: u32 = 2;

const HIGH_PATTERNS: &[&str] = &[
    r"\bnew system\b",
    r"\bmultiple components\b",
    r"\bfrom scratch\b",
    r"\bend[- ]to[- ]end\b",
    r"\bredesign\b",
    r"\bmigrate\b",
    r"\barchitecture\b",
    r"\bacross the (?:codebase|repo|repository)\b",
    r"\brewrite\b",
];

const MEDIUM_PATTERNS: &[&str] = &[
    r"\brefactor\w*\b",
    r"\bmultiple files\b",
    r"\bintegrate\b",
    r"\boptimi[sz]e\b",
    r"\bextend\b",
    r"\bnew feature\b",
    r"\bseveral\b",
    r"\bpipeline\b",
];

const LOW_PATTERNS: &[&str] = &[
    r"\bexplain\b",
    r"\btypo\b",
    r"\brename\b",
    r"\bsmall\b",
    r"\bquick\b",
    r"\bsingle\b",
    r"\bone[- ]lines?\b",
    r"\bfix\b",
];

/// Secondary pattern set for the medium-complexity orchestration gate:
/// explicit sequential/staged work phrasing.
const SEQUENTIAL_PATTERNS: &[&str] = &[
    r"\bstep[- ]by[- ]step\b",
    r"\bfirst\b.*\bthen\b",
    r"\bmultiple files\b",
    r"\bin stages\b",
    r"\bone at a time\b",
    r"\bsequential\w*\b",
    r"\bphases?\b",
];

fn compile(sources: &[&str]) -> Vec<Regex> {
    sources
        .iter()
        .map(|s| Regex::new(s).expect("built-in complexity pattern should compile"))
        .collect()
}

static HIGH_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| compile(HIGH_PATTERNS));
static MEDIUM_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| compile(MEDIUM_PATTERNS));
static LOW_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| compile(LOW_PATTERNS));
static SEQUENTIAL_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| compile(SEQUENTIAL_PATTERNS));

fn tier_score(patterns: &[Regex], lowered: &str) -> u32 {
    patterns
        .iter()
        .map(|p| p.find_iter(lowered).count() as u32)
        .sum()
}

/// Estimate a prompt's structural complexity.
pub fn estimate(prompt: &str) -> ComplexityLevel {
    let lowered = prompt.to_lowercase();
    let high = tier_score(&HIGH_RES, &lowered);
    let medium = tier_score(&MEDIUM_RES, &lowered);
    let low = tier_score(&LOW_RES, &lowered);
    let words = prompt.split_whitespace().count();

    if high > 0 || medium > MEDIUM_SATURATION {
        ComplexityLevel::High
    } else if medium > 0 || (low > 0 && words > LONG_PROMPT_WORDS) {
        ComplexityLevel::Medium
    } else {
        ComplexityLevel::Low
    }
}

/// Whether the request warrants decomposition across specialized sub-agents.
///
/// High always orchestrates. Medium orchestrates only when the prompt also
/// spells out sequential/staged work. Low never orchestrates.
pub fn should_orchestrate(prompt: &str, level: ComplexityLevel) -> bool {
    match level {
        ComplexityLevel::High => true,
        ComplexityLevel::Medium => {
            let lowered = prompt.to_lowercase();
            SEQUENTIAL_RES.iter().any(|p| p.is_match(&lowered))
        }
        ComplexityLevel::Low => false,
    }
}
