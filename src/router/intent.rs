//! Intent classification over free-text prompts.
//!
//! Each of the eight intent categories carries an ordered list of regex
//! patterns. A category's score is the total match count across all of its
//! patterns; a single prompt line can contribute to several categories. The
//! primary intent is the highest-scoring category, ties broken by declaration
//! order. An all-zero scoreboard falls back to `Coding`.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// The fixed intent category set. Declaration order is the tie-break order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Coding,
    Testing,
    Debugging,
    Documentation,
    Architecture,
    DataGeneration,
    Configuration,
    Refactoring,
}

impl Intent {
    pub const ALL: [Intent; 8] = [
        Intent::Coding,
        Intent::Testing,
        Intent::Debugging,
        Intent::Documentation,
        Intent::Architecture,
        Intent::DataGeneration,
        Intent::Configuration,
        Intent::Refactoring,
    ];
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Coding => write!(f, "coding"),
            Self::Testing => write!(f, "testing"),
            Self::Debugging => write!(f, "debugging"),
            Self::Documentation => write!(f, "documentation"),
            Self::Architecture => write!(f, "architecture"),
            Self::DataGeneration => write!(f, "data_generation"),
            Self::Configuration => write!(f, "configuration"),
            Self::Refactoring => write!(f, "refactoring"),
        }
    }
}

/// Result of classifying one prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentClassification {
    /// Best-scoring category (first declared wins ties).
    pub primary: Intent,
    /// Match counts for every category. All eight keys are always present.
    pub scores: BTreeMap<Intent, u32>,
}

/// Built-in pattern table: (intent, ordered regex sources).
///
/// Kept as plain data so a deployment can swap the tables from TOML without
/// touching the scoring loop.
const DEFAULT_TABLES: &[(Intent, &[&str])] = &[
    (
        Intent::Coding,
        &[
            r"\bimplement\b",
            r"\bwrite\b",
            r"\bcreate\b",
            r"\badd\b",
            r"\bfunction\b",
            r"\bclass\b",
            r"\bmethod\b",
            r"\bapi\b",
        ],
    ),
    (
        Intent::Testing,
        &[
            r"\btests?\b",
            r"\btesting\b",
            r"\bpytest\b",
            r"\bunittest\b",
            r"\bcoverage\b",
            r"\bassert\w*\b",
            r"\bverify\b",
        ],
    ),
    (
        Intent::Debugging,
        &[
            r"\bdebug\w*\b",
            r"\bbug\b",
            r"\bfix\b",
            r"\berror\b",
            r"\bbroken\b",
            r"\btrace\b",
            r"\binvestigate\b",
            r"\bdiagnose\b",
        ],
    ),
    (
        Intent::Documentation,
        &[
            r"\bdocument\w*\b",
            r"\bdocstrings?\b",
            r"\breadme\b",
            r"\bcomments?\b",
            r"\bexplain\b",
            r"\bdescribe\b",
        ],
    ),
    (
        Intent::Architecture,
        &[
            r"\barchitect\w*\b",
            r"\bdesign\b",
            r"\bstructure\b",
            r"\bmodule layout\b",
            r"\bsystem\b",
            r"\bcomponents?\b",
        ],
    ),
    (
        Intent::DataGeneration,
        &[
            r"\bgenerate\b",
            r"\bsynthetic\b",
            r"\bdatasets?\b",
            r"\bsample data\b",
            r"\bfixtures?\b",
            r"\bseed data\b",
        ],
    ),
    (
        Intent::Configuration,
        &[
            r"\bconfig\w*\b",
            r"\bsettings\b",
            r"\byaml\b",
            r"\btoml\b",
            r"\benvironment variables?\b",
            r"\bparameters? file\b",
        ],
    ),
    (
        Intent::Refactoring,
        &[
            r"\brefactor\w*\b",
            r"\bclean\s?up\b",
            r"\brename\b",
            r"\bsimplify\b",
            r"\brestructure\b",
            r"\bextract\b",
        ],
    ),
];

static COMPILED_DEFAULTS: LazyLock<Vec<(Intent, Vec<Regex>)>> = LazyLock::new(|| {
    DEFAULT_TABLES
        .iter()
        .map(|(intent, sources)| {
            let compiled = sources
                .iter()
                .map(|s| Regex::new(s).expect("built-in intent pattern should compile"))
                .collect();
            (*intent, compiled)
        })
        .collect()
});

/// Regex-table intent classifier. Total on any input, never errors.
pub struct IntentClassifier {
    tables: Vec<(Intent, Vec<Regex>)>,
}

impl IntentClassifier {
    pub fn new() -> Self {
        Self {
            tables: COMPILED_DEFAULTS.clone(),
        }
    }

    /// Build a classifier from external pattern tables, e.g. from TOML:
    ///
    /// ```toml
    /// testing = ["\\bqa\\b", "smoke test"]
    /// ```
    ///
    /// Categories absent from the map keep their built-in patterns.
    pub fn with_overrides(
        overrides: &BTreeMap<String, Vec<String>>,
    ) -> Result<Self, regex::Error> {
        let mut tables = COMPILED_DEFAULTS.clone();
        for (intent, patterns) in tables.iter_mut() {
            if let Some(sources) = overrides.get(&intent.to_string()) {
                let compiled: Result<Vec<Regex>, regex::Error> =
                    sources.iter().map(|s| Regex::new(s)).collect();
                *patterns = compiled?;
            }
        }
        Ok(Self { tables })
    }

    /// Score the prompt against every category and pick the winner.
    pub fn classify(&self, prompt: &str) -> IntentClassification {
        let lowered = prompt.to_lowercase();

        let mut scores = BTreeMap::new();
        for intent in Intent::ALL {
            scores.insert(intent, 0u32);
        }
        for (intent, patterns) in &self.tables {
            let count: u32 = patterns
                .iter()
                .map(|p| p.find_iter(&lowered).count() as u32)
                .sum();
            scores.insert(*intent, count);
        }

        // First-declared wins on ties; the strict `>` keeps max-search
        // order-stable. All zeros leaves the default in place.
        let mut primary = Intent::Coding;
        let mut best = 0u32;
        for intent in Intent::ALL {
            let score = scores[&intent];
            if score > best {
                best = score;
                primary = intent;
            }
        }

        IntentClassification { primary, scores }
    }
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_prompt_defaults_to_coding() {
        let c = IntentClassifier::new().classify("");
        assert_eq!(c.primary, Intent::Coding);
        assert_eq!(c.scores.len(), 8);
        assert!(c.scores.values().all(|&s| s == 0));
    }

    #[test]
    fn all_categories_always_present() {
        let c = IntentClassifier::new().classify("write a pytest for the config loader");
        assert_eq!(c.scores.len(), 8);
    }

    #[test]
    fn testing_prompt_classifies_as_testing() {
        let c = IntentClassifier::new().classify("add pytest coverage for the parser tests");
        assert_eq!(c.primary, Intent::Testing);
        assert!(c.scores[&Intent::Testing] >= 3);
    }

    #[test]
    fn debugging_prompt_classifies_as_debugging() {
        let c = IntentClassifier::new().classify("investigate and fix the broken trace output");
        assert_eq!(c.primary, Intent::Debugging);
    }

    #[test]
    fn one_line_can_score_in_multiple_categories() {
        let c = IntentClassifier::new().classify("write tests for the config loader");
        assert!(c.scores[&Intent::Coding] > 0);
        assert!(c.scores[&Intent::Testing] > 0);
        assert!(c.scores[&Intent::Configuration] > 0);
    }

    #[test]
    fn tie_breaks_by_declaration_order() {
        // "write tests": coding and testing both score 1 — coding declared first.
        let c = IntentClassifier::new().classify("write tests");
        assert_eq!(c.scores[&Intent::Coding], c.scores[&Intent::Testing]);
        assert_eq!(c.primary, Intent::Coding);
    }

    #[test]
    fn classification_is_case_insensitive() {
        let c = IntentClassifier::new().classify("REFACTOR and SIMPLIFY the module");
        assert_eq!(c.primary, Intent::Refactoring);
    }

    #[test]
    fn overrides_replace_only_named_categories() {
        let mut overrides = BTreeMap::new();
        overrides.insert("testing".to_string(), vec![r"\bsmoke\b".to_string()]);
        let classifier = IntentClassifier::with_overrides(&overrides).unwrap();
        let c = classifier.classify("run the smoke suite");
        assert_eq!(c.scores[&Intent::Testing], 1);
        // Other categories keep built-ins.
        let c2 = classifier.classify("fix the bug");
        assert_eq!(c2.primary, Intent::Debugging);
    }

    #[test]
    fn bad_override_pattern_is_an_error() {
        let mut overrides = BTreeMap::new();
        overrides.insert("testing".to_string(), vec!["([unclosed".to_string()]);
        assert!(IntentClassifier::with_overrides(&overrides).is_err());
    }

    #[test]
    fn never_panics_on_garbage_input() {
        let classifier = IntentClassifier::new();
        classifier.classify("\u{0}\u{1}\u{2}binary\u{ff}");
        classifier.classify(&"x".repeat(100_000));
    }
}
