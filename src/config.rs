//! Gate configuration: policy thresholds and directory conventions.
//!
//! Every numeric threshold here is a tuning constant inherited from the
//! policy rule set, not a derived value. Each one can be overridden via a
//! `GATE_*` environment variable, or in bulk from a TOML overlay file.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::errors::{GateError, Result};

fn from_env_usize(var: &str, default: usize) -> usize {
    std::env::var(var)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

fn from_env_i64(var: &str, default: i64) -> i64 {
    std::env::var(var)
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(default)
}

/// Policy thresholds and conventions for routing and validation.
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Functions longer than this many lines are flagged.
    pub max_function_lines: usize,
    /// Cyclomatic complexity ceiling per function.
    pub max_cyclomatic: u32,
    /// Docstring word-count ceiling.
    pub max_docstring_words: usize,
    /// Method-count ceiling per class.
    pub max_class_methods: usize,
    /// Combined character budget for diff hunks in an assembled context.
    pub context_char_budget: usize,
    /// Below this remaining budget, routing collapses to the default agent.
    pub budget_floor: i64,
    /// Budget estimate used when no counter file / env override exists.
    pub default_budget: i64,
    /// Wall-clock budget for each external command.
    pub command_timeout_secs: u64,
    /// Directories where debug/test constructs are forbidden.
    pub core_dirs: Vec<String>,
    /// Directories where print/log statements are allowed.
    pub output_allowed_dirs: Vec<String>,
    /// Optional required filename prefix (e.g. "rg_").
    pub filename_prefix: Option<String>,
    /// Intent-category pattern overrides, keyed by category name. Categories
    /// absent here keep the built-in tables.
    pub intent_patterns: BTreeMap<String, Vec<String>>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            max_function_lines: from_env_usize("GATE_MAX_FUNCTION_LINES", 40),
            max_cyclomatic: from_env_usize("GATE_MAX_CYCLOMATIC", 10) as u32,
            max_docstring_words: from_env_usize("GATE_MAX_DOCSTRING_WORDS", 100),
            max_class_methods: from_env_usize("GATE_MAX_CLASS_METHODS", 15),
            context_char_budget: from_env_usize("GATE_CONTEXT_CHAR_BUDGET", 20_000),
            budget_floor: from_env_i64("GATE_BUDGET_FLOOR", 25),
            default_budget: from_env_i64("GATE_DEFAULT_BUDGET", 100),
            command_timeout_secs: from_env_usize("GATE_COMMAND_TIMEOUT_SECS", 45) as u64,
            core_dirs: vec!["src".into(), "core".into(), "lib".into()],
            output_allowed_dirs: vec!["scripts".into(), "tools".into(), "tests".into()],
            filename_prefix: None,
            intent_patterns: BTreeMap::new(),
        }
    }
}

/// Partial TOML overlay: only the fields present in the file are applied.
#[derive(Debug, Default, Deserialize)]
struct GateConfigOverlay {
    max_function_lines: Option<usize>,
    max_cyclomatic: Option<u32>,
    max_docstring_words: Option<usize>,
    max_class_methods: Option<usize>,
    context_char_budget: Option<usize>,
    budget_floor: Option<i64>,
    default_budget: Option<i64>,
    command_timeout_secs: Option<u64>,
    core_dirs: Option<Vec<String>>,
    output_allowed_dirs: Option<Vec<String>>,
    filename_prefix: Option<String>,
    intent_patterns: Option<BTreeMap<String, Vec<String>>>,
}

impl GateConfig {
    /// Load defaults, then apply a TOML overlay file if it exists.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = Self::default();
        if !path.exists() {
            return Ok(config);
        }
        let raw = std::fs::read_to_string(path)?;
        let overlay: GateConfigOverlay = toml::from_str(&raw)
            .map_err(|e| GateError::Configuration(format!("{}: {e}", path.display())))?;
        config.apply(overlay);
        Ok(config)
    }

    fn apply(&mut self, overlay: GateConfigOverlay) {
        macro_rules! take {
            ($field:ident) => {
                if let Some(v) = overlay.$field {
                    self.$field = v;
                }
            };
        }
        take!(max_function_lines);
        take!(max_cyclomatic);
        take!(max_docstring_words);
        take!(max_class_methods);
        take!(context_char_budget);
        take!(budget_floor);
        take!(default_budget);
        take!(command_timeout_secs);
        take!(core_dirs);
        take!(output_allowed_dirs);
        take!(intent_patterns);
        if overlay.filename_prefix.is_some() {
            self.filename_prefix = overlay.filename_prefix;
        }
    }

    /// Whether `file_path` sits under one of the configured core directories.
    pub fn is_core_path(&self, file_path: &str) -> bool {
        let normalized = file_path.replace('\\', "/");
        self.core_dirs.iter().any(|dir| {
            normalized.starts_with(&format!("{dir}/")) || normalized.contains(&format!("/{dir}/"))
        })
    }

    /// Whether `file_path` is allowed to contain print/log statements.
    pub fn is_output_allowed(&self, file_path: &str) -> bool {
        let normalized = file_path.replace('\\', "/");
        self.output_allowed_dirs.iter().any(|dir| {
            normalized.starts_with(&format!("{dir}/")) || normalized.contains(&format!("/{dir}/"))
        })
    }
}
