//! `prompt-gates` CLI: hook-friendly routing and validation commands.
//!
//! Every command reads its input from arguments or a JSON payload on stdin
//! and emits a single JSON object on stdout. Routing commands never block
//! the caller: any internal fault degrades to `{"continue": true}` so a
//! broken gate cannot wedge the assistant. Validation is the one blocking
//! surface — rule violations exit with code 2.

use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::{info, warn};

use prompt_gates::budget::{BudgetStore, FileBudgetStore};
use prompt_gates::config::GateConfig;
use prompt_gates::context::{collect_diffs, ContextAssembler};
use prompt_gates::errors::{GateError, Result};
use prompt_gates::patch::{self, PatchApplier};
use prompt_gates::router::{self, AgentRouter, IntentClassifier};
use prompt_gates::runner::{CascadeOutcome, CommandCascade};
use prompt_gates::telemetry::Telemetry;
use prompt_gates::validators;

#[derive(Parser)]
#[command(name = "prompt-gates", about = "Deterministic routing and policy gates for coding agents", version)]
struct Cli {
    /// Optional TOML config overlay.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Repository the gate operates on.
    #[arg(long, global = true, default_value = ".")]
    repo: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Route a prompt to an agent and assemble its context.
    Route {
        /// Prompt text; read from a stdin JSON payload when omitted.
        prompt: Option<String>,
    },
    /// Decide whether a prompt warrants multi-step orchestration.
    Orchestrate {
        prompt: Option<String>,
    },
    /// Validate a source file against the house rules. Exits 2 on violations.
    Validate {
        file: PathBuf,
    },
    /// Extract a unified diff from stdin and apply it to the repo.
    Apply,
    /// Run the test and lint cascades and report their results.
    Verify,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            warn!("Config load failed, using defaults: {e}");
            GateConfig::default()
        }
    };

    let exit = match run(&cli, &config) {
        Ok(code) => code,
        Err(e) => {
            // Fault barrier: the gate must never wedge the caller. Report the
            // error but let the prompt through.
            warn!("Gate fault: {e}");
            println!(
                "{}",
                json!({"continue": true, "error": truncate(&e.to_string(), 300)})
            );
            0
        }
    };
    std::process::exit(exit);
}

fn load_config(path: Option<&std::path::Path>) -> Result<GateConfig> {
    match path {
        Some(p) => GateConfig::load(p),
        None => Ok(GateConfig::default()),
    }
}

fn run(cli: &Cli, config: &GateConfig) -> Result<i32> {
    match &cli.command {
        Commands::Route { prompt } => cmd_route(cli, config, prompt.as_deref()),
        Commands::Orchestrate { prompt } => cmd_orchestrate(prompt.as_deref()),
        Commands::Validate { file } => cmd_validate(config, file),
        Commands::Apply => cmd_apply(cli, config),
        Commands::Verify => cmd_verify(cli, config),
    }
}

// ── route ────────────────────────────────────────────────────────────────────

fn cmd_route(cli: &Cli, config: &GateConfig, prompt_arg: Option<&str>) -> Result<i32> {
    let Some(prompt) = resolve_prompt(prompt_arg, "prompt")? else {
        println!("{}", json!({"continue": true}));
        return Ok(0);
    };

    let store = FileBudgetStore::at_default_path(config.default_budget);
    let budget_before = store.read();

    let router = AgentRouter::new(config.budget_floor);
    let decision = router.route(&prompt, budget_before);
    let classifier = if config.intent_patterns.is_empty() {
        IntentClassifier::new()
    } else {
        IntentClassifier::with_overrides(&config.intent_patterns)
            .map_err(|e| GateError::Configuration(format!("intent pattern: {e}")))?
    };
    let classification = classifier.classify(&prompt);
    let complexity = router::estimate(&prompt);

    let budget_remaining = store.consume();

    let diffs = collect_diffs(&cli.repo, config.context_char_budget);
    let context = ContextAssembler::new(config.context_char_budget)
        .assemble(&decision, &prompt, &diffs);

    let telemetry = Telemetry::at_default_path();
    telemetry.record_routing(&json!({
        "agent": decision.agent.to_string(),
        "reason": decision.reason.to_string(),
        "intent": classification.primary.to_string(),
        "complexity": complexity.to_string(),
        "budget_remaining": budget_remaining,
    }));
    telemetry.write_metadata("budget", &json!({"remaining": budget_remaining}));

    info!(agent = %decision.agent, reason = %decision.reason, "Routed prompt");

    println!(
        "{}",
        json!({
            "continue": true,
            "agent": decision.agent.to_string(),
            "routingReason": decision.reason.to_string(),
            "additionalContext": context,
            "budgetRemaining": budget_remaining,
        })
    );
    Ok(0)
}

// ── orchestrate ──────────────────────────────────────────────────────────────

fn cmd_orchestrate(prompt_arg: Option<&str>) -> Result<i32> {
    let Some(prompt) = resolve_prompt(prompt_arg, "prompt")? else {
        println!("{}", json!({"continue": true}));
        return Ok(0);
    };

    let level = router::estimate(&prompt);
    let orchestrate = router::should_orchestrate(&prompt, level);

    println!(
        "{}",
        json!({
            "continue": true,
            "orchestrate": orchestrate,
            "complexity": level.to_string(),
        })
    );
    Ok(0)
}

// ── validate ─────────────────────────────────────────────────────────────────

fn cmd_validate(config: &GateConfig, file: &PathBuf) -> Result<i32> {
    let content = std::fs::read_to_string(file)
        .map_err(|e| GateError::InvalidInput(format!("cannot read {}: {e}", file.display())))?;

    let verdict = validators::validate_file(config, &file.to_string_lossy(), &content);

    for violation in &verdict.violations {
        match violation.line {
            Some(line) => println!(
                "{}:{line}: [{}] {}",
                verdict.file, violation.rule_id, violation.message
            ),
            None => println!("{}: [{}] {}", verdict.file, violation.rule_id, violation.message),
        }
    }
    println!("{}", serde_json::to_string(&verdict)?);

    Ok(if verdict.is_blocking() { 2 } else { 0 })
}

// ── apply ────────────────────────────────────────────────────────────────────

fn cmd_apply(cli: &Cli, config: &GateConfig) -> Result<i32> {
    let Some(response) = resolve_prompt(None, "response")? else {
        println!("{}", json!({"success": false, "message": "empty input"}));
        return Ok(0);
    };

    let Some(diff) = patch::extract(&response) else {
        println!(
            "{}",
            json!({"success": false, "message": "no unified diff found in response"})
        );
        return Ok(0);
    };

    let applier = PatchApplier::new(
        &cli.repo,
        Duration::from_secs(config.command_timeout_secs),
    );
    let outcome = applier.apply(&diff);

    Telemetry::at_default_path().record_activity(
        "apply",
        &json!({"success": outcome.success, "message": outcome.message}),
    );

    println!("{}", serde_json::to_string(&outcome)?);
    Ok(0)
}

// ── verify ───────────────────────────────────────────────────────────────────

fn cmd_verify(cli: &Cli, config: &GateConfig) -> Result<i32> {
    let timeout = Duration::from_secs(config.command_timeout_secs);
    let tests = CommandCascade::tests(&cli.repo, timeout).run()?;
    let lint = CommandCascade::lint(&cli.repo, timeout).run()?;

    println!(
        "{}",
        json!({
            "tests": cascade_report(&tests),
            "lint": cascade_report(&lint),
        })
    );
    Ok(0)
}

fn cascade_report(outcome: &CascadeOutcome) -> serde_json::Value {
    match outcome {
        CascadeOutcome::Ran { command, output } => json!({
            "command": command,
            "passed": output.success(),
            "output": truncate(&format!("{}{}", output.stdout, output.stderr), 4000),
        }),
        CascadeOutcome::NoRunner => json!({"command": null, "passed": null, "output": "no runner found"}),
    }
}

// ── input plumbing ───────────────────────────────────────────────────────────

/// Resolve command input: explicit argument first, then a stdin JSON payload
/// (`{"<key>": "..."}` or a bare string), then raw stdin text. `None` means
/// there is genuinely nothing to act on.
fn resolve_prompt(arg: Option<&str>, key: &str) -> Result<Option<String>> {
    if let Some(text) = arg {
        let trimmed = text.trim();
        return Ok((!trimmed.is_empty()).then(|| trimmed.to_string()));
    }

    let mut raw = String::new();
    std::io::stdin()
        .read_to_string(&mut raw)
        .map_err(|e| GateError::InvalidInput(format!("cannot read stdin: {e}")))?;
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(raw) {
        let text = match &value {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Object(map) => map
                .get(key)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            _ => String::new(),
        };
        let text = text.trim().to_string();
        return Ok((!text.is_empty()).then_some(text));
    }

    Ok(Some(raw.to_string()))
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while cut > 0 && !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…", &s[..cut])
}
