//! Routing pipeline integration tests — prompt in, decision and context out.
//!
//! Exercises the classifier, complexity estimator, agent router, budget
//! store, and context assembler together, the way the `route` command wires
//! them.

use std::time::Duration;

use tempfile::TempDir;

use prompt_gates::budget::FileBudgetStore;
use prompt_gates::config::GateConfig;
use prompt_gates::context::ContextAssembler;
use prompt_gates::patch::{self, PatchApplier};
use prompt_gates::router::{
    estimate, should_orchestrate, AgentKind, AgentRouter, ComplexityLevel, Intent,
    IntentClassifier, RouteReason,
};

fn router() -> AgentRouter {
    AgentRouter::new(GateConfig::default().budget_floor)
}

#[test]
fn test_prompt_routes_to_tester_with_assembled_context() {
    let prompt = "please just test the new parser module";
    let decision = router().route(prompt, 80);

    assert_eq!(decision.agent, AgentKind::Tester);
    assert_eq!(decision.reason, RouteReason::ExplicitTest);
    assert!(decision.specialized);

    let classification = IntentClassifier::new().classify(prompt);
    assert_eq!(classification.primary, Intent::Testing);

    let diffs = vec![(
        "parser.py".to_string(),
        "@@ -1 +1 @@\n-old\n+new\n".to_string(),
    )];
    let context = ContextAssembler::new(20_000).assemble(&decision, prompt, &diffs);
    assert!(context.contains("Agent: tester"));
    assert!(context.contains("parser.py"));
    assert!(context.contains("test the new parser"));
}

#[test]
fn low_budget_overrides_every_specialized_route() {
    let floor = GateConfig::default().budget_floor;
    for prompt in [
        "just test everything",
        "debug the crash in startup",
        "fix the bug in the scheduler",
    ] {
        let decision = router().route(prompt, floor - 1);
        assert_eq!(decision.agent, AgentKind::Coder);
        assert_eq!(decision.reason, RouteReason::BudgetConservation);
        assert!(decision.specialized);
    }
}

#[test]
fn budget_consumption_feeds_back_into_routing() {
    let dir = TempDir::new().unwrap();
    let store = FileBudgetStore::new(dir.path().join("budget"), 27);

    // Two prompts above the floor, then the third falls under it.
    assert_eq!(store.consume(), 26);
    assert_eq!(store.consume(), 25);
    let decision = router().route("debug the flaky test", store.consume());
    assert_eq!(decision.reason, RouteReason::BudgetConservation);
}

#[test]
fn complexity_escalates_with_scope_words() {
    assert_eq!(estimate("explain this function"), ComplexityLevel::Low);
    assert_eq!(
        estimate("implement a new system with multiple components"),
        ComplexityLevel::High
    );
    assert!(should_orchestrate(
        "first refactor the store, then migrate the schema, then update all callers across the codebase",
        estimate("first refactor the store, then migrate the schema, then update all callers across the codebase"),
    ));
}

#[test]
fn extracted_patch_round_trips_through_the_working_tree() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("counter.py"),
        "def count():\n    return 0\n",
    )
    .unwrap();

    let response = "Here you go.\n```diff\n--- a/counter.py\n+++ b/counter.py\n@@ -1,2 +1,2 @@\n def count():\n-    return 0\n+    return 1\n```\n";
    let diff = patch::extract(response).expect("response contains a diff");

    let applier = PatchApplier::new(dir.path(), Duration::from_secs(10));
    let outcome = applier.apply(&diff);
    assert!(outcome.success, "{}", outcome.message);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("counter.py")).unwrap(),
        "def count():\n    return 1\n"
    );
}

#[test]
fn unroutable_garbage_still_yields_a_decision() {
    let decision = router().route("???!!!", 100);
    assert_eq!(decision.agent, AgentKind::Coder);
    assert_eq!(decision.reason, RouteReason::Default);

    let classification = IntentClassifier::new().classify("???!!!");
    assert_eq!(classification.primary, Intent::Coding);
}
