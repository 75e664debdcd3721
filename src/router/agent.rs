//! Agent persona routing: priority-ordered rules, first match wins.
//!
//! The ordering is deliberate. The budget guard dominates everything so a
//! near-exhausted session cannot fan out into specialist invocations, and an
//! explicit "only/just test" request dominates generic keyword matches.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Agent persona a prompt can be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Coder,
    Tester,
    Debugger,
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Coder => write!(f, "coder"),
            Self::Tester => write!(f, "tester"),
            Self::Debugger => write!(f, "debugger"),
        }
    }
}

/// Why a prompt was routed where it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteReason {
    /// Hard override: remaining budget fell below the floor.
    BudgetConservation,
    /// Prompt explicitly asked for testing only.
    ExplicitTest,
    /// Prompt explicitly asked for debugging only.
    ExplicitDebug,
    /// Generic test-related keywords matched.
    TestKeywords,
    /// Generic debug-related keywords matched.
    DebugKeywords,
    /// No rule matched; the general coder handles it.
    Default,
}

impl fmt::Display for RouteReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BudgetConservation => write!(f, "budget_conservation"),
            Self::ExplicitTest => write!(f, "explicit_test"),
            Self::ExplicitDebug => write!(f, "explicit_debug"),
            Self::TestKeywords => write!(f, "test_keywords"),
            Self::DebugKeywords => write!(f, "debug_keywords"),
            Self::Default => write!(f, "default"),
        }
    }
}

/// Immutable routing verdict, produced once per prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub agent: AgentKind,
    pub reason: RouteReason,
    /// `true` for any non-default routing, budget override included.
    pub specialized: bool,
}

impl RoutingDecision {
    fn new(agent: AgentKind, reason: RouteReason) -> Self {
        Self {
            agent,
            reason,
            specialized: reason != RouteReason::Default,
        }
    }
}

static EXPLICIT_TEST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:only|just)\s+(?:run\s+)?test(?:ing|s)?\b")
        .expect("explicit-test pattern should compile")
});

static EXPLICIT_DEBUG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:only|just)\s+debug(?:ging)?\b")
        .expect("explicit-debug pattern should compile")
});

static TEST_KEYWORDS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\btests?\b|\btesting\b|\bpytest\b|\bunittest\b|\bcoverage\b|\bassert\w*\b")
        .expect("test-keywords pattern should compile")
});

static DEBUG_KEYWORDS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\bdebug(?:ging)?\b|\btrace\b|\binvestigate\b|\bdiagnose\b|\bbroken\b|\bfix\b.*\bbug\b",
    )
    .expect("debug-keywords pattern should compile")
});

/// Priority-ordered prompt router.
pub struct AgentRouter {
    budget_floor: i64,
}

impl AgentRouter {
    pub fn new(budget_floor: i64) -> Self {
        Self { budget_floor }
    }

    /// Route a prompt to an agent persona. Rules evaluate top to bottom and
    /// the first match wins.
    pub fn route(&self, prompt: &str, budget_remaining: i64) -> RoutingDecision {
        if budget_remaining < self.budget_floor {
            return RoutingDecision::new(AgentKind::Coder, RouteReason::BudgetConservation);
        }

        let lowered = prompt.to_lowercase();

        if EXPLICIT_TEST_RE.is_match(&lowered) {
            return RoutingDecision::new(AgentKind::Tester, RouteReason::ExplicitTest);
        }
        if EXPLICIT_DEBUG_RE.is_match(&lowered) {
            return RoutingDecision::new(AgentKind::Debugger, RouteReason::ExplicitDebug);
        }
        if TEST_KEYWORDS_RE.is_match(&lowered) {
            return RoutingDecision::new(AgentKind::Tester, RouteReason::TestKeywords);
        }
        if DEBUG_KEYWORDS_RE.is_match(&lowered) {
            return RoutingDecision::new(AgentKind::Debugger, RouteReason::DebugKeywords);
        }

        RoutingDecision::new(AgentKind::Coder, RouteReason::Default)
    }
}

impl Default for AgentRouter {
    fn default() -> Self {
        Self::new(crate::config::GateConfig::default().budget_floor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> AgentRouter {
        AgentRouter::new(25)
    }

    #[test]
    fn budget_override_always_wins() {
        let d = router().route("only test this", 10);
        assert_eq!(d.agent, AgentKind::Coder);
        assert_eq!(d.reason, RouteReason::BudgetConservation);
        assert!(d.specialized);
    }

    #[test]
    fn budget_at_floor_does_not_trigger_override() {
        let d = router().route("only test this", 25);
        assert_eq!(d.reason, RouteReason::ExplicitTest);
    }

    #[test]
    fn explicit_test_beats_generic_keywords() {
        let d = router().route("please just test the parser", 100);
        assert_eq!(d.agent, AgentKind::Tester);
        assert_eq!(d.reason, RouteReason::ExplicitTest);
    }

    #[test]
    fn explicit_debug_routes_to_debugger() {
        let d = router().route("only debug the boundary handler", 100);
        assert_eq!(d.agent, AgentKind::Debugger);
        assert_eq!(d.reason, RouteReason::ExplicitDebug);
    }

    #[test]
    fn test_keywords_route_to_tester() {
        let d = router().route("raise pytest coverage on the config loader", 100);
        assert_eq!(d.agent, AgentKind::Tester);
        assert_eq!(d.reason, RouteReason::TestKeywords);
    }

    #[test]
    fn debug_keywords_route_to_debugger() {
        let d = router().route("investigate why the output is broken", 100);
        assert_eq!(d.agent, AgentKind::Debugger);
        assert_eq!(d.reason, RouteReason::DebugKeywords);
    }

    #[test]
    fn fix_bug_phrase_is_a_debug_keyword() {
        let d = router().route("fix the off-by-one bug in the writer", 100);
        assert_eq!(d.agent, AgentKind::Debugger);
        assert_eq!(d.reason, RouteReason::DebugKeywords);
    }

    #[test]
    fn no_match_defaults_to_coder() {
        let d = router().route("add a CSV export helper", 100);
        assert_eq!(d.agent, AgentKind::Coder);
        assert_eq!(d.reason, RouteReason::Default);
        assert!(!d.specialized);
    }

    #[test]
    fn empty_prompt_defaults_to_coder() {
        let d = router().route("", 100);
        assert_eq!(d.agent, AgentKind::Coder);
        assert_eq!(d.reason, RouteReason::Default);
    }
}
