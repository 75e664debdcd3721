//! Prompt routing: intent classification, complexity estimation, and the
//! priority-ordered agent selector.

pub mod agent;
pub mod complexity;
pub mod intent;

pub use agent::{AgentKind, AgentRouter, RouteReason, RoutingDecision};
pub use complexity::{estimate, should_orchestrate, ComplexityLevel};
pub use intent::{Intent, IntentClassification, IntentClassifier};
