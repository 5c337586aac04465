#![deny(unused)]
//! Orchestration core for Switchboard.
//!
//! This crate owns the routing pipeline and everything around it: the
//! keyword/pattern classifier, the hybrid intent router, the agent registry,
//! session state with TTL, per-agent rate limiting, and the orchestrator
//! that dispatches queries and streams responses.

pub mod classifier;
pub mod orchestrator;
pub mod prompts;
pub mod rate_limit;
pub mod registry;
pub mod router;
pub mod sessions;

pub use classifier::{builtin_rules, Classification, IntentClassifier, RankedAgent};
pub use orchestrator::{
    OrchestratorAgent, ProcessOutcome, StreamOutcome, FALLBACK_NAME, ORCHESTRATOR_NAME,
};
pub use rate_limit::SlidingWindowLimiter;
pub use registry::{AgentInfo, AgentRegistry};
pub use router::IntentRouter;
pub use sessions::{SessionStore, SharedContext};
