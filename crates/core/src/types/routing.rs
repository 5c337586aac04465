use serde::{Deserialize, Serialize};

// =============================================================================
// Routing Decision Types
// =============================================================================

/// Final verdict of the intent router for one query.
///
/// Exactly one of three shapes holds: `handle_directly` is true, `agent_name`
/// is a registered agent, or `agent_name` is absent (fallback).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingDecision {
    /// Target agent, when delegating.
    pub agent_name: Option<String>,

    /// Router certainty in [0, 1]. Reflects the routing, not the agent.
    pub confidence: f32,

    /// Why this decision was made.
    pub reasoning: String,

    /// True when the orchestrator should answer without delegating.
    pub handle_directly: bool,
}

impl RoutingDecision {
    /// Route to a named agent.
    pub fn agent(name: impl Into<String>, confidence: f32, reasoning: impl Into<String>) -> Self {
        Self {
            agent_name: Some(name.into()),
            confidence: confidence.clamp(0.0, 1.0),
            reasoning: reasoning.into(),
            handle_directly: false,
        }
    }

    /// Handle the query directly in the orchestrator.
    pub fn direct(confidence: f32, reasoning: impl Into<String>) -> Self {
        Self {
            agent_name: None,
            confidence: confidence.clamp(0.0, 1.0),
            reasoning: reasoning.into(),
            handle_directly: true,
        }
    }

    /// No agent matched; the orchestrator will produce a fallback message.
    pub fn fallback(reasoning: impl Into<String>) -> Self {
        Self {
            agent_name: None,
            confidence: 0.0,
            reasoning: reasoning.into(),
            handle_directly: false,
        }
    }

    /// True when neither direct handling nor an agent was selected.
    pub fn is_fallback(&self) -> bool {
        !self.handle_directly && self.agent_name.is_none()
    }
}
