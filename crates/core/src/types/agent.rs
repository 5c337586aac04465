use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// =============================================================================
// Agent Response Types
// =============================================================================

/// Standardized response from any agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResponse {
    /// Complete response text.
    pub content: String,

    /// Whether the agent handled the query successfully.
    pub success: bool,

    /// Name of the responding agent ("orchestrator" for direct handling,
    /// "fallback" when no agent matched).
    pub agent_name: String,

    /// Free-form metadata attached by the responder.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,

    /// Error description. Present iff `success` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AgentResponse {
    /// Create a successful response.
    pub fn ok(agent_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            success: true,
            agent_name: agent_name.into(),
            metadata: HashMap::new(),
            error: None,
        }
    }

    /// Create a failed response. `content` carries user-facing fallback text.
    pub fn failure(
        agent_name: impl Into<String>,
        content: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            success: false,
            agent_name: agent_name.into(),
            metadata: HashMap::new(),
            error: Some(error.into()),
        }
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

// =============================================================================
// Agent Capability Types
// =============================================================================

/// Describes one thing an agent can do.
///
/// Keywords feed the fast-path classifier; examples feed the LLM router
/// prompt. Keywords are expected lowercase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentCapability {
    /// Capability name.
    pub name: String,

    /// Human-readable description.
    pub description: String,

    /// Lowercase trigger keywords for fast-path routing.
    pub keywords: Vec<String>,

    /// Illustrative example queries for LLM routing context.
    pub examples: Vec<String>,
}

impl AgentCapability {
    /// Convenience constructor taking string slices.
    pub fn new(
        name: &str,
        description: &str,
        keywords: &[&str],
        examples: &[&str],
    ) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            examples: examples.iter().map(|e| e.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_carries_error() {
        let resp = AgentResponse::failure("gmail", "Try again later.", "upstream 500");
        assert!(!resp.success);
        assert_eq!(resp.error.as_deref(), Some("upstream 500"));
        assert_eq!(resp.agent_name, "gmail");
    }

    #[test]
    fn capability_lowercases_keywords() {
        let cap = AgentCapability::new("read_email", "Reads email", &["Email", "INBOX"], &[]);
        assert_eq!(cap.keywords, vec!["email", "inbox"]);
    }
}
