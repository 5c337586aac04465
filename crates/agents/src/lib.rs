#![deny(unused)]
//! Built-in agents.
//!
//! Simple specialists used by the default wiring and integration tests.
//! Real domain agents (email, calendar backends) live behind the same
//! `Agent` contract but are out of scope here.

use async_trait::async_trait;

use switchboard_core::{
    Agent, AgentCapability, AgentResponse, ChunkStream, ConversationContext, Result,
};

// =============================================================================
// Echo Agent
// =============================================================================

/// Echoes the query back, streaming word by word. Useful for wiring checks
/// and demos.
pub struct EchoAgent;

#[async_trait]
impl Agent for EchoAgent {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echoes your words back, useful for testing the pipeline"
    }

    fn capabilities(&self) -> Vec<AgentCapability> {
        vec![AgentCapability::new(
            "echo",
            "Repeats the query back to the caller",
            &["echo", "repeat", "say"],
            &["echo hello world", "repeat after me"],
        )]
    }

    async fn process(&self, query: &str, _context: &ConversationContext) -> Result<AgentResponse> {
        Ok(AgentResponse::ok(self.name(), format!("Echo: {}", query)))
    }

    async fn stream(&self, query: &str, _context: &ConversationContext) -> Result<ChunkStream> {
        let mut chunks: Vec<Result<String>> = vec![Ok("Echo:".to_string())];
        chunks.extend(query.split_whitespace().map(|word| Ok(format!(" {}", word))));
        Ok(Box::pin(futures::stream::iter(chunks)))
    }

    async fn health_check(&self) -> bool {
        true
    }
}

// =============================================================================
// Canned Agent
// =============================================================================

/// Agent with a fixed reply, standing in for a real specialist backend.
pub struct CannedAgent {
    name: String,
    description: String,
    capability: AgentCapability,
    reply: String,
}

impl CannedAgent {
    pub fn new(
        name: &str,
        description: &str,
        capability: AgentCapability,
        reply: &str,
    ) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            capability,
            reply: reply.to_string(),
        }
    }
}

#[async_trait]
impl Agent for CannedAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn capabilities(&self) -> Vec<AgentCapability> {
        vec![self.capability.clone()]
    }

    async fn process(&self, _query: &str, _context: &ConversationContext) -> Result<AgentResponse> {
        Ok(AgentResponse::ok(&self.name, &self.reply))
    }

    async fn health_check(&self) -> bool {
        true
    }
}

/// Demo stand-ins for the stock specialists, keyed to the classifier's
/// builtin rule tables.
pub fn demo_agents() -> Vec<(&'static str, CannedAgent)> {
    vec![
        (
            "gmail",
            CannedAgent::new(
                "gmail",
                "Demo email agent (no mailbox attached)",
                AgentCapability::new(
                    "read_email",
                    "Reads and summarizes email",
                    &["email", "inbox", "unread", "mail"],
                    &["check my email", "any unread mail?"],
                ),
                "This demo build has no mailbox attached, but your email agent would answer here.",
            ),
        ),
        (
            "calendar",
            CannedAgent::new(
                "calendar",
                "Demo calendar agent (no calendar attached)",
                AgentCapability::new(
                    "check_schedule",
                    "Looks up meetings and events",
                    &["calendar", "schedule", "meeting", "event"],
                    &["what's on my calendar", "when is my next meeting?"],
                ),
                "This demo build has no calendar attached, but your schedule would appear here.",
            ),
        ),
        (
            "weather",
            CannedAgent::new(
                "weather",
                "Demo weather agent (no provider attached)",
                AgentCapability::new(
                    "forecast",
                    "Reports current conditions and forecasts",
                    &["weather", "forecast", "temperature", "rain"],
                    &["what's the weather", "will it rain tomorrow?"],
                ),
                "This demo build has no weather provider attached, but the forecast would appear here.",
            ),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn echo_agent_round_trips_the_query() {
        let agent = EchoAgent;
        let ctx = ConversationContext::new(5);
        let response = agent.process("hello world", &ctx).await.unwrap();
        assert_eq!(response.content, "Echo: hello world");
        assert_eq!(response.agent_name, "echo");
    }

    #[tokio::test]
    async fn echo_agent_streams_word_by_word() {
        let agent = EchoAgent;
        let ctx = ConversationContext::new(5);
        let chunks: Vec<String> = agent
            .stream("hello world", &ctx)
            .await
            .unwrap()
            .map(|chunk| chunk.unwrap())
            .collect()
            .await;
        assert_eq!(chunks, vec!["Echo:", " hello", " world"]);
    }

    #[tokio::test]
    async fn canned_agent_default_stream_is_one_shot() {
        let (_, agent) = demo_agents().remove(0);
        let ctx = ConversationContext::new(5);
        let chunks: Vec<String> = agent
            .stream("check my email", &ctx)
            .await
            .unwrap()
            .map(|chunk| chunk.unwrap())
            .collect()
            .await;
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].contains("email agent"));
    }

    #[tokio::test]
    async fn demo_agents_are_healthy() {
        for (name, agent) in demo_agents() {
            assert_eq!(agent.name(), name);
            assert!(agent.health_check().await);
        }
    }
}
