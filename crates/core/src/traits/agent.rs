//! Agent contract shared by all specialists and the orchestrator.

use async_trait::async_trait;
use std::pin::Pin;

use crate::error::{Error, Result};
use crate::types::{AgentCapability, AgentResponse, ConversationContext};

/// Lazy finite sequence of response text chunks.
pub type ChunkStream = Pin<Box<dyn futures::Stream<Item = Result<String>> + Send>>;

/// A specialist component that handles a class of queries.
///
/// Agents are registered once at startup and owned by the registry for their
/// registered lifetime; callers operate on shared handles. The context passed
/// to `process`/`stream` is a read snapshot; all mutation happens on the
/// orchestrator's dispatch path.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Stable unique identifier. Non-empty.
    fn name(&self) -> &str;

    /// Human-readable description of what this agent does.
    fn description(&self) -> &str;

    /// Capabilities this agent provides, used for routing.
    fn capabilities(&self) -> Vec<AgentCapability>;

    /// Process a query and return a buffered response.
    async fn process(&self, query: &str, context: &ConversationContext) -> Result<AgentResponse>;

    /// Stream response chunks for a query.
    ///
    /// Default implementation is a one-shot yield of `process`'s result; a
    /// failed response surfaces as an `Err` chunk so streaming callers observe
    /// the same failure the buffered path would.
    async fn stream(&self, query: &str, context: &ConversationContext) -> Result<ChunkStream> {
        let response = self.process(query, context).await?;
        let item = if response.success {
            Ok(response.content)
        } else {
            Err(Error::agent_failure(
                response.agent_name,
                response.error.unwrap_or_else(|| "agent reported failure".to_string()),
            ))
        };
        Ok(Box::pin(futures::stream::once(async move { item })))
    }

    /// Probe whether the agent is operational.
    async fn health_check(&self) -> bool;
}
