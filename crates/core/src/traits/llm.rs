//! Upstream model provider traits.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::traits::agent::ChunkStream;

/// LLM client interface.
///
/// Implementations wrap a provider SDK; the core only depends on this
/// contract. All calls may suspend and must observe task cancellation.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a chat completion.
    async fn chat(&self, model: &str, messages: &[ChatMessage]) -> Result<LlmResponse>;

    /// Stream a chat completion as text chunks.
    ///
    /// Default implementation yields the buffered completion as one chunk.
    async fn chat_stream(&self, model: &str, messages: &[ChatMessage]) -> Result<ChunkStream> {
        let response = self.chat(model, messages).await?;
        let item: Result<String> = Ok(response.content);
        Ok(Box::pin(futures::stream::once(async move { item })))
    }
}

/// Chat message for LLM interactions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role (system, user, assistant).
    pub role: String,
    /// Message content.
    pub content: String,
}

impl ChatMessage {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Response from an LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    /// Generated content.
    pub content: String,
    /// Finish reason.
    pub finish_reason: String,
    /// Token usage.
    pub usage: LlmUsage,
}

/// Token usage from one LLM call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmUsage {
    /// Prompt tokens.
    pub prompt_tokens: u64,
    /// Completion tokens.
    pub completion_tokens: u64,
    /// Total tokens.
    pub total_tokens: u64,
}
