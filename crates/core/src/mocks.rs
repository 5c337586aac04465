//! Mock implementations of core traits for testing.
//!
//! Scripted agents and LLM clients used across the workspace for unit and
//! integration tests.

use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Mutex;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::traits::{Agent, ChatMessage, ChunkStream, LlmClient, LlmResponse, LlmUsage};
use crate::types::{AgentCapability, AgentResponse, ConversationContext};

// =============================================================================
// Mock LLM Client
// =============================================================================

/// Scripted mock LLM that returns predefined responses in order.
pub struct MockLlm {
    responses: Mutex<Vec<String>>,
    call_count: Mutex<usize>,
    fail: bool,
}

impl MockLlm {
    /// Create a new mock LLM with a queue of responses.
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses: Mutex::new(responses),
            call_count: Mutex::new(0),
            fail: false,
        }
    }

    /// Create a mock that always returns the same response.
    pub fn constant(response: &str) -> Self {
        Self::new(vec![response.to_string()])
    }

    /// Create a mock whose every call fails.
    pub fn failing() -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            call_count: Mutex::new(0),
            fail: true,
        }
    }

    /// Number of calls made to this mock.
    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn chat(&self, _model: &str, _messages: &[ChatMessage]) -> Result<LlmResponse> {
        let mut count = self.call_count.lock().unwrap();
        *count += 1;

        if self.fail {
            return Err(Error::model_provider("mock provider unavailable"));
        }

        let responses = self.responses.lock().unwrap();
        let idx = (*count - 1) % responses.len().max(1);
        let content = responses
            .get(idx)
            .cloned()
            .unwrap_or_else(|| "mock response".to_string());

        Ok(LlmResponse {
            content,
            finish_reason: "stop".to_string(),
            usage: LlmUsage {
                prompt_tokens: 10,
                completion_tokens: 20,
                total_tokens: 30,
            },
        })
    }
}

// =============================================================================
// Mock Agent
// =============================================================================

/// Configurable scripted agent.
///
/// Streams its chunks in order; `process` returns their concatenation. The
/// failure knobs cover the orchestrator's containment paths: a scripted
/// failure response, a mid-stream error after N chunks, or a panic.
pub struct MockAgent {
    name: String,
    description: String,
    capabilities: Vec<AgentCapability>,
    chunks: Vec<String>,
    fail_with: Option<String>,
    fail_after: Option<usize>,
    panics: bool,
    healthy: bool,
    chunk_delay: Duration,
    call_count: Mutex<usize>,
}

impl MockAgent {
    /// Create a healthy agent that responds with a single canned chunk.
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: format!("Mock {} agent", name),
            capabilities: vec![AgentCapability::new(
                &format!("{}_capability", name),
                &format!("Handles {} queries", name),
                &[name],
                &[&format!("ask {} something", name)],
            )],
            chunks: vec![format!("{} response", name)],
            fail_with: None,
            fail_after: None,
            panics: false,
            healthy: true,
            chunk_delay: Duration::ZERO,
            call_count: Mutex::new(0),
        }
    }

    /// Replace the capability list.
    pub fn with_capability(mut self, capability: AgentCapability) -> Self {
        self.capabilities = vec![capability];
        self
    }

    /// Set the streamed chunks (and thus the buffered response).
    pub fn with_chunks(mut self, chunks: &[&str]) -> Self {
        self.chunks = chunks.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Insert a pause before each chunk and before `process` returns;
    /// useful for cancellation and serialization tests.
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    /// Script a failure response with the given error message.
    pub fn failing(mut self, error: &str) -> Self {
        self.fail_with = Some(error.to_string());
        self
    }

    /// Stream `n` chunks, then yield an error chunk.
    pub fn failing_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    /// Make `process` panic, for failure-isolation tests.
    pub fn panicking(mut self) -> Self {
        self.panics = true;
        self
    }

    /// Report unhealthy from `health_check`.
    pub fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }

    /// Number of `process`/`stream` calls made to this mock.
    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    fn record_call(&self) {
        *self.call_count.lock().unwrap() += 1;
    }
}

#[async_trait]
impl Agent for MockAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn capabilities(&self) -> Vec<AgentCapability> {
        self.capabilities.clone()
    }

    async fn process(&self, _query: &str, _context: &ConversationContext) -> Result<AgentResponse> {
        self.record_call();
        if self.panics {
            panic!("mock agent panic");
        }
        if !self.chunk_delay.is_zero() {
            tokio::time::sleep(self.chunk_delay).await;
        }
        if let Some(error) = &self.fail_with {
            return Ok(AgentResponse::failure(
                &self.name,
                "I ran into a problem with that request.",
                error,
            ));
        }
        Ok(AgentResponse::ok(&self.name, self.chunks.concat()))
    }

    async fn stream(&self, _query: &str, _context: &ConversationContext) -> Result<ChunkStream> {
        self.record_call();
        if self.panics {
            panic!("mock agent panic");
        }

        let mut items: Vec<Result<String>> = Vec::new();
        if let Some(error) = &self.fail_with {
            items.push(Err(Error::agent_failure(&self.name, error.clone())));
        } else if let Some(n) = self.fail_after {
            for chunk in self.chunks.iter().take(n) {
                items.push(Ok(chunk.clone()));
            }
            items.push(Err(Error::agent_failure(&self.name, "stream interrupted")));
        } else {
            for chunk in &self.chunks {
                items.push(Ok(chunk.clone()));
            }
        }

        let delay = self.chunk_delay;
        let stream = futures::stream::iter(items).then(move |item| async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            item
        });
        Ok(Box::pin(stream))
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }
}
