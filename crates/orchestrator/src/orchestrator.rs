//! End-to-end query handling: session resolution, routing, dispatch,
//! streaming, and turn recording.

use futures::StreamExt;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

use switchboard_core::config::{AgentSettings, AppConfig};
use switchboard_core::{
    Agent, AgentResponse, ChatMessage, ChunkStream, ConversationContext, Error, LlmClient, Result,
    RoutingDecision,
};

use crate::prompts::{DIRECT_FALLBACK_REPLY, DIRECT_SYSTEM_PROMPT};
use crate::rate_limit::SlidingWindowLimiter;
use crate::registry::AgentRegistry;
use crate::router::IntentRouter;
use crate::sessions::{SessionStore, SharedContext};

/// Agent name recorded for directly handled turns.
pub const ORCHESTRATOR_NAME: &str = "orchestrator";

/// Agent name recorded for fallback turns.
pub const FALLBACK_NAME: &str = "fallback";

/// Turns of context included in direct-handling prompts.
const DIRECT_CONTEXT_TURNS: usize = 2;

/// User-facing text when a specialist errors out.
const AGENT_TROUBLE_REPLY: &str =
    "I tried to help with that, but ran into a problem. Please try again.";

/// Result of a buffered query.
pub struct ProcessOutcome {
    /// Session id, echoed or freshly minted.
    pub session_id: String,
    pub response: AgentResponse,
}

/// Result of a streaming query. The chunk stream is lazy; dispatch runs as
/// it is consumed.
pub struct StreamOutcome {
    /// Session id, echoed or freshly minted.
    pub session_id: String,
    pub chunks: ChunkStream,
}

enum RelayEnd {
    /// Source finished normally; carries the concatenated text.
    Completed(String),
    Failed,
    Cancelled,
}

/// Central coordinator: routes queries, dispatches to specialists or the
/// LLM, streams responses, and maintains conversation context.
///
/// Queries within one session are serialized by the session's mutex, so turn
/// order is well defined; sessions proceed independently of each other.
pub struct OrchestratorAgent {
    config: AppConfig,
    registry: Arc<AgentRegistry>,
    router: IntentRouter,
    llm: Option<Arc<dyn LlmClient>>,
    sessions: SessionStore,
    limiters: HashMap<String, SlidingWindowLimiter>,
    default_limiter: SlidingWindowLimiter,
}

impl OrchestratorAgent {
    pub fn new(
        config: AppConfig,
        registry: Arc<AgentRegistry>,
        router: IntentRouter,
        llm: Option<Arc<dyn LlmClient>>,
    ) -> Self {
        let sessions = SessionStore::new(config.session_ttl(), config.orchestrator.max_turns);

        let mut limiters = HashMap::new();
        for (name, settings) in &config.agents {
            limiters.insert(
                name.clone(),
                SlidingWindowLimiter::new(
                    settings.rate_limit.max_calls,
                    Duration::from_secs(settings.rate_limit.window_seconds),
                ),
            );
        }
        let defaults = AgentSettings::default();
        let default_limiter = SlidingWindowLimiter::new(
            defaults.rate_limit.max_calls,
            Duration::from_secs(defaults.rate_limit.window_seconds),
        );

        Self {
            config,
            registry,
            router,
            llm,
            sessions,
            limiters,
            default_limiter,
        }
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Healthy when any agent probe succeeds, or when no agents are
    /// registered yet.
    pub async fn health_check(&self) -> bool {
        let health = self.registry.health_check_all().await;
        health.is_empty() || health.values().any(|healthy| *healthy)
    }

    // =========================================================================
    // Buffered path
    // =========================================================================

    /// Process a query end to end and return a buffered response.
    pub async fn process(&self, query: &str, session_id: Option<&str>) -> Result<ProcessOutcome> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::invalid_request("query cannot be empty"));
        }

        let (session_id, context) = self.sessions.get_or_create(session_id).await;
        // Per-session lane: serializes dispatch and turn order for this session.
        let mut ctx = context.lock_owned().await;

        let decision = self.router.route(query, Some(&ctx)).await;
        self.log_decision(query, &decision);

        let response = self.dispatch(query, &decision, &ctx).await;

        if self.config.logging.log_agent_responses {
            tracing::debug!(
                agent = %response.agent_name,
                success = response.success,
                content_len = response.content.len(),
                "agent response"
            );
        }

        // Failed turns are not recorded, so the follow-up heuristic never
        // chases an error.
        if response.success {
            ctx.add_turn(query, &response.content, &response.agent_name);
        }

        Ok(ProcessOutcome {
            session_id,
            response,
        })
    }

    /// Direct bypass of the router: send `query` straight to `agent_name`.
    ///
    /// No session is involved and no turn is recorded. The rate limiter
    /// still applies.
    pub async fn process_direct(&self, agent_name: &str, query: &str) -> Result<AgentResponse> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::invalid_request("query cannot be empty"));
        }
        let Some(agent) = self.registry.get(agent_name) else {
            return Err(Error::unknown_agent(agent_name));
        };
        if !self.acquire_agent_budget(agent_name) {
            return Ok(self.rate_limit_response(agent_name));
        }
        let scratch = ConversationContext::new(self.config.orchestrator.max_turns);
        Ok(self.call_agent_contained(agent, agent_name, query, &scratch).await)
    }

    async fn dispatch(
        &self,
        query: &str,
        decision: &RoutingDecision,
        ctx: &ConversationContext,
    ) -> AgentResponse {
        if decision.handle_directly {
            return self.handle_direct(query, ctx).await;
        }
        match &decision.agent_name {
            Some(name) => self.delegate(name, query, ctx).await,
            None => self.handle_fallback(),
        }
    }

    async fn delegate(&self, name: &str, query: &str, ctx: &ConversationContext) -> AgentResponse {
        if !self.acquire_agent_budget(name) {
            return self.rate_limit_response(name);
        }
        let Some(agent) = self.registry.get(name) else {
            // Registered at routing time but gone now.
            return self.handle_fallback();
        };
        self.call_agent_contained(agent, name, query, ctx).await
    }

    /// Call an agent on its own task so a panic cannot take the worker down;
    /// the registry entry stays usable either way.
    async fn call_agent_contained(
        &self,
        agent: Arc<dyn Agent>,
        name: &str,
        query: &str,
        ctx: &ConversationContext,
    ) -> AgentResponse {
        let query = query.to_string();
        let snapshot = ctx.clone();
        let task = tokio::spawn(async move { agent.process(&query, &snapshot).await });
        match task.await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => AgentResponse::failure(name, AGENT_TROUBLE_REPLY, e.to_string()),
            Err(e) => {
                tracing::error!(agent = name, error = %e, "agent task aborted");
                AgentResponse::failure(name, AGENT_TROUBLE_REPLY, format!("agent '{}' aborted", name))
            }
        }
    }

    async fn handle_direct(&self, query: &str, ctx: &ConversationContext) -> AgentResponse {
        let Some(llm) = &self.llm else {
            return AgentResponse::ok(ORCHESTRATOR_NAME, DIRECT_FALLBACK_REPLY)
                .with_metadata("handled_directly", json!(true));
        };
        let messages = direct_messages(query, ctx);
        match llm.chat(&self.config.orchestrator.model, &messages).await {
            Ok(response) => AgentResponse::ok(ORCHESTRATOR_NAME, response.content)
                .with_metadata("handled_directly", json!(true)),
            Err(e) => {
                tracing::warn!(error = %e, "direct handling failed, using canned reply");
                AgentResponse::ok(ORCHESTRATOR_NAME, DIRECT_FALLBACK_REPLY)
                    .with_metadata("handled_directly", json!(true))
                    .with_metadata("fallback", json!(true))
            }
        }
    }

    fn handle_fallback(&self) -> AgentResponse {
        let agents = self.registry.list();
        let content = if agents.is_empty() {
            "I'm not sure how to help with that request. \
             Could you try rephrasing your question?"
                .to_string()
        } else {
            format!(
                "I'm not sure how to help with that specific request. \
                 I can assist with: {}. \
                 Could you rephrase your question or ask about one of these topics?",
                agents.join(", ")
            )
        };
        AgentResponse::ok(FALLBACK_NAME, content).with_metadata("fallback", json!(true))
    }

    // =========================================================================
    // Streaming path
    // =========================================================================

    /// Process a query as a lazy chunk stream.
    ///
    /// Cancelling `cancel` (client disconnect, deadline) stops chunk
    /// emission, propagates to the in-flight delegate, and skips the
    /// post-stream turn append.
    pub async fn stream(
        self: &Arc<Self>,
        query: &str,
        session_id: Option<&str>,
        cancel: CancellationToken,
    ) -> Result<StreamOutcome> {
        let query = query.trim().to_string();
        if query.is_empty() {
            return Err(Error::invalid_request("query cannot be empty"));
        }

        let (session_id, context) = self.sessions.get_or_create(session_id).await;
        let (tx, rx) = mpsc::channel::<Result<String>>(16);

        let this = self.clone();
        tokio::spawn(async move {
            this.run_stream(query, context, tx, cancel).await;
        });

        Ok(StreamOutcome {
            session_id,
            chunks: Box::pin(ReceiverStream::new(rx)),
        })
    }

    async fn run_stream(
        &self,
        query: String,
        context: SharedContext,
        tx: mpsc::Sender<Result<String>>,
        cancel: CancellationToken,
    ) {
        let mut ctx = context.lock_owned().await;

        let decision = tokio::select! {
            _ = cancel.cancelled() => return,
            decision = self.router.route(&query, Some(&ctx)) => decision,
        };
        self.log_decision(&query, &decision);

        let Some((agent_used, source)) = self.prepare_stream(&query, &decision, &ctx, &tx).await
        else {
            return;
        };

        match relay(source, &tx, &cancel).await {
            RelayEnd::Completed(collected) => {
                // The announcement prefix is not part of the response and is
                // not recorded.
                ctx.add_turn(&query, collected, &agent_used);
            }
            RelayEnd::Failed | RelayEnd::Cancelled => {}
        }
    }

    /// Resolve the decision to a concrete chunk source, emitting the
    /// routing announcement first. `None` means the stream already ended
    /// (rate-limit denial or the client went away).
    async fn prepare_stream(
        &self,
        query: &str,
        decision: &RoutingDecision,
        ctx: &ConversationContext,
        tx: &mpsc::Sender<Result<String>>,
    ) -> Option<(String, ChunkStream)> {
        if decision.handle_directly {
            return Some((
                ORCHESTRATOR_NAME.to_string(),
                self.direct_stream(query, ctx).await,
            ));
        }

        if let Some(name) = &decision.agent_name {
            if !self.acquire_agent_budget(name) {
                let denial = self.rate_limit_response(name);
                let _ = tx.send(Err(Error::rate_limited(denial.content))).await;
                return None;
            }
            if let Some(agent) = self.registry.get(name) {
                // Announce before delegating so downstream TTS can start
                // speaking while the agent works.
                if let Some(announcement) = self.announcement_for(name) {
                    if tx.send(Ok(announcement)).await.is_err() {
                        return None;
                    }
                }
                let source = self.open_agent_stream(agent, name, query, ctx).await;
                return Some((name.clone(), source));
            }
        }

        let fallback = self.handle_fallback();
        let content: Result<String> = Ok(fallback.content);
        Some((
            FALLBACK_NAME.to_string(),
            Box::pin(futures::stream::once(async move { content })),
        ))
    }

    async fn direct_stream(&self, query: &str, ctx: &ConversationContext) -> ChunkStream {
        if let Some(llm) = &self.llm {
            let messages = direct_messages(query, ctx);
            match llm
                .chat_stream(&self.config.orchestrator.model, &messages)
                .await
            {
                Ok(stream) => return stream,
                Err(e) => {
                    tracing::warn!(error = %e, "direct streaming failed, using canned reply");
                }
            }
        }
        let canned: Result<String> = Ok(DIRECT_FALLBACK_REPLY.to_string());
        Box::pin(futures::stream::once(async move { canned }))
    }

    /// Open a delegate's stream on its own task to contain panics.
    async fn open_agent_stream(
        &self,
        agent: Arc<dyn Agent>,
        name: &str,
        query: &str,
        ctx: &ConversationContext,
    ) -> ChunkStream {
        let query = query.to_string();
        let snapshot = ctx.clone();
        let task = tokio::spawn(async move { agent.stream(&query, &snapshot).await });
        match task.await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                let item: Result<String> = Err(Error::agent_failure(name, e.to_string()));
                Box::pin(futures::stream::once(async move { item }))
            }
            Err(e) => {
                tracing::error!(agent = name, error = %e, "agent stream task aborted");
                let item: Result<String> =
                    Err(Error::agent_failure(name, format!("agent '{}' aborted", name)));
                Box::pin(futures::stream::once(async move { item }))
            }
        }
    }

    // =========================================================================
    // Rate limiting and telemetry
    // =========================================================================

    /// Configured spoken prefix for delegations to `agent`, if any.
    fn announcement_for(&self, agent: &str) -> Option<String> {
        self.config
            .agents
            .get(agent)
            .and_then(|settings| settings.announcement.clone())
            .filter(|announcement| !announcement.is_empty())
    }

    fn limiter_for(&self, agent: &str) -> &SlidingWindowLimiter {
        self.limiters.get(agent).unwrap_or(&self.default_limiter)
    }

    fn acquire_agent_budget(&self, agent: &str) -> bool {
        self.limiter_for(agent).try_acquire(&format!("agent:{}", agent))
    }

    fn rate_limit_response(&self, agent: &str) -> AgentResponse {
        let limiter = self.limiter_for(agent);
        let retry = limiter
            .retry_after(&format!("agent:{}", agent))
            .unwrap_or_else(|| limiter.window());
        AgentResponse::failure(
            agent,
            format!(
                "I'm handling too many {} requests right now. \
                 Please try again in about {} seconds.",
                agent,
                retry.as_secs().max(1)
            ),
            "rate_limited",
        )
    }

    fn log_decision(&self, query: &str, decision: &RoutingDecision) {
        if self.config.logging.log_routing_decisions {
            tracing::info!(
                agent = ?decision.agent_name,
                confidence = decision.confidence,
                direct = decision.handle_directly,
                reasoning = %decision.reasoning,
                query_len = query.len(),
                "routing decision"
            );
        }
    }
}

fn direct_messages(query: &str, ctx: &ConversationContext) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::system(DIRECT_SYSTEM_PROMPT)];
    if ctx.turn_count() > 0 {
        messages.push(ChatMessage::user(format!(
            "Recent conversation:\n{}\n\nNew query: {}",
            ctx.get_recent_context(DIRECT_CONTEXT_TURNS),
            query
        )));
    } else {
        messages.push(ChatMessage::user(query));
    }
    messages
}

/// Forward `source` chunks to `tx` in order, stopping on cancellation,
/// receiver drop, or an error chunk.
async fn relay(
    mut source: ChunkStream,
    tx: &mpsc::Sender<Result<String>>,
    cancel: &CancellationToken,
) -> RelayEnd {
    let mut collected = String::new();
    loop {
        let item = tokio::select! {
            _ = cancel.cancelled() => return RelayEnd::Cancelled,
            item = source.next() => item,
        };
        match item {
            Some(Ok(chunk)) => {
                collected.push_str(&chunk);
                if tx.send(Ok(chunk)).await.is_err() {
                    // Receiver dropped: the client went away.
                    return RelayEnd::Cancelled;
                }
            }
            Some(Err(e)) => {
                let _ = tx.send(Err(e)).await;
                return RelayEnd::Failed;
            }
            None => return RelayEnd::Completed(collected),
        }
    }
}
