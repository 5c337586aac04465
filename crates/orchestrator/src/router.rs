//! Hybrid intent router combining heuristics, code classification, and an
//! LLM fallback.

use std::sync::Arc;

use switchboard_core::config::RoutingConfig;
use switchboard_core::{ChatMessage, ConversationContext, LlmClient, RoutingDecision};

use crate::classifier::{Classification, IntentClassifier};
use crate::prompts::{format_agent_catalog, match_direct_utterance, ROUTER_SYSTEM_PROMPT};
use crate::registry::AgentRegistry;

/// Confidence assigned to follow-up continuations. High but below 1.0
/// since the detection is heuristic.
const FOLLOW_UP_CONFIDENCE: f32 = 0.9;

/// Minimum code-classification score worth falling back to when the LLM
/// call itself fails.
const LLM_ERROR_FALLBACK_THRESHOLD: f32 = 0.3;

/// Turns of context included in the router prompt.
const ROUTER_CONTEXT_TURNS: usize = 3;

/// Produces the final routing decision for a query.
///
/// Four checks run in order, short-circuiting on the first decision:
/// follow-up continuation, direct handling, code classification, LLM
/// fallback. Follow-ups are cheap and preserve context; greetings never need
/// an agent; keyword matching resolves the common case without LLM latency;
/// the LLM is the escape hatch for novel phrasings.
pub struct IntentRouter {
    registry: Arc<AgentRegistry>,
    classifier: IntentClassifier,
    config: RoutingConfig,
    router_model: String,
    llm: Option<Arc<dyn LlmClient>>,
}

impl IntentRouter {
    pub fn new(
        registry: Arc<AgentRegistry>,
        classifier: IntentClassifier,
        config: RoutingConfig,
        router_model: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            classifier,
            config,
            router_model: router_model.into(),
            llm: None,
        }
    }

    /// Enable the LLM routing fallback.
    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Route a query, optionally informed by conversation context.
    pub async fn route(&self, query: &str, context: Option<&ConversationContext>) -> RoutingDecision {
        // Step 1: follow-up continuation.
        if self.config.follow_up_detection {
            if let Some(context) = context {
                if let Some(agent) = context.should_continue_with_agent(query) {
                    if self.registry.contains(&agent) {
                        return RoutingDecision::agent(
                            &agent,
                            FOLLOW_UP_CONFIDENCE,
                            format!("follow-up continuation, staying with {}", agent),
                        );
                    }
                }
            }
        }

        // Step 2: greetings and thanks never need an agent.
        if let Some(utterance) = match_direct_utterance(query) {
            return RoutingDecision::direct(1.0, format!("greeting/thanks detected: '{}'", utterance));
        }

        // Step 3: code-based classification.
        let classification = self.classifier.classify(query);
        if !classification.ambiguous {
            if let Some(top) = classification.top() {
                if top.score >= self.config.code_routing_threshold
                    && self.registry.contains(&top.agent_name)
                {
                    return RoutingDecision::agent(
                        &top.agent_name,
                        top.score,
                        format!("code-based routing: {}", top.reasoning()),
                    );
                }
            }
        }

        // Step 4: LLM fallback for ambiguous or novel phrasings.
        if self.config.llm_routing_enabled {
            if let Some(llm) = &self.llm {
                return self.llm_route(llm.as_ref(), query, &classification, context).await;
            }
        }

        self.undecided(&classification, "LLM routing disabled")
    }

    /// Decision when neither the fast paths nor the LLM produced an answer.
    fn undecided(&self, classification: &Classification, reason: &str) -> RoutingDecision {
        if let Some(default_agent) = &self.config.default_agent {
            if self.registry.contains(default_agent) {
                let confidence = classification.top().map(|t| t.score).unwrap_or(0.0);
                return RoutingDecision::agent(
                    default_agent,
                    confidence.max(0.1),
                    format!("{}; using default agent", reason),
                );
            }
        }
        RoutingDecision::fallback(format!("{}; no agent match found", reason))
    }

    async fn llm_route(
        &self,
        llm: &dyn LlmClient,
        query: &str,
        classification: &Classification,
        context: Option<&ConversationContext>,
    ) -> RoutingDecision {
        let catalog = format_agent_catalog(&self.registry.agents_info());
        let system = ROUTER_SYSTEM_PROMPT.replace("{agent_descriptions}", &catalog);

        let mut user_message = String::new();
        if let Some(context) = context {
            if context.turn_count() > 0 {
                user_message.push_str(&format!(
                    "Recent conversation:\n{}\n\n",
                    context.get_recent_context(ROUTER_CONTEXT_TURNS)
                ));
            }
        }
        user_message.push_str(&format!("Query: {}", query));
        if let Some(top) = classification.top() {
            user_message.push_str(&format!(
                "\n\nCode-based hint: possibly {} (confidence: {:.2})",
                top.agent_name, top.score
            ));
        }

        let messages = [ChatMessage::system(system), ChatMessage::user(user_message)];
        match llm.chat(&self.router_model, &messages).await {
            Ok(response) => self.parse_llm_response(&response.content),
            Err(e) => {
                tracing::warn!(error = %e, "LLM routing call failed");
                // Fall back to a usable code classification before giving up.
                if let Some(top) = classification.top() {
                    if top.score > LLM_ERROR_FALLBACK_THRESHOLD
                        && self.registry.contains(&top.agent_name)
                    {
                        return RoutingDecision::agent(
                            &top.agent_name,
                            top.score,
                            "LLM routing failed; using code classification",
                        );
                    }
                }
                self.undecided(classification, "LLM routing failed")
            }
        }
    }

    /// Parse the structured router response.
    ///
    /// Expected lines: `AGENT: <name|NONE|DIRECT>`, `CONFIDENCE: <0..1>`,
    /// `REASONING: <text>`. `=` is accepted as separator. Malformed
    /// confidence defaults to 0.5; an unregistered agent degrades to
    /// fallback.
    fn parse_llm_response(&self, response: &str) -> RoutingDecision {
        let mut agent_value: Option<String> = None;
        let mut confidence: f32 = 0.5;
        let mut reasoning = "LLM routing".to_string();

        for line in response.lines() {
            if let Some(value) = parse_field(line, "AGENT") {
                agent_value = Some(value.to_lowercase());
            } else if let Some(value) = parse_field(line, "CONFIDENCE") {
                confidence = value.parse::<f32>().unwrap_or(0.5).clamp(0.0, 1.0);
            } else if let Some(value) = parse_field(line, "REASONING") {
                reasoning = value.to_string();
            }
        }

        match agent_value.as_deref() {
            Some("direct") => RoutingDecision::direct(confidence, reasoning),
            Some("none") | None => RoutingDecision::fallback(reasoning),
            Some(name) => {
                if self.registry.contains(name) {
                    RoutingDecision::agent(name, confidence, reasoning)
                } else {
                    RoutingDecision::fallback(format!("LLM suggested unknown agent '{}'", name))
                }
            }
        }
    }
}

/// Extract the value of a `FIELD: value` line, case-insensitively.
fn parse_field<'a>(line: &'a str, field: &str) -> Option<&'a str> {
    let line = line.trim();
    if line.len() < field.len() {
        return None;
    }
    let (head, tail) = line.split_at(field.len());
    if !head.eq_ignore_ascii_case(field) {
        return None;
    }
    let tail = tail.trim_start();
    let tail = tail.strip_prefix(':').or_else(|| tail.strip_prefix('='))?;
    Some(tail.trim())
}
