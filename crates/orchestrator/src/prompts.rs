//! Prompt templates and lexical tables for the router and direct handling.

use crate::registry::AgentInfo;

/// System prompt for the LLM routing fallback. `{agent_descriptions}` is
/// replaced with the formatted capability catalog.
pub const ROUTER_SYSTEM_PROMPT: &str = "\
You are a routing assistant for a multi-agent gateway.
Your job is to analyze user queries and determine which specialist agent should handle them.

AVAILABLE AGENTS:
{agent_descriptions}

ROUTING RULES:
1. Route to an agent ONLY if the query clearly matches their capabilities
2. Set AGENT: DIRECT for greetings, thanks, simple questions about yourself,
   or general conversation that needs no specialist
3. Set AGENT: NONE if no agent fits and the query is not general conversation
4. If uncertain between agents, choose the most likely one with lower confidence
5. Consider conversation context when routing follow-ups

RESPONSE FORMAT:
You MUST respond in this exact format (one item per line):
AGENT: <agent_name, DIRECT, or NONE>
CONFIDENCE: <0.0 to 1.0>
REASONING: <brief one-line explanation>";

/// System prompt for queries the orchestrator answers itself.
pub const DIRECT_SYSTEM_PROMPT: &str = "\
You are Switchboard, a helpful assistant that fronts a set of specialist agents.
For greetings, thanks, and general questions, respond naturally and helpfully.
Keep responses concise and friendly.";

/// Canned reply when direct handling has no working model behind it.
pub const DIRECT_FALLBACK_REPLY: &str =
    "Hello! I'm Switchboard, your assistant. How can I help you today?";

/// Utterances handled directly without any agent. Matching is purely
/// lexical: the whole trimmed query, or a prefix followed by punctuation
/// only.
pub const DIRECT_UTTERANCES: &[&str] = &[
    "hello",
    "hi",
    "hey",
    "good morning",
    "good afternoon",
    "good evening",
    "thanks",
    "thank you",
    "thx",
    "great",
    "ok",
    "okay",
];

/// Check whether `query` is a pure greeting or acknowledgment.
///
/// Returns the matched utterance. Longer utterances are checked first so
/// "thank you" wins over a "thanks" prefix miss.
pub fn match_direct_utterance(query: &str) -> Option<&'static str> {
    let lowered = query.trim().to_lowercase();
    let mut candidates: Vec<&'static str> = DIRECT_UTTERANCES.to_vec();
    candidates.sort_by_key(|u| std::cmp::Reverse(u.len()));

    for utterance in candidates {
        if lowered == utterance {
            return Some(utterance);
        }
        if let Some(rest) = lowered.strip_prefix(utterance) {
            if !rest.is_empty() && rest.chars().all(|c| !c.is_alphanumeric()) {
                return Some(utterance);
            }
        }
    }
    None
}

/// Format the agent catalog for the router prompt.
pub fn format_agent_catalog(agents: &[AgentInfo]) -> String {
    if agents.is_empty() {
        return "No agents currently available.".to_string();
    }

    let mut lines = Vec::new();
    for info in agents {
        lines.push(format!("Agent: {}", info.name));
        lines.push(format!("  {}", info.description));
        if info.capabilities.is_empty() {
            lines.push("  - (no capabilities defined)".to_string());
        } else {
            for cap in &info.capabilities {
                lines.push(format!("  - {}: {}", cap.name, cap.description));
            }
            let examples: Vec<&str> = info.capabilities[0]
                .examples
                .iter()
                .take(2)
                .map(|e| e.as_str())
                .collect();
            if !examples.is_empty() {
                lines.push(format!("  Example queries: {}", examples.join(", ")));
            }
        }
        lines.push(String::new());
    }
    lines.join("\n")
}
