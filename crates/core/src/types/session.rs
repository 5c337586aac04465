use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use uuid::Uuid;

// =============================================================================
// Conversation Types
// =============================================================================

/// Phrases that mark a query as a continuation of the previous topic.
/// Matched as whole words anywhere in the query.
pub const FOLLOW_UP_PHRASES: &[&str] = &[
    "what about",
    "tell me more",
    "also",
    "and",
    "how about",
    "what else",
];

/// Pronouns that suggest a short query refers back to prior context.
pub const FOLLOW_UP_PRONOUNS: &[&str] = &["it", "they", "them", "that", "this", "those", "these"];

/// Short queries (at most this many tokens) are checked for pronouns.
const FOLLOW_UP_MAX_TOKENS: usize = 5;

/// A single completed turn in a conversation. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Original user text.
    pub query: String,

    /// Final response text.
    pub response: String,

    /// Name of the agent that produced the response.
    pub agent_used: String,

    /// Wall-clock timestamp, used only for ordering and logs.
    pub timestamp: DateTime<Utc>,
}

/// Conversation state for one session.
///
/// Turns are ordered by insertion and bounded by `max_turns`; the oldest are
/// dropped first. `last_agent` always mirrors the most recent turn.
#[derive(Debug, Clone)]
pub struct ConversationContext {
    /// Opaque unique session id.
    pub session_id: String,

    /// Turn history, oldest first.
    turns: VecDeque<ConversationTurn>,

    /// Agent used on the most recent turn, if any.
    pub last_agent: Option<String>,

    /// Monotonic timestamp of the last touch, for TTL math.
    last_activity: Instant,

    /// Cap on stored turns.
    max_turns: usize,
}

impl ConversationContext {
    /// Create a context with a freshly generated session id.
    pub fn new(max_turns: usize) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), max_turns)
    }

    /// Create a context with an explicit session id.
    pub fn with_id(session_id: impl Into<String>, max_turns: usize) -> Self {
        Self {
            session_id: session_id.into(),
            turns: VecDeque::new(),
            last_agent: None,
            last_activity: Instant::now(),
            max_turns: max_turns.max(1),
        }
    }

    /// Append a turn, updating `last_agent` and the activity timestamp.
    pub fn add_turn(
        &mut self,
        query: impl Into<String>,
        response: impl Into<String>,
        agent_used: impl Into<String>,
    ) {
        let agent_used = agent_used.into();
        self.turns.push_back(ConversationTurn {
            query: query.into(),
            response: response.into(),
            agent_used: agent_used.clone(),
            timestamp: Utc::now(),
        });
        while self.turns.len() > self.max_turns {
            self.turns.pop_front();
        }
        self.last_agent = Some(agent_used);
        self.touch();
    }

    /// Turn history, oldest first.
    pub fn turns(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.turns.iter()
    }

    /// Number of stored turns.
    pub fn turn_count(&self) -> usize {
        self.turns.len()
    }

    /// Format the last `n` turns as a readable summary, oldest first.
    pub fn get_recent_context(&self, n: usize) -> String {
        let skip = self.turns.len().saturating_sub(n);
        let mut lines = Vec::new();
        for turn in self.turns.iter().skip(skip) {
            lines.push(format!("User: {}", turn.query));
            lines.push(format!("Agent ({}): {}", turn.agent_used, turn.response));
        }
        lines.join("\n")
    }

    /// Detect whether `query` is a follow-up that should go to the last agent.
    ///
    /// Returns the last agent's name when the query contains a follow-up
    /// phrase as whole words, or is short (≤ 5 tokens) and contains a
    /// back-referencing pronoun. Pure: depends only on the lowercased query
    /// and `last_agent`.
    pub fn should_continue_with_agent(&self, query: &str) -> Option<String> {
        let last_agent = self.last_agent.as_ref()?;
        if self.turns.is_empty() {
            return None;
        }

        let lowered = query.to_lowercase();
        let tokens: Vec<&str> = lowered
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
            .filter(|w| !w.is_empty())
            .collect();

        for phrase in FOLLOW_UP_PHRASES {
            let phrase_tokens: Vec<&str> = phrase.split(' ').collect();
            if tokens
                .windows(phrase_tokens.len())
                .any(|window| window == phrase_tokens.as_slice())
            {
                return Some(last_agent.clone());
            }
        }

        if tokens.len() <= FOLLOW_UP_MAX_TOKENS
            && tokens.iter().any(|t| FOLLOW_UP_PRONOUNS.contains(t))
        {
            return Some(last_agent.clone());
        }

        None
    }

    /// Refresh the activity timestamp.
    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    /// True when the context has been idle longer than `ttl`.
    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.last_activity.elapsed() > ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx_with_turn(agent: &str) -> ConversationContext {
        let mut ctx = ConversationContext::new(20);
        ctx.add_turn("check my email", "You have 3 unread emails.", agent);
        ctx
    }

    #[test]
    fn add_turn_updates_last_agent() {
        let mut ctx = ConversationContext::new(20);
        assert!(ctx.last_agent.is_none());
        ctx.add_turn("q1", "r1", "gmail");
        ctx.add_turn("q2", "r2", "weather");
        assert_eq!(ctx.last_agent.as_deref(), Some("weather"));
        assert_eq!(
            ctx.turns().last().unwrap().agent_used,
            ctx.last_agent.clone().unwrap()
        );
    }

    #[test]
    fn history_is_capped_oldest_dropped() {
        let mut ctx = ConversationContext::new(3);
        for i in 0..5 {
            ctx.add_turn(format!("q{i}"), format!("r{i}"), "gmail");
        }
        assert_eq!(ctx.turn_count(), 3);
        assert_eq!(ctx.turns().next().unwrap().query, "q2");
    }

    #[test]
    fn recent_context_is_oldest_first() {
        let mut ctx = ConversationContext::new(20);
        ctx.add_turn("first", "one", "gmail");
        ctx.add_turn("second", "two", "gmail");
        ctx.add_turn("third", "three", "gmail");
        let summary = ctx.get_recent_context(2);
        let first_pos = summary.find("second").unwrap();
        let second_pos = summary.find("third").unwrap();
        assert!(first_pos < second_pos);
        assert!(!summary.contains("first"));
    }

    #[test]
    fn follow_up_phrase_detected() {
        let ctx = ctx_with_turn("ski");
        assert_eq!(
            ctx.should_continue_with_agent("what about tomorrow?"),
            Some("ski".to_string())
        );
        assert_eq!(
            ctx.should_continue_with_agent("Tell me more"),
            Some("ski".to_string())
        );
    }

    #[test]
    fn phrase_matches_whole_words_only() {
        let ctx = ctx_with_turn("gmail");
        // "sandy" contains "and" as a substring but not as a word.
        assert_eq!(ctx.should_continue_with_agent("find sandy beaches in portugal please"), None);
        assert!(ctx.should_continue_with_agent("and the second one?").is_some());
    }

    #[test]
    fn short_pronoun_query_is_follow_up() {
        let ctx = ctx_with_turn("gmail");
        assert!(ctx.should_continue_with_agent("delete it").is_some());
        assert!(ctx.should_continue_with_agent("are they urgent?").is_some());
        // Long queries are not treated as pronoun follow-ups.
        assert_eq!(
            ctx.should_continue_with_agent("is it going to be sunny in denver next saturday"),
            None
        );
    }

    #[test]
    fn no_follow_up_without_history() {
        let ctx = ConversationContext::new(20);
        assert_eq!(ctx.should_continue_with_agent("what about it?"), None);
    }

    #[test]
    fn expiry_tracks_activity() {
        let ctx = ConversationContext::new(20);
        assert!(!ctx.is_expired(Duration::from_secs(60)));
        assert!(ctx.is_expired(Duration::from_nanos(0)));
    }
}
