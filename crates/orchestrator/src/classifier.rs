//! Fast code-based intent classification.
//!
//! Keyword and regex pattern matching score each configured agent; the
//! router decides what to do with the ranking. Pure and deterministic: no
//! suspension points, no clocks.

use regex::{Regex, RegexBuilder};

use switchboard_core::{Error, Result};

// Scoring constants.
const KEYWORD_SCORE_PER_MATCH: f32 = 0.2;
const KEYWORD_SCORE_CAP: f32 = 0.6;
const PATTERN_SCORE_PER_MATCH: f32 = 0.3;
const PATTERN_SCORE_CAP: f32 = 0.6;
const AMBIGUITY_MARGIN: f32 = 0.1;

/// One agent's score in a classification, with what drove it.
#[derive(Debug, Clone)]
pub struct RankedAgent {
    pub agent_name: String,
    /// Combined keyword + pattern score, in [0, 1].
    pub score: f32,
    pub matched_keywords: Vec<String>,
    pub matched_patterns: Vec<String>,
}

impl RankedAgent {
    /// Human-readable explanation of the score.
    pub fn reasoning(&self) -> String {
        format!(
            "matched keywords {:?} and {} pattern(s)",
            self.matched_keywords,
            self.matched_patterns.len()
        )
    }
}

/// Result of classifying one query.
#[derive(Debug, Clone, Default)]
pub struct Classification {
    /// Agents with a positive score, best first. Ties keep config order.
    pub ranking: Vec<RankedAgent>,
    /// True when the top two scores are within the ambiguity margin.
    pub ambiguous: bool,
}

impl Classification {
    /// Best-scoring agent, if any matched.
    pub fn top(&self) -> Option<&RankedAgent> {
        self.ranking.first()
    }
}

struct AgentRules {
    agent_name: String,
    // One word-bounded regex per keyword, paired with the keyword itself.
    keywords: Vec<(String, Regex)>,
    // Case-insensitive patterns, paired with their source text.
    patterns: Vec<(String, Regex)>,
}

/// Keyword/pattern classifier over a fixed per-agent rule table.
///
/// Agents are scored independently; rule insertion order breaks ties.
/// Regex compilation failures are fatal configuration errors.
#[derive(Default)]
pub struct IntentClassifier {
    rules: Vec<AgentRules>,
}

impl IntentClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule table for one agent. Keywords match as whole words,
    /// case-insensitively; patterns are arbitrary regexes.
    pub fn add_agent(&mut self, agent_name: &str, keywords: &[&str], patterns: &[&str]) -> Result<()> {
        let mut compiled_keywords = Vec::with_capacity(keywords.len());
        for keyword in keywords {
            let keyword = keyword.to_lowercase();
            let regex = Regex::new(&format!(r"\b{}\b", regex::escape(&keyword)))
                .map_err(|e| Error::config(format!("bad keyword '{}': {}", keyword, e)))?;
            compiled_keywords.push((keyword, regex));
        }

        let mut compiled_patterns = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            let regex = RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| Error::config(format!("bad pattern '{}': {}", pattern, e)))?;
            compiled_patterns.push((pattern.to_string(), regex));
        }

        self.rules.push(AgentRules {
            agent_name: agent_name.to_string(),
            keywords: compiled_keywords,
            patterns: compiled_patterns,
        });
        Ok(())
    }

    /// Names of agents with rule tables, in insertion order.
    pub fn agents(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.agent_name.as_str()).collect()
    }

    /// Score every configured agent against `query`.
    ///
    /// Deterministic for a fixed query and configuration. An empty query or
    /// a query matching nothing yields an empty ranking.
    pub fn classify(&self, query: &str) -> Classification {
        let query = query.trim();
        if query.is_empty() {
            return Classification::default();
        }
        let lowered = query.to_lowercase();

        let mut ranking: Vec<RankedAgent> = Vec::new();
        for rules in &self.rules {
            let matched_keywords: Vec<String> = rules
                .keywords
                .iter()
                .filter(|(_, regex)| regex.is_match(&lowered))
                .map(|(keyword, _)| keyword.clone())
                .collect();
            let matched_patterns: Vec<String> = rules
                .patterns
                .iter()
                .filter(|(_, regex)| regex.is_match(query))
                .map(|(source, _)| source.clone())
                .collect();

            let keyword_score =
                (matched_keywords.len() as f32 * KEYWORD_SCORE_PER_MATCH).min(KEYWORD_SCORE_CAP);
            let pattern_score =
                (matched_patterns.len() as f32 * PATTERN_SCORE_PER_MATCH).min(PATTERN_SCORE_CAP);
            let score = (keyword_score + pattern_score).min(1.0);

            if score > 0.0 {
                ranking.push(RankedAgent {
                    agent_name: rules.agent_name.clone(),
                    score,
                    matched_keywords,
                    matched_patterns,
                });
            }
        }

        // Stable sort keeps insertion order for equal scores.
        ranking.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

        let ambiguous = ranking.len() >= 2
            && ranking[0].score > 0.0
            && ranking[1].score > 0.0
            && (ranking[0].score - ranking[1].score) < AMBIGUITY_MARGIN;

        Classification { ranking, ambiguous }
    }
}

/// Rule tables for the stock specialists, used by the default wiring.
pub fn builtin_rules() -> Vec<(&'static str, Vec<&'static str>, Vec<&'static str>)> {
    vec![
        (
            "gmail",
            vec!["email", "emails", "inbox", "unread", "mail", "gmail", "message", "messages"],
            vec![
                r"\b(check|read|search|find|show|list|get)\b.*\b(email|emails|mail|inbox)\b",
                r"\b(email|mail)\b.*\b(from|to|about|subject)\b",
                r"\bunread\b.*\b(email|emails|mail|message|messages)\b",
                r"\b(email|emails|mail|message|messages)\b.*\bunread\b",
            ],
        ),
        (
            "calendar",
            vec![
                "calendar",
                "schedule",
                "meeting",
                "meetings",
                "appointment",
                "appointments",
                "event",
                "events",
            ],
            vec![
                r"\b(check|show|list|what|when)\b.*\b(calendar|schedule|meeting|meetings|appointment)\b",
                r"\b(schedule|book|create)\b.*\b(meeting|appointment|event)\b",
                r"\b(meeting|meetings|appointment|appointments)\b.*\b(today|tomorrow|this week)\b",
            ],
        ),
        (
            "weather",
            vec!["weather", "temperature", "rain", "forecast", "sunny", "cloudy"],
            vec![
                r"\b(what|how|check)\b.*\b(weather|temperature|forecast)\b",
                r"\bwill it\b.*\b(rain|snow|be sunny)\b",
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> IntentClassifier {
        let mut classifier = IntentClassifier::new();
        for (name, keywords, patterns) in builtin_rules() {
            classifier.add_agent(name, &keywords, &patterns).unwrap();
        }
        classifier
    }

    #[test]
    fn keyword_scoring_accumulates() {
        let c = classifier();
        // "email" keyword + "check ... email" pattern.
        let result = c.classify("check my email");
        let top = result.top().unwrap();
        assert_eq!(top.agent_name, "gmail");
        assert!((top.score - 0.5).abs() < 1e-6);
        assert!(!result.ambiguous);
    }

    #[test]
    fn keyword_contribution_is_capped() {
        let c = classifier();
        // Five distinct keywords, one matching pattern: 0.6 + 0.3.
        let result = c.classify("any unread mail or email messages in my gmail inbox");
        let top = result.top().unwrap();
        assert_eq!(top.agent_name, "gmail");
        assert!((top.score - 0.9).abs() < 1e-6);
    }

    #[test]
    fn keywords_match_whole_words_only() {
        let c = classifier();
        // "mailbox" must not match the "mail" keyword.
        assert!(c.classify("paint my mailbox").ranking.is_empty());
    }

    #[test]
    fn empty_query_yields_empty_ranking() {
        let c = classifier();
        assert!(c.classify("").ranking.is_empty());
        assert!(c.classify("   ").ranking.is_empty());
    }

    #[test]
    fn unmatched_query_yields_empty_ranking() {
        let c = classifier();
        let result = c.classify("play some jazz");
        assert!(result.ranking.is_empty());
        assert!(result.top().is_none());
    }

    #[test]
    fn scores_are_descending_and_in_range() {
        let c = classifier();
        let result = c.classify("email me the weather forecast and my meeting schedule");
        assert!(result.ranking.len() >= 2);
        for pair in result.ranking.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        for ranked in &result.ranking {
            assert!((0.0..=1.0).contains(&ranked.score));
        }
    }

    #[test]
    fn close_scores_are_ambiguous() {
        let c = classifier();
        // One keyword each for gmail and weather.
        let result = c.classify("rain email");
        assert!(result.ambiguous);
    }

    #[test]
    fn ties_keep_config_order() {
        let mut c = IntentClassifier::new();
        c.add_agent("first", &["ping"], &[]).unwrap();
        c.add_agent("second", &["ping"], &[]).unwrap();
        let result = c.classify("ping");
        assert_eq!(result.ranking[0].agent_name, "first");
        assert_eq!(result.ranking[1].agent_name, "second");
    }

    #[test]
    fn classification_is_deterministic() {
        let c = classifier();
        let a = c.classify("check my email");
        let b = c.classify("check my email");
        assert_eq!(a.ranking.len(), b.ranking.len());
        assert_eq!(a.top().unwrap().score, b.top().unwrap().score);
    }

    #[test]
    fn bad_pattern_is_a_config_error() {
        let mut c = IntentClassifier::new();
        assert!(c.add_agent("broken", &[], &["("]).is_err());
    }
}
