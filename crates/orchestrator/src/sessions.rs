//! In-memory session store with TTL eviction.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use switchboard_core::ConversationContext;

/// Shared handle to one session's context.
///
/// The mutex doubles as the per-session dispatch lane: the orchestrator holds
/// it for the whole dispatch, so turns within a session are totally ordered
/// and readers observe either pre- or post-append state.
pub type SharedContext = Arc<Mutex<ConversationContext>>;

/// Mapping from session id to conversation context.
///
/// Entries are created on demand and evicted lazily by TTL on access.
/// Expired contexts are never returned: an expired or unknown id behaves
/// exactly like no id, minting a fresh session.
pub struct SessionStore {
    sessions: DashMap<String, SharedContext>,
    ttl: Duration,
    max_turns: usize,
}

impl SessionStore {
    pub fn new(ttl: Duration, max_turns: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
            max_turns,
        }
    }

    /// Look up a live session or create a new one.
    ///
    /// Returns the session id alongside the context handle; the id is echoed
    /// back to clients so follow-ups can continue the conversation.
    pub async fn get_or_create(&self, session_id: Option<&str>) -> (String, SharedContext) {
        self.sweep();

        if let Some(id) = session_id {
            let existing = self.sessions.get(id).map(|entry| entry.value().clone());
            if let Some(context) = existing {
                let mut guard = context.lock().await;
                if guard.is_expired(self.ttl) {
                    drop(guard);
                    self.sessions.remove(id);
                } else {
                    guard.touch();
                    drop(guard);
                    return (id.to_string(), context);
                }
            }
        }

        let context = ConversationContext::new(self.max_turns);
        let id = context.session_id.clone();
        let shared = Arc::new(Mutex::new(context));
        self.sessions.insert(id.clone(), shared.clone());
        (id, shared)
    }

    /// Drop expired sessions. Sessions locked by an in-flight dispatch are
    /// active by definition and are kept.
    pub fn sweep(&self) {
        let ttl = self.ttl;
        self.sessions.retain(|_, context| match context.try_lock() {
            Ok(guard) => !guard.is_expired(ttl),
            Err(_) => true,
        });
    }

    /// Number of live sessions (including any not yet swept).
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
