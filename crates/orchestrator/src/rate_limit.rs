//! Sliding-window rate limiting keyed by caller identity.

use dashmap::DashMap;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Continuous sliding-window rate limiter.
///
/// One budget (`max_events` per `window`) shared by every key, with
/// independent counting per key. Window math uses the monotonic clock, so
/// wall-clock adjustments cannot release bursts. Denied calls consume no
/// budget. Never fails: `false` is the only refusal.
pub struct SlidingWindowLimiter {
    max_events: usize,
    window: Duration,
    buckets: DashMap<String, VecDeque<Instant>>,
}

impl SlidingWindowLimiter {
    /// Create a limiter admitting `max_events` per `window` per key.
    pub fn new(max_events: usize, window: Duration) -> Self {
        Self {
            max_events,
            window,
            buckets: DashMap::new(),
        }
    }

    /// Admit or refuse an event for `key`.
    ///
    /// Returns `true` iff the caller is within budget; the event is recorded
    /// only on admission. Atomic per key.
    pub fn try_acquire(&self, key: &str) -> bool {
        if self.max_events == 0 {
            return false;
        }
        let now = Instant::now();
        let mut bucket = self.buckets.entry(key.to_string()).or_default();
        Self::evict(&mut bucket, now, self.window);
        if bucket.len() < self.max_events {
            bucket.push_back(now);
            true
        } else {
            false
        }
    }

    /// Time until the oldest in-window event for `key` falls out of the
    /// window. `None` when the key has budget available right now.
    pub fn retry_after(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let mut bucket = self.buckets.get_mut(key)?;
        Self::evict(&mut bucket, now, self.window);
        if bucket.len() < self.max_events {
            return None;
        }
        bucket
            .front()
            .map(|oldest| self.window.saturating_sub(now.duration_since(*oldest)))
    }

    /// The configured window length.
    pub fn window(&self) -> Duration {
        self.window
    }

    // An event whose timestamp equals the cutoff is outside the window.
    fn evict(bucket: &mut VecDeque<Instant>, now: Instant, window: Duration) {
        if let Some(cutoff) = now.checked_sub(window) {
            while bucket.front().is_some_and(|t| *t <= cutoff) {
                bucket.pop_front();
            }
        }
    }
}
