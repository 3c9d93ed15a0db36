//! Cooldown policy: decides whether a session may edit right now
//!
//! Pure decision logic over a fixed duration. The policy never mutates a
//! session on a rejected attempt; `arm` is called by the engine only after
//! an edit has been accepted and applied.

use std::time::{Duration, Instant};

use crate::session::Session;
use shared::COOLDOWN_SECS;

/// Per-player rate limit between accepted edits.
#[derive(Debug, Clone, Copy)]
pub struct CooldownPolicy {
    duration: Duration,
}

impl CooldownPolicy {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// True iff the session has no prior edit or its cooldown has elapsed.
    pub fn may_edit(&self, session: &Session, now: Instant) -> bool {
        match session.cooldown_until {
            Some(until) => now >= until,
            None => true,
        }
    }

    /// Starts a fresh cooldown. Only called after an accepted edit.
    pub fn arm(&self, session: &mut Session, now: Instant) {
        session.cooldown_until = Some(now + self.duration);
    }

    /// Time left until the session may edit again; zero once elapsed.
    pub fn remaining(&self, session: &Session, now: Instant) -> Duration {
        match session.cooldown_until {
            Some(until) => until.saturating_duration_since(now),
            None => Duration::ZERO,
        }
    }

    /// Remaining time in whole seconds, rounded up, for client-facing
    /// countdown messages. Never negative.
    pub fn remaining_secs(&self, session: &Session, now: Instant) -> u64 {
        let remaining = self.remaining(session, now);
        if remaining.is_zero() {
            0
        } else {
            // Ceiling in whole seconds: 0.001s left still reads as "1".
            let secs = remaining.as_secs();
            if remaining.subsec_nanos() > 0 {
                secs + 1
            } else {
                secs
            }
        }
    }
}

impl Default for CooldownPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(COOLDOWN_SECS))
    }
}
