//! Cooldown gate in front of the upstream rate provider.

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::debug;

/// Minimum interval between accepted upstream calls.
pub const COOLDOWN: Duration = Duration::seconds(10);

/// How long the last accepted call is remembered.
pub const RETENTION: Duration = Duration::seconds(300);

/// Smallest wait reported on a denied call.
const MIN_REMAINING_SECS: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThrottleDecision {
    Allowed,
    /// Remaining wait in seconds, rounded to one decimal place and always positive.
    Denied { remaining_secs: f64 },
}

#[cfg(test)]
impl ThrottleDecision {
    fn is_allowed(&self) -> bool {
        matches!(self, ThrottleDecision::Allowed)
    }
}

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    last_accepted_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

/// Process-wide cooldown gate.
///
/// `try_acquire` checks and updates the last accepted timestamp under a single
/// lock, so concurrent callers observe a total order. State is kept in-process
/// only; separate processes each enforce their own cooldown.
pub struct Throttle {
    cooldown: Duration,
    retention: Duration,
    state: Mutex<Option<CacheEntry>>,
}

impl Throttle {
    pub fn new() -> Self {
        Self::with_windows(COOLDOWN, RETENTION)
    }

    pub fn with_windows(cooldown: Duration, retention: Duration) -> Self {
        Self {
            cooldown,
            retention,
            state: Mutex::new(None),
        }
    }

    pub async fn try_acquire(&self, now: DateTime<Utc>) -> ThrottleDecision {
        let mut state = self.state.lock().await;

        if let Some(entry) = state.as_ref() {
            if now < entry.expires_at {
                let elapsed = (now - entry.last_accepted_at).max(Duration::zero());
                if elapsed < self.cooldown {
                    let remaining_secs = round_remaining(self.cooldown - elapsed);
                    debug!(remaining_secs, "Throttle denied");
                    return ThrottleDecision::Denied { remaining_secs };
                }
            } else {
                debug!("Throttle entry expired");
            }
        }

        *state = Some(CacheEntry {
            last_accepted_at: now,
            expires_at: now + self.retention,
        });
        debug!("Throttle allowed");
        ThrottleDecision::Allowed
    }

    /// Timestamp of the last accepted call, if it has not expired at `now`.
    #[cfg(test)]
    async fn last_accepted_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let state = self.state.lock().await;
        state
            .as_ref()
            .filter(|entry| now < entry.expires_at)
            .map(|entry| entry.last_accepted_at)
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new()
    }
}

fn round_remaining(remaining: Duration) -> f64 {
    let secs = remaining.num_milliseconds() as f64 / 1000.0;
    ((secs * 10.0).round() / 10.0).max(MIN_REMAINING_SECS)
}
