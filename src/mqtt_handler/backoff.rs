//! Exponential backoff state machine used by the broker event loop.

use std::time::{Duration, Instant};

use rand::{Rng, SeedableRng, rngs::StdRng};

use super::config::BackoffPolicy;

const MIN_SLEEP_MS: u64 = 10;

/// Tracks reconnection attempts and produces jittered delays.
pub struct BackoffState {
    policy: BackoffPolicy,
    current: Duration,
    failure_since: Option<Instant>,
    connected_since: Option<Instant>,
    rng: StdRng,
}

impl BackoffState {
    /// Create a new state machine from the supplied policy.
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            current: policy.base,
            failure_since: None,
            connected_since: None,
            rng: StdRng::from_entropy(),
            policy,
        }
    }

    /// Record that the broker accepted a connection.
    pub fn record_connected(&mut self, now: Instant) {
        self.connected_since = Some(now);
    }

    /// Record that the connection dropped. A connection that stayed up for at
    /// least `reset_after` starts a fresh backoff window.
    pub fn record_disconnected(&mut self, now: Instant) {
        if let Some(since) = self.connected_since.take()
            && now.duration_since(since) >= self.policy.reset_after
        {
            self.reset();
        }
    }

    /// Start over from the base delay.
    pub fn reset(&mut self) {
        self.current = self.policy.base;
        self.failure_since = None;
    }

    /// Calculate the next sleep duration following a failure.
    ///
    /// Delays are jittered and grow up to `cap`. Once the failure window
    /// exceeds the policy deadline, retries settle at exactly `cap`.
    pub fn next_sleep(&mut self, now: Instant) -> Duration {
        let start = *self.failure_since.get_or_insert(now);

        if let Some(deadline) = self.policy.deadline
            && now.duration_since(start) >= deadline
        {
            self.current = self.policy.cap;
            return self.policy.cap.max(Duration::from_millis(MIN_SLEEP_MS));
        }

        if now != start {
            self.current = self.current.saturating_mul(2).min(self.policy.cap);
        }

        let max_ms = self.current.as_millis().min(u128::from(u64::MAX)) as u64;
        let sleep_ms = match max_ms {
            0 => MIN_SLEEP_MS,
            1..=MIN_SLEEP_MS => max_ms,
            _ => self.rng.gen_range(MIN_SLEEP_MS..=max_ms),
        };
        Duration::from_millis(sleep_ms)
    }
}
