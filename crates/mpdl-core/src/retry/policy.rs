//! Backoff schedule for re-running a failed chunk inside its worker.

use std::time::Duration;

use super::classify::classify;
use crate::transport::FetchError;

/// What a chunk worker does after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Report the failure; the download is abandoned.
    GiveUp,
    /// Sleep, then fetch the same range through the same endpoint again.
    RetryAfter(Duration),
}

/// Per-chunk attempt budget with doubling backoff. Built from `[retry]` in the
/// config or from `--retry N` on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per chunk, the first one included.
    pub max_attempts: u32,
    /// Wait after the first failed attempt.
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Default backoff with `max_attempts` attempts per chunk (at least one).
    pub fn with_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Wait after failed attempt `attempt` (1-based): `base_delay` doubled once
    /// per earlier failure, capped at `max_delay`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let doublings = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << doublings)
            .min(self.max_delay)
    }

    /// Decision after attempt `attempt` of a chunk failed with `err`.
    pub fn decide(&self, attempt: u32, err: &FetchError) -> RetryDecision {
        if attempt >= self.max_attempts || !classify(err).is_transient() {
            return RetryDecision::GiveUp;
        }
        RetryDecision::RetryAfter(self.backoff(attempt))
    }
}
