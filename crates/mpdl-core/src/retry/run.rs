//! Retry loop: run a fetch until success or the policy says stop.

use super::classify;
use super::policy::{RetryDecision, RetryPolicy};
use crate::transport::FetchError;

/// Runs `f` until it succeeds or the retry policy says to stop. `f` receives
/// the 1-based attempt number. On a retryable failure, sleeps for the backoff
/// duration then tries again.
pub fn run_with_retry<T, F>(policy: &RetryPolicy, mut f: F) -> Result<T, FetchError>
where
    F: FnMut(u32) -> Result<T, FetchError>,
{
    let mut attempt = 1u32;
    loop {
        match f(attempt) {
            Ok(v) => return Ok(v),
            Err(e) => {
                match policy.decide(attempt, &e) {
                    RetryDecision::GiveUp => return Err(e),
                    RetryDecision::RetryAfter(d) => {
                        let kind = classify::classify(&e);
                        tracing::debug!(attempt, ?kind, "retrying in {:?} after: {}", d, e);
                        std::thread::sleep(d);
                        attempt += 1;
                    }
                }
            }
        }
    }
}
