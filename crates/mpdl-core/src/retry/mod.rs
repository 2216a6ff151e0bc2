//! Retry and backoff policy for chunk fetches.
//!
//! Classifies fetch failures (timeouts, throttling, connection drops) and
//! turns them into exponential backoff decisions. Used only when a retry
//! policy is configured; without one a failed chunk fails the download on
//! its first attempt.

mod classify;
mod policy;
mod run;

pub use classify::{classify, classify_curl_error, classify_http_status, ErrorKind};
pub use policy::{RetryDecision, RetryPolicy};
pub use run::run_with_retry;
