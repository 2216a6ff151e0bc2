//! Fetch error type, classified by the retry policy.

/// Failure of a single request: transport error or unacceptable status.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Curl reported an error (timeout, connection, proxy, etc.).
    #[error(transparent)]
    Curl(#[from] curl::Error),
    /// The response status was not acceptable for the request.
    #[error("HTTP {0}")]
    Http(u32),
    /// The body stream ended with a malformed or unexpected event.
    #[error("stream: {0}")]
    Stream(String),
    /// The transfer thread went away without finishing the response.
    #[error("transfer closed before completion")]
    Closed,
}
