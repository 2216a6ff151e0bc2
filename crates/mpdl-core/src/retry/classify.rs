//! Sorts chunk fetch failures into transient and permanent kinds.

use crate::transport::FetchError;

/// Why a chunk attempt failed, as far as retrying is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Connect or transfer timeout.
    Timeout,
    /// 429 or 503 from the proxy or origin.
    Throttled,
    /// The proxy could not be reached or resolved.
    ProxyUnreachable,
    /// The connection or body stream ended early.
    Dropped,
    /// Other 5xx, typically a proxy that lost its upstream tunnel.
    ServerError(u32),
    /// Anything a second attempt will not fix (4xx, bad options).
    Permanent,
}

impl ErrorKind {
    pub fn is_transient(self) -> bool {
        !matches!(self, ErrorKind::Permanent)
    }
}

pub fn classify_http_status(code: u32) -> ErrorKind {
    match code {
        429 | 503 => ErrorKind::Throttled,
        500..=599 => ErrorKind::ServerError(code),
        _ => ErrorKind::Permanent,
    }
}

pub fn classify_curl_error(e: &curl::Error) -> ErrorKind {
    if e.is_operation_timedout() {
        ErrorKind::Timeout
    } else if e.is_couldnt_connect() || e.is_couldnt_resolve_proxy() || e.is_couldnt_resolve_host()
    {
        ErrorKind::ProxyUnreachable
    } else if e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
        || e.is_partial_file()
    {
        ErrorKind::Dropped
    } else {
        ErrorKind::Permanent
    }
}

pub fn classify(e: &FetchError) -> ErrorKind {
    match e {
        FetchError::Curl(ce) => classify_curl_error(ce),
        FetchError::Http(code) => classify_http_status(*code),
        FetchError::Stream(_) | FetchError::Closed => ErrorKind::Dropped,
    }
}
