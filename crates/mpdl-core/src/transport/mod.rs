//! Request interface to the proxy daemon.
//!
//! The orchestrator consumes the network only through [`FetchService`]:
//! ranged GETs through a chosen proxy endpoint, unranged streaming GETs
//! through the default route, and HEAD probes. [`CurlTransport`] is the
//! libcurl implementation; tests substitute in-memory fakes.

mod curl_transport;
mod error;
mod headers;

use std::collections::HashMap;
use std::fmt;

use crate::directory::ProxyEndpoint;

pub use curl_transport::{CurlTransport, TransportOptions};
pub use error::FetchError;
pub use headers::{parse_header_lines, ResponseHeaders};

/// One byte-range request routed through a specific proxy endpoint.
#[derive(Debug, Clone, Copy)]
pub struct RangedRequest<'a> {
    pub url: &'a str,
    /// Proxy to route through; its `port_hint` overrides the port in its URL.
    pub endpoint: &'a ProxyEndpoint,
    /// First byte (inclusive).
    pub start: u64,
    /// Last byte (inclusive).
    pub end: u64,
    pub method: &'a str,
    pub headers: &'a HashMap<String, String>,
}

/// Unranged request through the transport's default route.
#[derive(Debug, Clone, Copy)]
pub struct StreamRequest<'a> {
    pub url: &'a str,
    pub method: &'a str,
    pub headers: &'a HashMap<String, String>,
    /// Preferred size of each streamed buffer (a hint; the last one may be shorter).
    pub chunk_size: usize,
}

/// Response to a GET: status, parsed headers, and a body in one of two shapes.
#[derive(Debug)]
pub struct FetchResponse {
    pub status: u32,
    pub headers: ResponseHeaders,
    pub body: ResponseBody,
}

/// Response to a HEAD probe.
#[derive(Debug, Clone)]
pub struct HeadResponse {
    pub status: u32,
    pub headers: ResponseHeaders,
}

/// Lazily produced body buffers, in transfer order.
pub type BodyStream = Box<dyn Iterator<Item = Result<Vec<u8>, FetchError>> + Send>;

/// Body of a response: already in memory, or still arriving.
pub enum ResponseBody {
    Buffered(Vec<u8>),
    Streamed(BodyStream),
}

impl ResponseBody {
    /// Concatenates the body into one contiguous buffer, preserving order.
    pub fn into_buffered(self) -> Result<Vec<u8>, FetchError> {
        self.collect_with(|_| {})
    }

    /// Like [`into_buffered`](Self::into_buffered), calling `on_data` with the
    /// length of every buffer as it is appended.
    pub fn collect_with<F>(self, mut on_data: F) -> Result<Vec<u8>, FetchError>
    where
        F: FnMut(usize),
    {
        match self {
            ResponseBody::Buffered(bytes) => {
                on_data(bytes.len());
                Ok(bytes)
            }
            ResponseBody::Streamed(stream) => {
                let mut out = Vec::new();
                for piece in stream {
                    let piece = piece?;
                    on_data(piece.len());
                    out.extend_from_slice(&piece);
                }
                Ok(out)
            }
        }
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseBody::Buffered(b) => f.debug_tuple("Buffered").field(&b.len()).finish(),
            ResponseBody::Streamed(_) => f.write_str("Streamed(..)"),
        }
    }
}

/// The external request interface. Implementations must be shareable across
/// chunk worker threads.
pub trait FetchService: Send + Sync {
    /// One ranged request through `req.endpoint`. Non-2xx statuses are returned
    /// as responses, not errors; only transport failures are `Err`.
    fn fetch_ranged(&self, req: &RangedRequest<'_>) -> Result<FetchResponse, FetchError>;

    /// Unranged request through the default route.
    fn fetch_streaming(&self, req: &StreamRequest<'_>) -> Result<FetchResponse, FetchError>;

    /// HEAD request through the default route.
    fn probe_head(&self, url: &str) -> Result<HeadResponse, FetchError>;

    /// Label for the default route in per-endpoint totals.
    fn default_route(&self) -> String {
        "default".to_string()
    }
}
