//! Single-stream path: resource size probe and the sequential baseline download.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use crate::coordinator::DownloadResult;
use crate::error::{DownloadError, SizeMismatch};
use crate::metrics::DownloadMetrics;
use crate::transport::{FetchError, FetchService, StreamRequest};

/// Default streamed buffer size for unranged GETs.
pub const DEFAULT_STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// Unranged requests through the transport's default route.
#[derive(Clone)]
pub struct SingleStream {
    service: Arc<dyn FetchService>,
    headers: HashMap<String, String>,
    chunk_size: usize,
}

impl SingleStream {
    pub fn new(
        service: Arc<dyn FetchService>,
        headers: HashMap<String, String>,
        chunk_size: usize,
    ) -> Self {
        Self {
            service,
            headers,
            chunk_size,
        }
    }

    fn stream_request<'a>(&'a self, url: &'a str) -> StreamRequest<'a> {
        StreamRequest {
            url,
            method: "GET",
            headers: &self.headers,
            chunk_size: self.chunk_size,
        }
    }

    /// Resource size from `Content-Length`.
    ///
    /// Tries HEAD first. When HEAD fails, is not 200, or carries no usable
    /// length, starts a streaming GET and reads the length from its headers;
    /// the body is dropped unread. Zero or absent is `SizeUnknown`.
    pub fn probe_size(&self, url: &str) -> Result<u64, DownloadError> {
        match self.service.probe_head(url) {
            Ok(head) if head.status == 200 => match head.headers.content_length {
                Some(n) if n > 0 => {
                    tracing::debug!(url, size = n, "size from HEAD");
                    return Ok(n);
                }
                _ => tracing::debug!(url, "HEAD has no usable Content-Length, trying GET"),
            },
            Ok(head) => tracing::debug!(url, status = head.status, "HEAD rejected, trying GET"),
            Err(e) => tracing::debug!(url, "HEAD failed ({}), trying GET", e),
        }

        let response = self
            .service
            .fetch_streaming(&self.stream_request(url))
            .map_err(DownloadError::Probe)?;
        if response.status != 200 {
            tracing::warn!(url, status = response.status, "size probe GET rejected");
            return Err(DownloadError::SizeUnknown);
        }
        match response.headers.content_length {
            Some(n) if n > 0 => {
                tracing::debug!(url, size = n, "size from GET headers");
                Ok(n)
            }
            _ => Err(DownloadError::SizeUnknown),
        }
    }

    /// One unranged GET read to completion. Metrics have the same shape as a
    /// parallel download; the per-endpoint map holds only the default route.
    pub fn download_sequential(&self, url: &str) -> Result<DownloadResult, DownloadError> {
        let start = Instant::now();
        tracing::info!(url, route = %self.service.default_route(), "single-stream download");

        let response = self
            .service
            .fetch_streaming(&self.stream_request(url))
            .map_err(DownloadError::Sequential)?;
        if !(200..300).contains(&response.status) {
            return Err(DownloadError::Sequential(FetchError::Http(response.status)));
        }
        let expected = response.headers.content_length;
        let bytes = response
            .body
            .into_buffered()
            .map_err(DownloadError::Sequential)?;
        let metrics = DownloadMetrics::new(bytes.len() as u64, start.elapsed());

        let size_mismatch = match expected {
            Some(n) if n != bytes.len() as u64 => {
                let m = SizeMismatch {
                    expected: n,
                    actual: bytes.len() as u64,
                };
                tracing::warn!(url, "{}", m);
                Some(m)
            }
            _ => None,
        };

        let mut per_endpoint = BTreeMap::new();
        per_endpoint.insert(self.service.default_route(), bytes.len() as u64);

        tracing::info!(
            url,
            bytes = bytes.len(),
            "single-stream done in {:.2}s ({:.2} MB/s)",
            metrics.elapsed.as_secs_f64(),
            metrics.megabytes_per_sec()
        );

        Ok(DownloadResult {
            total_size: expected.unwrap_or(bytes.len() as u64),
            bytes,
            metrics,
            per_endpoint,
            chunk_count: 1,
            size_mismatch,
        })
    }
}
