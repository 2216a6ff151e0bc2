//! Range fetcher: one bounded ranged request for one chunk.

use std::collections::HashMap;

use crate::assign::Chunk;
use crate::directory::ProxyEndpoint;
use crate::metrics::ChunkProgress;
use crate::transport::{FetchError, FetchService, RangedRequest};

/// Bytes received for one chunk and the endpoint that served them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkResult {
    pub chunk_index: usize,
    pub bytes: Vec<u8>,
    pub endpoint_used: ProxyEndpoint,
}

impl ChunkResult {
    pub fn new(chunk_index: usize, bytes: Vec<u8>, endpoint_used: ProxyEndpoint) -> Self {
        Self {
            chunk_index,
            bytes,
            endpoint_used,
        }
    }

    pub fn bytes_len(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Fetches `[chunk.start, chunk.end]` of `url` through `chunk.endpoint`.
///
/// 200 and 206 are accepted; any other status is `FetchError::Http`. A
/// streamed body is concatenated in arrival order, each buffer counted in
/// `progress`. No retry here.
pub fn fetch_chunk(
    service: &dyn FetchService,
    url: &str,
    chunk: &Chunk,
    headers: &HashMap<String, String>,
    progress: Option<&ChunkProgress>,
) -> Result<ChunkResult, FetchError> {
    tracing::debug!(
        chunk = chunk.index,
        proxy = %chunk.endpoint,
        "fetching {}",
        chunk.range_header_value()
    );

    let response = service.fetch_ranged(&RangedRequest {
        url,
        endpoint: &chunk.endpoint,
        start: chunk.start,
        end: chunk.end,
        method: "GET",
        headers,
    })?;

    if response.status != 200 && response.status != 206 {
        return Err(FetchError::Http(response.status));
    }

    let bytes = response.body.collect_with(|n| {
        if let Some(p) = progress {
            p.add(n as u64);
        }
    })?;

    if bytes.len() as u64 != chunk.byte_len() {
        tracing::debug!(
            chunk = chunk.index,
            status = response.status,
            "received {} bytes for a {}-byte range",
            bytes.len(),
            chunk.byte_len()
        );
    }

    Ok(ChunkResult::new(chunk.index, bytes, chunk.endpoint.clone()))
}
