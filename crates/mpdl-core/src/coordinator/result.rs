//! Download result, reassembly, and the serializable report.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::SizeMismatch;
use crate::fetcher::ChunkResult;
use crate::metrics::DownloadMetrics;

/// Outcome of a successful download. Built once; the bytes are written to
/// the sink and the rest is reported.
#[derive(Debug, Clone)]
pub struct DownloadResult {
    /// Chunk bytes concatenated in index order.
    pub bytes: Vec<u8>,
    /// Size reported by the probe.
    pub total_size: u64,
    pub metrics: DownloadMetrics,
    /// Bytes received per endpoint (display form).
    pub per_endpoint: BTreeMap<String, u64>,
    pub chunk_count: usize,
    pub size_mismatch: Option<SizeMismatch>,
}

impl DownloadResult {
    pub fn report(&self, url: &str) -> DownloadReport {
        DownloadReport {
            url: url.to_string(),
            total_size: self.total_size,
            metrics: self.metrics,
            per_endpoint: self.per_endpoint.clone(),
            chunk_count: self.chunk_count,
            size_mismatch: self.size_mismatch,
            output: None,
            sha256: None,
        }
    }
}

/// Summary printed by the CLI (`--json` or text).
#[derive(Debug, Clone, Serialize)]
pub struct DownloadReport {
    pub url: String,
    pub total_size: u64,
    #[serde(flatten)]
    pub metrics: DownloadMetrics,
    pub per_endpoint: BTreeMap<String, u64>,
    pub chunk_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_mismatch: Option<SizeMismatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

/// Concatenates chunk bytes in ascending `chunk_index`, whatever order the
/// results arrived in. A total that differs from `expected` is returned as a
/// mismatch, never an error.
pub fn reassemble(
    mut results: Vec<ChunkResult>,
    expected: u64,
) -> (Vec<u8>, Option<SizeMismatch>) {
    results.sort_by_key(|r| r.chunk_index);
    let total: usize = results.iter().map(|r| r.bytes.len()).sum();
    let mut bytes = Vec::with_capacity(total);
    for r in results {
        bytes.extend_from_slice(&r.bytes);
    }

    let actual = bytes.len() as u64;
    let mismatch = (actual != expected).then(|| {
        let m = SizeMismatch { expected, actual };
        tracing::warn!("size mismatch: {}", m);
        m
    });
    (bytes, mismatch)
}
