//! Download metrics: elapsed time, throughput, per-endpoint byte totals,
//! and live progress snapshots.

mod progress;

use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::fetcher::ChunkResult;

pub use progress::{ChunkProgress, ProgressReporter, ProgressStats, ProgressTracker};

/// Size, time and throughput of one completed download. The parallel and
/// sequential paths report the same shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DownloadMetrics {
    pub bytes: u64,
    #[serde(rename = "elapsed_secs", serialize_with = "as_secs_f64")]
    pub elapsed: Duration,
    pub bytes_per_sec: f64,
}

impl DownloadMetrics {
    /// Throughput is `bytes / elapsed`, or 0 when no time elapsed.
    pub fn new(bytes: u64, elapsed: Duration) -> Self {
        let secs = elapsed.as_secs_f64();
        let bytes_per_sec = if secs > 0.0 { bytes as f64 / secs } else { 0.0 };
        Self {
            bytes,
            elapsed,
            bytes_per_sec,
        }
    }

    /// Throughput in MB/s (10^6 bytes).
    pub fn megabytes_per_sec(&self) -> f64 {
        self.bytes_per_sec / 1_000_000.0
    }
}

fn as_secs_f64<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

/// Bytes received per endpoint, keyed by the endpoint's display form.
pub fn per_endpoint_totals(results: &[ChunkResult]) -> BTreeMap<String, u64> {
    let mut totals = BTreeMap::new();
    for r in results {
        *totals.entry(r.endpoint_used.to_string()).or_insert(0) += r.bytes_len();
    }
    totals
}

/// Human-readable byte count (binary units).
pub fn format_bytes(n: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = n as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", n)
    } else {
        format!("{:.2} {}", value, UNITS[unit])
    }
}
