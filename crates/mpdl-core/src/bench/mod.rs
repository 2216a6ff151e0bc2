//! Benchmark mode: single-stream baseline vs parallel runs at several worker counts.
//!
//! Each run downloads the whole resource and writes it to a throwaway temp
//! directory, so the timings include the same output step as `mpdl get`. A
//! failed run is recorded, not fatal. Reports throughput (MB/s), speedup over
//! the baseline, and a recommended worker count.

use anyhow::{Context, Result};
use serde::Serialize;
use std::cmp::Ordering;
use std::path::Path;

use crate::coordinator::{Coordinator, DownloadResult};
use crate::error::DownloadError;
use crate::output;

/// Worker counts tried when none are given.
pub const DEFAULT_WORKER_COUNTS: [u32; 3] = [2, 4, 8];

/// Result of one benchmark run. `workers == None` is the single-stream baseline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchResult {
    pub workers: Option<u32>,
    pub bytes_downloaded: u64,
    pub elapsed_secs: f64,
    pub throughput_mb_s: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BenchResult {
    fn from_outcome(workers: Option<u32>, outcome: Result<DownloadResult, DownloadError>) -> Self {
        match outcome {
            Ok(r) => Self {
                workers,
                bytes_downloaded: r.metrics.bytes,
                elapsed_secs: r.metrics.elapsed.as_secs_f64(),
                throughput_mb_s: r.metrics.megabytes_per_sec(),
                error: None,
            },
            Err(e) => {
                let e = anyhow::Error::from(e);
                tracing::warn!(?workers, "bench run failed: {:#}", e);
                Self {
                    workers,
                    bytes_downloaded: 0,
                    elapsed_secs: 0.0,
                    throughput_mb_s: 0.0,
                    error: Some(format!("{:#}", e)),
                }
            }
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Runs the baseline then one parallel download per entry of `worker_counts`.
/// Blocking; call from `spawn_blocking` if used from async.
pub fn run_bench(
    coordinator: &Coordinator,
    url: &str,
    worker_counts: &[u32],
) -> Result<Vec<BenchResult>> {
    let temp_dir = tempfile::tempdir().context("create temp dir for bench")?;
    let mut results = Vec::with_capacity(worker_counts.len() + 1);

    tracing::info!(url, "bench: single-stream baseline");
    let baseline = coordinator
        .single_stream()
        .download_sequential(url)
        .and_then(|r| write_run(&temp_dir.path().join("single.bin"), r));
    results.push(BenchResult::from_outcome(None, baseline));

    for &workers in worker_counts {
        tracing::info!(url, workers, "bench: parallel run");
        let path = temp_dir.path().join(format!("parallel-{}.bin", workers));
        let outcome = coordinator.download_to_path(url, workers, &path);
        results.push(BenchResult::from_outcome(Some(workers), outcome));
    }

    Ok(results)
}

fn write_run(path: &Path, result: DownloadResult) -> Result<DownloadResult, DownloadError> {
    output::write_output(path, &result.bytes).map_err(|source| DownloadError::Output {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(result)
}

/// Throughput of `run` relative to the successful baseline, if both succeeded.
pub fn speedup(results: &[BenchResult], run: &BenchResult) -> Option<f64> {
    let baseline = results
        .iter()
        .find(|r| r.workers.is_none() && r.succeeded())?;
    if !run.succeeded() || baseline.throughput_mb_s <= 0.0 {
        return None;
    }
    Some(run.throughput_mb_s / baseline.throughput_mb_s)
}

/// Worker count of the fastest successful parallel run.
pub fn recommend_worker_count(results: &[BenchResult]) -> Option<u32> {
    results
        .iter()
        .filter(|r| r.succeeded())
        .filter_map(|r| r.workers.map(|w| (w, r.throughput_mb_s)))
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal))
        .map(|(w, _)| w)
}
