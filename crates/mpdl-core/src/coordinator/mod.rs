//! Parallel download coordinator.
//!
//! Probes the resource size, resolves proxy endpoints, plans and assigns
//! chunks, then runs one worker thread per chunk. Results fan in over a
//! channel; any failed chunk fails the whole download and nothing is written.
//! On success the chunks are reassembled in index order.

mod result;

use std::collections::HashMap;
use std::path::Path;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::assign::{AssignmentPolicy, Chunk};
use crate::directory::ProxyDirectory;
use crate::error::DownloadError;
use crate::fetcher::{fetch_chunk, ChunkResult};
use crate::metrics::{per_endpoint_totals, DownloadMetrics, ProgressStats, ProgressTracker};
use crate::output;
use crate::planner::plan_chunks;
use crate::retry::{run_with_retry, RetryPolicy};
use crate::single::{SingleStream, DEFAULT_STREAM_CHUNK_SIZE};
use crate::transport::{FetchError, FetchService};

pub use result::{reassemble, DownloadReport, DownloadResult};

/// Knobs for one coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorOptions {
    /// Extra request headers sent with every request.
    pub headers: HashMap<String, String>,
    /// Per-chunk retry. `None` means a chunk gets exactly one attempt.
    pub retry: Option<RetryPolicy>,
    /// Transport-port hints rotated over chunks by index.
    pub port_hints: Vec<u16>,
    pub progress_interval: Duration,
    /// Streamed buffer size for the size probe and single-stream GETs.
    pub chunk_size: usize,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            headers: HashMap::new(),
            retry: None,
            port_hints: Vec::new(),
            progress_interval: Duration::from_millis(500),
            chunk_size: DEFAULT_STREAM_CHUNK_SIZE,
        }
    }
}

type ChunkOutcome = Result<ChunkResult, FetchError>;

/// Orchestrates parallel range downloads over an injected fetch service and
/// proxy directory.
pub struct Coordinator {
    service: Arc<dyn FetchService>,
    directory: Arc<dyn ProxyDirectory>,
    single: SingleStream,
    options: CoordinatorOptions,
    progress_tx: Option<tokio::sync::mpsc::Sender<ProgressStats>>,
}

impl Coordinator {
    pub fn new(
        service: Arc<dyn FetchService>,
        directory: Arc<dyn ProxyDirectory>,
        options: CoordinatorOptions,
    ) -> Self {
        let single = SingleStream::new(
            Arc::clone(&service),
            options.headers.clone(),
            options.chunk_size,
        );
        Self {
            service,
            directory,
            single,
            options,
            progress_tx: None,
        }
    }

    /// Send live [`ProgressStats`] snapshots to `tx` while chunks download.
    pub fn with_progress(mut self, tx: tokio::sync::mpsc::Sender<ProgressStats>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    /// The single-stream path sharing this coordinator's service and headers.
    pub fn single_stream(&self) -> &SingleStream {
        &self.single
    }

    /// Downloads `url` in `worker_count` chunks, each through its assigned proxy.
    pub fn download(&self, url: &str, worker_count: u32) -> Result<DownloadResult, DownloadError> {
        let start = Instant::now();

        let total_size = self.single.probe_size(url)?;
        let endpoints = self.directory.list_proxies()?;
        if endpoints.is_empty() {
            return Err(DownloadError::NoProxiesAvailable);
        }
        let ranges = plan_chunks(total_size, worker_count)?;
        let chunks = AssignmentPolicy::new(self.options.port_hints.clone())
            .assign(&ranges, &endpoints)?;

        tracing::info!(
            url,
            total_size,
            chunks = chunks.len(),
            proxies = endpoints.len(),
            "starting parallel download"
        );

        let tracker = ProgressTracker::new(chunks.len(), total_size, start);
        let reporter = self
            .progress_tx
            .as_ref()
            .map(|tx| tracker.spawn_reporter(tx.clone(), self.options.progress_interval));
        let fanned = self.fan_out(url, chunks, &tracker);
        if let Some(reporter) = reporter {
            reporter.finish();
        }
        let results = fanned?;

        let per_endpoint = per_endpoint_totals(&results);
        let chunk_count = results.len();
        let (bytes, size_mismatch) = reassemble(results, total_size);
        let metrics = DownloadMetrics::new(bytes.len() as u64, start.elapsed());

        tracing::info!(
            url,
            bytes = metrics.bytes,
            "parallel download done in {:.2}s ({:.2} MB/s)",
            metrics.elapsed.as_secs_f64(),
            metrics.megabytes_per_sec()
        );
        for (endpoint, n) in &per_endpoint {
            tracing::debug!(proxy = %endpoint, bytes = n, "endpoint total");
        }

        Ok(DownloadResult {
            bytes,
            total_size,
            metrics,
            per_endpoint,
            chunk_count,
            size_mismatch,
        })
    }

    /// Runs [`download`](Self::download) and writes the bytes to `output_path`.
    /// Nothing is created on disk unless the download succeeded.
    pub fn download_to_path(
        &self,
        url: &str,
        worker_count: u32,
        output_path: &Path,
    ) -> Result<DownloadResult, DownloadError> {
        let result = self.download(url, worker_count)?;
        output::write_output(output_path, &result.bytes).map_err(|source| {
            DownloadError::Output {
                path: output_path.to_path_buf(),
                source,
            }
        })?;
        tracing::info!(path = %output_path.display(), "wrote {} bytes", result.bytes.len());
        Ok(result)
    }

    /// One thread per chunk, all started together. Waits for every chunk; a
    /// failure does not cancel the others. Fails with the lowest failing index.
    fn fan_out(
        &self,
        url: &str,
        chunks: Vec<Chunk>,
        tracker: &ProgressTracker,
    ) -> Result<Vec<ChunkResult>, DownloadError> {
        let count = chunks.len();
        let (tx, rx) = mpsc::channel::<(usize, ChunkOutcome)>();
        let mut handles = Vec::with_capacity(count);

        for chunk in chunks {
            let index = chunk.index;
            let worker_tx = tx.clone();
            let service = Arc::clone(&self.service);
            let url = url.to_string();
            let headers = self.options.headers.clone();
            let policy = self.options.retry;
            let progress = tracker.handle(index);
            let spawned = thread::Builder::new()
                .name(format!("mpdl-chunk-{}", index))
                .spawn(move || {
                    let outcome = match policy {
                        Some(p) => run_with_retry(&p, |attempt| {
                            if attempt > 1 {
                                progress.reset();
                                tracing::info!(chunk = index, attempt, "retrying chunk");
                            }
                            fetch_chunk(service.as_ref(), &url, &chunk, &headers, Some(&progress))
                        }),
                        None => fetch_chunk(service.as_ref(), &url, &chunk, &headers, Some(&progress)),
                    };
                    if outcome.is_ok() {
                        progress.mark_done();
                    }
                    let _ = worker_tx.send((index, outcome));
                });
            match spawned {
                Ok(h) => handles.push((index, h)),
                Err(e) => {
                    tracing::error!(chunk = index, "could not start worker: {}", e);
                    let _ = tx.send((
                        index,
                        Err(FetchError::Stream(format!("spawn worker: {}", e))),
                    ));
                }
            }
        }
        drop(tx);

        let mut slots: Vec<Option<ChunkOutcome>> = (0..count).map(|_| None).collect();
        for (index, outcome) in rx {
            if let Err(e) = &outcome {
                tracing::warn!(chunk = index, "chunk failed: {}", e);
            }
            slots[index] = Some(outcome);
        }
        for (index, handle) in handles {
            if handle.join().is_err() {
                tracing::error!(chunk = index, "worker panicked");
            }
        }

        let mut results = Vec::with_capacity(count);
        for (index, slot) in slots.into_iter().enumerate() {
            match slot {
                Some(Ok(r)) => results.push(r),
                Some(Err(source)) => return Err(DownloadError::ChunkFetchFailed { index, source }),
                None => return Err(DownloadError::WorkerPanicked { index }),
            }
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{ProxyEndpoint, StaticDirectory};
    use crate::transport::{
        FetchResponse, HeadResponse, RangedRequest, ResponseBody, ResponseHeaders, StreamRequest,
    };
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// In-memory origin reached through named proxies. Requests through a
    /// proxy listed in `failing` get HTTP 502; `flaky` fails the first N
    /// ranged requests.
    struct FakeService {
        data: Vec<u8>,
        failing: Vec<String>,
        flaky: AtomicU32,
        seen: Mutex<Vec<(String, u64, u64)>>,
    }

    impl FakeService {
        fn new(data: Vec<u8>) -> Self {
            Self {
                data,
                failing: Vec::new(),
                flaky: AtomicU32::new(0),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl FetchService for FakeService {
        fn fetch_ranged(&self, req: &RangedRequest<'_>) -> Result<FetchResponse, FetchError> {
            self.seen
                .lock()
                .unwrap()
                .push((req.endpoint.url.clone(), req.start, req.end));
            if self
                .flaky
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(FetchError::Closed);
            }
            if self.failing.contains(&req.endpoint.url) {
                return Ok(FetchResponse {
                    status: 502,
                    headers: ResponseHeaders::default(),
                    body: ResponseBody::Buffered(Vec::new()),
                });
            }
            let slice = self.data[req.start as usize..=req.end as usize].to_vec();
            Ok(FetchResponse {
                status: 206,
                headers: ResponseHeaders::default(),
                body: ResponseBody::Buffered(slice),
            })
        }

        fn fetch_streaming(&self, _req: &StreamRequest<'_>) -> Result<FetchResponse, FetchError> {
            Ok(FetchResponse {
                status: 200,
                headers: ResponseHeaders {
                    content_length: Some(self.data.len() as u64),
                    ..Default::default()
                },
                body: ResponseBody::Buffered(self.data.clone()),
            })
        }

        fn probe_head(&self, _url: &str) -> Result<HeadResponse, FetchError> {
            Ok(HeadResponse {
                status: 200,
                headers: ResponseHeaders {
                    content_length: Some(self.data.len() as u64),
                    accept_ranges: true,
                    ..Default::default()
                },
            })
        }
    }

    fn data(n: usize) -> Vec<u8> {
        (0..n).map(|i| (i % 251) as u8).collect()
    }

    fn coordinator(service: FakeService, proxies: &[&str]) -> (Coordinator, Arc<FakeService>) {
        let service = Arc::new(service);
        let dir = StaticDirectory::new(proxies.iter().map(|p| ProxyEndpoint::new(*p)).collect());
        let c = Coordinator::new(
            service.clone() as Arc<dyn FetchService>,
            Arc::new(dir),
            CoordinatorOptions::default(),
        );
        (c, service)
    }

    #[test]
    fn downloads_and_reassembles_in_order() {
        let body = data(1000);
        let (c, svc) = coordinator(FakeService::new(body.clone()), &["A", "B", "C"]);
        let r = c.download("http://o/f", 4).unwrap();
        assert_eq!(r.bytes, body);
        assert_eq!(r.total_size, 1000);
        assert_eq!(r.chunk_count, 4);
        assert!(r.size_mismatch.is_none());
        assert_eq!(r.per_endpoint["A"], 250 + 250);
        assert_eq!(r.per_endpoint["B"], 250);
        assert_eq!(r.per_endpoint["C"], 250);
        assert_eq!(svc.seen.lock().unwrap().len(), 4);
    }

    #[test]
    fn throughput_matches_bytes_over_elapsed() {
        let (c, _) = coordinator(FakeService::new(data(4096)), &["A"]);
        let r = c.download("http://o/f", 8).unwrap();
        let m = r.metrics;
        assert!(m.bytes_per_sec >= 0.0);
        let secs = m.elapsed.as_secs_f64();
        if secs > 0.0 {
            let expected = m.bytes as f64 / secs;
            assert!((m.bytes_per_sec - expected).abs() <= expected * 1e-9);
        }
    }

    #[test]
    fn failed_chunk_fails_everything_and_writes_nothing() {
        let mut svc = FakeService::new(data(400));
        // Chunk i goes to proxy i % 4, so chunk 2 goes through "C".
        svc.failing = vec!["C".to_string()];
        let (c, svc) = coordinator(svc, &["A", "B", "C", "D"]);
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.bin");

        let err = c.download_to_path("http://o/f", 4, &out).unwrap_err();
        match err {
            DownloadError::ChunkFetchFailed { index, source } => {
                assert_eq!(index, 2);
                assert!(matches!(source, FetchError::Http(502)));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!out.exists());
        assert!(!output::temp_path(&out).exists());
        // Every chunk ran to completion; nothing was cancelled.
        assert_eq!(svc.seen.lock().unwrap().len(), 4);
    }

    #[test]
    fn lowest_failing_index_is_reported() {
        let mut svc = FakeService::new(data(600));
        svc.failing = vec!["B".to_string()];
        let (c, _) = coordinator(svc, &["A", "B"]);
        let err = c.download("http://o/f", 6).unwrap_err();
        assert!(matches!(err, DownloadError::ChunkFetchFailed { index: 1, .. }));
    }

    #[test]
    fn empty_directory_fails_before_fetching() {
        let (c, svc) = coordinator(FakeService::new(data(100)), &[]);
        assert!(matches!(
            c.download("http://o/f", 2),
            Err(DownloadError::NoProxiesAvailable)
        ));
        assert!(svc.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn too_many_workers_is_invalid_partition() {
        let (c, _) = coordinator(FakeService::new(data(3)), &["A"]);
        assert!(matches!(
            c.download("http://o/f", 4),
            Err(DownloadError::InvalidPartition {
                total_size: 3,
                worker_count: 4
            })
        ));
    }

    #[test]
    fn retry_recovers_a_dropped_chunk() {
        let svc = FakeService::new(data(300));
        svc.flaky.store(1, Ordering::SeqCst);
        let service = Arc::new(svc);
        let dir = StaticDirectory::new(vec![ProxyEndpoint::new("A")]);
        let options = CoordinatorOptions {
            retry: Some(RetryPolicy {
                max_attempts: 3,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(5),
            }),
            ..Default::default()
        };
        let c = Coordinator::new(service.clone() as Arc<dyn FetchService>, Arc::new(dir), options);
        let r = c.download("http://o/f", 3).unwrap();
        assert_eq!(r.bytes, data(300));
        // One failed attempt plus one request per chunk.
        assert_eq!(service.seen.lock().unwrap().len(), 4);
    }

    #[test]
    fn without_retry_a_dropped_chunk_is_fatal() {
        let svc = FakeService::new(data(300));
        svc.flaky.store(1, Ordering::SeqCst);
        let (c, _) = coordinator(svc, &["A"]);
        assert!(matches!(
            c.download("http://o/f", 3),
            Err(DownloadError::ChunkFetchFailed {
                source: FetchError::Closed,
                ..
            })
        ));
    }

    #[test]
    fn progress_reports_final_snapshot() {
        let (c, _) = coordinator(FakeService::new(data(800)), &["A", "B"]);
        let (tx, mut rx) = tokio::sync::mpsc::channel(64);
        let c = c.with_progress(tx);
        c.download("http://o/f", 4).unwrap();
        let mut last = None;
        while let Ok(s) = rx.try_recv() {
            last = Some(s);
        }
        let last = last.expect("at least the final snapshot");
        assert_eq!(last.bytes_done, 800);
        assert_eq!(last.chunks_done, 4);
        assert_eq!(last.chunk_count, 4);
    }
}
