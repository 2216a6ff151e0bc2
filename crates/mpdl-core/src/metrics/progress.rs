//! Live progress for a parallel download (bytes done, ETA, rate).
//!
//! Chunk workers bump per-chunk atomic counters; a reporter thread samples them
//! on an interval and sends [`ProgressStats`] to the CLI with `try_send`, so a
//! slow consumer drops snapshots instead of stalling the download.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::mpsc as std_mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Snapshot of download progress (CLI-friendly).
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressStats {
    /// Bytes received so far across all chunks.
    pub bytes_done: u64,
    /// Total resource size in bytes.
    pub total_bytes: u64,
    /// Elapsed time since download start (seconds).
    pub elapsed_secs: f64,
    pub chunks_done: usize,
    pub chunk_count: usize,
}

impl ProgressStats {
    /// Total download rate in bytes per second (0 if elapsed is 0).
    pub fn bytes_per_sec(&self) -> f64 {
        if self.elapsed_secs <= 0.0 {
            return 0.0;
        }
        self.bytes_done as f64 / self.elapsed_secs
    }

    /// Estimated seconds remaining (None if rate is 0 and bytes remain).
    pub fn eta_secs(&self) -> Option<f64> {
        let remaining = self.total_bytes.saturating_sub(self.bytes_done);
        if remaining == 0 {
            return Some(0.0);
        }
        let rate = self.bytes_per_sec();
        if rate <= 0.0 {
            return None;
        }
        Some(remaining as f64 / rate)
    }

    /// Fraction complete in [0.0, 1.0].
    pub fn fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            return 1.0;
        }
        (self.bytes_done as f64 / self.total_bytes as f64).min(1.0)
    }
}

/// Shared per-chunk byte counters for one download.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    received: Arc<Vec<AtomicU64>>,
    done: Arc<AtomicUsize>,
    total_bytes: u64,
    start: Instant,
}

impl ProgressTracker {
    pub fn new(chunk_count: usize, total_bytes: u64, start: Instant) -> Self {
        Self {
            received: Arc::new((0..chunk_count).map(|_| AtomicU64::new(0)).collect()),
            done: Arc::new(AtomicUsize::new(0)),
            total_bytes,
            start,
        }
    }

    /// Counter handle for one chunk worker.
    pub fn handle(&self, index: usize) -> ChunkProgress {
        ChunkProgress {
            received: Arc::clone(&self.received),
            done: Arc::clone(&self.done),
            index,
        }
    }

    pub fn snapshot(&self) -> ProgressStats {
        ProgressStats {
            bytes_done: self.received.iter().map(|c| c.load(Ordering::Relaxed)).sum(),
            total_bytes: self.total_bytes,
            elapsed_secs: self.start.elapsed().as_secs_f64(),
            chunks_done: self.done.load(Ordering::Relaxed),
            chunk_count: self.received.len(),
        }
    }

    /// Starts a thread that sends a snapshot every `interval`, plus a final one
    /// when [`ProgressReporter::finish`] is called.
    pub fn spawn_reporter(
        &self,
        tx: tokio::sync::mpsc::Sender<ProgressStats>,
        interval: Duration,
    ) -> ProgressReporter {
        let (stop_tx, stop_rx) = std_mpsc::channel::<()>();
        let tracker = self.clone();
        let handle = thread::Builder::new()
            .name("mpdl-progress".to_string())
            .spawn(move || loop {
                match stop_rx.recv_timeout(interval) {
                    Err(std_mpsc::RecvTimeoutError::Timeout) => {
                        let _ = tx.try_send(tracker.snapshot());
                    }
                    _ => {
                        let _ = tx.try_send(tracker.snapshot());
                        break;
                    }
                }
            });
        let handle = match handle {
            Ok(h) => Some(h),
            Err(e) => {
                tracing::warn!("progress reporter not started: {}", e);
                None
            }
        };
        ProgressReporter {
            stop: Some(stop_tx),
            handle,
        }
    }
}

/// One chunk's view of the tracker.
#[derive(Debug, Clone)]
pub struct ChunkProgress {
    received: Arc<Vec<AtomicU64>>,
    done: Arc<AtomicUsize>,
    index: usize,
}

impl ChunkProgress {
    pub fn add(&self, bytes: u64) {
        self.received[self.index].fetch_add(bytes, Ordering::Relaxed);
    }

    /// Forget bytes from a failed attempt before retrying.
    pub fn reset(&self) {
        self.received[self.index].store(0, Ordering::Relaxed);
    }

    pub fn mark_done(&self) {
        self.done.fetch_add(1, Ordering::Relaxed);
    }
}

/// Running reporter thread. Stops (after a final snapshot) on `finish` or drop.
#[derive(Debug)]
pub struct ProgressReporter {
    stop: Option<std_mpsc::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ProgressReporter {
    pub fn finish(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}
