//! Error taxonomy for a download run.
//!
//! Every variant of [`DownloadError`] is fatal: the run stops before anything
//! is written to disk. A reassembled length that differs from the probed size
//! is not an error; it is reported as a [`SizeMismatch`] on the result.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use crate::directory::DirectoryError;
use crate::transport::FetchError;

/// Fatal failure of a parallel or sequential download.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// The proxy directory resolved to an empty list.
    #[error("no proxy endpoints available")]
    NoProxiesAvailable,

    /// The metadata probe returned no `Content-Length`, or zero.
    #[error("could not determine resource size")]
    SizeUnknown,

    /// Worker count is incompatible with the resource size.
    #[error("cannot split {total_size} bytes into {worker_count} chunks")]
    InvalidPartition { total_size: u64, worker_count: u32 },

    /// One chunk fetch failed; the whole download is abandoned.
    #[error("chunk {index} failed")]
    ChunkFetchFailed {
        index: usize,
        #[source]
        source: FetchError,
    },

    /// A chunk worker panicked before reporting its outcome.
    #[error("worker for chunk {index} panicked")]
    WorkerPanicked { index: usize },

    /// Both the HEAD probe and the streaming fallback failed at the transport level.
    #[error("size probe failed")]
    Probe(#[source] FetchError),

    /// The single-stream download failed.
    #[error("single-stream download failed")]
    Sequential(#[source] FetchError),

    #[error("proxy directory unavailable")]
    Directory(#[from] DirectoryError),

    #[error("writing {}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Reassembled length differs from the probed size. Logged and recorded, never fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SizeMismatch {
    pub expected: u64,
    pub actual: u64,
}

impl fmt::Display for SizeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "downloaded {} bytes, expected {}",
            self.actual, self.expected
        )
    }
}
