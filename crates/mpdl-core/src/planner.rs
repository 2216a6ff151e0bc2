//! Chunk planning: split a resource into contiguous inclusive byte ranges.

use crate::error::DownloadError;

/// One planned byte range `[start, end]` (both ends inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRange {
    /// Ordinal in `0..worker_count`; reassembly follows this order.
    pub index: usize,
    /// First byte (inclusive).
    pub start: u64,
    /// Last byte (inclusive).
    pub end: u64,
}

impl ChunkRange {
    /// Number of bytes in this range.
    pub fn byte_len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// HTTP Range header value: `bytes=start-end`.
    pub fn range_header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

/// Splits `[0, total_size)` into `worker_count` ranges of `total_size / worker_count`
/// bytes each; the last range absorbs the remainder of the integer division.
///
/// Fails with `InvalidPartition` when `total_size` is 0, `worker_count` is 0, or
/// there would be more workers than bytes.
pub fn plan_chunks(total_size: u64, worker_count: u32) -> Result<Vec<ChunkRange>, DownloadError> {
    if total_size == 0 || worker_count == 0 || u64::from(worker_count) > total_size {
        return Err(DownloadError::InvalidPartition {
            total_size,
            worker_count,
        });
    }

    let count = u64::from(worker_count);
    let base = total_size / count;

    let chunks = (0..count)
        .map(|i| {
            let start = i * base;
            let end = if i == count - 1 {
                total_size - 1
            } else {
                (i + 1) * base - 1
            };
            ChunkRange {
                index: i as usize,
                start,
                end,
            }
        })
        .collect();

    Ok(chunks)
}
