//! Live progress line on stderr, fed by the coordinator's snapshot channel.

use mpdl_core::metrics::ProgressStats;
use tokio::sync::mpsc::{self, Receiver};
use tokio::task::JoinHandle;

/// Spawns the printer task and returns the sender to hand to the coordinator.
/// The task ends once every sender is dropped.
pub(crate) fn spawn_printer() -> (mpsc::Sender<ProgressStats>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel::<ProgressStats>(16);
    (tx, tokio::spawn(print_progress(rx)))
}

async fn print_progress(mut rx: Receiver<ProgressStats>) {
    let mut printed = false;
    while let Some(stats) = rx.recv().await {
        eprint!("\r{}", progress_line(&stats));
        printed = true;
    }
    if printed {
        eprintln!();
    }
}

pub(crate) fn progress_line(stats: &ProgressStats) -> String {
    let done_mib = stats.bytes_done as f64 / 1_048_576.0;
    let total_mib = stats.total_bytes as f64 / 1_048_576.0;
    let eta = stats
        .eta_secs()
        .map(|s| format!("{:.0}s", s))
        .unwrap_or_else(|| "?".to_string());
    format!(
        "  {:.1} / {:.1} MiB ({:.1}%)  {:.2} MB/s  chunks {}/{}  ETA {}  ",
        done_mib,
        total_mib,
        stats.fraction() * 100.0,
        stats.bytes_per_sec() / 1_000_000.0,
        stats.chunks_done,
        stats.chunk_count,
        eta
    )
}
