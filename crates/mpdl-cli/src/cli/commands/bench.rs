//! `mpdl bench <url>` – single-stream baseline vs parallel worker counts.

use anyhow::{Context, Result};
use mpdl_core::bench::{self, BenchResult, DEFAULT_WORKER_COUNTS};
use mpdl_core::config::MpdlConfig;

use super::session::Session;
use crate::cli::BenchArgs;

fn mode(r: &BenchResult) -> String {
    match r.workers {
        Some(w) => format!("{} workers", w),
        None => "single".to_string(),
    }
}

fn print_bench_results(results: &[BenchResult]) {
    println!(
        "  {:>10}  {:>12}  {:>8}  {:>8}  {:>8}",
        "Mode", "Bytes", "Time(s)", "MB/s", "Speedup"
    );
    println!(
        "  {}  {}  {}  {}  {}",
        "----------", "------------", "--------", "--------", "--------"
    );
    for r in results {
        match &r.error {
            None => {
                let speedup = bench::speedup(results, r)
                    .map(|s| format!("{:.2}x", s))
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "  {:>10}  {:>12}  {:>8.2}  {:>8.2}  {:>8}",
                    mode(r),
                    r.bytes_downloaded,
                    r.elapsed_secs,
                    r.throughput_mb_s,
                    speedup
                );
            }
            Some(e) => println!("  {:>10}  failed: {}", mode(r), e),
        }
    }
}

pub async fn run_bench(cfg: &MpdlConfig, args: BenchArgs) -> Result<()> {
    let worker_counts = if args.workers.is_empty() {
        DEFAULT_WORKER_COUNTS.to_vec()
    } else {
        args.workers.clone()
    };
    let coordinator = Session::new(cfg, &args.proxy)?
        .with_retry(args.retry)
        .coordinator();

    let results = tokio::task::spawn_blocking({
        let url = args.url.clone();
        move || bench::run_bench(&coordinator, &url, &worker_counts)
    })
    .await
    .context("bench task join")??;

    let recommended = bench::recommend_worker_count(&results);
    if args.json {
        let out = serde_json::json!({
            "url": args.url,
            "runs": results,
            "recommended_workers": recommended,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        print_bench_results(&results);
        match recommended {
            Some(w) => println!("Recommended worker count: {}", w),
            None => println!("No parallel run succeeded."),
        }
    }
    Ok(())
}
