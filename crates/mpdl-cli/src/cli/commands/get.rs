//! `mpdl get <url>` – parallel download through the proxy pool.

use anyhow::{Context, Result};
use mpdl_core::checksum;
use mpdl_core::config::MpdlConfig;

use super::progress;
use super::report::{output_path, print_report};
use super::session::Session;
use crate::cli::GetArgs;

pub async fn run_get(cfg: &MpdlConfig, args: GetArgs) -> Result<()> {
    let workers = args.workers.unwrap_or(cfg.workers);
    let path = output_path(&args.url, args.output.clone());
    let session = Session::new(cfg, &args.proxy)?.with_retry(args.retry);
    let mut coordinator = session.coordinator();

    let printer = if args.no_progress || args.json {
        None
    } else {
        let (tx, handle) = progress::spawn_printer();
        coordinator = coordinator.with_progress(tx);
        Some(handle)
    };

    let outcome = tokio::task::spawn_blocking({
        let url = args.url.clone();
        let path = path.clone();
        let sha256 = args.sha256;
        move || -> Result<_> {
            let result = coordinator.download_to_path(&url, workers, &path)?;
            let digest = if sha256 {
                Some(checksum::sha256_file(&path)?)
            } else {
                None
            };
            Ok((result, digest))
        }
    })
    .await
    .context("download task join")?;

    if let Some(handle) = printer {
        let _ = handle.await;
    }
    let (result, digest) = outcome?;

    let mut report = result.report(&args.url);
    report.output = Some(path);
    report.sha256 = digest;
    print_report(&report, args.json)
}
