//! `mpdl single <url>` – one unranged GET, the comparison baseline.

use anyhow::{Context, Result};
use mpdl_core::config::MpdlConfig;
use mpdl_core::single::SingleStream;
use mpdl_core::transport::CurlTransport;
use mpdl_core::{checksum, output};
use std::collections::HashMap;
use std::sync::Arc;

use super::report::{output_path, print_report};
use crate::cli::SingleArgs;

pub async fn run_single(cfg: &MpdlConfig, args: SingleArgs) -> Result<()> {
    let mut transport = cfg.transport_options();
    if let Some(via) = &args.via {
        transport.default_proxy = Some(via.clone());
    }
    let single = SingleStream::new(
        Arc::new(CurlTransport::new(transport)),
        HashMap::new(),
        cfg.transport.stream_chunk_size,
    );
    let path = output_path(&args.url, args.output.clone());

    let (result, digest) = tokio::task::spawn_blocking({
        let url = args.url.clone();
        let path = path.clone();
        let sha256 = args.sha256;
        move || -> Result<_> {
            let result = single.download_sequential(&url)?;
            output::write_output(&path, &result.bytes)
                .with_context(|| format!("write {}", path.display()))?;
            let digest = if sha256 {
                Some(checksum::sha256_file(&path)?)
            } else {
                None
            };
            Ok((result, digest))
        }
    })
    .await
    .context("download task join")??;

    let mut report = result.report(&args.url);
    report.output = Some(path);
    report.sha256 = digest;
    print_report(&report, args.json)
}
