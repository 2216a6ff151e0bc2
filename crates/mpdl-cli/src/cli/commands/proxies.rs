//! `mpdl proxies` – show the resolved proxy directory.

use anyhow::{Context, Result};
use mpdl_core::config::MpdlConfig;

use super::session::Session;
use crate::cli::ProxiesArgs;

pub async fn run_proxies(cfg: &MpdlConfig, args: ProxiesArgs) -> Result<()> {
    let session = Session::new(cfg, &args.proxy)?;
    let directory = session.directory;
    let endpoints = tokio::task::spawn_blocking(move || directory.list_proxies())
        .await
        .context("directory task join")?
        .context("list proxies")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&endpoints)?);
        return Ok(());
    }
    if endpoints.is_empty() {
        println!("No proxies available.");
        return Ok(());
    }
    for (i, e) in endpoints.iter().enumerate() {
        println!("  {:>3}  {}", i, e);
    }
    Ok(())
}
