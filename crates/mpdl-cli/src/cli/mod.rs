//! CLI for the mpdl multi-proxy downloader.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use mpdl_core::config;
use std::path::PathBuf;

use commands::{run_bench, run_get, run_proxies, run_single};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "mpdl")]
#[command(about = "mpdl: parallel range downloads through a pool of HTTP proxies", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.config/mpdl/config.toml).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download a URL in parallel chunks, one proxy per chunk.
    Get(GetArgs),

    /// Download a URL with one unranged request (baseline).
    Single(SingleArgs),

    /// Compare the single-stream baseline with parallel runs.
    Bench(BenchArgs),

    /// List the proxies the directory resolves to.
    Proxies(ProxiesArgs),
}

/// Where proxies come from and how requests are routed. Overrides the config file.
#[derive(Debug, Clone, Default, Args)]
pub struct ProxyArgs {
    /// Proxy endpoint (`host:port` or URL). Repeatable; replaces the configured list.
    #[arg(long = "proxy", value_name = "URL")]
    pub proxies: Vec<String>,

    /// Scrape proxies from this listing page instead of a fixed list.
    #[arg(long, value_name = "URL")]
    pub listing_url: Option<String>,

    /// Proxy for the size probe, single-stream GETs and the listing (default: direct).
    #[arg(long, value_name = "URL")]
    pub via: Option<String>,

    /// Transport port rotated over chunks. Repeatable.
    #[arg(long = "port-hint", value_name = "PORT")]
    pub port_hints: Vec<u16>,

    /// Extra request header, `Name: value`. Repeatable.
    #[arg(short = 'H', long = "header", value_name = "HEADER")]
    pub headers: Vec<String>,
}

#[derive(Debug, Clone, Args)]
pub struct GetArgs {
    /// HTTP/HTTPS URL to download.
    pub url: String,

    /// Number of chunks (default: `workers` from the config).
    #[arg(short = 'w', long, value_name = "N")]
    pub workers: Option<u32>,

    /// Output path (default: last URL path segment in the current directory).
    #[arg(short = 'o', long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub proxy: ProxyArgs,

    /// Attempts per chunk, including the first (default: config `[retry]`, else 1).
    #[arg(long, value_name = "N")]
    pub retry: Option<u32>,

    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,

    /// Print the SHA-256 of the written file.
    #[arg(long)]
    pub sha256: bool,

    /// Do not print live progress.
    #[arg(long)]
    pub no_progress: bool,
}

#[derive(Debug, Clone, Args)]
pub struct SingleArgs {
    /// HTTP/HTTPS URL to download.
    pub url: String,

    #[arg(short = 'o', long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Proxy for the request (default: config `default_proxy`, else direct).
    #[arg(long, value_name = "URL")]
    pub via: Option<String>,

    #[arg(long)]
    pub json: bool,

    #[arg(long)]
    pub sha256: bool,
}

#[derive(Debug, Clone, Args)]
pub struct BenchArgs {
    /// HTTP/HTTPS URL to benchmark.
    pub url: String,

    /// Worker counts to try, comma separated.
    #[arg(short = 'w', long, value_delimiter = ',', value_name = "N,N,..")]
    pub workers: Vec<u32>,

    #[command(flatten)]
    pub proxy: ProxyArgs,

    #[arg(long, value_name = "N")]
    pub retry: Option<u32>,

    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Args)]
pub struct ProxiesArgs {
    #[command(flatten)]
    pub proxy: ProxyArgs,

    #[arg(long)]
    pub json: bool,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = match &cli.config {
            Some(path) => config::load_or_init_at(path)?,
            None => config::load_or_init()?,
        };
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Get(args) => run_get(&cfg, args).await?,
            CliCommand::Single(args) => run_single(&cfg, args).await?,
            CliCommand::Bench(args) => run_bench(&cfg, args).await?,
            CliCommand::Proxies(args) => run_proxies(&cfg, args).await?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
