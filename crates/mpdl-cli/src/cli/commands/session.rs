//! Builds the transport, directory and coordinator options from config plus flags.

use anyhow::{Context, Result};
use mpdl_core::config::MpdlConfig;
use mpdl_core::coordinator::{Coordinator, CoordinatorOptions};
use mpdl_core::directory::{self, ProxyDirectory};
use mpdl_core::retry::RetryPolicy;
use mpdl_core::transport::{CurlTransport, FetchService};
use std::collections::HashMap;
use std::sync::Arc;

use crate::cli::ProxyArgs;

pub(crate) struct Session {
    pub service: Arc<dyn FetchService>,
    pub directory: Arc<dyn ProxyDirectory>,
    pub options: CoordinatorOptions,
}

impl Session {
    pub fn new(cfg: &MpdlConfig, args: &ProxyArgs) -> Result<Self> {
        let cfg = apply_overrides(cfg, args);
        let service: Arc<dyn FetchService> = Arc::new(CurlTransport::new(cfg.transport_options()));
        let directory = directory::from_config(&cfg, Arc::clone(&service))
            .context("resolve proxy directory")?;
        let mut options = cfg.coordinator_options();
        options.headers = parse_headers(&args.headers)?;
        Ok(Self {
            service,
            directory,
            options,
        })
    }

    /// `--retry N` replaces the configured retry policy.
    pub fn with_retry(mut self, attempts: Option<u32>) -> Self {
        if let Some(n) = attempts {
            self.options.retry = Some(RetryPolicy::with_attempts(n));
        }
        self
    }

    pub fn coordinator(self) -> Coordinator {
        Coordinator::new(self.service, self.directory, self.options)
    }
}

/// Flags win over the config file. `--listing-url` alone drops the configured
/// static list so the listing is actually used.
pub(crate) fn apply_overrides(cfg: &MpdlConfig, args: &ProxyArgs) -> MpdlConfig {
    let mut cfg = cfg.clone();
    if !args.proxies.is_empty() {
        cfg.proxies = args.proxies.clone();
    }
    if let Some(url) = &args.listing_url {
        cfg.proxy_listing_url = Some(url.clone());
        if args.proxies.is_empty() {
            cfg.proxies.clear();
        }
    }
    if let Some(via) = &args.via {
        cfg.default_proxy = Some(via.clone());
    }
    if !args.port_hints.is_empty() {
        cfg.port_hints = args.port_hints.clone();
    }
    cfg
}

/// Parses `Name: value` header flags.
pub(crate) fn parse_headers(raw: &[String]) -> Result<HashMap<String, String>> {
    let mut headers = HashMap::with_capacity(raw.len());
    for h in raw {
        let Some((name, value)) = h.split_once(':') else {
            anyhow::bail!("invalid header {:?} (expected `Name: value`)", h);
        };
        let name = name.trim();
        if name.is_empty() {
            anyhow::bail!("invalid header {:?} (empty name)", h);
        }
        headers.insert(name.to_string(), value.trim().to_string());
    }
    Ok(headers)
}
