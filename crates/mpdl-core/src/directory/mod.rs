//! Proxy directory: resolves the set of currently usable proxy endpoints.
//!
//! The coordinator only depends on the [`ProxyDirectory`] trait. Two sources
//! are provided: a fixed list (config file or `--proxy` flags) and a listing
//! page fetched through the transport and scraped for proxy addresses.

mod endpoint;
mod listing;

use std::sync::Arc;

use crate::config::MpdlConfig;
use crate::transport::{FetchError, FetchService};

pub use endpoint::ProxyEndpoint;
pub use listing::{parse_listing, ListingDirectory, DEFAULT_OUTPROXY_PORT};

/// Failure to resolve the directory.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("fetching proxy listing")]
    Fetch(#[from] FetchError),
    #[error("proxy listing returned HTTP {0}")]
    Status(u32),
    #[error("invalid proxy entry: {0:?}")]
    InvalidEntry(String),
}

/// Source of proxy endpoints. May return an empty list; callers decide whether
/// that is fatal.
pub trait ProxyDirectory: Send + Sync {
    fn list_proxies(&self) -> Result<Vec<ProxyEndpoint>, DirectoryError>;
}

/// Directory backed by a fixed, ordered list.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    endpoints: Vec<ProxyEndpoint>,
}

impl StaticDirectory {
    pub fn new(endpoints: Vec<ProxyEndpoint>) -> Self {
        Self { endpoints }
    }

    /// Parses each entry with [`ProxyEndpoint::from_str`](std::str::FromStr).
    pub fn parse<S: AsRef<str>>(entries: &[S]) -> Result<Self, DirectoryError> {
        let endpoints = entries
            .iter()
            .map(|s| s.as_ref().parse())
            .collect::<Result<Vec<ProxyEndpoint>, _>>()?;
        Ok(Self::new(endpoints))
    }
}

impl ProxyDirectory for StaticDirectory {
    fn list_proxies(&self) -> Result<Vec<ProxyEndpoint>, DirectoryError> {
        Ok(self.endpoints.clone())
    }
}

/// Picks the directory described by the config: explicit `proxies` win over
/// `proxy_listing_url`; with neither, the directory is empty.
pub fn from_config(
    cfg: &MpdlConfig,
    service: Arc<dyn FetchService>,
) -> Result<Arc<dyn ProxyDirectory>, DirectoryError> {
    if !cfg.proxies.is_empty() {
        return Ok(Arc::new(StaticDirectory::parse(&cfg.proxies)?));
    }
    if let Some(listing_url) = &cfg.proxy_listing_url {
        return Ok(Arc::new(ListingDirectory::new(listing_url.clone(), service)));
    }
    tracing::warn!("no proxies or proxy_listing_url configured");
    Ok(Arc::new(StaticDirectory::default()))
}
