//! Directory scraped from a proxy listing page (HTML or plain text).

use std::collections::{HashMap, HashSet};
use std::net::Ipv4Addr;
use std::sync::Arc;

use super::{DirectoryError, ProxyDirectory, ProxyEndpoint};
use crate::transport::{FetchService, StreamRequest};

/// Port assumed for listing entries that name a host without one.
pub const DEFAULT_OUTPROXY_PORT: u16 = 4444;

const LISTING_CHUNK_SIZE: usize = 16 * 1024;

/// Fetches a listing page through the transport's default route on every
/// `list_proxies` call and extracts proxy addresses from it.
pub struct ListingDirectory {
    listing_url: String,
    service: Arc<dyn FetchService>,
}

impl ListingDirectory {
    pub fn new(listing_url: String, service: Arc<dyn FetchService>) -> Self {
        Self {
            listing_url,
            service,
        }
    }
}

impl ProxyDirectory for ListingDirectory {
    fn list_proxies(&self) -> Result<Vec<ProxyEndpoint>, DirectoryError> {
        tracing::info!(url = %self.listing_url, "fetching proxy listing");
        let headers = HashMap::new();
        let response = self.service.fetch_streaming(&StreamRequest {
            url: &self.listing_url,
            method: "GET",
            headers: &headers,
            chunk_size: LISTING_CHUNK_SIZE,
        })?;
        if response.status != 200 {
            return Err(DirectoryError::Status(response.status));
        }
        let body = response.body.into_buffered()?;
        let text = String::from_utf8_lossy(&body);
        let proxies = parse_listing(&text);
        if proxies.is_empty() {
            tracing::warn!("no proxies found in listing ({} bytes)", body.len());
        } else {
            tracing::info!("parsed {} unique proxies from listing", proxies.len());
        }
        Ok(proxies)
    }
}

/// Extracts proxy endpoints from listing text, in order of first appearance,
/// de-duplicated by `host:port`.
///
/// Recognised entries:
/// - `http://host[:port]` / `https://host[:port]` URLs (in text or `href` attributes)
/// - `a.b.c.d:port` IPv4 pairs
/// - `name.i2p[:port]` hosts
///
/// Entries without a port get [`DEFAULT_OUTPROXY_PORT`].
pub fn parse_listing(text: &str) -> Vec<ProxyEndpoint> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    let tokens = text
        .split(|c: char| c.is_whitespace() || matches!(c, '<' | '>' | '"' | '\'' | '(' | ')' | ',' | ';'))
        .filter(|t| !t.is_empty());

    for token in tokens {
        let token = token.strip_prefix("href=").unwrap_or(token);
        let token = token.trim_end_matches(['.', '/']);
        let Some((host, port)) = listing_entry(token) else {
            continue;
        };
        if seen.insert(format!("{}:{}", host, port)) {
            tracing::debug!("found proxy {}:{}", host, port);
            out.push(ProxyEndpoint::from_host_port(&host, port));
        }
    }

    out
}

fn listing_entry(token: &str) -> Option<(String, u16)> {
    if token.starts_with("http://") || token.starts_with("https://") {
        let url = url::Url::parse(token).ok()?;
        let host = url.host_str()?.to_string();
        let port = explicit_port(token).unwrap_or(DEFAULT_OUTPROXY_PORT);
        return Some((host, port));
    }

    let (host, port) = match token.rsplit_once(':') {
        Some((host, port)) => (host, Some(port.parse::<u16>().ok().filter(|p| *p > 0)?)),
        None => (token, None),
    };
    if host.parse::<Ipv4Addr>().is_ok() {
        return port.map(|p| (host.to_string(), p));
    }
    if is_i2p_host(host) {
        return Some((host.to_ascii_lowercase(), port.unwrap_or(DEFAULT_OUTPROXY_PORT)));
    }
    None
}

/// Port written in the URL's authority. `Url::port` hides scheme-default ports.
fn explicit_port(url: &str) -> Option<u16> {
    let rest = url.split_once("://")?.1;
    let authority = rest.split('/').next()?;
    authority.rsplit_once(':')?.1.parse().ok()
}

fn is_i2p_host(host: &str) -> bool {
    let Some(name) = host.strip_suffix(".i2p") else {
        return false;
    };
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
}
