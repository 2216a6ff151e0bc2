//! Proxy endpoint identifier.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::DirectoryError;

/// An HTTP proxy a chunk request is routed through, plus an optional transport-port hint.
///
/// The identifier is opaque to the orchestrator: it is cloned and compared, never
/// opened or closed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProxyEndpoint {
    /// Proxy URL, e.g. `http://127.0.0.1:4444`.
    pub url: String,
    /// Port to use instead of the one in `url` (router HTTP vs SOCKS port, etc.).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_hint: Option<u16>,
}

impl ProxyEndpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            port_hint: None,
        }
    }

    pub fn with_port_hint(mut self, port: u16) -> Self {
        self.port_hint = Some(port);
        self
    }

    /// Builds `http://host:port`.
    pub fn from_host_port(host: &str, port: u16) -> Self {
        Self::new(format!("http://{}:{}", host, port))
    }
}

impl fmt::Display for ProxyEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port_hint {
            Some(port) => write!(f, "{} [port {}]", self.url, port),
            None => f.write_str(&self.url),
        }
    }
}

/// Accepts `scheme://host:port` or a bare `host:port` (treated as `http://`).
impl FromStr for ProxyEndpoint {
    type Err = DirectoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let candidate = if s.contains("://") {
            s.to_string()
        } else {
            format!("http://{}", s)
        };
        let parsed =
            url::Url::parse(&candidate).map_err(|_| DirectoryError::InvalidEntry(s.to_string()))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| DirectoryError::InvalidEntry(s.to_string()))?;
        // `port()` hides a scheme-default port; curl would then fall back to 1080.
        let url = match parsed.port_or_known_default() {
            Some(port) => format!("{}://{}:{}", parsed.scheme(), host, port),
            None => format!("{}://{}", parsed.scheme(), host),
        };
        Ok(Self::new(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bare_host_port() {
        let e: ProxyEndpoint = "10.0.0.2:3128".parse().unwrap();
        assert_eq!(e.url, "http://10.0.0.2:3128");
        assert!(e.port_hint.is_none());
    }

    #[test]
    fn parse_url_keeps_scheme() {
        let e: ProxyEndpoint = "socks5h://127.0.0.1:4447".parse().unwrap();
        assert_eq!(e.url, "socks5h://127.0.0.1:4447");
    }

    #[test]
    fn parse_keeps_scheme_default_port() {
        let e: ProxyEndpoint = "http://10.0.0.1:80".parse().unwrap();
        assert_eq!(e.url, "http://10.0.0.1:80");
        let e: ProxyEndpoint = "10.0.0.1:80".parse().unwrap();
        assert_eq!(e.url, "http://10.0.0.1:80");
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("http://".parse::<ProxyEndpoint>().is_err());
    }

    #[test]
    fn display_includes_port_hint() {
        let e = ProxyEndpoint::new("http://127.0.0.1:4444").with_port_hint(4447);
        assert_eq!(e.to_string(), "http://127.0.0.1:4444 [port 4447]");
        assert_eq!(ProxyEndpoint::new("http://a:1").to_string(), "http://a:1");
    }
}
