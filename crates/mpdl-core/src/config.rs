//! Configuration loaded from `~/.config/mpdl/config.toml`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::coordinator::CoordinatorOptions;
use crate::retry::RetryPolicy;
use crate::single::DEFAULT_STREAM_CHUNK_SIZE;
use crate::transport::TransportOptions;

/// Retry policy parameters (optional `[retry]` section). Absent means every
/// chunk gets exactly one attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per chunk (including the first).
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff (e.g. 0.25 = 250ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 0.25,
            max_delay_secs: 30,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            base_delay: Duration::from_secs_f64(self.base_delay_secs.max(0.0)),
            max_delay: Duration::from_secs(self.max_delay_secs),
        }
    }
}

/// libcurl timeouts and buffers (`[transport]` section).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub connect_timeout_secs: u64,
    /// Abort a transfer slower than `low_speed_limit` bytes/s for `low_speed_time_secs`.
    pub low_speed_limit: u32,
    pub low_speed_time_secs: u64,
    pub timeout_secs: u64,
    /// Receive buffer for ranged GETs.
    pub buffer_size: usize,
    /// Streamed buffer size for unranged GETs (size probe, single-stream, listing).
    pub stream_chunk_size: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
            low_speed_limit: 1024,
            low_speed_time_secs: 60,
            timeout_secs: 3600,
            buffer_size: 8192,
            stream_chunk_size: DEFAULT_STREAM_CHUNK_SIZE,
        }
    }
}

/// Global configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MpdlConfig {
    /// Default number of chunks (one worker and one proxy slot each).
    pub workers: u32,
    /// Fixed proxy list (`host:port` or URLs). Takes precedence over the listing.
    pub proxies: Vec<String>,
    /// Page scraped for proxy addresses when `proxies` is empty.
    pub proxy_listing_url: Option<String>,
    /// Proxy for unranged requests (probe, single-stream, listing). None = direct.
    pub default_proxy: Option<String>,
    /// Transport ports rotated over chunks (e.g. `[4444, 4447]`).
    pub port_hints: Vec<u16>,
    pub progress_interval_ms: u64,
    pub transport: TransportConfig,
    pub retry: Option<RetryConfig>,
}

impl Default for MpdlConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            proxies: Vec::new(),
            proxy_listing_url: None,
            default_proxy: None,
            port_hints: Vec::new(),
            progress_interval_ms: 500,
            transport: TransportConfig::default(),
            retry: None,
        }
    }
}

impl MpdlConfig {
    pub fn transport_options(&self) -> TransportOptions {
        let t = &self.transport;
        TransportOptions {
            default_proxy: self.default_proxy.clone(),
            connect_timeout: Duration::from_secs(t.connect_timeout_secs),
            low_speed_limit: t.low_speed_limit,
            low_speed_time: Duration::from_secs(t.low_speed_time_secs),
            timeout: Duration::from_secs(t.timeout_secs),
            buffer_size: t.buffer_size,
        }
    }

    pub fn coordinator_options(&self) -> CoordinatorOptions {
        CoordinatorOptions {
            retry: self.retry.as_ref().map(RetryConfig::policy),
            port_hints: self.port_hints.clone(),
            progress_interval: Duration::from_millis(self.progress_interval_ms.max(1)),
            chunk_size: self.transport.stream_chunk_size,
            ..CoordinatorOptions::default()
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("mpdl")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<MpdlConfig> {
    load_or_init_at(&config_path()?)
}

/// Like [`load_or_init`] with an explicit path (`--config`).
pub fn load_or_init_at(path: &Path) -> Result<MpdlConfig> {
    if !path.exists() {
        let default_cfg = MpdlConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml).with_context(|| format!("write {}", path.display()))?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: MpdlConfig =
        toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = MpdlConfig::default();
        assert_eq!(cfg.workers, 4);
        assert!(cfg.proxies.is_empty());
        assert!(cfg.retry.is_none());
        assert_eq!(cfg.coordinator_options().retry, None);
    }

    #[test]
    fn config_toml_roundtrip() {
        let mut cfg = MpdlConfig::default();
        cfg.proxies = vec!["127.0.0.1:4444".to_string()];
        cfg.port_hints = vec![4444, 4447];
        cfg.retry = Some(RetryConfig::default());
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: MpdlConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn partial_file_uses_defaults() {
        let toml = r#"
            workers = 8
            proxy_listing_url = "http://outproxies.example/list.html"
            default_proxy = "http://127.0.0.1:4444"

            [transport]
            connect_timeout_secs = 90
        "#;
        let cfg: MpdlConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.workers, 8);
        assert_eq!(cfg.transport.connect_timeout_secs, 90);
        assert_eq!(cfg.transport.timeout_secs, 3600);
        assert_eq!(cfg.progress_interval_ms, 500);

        let t = cfg.transport_options();
        assert_eq!(t.connect_timeout, Duration::from_secs(90));
        assert_eq!(t.default_proxy.as_deref(), Some("http://127.0.0.1:4444"));
    }

    #[test]
    fn retry_section_builds_policy() {
        let toml = r#"
            [retry]
            max_attempts = 4
            base_delay_secs = 0.5
            max_delay_secs = 10
        "#;
        let cfg: MpdlConfig = toml::from_str(toml).unwrap();
        let policy = cfg.coordinator_options().retry.unwrap();
        assert_eq!(policy.max_attempts, 4);
        assert_eq!(policy.base_delay, Duration::from_millis(500));
        assert_eq!(policy.max_delay, Duration::from_secs(10));
    }

    #[test]
    fn load_or_init_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mpdl").join("config.toml");
        let cfg = load_or_init_at(&path).unwrap();
        assert_eq!(cfg, MpdlConfig::default());
        assert!(path.exists());
        assert_eq!(load_or_init_at(&path).unwrap(), cfg);
    }
}
