//! Parallel range downloads fanned out over a pool of HTTP proxies.

pub mod config;
pub mod logging;

pub mod assign;
pub mod bench;
pub mod checksum;
pub mod coordinator;
pub mod directory;
pub mod error;
pub mod fetcher;
pub mod metrics;
pub mod output;
pub mod planner;
pub mod retry;
pub mod single;
pub mod transport;

pub use coordinator::{Coordinator, CoordinatorOptions, DownloadReport, DownloadResult};
pub use directory::{ProxyDirectory, ProxyEndpoint};
pub use error::{DownloadError, SizeMismatch};
pub use transport::{CurlTransport, FetchError, FetchService};
