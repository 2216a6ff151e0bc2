//! CLI command handlers, one file per subcommand.

mod bench;
mod get;
mod progress;
mod proxies;
mod report;
mod session;
mod single;

pub use bench::run_bench;
pub use get::run_get;
pub use proxies::run_proxies;
pub use single::run_single;
