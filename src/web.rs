#![cfg(not(tarpaulin_include))]

use clap::Parser;
use thinkfast::app;
use thinkfast::config::Config;

/// Main entry point for the autocorrect web server
///
/// Logging defaults to `info` and can be changed through `RUST_LOG`.
/// Settings come from command line flags or their `THINKFAST_*` environment
/// variables (see `--help`).
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();
    log::info!("Starting ThinkFast v{}", env!("CARGO_PKG_VERSION"));

    app::run(config).await
}
