//! docchat server - Main entry point.

use anyhow::Result;
use docchat_common::config::Config;
use docchat_common::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    // Load and validate configuration
    let config = Config::from_env()?;

    // Initialize logging
    init_logging(&config.log_level, &config.log_format);

    tracing::info!("docchat server v{}", env!("CARGO_PKG_VERSION"));

    // Start the HTTP server
    docchat_server::start_server(&config).await
}
