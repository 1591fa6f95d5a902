#![cfg(not(tarpaulin_include))]

use clap::Parser;
use sweeper::app;
use sweeper::config::Config;

/// Main entry point for the web application
///
/// Reads the server settings from the command line and environment,
/// sets up logging and serves both the Data Sweeper and the Post Board.
///
/// # Returns
/// * `Result<(), Box<dyn std::error::Error>>` - Success or error object
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();
    app::run(config).await
}
