//! nftmigrate CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use nftmigrate::cli::{self, Cli};
use nftmigrate::infrastructure::config::ConfigLoader;
use nftmigrate::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env is fine.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let json = cli.json;

    let config = match ConfigLoader::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => return cli::handle_error(&err, json),
    };

    let _logger = match LoggerImpl::init(&LogConfig::from(&config.logging)) {
        Ok(logger) => Some(logger),
        Err(err) => {
            eprintln!("warning: logging disabled: {err:#}");
            None
        }
    };

    match cli::commands::dispatch(cli, &config).await {
        Ok(code) => code,
        Err(err) => cli::handle_error(&err, json),
    }
}
