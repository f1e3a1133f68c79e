//! Chatgate - quota-gated text generation gateway
//!
//! CLI entry point for the Chatgate server.

#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod api;
mod cli;
mod middleware;
mod server;

const DEFAULT_LOG_FILTER: &str = "chatgate=info,chatgate_core=info,chatgate_llm=info,tower_http=info";

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let json = std::env::var("CHATGATE_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let cli = cli::Cli::parse();

    info!("Starting Chatgate v{}", env!("CARGO_PKG_VERSION"));
    if !std::path::Path::new(".env").exists() {
        warn!(".env file not found, using configuration files and environment only");
    }

    cli::run(cli).await
}
