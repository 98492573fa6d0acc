//! `iobroker-simple-api-mcp`: serve the ioBroker Simple-API as MCP tools over stdio.

mod config;
mod error;
mod server;
mod transport;

use anyhow::Context as _;
use clap::Parser as _;
use config::{Cli, LogFormat, Settings};
use iobroker_simple_api_tools::{HttpExecutor, SimpleApiClient, build_registry};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let settings = Settings::from_cli(&cli)?;
    info!(
        host = %iobroker_simple_api_tools::safety::redact_url(&settings.host),
        auth = settings.auth.kind(),
        timeout_secs = settings.timeout.map(|t| t.as_secs()),
        "starting iobroker-simple-api-mcp"
    );

    let client = reqwest::Client::builder()
        .build()
        .context("build HTTP client")?;
    let executor = HttpExecutor::new(client, settings.timeout);
    let api = Arc::new(SimpleApiClient::new(executor, settings.host, settings.auth));
    let registry = build_registry(api)?;

    server::run_stdio(registry).await?;
    Ok(())
}

/// Logs go to stderr; stdout carries the protocol.
fn init_tracing(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false);

    match cli.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}
