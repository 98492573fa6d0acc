//! Command line and environment configuration.
//!
//! Every option can be given as `--name=value` or through its environment variable; the
//! command line wins.

use crate::error::{Result, ServerError};
use clap::{Parser, ValueEnum};
use iobroker_simple_api_tools::AuthStrategy;
use std::time::Duration;
use tracing::warn;
use url::Url;

pub const DEFAULT_HOST: &str = "http://localhost:8082";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "iobroker-simple-api-mcp",
    version,
    about = "MCP server exposing the ioBroker Simple-API over stdio"
)]
pub struct Cli {
    /// Base URL of the Simple-API adapter.
    #[arg(long, env = "IOB_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// `query`, `basic` or `bearer`. Anything else disables authentication.
    #[arg(long = "authType", env = "IOB_AUTH_TYPE")]
    pub auth_type: Option<String>,

    #[arg(long, env = "IOB_USER")]
    pub user: Option<String>,

    #[arg(long, env = "IOB_PASS", hide_env_values = true)]
    pub pass: Option<String>,

    #[arg(long, env = "IOB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Per-request timeout in seconds; 0 waits indefinitely.
    #[arg(long, env = "IOB_TIMEOUT", default_value_t = 30)]
    pub timeout: u64,

    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long, default_value = "info")]
    pub log_level: String,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// Resolved runtime settings, built once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub host: Url,
    pub auth: AuthStrategy,
    pub timeout: Option<Duration>,
}

impl Settings {
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] if the host is not an absolute `http(s)` URL.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let host = parse_host(&cli.host)?;

        let auth = AuthStrategy::resolve(
            cli.auth_type.as_deref(),
            cli.user.as_deref(),
            cli.pass.as_deref(),
            cli.token.as_deref(),
        );
        if let Some(requested) = cli.auth_type.as_deref().filter(|t| !t.is_empty())
            && requested != auth.kind()
        {
            warn!(
                requested,
                "authType is unknown or its credentials are missing; continuing without authentication"
            );
        }

        let timeout = (cli.timeout > 0).then(|| Duration::from_secs(cli.timeout));

        Ok(Self {
            host,
            auth,
            timeout,
        })
    }
}

fn parse_host(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ServerError::Config(format!("invalid host '{raw}': {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ServerError::Config(format!(
            "invalid host '{raw}': scheme must be http or https"
        )));
    }
    // Operation paths are appended to the host, so nothing may follow the path.
    if url.query().is_some() || url.fragment().is_some() {
        return Err(ServerError::Config(format!(
            "invalid host '{raw}': query strings and fragments are not allowed"
        )));
    }
    Ok(url)
}
