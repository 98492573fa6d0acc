//! Error types for the stdio server.

use iobroker_simple_api_tools::ToolsError;
use rmcp::service::ServerInitializeError;
use thiserror::Error;

/// Main error type for the server binary.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Invalid command line or environment (bad host URL, HTTP client construction).
    #[error("Configuration error: {0}")]
    Config(String),

    /// The client did not complete the `initialize` handshake.
    #[error("MCP handshake failed: {0}")]
    Handshake(#[from] ServerInitializeError),

    #[error("MCP service task failed: {0}")]
    Service(#[from] tokio::task::JoinError),

    /// Tool registration failed.
    #[error(transparent)]
    Tools(#[from] ToolsError),
}

/// Result type alias for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;
