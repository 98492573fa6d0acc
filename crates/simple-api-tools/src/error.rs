//! Error types for `iobroker-simple-api-tools`.

use thiserror::Error;

/// A single argument that failed its declared schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid argument '{field}': {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Main error type for tool registration and execution.
#[derive(Debug, Error)]
pub enum ToolsError {
    /// Configuration errors (invalid host URL, HTTP client construction).
    #[error("config error: {0}")]
    Config(String),

    /// A tool with the same name is already registered.
    #[error("duplicate tool name '{0}'")]
    DuplicateTool(String),

    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    /// Arguments rejected before any HTTP call was attempted.
    #[error("{tool}: {source}")]
    Validation {
        tool: String,
        #[source]
        source: ValidationError,
    },

    /// The backend answered with a non-2xx status.
    #[error("{operation} failed for {subject}: backend returned {status}{}", format_body(.body))]
    OperationFailed {
        operation: String,
        subject: String,
        status: String,
        body: String,
    },

    /// Network, DNS or connection failure. The message never contains credentials.
    #[error("http transport error: {0}")]
    Transport(String),

    /// The backend answered 2xx but the body did not have the expected shape.
    #[error("{operation}: could not parse backend response: {message}")]
    UpstreamBody { operation: String, message: String },
}

impl ToolsError {
    /// True for errors raised before the tool handler ran (bad name or arguments).
    #[must_use]
    pub fn is_invalid_request(&self) -> bool {
        matches!(self, Self::UnknownTool(_) | Self::Validation { .. })
    }
}

impl From<reqwest::Error> for ToolsError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(crate::safety::sanitize_reqwest_error(&value))
    }
}

fn format_body(body: &str) -> String {
    const MAX_CHARS: usize = 200;

    let body = body.trim();
    if body.is_empty() {
        return String::new();
    }
    if body.chars().count() > MAX_CHARS {
        let cut: String = body.chars().take(MAX_CHARS).collect();
        format!(": {cut}…")
    } else {
        format!(": {body}")
    }
}

/// Result type alias for tool operations.
pub type Result<T> = std::result::Result<T, ToolsError>;
