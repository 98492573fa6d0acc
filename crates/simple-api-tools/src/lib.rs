//! ioBroker Simple-API tools for MCP.
//!
//! This crate holds everything that does not depend on the transport: auth strategies, the
//! request executor, parameter schemas, the tool catalogue and the registry that dispatches
//! validated calls. The `iobroker-simple-api-mcp` binary wires it to stdio.

pub mod auth;
pub mod catalog;
pub mod docs;
pub mod error;
pub mod registry;
pub mod result;
pub mod runtime;
pub mod safety;
pub mod schema;
pub mod semantics;

pub use auth::AuthStrategy;
pub use catalog::{SimpleApiClient, simple_api_tools};
pub use docs::api_docs_tool;
pub use error::{Result, ToolsError, ValidationError};
pub use registry::{ToolDefinition, ToolRegistry};
pub use result::{ContentItem, ToolResult, error_result};
pub use runtime::{HttpExecutor, RequestSpec};

use std::sync::Arc;

/// Registry with the `api-docs` tool followed by the full Simple-API catalogue.
///
/// # Errors
///
/// Returns [`ToolsError::DuplicateTool`] if two tools share a name.
pub fn build_registry(api: Arc<SimpleApiClient>) -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry.register(api_docs_tool())?;
    registry.register_all(simple_api_tools(&api))?;
    Ok(registry)
}
