//! MCP server over the tool registry.
//!
//! | Method                    | Behavior                                              |
//! |---------------------------|-------------------------------------------------------|
//! | `initialize`              | negotiated protocol version, capabilities, server info|
//! | `ping`                    | empty result                                          |
//! | `tools/list`              | every registered tool, in registration order          |
//! | `tools/call`              | runs the tool in its own task                         |
//! | `notifications/cancelled` | stops the matching in-flight call, no response        |
//!
//! Framing lives in [`crate::transport`]; rmcp drives the handshake and dispatch.

use crate::error::Result;
use crate::transport::LineTransport;
use iobroker_simple_api_tools::{ToolRegistry, ToolsError, error_result};
use rmcp::model::{
    CallToolRequestParams, CallToolResult, Implementation, ListToolsResult,
    PaginatedRequestParams, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData as McpError, RoleServer, ServerHandler, ServiceExt as _};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info};

const SERVER_NAME: &str = "iobroker-simple-api-mcp";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

const INSTRUCTIONS: &str = "Tools for reading and writing ioBroker states and objects through \
the Simple-API adapter. Call `api-docs` for a usage guide. Use `getEnums`, `getObjects` or \
`search` to discover IDs before reading or writing them.";

#[derive(Clone)]
pub struct SimpleApiServer {
    registry: Arc<ToolRegistry>,
}

impl SimpleApiServer {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }
}

impl ServerHandler for SimpleApiServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                title: None,
                version: SERVER_VERSION.to_string(),
                description: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(INSTRUCTIONS.to_string()),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<ListToolsResult, McpError> {
        Ok(ListToolsResult::with_all_items(self.registry.list_tools()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        context: RequestContext<RoleServer>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let arguments = request.arguments.map_or(Value::Null, Value::Object);
        let name = request.name;

        let outcome = tokio::select! {
            outcome = self.registry.call(&name, arguments) => outcome,
            () = context.ct.cancelled() => {
                debug!(tool = %name, "tool call cancelled");
                return Err(McpError::internal_error("request cancelled", None));
            }
        };

        match outcome {
            Ok(result) => Ok(result.into_call_tool_result()),
            Err(e) => tool_error(&e),
        }
    }
}

/// Bad requests become JSON-RPC errors; failures talking to the backend become tool results
/// with `isError: true`.
fn tool_error(e: &ToolsError) -> std::result::Result<CallToolResult, McpError> {
    match e {
        ToolsError::Validation { source, .. } => Err(McpError::invalid_params(
            e.to_string(),
            Some(json!({ "field": source.field })),
        )),
        ToolsError::UnknownTool(_) => Err(McpError::invalid_params(e.to_string(), None)),
        _ => Ok(error_result(e.to_string())),
    }
}

/// Serve MCP on the process's stdin and stdout until stdin closes.
///
/// # Errors
///
/// Returns an error if the client breaks the initialize handshake or the service task fails.
pub async fn run_stdio(registry: ToolRegistry) -> Result<()> {
    serve(Arc::new(registry), tokio::io::stdin(), tokio::io::stdout()).await
}

/// Serve MCP on an arbitrary reader/writer pair. Returns once input has closed and every
/// outstanding response has been written.
///
/// # Errors
///
/// Returns an error if the client breaks the initialize handshake or the service task fails.
pub async fn serve<R, W>(registry: Arc<ToolRegistry>, reader: R, writer: W) -> Result<()>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let tools = registry.len();
    let running = SimpleApiServer::new(registry)
        .serve(LineTransport::new(reader, writer))
        .await?;
    info!(tools, "mcp stdio server ready");

    let reason = running.waiting().await?;
    info!(?reason, "mcp stdio server stopped");
    Ok(())
}
