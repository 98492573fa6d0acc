//! Tool registry and dispatcher.
//!
//! Definitions are registered once at startup and never mutated afterwards. Dispatch validates
//! the arguments against the tool's schema before the handler (and therefore any HTTP call)
//! runs.

use crate::error::{Result, ToolsError};
use crate::result::ToolResult;
use crate::schema::{ToolSchema, ValidatedArgs};
use crate::semantics::{Access, annotations_for_access};
use futures::future::BoxFuture;
use rmcp::model::Tool;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

pub type ToolFuture = BoxFuture<'static, Result<ToolResult>>;
pub type ToolHandler = Arc<dyn Fn(ValidatedArgs) -> ToolFuture + Send + Sync>;

/// A named operation with its schema and handler.
#[derive(Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub schema: ToolSchema,
    pub access: Access,
    handler: ToolHandler,
}

impl ToolDefinition {
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        schema: ToolSchema,
        access: Access,
        handler: F,
    ) -> Self
    where
        F: Fn(ValidatedArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolResult>> + Send + 'static,
    {
        let handler: ToolHandler = Arc::new(move |args| -> ToolFuture { Box::pin(handler(args)) });
        Self {
            name: name.into(),
            description: description.into(),
            schema,
            access,
            handler,
        }
    }

    /// MCP listing entry for this tool.
    #[must_use]
    pub fn to_tool(&self) -> Tool {
        let mut tool = Tool::new(
            self.name.clone(),
            self.description.clone(),
            Arc::new(self.schema.to_json_schema()),
        );
        tool.annotations = Some(annotations_for_access(self.access));
        tool
    }
}

impl std::fmt::Debug for ToolDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDefinition")
            .field("name", &self.name)
            .field("access", &self.access)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// Registered tools in registration order.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDefinition>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a definition.
    ///
    /// # Errors
    ///
    /// Returns [`ToolsError::DuplicateTool`] if the name is taken; the existing definition is
    /// kept.
    pub fn register(&mut self, tool: ToolDefinition) -> Result<()> {
        if self.index.contains_key(&tool.name) {
            return Err(ToolsError::DuplicateTool(tool.name));
        }
        self.index.insert(tool.name.clone(), self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Add several definitions, stopping at the first duplicate.
    ///
    /// # Errors
    ///
    /// See [`ToolRegistry::register`].
    pub fn register_all(&mut self, tools: impl IntoIterator<Item = ToolDefinition>) -> Result<()> {
        for tool in tools {
            self.register(tool)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(|t| t.name.as_str())
    }

    #[must_use]
    pub fn list_tools(&self) -> Vec<Tool> {
        self.tools.iter().map(ToolDefinition::to_tool).collect()
    }

    /// Validate `arguments` and run the named tool.
    ///
    /// # Errors
    ///
    /// - [`ToolsError::UnknownTool`] if nothing is registered under `name`
    /// - [`ToolsError::Validation`] if the arguments do not match the schema
    /// - whatever the handler returns (upstream status, transport, body errors)
    pub async fn call(&self, name: &str, arguments: Value) -> Result<ToolResult> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolsError::UnknownTool(name.to_string()))?;

        let args = tool
            .schema
            .validate(arguments)
            .map_err(|source| ToolsError::Validation {
                tool: tool.name.clone(),
                source,
            })?;

        debug!(tool = %tool.name, "dispatching tool call");
        let result = (tool.handler)(args).await;
        if let Err(e) = &result {
            warn!(tool = %tool.name, error = %e, "tool call failed");
        }
        result
    }
}
