//! Tool results and their MCP wire form.
//!
//! Every content item goes out as an MCP `text` block. [`ContentItem::Json`] values are
//! serialized compactly, keeping the key order the backend sent.

use rmcp::model::{CallToolResult, Content};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum ContentItem {
    Text(String),
    Json(Value),
}

impl ContentItem {
    fn into_content(self) -> Content {
        match self {
            Self::Text(text) => Content::text(text),
            Self::Json(value) => {
                let text = serde_json::to_string(&value).unwrap_or_else(|_| value.to_string());
                Content::text(text)
            }
        }
    }
}

/// Successful output of a tool handler.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ToolResult {
    pub content: Vec<ContentItem>,
}

impl ToolResult {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentItem::Text(text.into())],
        }
    }

    #[must_use]
    pub fn json(value: Value) -> Self {
        Self {
            content: vec![ContentItem::Json(value)],
        }
    }

    #[must_use]
    pub fn into_call_tool_result(self) -> CallToolResult {
        let content = self
            .content
            .into_iter()
            .map(ContentItem::into_content)
            .collect();
        CallToolResult::success(content)
    }
}

/// Wrap a failure message as an MCP tool error result (`isError: true`).
#[must_use]
pub fn error_result(message: impl Into<String>) -> CallToolResult {
    CallToolResult {
        content: vec![Content::text(message.into())],
        structured_content: None,
        is_error: Some(true),
        meta: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn first_text(result: &CallToolResult) -> String {
        let v = serde_json::to_value(result).expect("CallToolResult serializes");
        v.get("content")
            .and_then(Value::as_array)
            .and_then(|c| c.first())
            .and_then(|c| c.get("text"))
            .and_then(Value::as_str)
            .expect("content[0].text")
            .to_string()
    }

    #[test]
    fn json_items_go_out_as_compact_text_in_backend_order() {
        let body: Value =
            serde_json::from_str(r#"{"val": 21.5, "ack": true, "from": "system.adapter.x"}"#)
                .expect("json");
        let result = ToolResult::json(body).into_call_tool_result();
        assert_eq!(
            first_text(&result),
            r#"{"val":21.5,"ack":true,"from":"system.adapter.x"}"#
        );
        assert_ne!(result.is_error, Some(true));
    }

    #[test]
    fn text_items_pass_through_unchanged() {
        let result = ToolResult::text("22.5").into_call_tool_result();
        assert_eq!(first_text(&result), "22.5");
    }

    #[test]
    fn error_result_is_flagged() {
        let result = error_result("getState failed for stateID: x");
        assert_eq!(result.is_error, Some(true));
        assert_eq!(first_text(&result), "getState failed for stateID: x");

        let v = serde_json::to_value(&result).expect("serializes");
        assert_eq!(v["isError"], json!(true));
    }
}
