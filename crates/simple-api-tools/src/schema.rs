//! Static parameter schemas for the tool catalogue.
//!
//! Each tool declares an ordered list of [`ParamSpec`]s. The same list renders the MCP
//! `inputSchema` and validates incoming arguments before any handler runs.

use crate::error::ValidationError;
use serde_json::{Map, Value, json};

/// The value shapes Simple-API tools accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Boolean,
    /// String, number or boolean.
    Scalar,
    /// Object mapping string keys to scalars.
    ScalarMap,
}

impl ParamType {
    fn json_schema(self) -> Value {
        match self {
            Self::String => json!({ "type": "string" }),
            Self::Boolean => json!({ "type": "boolean" }),
            Self::Scalar => json!({ "type": ["string", "number", "boolean"] }),
            Self::ScalarMap => json!({
                "type": "object",
                "additionalProperties": { "type": ["string", "number", "boolean"] }
            }),
        }
    }

    fn expected(self) -> &'static str {
        match self {
            Self::String => "a string",
            Self::Boolean => "a boolean",
            Self::Scalar => "a string, number or boolean",
            Self::ScalarMap => "an object of string, number or boolean values",
        }
    }

    fn accepts(self, value: &Value) -> std::result::Result<(), String> {
        let ok = match self {
            Self::String => value.is_string(),
            Self::Boolean => value.is_boolean(),
            Self::Scalar => is_scalar(value),
            Self::ScalarMap => {
                let Some(map) = value.as_object() else {
                    return Err(format!("expected {}, got {}", self.expected(), kind(value)));
                };
                if let Some((key, bad)) = map.iter().find(|(_, v)| !is_scalar(v)) {
                    return Err(format!(
                        "entry '{key}' must be a string, number or boolean, got {}",
                        kind(bad)
                    ));
                }
                true
            }
        };
        if ok {
            Ok(())
        } else {
            Err(format!("expected {}, got {}", self.expected(), kind(value)))
        }
    }
}

fn is_scalar(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// One declared parameter: `{type, optional, description}`.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: &'static str,
    pub ty: ParamType,
    pub optional: bool,
    pub description: String,
}

impl ParamSpec {
    pub fn required(name: &'static str, ty: ParamType, description: impl Into<String>) -> Self {
        Self {
            name,
            ty,
            optional: false,
            description: description.into(),
        }
    }

    pub fn optional(name: &'static str, ty: ParamType, description: impl Into<String>) -> Self {
        Self {
            name,
            ty,
            optional: true,
            description: description.into(),
        }
    }
}

/// Ordered parameter list for one tool.
#[derive(Debug, Clone, Default)]
pub struct ToolSchema {
    params: Vec<ParamSpec>,
}

impl ToolSchema {
    #[must_use]
    pub fn new(params: Vec<ParamSpec>) -> Self {
        Self { params }
    }

    /// Render as a JSON Schema object for the MCP `inputSchema`.
    #[must_use]
    pub fn to_json_schema(&self) -> Map<String, Value> {
        let mut properties = Map::new();
        let mut required: Vec<Value> = Vec::new();

        for param in &self.params {
            let mut prop = param.ty.json_schema();
            prop["description"] = json!(param.description);
            properties.insert(param.name.to_string(), prop);
            if !param.optional {
                required.push(json!(param.name));
            }
        }

        let mut schema = Map::new();
        schema.insert("type".to_string(), json!("object"));
        schema.insert("properties".to_string(), Value::Object(properties));
        if !required.is_empty() {
            schema.insert("required".to_string(), Value::Array(required));
        }
        schema
    }

    /// Check `arguments` against the declared parameters.
    ///
    /// A missing or `null` argument object counts as `{}`. `null` values for optional
    /// parameters count as absent. Undeclared keys are dropped.
    ///
    /// # Errors
    ///
    /// Returns the first parameter that is missing or has the wrong type.
    pub fn validate(&self, arguments: Value) -> std::result::Result<ValidatedArgs, ValidationError> {
        let mut input = match arguments {
            Value::Null => Map::new(),
            Value::Object(map) => map,
            other => {
                return Err(ValidationError::new(
                    "arguments",
                    format!("expected an object, got {}", kind(&other)),
                ));
            }
        };

        let mut values = Map::new();
        for param in &self.params {
            match input.remove(param.name) {
                None | Some(Value::Null) if param.optional => {}
                None | Some(Value::Null) => {
                    return Err(ValidationError::new(param.name, "is required"));
                }
                Some(value) => {
                    param
                        .ty
                        .accepts(&value)
                        .map_err(|message| ValidationError::new(param.name, message))?;
                    values.insert(param.name.to_string(), value);
                }
            }
        }

        Ok(ValidatedArgs { values })
    }
}

/// Arguments that passed [`ToolSchema::validate`].
///
/// Accessors return empty/`None` for parameters that were not declared with the requested
/// type; handlers only read what their own schema declared.
#[derive(Debug, Clone, Default)]
pub struct ValidatedArgs {
    values: Map<String, Value>,
}

impl ValidatedArgs {
    #[must_use]
    pub fn str(&self, name: &str) -> &str {
        self.opt_str(name).unwrap_or_default()
    }

    #[must_use]
    pub fn opt_str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(Value::as_str)
    }

    #[must_use]
    pub fn flag(&self, name: &str) -> bool {
        self.values
            .get(name)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Raw value (used for scalars and maps).
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }
}

/// Render a scalar the way it appears in a URL.
#[must_use]
pub fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_state_schema() -> ToolSchema {
        ToolSchema::new(vec![
            ParamSpec::required("stateID", ParamType::String, "state id"),
            ParamSpec::required("value", ParamType::Scalar, "new value"),
            ParamSpec::optional("ack", ParamType::Boolean, "ack flag"),
        ])
    }

    #[test]
    fn json_schema_lists_required_params_in_order() {
        let schema = Value::Object(set_state_schema().to_json_schema());
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["stateID", "value"]));
        assert_eq!(schema["properties"]["stateID"]["type"], "string");
        assert_eq!(
            schema["properties"]["value"]["type"],
            json!(["string", "number", "boolean"])
        );
        assert_eq!(schema["properties"]["ack"]["description"], "ack flag");

        let keys: Vec<&String> = schema["properties"]
            .as_object()
            .expect("properties")
            .keys()
            .collect();
        assert_eq!(keys, ["stateID", "value", "ack"]);
    }

    #[test]
    fn empty_schema_has_no_required_list() {
        let schema = ToolSchema::default().to_json_schema();
        assert!(!schema.contains_key("required"));
        assert!(ToolSchema::default().validate(Value::Null).is_ok());
    }

    #[test]
    fn missing_required_field_is_reported_by_name() {
        let err = set_state_schema()
            .validate(json!({ "stateID": "a.b" }))
            .unwrap_err();
        assert_eq!(err.field, "value");
        assert_eq!(err.message, "is required");
    }

    #[test]
    fn wrong_type_is_reported_with_expectation() {
        let err = set_state_schema()
            .validate(json!({ "stateID": 42, "value": 1 }))
            .unwrap_err();
        assert_eq!(err.field, "stateID");
        assert_eq!(err.message, "expected a string, got number");

        let err = set_state_schema()
            .validate(json!({ "stateID": "a", "value": [1] }))
            .unwrap_err();
        assert_eq!(err.field, "value");
    }

    #[test]
    fn optional_null_is_absent_and_extra_keys_are_dropped() {
        let args = set_state_schema()
            .validate(json!({ "stateID": "a", "value": false, "ack": null, "extra": 1 }))
            .expect("valid");
        assert_eq!(args.str("stateID"), "a");
        assert_eq!(args.value("value"), Some(&json!(false)));
        assert!(args.value("ack").is_none());
        assert!(!args.flag("ack"));
        assert!(args.value("extra").is_none());
    }

    #[test]
    fn non_object_arguments_are_rejected() {
        let err = set_state_schema().validate(json!(["a"])).unwrap_err();
        assert_eq!(err.field, "arguments");
    }

    #[test]
    fn scalar_map_rejects_nested_values() {
        let schema = ToolSchema::new(vec![ParamSpec::required(
            "states",
            ParamType::ScalarMap,
            "map",
        )]);
        assert!(schema.validate(json!({ "states": { "a": 1, "b": "x" } })).is_ok());

        let err = schema
            .validate(json!({ "states": { "a": { "val": 1 } } }))
            .unwrap_err();
        assert_eq!(err.field, "states");
        assert!(err.message.contains("'a'"));
    }

    #[test]
    fn scalars_render_like_url_values() {
        assert_eq!(scalar_to_string(&json!(true)), "true");
        assert_eq!(scalar_to_string(&json!(21.5)), "21.5");
        assert_eq!(scalar_to_string(&json!("on")), "on");
    }
}
