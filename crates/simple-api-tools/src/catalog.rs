//! The Simple-API tool catalogue.
//!
//! Every tool follows the same contract: build a [`RequestSpec`] from the validated arguments
//! and the shared [`SimpleApiClient`], send it, turn a non-2xx status into
//! [`ToolsError::OperationFailed`] naming the identifying argument, and read the body as text
//! or JSON depending on the tool.
//!
//! | Tool            | Request                                                   | Result |
//! |-----------------|-----------------------------------------------------------|--------|
//! | `getPlainValue` | `GET /getPlainValue/{stateID}`                            | text   |
//! | `getState`      | `GET /get/{stateID}`                                      | JSON   |
//! | `setState`      | `GET /set/{stateID}?value=...`                            | text   |
//! | `toggleState`   | `GET /toggle/{stateID}`                                   | text   |
//! | `getBulkStates` | `GET /getBulk/{id1,id2,...}`                              | JSON   |
//! | `setBulkStates` | `POST /setBulk` with a JSON object body                   | text   |
//! | `getStates`     | `GET /states?pattern=...`                                 | JSON   |
//! | `getEnums`      | `GET /objects?pattern=enum.*&type=enum`                   | JSON   |
//! | `getObjects`    | `GET /objects?pattern=...[&type=...]`                     | JSON   |
//! | `search`        | `GET /search?pattern=...`                                 | JSON   |
//! | `query`         | `GET /query?stateIDs=...[&dateFrom&dateTo&noHistory=true]` | JSON   |

use crate::auth::AuthStrategy;
use crate::error::{Result, ToolsError};
use crate::registry::ToolDefinition;
use crate::result::ToolResult;
use crate::runtime::{HttpExecutor, RequestSpec, encode_component};
use crate::schema::{ParamSpec, ParamType, ToolSchema, ValidatedArgs, scalar_to_string};
use crate::semantics::Access;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tracing::warn;
use url::Url;

/// Object types accepted by the backend's `type` filter. Only used for help text.
pub const OBJECT_TYPES: &[(&str, &str)] = &[
    ("state", "a single value or property"),
    ("channel", "a group of related states"),
    ("device", "a physical or virtual device"),
    ("enum", "a category grouping objects, such as a room or a function"),
    ("adapter", "an adapter definition"),
    ("instance", "a running instance of an adapter"),
    ("host", "a host running the platform"),
    ("meta", "metadata such as file storage"),
    ("config", "configuration data"),
    ("script", "a user script"),
    ("user", "a user account"),
    ("group", "a user group"),
];

/// Relative time tokens the backend resolves for `dateFrom` / `dateTo`. Only used for help text.
pub const RELATIVE_TIME_TOKENS: &[(&str, &str)] = &[
    ("today", "start of the current day"),
    ("yesterday", "start of the previous day"),
    ("thisHour", "start of the current hour"),
    ("lastHour", "start of the previous hour"),
    ("thisWeek", "start of the current week"),
    ("lastWeek", "start of the previous week"),
    ("thisMonth", "start of the current month"),
    ("lastMonth", "start of the previous month"),
    ("thisYear", "start of the current year"),
    ("lastYear", "start of the previous year"),
    ("-Ns", "N seconds ago"),
    ("-Nm", "N minutes ago"),
    ("-Nh", "N hours ago"),
    ("-Nd", "N days ago"),
    ("-NM", "N months ago"),
    ("-Ny", "N years ago"),
];

/// How a tool reads a successful response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Text,
    Json,
}

/// Host, auth and HTTP executor shared by every catalogue tool.
#[derive(Debug)]
pub struct SimpleApiClient {
    executor: HttpExecutor,
    host: Url,
    auth: AuthStrategy,
}

impl SimpleApiClient {
    #[must_use]
    pub fn new(executor: HttpExecutor, host: Url, auth: AuthStrategy) -> Self {
        Self {
            executor,
            host,
            auth,
        }
    }

    async fn get(
        &self,
        operation: &str,
        subject: String,
        path: String,
        shape: Shape,
    ) -> Result<ToolResult> {
        let spec = RequestSpec::get(&self.host, &self.auth, path);
        self.send(operation, subject, spec, shape).await
    }

    async fn post_json(
        &self,
        operation: &str,
        subject: String,
        path: &str,
        body: Value,
        shape: Shape,
    ) -> Result<ToolResult> {
        let spec = RequestSpec::post_json(&self.host, &self.auth, path, body);
        self.send(operation, subject, spec, shape).await
    }

    async fn send(
        &self,
        operation: &str,
        subject: String,
        spec: RequestSpec<'_>,
        shape: Shape,
    ) -> Result<ToolResult> {
        let response = self.executor.execute(spec).await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                operation,
                subject = %subject,
                status = %status,
                "simple-api returned an error status"
            );
            return Err(ToolsError::OperationFailed {
                operation: operation.to_string(),
                subject,
                status: status.to_string(),
                body,
            });
        }

        let text = response.text().await?;
        match shape {
            Shape::Text => Ok(ToolResult::text(text)),
            Shape::Json => serde_json::from_str::<Value>(&text)
                .map(ToolResult::json)
                .map_err(|e| ToolsError::UpstreamBody {
                    operation: operation.to_string(),
                    message: e.to_string(),
                }),
        }
    }
}

/// All backend tools, in listing order.
#[must_use]
pub fn simple_api_tools(api: &Arc<SimpleApiClient>) -> Vec<ToolDefinition> {
    vec![
        get_plain_value(api),
        get_state(api),
        set_state(api),
        toggle_state(api),
        get_bulk_states(api),
        set_bulk_states(api),
        get_states(api),
        get_enums(api),
        get_objects(api),
        search(api),
        query(api),
    ]
}

/// Bind a handler body to a shared client.
fn tool<F, Fut>(
    api: &Arc<SimpleApiClient>,
    name: &'static str,
    description: String,
    params: Vec<ParamSpec>,
    access: Access,
    run: F,
) -> ToolDefinition
where
    F: Fn(Arc<SimpleApiClient>, ValidatedArgs) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ToolResult>> + Send + 'static,
{
    let api = Arc::clone(api);
    ToolDefinition::new(
        name,
        description,
        ToolSchema::new(params),
        access,
        move |args| run(Arc::clone(&api), args),
    )
}

fn state_id_param(description: &str) -> ParamSpec {
    ParamSpec::required("stateID", ParamType::String, description)
}

fn pattern_param(example: &str) -> ParamSpec {
    ParamSpec::required(
        "pattern",
        ParamType::String,
        format!("Glob-like pattern matched against IDs, e.g. `{example}`."),
    )
}

fn get_plain_value(api: &Arc<SimpleApiClient>) -> ToolDefinition {
    tool(
        api,
        "getPlainValue",
        "Read the bare value of one state, without timestamps or quality flags.\n\n\
         Returns the value exactly as the backend prints it (e.g. `21.5` or `true`)."
            .to_string(),
        vec![state_id_param("ID of the state to read, e.g. `hm-rpc.0.LEQ123.1.TEMPERATURE`.")],
        Access::Read,
        |api, args| async move {
            let id = args.str("stateID");
            api.get(
                "getPlainValue",
                format!("stateID: {id}"),
                format!("/getPlainValue/{}", encode_component(id)),
                Shape::Text,
            )
            .await
        },
    )
}

fn get_state(api: &Arc<SimpleApiClient>) -> ToolDefinition {
    tool(
        api,
        "getState",
        "Read one state together with its metadata.\n\n\
         Returns a JSON object with the value (`val`), acknowledgement flag (`ack`), \
         timestamps (`ts`, `lc`), source (`from`) and the state's object definition."
            .to_string(),
        vec![state_id_param("ID of the state to read.")],
        Access::Read,
        |api, args| async move {
            let id = args.str("stateID");
            api.get(
                "getState",
                format!("stateID: {id}"),
                format!("/get/{}", encode_component(id)),
                Shape::Json,
            )
            .await
        },
    )
}

fn set_state(api: &Arc<SimpleApiClient>) -> ToolDefinition {
    tool(
        api,
        "setState",
        "Write a new value to one state.\n\n\
         The value may be a string, number or boolean. Returns the backend's confirmation."
            .to_string(),
        vec![
            state_id_param("ID of the state to write."),
            ParamSpec::required(
                "value",
                ParamType::Scalar,
                "New value for the state (string, number or boolean).",
            ),
        ],
        Access::Write,
        |api, args| async move {
            let id = args.str("stateID");
            let value = args.value("value").map(scalar_to_string).unwrap_or_default();
            api.get(
                "setState",
                format!("stateID: {id}"),
                format!(
                    "/set/{}?value={}",
                    encode_component(id),
                    encode_component(&value)
                ),
                Shape::Text,
            )
            .await
        },
    )
}

fn toggle_state(api: &Arc<SimpleApiClient>) -> ToolDefinition {
    tool(
        api,
        "toggleState",
        "Invert a boolean state (switch on becomes off and vice versa).\n\n\
         Returns the backend's confirmation."
            .to_string(),
        vec![state_id_param("ID of the state to toggle.")],
        Access::Toggle,
        |api, args| async move {
            let id = args.str("stateID");
            api.get(
                "toggleState",
                format!("stateID: {id}"),
                format!("/toggle/{}", encode_component(id)),
                Shape::Text,
            )
            .await
        },
    )
}

fn get_bulk_states(api: &Arc<SimpleApiClient>) -> ToolDefinition {
    tool(
        api,
        "getBulkStates",
        "Read several states in one request.\n\n\
         Returns a JSON array with one entry (`id`, `val`, `ts`, `ack`) per requested state."
            .to_string(),
        vec![ParamSpec::required(
            "stateIDs",
            ParamType::String,
            "Comma-separated list of state IDs, e.g. `a.0.temp,a.0.humidity`.",
        )],
        Access::Read,
        |api, args| async move {
            let ids = args.str("stateIDs");
            api.get(
                "getBulkStates",
                format!("stateIDs: {ids}"),
                format!("/getBulk/{}", encode_id_list(ids)),
                Shape::Json,
            )
            .await
        },
    )
}

fn set_bulk_states(api: &Arc<SimpleApiClient>) -> ToolDefinition {
    tool(
        api,
        "setBulkStates",
        "Write several states in one request.\n\n\
         Pass an object whose keys are state IDs and whose values are the new values. \
         The whole batch is a single call: it succeeds or fails as one."
            .to_string(),
        vec![ParamSpec::required(
            "states",
            ParamType::ScalarMap,
            "Object mapping state IDs to new values (string, number or boolean).",
        )],
        Access::Write,
        |api, args| async move {
            let states = args
                .value("states")
                .cloned()
                .unwrap_or_else(|| Value::Object(serde_json::Map::new()));
            let subject = match &states {
                Value::Object(map) => format!(
                    "states: {}",
                    map.keys().map(String::as_str).collect::<Vec<_>>().join(", ")
                ),
                _ => "states".to_string(),
            };
            api.post_json("setBulkStates", subject, "/setBulk", states, Shape::Text)
                .await
        },
    )
}

fn get_states(api: &Arc<SimpleApiClient>) -> ToolDefinition {
    tool(
        api,
        "getStates",
        "Read every state whose ID matches a pattern.\n\n\
         Returns a JSON object keyed by state ID."
            .to_string(),
        vec![pattern_param("javascript.0.*")],
        Access::Read,
        |api, args| async move {
            let pattern = args.str("pattern");
            api.get(
                "getStates",
                format!("pattern: {pattern}"),
                format!("/states?pattern={}", encode_component(pattern)),
                Shape::Json,
            )
            .await
        },
    )
}

fn get_enums(api: &Arc<SimpleApiClient>) -> ToolDefinition {
    tool(
        api,
        "getEnums",
        "List all enums (rooms, functions and other categories) with their members.\n\n\
         Equivalent to `getObjects` with pattern `enum.*` and type `enum`. \
         Returns a JSON object keyed by enum ID."
            .to_string(),
        Vec::new(),
        Access::Read,
        |api, _args| async move {
            api.get(
                "getEnums",
                "pattern: enum.*".to_string(),
                "/objects?pattern=enum.*&type=enum".to_string(),
                Shape::Json,
            )
            .await
        },
    )
}

fn get_objects(api: &Arc<SimpleApiClient>) -> ToolDefinition {
    let type_list = OBJECT_TYPES
        .iter()
        .map(|(name, what)| format!("  - {name}: {what}"))
        .collect::<Vec<_>>()
        .join("\n");

    tool(
        api,
        "getObjects",
        format!(
            "Read object definitions (structure and metadata, not values) whose ID matches a \
             pattern, optionally restricted to one object type.\n\n\
             Object types:\n{type_list}\n\n\
             Returns a JSON object keyed by object ID."
        ),
        vec![
            pattern_param("hm-rpc.0.*"),
            ParamSpec::optional(
                "type",
                ParamType::String,
                format!("Only return objects of this type. One of:\n{type_list}"),
            ),
        ],
        Access::Read,
        |api, args| async move {
            let pattern = args.str("pattern");
            let kind = args.opt_str("type").filter(|t| !t.is_empty());

            let mut path = format!("/objects?pattern={}", encode_component(pattern));
            let mut subject = format!("pattern: {pattern}");
            if let Some(kind) = kind {
                path.push_str(&format!("&type={}", encode_component(kind)));
                subject.push_str(&format!(" and type: {kind}"));
            }
            api.get("getObjects", subject, path, Shape::Json).await
        },
    )
}

fn search(api: &Arc<SimpleApiClient>) -> ToolDefinition {
    tool(
        api,
        "search",
        "List data point IDs matching a pattern.\n\n\
         When a history data source (History, SQL, InfluxDB) is configured in the backend, \
         only data points known to that source are listed, unless the backend is set to \
         list all data points. Use the result to pick IDs for `query`.\n\n\
         Returns a JSON array of IDs."
            .to_string(),
        vec![pattern_param("system.adapter.admin.0*")],
        Access::Read,
        |api, args| async move {
            let pattern = args.str("pattern");
            api.get(
                "search",
                format!("pattern: {pattern}"),
                format!("/search?pattern={}", encode_component(pattern)),
                Shape::Json,
            )
            .await
        },
    )
}

fn query(api: &Arc<SimpleApiClient>) -> ToolDefinition {
    let vocabulary = RELATIVE_TIME_TOKENS
        .iter()
        .map(|(token, what)| format!("  - {token}: {what}"))
        .collect::<Vec<_>>()
        .join("\n");

    tool(
        api,
        "query",
        format!(
            "Read historical (or current) values for one or more data points.\n\n\
             With a history data source configured in the backend, values for the requested \
             period are returned. Without one, or with `noHistory` set, only current values \
             are returned.\n\n\
             `dateFrom` / `dateTo` take an ISO 8601 timestamp (e.g. `2019-06-08T01:00:00.000Z`) \
             or a relative token, which the backend resolves:\n{vocabulary}\n\n\
             Returns a JSON array with one entry per data point."
        ),
        vec![
            ParamSpec::required(
                "stateIDs",
                ParamType::String,
                "Comma-separated list of data point IDs, e.g. `system.host.x.load,system.host.x.mem`.",
            ),
            ParamSpec::optional(
                "dateFrom",
                ParamType::String,
                "Start of the period: ISO 8601 timestamp or relative token such as `-1h` or `today`.",
            ),
            ParamSpec::optional(
                "dateTo",
                ParamType::String,
                "End of the period: ISO 8601 timestamp or relative token such as `now`.",
            ),
            ParamSpec::optional(
                "noHistory",
                ParamType::Boolean,
                "If true, return only the current values instead of history.",
            ),
        ],
        Access::Read,
        |api, args| async move {
            let ids = args.str("stateIDs");
            let mut path = format!("/query?stateIDs={}", encode_component(ids));
            for key in ["dateFrom", "dateTo"] {
                if let Some(v) = args.opt_str(key).filter(|v| !v.is_empty()) {
                    path.push_str(&format!("&{key}={}", encode_component(v)));
                }
            }
            if args.flag("noHistory") {
                path.push_str("&noHistory=true");
            }
            api.get("query", format!("stateIDs: {ids}"), path, Shape::Json)
                .await
        },
    )
}

/// Encode each ID of a comma-separated list, keeping the separators.
fn encode_id_list(ids: &str) -> String {
    ids.split(',')
        .map(encode_component)
        .collect::<Vec<_>>()
        .join(",")
}
