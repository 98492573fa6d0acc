//! The `api-docs` tool: a static usage guide that never contacts the backend.

use crate::catalog::{OBJECT_TYPES, RELATIVE_TIME_TOKENS};
use crate::registry::ToolDefinition;
use crate::result::ToolResult;
use crate::schema::ToolSchema;
use crate::semantics::Access;

pub const API_DOCS_TOOL: &str = "api-docs";

const INTRO: &str = "\
# ioBroker Simple-API tools

These tools read and write ioBroker states and objects through the Simple-API adapter.

## Concepts

- A *state* holds a current value (`val`) plus metadata: `ack` (confirmed by the device), \
`ts` (last update), `lc` (last change) and `from` (who wrote it).
- An *object* describes structure: its `type`, `common` settings (name, role, unit) and \
`native` adapter data. Every state has an object with the same ID.
- IDs are dot-separated, e.g. `hm-rpc.0.LEQ123.1.TEMPERATURE` or `enum.rooms.kitchen`.
- Patterns use `*` as a wildcard, e.g. `javascript.0.*`.

## Tools

- `getPlainValue` / `getState`: read one state, bare or with metadata.
- `getBulkStates`: read several states (`stateIDs` is comma-separated).
- `setState` / `setBulkStates`: write one or several values.
- `toggleState`: invert a boolean state. Not idempotent.
- `getStates`: all states matching a pattern.
- `getObjects`: object definitions matching a pattern, optionally filtered by type.
- `getEnums`: rooms, functions and other categories with their members.
- `search`: list data point IDs, useful before `query`.
- `query`: historical values for one or more data points.

## Typical workflow

1. `getEnums` to find rooms and functions.
2. `getObjects` or `search` to find the IDs you need.
3. `getState` / `getBulkStates` to read, `setState` to write.
4. `query` with `dateFrom: \"-1d\"` to look at the last day.
";

/// The full guide, including the object type list and the time vocabulary.
#[must_use]
pub fn api_docs() -> String {
    let mut out = String::from(INTRO);

    out.push_str("\n## Object types\n\n");
    for (name, what) in OBJECT_TYPES {
        out.push_str(&format!("- `{name}`: {what}\n"));
    }

    out.push_str("\n## Time values for `query`\n\n");
    out.push_str(
        "`dateFrom` and `dateTo` accept ISO 8601 timestamps such as \
         `2019-06-08T01:00:00.000Z` or one of these relative tokens \
         (replace `N` with a number):\n\n",
    );
    for (token, what) in RELATIVE_TIME_TOKENS {
        out.push_str(&format!("- `{token}`: {what}\n"));
    }
    out
}

#[must_use]
pub fn api_docs_tool() -> ToolDefinition {
    ToolDefinition::new(
        API_DOCS_TOOL,
        "Show a usage guide for the ioBroker Simple-API tools: concepts, object types, \
         time formats and a typical workflow. Does not contact the backend.",
        ToolSchema::default(),
        Access::Static,
        |_args| async { Ok(ToolResult::text(api_docs())) },
    )
}
