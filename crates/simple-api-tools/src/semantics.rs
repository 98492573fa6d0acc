//! Tool annotation helpers.
//!
//! Simple-API writes go through `GET` (`/set`, `/toggle`), so hints are derived from what a
//! tool does to the backend rather than from its HTTP method.

use rmcp::model::ToolAnnotations;

/// What a tool does to backend state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Reads states or objects.
    Read,
    /// Overwrites state values; repeating the call with the same input is harmless.
    Write,
    /// Flips a state; every call changes the result.
    Toggle,
    /// Answers locally without contacting the backend.
    Static,
}

/// Generate MCP tool annotations for an access kind.
///
/// `openWorldHint` is set for every tool that talks to the backend.
#[must_use]
pub fn annotations_for_access(access: Access) -> ToolAnnotations {
    let (read_only, destructive, idempotent, open_world) = match access {
        Access::Read => (true, false, true, true),
        Access::Write => (false, false, true, true),
        Access::Toggle => (false, false, false, true),
        Access::Static => (true, false, true, false),
    };

    ToolAnnotations {
        title: None,
        read_only_hint: Some(read_only),
        destructive_hint: Some(destructive),
        idempotent_hint: Some(idempotent),
        open_world_hint: Some(open_world),
    }
}

#[cfg(test)]
mod tests {
    use super::{Access, annotations_for_access};

    #[test]
    fn backend_tools_are_open_world() {
        for access in [Access::Read, Access::Write, Access::Toggle] {
            assert_eq!(annotations_for_access(access).open_world_hint, Some(true));
        }
        assert_eq!(
            annotations_for_access(Access::Static).open_world_hint,
            Some(false)
        );
    }

    #[test]
    fn reads_are_readonly_and_idempotent() {
        let a = annotations_for_access(Access::Read);
        assert_eq!(a.read_only_hint, Some(true));
        assert_eq!(a.destructive_hint, Some(false));
        assert_eq!(a.idempotent_hint, Some(true));
    }

    #[test]
    fn toggle_is_not_idempotent() {
        let a = annotations_for_access(Access::Toggle);
        assert_eq!(a.read_only_hint, Some(false));
        assert_eq!(a.idempotent_hint, Some(false));

        let w = annotations_for_access(Access::Write);
        assert_eq!(w.idempotent_hint, Some(true));
    }
}
