//! Authentication strategies for the Simple-API backend.
//!
//! The strategy is resolved once at startup and applied to every outbound request by the
//! [`runtime`](crate::runtime) executor.

use std::fmt;

/// How credentials are attached to outbound requests.
#[derive(Clone, PartialEq, Eq, Default)]
pub enum AuthStrategy {
    #[default]
    None,
    /// `user` / `pass` appended as URL query parameters.
    Query { user: String, pass: String },
    /// `Authorization: Basic base64(user:pass)`.
    Basic { user: String, pass: String },
    /// `Authorization: Bearer <token>`.
    Bearer { token: String },
}

impl AuthStrategy {
    /// Resolve raw config values into a strategy.
    ///
    /// Incomplete input never fails: a missing or unknown `auth_type`, or a missing credential
    /// for the chosen type, yields [`AuthStrategy::None`]. Callers that want to report the
    /// degradation can compare the requested type against [`AuthStrategy::kind`].
    #[must_use]
    pub fn resolve(
        auth_type: Option<&str>,
        user: Option<&str>,
        pass: Option<&str>,
        token: Option<&str>,
    ) -> Self {
        let non_empty = |v: Option<&str>| v.filter(|s| !s.is_empty()).map(str::to_string);

        match auth_type {
            Some("bearer") => match non_empty(token) {
                Some(token) => Self::Bearer { token },
                None => Self::None,
            },
            Some(kind @ ("basic" | "query")) => match (non_empty(user), non_empty(pass)) {
                (Some(user), Some(pass)) if kind == "basic" => Self::Basic { user, pass },
                (Some(user), Some(pass)) => Self::Query { user, pass },
                _ => Self::None,
            },
            _ => Self::None,
        }
    }

    /// Short name of the active variant, safe to log.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Query { .. } => "query",
            Self::Basic { .. } => "basic",
            Self::Bearer { .. } => "bearer",
        }
    }
}

impl fmt::Debug for AuthStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Query { user, .. } => f
                .debug_struct("Query")
                .field("user", user)
                .field("pass", &"<redacted>")
                .finish(),
            Self::Basic { user, .. } => f
                .debug_struct("Basic")
                .field("user", user)
                .field("pass", &"<redacted>")
                .finish(),
            Self::Bearer { .. } => f
                .debug_struct("Bearer")
                .field("token", &"<redacted>")
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::AuthStrategy;

    #[test]
    fn resolves_each_complete_strategy() {
        assert_eq!(
            AuthStrategy::resolve(Some("bearer"), None, None, Some("abc")),
            AuthStrategy::Bearer {
                token: "abc".to_string()
            }
        );
        assert_eq!(
            AuthStrategy::resolve(Some("basic"), Some("u"), Some("p"), None),
            AuthStrategy::Basic {
                user: "u".to_string(),
                pass: "p".to_string()
            }
        );
        assert_eq!(
            AuthStrategy::resolve(Some("query"), Some("u"), Some("p"), None),
            AuthStrategy::Query {
                user: "u".to_string(),
                pass: "p".to_string()
            }
        );
    }

    #[test]
    fn incomplete_credentials_degrade_to_none() {
        let cases: [(Option<&str>, Option<&str>, Option<&str>, Option<&str>); 8] = [
            (None, Some("u"), Some("p"), Some("t")),
            (Some("bearer"), Some("u"), Some("p"), None),
            (Some("bearer"), None, None, Some("")),
            (Some("basic"), Some("u"), None, None),
            (Some("basic"), None, Some("p"), Some("t")),
            (Some("query"), Some(""), Some("p"), None),
            (Some("query"), Some("u"), Some(""), None),
            (Some("digest"), Some("u"), Some("p"), Some("t")),
        ];
        for (kind, user, pass, token) in cases {
            assert_eq!(
                AuthStrategy::resolve(kind, user, pass, token),
                AuthStrategy::None,
                "{kind:?} {user:?} {pass:?} {token:?}"
            );
        }
    }

    #[test]
    fn auth_type_is_case_sensitive() {
        assert_eq!(
            AuthStrategy::resolve(Some("Bearer"), None, None, Some("abc")),
            AuthStrategy::None
        );
    }

    #[test]
    fn debug_output_hides_secrets() {
        let basic = AuthStrategy::Basic {
            user: "admin".to_string(),
            pass: "hunter2".to_string(),
        };
        let bearer = AuthStrategy::Bearer {
            token: "tok-123".to_string(),
        };
        let rendered = format!("{basic:?} {bearer:?}");
        assert!(rendered.contains("admin"));
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("tok-123"));
        assert_eq!(basic.kind(), "basic");
        assert_eq!(AuthStrategy::default().kind(), "none");
    }
}
