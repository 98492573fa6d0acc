//! Request executor shared by every Simple-API tool.
//!
//! A [`RequestSpec`] is built fresh per tool invocation; [`HttpExecutor`] turns it into an HTTP
//! request (URL, auth, JSON body), sends it and hands back the raw response. Interpreting the
//! status and body is the caller's job.

use crate::auth::AuthStrategy;
use crate::error::{Result, ToolsError};
use crate::safety::redact_url;
use reqwest::{Client, Method};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// One outbound call to the backend.
#[derive(Debug, Clone)]
pub struct RequestSpec<'a> {
    pub host: &'a Url,
    /// Relative path, may already carry a query string (`/set/x?value=1`).
    pub path: String,
    pub method: Method,
    pub body: Option<Value>,
    pub auth: &'a AuthStrategy,
}

impl<'a> RequestSpec<'a> {
    #[must_use]
    pub fn get(host: &'a Url, auth: &'a AuthStrategy, path: impl Into<String>) -> Self {
        Self {
            host,
            path: path.into(),
            method: Method::GET,
            body: None,
            auth,
        }
    }

    #[must_use]
    pub fn post_json(
        host: &'a Url,
        auth: &'a AuthStrategy,
        path: impl Into<String>,
        body: Value,
    ) -> Self {
        Self {
            host,
            path: path.into(),
            method: Method::POST,
            body: Some(body),
            auth,
        }
    }
}

/// Sends [`RequestSpec`]s with an injected HTTP client.
///
/// Cheap to clone; the underlying client is reference counted.
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    client: Client,
    timeout: Option<Duration>,
}

impl HttpExecutor {
    /// `timeout` applies per request; `None` waits indefinitely.
    #[must_use]
    pub fn new(client: Client, timeout: Option<Duration>) -> Self {
        Self { client, timeout }
    }

    /// Build the fully-shaped request without sending it.
    ///
    /// # Errors
    ///
    /// Returns an error if the host and path do not form a valid URL, or if the body cannot be
    /// serialized.
    pub fn build_request(&self, spec: &RequestSpec<'_>) -> Result<reqwest::Request> {
        let mut url = build_url(spec.host, &spec.path)?;
        apply_query_auth(spec.auth, &mut url);

        let mut request = self.client.request(spec.method.clone(), url);
        request = apply_auth(spec.auth, request);
        request = apply_body(request, spec.body.as_ref())?;
        if let Some(t) = self.timeout {
            request = request.timeout(t);
        }

        request.build().map_err(ToolsError::from)
    }

    /// Send the request and return the response unconsumed.
    ///
    /// Non-2xx statuses are returned as `Ok`; only transport failures are errors.
    ///
    /// # Errors
    ///
    /// Returns [`ToolsError::Transport`] on connection, DNS or timeout failures and any error
    /// from [`HttpExecutor::build_request`].
    pub async fn execute(&self, spec: RequestSpec<'_>) -> Result<reqwest::Response> {
        let request = self.build_request(&spec)?;
        debug!(
            method = %request.method(),
            url = %redact_url(request.url()),
            auth = spec.auth.kind(),
            "simple-api request"
        );

        let response = self.client.execute(request).await?;
        debug!(status = %response.status(), "simple-api response");
        Ok(response)
    }
}

/// Append `path` to `host`, keeping any path prefix the host already has.
pub(crate) fn build_url(host: &Url, path: &str) -> Result<Url> {
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };
    let raw = format!("{}{}", host.as_str().trim_end_matches('/'), path);
    Url::parse(&raw).map_err(|e| ToolsError::Config(format!("Invalid request URL: {e}")))
}

fn apply_query_auth(auth: &AuthStrategy, url: &mut Url) {
    if let AuthStrategy::Query { user, pass } = auth {
        url.query_pairs_mut()
            .append_pair("user", user)
            .append_pair("pass", pass);
    }
}

fn apply_auth(auth: &AuthStrategy, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    match auth {
        AuthStrategy::Basic { user, pass } => request.basic_auth(user, Some(pass)),
        AuthStrategy::Bearer { token } => request.bearer_auth(token),
        AuthStrategy::Query { .. } | AuthStrategy::None => request,
    }
}

fn apply_body(
    request: reqwest::RequestBuilder,
    body: Option<&Value>,
) -> Result<reqwest::RequestBuilder> {
    let Some(body) = body else {
        return Ok(request);
    };
    let text = serde_json::to_string(body)
        .map_err(|e| ToolsError::Config(format!("Request body is not serializable: {e}")))?;
    Ok(request
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .body(text))
}

/// Percent-encode a value for a path segment or query value.
///
/// Leaves the same characters untouched as JavaScript's `encodeURIComponent`, so patterns such
/// as `enum.*` reach the backend unchanged.
#[must_use]
pub fn encode_component(s: &str) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let mut out = String::with_capacity(s.len());
    for &b in s.as_bytes() {
        if is_component_safe(b) {
            out.push(b as char);
        } else {
            out.push('%');
            out.push(HEX[(b >> 4) as usize] as char);
            out.push(HEX[(b & 0x0F) as usize] as char);
        }
    }
    out
}

fn is_component_safe(b: u8) -> bool {
    matches!(
        b,
        b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'!'
            | b'~'
            | b'*'
            | b'\''
            | b'('
            | b')'
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;
    use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
    use serde_json::json;

    fn host() -> Url {
        Url::parse("http://localhost:8082").expect("url")
    }

    fn executor() -> HttpExecutor {
        HttpExecutor::new(Client::new(), Some(Duration::from_secs(5)))
    }

    #[test]
    fn query_auth_appends_credentials_without_header() {
        let host = host();
        let auth = AuthStrategy::Query {
            user: "a".to_string(),
            pass: "b".to_string(),
        };
        let req = executor()
            .build_request(&RequestSpec::get(&host, &auth, "/get/x"))
            .expect("request");

        assert_eq!(req.url().path(), "/get/x");
        assert_eq!(req.url().query(), Some("user=a&pass=b"));
        assert!(req.headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn query_auth_keeps_existing_query_first() {
        let host = host();
        let auth = AuthStrategy::Query {
            user: "a".to_string(),
            pass: "b c".to_string(),
        };
        let req = executor()
            .build_request(&RequestSpec::get(&host, &auth, "/set/x?value=1"))
            .expect("request");

        assert_eq!(req.url().query(), Some("value=1&user=a&pass=b+c"));
    }

    #[test]
    fn basic_auth_sets_encoded_header() {
        let host = host();
        let auth = AuthStrategy::Basic {
            user: "a".to_string(),
            pass: "b".to_string(),
        };
        let req = executor()
            .build_request(&RequestSpec::get(&host, &auth, "/get/x"))
            .expect("request");

        let expected = format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode("a:b")
        );
        assert_eq!(
            req.headers().get(AUTHORIZATION).and_then(|v| v.to_str().ok()),
            Some(expected.as_str())
        );
        assert_eq!(req.url().query(), None);
    }

    #[test]
    fn bearer_auth_sets_header_and_leaves_query_alone() {
        let host = host();
        let auth = AuthStrategy::Bearer {
            token: "tok".to_string(),
        };
        let req = executor()
            .build_request(&RequestSpec::get(&host, &auth, "/states?pattern=*"))
            .expect("request");

        assert_eq!(
            req.headers().get(AUTHORIZATION).and_then(|v| v.to_str().ok()),
            Some("Bearer tok")
        );
        assert_eq!(req.url().query(), Some("pattern=*"));
    }

    #[test]
    fn no_auth_touches_nothing() {
        let host = host();
        let req = executor()
            .build_request(&RequestSpec::get(&host, &AuthStrategy::None, "/toggle/x"))
            .expect("request");
        assert!(req.headers().get(AUTHORIZATION).is_none());
        assert_eq!(req.url().as_str(), "http://localhost:8082/toggle/x");
    }

    #[test]
    fn json_body_sets_content_type_and_serializes_once() {
        let host = host();
        let req = executor()
            .build_request(&RequestSpec::post_json(
                &host,
                &AuthStrategy::None,
                "/setBulk",
                json!({"a": 1, "b": "x"}),
            ))
            .expect("request");

        assert_eq!(req.method(), &Method::POST);
        assert_eq!(
            req.headers().get(CONTENT_TYPE).and_then(|v| v.to_str().ok()),
            Some("application/json")
        );
        let body = req
            .body()
            .and_then(reqwest::Body::as_bytes)
            .expect("buffered body");
        assert_eq!(body, br#"{"a":1,"b":"x"}"#);
    }

    #[test]
    fn build_url_keeps_host_path_prefix() {
        let host = Url::parse("http://nas.local:8087/iobroker/").expect("url");
        let url = build_url(&host, "/get/a.b").expect("url");
        assert_eq!(url.as_str(), "http://nas.local:8087/iobroker/get/a.b");

        let url = build_url(&host, "states?pattern=x").expect("url");
        assert_eq!(url.path(), "/iobroker/states");
        assert_eq!(url.query(), Some("pattern=x"));
    }

    #[test]
    fn encode_component_matches_encode_uri_component() {
        assert_eq!(encode_component("enum.*"), "enum.*");
        assert_eq!(encode_component("a b&c=d"), "a%20b%26c%3Dd");
        assert_eq!(encode_component("x/y?z#"), "x%2Fy%3Fz%23");
        assert_eq!(encode_component("-1h"), "-1h");
        assert_eq!(encode_component("2019-06-08T01:00:00.000Z"), "2019-06-08T01%3A00%3A00.000Z");
        assert_eq!(encode_component("Küche"), "K%C3%BCche");
    }

    #[tokio::test]
    async fn execute_returns_non_success_responses_unconsumed() {
        let backend = iobroker_test_support::MockBackend::builder()
            .respond("/get/missing", 404, "text/plain", "not found")
            .start()
            .await
            .expect("mock backend");
        let host = Url::parse(&backend.base_url()).expect("url");

        let resp = executor()
            .execute(RequestSpec::get(&host, &AuthStrategy::None, "/get/missing"))
            .await
            .expect("non-2xx is not an error");

        assert_eq!(resp.status().as_u16(), 404);
        assert_eq!(resp.text().await.expect("body"), "not found");
    }

    #[tokio::test]
    async fn execute_reports_transport_errors() {
        let host = Url::parse("http://127.0.0.1:9").expect("url");
        let auth = AuthStrategy::Query {
            user: "u".to_string(),
            pass: "topsecret".to_string(),
        };
        let err = executor()
            .execute(RequestSpec::get(&host, &auth, "/get/x"))
            .await
            .expect_err("connection refused");

        assert!(matches!(err, ToolsError::Transport(_)));
        assert!(!err.to_string().contains("topsecret"));
    }
}
