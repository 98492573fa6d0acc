//! In-process stand-in for an ioBroker Simple-API backend.
//!
//! [`MockBackend`] answers every path on an ephemeral localhost port and records each request
//! it sees, so tests can assert on the exact path, query, headers and body a tool sent.

use anyhow::Context as _;
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

/// One request as the backend received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    /// Raw (still percent-encoded) path.
    pub path: String,
    /// Raw query string, if any.
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

#[derive(Debug, Clone)]
struct Canned {
    status: u16,
    content_type: String,
    body: String,
    delay: Option<Duration>,
}

#[derive(Default)]
struct Shared {
    routes: HashMap<String, Canned>,
    requests: Mutex<Vec<RecordedRequest>>,
}

#[derive(Debug, Default)]
pub struct MockBackendBuilder {
    routes: HashMap<String, Canned>,
}

impl MockBackendBuilder {
    /// Answer requests for `path` (query ignored) with a fixed response.
    #[must_use]
    pub fn respond(
        mut self,
        path: &str,
        status: u16,
        content_type: &str,
        body: impl Into<String>,
    ) -> Self {
        self.routes.insert(
            path.to_string(),
            Canned {
                status,
                content_type: content_type.to_string(),
                body: body.into(),
                delay: None,
            },
        );
        self
    }

    /// Like [`MockBackendBuilder::respond`], but wait `delay` before answering.
    #[must_use]
    pub fn respond_after(
        mut self,
        path: &str,
        delay: Duration,
        status: u16,
        content_type: &str,
        body: impl Into<String>,
    ) -> Self {
        self.routes.insert(
            path.to_string(),
            Canned {
                status,
                content_type: content_type.to_string(),
                body: body.into(),
                delay: Some(delay),
            },
        );
        self
    }

    /// Bind an ephemeral localhost port and start serving.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn start(self) -> anyhow::Result<MockBackend> {
        let shared = Arc::new(Shared {
            routes: self.routes,
            requests: Mutex::new(Vec::new()),
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .context("bind mock backend")?;
        let addr = listener.local_addr().context("mock backend local addr")?;

        let app = Router::new()
            .route("/", any(handle))
            .route("/{*path}", any(handle))
            .with_state(Arc::clone(&shared));

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
        });

        Ok(MockBackend {
            base_url: format!("http://{addr}"),
            shared,
            shutdown: Some(shutdown_tx),
        })
    }
}

/// A running mock backend. Stops serving when dropped.
pub struct MockBackend {
    base_url: String,
    shared: Arc<Shared>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl MockBackend {
    #[must_use]
    pub fn builder() -> MockBackendBuilder {
        MockBackendBuilder::default()
    }

    /// Start a backend that echoes every request as JSON.
    ///
    /// # Errors
    ///
    /// See [`MockBackendBuilder::start`].
    pub async fn start() -> anyhow::Result<Self> {
        Self::builder().start().await
    }

    /// `http://127.0.0.1:<port>` without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> String {
        self.base_url.clone()
    }

    /// Every request received so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.shared.requests.lock().clone()
    }

    #[must_use]
    pub fn request_count(&self) -> usize {
        self.shared.requests.lock().len()
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

fn header_string(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn handle(
    State(shared): State<Arc<Shared>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let recorded = RecordedRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        authorization: header_string(&headers, header::AUTHORIZATION),
        content_type: header_string(&headers, header::CONTENT_TYPE),
        body: String::from_utf8_lossy(&body).into_owned(),
    };
    shared.requests.lock().push(recorded.clone());

    let Some(canned) = shared.routes.get(uri.path()).cloned() else {
        let echo = serde_json::json!({
            "method": recorded.method,
            "path": recorded.path,
            "query": recorded.query,
        });
        return (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            echo.to_string(),
        )
            .into_response();
    };

    if let Some(delay) = canned.delay {
        tokio::time::sleep(delay).await;
    }

    let status = StatusCode::from_u16(canned.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        [(header::CONTENT_TYPE, canned.content_type)],
        canned.body,
    )
        .into_response()
}
