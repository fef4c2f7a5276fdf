//! Scripted transport for tests and demos
//!
//! Answers requests from routes registered per method and path, and records
//! every request it sees so tests can count exactly what a view sent.
//!
//! # Behavior
//!
//! - The most recently registered route for a method and path wins
//! - Unmatched requests answer `404 {"status":"error","error":"not found"}`
//! - A route delay sleeps on the tokio clock, so paused-time tests control it
//! - Multipart requests report their full size to the progress sink
//!
//! # Example
//!
//! ```no_run
//! use defect_control_client::transport::{ApiRequest, ApiTransport, Method, MockTransport};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mock = MockTransport::new();
//! mock.on_json(Method::GET, "/projects", 200, serde_json::json!({"status": "ok", "data": []}));
//!
//! let response = mock.send(ApiRequest::new(Method::GET, "/projects")).await?;
//! assert_eq!(response.status, 200);
//! assert_eq!(mock.count(Method::GET, "/projects"), 1);
//! # Ok(())
//! # }
//! ```

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value as JsonValue;

use super::{ApiRequest, ApiResponse, ApiTransport, Method, RequestBody};
use crate::error::ClientResult;

/// Request as seen by the mock
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    /// HTTP method
    pub method: Method,

    /// Path below the API root
    pub path: String,

    /// Query parameters in order
    pub query: Vec<(String, String)>,

    /// JSON body, if any
    pub json: Option<JsonValue>,

    /// Multipart field name, if any
    pub multipart_field: Option<String>,

    /// Uploaded file names, in order
    pub files: Vec<String>,

    /// Bearer token sent
    pub bearer: Option<String>,
}

impl RecordedRequest {
    /// Value of a query parameter
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

type Responder = Arc<dyn Fn(&RecordedRequest) -> ApiResponse + Send + Sync>;

#[derive(Clone)]
struct Route {
    method: Method,
    path: String,
    responder: Responder,
    delay: Option<Duration>,
}

#[derive(Default)]
struct MockState {
    routes: Vec<Route>,
    requests: Vec<RecordedRequest>,
}

/// Scripted transport
///
/// Clones share routes and the request log.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Creates a mock with no routes
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut state)
    }

    /// Registers a responder computed from the request
    pub fn on<F>(&self, method: Method, path: &str, responder: F) -> &Self
    where
        F: Fn(&RecordedRequest) -> ApiResponse + Send + Sync + 'static,
    {
        let route = Route {
            method,
            path: path.to_string(),
            responder: Arc::new(responder),
            delay: None,
        };
        self.with_state(|s| s.routes.push(route));
        self
    }

    /// Registers a fixed JSON response
    pub fn on_json(&self, method: Method, path: &str, status: u16, body: JsonValue) -> &Self {
        self.on(method, path, move |_| ApiResponse::json(status, &body))
    }

    /// Registers a fixed binary response
    pub fn on_bytes(&self, method: Method, path: &str, content_type: &str, body: impl Into<Bytes>) -> &Self {
        let content_type = content_type.to_string();
        let body = body.into();
        self.on(method, path, move |_| ApiResponse::bytes(200, content_type.clone(), body.clone()))
    }

    /// Delays the most recently registered route for a method and path
    pub fn delay(&self, method: Method, path: &str, delay: Duration) -> &Self {
        self.with_state(|s| {
            if let Some(route) = s
                .routes
                .iter_mut()
                .rev()
                .find(|r| r.method == method && r.path == path)
            {
                route.delay = Some(delay);
            }
        });
        self
    }

    /// Every request seen so far, in arrival order
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.with_state(|s| s.requests.clone())
    }

    /// Requests seen for a method and path
    pub fn requests_to(&self, method: Method, path: &str) -> Vec<RecordedRequest> {
        self.with_state(|s| {
            s.requests
                .iter()
                .filter(|r| r.method == method && r.path == path)
                .cloned()
                .collect()
        })
    }

    /// Number of requests seen for a method and path
    pub fn count(&self, method: Method, path: &str) -> usize {
        self.requests_to(method, path).len()
    }

    /// Forgets recorded requests, keeping routes
    pub fn reset_requests(&self) {
        self.with_state(|s| s.requests.clear());
    }

    fn record(request: &ApiRequest) -> RecordedRequest {
        let (json, multipart_field, files) = match &request.body {
            RequestBody::Empty => (None, None, Vec::new()),
            RequestBody::Json(value) => (Some(value.clone()), None, Vec::new()),
            RequestBody::Multipart(form) => (None, Some(form.field.clone()), form.file_names()),
        };

        RecordedRequest {
            method: request.method.clone(),
            path: request.path.clone(),
            query: request.query.clone(),
            json,
            multipart_field,
            files,
            bearer: request.bearer.clone(),
        }
    }
}

#[async_trait]
impl ApiTransport for MockTransport {
    fn name(&self) -> &str {
        "mock"
    }

    async fn send(&self, request: ApiRequest) -> ClientResult<ApiResponse> {
        let recorded = Self::record(&request);

        let route = self.with_state(|s| {
            s.requests.push(recorded.clone());
            s.routes
                .iter()
                .rev()
                .find(|r| r.method == recorded.method && r.path == recorded.path)
                .cloned()
        });

        tracing::debug!(method = %recorded.method, path = %recorded.path, "Mock transport request");

        if let (RequestBody::Multipart(form), Some(reporter)) = (&request.body, &request.progress) {
            reporter.start(form.total_bytes());
            reporter.finish();
        }

        let Some(route) = route else {
            return Ok(ApiResponse::json(
                404,
                &serde_json::json!({ "status": "error", "error": "not found" }),
            ));
        };

        if let Some(delay) = route.delay {
            tokio::time::sleep(delay).await;
        }

        Ok((route.responder)(&recorded))
    }
}
