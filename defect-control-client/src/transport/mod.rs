//! Transport seam between the API client and the network
//!
//! The [`ApiClient`](crate::api::ApiClient) turns typed calls into
//! [`ApiRequest`]s and hands them to an [`ApiTransport`]. Two transports exist:
//!
//! - [`HttpTransport`]: reqwest against the configured API root
//! - [`MockTransport`]: scripted responses that record every request
//!
//! # Transport Contract
//!
//! A transport must:
//! 1. Resolve `path` against its API root and append `query`
//! 2. Send `Authorization: Bearer <token>` when `bearer` is set
//! 3. Report multipart bytes to `progress` when one is attached
//! 4. Return every HTTP response as-is, success or not
//!
//! Only failures to obtain a response at all are errors. Status handling and
//! envelope decoding belong to the client.

pub mod http;
pub mod mock;

pub use http::HttpTransport;
pub use mock::{MockTransport, RecordedRequest};
pub use reqwest::Method;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value as JsonValue;

use crate::error::ClientResult;
use crate::upload::{MultipartForm, ProgressReporter};

/// Request body
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    /// No body
    #[default]
    Empty,

    /// JSON document
    Json(JsonValue),

    /// Multipart file upload
    Multipart(MultipartForm),
}

/// Outgoing API request, relative to the API root
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// HTTP method
    pub method: Method,

    /// Path below the API root, e.g. `/projects/3/defects`
    pub path: String,

    /// Query parameters in order
    pub query: Vec<(String, String)>,

    /// Body
    pub body: RequestBody,

    /// Bearer token to attach
    pub bearer: Option<String>,

    /// Upload progress sink for multipart bodies
    pub progress: Option<ProgressReporter>,
}

impl ApiRequest {
    /// Creates a request with no query, body or token
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
            bearer: None,
            progress: None,
        }
    }

    /// Appends a query parameter
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Sets the body
    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    /// Sets the bearer token
    pub fn bearer(mut self, token: Option<String>) -> Self {
        self.bearer = token;
        self
    }

    /// Attaches an upload progress sink
    pub fn progress(mut self, reporter: Option<ProgressReporter>) -> Self {
        self.progress = reporter;
        self
    }
}

/// Raw API response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    /// HTTP status code
    pub status: u16,

    /// `Content-Type` header, when present
    pub content_type: Option<String>,

    /// Response body
    pub body: Bytes,
}

impl ApiResponse {
    /// Creates a JSON response
    pub fn json(status: u16, body: &JsonValue) -> Self {
        Self {
            status,
            content_type: Some("application/json".to_string()),
            body: Bytes::from(body.to_string()),
        }
    }

    /// Creates a binary response
    pub fn bytes(status: u16, content_type: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            content_type: Some(content_type.into()),
            body: body.into(),
        }
    }

    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends API requests
///
/// Implementations must be safe to share between concurrently running views.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    /// Transport name, for logs
    fn name(&self) -> &str;

    /// Sends one request and returns the response, whatever its status
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Transport` when no response was obtained.
    async fn send(&self, request: ApiRequest) -> ClientResult<ApiResponse>;
}
