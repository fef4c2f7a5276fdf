//! Configured API client
//!
//! Every request goes through [`ApiClient`]: it reads the bearer token from the
//! token store, hands the request to the transport, turns non-2xx responses
//! into [`ClientError::Api`] with the server's message, and decodes 2xx bodies
//! through the envelope boundary.
//!
//! # Example
//!
//! ```no_run
//! use defect_control_client::api::ApiClient;
//! use defect_control_client::config::ClientConfig;
//! use defect_control_shared::models::Project;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ApiClient::from_config(&ClientConfig::load()?)?;
//! let projects: Vec<Project> = client.get_list("/projects", &[]).await?;
//! println!("{} projects", projects.len());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use bytes::Bytes;
use defect_control_shared::envelope::{decode, decode_list, error_message};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::token_store::{FileTokenStore, TokenStore};
use crate::transport::{ApiRequest, ApiResponse, ApiTransport, HttpTransport, Method, RequestBody};
use crate::upload::{MultipartForm, ProgressReporter};

/// Binary payload with its content type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryPayload {
    /// MIME type reported by the server
    pub content_type: String,

    /// Raw bytes
    pub data: Bytes,
}

/// API client shared by the session and every view
///
/// Cloning is cheap; clones share the transport and token store.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn ApiTransport>,
    tokens: Arc<dyn TokenStore>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("transport", &self.transport.name())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Creates a client over an existing transport and token store
    pub fn new(transport: Arc<dyn ApiTransport>, tokens: Arc<dyn TokenStore>) -> Self {
        Self { transport, tokens }
    }

    /// Creates an HTTP client with a file-backed token store
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn from_config(config: &ClientConfig) -> ClientResult<Self> {
        let transport = HttpTransport::new(config)?;
        let tokens = FileTokenStore::new(config.token_path.clone());
        Ok(Self::new(Arc::new(transport), Arc::new(tokens)))
    }

    /// Token store backing this client
    pub fn tokens(&self) -> &dyn TokenStore {
        self.tokens.as_ref()
    }

    /// Sends a request with the stored token and checks its status
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` for non-2xx responses and transport or token
    /// store errors as they occur.
    pub async fn execute(&self, request: ApiRequest) -> ClientResult<ApiResponse> {
        let request = request.bearer(self.tokens.load()?);
        let method = request.method.clone();
        let path = request.path.clone();

        let response = self.transport.send(request).await.map_err(|e| {
            tracing::warn!(method = %method, path = %path, error = %e, "Request failed");
            e
        })?;

        if !response.is_success() {
            let message = error_message(&response.body).unwrap_or_else(|| status_text(response.status));
            tracing::debug!(
                method = %method,
                path = %path,
                status = response.status,
                message = %message,
                "API returned an error"
            );
            return Err(ClientError::Api {
                status: response.status,
                message,
            });
        }

        Ok(response)
    }

    /// GET a single record
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-2xx status or a payload of
    /// the wrong shape.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let response = self.execute(ApiRequest::new(Method::GET, path)).await?;
        Ok(decode(&response.body)?)
    }

    /// GET a list; a `null` payload is an empty list
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-2xx status or a payload of
    /// the wrong shape.
    pub async fn get_list<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> ClientResult<Vec<T>> {
        let request = query
            .iter()
            .fold(ApiRequest::new(Method::GET, path), |req, (k, v)| req.query(*k, *v));

        let response = self.execute(request).await?;
        Ok(decode_list(&response.body)?)
    }

    /// POST a JSON body
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-2xx status or a payload of
    /// the wrong shape.
    pub async fn post<B, T>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(Method::POST, path, body).await
    }

    /// PATCH a JSON body
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-2xx status or a payload of
    /// the wrong shape.
    pub async fn patch<B, T>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(Method::PATCH, path, body).await
    }

    async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let json = serde_json::to_value(body).map_err(|e| ClientError::Decode(e.to_string()))?;
        let request = ApiRequest::new(method, path).body(RequestBody::Json(json));

        let response = self.execute(request).await?;
        Ok(decode(&response.body)?)
    }

    /// POST a multipart form; the response is decoded as a list
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-2xx status or a payload of
    /// the wrong shape.
    pub async fn upload<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        form: MultipartForm,
        progress: Option<ProgressReporter>,
    ) -> ClientResult<Vec<T>> {
        let files = form.files.len();
        let bytes = form.total_bytes();

        let request = query
            .iter()
            .fold(ApiRequest::new(Method::POST, path), |req, (k, v)| req.query(*k, *v))
            .body(RequestBody::Multipart(form))
            .progress(progress);

        let response = self.execute(request).await?;
        tracing::info!(path = %path, files, bytes, "Upload complete");

        Ok(decode_list(&response.body)?)
    }

    /// GET raw bytes with the bearer token, bypassing envelope decoding
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or non-2xx status.
    pub async fn get_bytes(&self, path: &str) -> ClientResult<BinaryPayload> {
        let response = self.execute(ApiRequest::new(Method::GET, path)).await?;

        Ok(BinaryPayload {
            content_type: response
                .content_type
                .unwrap_or_else(|| "application/octet-stream".to_string()),
            data: response.body,
        })
    }
}

fn status_text(status: u16) -> String {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", status))
}
