//! Reqwest-backed transport
//!
//! Resolves request paths against the configured API root, attaches the bearer
//! token, and streams multipart file parts in fixed-size chunks so upload
//! progress can be reported as the body is consumed. No timeout, retry or
//! backoff is applied.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Url};

use super::{ApiRequest, ApiResponse, ApiTransport, RequestBody};
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::upload::{chunk_bytes, FileUpload, MultipartForm, ProgressReporter};

/// HTTP transport against a single API root
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
    chunk_size: usize,
}

impl HttpTransport {
    /// Builds a transport from client configuration
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Config` for an invalid API root and
    /// `ClientError::Transport` if the reqwest client cannot be constructed.
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        config.validate()?;

        let client = Client::builder()
            .user_agent(concat!("defect-control/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url()?,
            chunk_size: config.upload_chunk_size,
        })
    }

    /// API root every path is resolved against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves a request path below the API root
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Transport` if the path does not form a valid URL.
    pub fn endpoint(&self, path: &str) -> ClientResult<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ClientError::Transport(format!("invalid path {}: {}", path, e)))
    }

    fn multipart(&self, form: MultipartForm, progress: Option<ProgressReporter>) -> ClientResult<Form> {
        if let Some(reporter) = &progress {
            reporter.start(form.total_bytes());
        }

        let field = form.field;
        form.files.into_iter().try_fold(Form::new(), |multipart, file| -> ClientResult<Form> {
            let part = self.file_part(file, progress.clone())?;
            Ok(multipart.part(field.clone(), part))
        })
    }

    fn file_part(&self, file: FileUpload, progress: Option<ProgressReporter>) -> ClientResult<Part> {
        let length = file.data.len() as u64;
        let chunks = chunk_bytes(&file.data, self.chunk_size);

        let body = stream::iter(chunks).map(move |chunk| {
            if let Some(reporter) = &progress {
                reporter.advance(chunk.len() as u64);
            }
            Ok::<_, std::io::Error>(chunk)
        });

        Ok(Part::stream_with_length(Body::wrap_stream(body), length)
            .file_name(file.file_name)
            .mime_str(&file.content_type)?)
    }
}

#[async_trait]
impl ApiTransport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    async fn send(&self, request: ApiRequest) -> ClientResult<ApiResponse> {
        let url = self.endpoint(&request.path)?;

        let mut builder = self.client.request(request.method.clone(), url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Multipart(form) => builder.multipart(self.multipart(form, request.progress.clone())?),
        };

        tracing::debug!(method = %request.method, path = %request.path, "Sending request");

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?;

        if let Some(reporter) = &request.progress {
            reporter.finish();
        }

        tracing::debug!(
            method = %request.method,
            path = %request.path,
            status,
            bytes = body.len(),
            "Response received"
        );

        Ok(ApiResponse {
            status,
            content_type,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(api_url: &str) -> HttpTransport {
        HttpTransport::new(&ClientConfig {
            api_url: api_url.to_string(),
            ..ClientConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_keeps_api_prefix() {
        let http = transport("http://localhost:8080/api/v1");
        assert_eq!(
            http.endpoint("/projects/3/defects").unwrap().as_str(),
            "http://localhost:8080/api/v1/projects/3/defects"
        );
        assert_eq!(
            http.endpoint("auth/me").unwrap().as_str(),
            "http://localhost:8080/api/v1/auth/me"
        );
    }

    #[test]
    fn test_rejects_invalid_config() {
        let result = HttpTransport::new(&ClientConfig {
            api_url: "mailto:someone".to_string(),
            ..ClientConfig::default()
        });
        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[test]
    fn test_multipart_resets_progress() {
        let http = transport("http://localhost:8080/api/v1");
        let (reporter, rx) = crate::upload::progress_channel();

        let form = MultipartForm::files(vec![FileUpload::new("a.txt", "text/plain", vec![0u8; 10])]);
        http.multipart(form, Some(reporter)).unwrap();

        assert_eq!(rx.borrow().total, 10);
        assert_eq!(rx.borrow().sent, 0);
    }
}
