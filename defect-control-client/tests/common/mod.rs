/// Common test utilities for integration tests
///
/// Spins up a small axum server that speaks the Defect Control API contract:
/// - JWT bearer tokens issued on login and checked on protected routes
/// - `{"status": ..., "data": ...}` envelopes
/// - Multipart attachment uploads, recorded for assertions
/// - Raw attachment bytes
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::extract::{Multipart, Path as UrlPath, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use defect_control_client::config::ClientConfig;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::Mutex;

const SECRET: &[u8] = b"defect-control-test-secret";

/// Password accepted by the mock login endpoint
pub const PASSWORD: &str = "secret-password";

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: u64,
    exp: usize,
}

/// File received by the mock upload endpoint
#[derive(Debug, Clone)]
pub struct ReceivedFile {
    pub project_id: u64,
    pub defect_id: Option<String>,
    pub field: String,
    pub file_name: String,
    pub content_type: String,
    pub size: usize,
}

#[derive(Clone, Default)]
struct MockState {
    uploads: Arc<Mutex<Vec<ReceivedFile>>>,
}

/// Running mock API server
pub struct MockApi {
    pub addr: SocketAddr,
    state: MockState,
}

impl MockApi {
    /// Starts the server on an ephemeral port
    pub async fn start() -> anyhow::Result<Self> {
        let state = MockState::default();

        let api = Router::new()
            .route("/auth/login", post(login))
            .route("/auth/me", get(me))
            .route("/projects", get(projects))
            .route("/projects/:id/attachments", post(upload))
            .route("/attachments/:id", get(attachment));

        let app = Router::new().nest("/api/v1", api).with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self { addr, state })
    }

    /// API root for client configuration
    pub fn api_url(&self) -> String {
        format!("http://{}/api/v1", self.addr)
    }

    /// Client configuration pointing at this server
    pub fn config(&self, token_path: &Path) -> ClientConfig {
        ClientConfig {
            api_url: self.api_url(),
            token_path: token_path.to_path_buf(),
            upload_chunk_size: 4,
            ..ClientConfig::default()
        }
    }

    /// Files received so far
    pub async fn uploads(&self) -> Vec<ReceivedFile> {
        self.state.uploads.lock().await.clone()
    }
}

/// Issues a valid bearer token for a user
pub fn issue_token(user_id: u64) -> String {
    let claims = Claims {
        sub: user_id,
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET)).unwrap()
}

fn authorize(headers: &HeaderMap) -> Option<u64> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?;
    decode::<Claims>(token, &DecodingKey::from_secret(SECRET), &Validation::default())
        .ok()
        .map(|data| data.claims.sub)
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"status": "error", "error": "unauthorized"})),
    )
        .into_response()
}

fn user_json(id: u64) -> Value {
    json!({"id": id, "name": "Anna", "email": "anna@site.com", "role": "manager"})
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["password"] != PASSWORD || body["email"] != "anna@site.com" {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"status": "error", "error": "invalid credentials"})),
        )
            .into_response();
    }

    Json(json!({"status": "ok", "data": {"token": issue_token(1)}})).into_response()
}

async fn me(headers: HeaderMap) -> Response {
    match authorize(&headers) {
        Some(id) => Json(json!({"status": "ok", "data": user_json(id)})).into_response(),
        None => unauthorized(),
    }
}

async fn projects(headers: HeaderMap) -> Response {
    if authorize(&headers).is_none() {
        return unauthorized();
    }

    Json(json!({"status": "ok", "data": [
        {"id": 1, "name": "Depot", "address": "Harbour rd. 5"},
        {"id": 2, "name": "Tower B", "address": "Main st. 1"}
    ]}))
    .into_response()
}

async fn upload(
    State(state): State<MockState>,
    UrlPath(project_id): UrlPath<u64>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    if authorize(&headers).is_none() {
        return unauthorized();
    }

    let mut created = Vec::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let data = field.bytes().await.unwrap_or_default();

        let mut uploads = state.uploads.lock().await;
        uploads.push(ReceivedFile {
            project_id,
            defect_id: query.get("defect_id").cloned(),
            field: name,
            file_name: file_name.clone(),
            content_type: content_type.clone(),
            size: data.len(),
        });

        created.push(json!({
            "id": uploads.len(),
            "filename": file_name,
            "content_type": content_type,
            "size": data.len()
        }));
    }

    (StatusCode::CREATED, Json(json!({"status": "ok", "data": created}))).into_response()
}

async fn attachment(headers: HeaderMap, UrlPath(id): UrlPath<u64>) -> Response {
    if authorize(&headers).is_none() {
        return unauthorized();
    }
    if id != 7 {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"status": "error", "error": "attachment not found"})),
        )
            .into_response();
    }

    ([(header::CONTENT_TYPE, "image/png")], vec![137u8, 80, 78, 71]).into_response()
}
