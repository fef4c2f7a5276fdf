//! Authenticated session
//!
//! A [`Session`] is created once at startup and passed explicitly to everything
//! that needs the signed-in identity. Its state is published on a watch
//! channel so the shell can re-render when the identity changes.
//!
//! # Lifecycle
//!
//! ```text
//! Session::new()      loading = true, user = none
//!   └─> initialize()  resolves /auth/me once if a token is stored
//!                     any failure clears the token silently
//!                     loading = false
//! login()             stores the token, resolves the identity
//! logout()            clears token and identity
//! ```
//!
//! # Example
//!
//! ```no_run
//! use defect_control_client::{api::ApiClient, config::ClientConfig, session::Session};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ApiClient::from_config(&ClientConfig::load()?)?;
//! let session = Session::start(client).await;
//!
//! if session.login("a@b.com", "secret").await? {
//!     println!("Signed in as {:?}", session.user());
//! }
//! session.logout();
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use defect_control_shared::models::{Identity, LoginRequest, LoginResponse};
use tokio::sync::watch;

use crate::api::ApiClient;
use crate::error::ClientResult;

/// Snapshot of the session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Signed-in identity, if any
    pub user: Option<Identity>,

    /// True only while the stored token is being validated at startup
    pub loading: bool,
}

impl SessionState {
    /// Resolved state with the given identity
    pub fn signed_in(user: Identity) -> Self {
        Self {
            user: Some(user),
            loading: false,
        }
    }

    /// Resolved state with nobody signed in
    pub fn signed_out() -> Self {
        Self::default()
    }

    /// State while the stored token is being validated
    pub fn resolving() -> Self {
        Self {
            user: None,
            loading: true,
        }
    }
}

/// Session context shared by the shell and views
///
/// Cloning is cheap; clones observe and mutate the same state.
#[derive(Debug, Clone)]
pub struct Session {
    client: ApiClient,
    state: Arc<watch::Sender<SessionState>>,
}

impl Session {
    /// Creates an unresolved session; call [`Session::initialize`] next
    pub fn new(client: ApiClient) -> Self {
        let (tx, _rx) = watch::channel(SessionState::resolving());
        Self {
            client,
            state: Arc::new(tx),
        }
    }

    /// Creates a session and resolves any stored token
    pub async fn start(client: ApiClient) -> Self {
        let session = Self::new(client);
        session.initialize().await;
        session
    }

    /// Resolves the stored token into an identity, once
    ///
    /// Never fails: an unreadable, expired or rejected token leaves the
    /// session signed out with the token cleared.
    pub async fn initialize(&self) {
        let token = match self.client.tokens().load() {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read stored token");
                None
            }
        };

        if token.is_none() {
            self.state.send_replace(SessionState::signed_out());
            return;
        }

        match self.client.get::<Identity>("/auth/me").await {
            Ok(user) => {
                tracing::info!(user_id = user.id, role = %user.role, "Session restored");
                self.state.send_replace(SessionState::signed_in(user));
            }
            Err(e) if e.is_unauthorized() => {
                tracing::info!("Stored token rejected, signing out");
                self.clear_token();
                self.state.send_replace(SessionState::signed_out());
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not resolve stored token, signing out");
                self.clear_token();
                self.state.send_replace(SessionState::signed_out());
            }
        }
    }

    /// Exchanges credentials for a token and resolves the identity
    ///
    /// Returns `Ok(false)` when the server answered without a token.
    ///
    /// # Errors
    ///
    /// Returns the API error for rejected credentials. If the follow-up
    /// identity lookup fails, the new token is cleared and that error is
    /// returned.
    pub async fn login(&self, email: &str, password: &str) -> ClientResult<bool> {
        let request = LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };

        let response: LoginResponse = self.client.post("/auth/login", &request).await?;

        let Some(token) = response.bearer_token() else {
            tracing::warn!(email = %request.email, "Login response carried no token");
            return Ok(false);
        };

        self.client.tokens().save(token)?;

        let user = match response.user {
            Some(user) => user,
            None => match self.client.get::<Identity>("/auth/me").await {
                Ok(user) => user,
                Err(e) => {
                    tracing::warn!(error = %e, "Identity lookup after login failed");
                    self.clear_token();
                    return Err(e);
                }
            },
        };

        tracing::info!(user_id = user.id, role = %user.role, "Signed in");
        self.state.send_replace(SessionState::signed_in(user));
        Ok(true)
    }

    /// Clears the token and identity
    pub fn logout(&self) {
        self.clear_token();
        self.state.send_replace(SessionState::signed_out());
        tracing::info!("Signed out");
    }

    /// Replaces the signed-in identity, e.g. after a profile edit
    pub fn set_user(&self, user: Identity) {
        self.state.send_modify(|state| state.user = Some(user));
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Signed-in identity, if any
    pub fn user(&self) -> Option<Identity> {
        self.state.borrow().user.clone()
    }

    /// Whether the stored token is still being validated
    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    /// Receiver that observes every state change
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// API client this session authenticates
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    fn clear_token(&self) {
        if let Err(e) = self.client.tokens().clear() {
            tracing::warn!(error = %e, "Could not clear stored token");
        }
    }
}
