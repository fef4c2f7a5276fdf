//! Sign-in screen

use super::ViewScope;
use crate::routes::Route;
use crate::session::Session;

/// Message shown when sign-in fails without a server explanation
pub const LOGIN_FAILED: &str = "Login failed";

/// Sign-in form state
#[derive(Debug, Default)]
pub struct LoginView {
    scope: ViewScope,

    /// Email input
    pub email: String,

    /// Password input
    pub password: String,

    /// Inline error from the last attempt
    pub error: Option<String>,
}

impl LoginView {
    /// Creates an empty form
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for unmounting from elsewhere
    pub fn scope(&self) -> &ViewScope {
        &self.scope
    }

    /// Signs in with the entered credentials
    ///
    /// Returns the route to navigate to on success. On failure the error is
    /// set from the API payload's message, else a generic one. Nothing
    /// changes if the view unmounts before the server answers.
    pub async fn submit(&mut self, session: &Session) -> Option<Route> {
        self.error = None;

        let outcome = self.scope.run(session.login(&self.email, &self.password)).await?;

        match outcome {
            Ok(true) => {
                self.password.clear();
                Some(Route::HOME)
            }
            Ok(false) => {
                self.error = Some(LOGIN_FAILED.to_string());
                None
            }
            Err(e) => {
                tracing::info!(email = %self.email.trim(), error = %e, "Login failed");
                self.error = Some(e.user_message(LOGIN_FAILED));
                None
            }
        }
    }

    /// Unmounts the view
    pub fn unmount(&self) {
        self.scope.unmount();
    }
}
