//! Registration screen

use defect_control_shared::models::RegisterUser;
use defect_control_shared::validation::{validate_form, FieldError};

use super::ViewScope;
use crate::api::ApiClient;
use crate::error::{ClientError, ClientResult};
use crate::routes::Route;

/// Message shown when registration fails without a server explanation
pub const REGISTER_FAILED: &str = "Registration failed";

/// Registration form state
#[derive(Debug, Default)]
pub struct RegisterView {
    scope: ViewScope,

    /// Form fields
    pub form: RegisterUser,

    /// Per-field validation errors from the last attempt
    pub field_errors: Vec<FieldError>,

    /// Inline error from the last attempt
    pub error: Option<String>,
}

impl RegisterView {
    /// Creates an empty form
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for unmounting from elsewhere
    pub fn scope(&self) -> &ViewScope {
        &self.scope
    }

    /// Validates and submits the form
    ///
    /// Returns the sign-in route on success. Invalid input sends nothing.
    pub async fn submit(&mut self, client: &ApiClient) -> Option<Route> {
        self.error = None;
        self.field_errors.clear();

        let form = RegisterUser {
            name: self.form.name.trim().to_string(),
            email: self.form.email.trim().to_string(),
            password: self.form.password.clone(),
        };

        match self.scope.run(register(client, &form)).await? {
            Ok(_) => {
                tracing::info!(email = %form.email, "Account registered");
                self.form = RegisterUser::default();
                Some(Route::Login)
            }
            Err(ClientError::Validation(errors)) => {
                self.field_errors = errors;
                None
            }
            Err(e) => {
                tracing::info!(email = %form.email, error = %e, "Registration failed");
                self.error = Some(e.user_message(REGISTER_FAILED));
                None
            }
        }
    }

    /// Unmounts the view
    pub fn unmount(&self) {
        self.scope.unmount();
    }
}

async fn register(client: &ApiClient, form: &RegisterUser) -> ClientResult<serde_json::Value> {
    validate_form(form)?;
    client.post("/auth/register", form).await
}
