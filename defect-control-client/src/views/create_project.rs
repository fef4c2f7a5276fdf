//! Project creation screen

use defect_control_shared::auth::{require_capability, Capability};
use defect_control_shared::models::{CreateProject, Identity};
use defect_control_shared::validation::{validate_form, FieldError};

use super::ViewScope;
use crate::api::ApiClient;
use crate::error::{ClientError, ClientResult};
use crate::routes::Route;

/// Message shown when creation fails without a server explanation
pub const CREATE_PROJECT_FAILED: &str = "Failed to create project";

/// Project creation form state
#[derive(Debug, Default)]
pub struct CreateProjectView {
    scope: ViewScope,

    /// Form fields
    pub form: CreateProject,

    /// Per-field validation errors from the last attempt
    pub field_errors: Vec<FieldError>,

    /// Inline error from the last attempt
    pub error: Option<String>,
}

impl CreateProjectView {
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
    /// Returns the created project's route, or the project list when the
    /// response carried no id. Roles without the capability and invalid input
    /// send nothing.
    pub async fn submit(&mut self, client: &ApiClient, user: Option<&Identity>) -> Option<Route> {
        self.error = None;
        self.field_errors.clear();

        let form = self.form.trimmed();

        match self.scope.run(create(client, user, &form)).await? {
            Ok(created) => {
                let id = created.get("id").and_then(serde_json::Value::as_u64);
                tracing::info!(project_id = ?id, name = %form.name, "Project created");
                self.form = CreateProject::default();
                Some(id.map(Route::Project).unwrap_or(Route::Projects))
            }
            Err(ClientError::Validation(errors)) => {
                self.field_errors = errors;
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Project creation failed");
                self.error = Some(e.user_message(CREATE_PROJECT_FAILED));
                None
            }
        }
    }

    /// Unmounts the view
    pub fn unmount(&self) {
        self.scope.unmount();
    }
}

async fn create(client: &ApiClient, user: Option<&Identity>, form: &CreateProject) -> ClientResult<serde_json::Value> {
    require_capability(user, Capability::CreateProject)?;
    validate_form(form)?;
    client.post("/projects", form).await
}
