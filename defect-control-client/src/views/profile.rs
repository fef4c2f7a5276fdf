//! Own-profile screen

use defect_control_shared::models::{Identity, UpdateProfile};
use defect_control_shared::validation::{validate_form, FieldError};

use super::{Loadable, Notice, ViewScope, LOAD_FAILED};
use crate::api::ApiClient;
use crate::session::Session;

/// Message shown after a successful save
pub const PROFILE_SAVED: &str = "Saved";

/// Message shown when saving fails
pub const PROFILE_SAVE_FAILED: &str = "Failed to save profile";

/// Profile state
#[derive(Debug, Default)]
pub struct ProfileView {
    scope: ViewScope,

    /// Profile as loaded
    pub profile: Loadable<Identity>,

    /// Edit form, prefilled from the loaded profile
    pub form: UpdateProfile,

    /// Per-field validation errors from the last save
    pub field_errors: Vec<FieldError>,

    /// Inline feedback from the last save
    pub notice: Option<Notice>,
}

impl ProfileView {
    /// Creates the view
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for unmounting from elsewhere
    pub fn scope(&self) -> &ViewScope {
        &self.scope
    }

    /// Fetches the profile and prefills the form
    pub async fn load(&mut self, client: &ApiClient) {
        let Some(result) = self.scope.run(client.get::<Identity>("/users/me")).await else {
            return;
        };

        self.profile = match result {
            Ok(profile) => {
                self.form = UpdateProfile {
                    name: profile.name.clone(),
                    email: profile.email.clone(),
                };
                Loadable::Ready(profile)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load profile");
                Loadable::Failed(LOAD_FAILED.to_string())
            }
        };
    }

    /// Validates and saves the form, then refreshes the session identity
    pub async fn save(&mut self, session: &Session) -> bool {
        self.notice = None;
        self.field_errors.clear();

        let form = self.form.trimmed();
        if let Err(errors) = validate_form(&form) {
            self.field_errors = errors;
            return false;
        }

        let request = session.client().patch::<_, Identity>("/users/me", &form);
        match self.scope.run(request).await {
            None => false,
            Some(Ok(updated)) => {
                tracing::info!(user_id = updated.id, "Profile saved");
                session.set_user(updated.clone());
                self.form = form;
                self.profile = Loadable::Ready(updated);
                self.notice = Some(Notice::Info(PROFILE_SAVED.to_string()));
                true
            }
            Some(Err(e)) => {
                tracing::warn!(error = %e, "Profile save failed");
                self.notice = Some(Notice::Error(PROFILE_SAVE_FAILED.to_string()));
                false
            }
        }
    }

    /// Unmounts the view
    pub fn unmount(&self) {
        self.scope.unmount();
    }
}
