//! Project list screen

use defect_control_shared::auth::Capability;
use defect_control_shared::models::{Identity, Project};

use super::{Loadable, ViewScope, LOAD_FAILED};
use crate::api::ApiClient;

/// Project list state
#[derive(Debug, Default)]
pub struct ProjectListView {
    scope: ViewScope,

    /// Projects, in server order
    pub projects: Loadable<Vec<Project>>,

    /// Whether the "new project" action is offered
    pub can_create: bool,
}

impl ProjectListView {
    /// Creates the view for the signed-in user
    pub fn new(user: Option<&Identity>) -> Self {
        Self {
            can_create: user.map(|u| u.role.can(Capability::CreateProject)).unwrap_or(false),
            ..Self::default()
        }
    }

    /// Handle for unmounting from elsewhere
    pub fn scope(&self) -> &ViewScope {
        &self.scope
    }

    /// Fetches the project list
    pub async fn load(&mut self, client: &ApiClient) {
        let Some(result) = self.scope.run(client.get_list::<Project>("/projects", &[])).await else {
            return;
        };

        self.projects = match result {
            Ok(projects) => {
                tracing::debug!(count = projects.len(), "Projects loaded");
                Loadable::Ready(projects)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load projects");
                Loadable::Failed(LOAD_FAILED.to_string())
            }
        };
    }

    /// Whether the list loaded and is empty
    pub fn is_empty(&self) -> bool {
        self.projects.ready().map(Vec::is_empty).unwrap_or(false)
    }

    /// Unmounts the view
    pub fn unmount(&self) {
        self.scope.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token_store::MemoryTokenStore;
    use crate::transport::{Method, MockTransport};
    use defect_control_shared::models::Role;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn client(mock: &MockTransport) -> ApiClient {
        ApiClient::new(Arc::new(mock.clone()), Arc::new(MemoryTokenStore::with_token("T1")))
    }

    fn user(role: Role) -> Identity {
        Identity {
            id: 1,
            name: "A".to_string(),
            email: "a@b.com".to_string(),
            role,
            created_at: None,
        }
    }

    #[tokio::test]
    async fn test_load_projects() {
        let mock = MockTransport::new();
        mock.on_json(
            Method::GET,
            "/projects",
            200,
            json!({"status": "ok", "data": [{"id": 1, "name": "Tower A", "address": "Main st. 1"}]}),
        );

        let mut view = ProjectListView::new(Some(&user(Role::Engineer)));
        assert!(view.projects.is_loading());
        view.load(&client(&mock)).await;

        assert_eq!(view.projects.ready().unwrap()[0].name, "Tower A");
        assert!(!view.can_create);
        assert!(!view.is_empty());
    }

    #[tokio::test]
    async fn test_empty_and_failed_states() {
        let mock = MockTransport::new();
        mock.on_json(Method::GET, "/projects", 200, json!({"status": "ok", "data": null}));

        let mut view = ProjectListView::new(Some(&user(Role::Manager)));
        view.load(&client(&mock)).await;
        assert!(view.is_empty());
        assert!(view.can_create);

        mock.on_json(Method::GET, "/projects", 500, json!({"error": "db down"}));
        view.load(&client(&mock)).await;
        assert_eq!(view.projects.error(), Some(LOAD_FAILED));
    }

    #[tokio::test(start_paused = true)]
    async fn test_result_ignored_after_unmount() {
        let mock = MockTransport::new();
        mock.on_json(Method::GET, "/projects", 200, json!([]))
            .delay(Method::GET, "/projects", Duration::from_secs(1));

        let mut view = ProjectListView::new(None);
        let scope = view.scope().clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            scope.unmount();
        });

        view.load(&client(&mock)).await;
        assert!(view.projects.is_loading());
    }
}
