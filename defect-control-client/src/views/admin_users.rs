//! User administration screen
//!
//! Role changes are two-step: a request records the pending change and asks
//! for confirmation; confirming sends exactly one `PATCH /users/:id` with
//! `{"role": ...}`. Changing one's own role is refused with an alert before
//! anything is sent.

use defect_control_shared::auth::{ensure_not_self, require_role};
use defect_control_shared::models::{Identity, Role, RoleUpdate, UserId};

use super::{Loadable, Notice, ViewScope};
use crate::api::ApiClient;
use crate::error::{ClientError, ClientResult};

/// Message shown when the user list cannot be loaded
pub const USERS_LOAD_FAILED: &str = "Failed to load users";

/// Alert shown when a role change fails
pub const ROLE_CHANGE_FAILED: &str = "Failed to change role";

/// Role change awaiting confirmation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRoleChange {
    /// Target user
    pub user_id: UserId,

    /// Target's display name
    pub name: String,

    /// Role to assign
    pub role: Role,
}

impl PendingRoleChange {
    /// Confirmation prompt
    pub fn prompt(&self) -> String {
        format!("Change role of {} to {}?", self.name, self.role)
    }
}

/// Outcome of asking for a role change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleChangeStep {
    /// Waiting for the user to confirm
    AwaitingConfirmation(PendingRoleChange),

    /// Refused locally; nothing will be sent
    Refused,
}

/// User administration state
#[derive(Debug, Default)]
pub struct AdminUsersView {
    scope: ViewScope,

    /// Users sorted by id
    pub users: Loadable<Vec<Identity>>,

    /// Role change awaiting confirmation
    pub pending: Option<PendingRoleChange>,

    /// Feedback from the last action
    pub notice: Option<Notice>,
}

impl AdminUsersView {
    /// Creates the view
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for unmounting from elsewhere
    pub fn scope(&self) -> &ViewScope {
        &self.scope
    }

    /// Fetches all users, sorted by id
    pub async fn load(&mut self, client: &ApiClient) {
        let Some(result) = self.scope.run(client.get_list::<Identity>("/users", &[])).await else {
            return;
        };

        self.users = match result {
            Ok(mut users) => {
                users.sort_by_key(|u| u.id);
                Loadable::Ready(users)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load users");
                Loadable::Failed(USERS_LOAD_FAILED.to_string())
            }
        };
    }

    /// Asks to change a user's role
    ///
    /// Targeting oneself is refused with an alert; otherwise the change waits
    /// for [`AdminUsersView::confirm`].
    pub fn request_role_change(&mut self, actor: &Identity, user_id: UserId, role: Role) -> RoleChangeStep {
        self.notice = None;

        if let Err(e) = ensure_not_self(actor, user_id) {
            self.pending = None;
            self.notice = Some(Notice::Alert(e.to_string()));
            return RoleChangeStep::Refused;
        }

        let name = self
            .users
            .ready()
            .and_then(|users| users.iter().find(|u| u.id == user_id))
            .map(Identity::label)
            .unwrap_or_else(|| format!("#{}", user_id));

        let pending = PendingRoleChange { user_id, name, role };
        self.pending = Some(pending.clone());
        RoleChangeStep::AwaitingConfirmation(pending)
    }

    /// Drops the pending change
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    /// Sends the pending role change
    ///
    /// Returns `true` when the server accepted it and the row was updated.
    pub async fn confirm(&mut self, client: &ApiClient, actor: &Identity) -> bool {
        let Some(pending) = self.pending.take() else {
            return false;
        };

        match self.scope.run(change_role(client, actor, &pending)).await {
            None => false,
            Some(Ok(())) => {
                tracing::info!(
                    actor_id = actor.id,
                    user_id = pending.user_id,
                    role = %pending.role,
                    "Role changed"
                );
                if let Some(users) = self.users.ready_mut() {
                    if let Some(user) = users.iter_mut().find(|u| u.id == pending.user_id) {
                        user.role = pending.role;
                    }
                    users.sort_by_key(|u| u.id);
                }
                self.notice = None;
                true
            }
            Some(Err(e @ ClientError::Authz(_))) => {
                self.notice = Some(Notice::Alert(e.user_message(ROLE_CHANGE_FAILED)));
                false
            }
            Some(Err(e)) => {
                tracing::warn!(user_id = pending.user_id, error = %e, "Role change failed");
                self.notice = Some(Notice::Alert(ROLE_CHANGE_FAILED.to_string()));
                false
            }
        }
    }

    /// Unmounts the view
    pub fn unmount(&self) {
        self.scope.unmount();
    }
}

async fn change_role(client: &ApiClient, actor: &Identity, pending: &PendingRoleChange) -> ClientResult<()> {
    require_role(Some(actor), Role::Admin)?;
    ensure_not_self(actor, pending.user_id)?;

    let path = format!("/users/{}", pending.user_id);
    client
        .patch::<_, serde_json::Value>(&path, &RoleUpdate { role: pending.role })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token_store::MemoryTokenStore;
    use crate::transport::{Method, MockTransport};
    use serde_json::json;
    use std::sync::Arc;

    fn client(mock: &MockTransport) -> ApiClient {
        ApiClient::new(Arc::new(mock.clone()), Arc::new(MemoryTokenStore::with_token("T1")))
    }

    fn admin() -> Identity {
        Identity {
            id: 1,
            name: "Root".to_string(),
            email: "root@b.com".to_string(),
            role: Role::Admin,
            created_at: None,
        }
    }

    fn mock_users(mock: &MockTransport) {
        mock.on_json(
            Method::GET,
            "/users",
            200,
            json!({"status": "ok", "data": [
                {"id": 3, "name": "Olga", "email": "o@b.com", "role": "engineer"},
                {"id": 1, "name": "Root", "email": "root@b.com", "role": "admin"},
                {"id": 2, "name": "Ivan", "email": "i@b.com", "role": "engineer"}
            ]}),
        );
    }

    #[tokio::test]
    async fn test_users_sorted_by_id() {
        let mock = MockTransport::new();
        mock_users(&mock);

        let mut view = AdminUsersView::new();
        view.load(&client(&mock)).await;

        let ids: Vec<_> = view.users.ready().unwrap().iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_change_role_sends_one_patch() {
        let mock = MockTransport::new();
        mock_users(&mock);
        mock.on_json(
            Method::PATCH,
            "/users/2",
            200,
            json!({"status": "ok", "data": {"id": 2, "name": "Ivan", "role": "manager"}}),
        );

        let api = client(&mock);
        let mut view = AdminUsersView::new();
        view.load(&api).await;

        let step = view.request_role_change(&admin(), 2, Role::Manager);
        let RoleChangeStep::AwaitingConfirmation(pending) = step else {
            panic!("expected confirmation");
        };
        assert_eq!(pending.prompt(), "Change role of Ivan to manager?");
        assert_eq!(mock.count(Method::PATCH, "/users/2"), 0);

        assert!(view.confirm(&api, &admin()).await);

        let patches = mock.requests_to(Method::PATCH, "/users/2");
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].json, Some(json!({"role": "manager"})));
        assert_eq!(view.users.ready().unwrap()[1].role, Role::Manager);
        assert!(view.pending.is_none());

        // Nothing left to confirm
        assert!(!view.confirm(&api, &admin()).await);
        assert_eq!(mock.count(Method::PATCH, "/users/2"), 1);
    }

    #[tokio::test]
    async fn test_own_role_change_refused() {
        let mock = MockTransport::new();
        mock_users(&mock);

        let api = client(&mock);
        let mut view = AdminUsersView::new();
        view.load(&api).await;

        assert_eq!(view.request_role_change(&admin(), 1, Role::Engineer), RoleChangeStep::Refused);
        assert_eq!(
            view.notice,
            Some(Notice::Alert("You cannot change your own role".to_string()))
        );

        // A pending change aimed at oneself is refused at confirmation too
        view.pending = Some(PendingRoleChange {
            user_id: 1,
            name: "Root".to_string(),
            role: Role::Engineer,
        });
        assert!(!view.confirm(&api, &admin()).await);
        assert_eq!(
            view.notice,
            Some(Notice::Alert("You cannot change your own role".to_string()))
        );

        assert_eq!(mock.count(Method::PATCH, "/users/1"), 0);
        assert_eq!(view.users.ready().unwrap()[0].role, Role::Admin);
    }

    #[tokio::test]
    async fn test_cancel_and_failure() {
        let mock = MockTransport::new();
        mock_users(&mock);
        mock.on_json(Method::PATCH, "/users/3", 500, json!({"error": "boom"}));

        let api = client(&mock);
        let mut view = AdminUsersView::new();
        view.load(&api).await;

        view.request_role_change(&admin(), 3, Role::Admin);
        view.cancel();
        assert!(!view.confirm(&api, &admin()).await);
        assert_eq!(mock.count(Method::PATCH, "/users/3"), 0);

        view.request_role_change(&admin(), 3, Role::Admin);
        assert!(!view.confirm(&api, &admin()).await);
        assert_eq!(view.notice, Some(Notice::Alert(ROLE_CHANGE_FAILED.to_string())));
        assert_eq!(view.users.ready().unwrap()[2].role, Role::Engineer);
    }

    #[tokio::test]
    async fn test_load_failure() {
        let mock = MockTransport::new();
        let mut view = AdminUsersView::new();
        view.load(&client(&mock)).await;
        assert_eq!(view.users.error(), Some(USERS_LOAD_FAILED));
    }
}
