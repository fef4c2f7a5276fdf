//! Navigation guards
//!
//! Guards are pure functions of the session state and are evaluated on every
//! navigation; nothing is cached. They decide what the client shows, not what
//! the server allows.

use defect_control_shared::models::Role;

use crate::routes::{Access, Route};
use crate::session::SessionState;

/// Outcome of a guard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Mount the requested view
    Allow,

    /// Session still resolving; show a placeholder
    Pending,

    /// Go somewhere else instead
    Redirect(Route),
}

/// Admits any signed-in user
pub fn authenticated_only(state: &SessionState) -> GuardDecision {
    if state.loading {
        return GuardDecision::Pending;
    }

    match state.user {
        Some(_) => GuardDecision::Allow,
        None => GuardDecision::Redirect(Route::Login),
    }
}

/// Admits signed-in users holding exactly `role`
pub fn role_restricted(state: &SessionState, role: Role) -> GuardDecision {
    if state.loading {
        return GuardDecision::Pending;
    }

    match &state.user {
        None => GuardDecision::Redirect(Route::Login),
        Some(user) if user.role != role => GuardDecision::Redirect(Route::HOME),
        Some(_) => GuardDecision::Allow,
    }
}

/// Applies the guard matching a route's access rule
pub fn evaluate(route: Route, state: &SessionState) -> GuardDecision {
    match route.access() {
        Access::Public => GuardDecision::Allow,
        Access::Authenticated => authenticated_only(state),
        Access::Role(role) => role_restricted(state, role),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use defect_control_shared::models::Identity;

    fn signed_in(role: Role) -> SessionState {
        SessionState::signed_in(Identity {
            id: 1,
            name: "A".to_string(),
            email: "a@b.com".to_string(),
            role,
            created_at: None,
        })
    }

    #[test]
    fn test_authenticated_only() {
        assert_eq!(authenticated_only(&SessionState::resolving()), GuardDecision::Pending);
        assert_eq!(
            authenticated_only(&SessionState::signed_out()),
            GuardDecision::Redirect(Route::Login)
        );
        for role in Role::ALL {
            assert_eq!(authenticated_only(&signed_in(role)), GuardDecision::Allow);
        }
    }

    #[test]
    fn test_role_restricted_redirects_every_other_role() {
        for required in Role::ALL {
            for actual in Role::ALL {
                let decision = role_restricted(&signed_in(actual), required);
                if actual == required {
                    assert_eq!(decision, GuardDecision::Allow);
                } else {
                    assert_eq!(decision, GuardDecision::Redirect(Route::Projects));
                }
            }

            assert_eq!(
                role_restricted(&SessionState::signed_out(), required),
                GuardDecision::Redirect(Route::Login)
            );
            assert_eq!(
                role_restricted(&SessionState::resolving(), required),
                GuardDecision::Pending
            );
        }
    }

    #[test]
    fn test_evaluate_by_route() {
        let anonymous = SessionState::signed_out();
        assert_eq!(evaluate(Route::Login, &anonymous), GuardDecision::Allow);
        assert_eq!(evaluate(Route::Register, &SessionState::resolving()), GuardDecision::Allow);
        assert_eq!(evaluate(Route::Profile, &anonymous), GuardDecision::Redirect(Route::Login));

        let manager = signed_in(Role::Manager);
        assert_eq!(evaluate(Route::Project(3), &manager), GuardDecision::Allow);
        assert_eq!(
            evaluate(Route::AdminUsers, &manager),
            GuardDecision::Redirect(Route::Projects)
        );
        assert_eq!(evaluate(Route::AdminUsers, &signed_in(Role::Admin)), GuardDecision::Allow);
    }
}
