//! Role capabilities and permission checks
//!
//! Mirrors the API's role rules so the client can hide actions a user cannot
//! perform and refuse obviously invalid requests before sending them.
//!
//! # Permission Model
//!
//! | Capability          | Engineer | Manager | Admin |
//! |---------------------|----------|---------|-------|
//! | Create project      |          | yes     | yes   |
//! | Report defect       | yes      | yes     | yes   |
//! | Upload attachment   | yes      | yes     | yes   |
//! | Comment             | yes      | yes     | yes   |
//! | Manage users        |          |         | yes   |
//!
//! # Example
//!
//! ```
//! use defect_control_shared::auth::authorization::{require_capability, require_role, Capability};
//! use defect_control_shared::models::user::{Identity, Role};
//!
//! let me = Identity {
//!     id: 1,
//!     name: "A".to_string(),
//!     email: "a@b.com".to_string(),
//!     role: Role::Manager,
//!     created_at: None,
//! };
//!
//! assert!(require_capability(Some(&me), Capability::CreateProject).is_ok());
//! assert!(require_role(Some(&me), Role::Admin).is_err());
//! ```

use crate::models::user::{Identity, Role, UserId};

/// Error type for authorization checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// Nobody is signed in
    #[error("Not signed in")]
    NotAuthenticated,

    /// User doesn't hold the required role
    #[error("Insufficient permissions: requires {required}, has {actual}")]
    InsufficientRole {
        required: Role,
        actual: Role,
    },

    /// User's role doesn't grant the capability
    #[error("Role {role} cannot {capability}")]
    MissingCapability {
        role: Role,
        capability: Capability,
    },

    /// User tried to change their own role
    #[error("You cannot change your own role")]
    SelfRoleChange,
}

/// Actions gated by role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Create a new project
    CreateProject,

    /// Report a defect in a project
    ReportDefect,

    /// Upload files to a defect
    UploadAttachment,

    /// Comment on a defect
    Comment,

    /// List users and change their roles
    ManageUsers,
}

impl Capability {
    /// Roles that hold this capability
    pub fn allowed_roles(&self) -> &'static [Role] {
        match self {
            Capability::CreateProject => &[Role::Manager, Role::Admin],
            Capability::ReportDefect | Capability::UploadAttachment | Capability::Comment => {
                &[Role::Engineer, Role::Manager, Role::Admin]
            }
            Capability::ManageUsers => &[Role::Admin],
        }
    }

    fn verb(&self) -> &'static str {
        match self {
            Capability::CreateProject => "create projects",
            Capability::ReportDefect => "report defects",
            Capability::UploadAttachment => "upload attachments",
            Capability::Comment => "comment",
            Capability::ManageUsers => "manage users",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.verb())
    }
}

impl Role {
    /// Checks whether this role grants a capability
    pub fn can(&self, capability: Capability) -> bool {
        capability.allowed_roles().contains(self)
    }
}

/// Checks that the signed-in user holds exactly the given role
///
/// # Errors
///
/// Returns `AuthzError::NotAuthenticated` when nobody is signed in and
/// `AuthzError::InsufficientRole` when the role differs.
pub fn require_role(identity: Option<&Identity>, required: Role) -> Result<(), AuthzError> {
    let identity = identity.ok_or(AuthzError::NotAuthenticated)?;

    if identity.role != required {
        return Err(AuthzError::InsufficientRole {
            required,
            actual: identity.role,
        });
    }

    Ok(())
}

/// Checks that the signed-in user's role grants a capability
///
/// # Errors
///
/// Returns `AuthzError::NotAuthenticated` when nobody is signed in and
/// `AuthzError::MissingCapability` when the role lacks the capability.
pub fn require_capability(identity: Option<&Identity>, capability: Capability) -> Result<(), AuthzError> {
    let identity = identity.ok_or(AuthzError::NotAuthenticated)?;

    if !identity.role.can(capability) {
        return Err(AuthzError::MissingCapability {
            role: identity.role,
            capability,
        });
    }

    Ok(())
}

/// Refuses actions an administrator must not perform on their own account
///
/// # Errors
///
/// Returns `AuthzError::SelfRoleChange` when `target` is the actor.
pub fn ensure_not_self(actor: &Identity, target: UserId) -> Result<(), AuthzError> {
    if actor.id == target {
        return Err(AuthzError::SelfRoleChange);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(id: UserId, role: Role) -> Identity {
        Identity {
            id,
            name: format!("user-{}", id),
            email: format!("user{}@example.com", id),
            role,
            created_at: None,
        }
    }

    #[test]
    fn test_capability_matrix() {
        assert!(!Role::Engineer.can(Capability::CreateProject));
        assert!(Role::Manager.can(Capability::CreateProject));
        assert!(Role::Admin.can(Capability::CreateProject));

        for role in Role::ALL {
            assert!(role.can(Capability::ReportDefect));
            assert!(role.can(Capability::UploadAttachment));
            assert!(role.can(Capability::Comment));
        }

        assert!(!Role::Manager.can(Capability::ManageUsers));
        assert!(Role::Admin.can(Capability::ManageUsers));
    }

    #[test]
    fn test_require_role() {
        assert_eq!(require_role(None, Role::Admin), Err(AuthzError::NotAuthenticated));
        assert!(require_role(Some(&identity(1, Role::Admin)), Role::Admin).is_ok());

        for role in [Role::Engineer, Role::Manager] {
            assert_eq!(
                require_role(Some(&identity(1, role)), Role::Admin),
                Err(AuthzError::InsufficientRole {
                    required: Role::Admin,
                    actual: role,
                })
            );
        }
    }

    #[test]
    fn test_require_capability() {
        let engineer = identity(2, Role::Engineer);
        let err = require_capability(Some(&engineer), Capability::CreateProject).unwrap_err();
        assert_eq!(err.to_string(), "Role engineer cannot create projects");

        assert!(require_capability(Some(&engineer), Capability::Comment).is_ok());
        assert_eq!(
            require_capability(None, Capability::Comment),
            Err(AuthzError::NotAuthenticated)
        );
    }

    #[test]
    fn test_ensure_not_self() {
        let admin = identity(7, Role::Admin);
        assert_eq!(ensure_not_self(&admin, 7), Err(AuthzError::SelfRoleChange));
        assert!(ensure_not_self(&admin, 8).is_ok());
    }
}
