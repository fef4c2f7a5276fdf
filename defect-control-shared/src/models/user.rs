//! User identity and account payloads
//!
//! The authenticated user is an [`Identity`]. Its role is one of a closed set;
//! payloads carrying any other role fail to decode rather than silently
//! degrading permissions.
//!
//! # Example
//!
//! ```
//! use defect_control_shared::models::user::{Identity, Role};
//!
//! let identity: Identity =
//!     serde_json::from_str(r#"{"id":1,"name":"A","role":"engineer"}"#).unwrap();
//!
//! assert_eq!(identity.role, Role::Engineer);
//! assert_eq!(identity.email, "");
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::validation::{non_blank, rule_error};

/// User identifier as issued by the API
pub type UserId = u64;

/// Roles a user can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Field engineer: reports defects, comments, uploads attachments
    Engineer,

    /// Manager: everything an engineer can do, plus project creation
    Manager,

    /// Administrator: everything, plus user role management
    Admin,
}

impl Role {
    /// All roles, in ascending order of privilege
    pub const ALL: [Role; 3] = [Role::Engineer, Role::Manager, Role::Admin];

    /// Converts role to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Engineer => "engineer",
            Role::Manager => "manager",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown role name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "engineer" => Ok(Role::Engineer),
            "manager" => Ok(Role::Manager),
            "admin" => Ok(Role::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Authenticated user record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Unique user ID
    pub id: UserId,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Email address
    #[serde(default)]
    pub email: String,

    /// Assigned role
    pub role: Role,

    /// When the account was created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Identity {
    /// Name to show in lists: the display name, else the email, else `#id`
    pub fn label(&self) -> String {
        if !self.name.trim().is_empty() {
            self.name.clone()
        } else if !self.email.trim().is_empty() {
            self.email.clone()
        } else {
            format!("#{}", self.id)
        }
    }
}

/// Registration form
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct RegisterUser {
    /// Display name
    #[validate(custom(function = "non_blank"))]
    pub name: String,

    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// Login credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Email address
    pub email: String,

    /// Password
    pub password: String,
}

/// Credential exchange response
///
/// The token may arrive as `token` or `access_token`; the identity is only
/// present on some deployments.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginResponse {
    /// Bearer token
    #[serde(default)]
    pub token: Option<String>,

    /// Alternate token field
    #[serde(default)]
    pub access_token: Option<String>,

    /// Resolved identity, when the server includes it
    #[serde(default)]
    pub user: Option<Identity>,
}

impl LoginResponse {
    /// Returns the issued bearer token, if any
    pub fn bearer_token(&self) -> Option<&str> {
        self.token
            .as_deref()
            .or(self.access_token.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// Own-profile edit form
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateProfile {
    /// New display name
    #[validate(custom(function = "validate_display_name"))]
    pub name: String,

    /// New email address
    #[validate(email(message = "Enter a valid email"))]
    pub email: String,
}

impl UpdateProfile {
    /// Returns a copy with surrounding whitespace removed
    pub fn trimmed(&self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
        }
    }
}

fn validate_display_name(value: &str) -> Result<(), ValidationError> {
    if value.trim().chars().count() < 2 {
        return Err(rule_error("length", "Enter a name (at least 2 characters)"));
    }

    Ok(())
}

/// Administrative role change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleUpdate {
    /// Role to assign
    pub role: Role,
}
