//! Construction project records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::validation::{non_blank, rule_error};

/// Project identifier as issued by the API
pub type ProjectId = u64;

/// Construction project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Unique project ID
    pub id: ProjectId,

    /// Project name
    pub name: String,

    /// Site address
    #[serde(default)]
    pub address: String,

    /// When the project was created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Project creation form
///
/// The name is required; the address is optional but must be at least five
/// characters long when given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct CreateProject {
    /// Project name
    #[validate(custom(function = "non_blank"))]
    pub name: String,

    /// Site address
    #[validate(custom(function = "validate_address"))]
    pub address: String,
}

impl CreateProject {
    /// Returns a copy with surrounding whitespace removed
    pub fn trimmed(&self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            address: self.address.trim().to_string(),
        }
    }
}

fn validate_address(value: &str) -> Result<(), ValidationError> {
    let trimmed = value.trim();
    if !trimmed.is_empty() && trimmed.chars().count() < 5 {
        return Err(rule_error("length", "Address is too short"));
    }

    Ok(())
}
