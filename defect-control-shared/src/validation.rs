//! Form validation helpers
//!
//! Forms derive [`validator::Validate`]; this module flattens the nested
//! `ValidationErrors` map into a sorted list of field/message pairs that views
//! can render inline next to the offending input.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

/// Single field validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

/// Flattens validator output into field errors, sorted by field name
pub fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut details: Vec<FieldError> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| FieldError {
                field: field.to_string(),
                message: error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "Validation failed".to_string()),
            })
        })
        .collect();

    details.sort_by(|a, b| a.field.cmp(&b.field).then_with(|| a.message.cmp(&b.message)));
    details
}

/// Validates a form and returns flattened field errors on failure
///
/// # Errors
///
/// Returns the list of field errors when at least one rule fails.
pub fn validate_form<T: Validate>(form: &T) -> Result<(), Vec<FieldError>> {
    form.validate().map_err(|e| field_errors(&e))
}

/// Builds a validation error with a custom message
pub(crate) fn rule_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

/// Rejects values that are empty after trimming
pub(crate) fn non_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(rule_error("required", "This field is required"));
    }

    Ok(())
}
