//! Error handling for the client library
//!
//! Every fallible client operation returns `ClientResult<T>`. Form actions
//! run local checks through the same type: `?` on a failed validation yields
//! [`ClientError::Validation`] and on a role refusal [`ClientError::Authz`],
//! so a view handles local and server failures in one match. Anything the
//! view does not branch on becomes a message via [`ClientError::user_message`].
//!
//! # Example
//!
//! ```
//! use defect_control_client::error::ClientError;
//!
//! let err = ClientError::Api {
//!     status: 401,
//!     message: "invalid credentials".to_string(),
//! };
//!
//! assert!(err.is_unauthorized());
//! assert_eq!(err.user_message("Login failed"), "invalid credentials");
//! ```

use defect_control_shared::auth::AuthzError;
use defect_control_shared::envelope::EnvelopeError;
use defect_control_shared::validation::FieldError;

use crate::config::ConfigError;
use crate::token_store::TokenStoreError;

/// Client result type alias
pub type ClientResult<T> = Result<T, ClientError>;

/// Unified client error type
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Request never produced a response (DNS, connection, TLS, body stream)
    #[error("Network error: {0}")]
    Transport(String),

    /// Server answered with a non-success status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Server answered 2xx but the envelope reported an error
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// Response body could not be decoded
    #[error("Invalid response: {0}")]
    Decode(String),

    /// Form failed local validation; no request was sent
    #[error("Validation failed: {} errors", .0.len())]
    Validation(Vec<FieldError>),

    /// Action refused locally for the signed-in role; no request was sent
    #[error(transparent)]
    Authz(#[from] AuthzError),

    /// Token could not be persisted or cleared
    #[error("Token storage error: {0}")]
    TokenStore(#[from] TokenStoreError),

    /// Local file could not be read for upload
    #[error("File error: {0}")]
    File(String),

    /// Client could not be constructed from its configuration
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ClientError {
    /// HTTP status, when the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Message taken from the API payload, if any
    pub fn api_message(&self) -> Option<&str> {
        match self {
            ClientError::Api { message, .. } | ClientError::Rejected(message) => {
                Some(message.as_str()).filter(|m| !m.is_empty())
            }
            _ => None,
        }
    }

    /// Whether the server rejected the bearer token
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Flattens the error into a message for inline display
    ///
    /// API-provided messages and local refusals are shown as-is; everything
    /// else collapses to `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ClientError::Api { .. } | ClientError::Rejected(_) => self
                .api_message()
                .map(str::to_string)
                .unwrap_or_else(|| fallback.to_string()),
            ClientError::Validation(errors) => errors
                .iter()
                .map(|e| format!("{}: {}", e.field, e.message))
                .collect::<Vec<_>>()
                .join("; "),
            ClientError::Authz(err) => err.to_string(),
            _ => fallback.to_string(),
        }
    }
}

impl From<EnvelopeError> for ClientError {
    fn from(err: EnvelopeError) -> Self {
        match err {
            EnvelopeError::Rejected(message) => ClientError::Rejected(message),
            other => ClientError::Decode(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Transport(err.to_string())
    }
}

impl From<Vec<FieldError>> for ClientError {
    fn from(errors: Vec<FieldError>) -> Self {
        ClientError::Validation(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ClientError::Api {
            status: 404,
            message: "project not found".to_string(),
        };
        assert_eq!(err.to_string(), "API error (404): project not found");

        let err = ClientError::Transport("connection refused".to_string());
        assert_eq!(err.to_string(), "Network error: connection refused");
    }

    #[test]
    fn test_user_message_fallbacks() {
        let api = ClientError::Api {
            status: 500,
            message: String::new(),
        };
        assert_eq!(api.user_message("Something went wrong"), "Something went wrong");

        let transport = ClientError::Transport("timeout".to_string());
        assert_eq!(transport.user_message("Something went wrong"), "Something went wrong");

        let rejected = ClientError::Rejected("email already exists".to_string());
        assert_eq!(rejected.user_message("Register failed"), "email already exists");
    }

    #[test]
    fn test_validation_message() {
        let err = ClientError::Validation(vec![
            FieldError {
                field: "email".to_string(),
                message: "Invalid email format".to_string(),
            },
            FieldError {
                field: "password".to_string(),
                message: "Password too short".to_string(),
            },
        ]);

        assert_eq!(err.to_string(), "Validation failed: 2 errors");
        assert_eq!(
            err.user_message("unused"),
            "email: Invalid email format; password: Password too short"
        );
    }

    #[test]
    fn test_envelope_conversion() {
        let err: ClientError = EnvelopeError::Rejected("nope".to_string()).into();
        assert!(matches!(err, ClientError::Rejected(_)));

        let err: ClientError = EnvelopeError::Shape("missing field `id`".to_string()).into();
        assert!(matches!(err, ClientError::Decode(_)));
        assert!(!err.is_unauthorized());
    }
}
