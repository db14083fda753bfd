//! Authentication error types.

use thiserror::Error;

use crate::backend::BackendError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] apparel_core::EmailError),

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// A required form field was left blank.
    #[error("all fields are required")]
    MissingFields,

    /// New password and its confirmation differ.
    #[error("new password and confirmation do not match")]
    PasswordMismatch,

    /// The operation needs a signed-in user.
    #[error("not signed in")]
    NotSignedIn,

    /// A password recovery step was called out of order.
    #[error("password recovery step out of order")]
    RecoveryOutOfOrder,

    /// Backend rejected or failed the request.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}

impl AuthError {
    /// Short text suitable for showing to a shopper.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidEmail(_) => "Please enter a valid email address".to_string(),
            Self::WeakPassword(msg) => msg.clone(),
            Self::MissingFields => "All fields are required".to_string(),
            Self::PasswordMismatch => {
                "New password and confirm password are not the same".to_string()
            }
            Self::NotSignedIn => "Please log in to continue".to_string(),
            Self::RecoveryOutOfOrder => "Please start password recovery again".to_string(),
            Self::Backend(e) => e.user_message(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_message_passes_through() {
        let err = AuthError::from(BackendError::Api {
            status: 400,
            message: "User already exists".into(),
        });
        assert_eq!(err.user_message(), "User already exists");
        assert_eq!(
            AuthError::from(BackendError::Network("refused".into())).user_message(),
            "Network Error"
        );
    }
}
