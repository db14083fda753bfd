//! Unified error handling for the admin console.

use apparel_core::StatusTransitionError;
use apparel_storefront::backend::BackendError;
use thiserror::Error;

/// Application-level error type for the admin console.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Signed out, or signed in as a customer.
    #[error("Admin access required")]
    NotStaff,

    /// The requested status change is not an allowed edge.
    #[error(transparent)]
    Transition(#[from] StatusTransitionError),

    /// Form input rejected before any request was made.
    #[error("Invalid input: {0}")]
    Invalid(String),

    /// Confirm/dismiss for an action that is not queued.
    #[error("No pending action with id {0}")]
    NoPendingAction(u64),

    /// Backend call failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Payload could not be encoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AdminError {
    /// Short text suitable for an error toast.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Backend(e) => e.user_message(),
            Self::Json(_) => "Something went wrong".to_string(),
            Self::Transition(e) => e.to_string(),
            Self::Invalid(reason) => reason.clone(),
            Self::NotStaff | Self::NoPendingAction(_) => self.to_string(),
        }
    }

    /// Whether the failure is ours rather than the operator's.
    #[must_use]
    pub fn is_reportable(&self) -> bool {
        match self {
            Self::Json(_) => true,
            Self::Backend(e) => matches!(
                e,
                BackendError::Http(_) | BackendError::Parse(_) | BackendError::Url(_)
            ) || matches!(e, BackendError::Api { status, .. } if *status >= 500),
            _ => false,
        }
    }

    /// Log the error and, when reportable, send it to Sentry.
    pub fn report(&self) {
        if self.is_reportable() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Admin action failed"
            );
        } else {
            tracing::warn!(error = %self, "Admin action rejected");
        }
    }
}
