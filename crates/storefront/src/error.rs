//! Unified error handling with Sentry integration.
//!
//! Each store has its own error enum; [`StorefrontError`] gathers them for
//! front ends that want a single type, and [`StorefrontError::report`]
//! sends the ones that point at a bug or an outage to Sentry.

use thiserror::Error;

use crate::backend::BackendError;
use crate::config::ConfigError;
use crate::services::auth::AuthError;
use crate::services::catalog::CatalogError;
use crate::services::checkout::CheckoutError;
use crate::services::orders::OrderError;
use crate::services::shop::ShopError;
use crate::storage::StorageError;

/// Any error a storefront flow can produce.
#[derive(Debug, Error)]
pub enum StorefrontError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Shop error: {0}")]
    Shop(#[from] ShopError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    #[error("Order error: {0}")]
    Order(#[from] OrderError),
}

impl StorefrontError {
    /// Short text suitable for showing to a shopper.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Config(_) | Self::Storage(_) => "Something went wrong".to_string(),
            Self::Backend(e) => e.user_message(),
            Self::Auth(e) => e.user_message(),
            Self::Shop(e) => e.user_message(),
            Self::Catalog(e) => e.user_message(),
            Self::Checkout(e) => e.user_message(),
            Self::Order(e) => e.user_message(),
        }
    }

    /// The underlying backend error, if any.
    #[must_use]
    pub fn backend(&self) -> Option<&BackendError> {
        match self {
            Self::Backend(e)
            | Self::Auth(AuthError::Backend(e))
            | Self::Shop(ShopError::Backend(e))
            | Self::Catalog(CatalogError::Backend(e))
            | Self::Checkout(CheckoutError::Backend(e))
            | Self::Order(OrderError::Backend(e)) => Some(e),
            _ => None,
        }
    }

    /// Whether this is worth a Sentry event: local failures and backend
    /// faults, not validation or rejections the shopper can act on.
    #[must_use]
    pub fn is_reportable(&self) -> bool {
        match self {
            Self::Config(_) | Self::Storage(_) => true,
            _ => matches!(
                self.backend(),
                Some(BackendError::Http(_) | BackendError::Parse(_) | BackendError::Url(_))
                    | Some(BackendError::Api { status: 500..=599, .. })
            ),
        }
    }

    /// Log the error and capture it to Sentry when reportable.
    pub fn report(&self) {
        if self.is_reportable() {
            let event_id = sentry::capture_error(self);
            tracing::error!(error = %self, sentry_event_id = %event_id, "storefront error");
        } else {
            tracing::debug!(error = %self, "storefront error");
        }
    }
}

/// Result type alias for `StorefrontError`.
pub type Result<T> = std::result::Result<T, StorefrontError>;

/// Set the Sentry user context.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for a shopper action.
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Toggled cart item", Some(&[("product_id", "p1")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_user_message() {
        let err = StorefrontError::from(CheckoutError::Unserviceable("400001".into()));
        assert_eq!(
            err.to_string(),
            "Checkout error: delivery unavailable for pincode 400001"
        );
        assert_eq!(err.user_message(), "Delivery unavailable for Pincode: 400001.");
    }

    #[test]
    fn test_reportable_errors() {
        let rejected = StorefrontError::from(ShopError::Backend(BackendError::Rejected(
            "Out of stock".into(),
        )));
        assert!(!rejected.is_reportable());
        assert!(rejected.backend().is_some());

        let outage = StorefrontError::from(BackendError::Api {
            status: 502,
            message: String::new(),
        });
        assert!(outage.is_reportable());

        assert!(!StorefrontError::from(AuthError::PasswordMismatch).is_reportable());
    }

    #[test]
    fn test_sentry_helpers_without_client() {
        set_sentry_user(&"rajat", Some("rajat@example.in"));
        add_breadcrumb("cart", "Toggled cart item", Some(&[("product_id", "p1")]));
        clear_sentry_user();
        StorefrontError::from(ConfigError::MissingEnvVar("APPAREL_API_URL".into())).report();
    }
}
