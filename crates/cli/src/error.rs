//! CLI error type.

use apparel_admin::AdminError;
use apparel_storefront::backend::BackendError;
use apparel_storefront::config::ConfigError;
use apparel_storefront::error::StorefrontError;
use apparel_storefront::services::auth::AuthError;
use apparel_storefront::services::catalog::CatalogError;
use apparel_storefront::services::checkout::CheckoutError;
use apparel_storefront::services::orders::OrderError;
use apparel_storefront::services::shop::ShopError;
use apparel_storefront::storage::StorageError;
use thiserror::Error;

/// Errors surfaced by a command.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Storefront(#[from] StorefrontError),

    #[error(transparent)]
    Admin(#[from] AdminError),

    /// Terminal read or write failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Bad arguments that clap could not catch.
    #[error("{0}")]
    Usage(String),
}

impl CliError {
    /// Text shown to the operator.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Storefront(StorefrontError::Config(e)) => e.to_string(),
            Self::Storefront(e) => e.user_message(),
            Self::Admin(e) => e.user_message(),
            Self::Io(_) | Self::Usage(_) => self.to_string(),
        }
    }

    /// Log and, for unexpected failures, send to Sentry.
    pub fn report(&self) {
        match self {
            Self::Storefront(e) => e.report(),
            Self::Admin(e) => e.report(),
            Self::Io(_) => {
                sentry::capture_error(self);
                tracing::error!(error = %self, "terminal I/O failed");
            }
            Self::Usage(_) => {}
        }
    }
}

/// Route each storefront service error through [`StorefrontError`] so `?`
/// works on any of them.
macro_rules! via_storefront {
    ($($err:ty),+ $(,)?) => {
        $(
            impl From<$err> for CliError {
                fn from(err: $err) -> Self {
                    Self::Storefront(err.into())
                }
            }
        )+
    };
}

via_storefront!(
    ConfigError,
    StorageError,
    BackendError,
    AuthError,
    ShopError,
    CatalogError,
    CheckoutError,
    OrderError,
);
