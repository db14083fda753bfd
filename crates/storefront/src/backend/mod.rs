//! Session-aware client for the apparel backend REST API.
//!
//! # Architecture
//!
//! - [`Transport`] is the seam between request plumbing and the wire. The
//!   production [`ReqwestTransport`] keeps a cookie jar so the session
//!   cookies set by login ride along on every call.
//! - [`BackendClient`] owns the session protocol: a request that comes back
//!   unauthorized triggers one token refresh and one retry; if either fails
//!   the [`Session`] is signed out and the caller sees
//!   [`BackendError::SessionExpired`].
//! - Wire records are decoded in [`types`] and normalized into the canonical
//!   `apparel_core` models in `conversions`, so the rest of the crate never
//!   sees legacy product shapes.
//!
//! # Example
//!
//! ```rust,ignore
//! use apparel_storefront::backend::{BackendClient, ReqwestTransport, Session};
//!
//! let transport = ReqwestTransport::new(&config)?;
//! let client = BackendClient::new(Arc::new(transport), session);
//!
//! let page = client.product_page("men", 1, 6).await?;
//! client.like_product(&page.products[0].id).await?;
//! ```

mod client;
mod conversions;
pub mod endpoints;
mod session;
mod transport;
pub mod types;

pub use client::{BackendClient, ProductPage};
pub use session::{Session, SessionEvent};
pub use transport::{
    ApiRequest, ApiResponse, FilePart, Method, MultipartForm, RequestBody, ReqwestTransport,
    Transport,
};

use thiserror::Error;

/// Messages the backend uses for an expired or missing session, regardless
/// of the HTTP status it pairs them with.
const SESSION_MESSAGES: [&str; 2] = ["jwt expired", "UnAuthroize request"];

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Connection-level failure reported by a non-reqwest transport.
    #[error("network error: {0}")]
    Network(String),

    /// Request path could not be joined onto the base URL.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Backend answered with a non-success status.
    #[error("backend returned {status}: {message}")]
    Api { status: u16, message: String },

    /// Backend answered 2xx but reported `success: false`.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The session could not be refreshed and the user was signed out.
    #[error("session expired")]
    SessionExpired,
}

impl BackendError {
    /// Whether this error reports an expired or invalid session that has not
    /// yet been resolved by a refresh.
    #[must_use]
    pub fn is_session_error(&self) -> bool {
        match self {
            Self::Api { status, message } => *status == 401 || is_session_message(message),
            Self::Rejected(message) => is_session_message(message),
            _ => false,
        }
    }

    /// Whether the request never reached the backend.
    #[must_use]
    pub const fn is_network(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Network(_))
    }

    /// The backend's own message, when it sent one.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Api { message, .. } | Self::Rejected(message) if !message.is_empty() => {
                Some(message)
            }
            _ => None,
        }
    }

    /// Short text suitable for showing to a shopper.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Http(_) | Self::Network(_) => "Network Error".to_string(),
            Self::SessionExpired => "Your session has expired. Please log in again.".to_string(),
            Self::Api { .. } | Self::Rejected(_) => self
                .server_message()
                .unwrap_or("Something went wrong")
                .to_string(),
            Self::Url(_) | Self::Parse(_) => "Something went wrong".to_string(),
        }
    }
}

/// Whether a backend message reports an expired or invalid session.
#[must_use]
pub fn is_session_message(message: &str) -> bool {
    let message = message.trim();
    SESSION_MESSAGES
        .iter()
        .any(|m| m.eq_ignore_ascii_case(message))
}
