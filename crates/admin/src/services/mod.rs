//! Admin console services.
//!
//! # Services
//!
//! - `actions` - Confirmation queue for destructive actions
//! - `dashboard` - Dashboard stats with background polling
//! - `toast` - Transient success/error/info notifications

pub mod actions;
pub mod dashboard;
pub mod toast;

pub use actions::{ActionQueue, AdminAction, PendingAction};
pub use dashboard::DashboardMonitor;
pub use toast::{TOAST_LIFETIME, Toast, ToastKind, Toasts};
