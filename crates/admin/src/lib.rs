//! Apparel admin console library.
//!
//! Store management over the same backend session as the storefront:
//! dashboard stats, order status updates, product and stock management and
//! delivery pincodes.
//!
//! # Security
//!
//! Every call requires a staff session. Destructive actions (product
//! deletion, order status changes, pincode toggles) go through
//! [`services::ActionQueue`] and only run once confirmed.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod client;
pub mod error;
pub mod services;
pub mod state;

pub use client::AdminClient;
pub use error::AdminError;
pub use state::AdminConsole;
