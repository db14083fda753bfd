//! Apparel Core - Shared types library.
//!
//! This crate provides the types shared by every part of the apparel
//! storefront client:
//! - `storefront` - Session-aware backend client and customer-facing stores
//! - `admin` - Admin console client (products, orders, stock, pincodes)
//! - `cli` - Command-line front end
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no HTTP
//! clients. Everything the backend sends is normalized into the canonical
//! models in [`models`] before the rest of the workspace sees it.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, email, money, statuses, variant resolution
//! - [`models`] - Canonical product, cart, address, order and user records

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod models;
pub mod types;

pub use models::*;
pub use types::*;
