//! Customer-facing stores built on the backend client.
//!
//! # Services
//!
//! - [`auth`] - Sign-in state, auth prompt, password change and recovery
//! - [`shop`] - Cart and wishlist with optimistic toggles
//! - [`catalog`] - Infinite-scroll paging and product detail
//! - [`checkout`] - Line reconciliation, address selection, order placement
//! - [`orders`] - Order history, tracking and cancellation
//! - [`search`] - Product search and recent search terms

pub mod auth;
pub mod catalog;
pub mod checkout;
pub mod orders;
pub mod search;
pub mod shop;
