//! Apparel storefront client library.
//!
//! Session-aware access to the apparel backend plus the customer-facing
//! state built on it: auth, cart and wishlist, catalog paging, checkout,
//! order tracking and search.
//!
//! # Modules
//!
//! - [`backend`] - Transport seam, session refresh protocol, wire records
//! - [`services`] - Customer-facing stores
//! - [`state`] - [`Storefront`](state::Storefront), every store wired together
//! - [`poller`] - Cancellable background polling
//! - [`storage`] - Local key/value cache

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod config;
pub mod error;
pub mod poller;
pub mod services;
pub mod state;
pub mod storage;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use state::Storefront;
