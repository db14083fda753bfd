//! Core types for the apparel storefront.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod money;
pub mod status;
pub mod variant;

pub use email::{Email, EmailError};
pub use id::*;
pub use money::{FREE_SHIPPING_THRESHOLD, Rupees, SHIPPING_FEE, shipping_for};
pub use status::*;
pub use variant::{Variant, VariantSelection, VariantSet, clamp_quantity};
