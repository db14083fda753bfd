//! Canonical records the client holds.
//!
//! These are transient, non-authoritative copies of backend state. Shapes
//! that vary on the wire (legacy product images, populated-or-bare product
//! references) are normalized into these before use.

pub mod address;
pub mod order;
pub mod pincode;
pub mod product;
pub mod shop;
pub mod user;

pub use address::{Address, NewAddress};
pub use order::{Order, OrderAddress, OrderItem};
pub use pincode::{ServiceArea, ServiceAreas, normalize_pincode};
pub use product::{Product, normalize_image_url};
pub use shop::{ShopEntry, ShopList, ShopProduct};
pub use user::User;
