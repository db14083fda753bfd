//! Wishlist and cart commands.

use std::io::Write;

use apparel_core::ProductId;

use super::{App, ListAction};
use crate::commands::catalog::product_line;
use crate::error::CliError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Wishlist,
    Cart,
}

impl Target {
    const fn name(self) -> &'static str {
        match self {
            Self::Wishlist => "wishlist",
            Self::Cart => "cart",
        }
    }
}

/// # Errors
///
/// Returns `ShopError::AuthRequired` when signed out, or the backend error.
pub async fn run(app: &mut App, target: Target, action: ListAction) -> Result<(), CliError> {
    let shop = app.storefront.shop();
    shop.sync().await?;

    match action {
        ListAction::List => {
            let list = match target {
                Target::Wishlist => shop.wishlist().await,
                Target::Cart => shop.cart().await,
            };
            let out = app.console.out();
            let mut shown = 0;
            for (entry, product) in list.visible() {
                let variant = [entry.color.as_deref(), entry.size.as_deref()]
                    .into_iter()
                    .flatten()
                    .collect::<Vec<_>>()
                    .join("/");
                writeln!(out, "{}  x{} {variant}", product_line(product), entry.quantity)?;
                shown += 1;
            }
            if shown == 0 {
                writeln!(out, "Your {} is empty", target.name())?;
            }
        }
        ListAction::Toggle { product_id } => {
            let id = ProductId::new(product_id);
            let member = match target {
                Target::Wishlist => shop.toggle_like(&id).await?,
                Target::Cart => shop.add_to_cart(&id).await?,
            };
            let verb = if member { "Added to" } else { "Removed from" };
            writeln!(app.console.out(), "{verb} {}: {id}", target.name())?;
        }
    }
    Ok(())
}
