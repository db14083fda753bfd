//! Address and checkout commands.

use std::io::Write;

use apparel_core::{AddressId, AddressKind, NewAddress, ProductId};
use apparel_storefront::services::checkout::{Checkout, CheckoutSource};
use clap::Args;

use super::{AddressAction, App};
use crate::console::Console;
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct CheckoutArgs {
    /// Buy one product now instead of checking out the cart
    #[arg(long)]
    pub product: Option<String>,
    #[arg(long, requires = "product")]
    pub color: Option<String>,
    #[arg(long, requires = "product")]
    pub size: Option<String>,
    #[arg(long, default_value_t = 1, requires = "product")]
    pub quantity: u32,
    /// Deliver to this address instead of the default one
    #[arg(long)]
    pub address: Option<String>,
    /// Place the order without asking
    #[arg(short, long)]
    pub yes: bool,
}

/// # Errors
///
/// Returns a validation error before any order request, or the backend
/// error.
pub async fn run(app: &mut App, args: CheckoutArgs) -> Result<(), CliError> {
    let source = match &args.product {
        Some(id) => {
            let product = app.storefront.details().get(&ProductId::new(id.as_str())).await?;
            CheckoutSource::BuyNow {
                product: Box::new(product),
                color: args.color,
                size: args.size,
                quantity: args.quantity,
            }
        }
        None => CheckoutSource::Cart,
    };

    let service = app.storefront.checkout();
    let mut checkout = service.begin(source).await?;
    if let Some(address) = &args.address {
        checkout.select_address(&AddressId::new(address.as_str()))?;
    }

    print_checkout(&mut app.console, &checkout)?;
    checkout.validate()?;

    if !args.yes && !app.console.confirm("Place this order?").await? {
        writeln!(app.console.out(), "Order not placed")?;
        return Ok(());
    }

    let order_id = service.place_order(&checkout).await?;
    match order_id {
        Some(id) => writeln!(app.console.out(), "Order placed: {id}")?,
        None => writeln!(app.console.out(), "Order placed")?,
    }
    Ok(())
}

fn print_checkout(console: &mut Console, checkout: &Checkout) -> Result<(), CliError> {
    let out = console.out();
    for line in checkout.lines() {
        let variant = [line.color(), line.size()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join("/");
        let stock = if line.is_purchasable() {
            format!("{} in stock", line.stock())
        } else {
            "out of stock".to_string()
        };
        writeln!(
            out,
            "{:<32} {variant:<10} x{:<3} {}  ({stock})",
            line.name.trim(),
            line.quantity(),
            line.line_total()
        )?;
    }

    let summary = checkout.summary();
    writeln!(out, "Items:    {}", summary.units)?;
    writeln!(out, "Subtotal: {}", summary.subtotal)?;
    writeln!(out, "Shipping: {}", summary.shipping)?;
    writeln!(out, "Total:    {}", summary.total)?;

    match checkout.selected_address() {
        Some(address) => {
            let serviceable = if checkout.is_serviceable(&address.pincode) {
                ""
            } else {
                " (delivery unavailable)"
            };
            writeln!(out, "Deliver to: {}{serviceable}", address.one_line())?;
        }
        None => writeln!(out, "No delivery address selected")?,
    }
    writeln!(out, "Payment: cash on delivery")?;
    Ok(())
}

/// # Errors
///
/// Returns a validation error for blank fields or an unserviceable pincode,
/// or the backend error.
pub async fn addresses(app: &mut App, action: AddressAction) -> Result<(), CliError> {
    let service = app.storefront.checkout();
    let mut checkout = service.begin(CheckoutSource::Cart).await?;

    if let AddressAction::Add { work } = action {
        let address = prompt_address(&mut app.console, work).await?;
        service.add_address(&mut checkout, &address).await?;
        writeln!(app.console.out(), "Address saved")?;
    }

    let selected = checkout.selected_address().map(|a| a.id.clone());
    let out = app.console.out();
    if checkout.addresses().is_empty() {
        writeln!(out, "No saved addresses")?;
    }
    for address in checkout.addresses() {
        let marker = if Some(&address.id) == selected.as_ref() { "*" } else { " " };
        writeln!(
            out,
            "{marker} {:<26} {:<20} {}",
            address.id,
            address.full_name,
            address.one_line()
        )?;
    }
    Ok(())
}

async fn prompt_address(console: &mut Console, work: bool) -> Result<NewAddress, CliError> {
    Ok(NewAddress {
        full_name: ask(console, "Full name: ").await?,
        phone: ask(console, "Phone: ").await?,
        alt_phone: ask(console, "Alternate phone (optional): ").await?,
        pincode: ask(console, "Pincode: ").await?,
        state: ask(console, "State: ").await?,
        city: ask(console, "City: ").await?,
        house_no: ask(console, "House no.: ").await?,
        area: ask(console, "Area: ").await?,
        landmark: ask(console, "Landmark (optional): ").await?,
        kind: if work { AddressKind::Work } else { AddressKind::Home },
    })
}

async fn ask(console: &mut Console, label: &str) -> Result<String, CliError> {
    Ok(console.read_line(label).await?.unwrap_or_default())
}
