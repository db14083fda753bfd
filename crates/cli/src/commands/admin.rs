//! Admin console commands.
//!
//! Destructive actions (delete, status change, pincode toggle) are queued
//! and only run after the operator confirms them, or with `--yes`.

use std::io::Write;
use std::path::PathBuf;

use apparel_admin::client::{ImageUpload, NewPincode, NewProduct, PageQuery, StockUpdate};
use apparel_admin::services::{PendingAction, ToastKind};
use apparel_core::{OrderId, OrderStatus, ProductId, Rupees, Variant};
use clap::Subcommand;

use super::App;
use crate::commands::catalog::product_line;
use crate::error::CliError;

#[derive(Debug, Subcommand)]
pub enum AdminCommand {
    /// Sales and order counters
    Stats,
    /// List orders
    Orders {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        search: Option<String>,
    },
    /// Move an order to a new status
    SetStatus {
        order_id: String,
        /// pending, confirmed, shipped, delivered or cancelled
        status: OrderStatus,
        #[arg(short, long)]
        yes: bool,
    },
    /// List products
    Products {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        search: Option<String>,
    },
    /// Upload a new product
    AddProduct {
        #[arg(long)]
        name: String,
        /// Selling price in whole rupees
        #[arg(long)]
        price: i64,
        /// Maximum retail price in whole rupees
        #[arg(long)]
        mrp: Option<i64>,
        #[arg(long)]
        category: String,
        #[arg(long)]
        sub_category: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Variant as COLOR:SIZE:STOCK, repeatable
        #[arg(long = "variant", value_parser = parse_variant)]
        variants: Vec<Variant>,
        /// Image file, repeatable
        #[arg(long = "image", required = true)]
        images: Vec<PathBuf>,
    },
    /// Set stock for a product or one of its variants
    Stock {
        product_id: String,
        stock: u32,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        size: Option<String>,
    },
    /// Delete a product
    Delete {
        product_id: String,
        #[arg(short, long)]
        yes: bool,
    },
    /// List delivery pincodes
    Pincodes,
    /// Add a delivery pincode
    AddPincode {
        pincode: String,
        #[arg(long)]
        city: String,
        #[arg(long)]
        state: String,
        /// Add the pincode with delivery switched off
        #[arg(long)]
        disabled: bool,
    },
    /// Switch delivery to a pincode on or off
    TogglePincode {
        pincode: String,
        /// Switch delivery off instead of on
        #[arg(long)]
        off: bool,
        #[arg(short, long)]
        yes: bool,
    },
}

/// Parse `COLOR:SIZE:STOCK`.
///
/// # Errors
///
/// Returns a message naming the expected format.
pub fn parse_variant(raw: &str) -> Result<Variant, String> {
    let parts: Vec<&str> = raw.split(':').map(str::trim).collect();
    let [color, size, stock] = parts.as_slice() else {
        return Err(format!("expected COLOR:SIZE:STOCK, got '{raw}'"));
    };
    if color.is_empty() || size.is_empty() {
        return Err(format!("color and size are required in '{raw}'"));
    }
    let stock = stock
        .parse()
        .map_err(|_| format!("stock must be a whole number in '{raw}'"))?;
    Ok(Variant::new(*color, *size, stock))
}

/// # Errors
///
/// Returns `AdminError::NotStaff` for non-staff sessions, a validation
/// error, or the backend error.
pub async fn run(app: &mut App, command: AdminCommand) -> Result<(), CliError> {
    let result = dispatch(app, command).await;
    flush_toasts(app).await?;
    result
}

async fn dispatch(app: &mut App, command: AdminCommand) -> Result<(), CliError> {
    let admin = app.admin.clone();
    admin.client().require_staff().await?;

    match command {
        AdminCommand::Stats => {
            let stats = admin.dashboard().refresh().await?;
            let out = app.console.out();
            writeln!(out, "Total sales:        {}", stats.total_sales)?;
            writeln!(out, "New orders:         {}", stats.new_orders)?;
            writeln!(out, "Pending deliveries: {}", stats.pending_deliveries)?;
            writeln!(out, "Active pincodes:    {}", stats.active_pincodes)?;
        }
        AdminCommand::Orders { page, search } => {
            let query = query(page, search);
            let orders = admin.load_orders(query).await?;
            let out = app.console.out();
            for order in &orders.items {
                writeln!(
                    out,
                    "{:<26} {:<20} {:<10} {:>3} items {}",
                    order.id,
                    order.customer.as_deref().unwrap_or("-"),
                    order.status,
                    order.unit_count(),
                    order.total_amount
                )?;
            }
            writeln!(out, "Page {} of {}", orders.page, orders.total_pages.max(1))?;
        }
        AdminCommand::SetStatus {
            order_id,
            status,
            yes,
        } => {
            let id = OrderId::new(order_id);
            let order = find_order(app, &id).await?;
            let pending = admin.request_status_change(&order, status).await?;
            confirm_and_run(app, &pending, yes).await?;
        }
        AdminCommand::Products { page, search } => {
            let products = admin.load_products(query(page, search)).await?;
            let out = app.console.out();
            for product in &products.items {
                let stock: u32 = if product.variants.is_empty() {
                    product.fallback_stock()
                } else {
                    product.variants.iter().map(|v| v.stock).sum()
                };
                writeln!(out, "{}  stock {stock}", product_line(product))?;
            }
            writeln!(out, "Page {} of {}", products.page, products.total_pages.max(1))?;
        }
        AdminCommand::AddProduct {
            name,
            price,
            mrp,
            category,
            sub_category,
            description,
            variants,
            images,
        } => {
            let mut uploads = Vec::with_capacity(images.len());
            for path in &images {
                let bytes = tokio::fs::read(path).await?;
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "image".to_string());
                uploads.push(ImageUpload::new(file_name, bytes));
            }
            let product = NewProduct {
                name,
                price: Rupees::from(price),
                mrp: mrp.map(Rupees::from),
                category,
                sub_category,
                description,
                variants,
                images: uploads,
            };
            admin.add_product(&product).await?;
        }
        AdminCommand::Stock {
            product_id,
            stock,
            color,
            size,
        } => {
            let update = StockUpdate {
                product_id: ProductId::new(product_id),
                color,
                size,
                stock,
            };
            admin.update_stock(&update).await?;
        }
        AdminCommand::Delete { product_id, yes } => {
            let id = ProductId::new(product_id);
            let product = app.storefront.details().get(&id).await?;
            let pending = admin.request_delete(&product).await?;
            confirm_and_run(app, &pending, yes).await?;
        }
        AdminCommand::Pincodes => {
            let areas = admin.load_pincodes().await?;
            let out = app.console.out();
            for area in areas.areas() {
                let state = if area.deliverable { "on" } else { "off" };
                writeln!(out, "{:<8} {:<20} {:<20} {state}", area.pincode, area.city, area.state)?;
            }
            writeln!(out, "{} of {} active", areas.active_count(), areas.areas().len())?;
        }
        AdminCommand::AddPincode {
            pincode,
            city,
            state,
            disabled,
        } => {
            let pincode = NewPincode {
                pincode,
                city,
                state,
                deliverable: !disabled,
            };
            admin.add_pincode(&pincode).await?;
        }
        AdminCommand::TogglePincode { pincode, off, yes } => {
            let pending = admin.request_pincode_delivery(&pincode, !off).await?;
            confirm_and_run(app, &pending, yes).await?;
        }
    }
    Ok(())
}

fn query(page: u32, search: Option<String>) -> PageQuery {
    let query = PageQuery::page(page);
    match search {
        Some(term) => PageQuery {
            page: query.page,
            ..query.with_search(&term)
        },
        None => query,
    }
}

/// Walk the order pages until `id` turns up.
async fn find_order(app: &App, id: &OrderId) -> Result<apparel_core::Order, CliError> {
    let mut query = PageQuery::default();
    loop {
        let page = app.admin.load_orders(query.clone()).await?;
        if let Some(order) = page.items.into_iter().find(|o| &o.id == id) {
            return Ok(order);
        }
        if !page.has_next_page {
            return Err(CliError::Usage(format!("No order with id {id}")));
        }
        query = PageQuery::page(query.page + 1);
    }
}

async fn confirm_and_run(app: &mut App, pending: &PendingAction, yes: bool) -> Result<(), CliError> {
    let question = pending.action.describe();
    if yes || app.console.confirm(&question).await? {
        app.admin.confirm(pending.id).await?;
    } else {
        app.admin.dismiss(pending.id).await?;
    }
    Ok(())
}

/// Print and clear the console's toasts.
async fn flush_toasts(app: &mut App) -> Result<(), CliError> {
    for toast in app.admin.toasts().active().await {
        let prefix = match toast.kind {
            ToastKind::Success => "ok",
            ToastKind::Error => "error",
            ToastKind::Info => "info",
        };
        writeln!(app.console.out(), "[{prefix}] {}", toast.message)?;
        app.admin.toasts().dismiss(toast.id).await;
    }
    Ok(())
}
