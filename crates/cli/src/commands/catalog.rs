//! Catalog commands: browsing, product detail and search.

use std::io::Write;

use apparel_core::{Product, ProductId};

use super::App;
use crate::error::CliError;

/// One-line product summary: id, name, price and discount.
#[must_use]
pub fn product_line(product: &Product) -> String {
    let mut line = format!("{:<26} {:<32} {}", product.id, product.name.trim(), product.price);
    if let (Some(mrp), Some(off)) = (product.mrp, product.discount_percent()) {
        line.push_str(&format!(" (MRP {mrp}, {off}% off)"));
    }
    line
}

/// Load `pages` pages of a category.
///
/// # Errors
///
/// Returns the first page error; pages already loaded are still printed.
pub async fn browse(app: &mut App, category: &str, pages: u32) -> Result<(), CliError> {
    let pager = app.storefront.pager(category);
    let mut result = pager.set_category(category).await.map(drop);
    for _ in 1..pages {
        if result.is_err() || !pager.has_next_page().await {
            break;
        }
        result = pager.load_next().await.map(drop);
    }

    let products = pager.products().await;
    let out = app.console.out();
    for product in products.iter().filter(|p| p.is_displayable()) {
        writeln!(out, "{}", product_line(product))?;
    }
    if products.is_empty() {
        writeln!(out, "No products in {category}")?;
    } else if pager.has_next_page().await {
        writeln!(out, "... more available (use --pages)")?;
    }
    Ok(result?)
}

/// # Errors
///
/// Returns the backend error.
pub async fn product(app: &mut App, id: &str) -> Result<(), CliError> {
    let id = ProductId::new(id);
    let product = app.storefront.details().get(&id).await?;
    let liked = app.storefront.shop().is_liked(&id).await;
    let in_cart = app.storefront.shop().is_in_cart(&id).await;

    let out = app.console.out();
    writeln!(out, "{}", product_line(&product))?;
    if let Some(category) = &product.category {
        let sub = product.sub_category.as_deref().unwrap_or("-");
        writeln!(out, "Category: {category} / {sub}")?;
    }
    if let Some(description) = &product.description {
        writeln!(out, "{}", description.trim())?;
    }
    if product.variants.is_empty() {
        writeln!(out, "Stock: {}", product.fallback_stock())?;
    } else {
        let variants = product.variant_set();
        for color in variants.colors() {
            let sizes: Vec<String> = variants
                .sizes_for(color)
                .into_iter()
                .map(|size| format!("{size}:{}", variants.stock_of(color, size).unwrap_or(0)))
                .collect();
            writeln!(out, "  {color:<12} {}", sizes.join(" "))?;
        }
    }
    for image in &product.images {
        writeln!(out, "  {image}")?;
    }
    writeln!(
        out,
        "Wishlist: {}  Cart: {}",
        if liked { "yes" } else { "no" },
        if in_cart { "yes" } else { "no" }
    )?;
    Ok(())
}

/// # Errors
///
/// Returns the backend error.
pub async fn search(app: &mut App, query: &str) -> Result<(), CliError> {
    let results = app.storefront.search().search(query).await?;
    let out = app.console.out();
    if results.is_empty() {
        writeln!(out, "No products match \"{}\"", query.trim())?;
    }
    for product in &results {
        writeln!(out, "{}", product_line(product))?;
    }
    Ok(())
}

/// # Errors
///
/// Returns an error if the local store cannot be written.
pub fn recent(app: &mut App, clear: bool) -> Result<(), CliError> {
    let recent = app.storefront.search().recent();
    if clear {
        recent.clear()?;
        writeln!(app.console.out(), "Recent searches cleared")?;
        return Ok(());
    }
    let terms = recent.list();
    let out = app.console.out();
    if terms.is_empty() {
        writeln!(out, "No recent searches")?;
    }
    for term in terms {
        writeln!(out, "{term}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use apparel_core::Rupees;

    fn tee(mrp: Option<i64>) -> Product {
        Product {
            id: ProductId::new("p1"),
            name: " Oversized Tee ".into(),
            price: Rupees::from(499),
            mrp: mrp.map(Rupees::from),
            category: Some("men".into()),
            sub_category: None,
            description: None,
            images: vec![],
            variants: vec![],
            stock: None,
        }
    }

    #[test]
    fn test_product_line_shows_discount_when_mrp_is_higher() {
        let line = product_line(&tee(Some(999)));
        assert!(line.starts_with("p1"));
        assert!(line.contains("Oversized Tee"));
        assert!(line.ends_with("50% off)"));
    }

    #[test]
    fn test_product_line_without_mrp() {
        let line = product_line(&tee(None));
        assert!(!line.contains("MRP"));
    }
}
