//! Variant resolution: which (color, size) pairs are sellable and how many.
//!
//! A product's variant list is the only source of truth for purchasable
//! combinations. A pair missing from the list cannot be bought at any
//! quantity; a pair present with zero stock can be selected but is sold out.

use serde::{Deserialize, Serialize};

/// A purchasable (color, size) configuration with its own stock count.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Variant {
    pub color: String,
    pub size: String,
    pub stock: u32,
}

impl Variant {
    /// Convenience constructor.
    #[must_use]
    pub fn new(color: impl Into<String>, size: impl Into<String>, stock: u32) -> Self {
        Self {
            color: color.into(),
            size: size.into(),
            stock,
        }
    }
}

/// The resolved selection for one line item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantSelection {
    /// Selected color, `None` only when the product has no colored variants.
    pub color: Option<String>,
    /// Selected size, `None` when the selected color has no sizes.
    pub size: Option<String>,
    /// Stock for the exact pair; 0 when the pair does not exist.
    pub stock: u32,
}

impl VariantSelection {
    /// Whether the selection can be ordered at all.
    #[must_use]
    pub const fn is_purchasable(&self) -> bool {
        self.stock > 0
    }
}

/// Borrowed view over a product's variant list.
#[derive(Debug, Clone, Copy)]
pub struct VariantSet<'a> {
    variants: &'a [Variant],
}

impl<'a> VariantSet<'a> {
    #[must_use]
    pub const fn new(variants: &'a [Variant]) -> Self {
        Self { variants }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Distinct non-empty colors, in first-seen order.
    #[must_use]
    pub fn colors(&self) -> Vec<&'a str> {
        dedup(self.variants.iter().map(|v| v.color.as_str()))
    }

    /// Distinct non-empty sizes offered in `color`, in first-seen order.
    #[must_use]
    pub fn sizes_for(&self, color: &str) -> Vec<&'a str> {
        dedup(
            self.variants
                .iter()
                .filter(|v| v.color == color)
                .map(|v| v.size.as_str()),
        )
    }

    /// Stock of the exact pair, `None` if the pair is not offered.
    #[must_use]
    pub fn stock_of(&self, color: &str, size: &str) -> Option<u32> {
        self.variants
            .iter()
            .find(|v| v.color == color && v.size == size)
            .map(|v| v.stock)
    }

    /// Resolve a (possibly stale) requested selection against the list.
    ///
    /// A requested color or size that is not among the valid options falls
    /// back to the first available option.
    #[must_use]
    pub fn resolve(&self, color: Option<&str>, size: Option<&str>) -> VariantSelection {
        let colors = self.colors();
        let color = pick(color, &colors);
        let sizes = color.map(|c| self.sizes_for(c)).unwrap_or_default();
        let size = pick(size, &sizes);
        let stock = match (color, size) {
            (Some(c), Some(s)) => self.stock_of(c, s).unwrap_or(0),
            _ => 0,
        };

        VariantSelection {
            color: color.map(str::to_owned),
            size: size.map(str::to_owned),
            stock,
        }
    }
}

/// Clamp a requested quantity to `[1, stock]`.
///
/// With zero stock there is no valid floor and the result is 0, which marks
/// the line unpurchasable.
#[must_use]
pub fn clamp_quantity(requested: u32, stock: u32) -> u32 {
    if stock == 0 {
        0
    } else {
        requested.clamp(1, stock)
    }
}

fn pick<'a>(requested: Option<&str>, options: &[&'a str]) -> Option<&'a str> {
    requested
        .and_then(|r| options.iter().copied().find(|o| *o == r))
        .or_else(|| options.first().copied())
}

fn dedup<'a>(values: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut out: Vec<&str> = Vec::new();
    for value in values {
        if !value.is_empty() && !out.contains(&value) {
            out.push(value);
        }
    }
    out
}
