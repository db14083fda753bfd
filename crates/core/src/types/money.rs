//! Rupee amounts using decimal arithmetic.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, Mul};

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize, Serializer};

/// Orders with a subtotal strictly above this amount ship for free.
pub const FREE_SHIPPING_THRESHOLD: Rupees = Rupees(Decimal::from_parts(1999, 0, 0, false, 0));

/// Flat shipping fee charged below the free-shipping threshold.
pub const SHIPPING_FEE: Rupees = Rupees(Decimal::from_parts(99, 0, 0, false, 0));

/// An amount in Indian rupees.
///
/// The backend sends prices as bare JSON numbers; they are held as
/// [`Decimal`] so totals never pick up float drift, and written back out as
/// numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Deserialize)]
#[serde(transparent)]
pub struct Rupees(Decimal);

impl Rupees {
    /// Zero rupees.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Wrap a decimal amount.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Whole-rupee amount.
    #[must_use]
    pub fn from_whole(amount: i64) -> Self {
        Self(Decimal::from(amount))
    }

    /// The underlying decimal.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Discount relative to a maximum retail price, in whole percent.
    ///
    /// Returns `None` when there is no discount or the MRP is not positive.
    #[must_use]
    pub fn discount_percent_from(&self, mrp: Self) -> Option<u32> {
        if mrp.0 <= Decimal::ZERO || self.0 >= mrp.0 {
            return None;
        }
        let pct = (mrp.0 - self.0) * Decimal::ONE_HUNDRED / mrp.0;
        pct.round().to_u32()
    }
}

impl Serialize for Rupees {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let normalized = self.0.normalize();
        match normalized.to_i64() {
            Some(whole) if normalized.scale() == 0 => serializer.serialize_i64(whole),
            _ => serializer.serialize_f64(self.0.to_f64().unwrap_or_default()),
        }
    }
}

impl fmt::Display for Rupees {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let normalized = self.0.normalize();
        if normalized.scale() == 0 {
            write!(f, "Rs. {normalized}")
        } else {
            write!(f, "Rs. {:.2}", self.0)
        }
    }
}

impl Add for Rupees {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Mul<u32> for Rupees {
    type Output = Self;

    fn mul(self, rhs: u32) -> Self {
        Self(self.0 * Decimal::from(rhs))
    }
}

impl Sum for Rupees {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl From<i64> for Rupees {
    fn from(amount: i64) -> Self {
        Self::from_whole(amount)
    }
}

/// Shipping charged for an order with the given subtotal.
#[must_use]
pub fn shipping_for(subtotal: Rupees) -> Rupees {
    if subtotal > FREE_SHIPPING_THRESHOLD {
        Rupees::ZERO
    } else {
        SHIPPING_FEE
    }
}
