//! Product price representation using decimal arithmetic.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when validating a [`Price`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PriceError {
    /// An amount is below zero.
    #[error("{field} must not be negative")]
    Negative {
        /// Which component was negative.
        field: &'static str,
    },
    /// An amount has more than [`Price::MAX_SCALE`] decimal places.
    #[error("{field} must have at most 2 decimal places")]
    TooPrecise { field: &'static str },
    /// An amount is not below [`Price::MAX_AMOUNT`].
    #[error("{field} must be less than 10000000000")]
    TooLarge { field: &'static str },
    /// The discount percentage is outside `0..=100`.
    #[error("discount must be between 0 and 100 percent")]
    DiscountOutOfRange,
}

/// The price structure of a catalog product.
///
/// `org` is the price the customer pays and the one every cart and order
/// total is computed from. `mrp` is the listed maximum retail price shown as
/// a strike-through, and `off` the advertised discount percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Selling price.
    pub org: Decimal,
    /// Listed maximum retail price.
    pub mrp: Decimal,
    /// Discount percentage (0-100).
    pub off: Decimal,
}

impl Price {
    /// Decimal places a stored amount keeps.
    pub const MAX_SCALE: u32 = 2;

    /// Exclusive upper bound for `org` and `mrp` (ten integer digits).
    pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_410_065_408, 2, 0, false, 0);

    /// Create a new price.
    #[must_use]
    pub const fn new(org: Decimal, mrp: Decimal, off: Decimal) -> Self {
        Self { org, mrp, off }
    }

    /// Check that every component is storable without rounding: amounts are
    /// non-negative, below [`Self::MAX_AMOUNT`], with at most two decimals,
    /// and the discount is a percentage.
    ///
    /// Trailing zeros do not count towards the scale, so `1.500` is accepted.
    ///
    /// # Errors
    ///
    /// Returns `PriceError` describing the first invalid component.
    pub fn validate(&self) -> Result<(), PriceError> {
        check_amount("price.org", self.org)?;
        check_amount("price.mrp", self.mrp)?;
        if self.off < Decimal::ZERO || self.off > Decimal::ONE_HUNDRED {
            return Err(PriceError::DiscountOutOfRange);
        }
        if self.off.normalize().scale() > Self::MAX_SCALE {
            return Err(PriceError::TooPrecise { field: "price.off" });
        }
        Ok(())
    }
}

fn check_amount(field: &'static str, amount: Decimal) -> Result<(), PriceError> {
    if amount < Decimal::ZERO {
        return Err(PriceError::Negative { field });
    }
    if amount >= Price::MAX_AMOUNT {
        return Err(PriceError::TooLarge { field });
    }
    if amount.normalize().scale() > Price::MAX_SCALE {
        return Err(PriceError::TooPrecise { field });
    }
    Ok(())
}
