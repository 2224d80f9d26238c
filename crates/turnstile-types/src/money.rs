//! Monetary amounts.
//!
//! Prices are stored as integer minor units (cents) so that both storage
//! backends can hold them exactly without a native decimal column type.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Number of decimal places in a [`Price`].
pub const PRICE_SCALE: u32 = 2;

/// A non-negative price in minor currency units.
///
/// Serializes as a decimal string (`"100.00"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price {
    cents: i64,
}

/// Returned when a value cannot be represented as a [`Price`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidPrice {
    /// Prices cannot be negative.
    #[error("price cannot be negative: {0}")]
    Negative(Decimal),

    /// More than two decimal places, or too large for the cent counter.
    #[error("price is not representable in cents: {0}")]
    Unrepresentable(Decimal),
}

impl Price {
    /// A zero price.
    pub const ZERO: Self = Self { cents: 0 };

    /// Build a price from minor units.
    pub fn from_cents(cents: i64) -> Result<Self, InvalidPrice> {
        if cents < 0 {
            Err(InvalidPrice::Negative(Decimal::new(cents, PRICE_SCALE)))
        } else {
            Ok(Self { cents })
        }
    }

    /// The price in minor units.
    pub const fn cents(self) -> i64 {
        self.cents
    }

    /// The price as a decimal with two fractional digits.
    pub fn as_decimal(self) -> Decimal {
        Decimal::new(self.cents, PRICE_SCALE)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = InvalidPrice;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(InvalidPrice::Negative(value));
        }
        let scaled = value
            .checked_mul(Decimal::ONE_HUNDRED)
            .ok_or(InvalidPrice::Unrepresentable(value))?;
        if !scaled.fract().is_zero() {
            return Err(InvalidPrice::Unrepresentable(value));
        }
        let cents = scaled
            .to_i64()
            .ok_or(InvalidPrice::Unrepresentable(value))?;
        Self::from_cents(cents)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.as_decimal()
    }
}

impl core::fmt::Display for Price {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.as_decimal())
    }
}
