//! Fixed-point decimal price type
//!
//! Uses rust_decimal for deterministic arithmetic (no floating-point errors).
//! Wire prices arrive as unsigned integers carrying four implied decimal
//! places; the conversion to `Decimal` is exact, so notional sums and VWAP
//! divisions never accumulate binary rounding error.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Implied decimal places in a wire price field.
pub const PRICE_SCALE: u32 = 4;

/// An exact trade price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Convert a raw wire integer (price × 10,000) into an exact price.
    pub fn from_fixed4(raw: u32) -> Self {
        Self(Decimal::new(i64::from(raw), PRICE_SCALE))
    }

    /// Inner decimal value.
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Traded notional for a share count at this price.
    pub fn notional(&self, shares: u64) -> Decimal {
        self.0 * Decimal::from(shares)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_from_fixed4_scale() {
        let price = Price::from_fixed4(1_500_000);
        assert_eq!(price.as_decimal(), Decimal::from(150));
        assert_eq!(price.to_string(), "150.0000");
    }

    #[test]
    fn test_from_fixed4_sub_dollar() {
        let price = Price::from_fixed4(1);
        assert_eq!(price.to_string(), "0.0001");
    }

    #[test]
    fn test_notional() {
        let price = Price::from_fixed4(1_510_000); // 151.0000
        assert_eq!(price.notional(50), Decimal::from(7_550));
    }

    #[test]
    fn test_price_serialization() {
        let price = Price::from_fixed4(1_495_714);
        let json = serde_json::to_string(&price).unwrap();
        assert_eq!(json, "\"149.5714\"");
    }

    proptest! {
        #[test]
        fn prop_fixed4_conversion_is_exact(raw in any::<u32>()) {
            let price = Price::from_fixed4(raw);
            prop_assert_eq!(
                price.as_decimal() * Decimal::from(10_000_u32),
                Decimal::from(raw)
            );
        }
    }
}
