//! Currency helpers.
//!
//! Amounts flow through the engine as [`Decimal`] currency units and are only
//! rounded when they cross the display or charge boundary. Catalog prices are
//! stored in minor units and widened back to currency units on read.

use crate::errors::{Error, Result};
use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};

/// Number of decimal places of the currency's minor unit.
pub const MINOR_UNIT_SCALE: u32 = 2;

/// Rounds to the minor unit, half away from zero (half-up for positive amounts).
#[must_use]
pub fn round_to_minor(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MINOR_UNIT_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Converts currency units to integer minor units, rounding at the boundary.
pub fn to_minor_units(amount: Decimal) -> Result<i64> {
    let scaled = round_to_minor(amount) * Decimal::ONE_HUNDRED;
    scaled
        .to_i64()
        .ok_or_else(|| Error::integrity(format!("amount {amount} does not fit in minor units")))
}

/// Widens stored minor units to currency units.
#[must_use]
pub fn from_minor_units(cents: i64) -> Decimal {
    Decimal::new(cents, MINOR_UNIT_SCALE)
}

/// Parses an amount entered in currency units (e.g. from config) into minor units.
pub fn parse_amount_to_minor(amount: f64) -> Result<i64> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(Error::validation(format!("invalid amount {amount}")));
    }
    let decimal = Decimal::try_from(amount)
        .map_err(|e| Error::validation(format!("invalid amount {amount}: {e}")))?;
    to_minor_units(decimal)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round_half_up_at_boundary() {
        assert_eq!(round_to_minor(dec!(10.005)), dec!(10.01));
        assert_eq!(round_to_minor(dec!(10.004)), dec!(10.00));
        assert_eq!(round_to_minor(dec!(333.335)), dec!(333.34));
    }

    #[test]
    fn test_minor_unit_conversion() {
        assert_eq!(to_minor_units(dec!(2200)).unwrap(), 220_000);
        assert_eq!(to_minor_units(dec!(0.125)).unwrap(), 13);
        assert_eq!(from_minor_units(123_456), dec!(1234.56));
    }

    #[test]
    fn test_parse_amount_rejects_negative_and_nan() {
        assert_eq!(parse_amount_to_minor(45.5).unwrap(), 4550);
        assert!(parse_amount_to_minor(-1.0).is_err());
        assert!(parse_amount_to_minor(f64::NAN).is_err());
    }
}
