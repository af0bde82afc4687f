//! Type-safe monetary amount.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::error::DomainError;

/// Largest storable amount in cents (13 integer digits, 2 fractional).
const MAX_CENTS: i64 = 999_999_999_999_999;

/// Non-negative monetary amount with two fractional digits.
///
/// Stored in cents to avoid floating-point precision issues. On the wire it
/// is a plain JSON number (`12.5`), matching what clients send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    /// Creates an amount from cents.
    pub fn from_cents(cents: i64) -> Result<Self, DomainError> {
        if cents < 0 {
            return Err(DomainError::NegativeAmount);
        }
        if cents > MAX_CENTS {
            return Err(DomainError::AmountOutOfRange);
        }
        Ok(Self(cents))
    }

    /// Converts a decimal, rounding half away from zero to two places.
    pub fn from_decimal(value: Decimal) -> Result<Self, DomainError> {
        let cents = (value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
            * Decimal::ONE_HUNDRED)
            .to_i64()
            .ok_or(DomainError::AmountOutOfRange)?;
        Self::from_cents(cents)
    }

    /// Converts a decimal that must be strictly greater than zero after rounding.
    pub fn positive(value: Decimal) -> Result<Self, DomainError> {
        if value <= Decimal::ZERO {
            return Err(DomainError::NonPositiveAmount);
        }
        let amount = Self::from_decimal(value)?;
        if amount.0 == 0 {
            return Err(DomainError::NonPositiveAmount);
        }
        Ok(amount)
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.0
    }

    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, 2)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        rust_decimal::serde::float::serialize(&self.to_decimal(), serializer)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = <Decimal as Deserialize>::deserialize(deserializer)?;
        Amount::from_decimal(value).map_err(serde::de::Error::custom)
    }
}
