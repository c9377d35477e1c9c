//! Fixed-point monetary amounts.
//!
//! All amounts are 6-decimal fixed point (micro-units), represented as a
//! signed fixed-point integer since ledger deltas (e.g. `remaining - used`)
//! are naturally signed during intermediate computation.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Micro-units per whole unit (6 decimals).
pub const MICROS_PER_UNIT: i64 = 1_000_000;

/// A non-negative, 6-decimal fixed-point amount.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct AmountMicros(i64);

impl AmountMicros {
    pub const ZERO: Self = Self(0);

    /// Construct from a raw micro-unit count. Returns `InvalidRange` if
    /// negative.
    pub fn new(micros: i64) -> Result<Self, CoreError> {
        if micros < 0 {
            return Err(CoreError::InvalidRange {
                field: "amount",
                reason: "amount must be non-negative".to_string(),
            });
        }
        Ok(Self(micros))
    }

    /// Construct from whole units and a fractional part already expressed in
    /// micro-units (e.g. `from_units_micros(78, 0)` for 78 whole units).
    pub fn from_units_micros(units: i64, extra_micros: i64) -> Result<Self, CoreError> {
        let micros = units
            .checked_mul(MICROS_PER_UNIT)
            .and_then(|v| v.checked_add(extra_micros))
            .ok_or(CoreError::ValueOverflow)?;
        Self::new(micros)
    }

    pub fn micros(self) -> i64 {
        self.0
    }

    pub fn checked_add(self, other: Self) -> Result<Self, CoreError> {
        self.0
            .checked_add(other.0)
            .ok_or(CoreError::ValueOverflow)
            .map(Self)
    }

    /// Subtract, clamping at zero rather than going negative, for
    /// `max(remaining - used, 0)`-shaped arithmetic.
    pub fn saturating_sub(self, other: Self) -> Self {
        Self((self.0 - other.0).max(0))
    }

    pub fn checked_sub(self, other: Self) -> Result<Self, CoreError> {
        if other.0 > self.0 {
            return Err(CoreError::ValueOverflow);
        }
        Ok(Self(self.0 - other.0))
    }

    pub fn min(self, other: Self) -> Self {
        if self.0 <= other.0 { self } else { other }
    }

    /// Approximate equality within the `1e-6` (i.e. one micro-unit)
    /// tolerance batch-total checks require.
    pub fn approx_eq(self, other: Self, tolerance_micros: i64) -> bool {
        (self.0 - other.0).abs() <= tolerance_micros
    }
}

impl Add for AmountMicros {
    type Output = AmountMicros;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for AmountMicros {
    type Output = AmountMicros;
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Sum for AmountMicros {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(AmountMicros::ZERO, |acc, x| acc + x)
    }
}

impl fmt::Display for AmountMicros {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:06}", self.0 / MICROS_PER_UNIT, (self.0 % MICROS_PER_UNIT).abs())
    }
}
