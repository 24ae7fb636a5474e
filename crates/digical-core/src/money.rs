//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Summing a day of REAL amounts:                                         │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  A customer ledger built on floats drifts: dues minus settlements      │
//! │  ends at 0.0000001 instead of zero and the customer stays flagged.     │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units (paise / cents)                     │
//! │    300.00 due - 100.00 settled = 30000 - 10000 = 20000 exactly         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use digical_core::money::Money;
//!
//! let amount: Money = "500.00".parse().unwrap();
//! assert_eq!(amount.cents(), 50000);
//! assert_eq!(amount.to_string(), "500.00");
//! ```

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

use crate::error::ValidationError;
use crate::types::Rate;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit.
///
/// ## Design Decisions
/// - **i64 (signed)**: profit and over-settled balances can be negative
/// - **Single field tuple struct**: stored as a plain INTEGER column
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    ///
    /// ```rust
    /// use digical_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // 10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major units.
    #[inline]
    pub const fn from_major(major: i64) -> Self {
        Money(major * 100)
    }

    /// Converts an arbitrary decimal into Money, rounding half away from zero
    /// to the minor unit.
    ///
    /// Returns `None` when the value does not fit in an `i64` of minor units.
    ///
    /// ```rust
    /// use digical_core::money::Money;
    /// use rust_decimal::Decimal;
    /// use std::str::FromStr;
    ///
    /// let m = Money::from_decimal(Decimal::from_str("33.335").unwrap()).unwrap();
    /// assert_eq!(m.cents(), 3334);
    /// ```
    pub fn from_decimal(value: Decimal) -> Option<Self> {
        let cents = (value * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()?;
        Some(Money(cents))
    }

    /// Returns the value as an exact decimal (2 fractional digits).
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion (truncated toward zero).
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Takes a percentage of this amount, rounding half away from zero.
    ///
    /// ## Implementation
    /// Integer math on basis points: `(|amount| * bps + 5000) / 10000`,
    /// sign reapplied afterwards so -0.5 rounds to -1 like 0.5 rounds to 1.
    ///
    /// ## Example
    /// ```rust
    /// use digical_core::money::Money;
    /// use digical_core::types::Rate;
    ///
    /// let sale = Money::from_cents(50000);       // 500.00
    /// let rate = Rate::from_bps(1000);           // 10%
    /// assert_eq!(sale.percent(rate).cents(), 5000); // 50.00
    ///
    /// // 0.05 at 10% = 0.005 → rounds up to 0.01
    /// assert_eq!(Money::from_cents(5).percent(rate).cents(), 1);
    /// ```
    pub fn percent(&self, rate: Rate) -> Money {
        // i128 so large amounts times 10000 bps cannot overflow
        let magnitude = (self.0.unsigned_abs() as i128 * rate.bps() as i128 + 5000) / 10000;
        let magnitude = magnitude.min(i64::MAX as i128);
        let signed = if self.0 < 0 { -magnitude } else { magnitude };
        Money(signed as i64)
    }
}

// =============================================================================
// Parsing
// =============================================================================

/// Parses amounts as typed by a user: `"500"`, `"12.5"`, `"-3.25"`.
///
/// At most two fractional digits are accepted; `"1.005"` is rejected rather
/// than silently rounded.
impl FromStr for Money {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ValidationError::required("amount"));
        }

        let value = Decimal::from_str(s)
            .map_err(|_| ValidationError::invalid_format("amount", format!("'{}' is not a number", s)))?;

        if value.normalize().scale() > 2 {
            return Err(ValidationError::invalid_format(
                "amount",
                "at most two decimal places are allowed",
            ));
        }

        Money::from_decimal(value)
            .ok_or_else(|| ValidationError::invalid_format("amount", "value is too large"))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Plain decimal rendering (`500.00`, `-5.50`).
///
/// ## Note
/// No currency symbol: the presentation layer owns that.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
