//! # Incentive Engine
//!
//! Commission earned by a handler for one transaction amount.
//!
//! ```text
//! ┌──────────────────────┬───────────────────────────────────────────────┐
//! │ handler              │ incentive                                     │
//! ├──────────────────────┼───────────────────────────────────────────────┤
//! │ None                 │ 0                                             │
//! │ Percentage(rate)     │ amount × rate, half-up to the minor unit      │
//! │ Fixed(value)         │ value (independent of amount)                 │
//! └──────────────────────┴───────────────────────────────────────────────┘
//! ```
//!
//! The active handler is always passed in by the caller; this module never
//! looks it up.

use crate::money::Money;
use crate::types::{Handler, Incentive};

impl Incentive {
    /// Incentive earned on `amount` under this configuration.
    ///
    /// ```rust
    /// use digical_core::money::Money;
    /// use digical_core::types::{Incentive, Rate};
    ///
    /// let pct = Incentive::Percentage(Rate::from_percent(10));
    /// assert_eq!(pct.earned(Money::from_major(200)), Money::from_major(20));
    /// ```
    pub fn earned(&self, amount: Money) -> Money {
        match self {
            Incentive::Percentage(rate) => amount.percent(*rate),
            Incentive::Fixed(value) => *value,
        }
    }
}

/// Computes the incentive for `amount` earned by `handler`, or zero when no
/// handler is set.
///
/// Negative amounts are passed through unclamped.
pub fn calculate_incentive(amount: Money, handler: Option<&Handler>) -> Money {
    handler
        .map(|h| h.incentive.earned(amount))
        .unwrap_or_else(Money::zero)
}
