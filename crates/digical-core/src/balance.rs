//! # Balance Engine
//!
//! Customer balances are never stored; they are derived from the ledger.
//!
//! ```text
//! outstanding_due = Σ DueRecord.amount − Σ Settlement.amount
//! ```
//!
//! ## Settlement Bound
//! A settlement is only accepted when `0 < amount <= outstanding_due`.
//! [`ensure_settlement_within`] is the single place that rule lives; the
//! store calls it inside the same database transaction that inserts the
//! settlement. [`Balance::outstanding`] itself never clamps, so a ledger
//! that was over-settled by other means still reports the negative value.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{DueRecord, Settlement};
use crate::validation::validate_positive;

/// Running totals for one customer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Balance {
    pub total_due: Money,
    pub total_settled: Money,
}

impl Balance {
    pub fn new(total_due: Money, total_settled: Money) -> Self {
        Balance {
            total_due,
            total_settled,
        }
    }

    /// Folds raw ledger rows into totals.
    pub fn from_records(dues: &[DueRecord], settlements: &[Settlement]) -> Self {
        Balance {
            total_due: dues.iter().map(|d| d.amount).sum(),
            total_settled: settlements.iter().map(|s| s.amount).sum(),
        }
    }

    /// What the customer still owes. May be negative, see the module docs.
    pub fn outstanding(&self) -> Money {
        self.total_due - self.total_settled
    }
}

/// Checks that settling `amount` is allowed against `outstanding`.
///
/// ## Errors
/// - [`CoreError::Validation`] when `amount <= 0`
/// - [`CoreError::SettlementExceedsDue`] when `amount > outstanding`
///
/// ## Example
/// ```rust
/// use digical_core::balance::ensure_settlement_within;
/// use digical_core::money::Money;
///
/// let owed = Money::from_major(200);
/// assert!(ensure_settlement_within("1000", owed, Money::from_major(200)).is_ok());
/// assert!(ensure_settlement_within("1000", owed, Money::from_major(250)).is_err());
/// ```
pub fn ensure_settlement_within(customer_id: &str, outstanding: Money, amount: Money) -> CoreResult<()> {
    validate_positive("settlement amount", amount)?;

    if amount > outstanding {
        return Err(CoreError::SettlementExceedsDue {
            customer_id: customer_id.to_string(),
            outstanding,
            requested: amount,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn due(amount: i64) -> DueRecord {
        DueRecord {
            id: 0,
            transaction_id: None,
            customer_id: "1000".to_string(),
            amount: Money::from_cents(amount),
            created_at: Utc::now(),
        }
    }

    fn settlement(amount: i64) -> Settlement {
        Settlement {
            id: 0,
            customer_id: "1000".to_string(),
            amount: Money::from_cents(amount),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_empty_ledger_owes_nothing() {
        assert!(Balance::from_records(&[], &[]).outstanding().is_zero());
    }

    #[test]
    fn test_outstanding_is_dues_minus_settlements() {
        let balance = Balance::from_records(&[due(30000), due(5000)], &[settlement(10000)]);
        assert_eq!(balance.total_due.cents(), 35000);
        assert_eq!(balance.total_settled.cents(), 10000);
        assert_eq!(balance.outstanding().cents(), 25000);
    }

    #[test]
    fn test_outstanding_is_not_clamped() {
        let balance = Balance::new(Money::from_major(100), Money::from_major(150));
        assert_eq!(balance.outstanding().cents(), -5000);
    }

    #[test]
    fn test_settlement_bound() {
        let owed = Money::from_major(200);

        assert!(ensure_settlement_within("1000", owed, Money::from_cents(1)).is_ok());
        assert!(ensure_settlement_within("1000", owed, owed).is_ok());

        match ensure_settlement_within("1000", owed, Money::from_cents(20001)) {
            Err(CoreError::SettlementExceedsDue {
                outstanding,
                requested,
                ..
            }) => {
                assert_eq!(outstanding, owed);
                assert_eq!(requested.cents(), 20001);
            }
            other => panic!("expected SettlementExceedsDue, got {:?}", other),
        }
    }

    #[test]
    fn test_settlement_must_be_positive() {
        let owed = Money::from_major(200);
        assert!(matches!(
            ensure_settlement_within("1000", owed, Money::zero()),
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            ensure_settlement_within("1000", owed, Money::from_cents(-100)),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_pre_validated_sequence_never_goes_negative() {
        let mut balance = Balance::default();
        let steps: [(bool, i64); 6] = [
            (true, 30000),
            (false, 10000),
            (false, 25000), // rejected: only 200.00 owed
            (true, 5000),
            (false, 25000),
            (false, 1),     // rejected: settled in full
        ];

        for (is_due, cents) in steps {
            let amount = Money::from_cents(cents);
            if is_due {
                balance.total_due += amount;
            } else if ensure_settlement_within("1000", balance.outstanding(), amount).is_ok() {
                balance.total_settled += amount;
            }
            assert!(!balance.outstanding().is_negative());
        }

        assert!(balance.outstanding().is_zero());
    }
}
