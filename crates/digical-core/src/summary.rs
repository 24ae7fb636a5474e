//! # Summary Aggregator
//!
//! Period totals, breakdowns and chart series, folded from ledger rows.
//!
//! ## Data Flow
//! ```text
//! ┌──────────────┐   DateRange    ┌──────────────────┐   &[Transaction]   ┌──────────────┐
//! │ day / week / │ ─────────────► │ digical-db       │ ─────────────────► │ THIS MODULE  │
//! │ month / span │  [start, end]  │ SummaryRepository│   (already dated)  │ fold → totals│
//! └──────────────┘                └──────────────────┘                    └──────────────┘
//! ```
//!
//! Every period is just an inclusive `[start, end]` pair; there is exactly one
//! way of summing, so totals over adjacent ranges always add up.

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{Transaction, TransactionType};
use crate::validation::ValidationResult;

// =============================================================================
// Date Ranges
// =============================================================================

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Range from `start` to `end` inclusive.
    ///
    /// ## Errors
    /// `InvalidFormat` when `start` is after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> ValidationResult<Self> {
        if start > end {
            return Err(ValidationError::invalid_format(
                "date range",
                format!("start {} is after end {}", start, end),
            ));
        }
        Ok(DateRange { start, end })
    }

    /// A single day.
    pub fn day(date: NaiveDate) -> Self {
        DateRange {
            start: date,
            end: date,
        }
    }

    /// Monday of the current week up to and including `today`.
    ///
    /// ```rust
    /// use chrono::NaiveDate;
    /// use digical_core::summary::DateRange;
    ///
    /// // 2024-01-17 is a Wednesday
    /// let wed = NaiveDate::from_ymd_opt(2024, 1, 17).unwrap();
    /// let week = DateRange::week_to_date(wed);
    /// assert_eq!(week.start, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
    /// assert_eq!(week.end, wed);
    /// ```
    pub fn week_to_date(today: NaiveDate) -> Self {
        let offset = today.weekday().num_days_from_monday() as u64;
        DateRange {
            start: today - Days::new(offset),
            end: today,
        }
    }

    /// Whole calendar month, honouring leap years.
    ///
    /// ## Errors
    /// `OutOfRange` for a month outside 1-12.
    pub fn month(year: i32, month: u32) -> ValidationResult<Self> {
        let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| ValidationError::OutOfRange {
            field: "month".to_string(),
            min: 1,
            max: 12,
        })?;

        let end = start
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .ok_or_else(|| ValidationError::invalid_format("month", "date out of range"))?;

        Ok(DateRange { start, end })
    }

    /// First of `today`'s month up to and including `today`.
    pub fn month_to_date(today: NaiveDate) -> Self {
        DateRange {
            start: today.with_day(1).unwrap_or(today),
            end: today,
        }
    }

    /// The `days` calendar days ending at `end` (inclusive).
    pub fn trailing(end: NaiveDate, days: u32) -> ValidationResult<Self> {
        if days == 0 {
            return Err(ValidationError::MustBePositive {
                field: "span_days".to_string(),
            });
        }
        Ok(DateRange {
            start: end - Days::new(days as u64 - 1),
            end,
        })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of days in the range.
    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

// =============================================================================
// Summary
// =============================================================================

/// Totals over a set of transactions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total_sales: Money,
    pub total_expenses: Money,
    /// `total_sales - total_expenses`; negative for a loss.
    pub profit: Money,
    pub sales_count: u64,
    pub expenses_count: u64,
}

impl Summary {
    /// Folds transactions into totals. An empty input gives all zeros.
    pub fn from_transactions<'a, I>(transactions: I) -> Self
    where
        I: IntoIterator<Item = &'a Transaction>,
    {
        let mut summary = Summary::default();
        for tx in transactions {
            summary.record(tx.kind, tx.amount);
        }
        summary
    }

    fn record(&mut self, kind: TransactionType, amount: Money) {
        match kind {
            TransactionType::Sale => {
                self.total_sales += amount;
                self.sales_count += 1;
            }
            TransactionType::Expense => {
                self.total_expenses += amount;
                self.expenses_count += 1;
            }
        }
        self.profit = self.total_sales - self.total_expenses;
    }

    /// Total for one transaction type.
    pub fn total(&self, kind: TransactionType) -> Money {
        match kind {
            TransactionType::Sale => self.total_sales,
            TransactionType::Expense => self.total_expenses,
        }
    }
}

// =============================================================================
// Breakdowns
// =============================================================================

/// One labelled slice of a breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakdownEntry {
    pub label: String,
    pub amount: Money,
}

/// Label → summed amount, kept in first-seen order (not sorted).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Breakdown(Vec<BreakdownEntry>);

impl Breakdown {
    /// Adds `amount` to `label`, appending the label if it is new.
    pub fn add(&mut self, label: &str, amount: Money) {
        match self.0.iter_mut().find(|e| e.label == label) {
            Some(entry) => entry.amount += amount,
            None => self.0.push(BreakdownEntry {
                label: label.to_string(),
                amount,
            }),
        }
    }

    pub fn get(&self, label: &str) -> Option<Money> {
        self.0.iter().find(|e| e.label == label).map(|e| e.amount)
    }

    pub fn total(&self) -> Money {
        self.0.iter().map(|e| e.amount).sum()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|e| e.label.as_str())
    }

    pub fn entries(&self) -> &[BreakdownEntry] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Sums amounts per category for transactions of `kind`.
pub fn category_breakdown<'a, I>(kind: TransactionType, transactions: I) -> Breakdown
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut breakdown = Breakdown::default();
    for tx in transactions.into_iter().filter(|tx| tx.kind == kind) {
        breakdown.add(&tx.category, tx.amount);
    }
    breakdown
}

/// Sums amounts per payment method, optionally restricted to one type.
pub fn payment_method_breakdown<'a, I>(kind: Option<TransactionType>, transactions: I) -> Breakdown
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut breakdown = Breakdown::default();
    for tx in transactions
        .into_iter()
        .filter(|tx| kind.map_or(true, |k| tx.kind == k))
    {
        breakdown.add(tx.payment_method.as_str(), tx.amount);
    }
    breakdown
}

// =============================================================================
// Series
// =============================================================================

/// Shape of a time-bucketed chart series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesSpec {
    /// Calendar days covered, ending at the series end date.
    pub span_days: u32,
    /// Distance between sampled days.
    pub step_days: u32,
}

impl SeriesSpec {
    /// Last seven days, one point per day.
    pub const WEEKLY: SeriesSpec = SeriesSpec {
        span_days: 7,
        step_days: 1,
    };

    /// Last 31 days, one point every third day (also used for profit trend).
    pub const MONTHLY: SeriesSpec = SeriesSpec {
        span_days: 31,
        step_days: 3,
    };

    /// Sampled dates, oldest first. The end date is always included.
    ///
    /// ```rust
    /// use chrono::NaiveDate;
    /// use digical_core::summary::SeriesSpec;
    ///
    /// let end = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
    /// let dates = SeriesSpec::MONTHLY.dates(end).unwrap();
    /// assert_eq!(dates.len(), 11);
    /// assert_eq!(dates[0], NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    /// assert_eq!(*dates.last().unwrap(), end);
    /// ```
    pub fn dates(&self, end: NaiveDate) -> ValidationResult<Vec<NaiveDate>> {
        if self.step_days == 0 {
            return Err(ValidationError::MustBePositive {
                field: "step_days".to_string(),
            });
        }
        let range = self.range(end)?;

        let mut dates: Vec<NaiveDate> = (0..range.len_days() as u64)
            .step_by(self.step_days as usize)
            .map(|offset| end - Days::new(offset))
            .collect();
        dates.reverse();
        Ok(dates)
    }

    /// Whole range the series samples from.
    pub fn range(&self, end: NaiveDate) -> ValidationResult<DateRange> {
        DateRange::trailing(end, self.span_days)
    }
}

/// Daily totals for one sampled date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub sales: Money,
    pub expenses: Money,
    pub profit: Money,
}

/// Builds a series from transactions covering (at least) `spec.range(end)`.
///
/// Each point holds the totals of exactly its own day, not of the gap since
/// the previous point.
pub fn daily_series(
    transactions: &[Transaction],
    end: NaiveDate,
    spec: SeriesSpec,
) -> ValidationResult<Vec<SeriesPoint>> {
    let points = spec
        .dates(end)?
        .into_iter()
        .map(|date| {
            let day = Summary::from_transactions(transactions.iter().filter(|tx| tx.date == date));
            SeriesPoint {
                date,
                sales: day.total_sales,
                expenses: day.total_expenses,
                profit: day.profit,
            }
        })
        .collect();
    Ok(points)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PaymentMethod;
    use chrono::Utc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn tx(kind: TransactionType, cents: i64, category: &str, on: NaiveDate) -> Transaction {
        Transaction {
            id: 0,
            kind,
            amount: Money::from_cents(cents),
            category: category.to_string(),
            description: String::new(),
            payment_method: PaymentMethod::Cash,
            handler_id: None,
            handler_name: None,
            date: on,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_month_boundaries() {
        let feb_leap = DateRange::month(2024, 2).unwrap();
        assert_eq!(feb_leap.end, date(2024, 2, 29));

        let feb = DateRange::month(2023, 2).unwrap();
        assert_eq!(feb.end, date(2023, 2, 28));

        let dec = DateRange::month(2023, 12).unwrap();
        assert_eq!((dec.start, dec.end), (date(2023, 12, 1), date(2023, 12, 31)));

        assert!(DateRange::month(2024, 13).is_err());
        assert!(DateRange::month(2024, 0).is_err());
    }

    #[test]
    fn test_week_starts_monday() {
        // Monday itself
        let mon = date(2024, 1, 15);
        assert_eq!(DateRange::week_to_date(mon), DateRange::day(mon));

        // Sunday reaches back six days
        let sun = date(2024, 1, 21);
        assert_eq!(DateRange::week_to_date(sun).start, mon);
    }

    #[test]
    fn test_range_rejects_inverted() {
        assert!(DateRange::new(date(2024, 1, 2), date(2024, 1, 1)).is_err());
        assert_eq!(DateRange::new(date(2024, 1, 1), date(2024, 1, 3)).unwrap().len_days(), 3);
    }

    #[test]
    fn test_empty_summary_is_zero() {
        let none: Vec<Transaction> = Vec::new();
        assert_eq!(Summary::from_transactions(&none), Summary::default());
        assert!(category_breakdown(TransactionType::Sale, &none).is_empty());
    }

    #[test]
    fn test_summary_totals_and_profit() {
        let d = date(2024, 1, 15);
        let txs = vec![
            tx(TransactionType::Sale, 50000, "Product Sales", d),
            tx(TransactionType::Sale, 20000, "Consulting", d),
            tx(TransactionType::Expense, 90000, "Rent", d),
        ];
        let summary = Summary::from_transactions(&txs);

        assert_eq!(summary.total_sales.cents(), 70000);
        assert_eq!(summary.total_expenses.cents(), 90000);
        assert_eq!(summary.profit.cents(), -20000);
        assert_eq!((summary.sales_count, summary.expenses_count), (2, 1));
    }

    #[test]
    fn test_category_breakdown_first_seen_order() {
        let d = date(2024, 1, 15);
        let txs = vec![
            tx(TransactionType::Sale, 100, "Service Sales", d),
            tx(TransactionType::Expense, 999, "Rent", d),
            tx(TransactionType::Sale, 200, "Consulting", d),
            tx(TransactionType::Sale, 300, "Service Sales", d),
        ];
        let breakdown = category_breakdown(TransactionType::Sale, &txs);

        assert_eq!(breakdown.labels().collect::<Vec<_>>(), vec!["Service Sales", "Consulting"]);
        assert_eq!(breakdown.get("Service Sales").unwrap().cents(), 400);
        assert_eq!(breakdown.total(), Summary::from_transactions(&txs).total_sales);
    }

    #[test]
    fn test_payment_method_breakdown() {
        let d = date(2024, 1, 15);
        let mut upi = tx(TransactionType::Sale, 700, "Product Sales", d);
        upi.payment_method = PaymentMethod::Upi;
        let txs = vec![tx(TransactionType::Sale, 100, "Product Sales", d), upi];

        let breakdown = payment_method_breakdown(None, &txs);
        assert_eq!(breakdown.get("Cash").unwrap().cents(), 100);
        assert_eq!(breakdown.get("UPI").unwrap().cents(), 700);
        assert!(payment_method_breakdown(Some(TransactionType::Expense), &txs).is_empty());
    }

    #[test]
    fn test_weekly_series_shape() {
        let end = date(2024, 1, 21);
        let txs = vec![
            tx(TransactionType::Sale, 1000, "Product Sales", date(2024, 1, 15)),
            tx(TransactionType::Expense, 400, "Supplies", date(2024, 1, 15)),
            tx(TransactionType::Sale, 500, "Product Sales", end),
        ];
        let series = daily_series(&txs, end, SeriesSpec::WEEKLY).unwrap();

        assert_eq!(series.len(), 7);
        assert_eq!(series[0].date, date(2024, 1, 15));
        assert_eq!(series[0].profit.cents(), 600);
        assert_eq!(series[6].sales.cents(), 500);
        assert!(series[1..6].iter().all(|p| p.sales.is_zero()));
    }

    #[test]
    fn test_series_rejects_zero_step() {
        let spec = SeriesSpec {
            span_days: 7,
            step_days: 0,
        };
        assert!(spec.dates(date(2024, 1, 1)).is_err());
    }
}
