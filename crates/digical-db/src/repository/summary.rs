//! # Summary Repository
//!
//! Period totals, breakdowns and chart series, read from the transaction
//! ledger and folded by the pure functions in `digical_core::summary`.
//!
//! ## Periods
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  daily(d)          [d, d]                                              │
//! │  weekly(today)     [monday of today's week, today]                     │
//! │  monthly(y, m)     [y-m-01, last day of m]   (leap years honoured)     │
//! │  range(r)          [r.start, r.end]                                    │
//! │                                                                         │
//! │  all of them → TransactionRepository::list → Summary::from_transactions│
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Breakdowns keep the first-seen order of the newest-first ledger scan.

use chrono::NaiveDate;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use crate::repository::transaction::TransactionRepository;
use digical_core::summary::{self as fold, Breakdown, DateRange, SeriesPoint, SeriesSpec, Summary};
use digical_core::{Transaction, TransactionFilter, TransactionType};

/// Read-only aggregations over the transaction ledger.
#[derive(Debug, Clone)]
pub struct SummaryRepository {
    transactions: TransactionRepository,
}

impl SummaryRepository {
    /// Creates a new SummaryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SummaryRepository {
            transactions: TransactionRepository::new(pool),
        }
    }

    /// Totals between optional inclusive bounds; `None` leaves a side open.
    pub async fn summary(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> DbResult<Summary> {
        let rows = self.scan(None, start, end).await?;
        let summary = Summary::from_transactions(&rows);

        debug!(
            ?start,
            ?end,
            sales = %summary.total_sales,
            expenses = %summary.total_expenses,
            "Summary computed"
        );

        Ok(summary)
    }

    /// Totals over a validated range.
    pub async fn range(&self, range: DateRange) -> DbResult<Summary> {
        self.summary(Some(range.start), Some(range.end)).await
    }

    /// Totals for one calendar day.
    pub async fn daily(&self, date: NaiveDate) -> DbResult<Summary> {
        self.range(DateRange::day(date)).await
    }

    /// Monday-start week up to and including `today`.
    pub async fn weekly(&self, today: NaiveDate) -> DbResult<Summary> {
        self.range(DateRange::week_to_date(today)).await
    }

    /// A whole calendar month.
    pub async fn monthly(&self, year: i32, month: u32) -> DbResult<Summary> {
        self.range(DateRange::month(year, month)?).await
    }

    /// Amount per category for transactions of `kind`.
    pub async fn category_breakdown(
        &self,
        kind: TransactionType,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> DbResult<Breakdown> {
        let rows = self.scan(Some(kind), start, end).await?;
        Ok(fold::category_breakdown(kind, &rows))
    }

    /// Amount per payment method, optionally for one type only.
    pub async fn payment_method_breakdown(
        &self,
        kind: Option<TransactionType>,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> DbResult<Breakdown> {
        let rows = self.scan(kind, start, end).await?;
        Ok(fold::payment_method_breakdown(kind, &rows))
    }

    /// Category breakdown from the first of `today`'s month to `today`.
    pub async fn month_to_date_breakdown(&self, kind: TransactionType, today: NaiveDate) -> DbResult<Breakdown> {
        let range = DateRange::month_to_date(today);
        self.category_breakdown(kind, Some(range.start), Some(range.end)).await
    }

    /// Chart points ending at `end`, oldest first.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let week = db.summaries().daily_series(today, SeriesSpec::WEEKLY).await?;
    /// assert_eq!(week.len(), 7);
    /// ```
    pub async fn daily_series(&self, end: NaiveDate, spec: SeriesSpec) -> DbResult<Vec<SeriesPoint>> {
        let range = spec.range(end)?;
        let rows = self.scan(None, Some(range.start), Some(range.end)).await?;
        Ok(fold::daily_series(&rows, end, spec)?)
    }

    async fn scan(
        &self,
        kind: Option<TransactionType>,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> DbResult<Vec<Transaction>> {
        let filter = TransactionFilter {
            kind,
            start,
            end,
            limit: None,
        };
        self.transactions.list(&filter).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{date, test_db};
    use crate::error::DbError;
    use crate::Database;
    use digical_core::validation::MAX_AMOUNT;
    use digical_core::{
        calculate_incentive, Checkout, CoreError, Incentive, Money, NewCustomer, NewHandler, NewTransaction,
        PaymentMethod, Rate, ValidationError,
    };

    async fn sale(db: &Database, major: i64, category: &str, on: NaiveDate) {
        db.transactions()
            .record(&NewTransaction::sale(Money::from_major(major), category).on(on))
            .await
            .unwrap();
    }

    async fn expense(db: &Database, major: i64, category: &str, on: NaiveDate) {
        db.transactions()
            .record(&NewTransaction::expense(Money::from_major(major), category).on(on))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_empty_ledger_summarises_to_zero() {
        let db = test_db().await;
        let summary = db.summaries().summary(None, None).await.unwrap();
        assert_eq!(summary, Summary::default());
    }

    #[tokio::test]
    async fn test_oversized_sales_never_reach_the_totals() {
        let db = test_db().await;
        let huge = Money::from_cents(i64::MAX / 2 + 10);

        for _ in 0..2 {
            let err = db
                .transactions()
                .record(&NewTransaction::sale(huge, "Product Sales"))
                .await
                .unwrap_err();
            assert!(matches!(err, DbError::Core(CoreError::Validation(ValidationError::OutOfRange { .. }))));
        }

        let largest = Money::from_cents(MAX_AMOUNT);
        for _ in 0..3 {
            db.transactions()
                .record(&NewTransaction::sale(largest, "Product Sales"))
                .await
                .unwrap();
        }

        let summary = db.summaries().summary(None, None).await.unwrap();
        assert_eq!(summary.sales_count, 3);
        assert_eq!(summary.total_sales, Money::from_cents(3 * MAX_AMOUNT));
    }

    #[tokio::test]
    async fn test_summary_is_additive_over_days() {
        let db = test_db().await;
        let d = date(2024, 2, 28);
        let next = date(2024, 2, 29);

        sale(&db, 120, "Product Sales", d).await;
        sale(&db, 30, "Consulting", d).await;
        sale(&db, 75, "Product Sales", next).await;

        let repo = db.summaries();
        let first = repo.daily(d).await.unwrap();
        let second = repo.daily(next).await.unwrap();
        let both = repo.summary(Some(d), Some(next)).await.unwrap();

        assert_eq!(first.total_sales + second.total_sales, both.total_sales);
        assert_eq!(both.sales_count, 3);
        assert_eq!(both.total_sales, Money::from_major(225));
    }

    #[tokio::test]
    async fn test_profit_and_periods() {
        let db = test_db().await;

        // 2024-02 is a leap month; 2024-02-21 is a Wednesday
        sale(&db, 500, "Product Sales", date(2024, 2, 1)).await;
        sale(&db, 100, "Service Sales", date(2024, 2, 19)).await;
        expense(&db, 700, "Rent", date(2024, 2, 29)).await;
        sale(&db, 999, "Product Sales", date(2024, 3, 1)).await;

        let repo = db.summaries();

        let month = repo.monthly(2024, 2).await.unwrap();
        assert_eq!(month.total_sales, Money::from_major(600));
        assert_eq!(month.total_expenses, Money::from_major(700));
        assert_eq!(month.profit, Money::from_major(-100));
        assert_eq!(month.expenses_count, 1);

        let week = repo.weekly(date(2024, 2, 21)).await.unwrap();
        assert_eq!(week.total_sales, Money::from_major(100));

        assert!(repo.monthly(2024, 13).await.is_err());
    }

    #[tokio::test]
    async fn test_breakdowns_sum_to_summary_totals() {
        let db = test_db().await;
        let start = date(2024, 1, 1);
        let end = date(2024, 1, 31);

        sale(&db, 100, "Product Sales", date(2024, 1, 2)).await;
        sale(&db, 40, "Consulting", date(2024, 1, 3)).await;
        sale(&db, 60, "Product Sales", date(2024, 1, 4)).await;
        expense(&db, 25, "Supplies", date(2024, 1, 4)).await;
        db.transactions()
            .record(
                &NewTransaction::sale(Money::from_major(10), "Other Income")
                    .with_payment(PaymentMethod::Upi)
                    .on(date(2024, 1, 5)),
            )
            .await
            .unwrap();

        let repo = db.summaries();
        let summary = repo.summary(Some(start), Some(end)).await.unwrap();

        let sales = repo
            .category_breakdown(TransactionType::Sale, Some(start), Some(end))
            .await
            .unwrap();
        assert_eq!(sales.total(), summary.total_sales);
        assert_eq!(sales.get("Product Sales"), Some(Money::from_major(160)));
        // newest first scan: Other Income (5th), Product Sales (4th), Consulting (3rd)
        assert_eq!(
            sales.labels().collect::<Vec<_>>(),
            vec!["Other Income", "Product Sales", "Consulting"]
        );

        let expenses = repo
            .category_breakdown(TransactionType::Expense, Some(start), Some(end))
            .await
            .unwrap();
        assert_eq!(expenses.total(), summary.total_expenses);

        let methods = repo
            .payment_method_breakdown(Some(TransactionType::Sale), Some(start), Some(end))
            .await
            .unwrap();
        assert_eq!(methods.get("UPI"), Some(Money::from_major(10)));
        assert_eq!(methods.get("Cash"), Some(Money::from_major(200)));

        let mtd = repo
            .month_to_date_breakdown(TransactionType::Sale, date(2024, 1, 3))
            .await
            .unwrap();
        assert_eq!(mtd.total(), Money::from_major(140));
    }

    #[tokio::test]
    async fn test_weekly_series_has_one_point_per_day() {
        let db = test_db().await;
        let end = date(2024, 1, 15);

        sale(&db, 50, "Product Sales", date(2024, 1, 9)).await;
        expense(&db, 20, "Rent", date(2024, 1, 15)).await;
        // outside the window
        sale(&db, 999, "Product Sales", date(2024, 1, 8)).await;

        let points = db.summaries().daily_series(end, SeriesSpec::WEEKLY).await.unwrap();

        assert_eq!(points.len(), 7);
        assert_eq!(points[0].date, date(2024, 1, 9));
        assert_eq!(points[0].sales, Money::from_major(50));
        assert_eq!(points[6].date, end);
        assert_eq!(points[6].profit, Money::from_major(-20));
        assert!(points[1..6].iter().all(|p| p.sales.is_zero() && p.expenses.is_zero()));
    }

    #[tokio::test]
    async fn test_shop_day_end_to_end() {
        let db = test_db().await;
        let day = date(2024, 1, 15);

        let asha = db
            .handlers()
            .create(
                &NewHandler {
                    name: "Asha".to_string(),
                    incentive: Incentive::Percentage(Rate::from_percent(10)),
                },
                true,
            )
            .await
            .unwrap();
        let active = db.handlers().active().await.unwrap();
        assert_eq!(active.as_ref().map(|h| h.id), Some(asha.id));

        db.transactions()
            .record(
                &NewTransaction::sale(Money::from_major(500), "Product Sales")
                    .with_handler(Some(asha.id))
                    .on(day),
            )
            .await
            .unwrap();
        assert_eq!(
            calculate_incentive(Money::from_major(500), active.as_ref()),
            Money::from_major(50)
        );
        assert_eq!(db.summaries().daily(day).await.unwrap().total_sales, Money::from_major(500));

        let customer = db
            .customers()
            .create(&NewCustomer {
                name: "Ravi".to_string(),
                phone: "9876543210".to_string(),
                email: None,
            })
            .await
            .unwrap();
        assert_eq!(customer.customer_id, "1000");

        db.transactions()
            .record_checkout(&Checkout {
                transaction: NewTransaction::sale(Money::from_major(300), "Product Sales")
                    .with_payment(PaymentMethod::Due)
                    .on(day),
                due_customer: Some(customer.customer_id.clone()),
                consumed: Vec::new(),
            })
            .await
            .unwrap();
        assert_eq!(
            db.customers().outstanding_due("1000").await.unwrap(),
            Money::from_major(300)
        );

        db.customers()
            .record_settlement("1000", Money::from_major(100))
            .await
            .unwrap();
        assert_eq!(
            db.customers().outstanding_due("1000").await.unwrap(),
            Money::from_major(200)
        );
    }
}
