//! # Transaction Repository
//!
//! Sales and expenses, plus the atomic checkout that ties a sale to a due
//! customer and to consumed stock.
//!
//! ## Checkout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    record_checkout(checkout)                            │
//! │                                                                         │
//! │  validate (amount > 0, category, Due ⇒ customer)                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN                                                                 │
//! │  ├── INSERT transactions            → transaction_id                   │
//! │  ├── INSERT due_records (if Due)    → linked to transaction_id         │
//! │  ├── UPDATE products left_qty       → once per consumed line           │
//! │  COMMIT                                                                │
//! │                                                                         │
//! │  Any failure (unknown customer, unknown product) rolls back all of it. │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ordering
//! Listings are newest first: `date DESC, created_at DESC, id DESC`.

use chrono::{Local, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::customer::insert_due;
use crate::repository::product::consume_stock;
use digical_core::validation::validate_new_transaction;
use digical_core::{Checkout, NewTransaction, PaymentMethod, Transaction, TransactionFilter, TransactionType, ValidationError};

/// Joined select producing [`Transaction`] rows.
const TRANSACTION_SELECT: &str = r#"
    SELECT
        t.id,
        t.kind,
        t.amount,
        t.category,
        t.description,
        t.payment_method,
        t.handler_id,
        h.name AS handler_name,
        t.date,
        t.created_at
    FROM transactions t
    LEFT JOIN handlers h ON h.id = t.handler_id
"#;

const NEWEST_FIRST: &str = "ORDER BY t.date DESC, t.created_at DESC, t.id DESC";

/// Repository for transaction database operations.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    /// Creates a new TransactionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    /// Records a single sale or expense and returns its id.
    ///
    /// A `Due` payment recorded this way has no customer attached; link one
    /// with `CustomerRepository::record_due`, or use [`record_checkout`]
    /// to do both at once.
    ///
    /// [`record_checkout`]: TransactionRepository::record_checkout
    pub async fn record(&self, transaction: &NewTransaction) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        let id = insert_transaction(&mut conn, transaction).await?;
        info!(transaction_id = id, kind = %transaction.kind, amount = %transaction.amount, "Transaction recorded");
        Ok(id)
    }

    /// Records a transaction with its due link and stock consumption as one
    /// unit. Returns the transaction id.
    ///
    /// ## Errors
    /// - `Core(Validation)` for invalid input or a `Due` payment without a customer
    /// - `NotFound` for an unknown customer or product; nothing is written
    pub async fn record_checkout(&self, checkout: &Checkout) -> DbResult<i64> {
        let transaction = validate_new_transaction(&checkout.transaction)?;

        let due_customer = match (transaction.payment_method, checkout.due_customer.as_deref()) {
            (PaymentMethod::Due, Some(customer_id)) => Some(customer_id),
            (PaymentMethod::Due, None) => return Err(ValidationError::required("customer").into()),
            (_, Some(customer_id)) => {
                debug!(customer_id = %customer_id, "Customer ignored for a non-Due payment");
                None
            }
            (_, None) => None,
        };

        let mut tx = self.pool.begin().await?;

        let id = insert_transaction(&mut tx, &transaction).await?;

        if let Some(customer_id) = due_customer {
            insert_due(&mut tx, Some(id), customer_id, transaction.amount).await?;
        }

        for line in &checkout.consumed {
            consume_stock(&mut tx, line.product_id, line.quantity).await?;
        }

        tx.commit().await?;

        info!(
            transaction_id = id,
            kind = %transaction.kind,
            amount = %transaction.amount,
            payment = %transaction.payment_method,
            lines = checkout.consumed.len(),
            "Checkout recorded"
        );

        Ok(id)
    }

    /// Gets a transaction by id.
    pub async fn get(&self, id: i64) -> DbResult<Option<Transaction>> {
        let sql = format!("{TRANSACTION_SELECT} WHERE t.id = ?1");
        let transaction = sqlx::query_as::<_, Transaction>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(transaction)
    }

    /// Lists transactions matching `filter`, newest first.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let january = TransactionFilter::between(jan_1, jan_31)
    ///     .of_kind(TransactionType::Sale)
    ///     .limit(100);
    /// let sales = db.transactions().list(&january).await?;
    /// ```
    pub async fn list(&self, filter: &TransactionFilter) -> DbResult<Vec<Transaction>> {
        let sql = format!(
            r#"
            {TRANSACTION_SELECT}
            WHERE (?1 IS NULL OR t.kind = ?1)
              AND (?2 IS NULL OR t.date >= ?2)
              AND (?3 IS NULL OR t.date <= ?3)
            {NEWEST_FIRST}
            LIMIT ?4
            "#
        );

        let transactions = sqlx::query_as::<_, Transaction>(&sql)
            .bind(filter.kind)
            .bind(filter.start)
            .bind(filter.end)
            // SQLite treats a negative LIMIT as unbounded
            .bind(filter.limit.map(i64::from).unwrap_or(-1))
            .fetch_all(&self.pool)
            .await?;

        debug!(count = transactions.len(), ?filter, "Transactions listed");
        Ok(transactions)
    }

    /// Case-insensitive substring search over category and description.
    pub async fn search(&self, keyword: &str, kind: Option<TransactionType>) -> DbResult<Vec<Transaction>> {
        let pattern = format!("%{}%", escape_like(&keyword.trim().to_lowercase()));
        let sql = format!(
            r#"
            {TRANSACTION_SELECT}
            WHERE (LOWER(t.category) LIKE ?1 ESCAPE '\' OR LOWER(t.description) LIKE ?1 ESCAPE '\')
              AND (?2 IS NULL OR t.kind = ?2)
            {NEWEST_FIRST}
            "#
        );

        let transactions = sqlx::query_as::<_, Transaction>(&sql)
            .bind(pattern)
            .bind(kind)
            .fetch_all(&self.pool)
            .await?;

        Ok(transactions)
    }

    /// Deletes every transaction. Due records stay, unlinked, so customer
    /// balances are unchanged. Returns the number of rows removed.
    pub async fn clear(&self) -> DbResult<u64> {
        let removed = sqlx::query("DELETE FROM transactions")
            .execute(&self.pool)
            .await?
            .rows_affected();

        info!(removed, "Transaction history cleared");
        Ok(removed)
    }
}

/// Inserts a validated transaction on an open connection or transaction.
pub(crate) async fn insert_transaction(conn: &mut SqliteConnection, transaction: &NewTransaction) -> DbResult<i64> {
    let transaction = validate_new_transaction(transaction)?;
    let date = transaction.date.unwrap_or_else(|| Local::now().date_naive());

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO transactions (kind, amount, category, description, payment_method, handler_id, date, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        RETURNING id
        "#,
    )
    .bind(transaction.kind)
    .bind(transaction.amount)
    .bind(&transaction.category)
    .bind(&transaction.description)
    .bind(transaction.payment_method)
    .bind(transaction.handler_id)
    .bind(date)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| match DbError::from(e) {
        DbError::ForeignKeyViolation { .. } => DbError::not_found("Handler", transaction.handler_id.unwrap_or_default()),
        other => other,
    })?;

    debug!(transaction_id = id, %date, category = %transaction.category, "Transaction inserted");
    Ok(id)
}

fn escape_like(keyword: &str) -> String {
    let mut escaped = String::with_capacity(keyword.len());
    for c in keyword.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

// =============================================================================
// Unit Tests
// =============================================================================
