//! # Customer Repository
//!
//! Customers, the dues they run up and the settlements they pay.
//!
//! ## Customer Ids
//! ```text
//! no customers yet          → "1000"
//! highest existing is 1041  → "1042"
//! ```
//! The next id is computed and inserted by one `INSERT ... SELECT MAX + 1`
//! statement inside a `BEGIN IMMEDIATE` transaction, so the write lock is
//! held before MAX is read. If the primary key still rejects the id, the
//! insert is retried with a fresh MAX.
//!
//! ## Balances
//! `outstanding = Σ due_records.amount − Σ settlements.amount`, always
//! computed on read. Settlements are checked against it inside the same
//! SQLite transaction that inserts them.

use std::future::Future;

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use digical_core::validation::{validate_customer_id, validate_new_customer, validate_phone, validate_positive};
use digical_core::{
    ensure_settlement_within, Balance, CoreError, Customer, CustomerBalance, DueRecord, Money, NewCustomer,
    Settlement, FIRST_CUSTOMER_ID,
};

/// Attempts at claiming a customer id before giving up.
const MAX_ID_ATTEMPTS: u32 = 3;

/// SQL expression yielding the next customer id over `customers`, with
/// `floor` being the placeholder bound to [`FIRST_CUSTOMER_ID`].
fn next_id_expr(floor: &str) -> String {
    format!(
        "CAST(CASE WHEN MAX(CAST(customer_id AS INTEGER)) >= {floor} \
              THEN MAX(CAST(customer_id AS INTEGER)) + 1 \
              ELSE {floor} END AS TEXT)"
    )
}

/// Runs `insert` until it stops hitting a taken id, at most
/// [`MAX_ID_ATTEMPTS`] times. Any other error ends the loop at once.
async fn retry_on_taken_id<F, Fut>(mut insert: F) -> DbResult<String>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = DbResult<String>>,
{
    let mut attempt = 1;
    loop {
        match insert().await {
            Err(err) if err.is_unique_violation() && attempt < MAX_ID_ATTEMPTS => {
                warn!(attempt, "Customer id taken concurrently, retrying");
                attempt += 1;
            }
            result => return result,
        }
    }
}

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    // =========================================================================
    // Customers
    // =========================================================================

    /// Creates a customer with the next free id.
    ///
    /// ## Errors
    /// - `Core(Validation)` for a missing name or malformed phone/email
    /// - `UniqueViolation` if the id stayed contended over every retry
    pub async fn create(&self, customer: &NewCustomer) -> DbResult<Customer> {
        let customer = validate_new_customer(customer)?;
        let sql = format!(
            r#"
            INSERT INTO customers (customer_id, name, phone, email, created_at)
            SELECT {}, ?1, ?2, ?3, ?4
            FROM customers
            RETURNING customer_id
            "#,
            next_id_expr("?5")
        );

        let now = Utc::now();
        let (pool, sql, new) = (&self.pool, sql.as_str(), &customer);
        let customer_id = retry_on_taken_id(move || async move {
            let mut tx = pool.begin_with("BEGIN IMMEDIATE").await?;
            let customer_id: String = sqlx::query_scalar(sql)
                .bind(&new.name)
                .bind(&new.phone)
                .bind(&new.email)
                .bind(now)
                .bind(FIRST_CUSTOMER_ID)
                .fetch_one(&mut *tx)
                .await?;
            tx.commit().await?;
            Ok::<_, DbError>(customer_id)
        })
        .await?;

        info!(customer_id = %customer_id, name = %customer.name, "Customer created");
        Ok(Customer {
            customer_id,
            name: customer.name,
            phone: customer.phone,
            email: customer.email,
            created_at: now,
        })
    }

    /// The id the next created customer will get.
    pub async fn next_customer_id(&self) -> DbResult<String> {
        let sql = format!("SELECT {} FROM customers", next_id_expr("?1"));
        let next: String = sqlx::query_scalar(&sql)
            .bind(FIRST_CUSTOMER_ID)
            .fetch_one(&self.pool)
            .await?;
        Ok(next)
    }

    /// Gets a customer by id.
    pub async fn get(&self, customer_id: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            "SELECT customer_id, name, phone, email, created_at FROM customers WHERE customer_id = ?1",
        )
        .bind(customer_id.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Finds the (lowest-id) customer with this phone number.
    pub async fn get_by_phone(&self, phone: &str) -> DbResult<Option<Customer>> {
        let phone = validate_phone(phone)?;

        let customer = sqlx::query_as::<_, Customer>(
            r#"
            SELECT customer_id, name, phone, email, created_at
            FROM customers
            WHERE phone = ?1
            ORDER BY CAST(customer_id AS INTEGER)
            LIMIT 1
            "#,
        )
        .bind(phone)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Replaces a customer's name, phone and email.
    pub async fn update(&self, customer_id: &str, customer: &NewCustomer) -> DbResult<Customer> {
        let customer_id = validate_customer_id(customer_id)?;
        let customer = validate_new_customer(customer)?;

        debug!(customer_id = %customer_id, "Updating customer");

        let updated = sqlx::query("UPDATE customers SET name = ?2, phone = ?3, email = ?4 WHERE customer_id = ?1")
            .bind(&customer_id)
            .bind(&customer.name)
            .bind(&customer.phone)
            .bind(&customer.email)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if updated == 0 {
            return Err(DbError::not_found("Customer", &customer_id));
        }

        self.get(&customer_id)
            .await?
            .ok_or_else(|| DbError::not_found("Customer", &customer_id))
    }

    /// All customers, ordered numerically by id.
    pub async fn list(&self) -> DbResult<Vec<Customer>> {
        let customers = sqlx::query_as::<_, Customer>(
            r#"
            SELECT customer_id, name, phone, email, created_at
            FROM customers
            ORDER BY CAST(customer_id AS INTEGER)
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }

    // =========================================================================
    // Dues & Settlements
    // =========================================================================

    /// Links a Due transaction to the customer who owes it.
    ///
    /// Kept separate from recording the transaction so a Due transaction
    /// without a resolved customer stays representable; `record_checkout`
    /// on the transaction repository does both atomically.
    pub async fn record_due(&self, transaction_id: Option<i64>, customer_id: &str, amount: Money) -> DbResult<DueRecord> {
        let mut tx = self.pool.begin().await?;
        let record = insert_due(&mut tx, transaction_id, customer_id, amount).await?;
        tx.commit().await?;
        Ok(record)
    }

    /// Records a payment against the customer's outstanding due.
    ///
    /// ## Errors
    /// - `NotFound` for an unknown customer
    /// - `Core(Validation)` when `amount <= 0`
    /// - `Core(SettlementExceedsDue)` when `amount` is more than is owed
    pub async fn record_settlement(&self, customer_id: &str, amount: Money) -> DbResult<Settlement> {
        let customer_id = validate_customer_id(customer_id)?;
        validate_positive("settlement amount", amount)?;

        let mut tx = self.pool.begin().await?;

        ensure_customer_exists(&mut tx, &customer_id).await?;
        let balance = balance_in(&mut tx, &customer_id).await?;

        if let Err(err) = ensure_settlement_within(&customer_id, balance.outstanding(), amount) {
            if let CoreError::SettlementExceedsDue { outstanding, requested, .. } = &err {
                warn!(
                    customer_id = %customer_id,
                    outstanding = %outstanding,
                    requested = %requested,
                    "Settlement rejected"
                );
            }
            return Err(err.into());
        }

        let now = Utc::now();
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO settlements (customer_id, amount, created_at) VALUES (?1, ?2, ?3) RETURNING id",
        )
        .bind(&customer_id)
        .bind(amount)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(settlement_id = id, customer_id = %customer_id, amount = %amount, "Settlement recorded");

        Ok(Settlement {
            id,
            customer_id,
            amount,
            created_at: now,
        })
    }

    /// Total dues and settlements for one customer (zero for unknown ids).
    pub async fn balance(&self, customer_id: &str) -> DbResult<Balance> {
        let mut conn = self.pool.acquire().await?;
        balance_in(&mut conn, customer_id.trim()).await
    }

    /// `Σ dues − Σ settlements`. Never clamped; zero for no records.
    pub async fn outstanding_due(&self, customer_id: &str) -> DbResult<Money> {
        Ok(self.balance(customer_id).await?.outstanding())
    }

    /// Every customer with its outstanding due, ordered numerically by id.
    pub async fn list_with_balances(&self) -> DbResult<Vec<CustomerBalance>> {
        let rows = sqlx::query_as::<_, CustomerBalance>(
            r#"
            SELECT
                c.customer_id,
                c.name,
                c.phone,
                COALESCE((SELECT SUM(d.amount) FROM due_records d WHERE d.customer_id = c.customer_id), 0)
                  - COALESCE((SELECT SUM(s.amount) FROM settlements s WHERE s.customer_id = c.customer_id), 0)
                  AS outstanding
            FROM customers c
            ORDER BY CAST(c.customer_id AS INTEGER)
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Customers that still owe money.
    pub async fn list_with_dues(&self) -> DbResult<Vec<CustomerBalance>> {
        Ok(self
            .list_with_balances()
            .await?
            .into_iter()
            .filter(CustomerBalance::has_due)
            .collect())
    }

    /// Due records of one customer, oldest first.
    pub async fn dues(&self, customer_id: &str) -> DbResult<Vec<DueRecord>> {
        let rows = sqlx::query_as::<_, DueRecord>(
            r#"
            SELECT id, transaction_id, customer_id, amount, created_at
            FROM due_records
            WHERE customer_id = ?1
            ORDER BY created_at, id
            "#,
        )
        .bind(customer_id.trim())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Settlements of one customer, oldest first.
    pub async fn settlements(&self, customer_id: &str) -> DbResult<Vec<Settlement>> {
        let rows = sqlx::query_as::<_, Settlement>(
            r#"
            SELECT id, customer_id, amount, created_at
            FROM settlements
            WHERE customer_id = ?1
            ORDER BY created_at, id
            "#,
        )
        .bind(customer_id.trim())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

// =============================================================================
// Connection-level helpers (shared with checkout)
// =============================================================================

async fn ensure_customer_exists(conn: &mut SqliteConnection, customer_id: &str) -> DbResult<()> {
    let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM customers WHERE customer_id = ?1")
        .bind(customer_id)
        .fetch_optional(&mut *conn)
        .await?;

    match exists {
        Some(_) => Ok(()),
        None => Err(DbError::not_found("Customer", customer_id)),
    }
}

async fn balance_in(conn: &mut SqliteConnection, customer_id: &str) -> DbResult<Balance> {
    let balance = sqlx::query_as::<_, Balance>(
        r#"
        SELECT
            (SELECT COALESCE(SUM(amount), 0) FROM due_records WHERE customer_id = ?1) AS total_due,
            (SELECT COALESCE(SUM(amount), 0) FROM settlements WHERE customer_id = ?1) AS total_settled
        "#,
    )
    .bind(customer_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(balance)
}

/// Inserts a due record on an open connection or transaction.
pub(crate) async fn insert_due(
    conn: &mut SqliteConnection,
    transaction_id: Option<i64>,
    customer_id: &str,
    amount: Money,
) -> DbResult<DueRecord> {
    let customer_id = validate_customer_id(customer_id)?;
    validate_positive("due amount", amount)?;
    ensure_customer_exists(conn, &customer_id).await?;

    let now = Utc::now();
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO due_records (transaction_id, customer_id, amount, created_at)
        VALUES (?1, ?2, ?3, ?4)
        RETURNING id
        "#,
    )
    .bind(transaction_id)
    .bind(&customer_id)
    .bind(amount)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    debug!(due_record_id = id, ?transaction_id, customer_id = %customer_id, amount = %amount, "Due recorded");

    Ok(DueRecord {
        id,
        transaction_id,
        customer_id,
        amount,
        created_at: now,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::test_support::test_db;
    use digical_core::ValidationError;
    use std::cell::Cell;

    fn new_customer(name: &str, phone: &str) -> NewCustomer {
        NewCustomer {
            name: name.to_string(),
            phone: phone.to_string(),
            email: None,
        }
    }

    #[tokio::test]
    async fn test_customer_ids_start_at_1000_and_increase() {
        let db = test_db().await;
        let repo = db.customers();

        assert_eq!(repo.next_customer_id().await.unwrap(), "1000");

        let ids: Vec<String> = {
            let mut ids = Vec::new();
            for (name, phone) in [("Ravi", "9876543210"), ("Meena", "9876500000"), ("Arun", "9000000000")] {
                ids.push(repo.create(&new_customer(name, phone)).await.unwrap().customer_id);
            }
            ids
        };

        assert_eq!(ids, vec!["1000", "1001", "1002"]);
        assert_eq!(repo.next_customer_id().await.unwrap(), "1003");
    }

    #[tokio::test]
    async fn test_taken_id_is_retried_then_given_up() {
        let counter = Cell::new(0);
        let calls = &counter;
        let id = retry_on_taken_id(move || async move {
            calls.set(calls.get() + 1);
            if calls.get() < MAX_ID_ATTEMPTS {
                Err(DbError::duplicate("customers.customer_id", "1000"))
            } else {
                Ok("1001".to_string())
            }
        })
        .await
        .unwrap();
        assert_eq!(id, "1001");
        assert_eq!(calls.get(), MAX_ID_ATTEMPTS);

        calls.set(0);
        let err = retry_on_taken_id(move || async move {
            calls.set(calls.get() + 1);
            Err::<String, _>(DbError::duplicate("customers.customer_id", "1000"))
        })
        .await
        .unwrap_err();
        assert!(err.is_unique_violation());
        assert_eq!(calls.get(), MAX_ID_ATTEMPTS);

        calls.set(0);
        let err = retry_on_taken_id(move || async move {
            calls.set(calls.get() + 1);
            Err::<String, _>(DbError::PoolExhausted)
        })
        .await
        .unwrap_err();
        assert!(matches!(err, DbError::PoolExhausted));
        assert_eq!(calls.get(), 1, "only a taken id is retried");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_get_distinct_consecutive_ids() {
        let dir = tempfile::tempdir().unwrap();
        let config = DbConfig::new(dir.path().join("ledger.db")).max_connections(4);
        let db = Database::new(config).await.unwrap();

        let mut tasks = Vec::new();
        for n in 0..8 {
            let repo = db.customers();
            tasks.push(tokio::spawn(async move {
                repo.create(&new_customer(&format!("Walk-in {n}"), &format!("98765432{n:02}")))
                    .await
                    .map(|c| c.customer_id)
            }));
        }

        let mut ids = Vec::new();
        for task in tasks {
            ids.push(task.await.unwrap().unwrap());
        }
        ids.sort_by_key(|id| id.parse::<u32>().unwrap());

        let expected: Vec<String> = (1000..1008).map(|id: u32| id.to_string()).collect();
        assert_eq!(ids, expected);
        db.close().await;
    }

    #[tokio::test]
    async fn test_ids_order_numerically() {
        let db = test_db().await;
        let repo = db.customers();

        // A legacy row above the generated range
        sqlx::query("INSERT INTO customers (customer_id, name, phone, created_at) VALUES ('9999', 'Old', '9111111111', ?1)")
            .bind(Utc::now())
            .execute(db.pool())
            .await
            .unwrap();

        let next = repo.create(&new_customer("New", "9222222222")).await.unwrap();
        assert_eq!(next.customer_id, "10000");

        let order: Vec<String> = repo.list().await.unwrap().into_iter().map(|c| c.customer_id).collect();
        assert_eq!(order, vec!["9999", "10000"], "numeric, not lexical, order");
    }

    #[tokio::test]
    async fn test_create_validates() {
        let db = test_db().await;
        let err = db.customers().create(&new_customer("Ravi", "12345")).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::Validation(ValidationError::InvalidFormat { .. }))
        ));
    }

    #[tokio::test]
    async fn test_lookup_and_update() {
        let db = test_db().await;
        let repo = db.customers();

        let created = repo.create(&new_customer("Ravi", "9876543210")).await.unwrap();
        assert_eq!(repo.get_by_phone("9876543210").await.unwrap().unwrap(), created);
        assert!(repo.get("4242").await.unwrap().is_none());

        let changed = NewCustomer {
            name: "Ravi Kumar".to_string(),
            phone: "9000011111".to_string(),
            email: Some("ravi@example.com".to_string()),
        };
        let updated = repo.update(&created.customer_id, &changed).await.unwrap();
        assert_eq!(updated.name, "Ravi Kumar");
        assert_eq!(updated.email.as_deref(), Some("ravi@example.com"));

        assert!(matches!(
            repo.update("4242", &changed).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_balance_tracks_dues_minus_settlements() {
        let db = test_db().await;
        let repo = db.customers();
        let id = repo.create(&new_customer("Ravi", "9876543210")).await.unwrap().customer_id;

        assert!(repo.outstanding_due(&id).await.unwrap().is_zero());

        let mut expected = 0;
        for (is_due, cents) in [(true, 30000), (false, 10000), (true, 4550), (false, 4550), (true, 1)] {
            if is_due {
                repo.record_due(None, &id, Money::from_cents(cents)).await.unwrap();
                expected += cents;
            } else {
                repo.record_settlement(&id, Money::from_cents(cents)).await.unwrap();
                expected -= cents;
            }
            assert_eq!(repo.outstanding_due(&id).await.unwrap().cents(), expected);
        }

        let balance = repo.balance(&id).await.unwrap();
        assert_eq!(balance.total_due.cents(), 34551);
        assert_eq!(balance.total_settled.cents(), 14550);
        assert_eq!(repo.dues(&id).await.unwrap().len(), 3);
        assert_eq!(repo.settlements(&id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_settlement_over_due_is_rejected() {
        let db = test_db().await;
        let repo = db.customers();
        let id = repo.create(&new_customer("Ravi", "9876543210")).await.unwrap().customer_id;

        repo.record_due(None, &id, Money::from_major(200)).await.unwrap();

        let err = repo.record_settlement(&id, Money::from_major(250)).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::SettlementExceedsDue { .. })));

        // Nothing was written
        assert_eq!(repo.outstanding_due(&id).await.unwrap(), Money::from_major(200));
        assert!(repo.settlements(&id).await.unwrap().is_empty());

        // Settling exactly the balance is fine
        repo.record_settlement(&id, Money::from_major(200)).await.unwrap();
        assert!(repo.outstanding_due(&id).await.unwrap().is_zero());
    }

    #[tokio::test]
    async fn test_settlement_rejects_bad_input() {
        let db = test_db().await;
        let repo = db.customers();
        let id = repo.create(&new_customer("Ravi", "9876543210")).await.unwrap().customer_id;
        repo.record_due(None, &id, Money::from_major(10)).await.unwrap();

        assert!(matches!(
            repo.record_settlement(&id, Money::zero()).await,
            Err(DbError::Core(CoreError::Validation(_)))
        ));
        assert!(matches!(
            repo.record_settlement("4242", Money::from_major(1)).await,
            Err(DbError::NotFound { .. })
        ));
        assert!(matches!(
            repo.record_due(None, "4242", Money::from_major(1)).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_with_dues_flags_owing_customers() {
        let db = test_db().await;
        let repo = db.customers();
        let ravi = repo.create(&new_customer("Ravi", "9876543210")).await.unwrap().customer_id;
        let meena = repo.create(&new_customer("Meena", "9876500000")).await.unwrap().customer_id;

        repo.record_due(None, &ravi, Money::from_major(50)).await.unwrap();

        let all = repo.list_with_balances().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].outstanding, Money::from_major(50));
        assert!(all[1].outstanding.is_zero());

        let owing = repo.list_with_dues().await.unwrap();
        assert_eq!(owing.len(), 1);
        assert_eq!(owing[0].customer_id, ravi);
        assert_ne!(owing[0].customer_id, meena);
    }
}
