//! # Repository Module
//!
//! Database repository implementations for DigiCal.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  CLI command                                                           │
//! │       │                                                                 │
//! │       │  db.customers().record_settlement("1000", amount)              │
//! │       ▼                                                                 │
//! │  CustomerRepository                                                    │
//! │  ├── validate input (digical-core::validation)                         │
//! │  ├── BEGIN                                                             │
//! │  ├── read outstanding due       ┐                                      │
//! │  ├── ensure_settlement_within   │ one SQLite transaction               │
//! │  ├── INSERT settlement          ┘                                      │
//! │  └── COMMIT                                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Writes spanning tables share a `&mut SqliteConnection` taken from the │
//! │  open transaction, never a second pool connection.                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`TransactionRepository`](transaction::TransactionRepository) - Sales, expenses, checkouts
//! - [`HandlerRepository`](handler::HandlerRepository) - Handlers and activation
//! - [`CustomerRepository`](customer::CustomerRepository) - Customers, dues, settlements
//! - [`ProductRepository`](product::ProductRepository) - Stock
//! - [`CalculationRepository`](calculation::CalculationRepository) - Calculator log
//! - [`CategoryRepository`](category::CategoryRepository) - Categories
//! - [`SummaryRepository`](summary::SummaryRepository) - Aggregated reads

pub mod calculation;
pub mod category;
pub mod customer;
pub mod handler;
pub mod product;
pub mod summary;
pub mod transaction;

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::NaiveDate;

    use crate::pool::{Database, DbConfig};

    /// Fresh, migrated, isolated database.
    pub async fn test_db() -> Database {
        Database::new(DbConfig::in_memory())
            .await
            .expect("in-memory database")
    }

    pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }
}
