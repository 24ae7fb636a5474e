//! # digical-db: Ledger Store for DigiCal
//!
//! This crate owns all durable state: transactions, handlers, customers with
//! their dues and settlements, products, the calculation log and categories.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        DigiCal Data Flow                                │
//! │                                                                         │
//! │  digical sale --amount 300 --payment due --customer 1000               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     digical-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐ │   │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │ │   │
//! │  │   │   (pool.rs)   │    │                │    │  (embedded)  │ │   │
//! │  │   │               │    │ Transactions   │    │ 001_schema   │ │   │
//! │  │   │ SqlitePool    │◄───│ Customers      │    │ 002_category │ │   │
//! │  │   │               │    │ Summaries ...  │    │              │ │   │
//! │  │   └───────────────┘    └────────────────┘    └──────────────┘ │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │   SQLite file in the platform data directory (digical.db)       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use digical_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("digical.db")).await?;
//! let id = db.customers().create(&new_customer).await?.customer_id;
//! let owed = db.customers().outstanding_due(&id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::calculation::CalculationRepository;
pub use repository::category::CategoryRepository;
pub use repository::customer::CustomerRepository;
pub use repository::handler::HandlerRepository;
pub use repository::product::ProductRepository;
pub use repository::summary::SummaryRepository;
pub use repository::transaction::TransactionRepository;
