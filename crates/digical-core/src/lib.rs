//! # digical-core: Pure Business Logic for DigiCal
//!
//! This crate is the **heart** of DigiCal. It contains all business logic
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        DigiCal Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    digical CLI (apps/cli)                       │   │
//! │  │    calc ──► sale / expense ──► customer settle ──► summary     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ digical-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   money   │  │ incentive │  │  balance  │  │  summary  │  │   │
//! │  │   │   Money   │  │  engine   │  │  engine   │  │ DateRange │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐                 │   │
//! │  │   │   types   │  │validation │  │calculator │                 │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘                 │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    digical-db (Ledger Store)                    │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Transaction, Handler, Customer, Product, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//! - [`incentive`] - Handler commission per transaction
//! - [`balance`] - Customer outstanding due and the settlement bound
//! - [`summary`] - Period totals, breakdowns, chart series
//! - [`calculator`] - Expression evaluator and keypad session
//!
//! ## Example Usage
//!
//! ```rust
//! use digical_core::{calculate_incentive, Handler, Incentive, Money, Rate};
//!
//! let asha = Handler {
//!     id: 1,
//!     name: "Asha".to_string(),
//!     incentive: Incentive::Percentage(Rate::from_percent(10)),
//!     is_active: true,
//!     created_at: chrono::Utc::now(),
//! };
//!
//! let earned = calculate_incentive(Money::from_major(500), Some(&asha));
//! assert_eq!(earned.to_string(), "50.00");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod balance;
pub mod calculator;
pub mod error;
pub mod incentive;
pub mod money;
pub mod summary;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use balance::{ensure_settlement_within, Balance};
pub use calculator::{evaluate, Calculator, Evaluation};
pub use error::{CoreError, CoreResult, ValidationError};
pub use incentive::calculate_incentive;
pub use money::Money;
pub use summary::{Breakdown, DateRange, SeriesPoint, SeriesSpec, Summary};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// The first customer gets this id; later ones count up from the highest.
pub const FIRST_CUSTOMER_ID: i64 = 1000;

/// Default number of rows returned by history listings.
pub const DEFAULT_HISTORY_LIMIT: u32 = 100;

/// Categories available for sales on a fresh database.
pub const DEFAULT_SALES_CATEGORIES: &[&str] = &["Product Sales", "Service Sales", "Consulting", "Other Income"];

/// Categories available for expenses on a fresh database.
pub const DEFAULT_EXPENSE_CATEGORIES: &[&str] = &[
    "Rent",
    "Utilities",
    "Supplies",
    "Salaries",
    "Marketing",
    "Transportation",
    "Other Expenses",
];
