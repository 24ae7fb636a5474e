//! # Commands
//!
//! One async function per subcommand. Each takes the shared [`Context`] and
//! returns the `data` payload of the JSON envelope.
//!
//! ## Command Organization
//! - [`ledger`] - sale, expense, transactions, calc, calculations, history
//! - [`handler`] - handler CRUD, activation, performance
//! - [`customer`] - customers, dues, settlements
//! - [`product`] - stock
//! - [`report`] - summary, graphs, categories

pub mod customer;
pub mod handler;
pub mod ledger;
pub mod product;
pub mod report;

use chrono::{Local, NaiveDate};
use serde::Serialize;
use serde_json::Value;

use crate::cli::Command;
use crate::config::AppConfig;
use crate::error::ApiError;
use digical_core::TransactionType;
use digical_db::Database;

/// Result of one command: the envelope's `data`, or its `error`.
pub type CommandResult = Result<Value, ApiError>;

/// Everything a command may need, opened once per invocation.
#[derive(Debug, Clone)]
pub struct Context {
    pub db: Database,
    pub config: AppConfig,
}

impl Context {
    pub fn new(db: Database, config: AppConfig) -> Self {
        Context { db, config }
    }

    /// Today's date in local time.
    pub fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Serializes a payload into the envelope's `data`.
pub(crate) fn respond<T: Serialize>(data: T) -> CommandResult {
    Ok(serde_json::to_value(data)?)
}

/// Routes a parsed command to its handler.
pub async fn dispatch(ctx: &Context, command: Command) -> CommandResult {
    match command {
        Command::Summary(args) => report::summary(ctx, args).await,
        Command::Sale(args) => ledger::record_entry(ctx, TransactionType::Sale, args).await,
        Command::Expense(args) => ledger::record_entry(ctx, TransactionType::Expense, args).await,
        Command::Transactions(args) => ledger::transactions(ctx, args).await,
        Command::Calc { expression } => ledger::calc(ctx, &expression).await,
        Command::Calculations { limit } => ledger::calculations(ctx, limit).await,
        Command::Handler(command) => handler::run(ctx, command).await,
        Command::Customer(command) => customer::run(ctx, command).await,
        Command::Product(command) => product::run(ctx, command).await,
        Command::Category(command) => report::category(ctx, command).await,
        Command::Graph(args) => report::graph(ctx, args).await,
        Command::History(command) => ledger::history(ctx, command).await,
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::PathBuf;

    use super::Context;
    use crate::config::AppConfig;
    use digical_db::{Database, DbConfig};

    pub async fn test_context() -> Context {
        let db = Database::new(DbConfig::in_memory()).await.expect("in-memory database");
        let config = AppConfig::from_lookup(|_| None, Some(PathBuf::from(":memory:"))).expect("default config");
        Context::new(db, config)
    }
}
