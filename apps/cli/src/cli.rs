//! # Command-Line Interface
//!
//! Argument definitions for the `digical` binary. Every subcommand prints a
//! single JSON envelope on stdout; logs go to stderr.
//!
//! ```text
//! digical [--db PATH] <command>
//!
//!   summary       Period totals
//!   sale          Record a sale (optionally on credit, consuming stock)
//!   expense       Record an expense
//!   transactions  List or search the ledger
//!   calc          Evaluate an expression and log it
//!   calculations  Show the calculation log
//!   handler       Manage handlers and incentives
//!   customer      Manage customers, dues and settlements
//!   product       Manage stock
//!   category      List or add categories
//!   graph         Chart data
//!   history       Clear logs
//! ```

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

use digical_core::{IncentiveType, Money, PaymentMethod, StockConsumption, TransactionType};

/// DigiCal business calculator and ledger.
#[derive(Debug, Parser)]
#[command(name = "digical", version, about)]
pub struct Cli {
    /// Database file (overrides DIGICAL_DB_PATH and the platform default).
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sales, expenses and profit for a period (today by default).
    Summary(SummaryArgs),

    /// Record a sale.
    Sale(EntryArgs),

    /// Record an expense.
    Expense(EntryArgs),

    /// List transactions, newest first.
    Transactions(TransactionsArgs),

    /// Evaluate an expression and log it with the active handler's incentive.
    Calc {
        /// Expression such as "250*2" or "1200+15%".
        expression: String,
    },

    /// Show logged calculations, newest first.
    Calculations {
        #[arg(long)]
        limit: Option<u32>,
    },

    /// Handlers and their incentives.
    #[command(subcommand)]
    Handler(HandlerCommand),

    /// Customers, dues and settlements.
    #[command(subcommand)]
    Customer(CustomerCommand),

    /// Product stock.
    #[command(subcommand)]
    Product(ProductCommand),

    /// Transaction categories.
    #[command(subcommand)]
    Category(CategoryCommand),

    /// Data points for the dashboard charts.
    Graph(GraphArgs),

    /// Clear the calculation log or the transaction history.
    #[command(subcommand)]
    History(HistoryCommand),
}

// =============================================================================
// Ledger
// =============================================================================

/// Period selection for `summary`. Without flags, today.
#[derive(Debug, Args)]
pub struct SummaryArgs {
    /// A single day (YYYY-MM-DD).
    #[arg(long, value_parser = parse_date, conflicts_with_all = ["week", "month", "from"])]
    pub date: Option<NaiveDate>,

    /// Monday of this week through today.
    #[arg(long, conflicts_with_all = ["month", "from"])]
    pub week: bool,

    /// A calendar month (YYYY-MM).
    #[arg(long, value_parser = parse_month, conflicts_with = "from")]
    pub month: Option<(i32, u32)>,

    /// Range start (inclusive). Requires --to.
    #[arg(long, requires = "to", value_parser = parse_date)]
    pub from: Option<NaiveDate>,

    /// Range end (inclusive). Requires --from.
    #[arg(long, requires = "from", value_parser = parse_date)]
    pub to: Option<NaiveDate>,
}

/// Arguments for `sale` and `expense`.
#[derive(Debug, Args)]
pub struct EntryArgs {
    #[arg(long, value_parser = parse_money)]
    pub amount: Money,

    #[arg(long)]
    pub category: String,

    #[arg(long, default_value = "")]
    pub description: String,

    /// cash, upi or due.
    #[arg(long, default_value = "cash", value_parser = parse_payment)]
    pub payment: PaymentMethod,

    /// Customer owing the amount; required with --payment due.
    #[arg(long)]
    pub customer: Option<String>,

    /// Handler to credit; defaults to the active handler.
    #[arg(long)]
    pub handler: Option<i64>,

    /// Entry date (YYYY-MM-DD); defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub date: Option<NaiveDate>,

    /// Product consumed by the sale, as ID or ID:QTY. Repeatable.
    #[arg(long = "product", value_parser = parse_consumption)]
    pub products: Vec<StockConsumption>,
}

#[derive(Debug, Args)]
pub struct TransactionsArgs {
    /// sale or expense.
    #[arg(long = "type", value_parser = parse_kind)]
    pub kind: Option<TransactionType>,

    #[arg(long, value_parser = parse_date)]
    pub from: Option<NaiveDate>,

    #[arg(long, value_parser = parse_date)]
    pub to: Option<NaiveDate>,

    #[arg(long)]
    pub limit: Option<u32>,

    /// Keyword matched against category and description (case-insensitive).
    #[arg(long, conflicts_with_all = ["from", "to", "limit"])]
    pub search: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Handler incentive as given on the command line.
#[derive(Debug, Args)]
pub struct IncentiveArgs {
    #[arg(long)]
    pub name: String,

    /// percentage or fixed.
    #[arg(long = "type", value_parser = parse_incentive_type)]
    pub kind: IncentiveType,

    /// Percent (e.g. 2.5) or fixed amount (e.g. 15.00).
    #[arg(long)]
    pub value: String,
}

#[derive(Debug, Subcommand)]
pub enum HandlerCommand {
    /// Create a handler.
    Add {
        #[command(flatten)]
        handler: IncentiveArgs,

        /// Also make it the active handler.
        #[arg(long)]
        activate: bool,
    },
    /// List handlers by name.
    List,
    /// Make a handler the active one.
    Activate { id: i64 },
    /// Leave no handler active.
    Deactivate,
    /// Rename a handler or change its incentive.
    Update {
        id: i64,
        #[command(flatten)]
        handler: IncentiveArgs,
    },
    /// Delete a handler; history keeps its rows.
    Delete { id: i64 },
    /// Accumulated incentive per handler.
    Performance,
}

// =============================================================================
// Customers
// =============================================================================

#[derive(Debug, Args)]
pub struct CustomerArgs {
    #[arg(long)]
    pub name: String,

    /// Ten-digit phone number.
    #[arg(long)]
    pub phone: String,

    #[arg(long)]
    pub email: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum CustomerCommand {
    /// Create a customer with the next id.
    Add(CustomerArgs),
    /// List customers with their outstanding due.
    List {
        /// Only customers that still owe money.
        #[arg(long)]
        with_dues: bool,
    },
    /// Show a customer by id, or by phone with --phone.
    Show {
        id: Option<String>,
        #[arg(long, conflicts_with = "id", required_unless_present = "id")]
        phone: Option<String>,
    },
    /// Replace a customer's details.
    Update {
        id: String,
        #[command(flatten)]
        customer: CustomerArgs,
    },
    /// Record a payment against the outstanding due.
    Settle {
        id: String,
        #[arg(long, value_parser = parse_money)]
        amount: Money,
    },
    /// Due records, settlements and balance of one customer.
    Dues { id: String },
}

// =============================================================================
// Products
// =============================================================================

#[derive(Debug, Subcommand)]
pub enum ProductCommand {
    /// Add a product; --left defaults to --total.
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        category: String,
        #[arg(long)]
        total: i64,
        #[arg(long)]
        left: Option<i64>,
        #[arg(long, value_parser = parse_money)]
        price: Money,
    },
    List,
    /// Replace a product's fields (restocking included).
    Update {
        id: i64,
        #[arg(long)]
        name: String,
        #[arg(long)]
        category: String,
        #[arg(long)]
        total: i64,
        #[arg(long)]
        left: i64,
        #[arg(long, value_parser = parse_money)]
        price: Money,
    },
    Delete { id: i64 },
}

// =============================================================================
// Categories, graphs, history
// =============================================================================

#[derive(Debug, Subcommand)]
pub enum CategoryCommand {
    List {
        #[arg(long = "type", value_parser = parse_kind)]
        kind: Option<TransactionType>,
    },
    Add {
        #[arg(long)]
        name: String,
        #[arg(long = "type", value_parser = parse_kind)]
        kind: TransactionType,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GraphKind {
    /// Last 7 days, one point per day.
    Weekly,
    /// Last 31 days, every third day.
    Monthly,
    /// Profit over the last 31 days, every third day.
    Profit,
    /// Month-to-date category breakdown.
    Categories,
}

#[derive(Debug, Args)]
pub struct GraphArgs {
    #[arg(value_enum)]
    pub kind: GraphKind,

    /// Transaction type for `categories`.
    #[arg(long = "type", value_parser = parse_kind, default_value = "sale")]
    pub transaction_type: TransactionType,

    /// Last day shown; defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Subcommand)]
pub enum HistoryCommand {
    /// Delete a whole log.
    Clear {
        #[arg(value_enum)]
        target: ClearTarget,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ClearTarget {
    Calculations,
    Transactions,
}

// =============================================================================
// Value Parsers
// =============================================================================

/// Parses a date string in `YYYY-MM-DD` format for clap.
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|err| format!("{err}"))
}

/// Parses `YYYY-MM`.
pub fn parse_month(s: &str) -> Result<(i32, u32), String> {
    let (year, month) = s
        .trim()
        .split_once('-')
        .ok_or_else(|| format!("expected YYYY-MM, got '{s}'"))?;
    let year = year.parse::<i32>().map_err(|err| format!("year: {err}"))?;
    let month = month.parse::<u32>().map_err(|err| format!("month: {err}"))?;
    if !(1..=12).contains(&month) {
        return Err(format!("month must be 1-12, got {month}"));
    }
    Ok((year, month))
}

pub fn parse_money(s: &str) -> Result<Money, String> {
    s.parse::<Money>().map_err(|err| err.to_string())
}

pub fn parse_payment(s: &str) -> Result<PaymentMethod, String> {
    s.parse::<PaymentMethod>().map_err(|err| err.to_string())
}

pub fn parse_kind(s: &str) -> Result<TransactionType, String> {
    s.parse::<TransactionType>().map_err(|err| err.to_string())
}

pub fn parse_incentive_type(s: &str) -> Result<IncentiveType, String> {
    s.parse::<IncentiveType>().map_err(|err| err.to_string())
}

/// Parses `ID` (one unit) or `ID:QTY`.
pub fn parse_consumption(s: &str) -> Result<StockConsumption, String> {
    let (id, qty) = match s.trim().split_once(':') {
        Some((id, qty)) => (id, qty),
        None => (s.trim(), "1"),
    };
    let product_id = id.parse::<i64>().map_err(|_| format!("invalid product id '{id}'"))?;
    let quantity = qty.parse::<i64>().map_err(|_| format!("invalid quantity '{qty}'"))?;
    if quantity <= 0 {
        return Err(format!("quantity must be positive, got {quantity}"));
    }
    Ok(StockConsumption { product_id, quantity })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_consumption() {
        assert_eq!(
            parse_consumption("7:3").unwrap(),
            StockConsumption {
                product_id: 7,
                quantity: 3
            }
        );
        assert_eq!(parse_consumption("7").unwrap().quantity, 1);
        assert!(parse_consumption("7:0").is_err());
        assert!(parse_consumption("pen:2").is_err());
    }

    #[test]
    fn test_parse_month() {
        assert_eq!(parse_month("2024-02").unwrap(), (2024, 2));
        assert!(parse_month("2024-13").is_err());
        assert!(parse_month("202402").is_err());
    }

    #[test]
    fn test_sale_arguments() {
        let cli = Cli::try_parse_from([
            "digical", "sale", "--amount", "300", "--category", "Product Sales", "--payment", "due", "--customer",
            "1000", "--product", "1:2", "--product", "4",
        ])
        .unwrap();

        match cli.command {
            Command::Sale(args) => {
                assert_eq!(args.amount, Money::from_major(300));
                assert_eq!(args.payment, PaymentMethod::Due);
                assert_eq!(args.customer.as_deref(), Some("1000"));
                assert_eq!(args.products.len(), 2);
            }
            other => panic!("expected sale, got {:?}", other),
        }
    }

    #[test]
    fn test_summary_flags_conflict() {
        assert!(Cli::try_parse_from(["digical", "summary", "--week", "--month", "2024-01"]).is_err());
        assert!(Cli::try_parse_from(["digical", "summary", "--from", "2024-01-01"]).is_err());
        assert!(Cli::try_parse_from(["digical", "summary", "--from", "2024-01-01", "--to", "2024-01-31"]).is_ok());
    }
}
