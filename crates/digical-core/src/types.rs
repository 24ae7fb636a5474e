//! # Domain Types
//!
//! Core domain types used throughout DigiCal.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  Transaction    │   │    Handler      │   │    Customer     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (rowid)     │   │  id (rowid)     │   │  customer_id    │       │
//! │  │  kind           │──►│  name (unique)  │   │  ("1000", ...)  │       │
//! │  │  amount         │   │  incentive      │   │  name, phone    │       │
//! │  │  payment_method │   │  is_active      │   └────────┬────────┘       │
//! │  └────────┬────────┘   └─────────────────┘            │                │
//! │           │ Due                                        │                │
//! │           ▼                                            ▼                │
//! │  ┌─────────────────┐                         ┌─────────────────┐       │
//! │  │   DueRecord     │                         │   Settlement    │       │
//! │  │  + amount ──────┼──► outstanding_due ◄────┼── − amount      │       │
//! │  └─────────────────┘                         └─────────────────┘       │
//! │                                                                         │
//! │  Product (stock)     Calculation (side log)     Category (seeded)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Rows use SQLite integer rowids, except customers whose `customer_id` is a
//! human-facing numeric string handed out by the store.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Rate
// =============================================================================

/// Percentage represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 1000 bps = 10% (a typical handler commission)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Rate(u32);

impl Rate {
    /// Creates a rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Rate(bps)
    }

    /// Creates a rate from whole percent.
    #[inline]
    pub const fn from_percent(pct: u32) -> Self {
        Rate(pct * 100)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Zero rate.
    #[inline]
    pub const fn zero() -> Self {
        Rate(0)
    }
}

impl Default for Rate {
    fn default() -> Self {
        Rate::zero()
    }
}

/// Renders as a percentage without the sign: `10`, `2.5`.
impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Decimal::new(self.0 as i64, 2).normalize())
    }
}

/// Parses a percentage such as `"10"` or `"2.5"` (at most two decimals).
impl FromStr for Rate {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let pct: Money = s.parse().map_err(|_| {
            ValidationError::invalid_format("incentive_value", format!("'{}' is not a percentage", s.trim()))
        })?;

        if pct.is_negative() {
            return Err(ValidationError::Negative {
                field: "incentive_value".to_string(),
            });
        }

        // Percent with two decimals is exactly basis points
        u32::try_from(pct.cents())
            .map(Rate)
            .map_err(|_| ValidationError::invalid_format("incentive_value", "percentage is too large"))
    }
}

// =============================================================================
// Transaction Type
// =============================================================================

/// Whether a ledger entry brings money in or sends it out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Sale,
    Expense,
}

impl TransactionType {
    /// Storage / wire name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Sale => "sale",
            TransactionType::Expense => "expense",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sale" | "sales" => Ok(TransactionType::Sale),
            "expense" | "expenses" => Ok(TransactionType::Expense),
            other => Err(ValidationError::invalid_format(
                "type",
                format!("'{}' is not one of sale, expense", other),
            )),
        }
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How a transaction was paid.
///
/// `Due` extends credit to a customer; those transactions get a
/// [`DueRecord`] linking them to the customer's balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
pub enum PaymentMethod {
    Cash,
    #[serde(rename = "UPI")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "UPI"))]
    Upi,
    Due,
}

impl PaymentMethod {
    /// Storage / wire name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Cash",
            PaymentMethod::Upi => "UPI",
            PaymentMethod::Due => "Due",
        }
    }
}

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Cash
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "upi" => Ok(PaymentMethod::Upi),
            "due" => Ok(PaymentMethod::Due),
            other => Err(ValidationError::invalid_format(
                "payment_method",
                format!("'{}' is not one of cash, upi, due", other),
            )),
        }
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// A recorded sale or expense, as read back from the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Transaction {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub amount: Money,
    pub category: String,
    pub description: String,
    pub payment_method: PaymentMethod,
    pub handler_id: Option<i64>,
    /// Resolved by join; `None` when no handler was set or it was deleted.
    pub handler_name: Option<String>,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Input for recording a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTransaction {
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub amount: Money,
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    pub handler_id: Option<i64>,
    /// Calendar date of the entry; today when `None`.
    pub date: Option<NaiveDate>,
}

impl NewTransaction {
    /// Cash sale with no description, dated today.
    pub fn sale(amount: Money, category: impl Into<String>) -> Self {
        Self::new(TransactionType::Sale, amount, category)
    }

    /// Cash expense with no description, dated today.
    pub fn expense(amount: Money, category: impl Into<String>) -> Self {
        Self::new(TransactionType::Expense, amount, category)
    }

    fn new(kind: TransactionType, amount: Money, category: impl Into<String>) -> Self {
        NewTransaction {
            kind,
            amount,
            category: category.into(),
            description: String::new(),
            payment_method: PaymentMethod::Cash,
            handler_id: None,
            date: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_payment(mut self, method: PaymentMethod) -> Self {
        self.payment_method = method;
        self
    }

    pub fn with_handler(mut self, handler_id: Option<i64>) -> Self {
        self.handler_id = handler_id;
        self
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }
}

/// Filter for listing transactions. Date bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionFilter {
    #[serde(rename = "type")]
    pub kind: Option<TransactionType>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub limit: Option<u32>,
}

impl TransactionFilter {
    /// Every transaction of every type.
    pub fn all() -> Self {
        Self::default()
    }

    /// Transactions dated within `[start, end]`.
    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        TransactionFilter {
            start: Some(start),
            end: Some(end),
            ..Self::default()
        }
    }

    pub fn of_kind(mut self, kind: TransactionType) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// One product line consumed by a checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockConsumption {
    pub product_id: i64,
    pub quantity: i64,
}

/// Everything a single checkout writes, applied atomically by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkout {
    pub transaction: NewTransaction,
    /// Customer owing the amount; required when paying by `Due`.
    pub due_customer: Option<String>,
    #[serde(default)]
    pub consumed: Vec<StockConsumption>,
}

// =============================================================================
// Handler & Incentive
// =============================================================================

/// Discriminant of [`Incentive`], as stored in `handlers.incentive_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncentiveType {
    Percentage,
    Fixed,
}

impl IncentiveType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            IncentiveType::Percentage => "percentage",
            IncentiveType::Fixed => "fixed",
        }
    }
}

impl FromStr for IncentiveType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "percentage" | "percent" | "%" => Ok(IncentiveType::Percentage),
            "fixed" => Ok(IncentiveType::Fixed),
            other => Err(ValidationError::invalid_format(
                "incentive_type",
                format!("'{}' is not one of percentage, fixed", other),
            )),
        }
    }
}

/// How a handler earns commission on a transaction.
///
/// ## Storage
/// Persisted as `(incentive_type, incentive_value)` where the value is in
/// hundredths: basis points for a percentage, minor units for a fixed amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Incentive {
    /// A share of the transaction amount.
    Percentage(Rate),
    /// A flat amount per transaction, independent of the amount.
    Fixed(Money),
}

impl Incentive {
    /// Parses a user-entered value under the given type.
    ///
    /// ```rust
    /// use digical_core::types::{Incentive, IncentiveType, Rate};
    ///
    /// let inc = Incentive::parse(IncentiveType::Percentage, "2.5").unwrap();
    /// assert_eq!(inc, Incentive::Percentage(Rate::from_bps(250)));
    /// ```
    pub fn parse(kind: IncentiveType, value: &str) -> Result<Self, ValidationError> {
        match kind {
            IncentiveType::Percentage => Ok(Incentive::Percentage(value.parse()?)),
            IncentiveType::Fixed => {
                let amount: Money = value.parse()?;
                if amount.is_negative() {
                    return Err(ValidationError::Negative {
                        field: "incentive_value".to_string(),
                    });
                }
                Ok(Incentive::Fixed(amount))
            }
        }
    }

    /// Rebuilds an incentive from its stored columns.
    pub fn from_parts(kind: IncentiveType, hundredths: i64) -> Result<Self, ValidationError> {
        match kind {
            IncentiveType::Percentage => u32::try_from(hundredths)
                .map(|bps| Incentive::Percentage(Rate::from_bps(bps)))
                .map_err(|_| ValidationError::OutOfRange {
                    field: "incentive_value".to_string(),
                    min: 0,
                    max: u32::MAX as i64,
                }),
            IncentiveType::Fixed => Ok(Incentive::Fixed(Money::from_cents(hundredths))),
        }
    }

    pub const fn kind(&self) -> IncentiveType {
        match self {
            Incentive::Percentage(_) => IncentiveType::Percentage,
            Incentive::Fixed(_) => IncentiveType::Fixed,
        }
    }

    /// Stored value in hundredths, see the type docs.
    pub const fn hundredths(&self) -> i64 {
        match self {
            Incentive::Percentage(rate) => rate.bps() as i64,
            Incentive::Fixed(amount) => amount.cents(),
        }
    }
}

/// A salesperson/operator whose transactions earn an incentive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handler {
    pub id: i64,
    pub name: String,
    pub incentive: Incentive,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for creating or updating a handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewHandler {
    pub name: String,
    pub incentive: Incentive,
}

/// A handler together with everything it has earned in the calculation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct HandlerPerformance {
    pub handler_id: i64,
    pub name: String,
    pub total_incentive: Money,
    pub calculations: i64,
}

// =============================================================================
// Customers & Dues
// =============================================================================

/// A customer that can buy on credit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    /// Numeric string handed out by the store, starting at "1000".
    pub customer_id: String,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating or updating a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCustomer {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
}

/// A customer row with its current outstanding due.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CustomerBalance {
    pub customer_id: String,
    pub name: String,
    pub phone: String,
    pub outstanding: Money,
}

impl CustomerBalance {
    /// Whether the customer still owes money.
    pub fn has_due(&self) -> bool {
        self.outstanding.is_positive()
    }
}

/// Credit extended to a customer by a Due transaction.
///
/// `transaction_id` becomes `None` once transaction history is cleared; the
/// amount keeps counting toward the balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct DueRecord {
    pub id: i64,
    pub transaction_id: Option<i64>,
    pub customer_id: String,
    pub amount: Money,
    pub created_at: DateTime<Utc>,
}

/// A payment against a customer's outstanding due.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Settlement {
    pub id: i64,
    pub customer_id: String,
    pub amount: Money,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Products
// =============================================================================

/// A stocked product.
///
/// ## Invariant
/// `0 <= left_qty <= total_qty`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub total_qty: i64,
    pub left_qty: i64,
    pub price: Money,
}

impl Product {
    /// Units sold (or otherwise consumed) since the last restock.
    pub fn sold_qty(&self) -> i64 {
        self.total_qty - self.left_qty
    }

    pub fn is_out_of_stock(&self) -> bool {
        self.left_qty == 0
    }
}

/// Input for creating a product. `left_qty` defaults to `total_qty`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub category: String,
    pub total_qty: i64,
    pub left_qty: Option<i64>,
    pub price: Money,
}

/// Full replacement of a product's editable fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: String,
    pub category: String,
    pub total_qty: i64,
    pub left_qty: i64,
    pub price: Money,
}

// =============================================================================
// Calculation Log
// =============================================================================

/// One logged calculator evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Calculation {
    pub id: i64,
    pub expression: String,
    pub result: String,
    pub handler_id: Option<i64>,
    pub handler_name: Option<String>,
    pub handler_incentive: Money,
    pub timestamp: DateTime<Utc>,
}

/// Input for logging a calculator evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCalculation {
    pub expression: String,
    pub result: String,
    pub handler_id: Option<i64>,
    pub handler_incentive: Money,
}

// =============================================================================
// Categories
// =============================================================================

/// A named bucket for transactions of one type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Category {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_parse_and_display() {
        assert_eq!("10".parse::<Rate>().unwrap().bps(), 1000);
        assert_eq!("2.5".parse::<Rate>().unwrap().bps(), 250);
        assert_eq!(Rate::from_bps(250).to_string(), "2.5");
        assert_eq!(Rate::from_percent(10).to_string(), "10");

        assert!(matches!(
            "-1".parse::<Rate>(),
            Err(ValidationError::Negative { .. })
        ));
        assert!("ten".parse::<Rate>().is_err());
    }

    #[test]
    fn test_payment_method_wire_names() {
        assert_eq!(serde_json::to_string(&PaymentMethod::Upi).unwrap(), "\"UPI\"");
        assert_eq!(serde_json::to_string(&PaymentMethod::Due).unwrap(), "\"Due\"");
        assert_eq!("upi".parse::<PaymentMethod>().unwrap(), PaymentMethod::Upi);
        assert!("card".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn test_transaction_type_parse() {
        assert_eq!("Sale".parse::<TransactionType>().unwrap(), TransactionType::Sale);
        assert_eq!("expenses".parse::<TransactionType>().unwrap(), TransactionType::Expense);
        assert_eq!(TransactionType::Expense.to_string(), "expense");
    }

    #[test]
    fn test_incentive_storage_parts() {
        let pct = Incentive::parse(IncentiveType::Percentage, "10").unwrap();
        assert_eq!(pct.kind(), IncentiveType::Percentage);
        assert_eq!(pct.hundredths(), 1000);
        assert_eq!(Incentive::from_parts(pct.kind(), pct.hundredths()).unwrap(), pct);

        let fixed = Incentive::parse(IncentiveType::Fixed, "15").unwrap();
        assert_eq!(fixed, Incentive::Fixed(Money::from_major(15)));
        assert_eq!(fixed.hundredths(), 1500);

        assert!(Incentive::parse(IncentiveType::Fixed, "-2").is_err());
        assert!(Incentive::from_parts(IncentiveType::Percentage, -5).is_err());
    }

    #[test]
    fn test_incentive_json_shape() {
        let json = serde_json::to_value(Incentive::Percentage(Rate::from_bps(1000))).unwrap();
        assert_eq!(json, serde_json::json!({"type": "percentage", "value": 1000}));
    }

    #[test]
    fn test_new_transaction_builder() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let tx = NewTransaction::sale(Money::from_major(500), "Product Sales")
            .with_payment(PaymentMethod::Upi)
            .with_description("walk-in")
            .on(date);

        assert_eq!(tx.kind, TransactionType::Sale);
        assert_eq!(tx.payment_method, PaymentMethod::Upi);
        assert_eq!(tx.date, Some(date));
        assert_eq!(tx.handler_id, None);
    }

    #[test]
    fn test_product_sold_qty() {
        let p = Product {
            id: 1,
            name: "Pen".to_string(),
            category: "Stationery".to_string(),
            total_qty: 10,
            left_qty: 0,
            price: Money::from_cents(1000),
        };
        assert_eq!(p.sold_qty(), 10);
        assert!(p.is_out_of_stock());
    }
}
