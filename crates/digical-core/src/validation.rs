//! # Validation Module
//!
//! Input validation utilities for DigiCal.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: CLI argument parsing (clap)                                  │
//! │  ├── Type validation (Money, dates, enums via FromStr)                 │
//! │  └── Immediate usage errors                                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Repositories (digical-db)                                    │
//! │  └── THIS MODULE: Business rule validation before any write            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK constraints (amount > 0, 0 <= left_qty <= total_qty)        │
//! │  ├── UNIQUE constraints (handler name, customer_id, category)          │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Validators that normalise their input return the cleaned value so the
//! caller stores exactly what was checked.

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{Incentive, NewCustomer, NewHandler, NewProduct, NewTransaction, ProductUpdate};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Maximum length of names (handlers, customers, products, categories).
pub const MAX_NAME_LEN: usize = 100;

/// Maximum length of a transaction description.
pub const MAX_DESCRIPTION_LEN: usize = 500;

/// Largest amount a single record may carry, in minor units (10,000,000,000.00).
///
/// Keeps period totals well inside `i64` no matter how many records a
/// summary folds.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000;

/// Number of digits in a customer phone number.
pub const PHONE_DIGITS: usize = 10;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a required, length-limited name and returns it trimmed.
///
/// ## Example
/// ```rust
/// use digical_core::validation::validate_name;
///
/// assert_eq!(validate_name("name", "  Asha ").unwrap(), "Asha");
/// assert!(validate_name("name", "   ").is_err());
/// ```
pub fn validate_name(field: &str, value: &str) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(value.to_string())
}

/// Validates a transaction category.
pub fn validate_category(category: &str) -> ValidationResult<String> {
    validate_name("category", category)
}

/// Validates an optional free-text description (may be empty).
pub fn validate_description(description: &str) -> ValidationResult<String> {
    let description = description.trim();

    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(ValidationError::TooLong {
            field: "description".to_string(),
            max: MAX_DESCRIPTION_LEN,
        });
    }

    Ok(description.to_string())
}

/// Validates a customer phone number.
///
/// ## Rules
/// - Required
/// - Exactly 10 digits, no separators
pub fn validate_phone(phone: &str) -> ValidationResult<String> {
    let phone = phone.trim();

    if phone.is_empty() {
        return Err(ValidationError::required("phone"));
    }

    if phone.len() != PHONE_DIGITS || !phone.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::invalid_format(
            "phone",
            format!("must be exactly {} digits", PHONE_DIGITS),
        ));
    }

    Ok(phone.to_string())
}

/// Validates an optional email. Blank input means "no email".
pub fn validate_email(email: Option<&str>) -> ValidationResult<Option<String>> {
    let Some(email) = email.map(str::trim).filter(|e| !e.is_empty()) else {
        return Ok(None);
    };

    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') && !domain.starts_with('.') => {
            Ok(Some(email.to_string()))
        }
        _ => Err(ValidationError::invalid_format("email", "must look like name@domain.tld")),
    }
}

/// Validates a customer id such as `"1000"`.
pub fn validate_customer_id(customer_id: &str) -> ValidationResult<String> {
    let customer_id = customer_id.trim();

    if customer_id.is_empty() {
        return Err(ValidationError::required("customer_id"));
    }

    if !customer_id.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::invalid_format("customer_id", "must be numeric"));
    }

    Ok(customer_id.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates that an amount is strictly positive and at most [`MAX_AMOUNT`].
///
/// ## Example
/// ```rust
/// use digical_core::money::Money;
/// use digical_core::validation::{validate_positive, MAX_AMOUNT};
///
/// assert!(validate_positive("amount", Money::from_cents(1)).is_ok());
/// assert!(validate_positive("amount", Money::zero()).is_err());
/// assert!(validate_positive("amount", Money::from_cents(MAX_AMOUNT + 1)).is_err());
/// ```
pub fn validate_positive(field: &str, amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    validate_max_amount(field, amount)
}

/// Validates a non-negative price (zero is allowed for free items).
pub fn validate_price(price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::Negative {
            field: "price".to_string(),
        });
    }

    validate_max_amount("price", price)
}

fn validate_max_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.cents() > MAX_AMOUNT {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_AMOUNT,
        });
    }

    Ok(())
}

/// Validates product stock levels.
///
/// ## Rules
/// ```text
/// 0 <= left_qty <= total_qty
/// ```
pub fn validate_stock(total_qty: i64, left_qty: i64) -> ValidationResult<()> {
    if total_qty < 0 {
        return Err(ValidationError::Negative {
            field: "total_qty".to_string(),
        });
    }

    if left_qty < 0 {
        return Err(ValidationError::Negative {
            field: "left_qty".to_string(),
        });
    }

    if left_qty > total_qty {
        return Err(ValidationError::ExceedsTotal {
            field: "left_qty".to_string(),
            value: left_qty,
            limit_field: "total_qty".to_string(),
            limit: total_qty,
        });
    }

    Ok(())
}

/// Validates a quantity consumed from stock.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    Ok(())
}

/// Validates an incentive configuration.
///
/// Percentages are unsigned by construction; only fixed amounts can go
/// negative.
pub fn validate_incentive(incentive: &Incentive) -> ValidationResult<()> {
    match incentive {
        Incentive::Percentage(_) => Ok(()),
        Incentive::Fixed(amount) if amount.is_negative() => Err(ValidationError::Negative {
            field: "incentive_value".to_string(),
        }),
        Incentive::Fixed(amount) => validate_max_amount("incentive_value", *amount),
    }
}

// =============================================================================
// Record Validators
// =============================================================================

/// Validates a transaction and returns it with trimmed text fields.
pub fn validate_new_transaction(tx: &NewTransaction) -> ValidationResult<NewTransaction> {
    validate_positive("amount", tx.amount)?;

    Ok(NewTransaction {
        category: validate_category(&tx.category)?,
        description: validate_description(&tx.description)?,
        ..tx.clone()
    })
}

/// Validates a handler and returns it with a trimmed name.
pub fn validate_new_handler(handler: &NewHandler) -> ValidationResult<NewHandler> {
    validate_incentive(&handler.incentive)?;

    Ok(NewHandler {
        name: validate_name("name", &handler.name)?,
        incentive: handler.incentive,
    })
}

/// Validates a customer and returns the cleaned record.
pub fn validate_new_customer(customer: &NewCustomer) -> ValidationResult<NewCustomer> {
    Ok(NewCustomer {
        name: validate_name("name", &customer.name)?,
        phone: validate_phone(&customer.phone)?,
        email: validate_email(customer.email.as_deref())?,
    })
}

/// Validates a new product, resolving `left_qty` to `total_qty` when unset.
pub fn validate_new_product(product: &NewProduct) -> ValidationResult<ProductUpdate> {
    validate_product_update(&ProductUpdate {
        name: product.name.clone(),
        category: product.category.clone(),
        total_qty: product.total_qty,
        left_qty: product.left_qty.unwrap_or(product.total_qty),
        price: product.price,
    })
}

/// Validates a full product update.
pub fn validate_product_update(product: &ProductUpdate) -> ValidationResult<ProductUpdate> {
    validate_stock(product.total_qty, product.left_qty)?;
    validate_price(product.price)?;

    Ok(ProductUpdate {
        name: validate_name("name", &product.name)?,
        category: validate_category(&product.category)?,
        ..product.clone()
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
