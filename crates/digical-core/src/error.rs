//! # Error Types
//!
//! Domain-specific error types for digical-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  digical-core errors (this file)                                       │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  digical-db errors (separate crate)                                    │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  CLI errors (in app)                                                   │
//! │  └── ApiError         - What the JSON surface reports                  │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → stdout       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A settlement would drive the customer's outstanding due below zero.
    ///
    /// ## User Workflow
    /// ```text
    /// Customer 1000 owes 200.00
    ///      │
    ///      ▼
    /// Settle 250.00
    ///      │
    ///      ▼
    /// SettlementExceedsDue { outstanding: 200.00, requested: 250.00 }
    /// ```
    #[error("Settlement of {requested} for customer {customer_id} exceeds outstanding due {outstanding}")]
    SettlementExceedsDue {
        customer_id: String,
        outstanding: Money,
        requested: Money,
    },

    /// Calculator expression divides by zero.
    #[error("Division by zero")]
    DivisionByZero,

    /// Calculator expression could not be parsed.
    #[error("Malformed expression: {0}")]
    MalformedExpression(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Always surfaced to the caller synchronously, never retried.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// A string field is longer than allowed.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be strictly positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} cannot be negative")]
    Negative { field: String },

    /// Invalid format (e.g., malformed amount, invalid date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// A partial quantity exceeds its total.
    #[error("{field} ({value}) cannot exceed {limit_field} ({limit})")]
    ExceedsTotal {
        field: String,
        value: i64,
        limit_field: String,
        limit: i64,
    },

    /// Duplicate value (e.g., duplicate handler name).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

impl ValidationError {
    /// Shorthand for [`ValidationError::Required`].
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    /// Shorthand for [`ValidationError::InvalidFormat`].
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::SettlementExceedsDue {
            customer_id: "1000".to_string(),
            outstanding: Money::from_cents(20000),
            requested: Money::from_cents(25000),
        };
        assert_eq!(
            err.to_string(),
            "Settlement of 250.00 for customer 1000 exceeds outstanding due 200.00"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(ValidationError::required("category").to_string(), "category is required");

        let err = ValidationError::ExceedsTotal {
            field: "left_qty".to_string(),
            value: 12,
            limit_field: "total_qty".to_string(),
            limit: 10,
        };
        assert_eq!(err.to_string(), "left_qty (12) cannot exceed total_qty (10)");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("name").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
