//! # API Error Type
//!
//! Unified error type for CLI commands.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in DigiCal                                │
//! │                                                                         │
//! │  digical customer settle 1000 --amount 250                             │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Command Function                                                │  │
//! │  │  Result<Value, ApiError>                                         │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Database Error? ─── DbError::QueryFailed("...") ──┐            │  │
//! │  │         │                                          │            │  │
//! │  │         ▼                                          ▼            │  │
//! │  │  Rule Error? ─── CoreError::SettlementExceedsDue ── ApiError ──►│  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Success ──────────────────────────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  stdout: {"success": false,                                            │
//! │           "error": {"code": "SETTLEMENT_EXCEEDS_DUE", "message": ...}} │
//! │  exit status 1                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;

use crate::config::ConfigError;
use digical_core::{CoreError, ValidationError};
use digical_db::DbError;

/// Error printed by a failed command.
///
/// ## Serialization
/// ```json
/// {
///   "code": "NOT_FOUND",
///   "message": "Customer not found: 4242"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    /// Machine-readable error code for scripts
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,
}

/// Error codes for command responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Referenced record does not exist
    NotFound,

    /// Input validation failed
    ValidationError,

    /// Unique constraint hit (handler name, category, customer id)
    Duplicate,

    /// Settling more than the customer owes
    SettlementExceedsDue,

    /// Calculator expression could not be evaluated
    CalculationError,

    /// Environment or data directory problem
    ConfigError,

    /// Database operation failed
    DatabaseError,

    /// Internal error
    Internal,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

/// Storage faults are logged in full and reported generically.
fn storage_fault(detail: &dyn std::fmt::Display, public: &str) -> ApiError {
    tracing::error!(%detail, "{}", public);
    ApiError::new(ErrorCode::DatabaseError, public)
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => {
                ApiError::new(ErrorCode::Duplicate, format!("{} '{}' already exists", field, value))
            }
            DbError::Core(e) => e.into(),
            DbError::ForeignKeyViolation { message } => {
                tracing::warn!(%message, "Foreign key violation");
                ApiError::validation("Invalid reference")
            }
            DbError::ConstraintViolation { message } => {
                tracing::warn!(%message, "Constraint violation");
                ApiError::validation("Value rejected by the ledger")
            }
            DbError::ConnectionFailed(e) => storage_fault(&e, "Database connection failed"),
            DbError::MigrationFailed(e) => storage_fault(&e, "Database migration failed"),
            DbError::PoolExhausted => storage_fault(&"pool exhausted", "Database is busy"),
            DbError::QueryFailed(e) | DbError::Internal(e) => storage_fault(&e, "Database operation failed"),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::SettlementExceedsDue { .. } => ApiError::new(ErrorCode::SettlementExceedsDue, err.to_string()),
            CoreError::DivisionByZero | CoreError::MalformedExpression(_) => {
                ApiError::new(ErrorCode::CalculationError, err.to_string())
            }
            CoreError::Validation(e) => e.into(),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::Duplicate { .. } => ApiError::new(ErrorCode::Duplicate, err.to_string()),
            other => ApiError::validation(other.to_string()),
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::new(ErrorCode::ConfigError, err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::internal(format!("Could not serialize response: {}", err))
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;
    use digical_core::Money;

    #[test]
    fn test_db_errors_map_to_codes() {
        let not_found: ApiError = DbError::not_found("Customer", "4242").into();
        assert_eq!(not_found.code, ErrorCode::NotFound);
        assert_eq!(not_found.message, "Customer not found: 4242");

        let duplicate: ApiError = DbError::duplicate("name", "Asha").into();
        assert_eq!(duplicate.code, ErrorCode::Duplicate);

        let hidden: ApiError = DbError::QueryFailed("disk I/O error".to_string()).into();
        assert_eq!(hidden.code, ErrorCode::DatabaseError);
        assert_eq!(hidden.message, "Database operation failed");

        let rejected: ApiError = DbError::ConstraintViolation {
            message: "CHECK constraint failed: left_qty <= total_qty".to_string(),
        }
        .into();
        assert_eq!(rejected.code, ErrorCode::ValidationError);
    }

    #[test]
    fn test_core_errors_pass_through_db_error() {
        let err: ApiError = DbError::Core(CoreError::SettlementExceedsDue {
            customer_id: "1000".to_string(),
            outstanding: Money::from_major(200),
            requested: Money::from_major(250),
        })
        .into();
        assert_eq!(err.code, ErrorCode::SettlementExceedsDue);
        assert!(err.message.contains("200.00"));

        let err: ApiError = DbError::from(ValidationError::required("customer")).into();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.message, "customer is required");
    }

    #[test]
    fn test_serializes_screaming_code() {
        let json = serde_json::to_value(ApiError::from(CoreError::DivisionByZero)).unwrap();
        assert_eq!(json["code"], "CALCULATION_ERROR");
        assert_eq!(json["message"], "Division by zero");
    }
}
