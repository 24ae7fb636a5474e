//! # Database Error Types
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  sqlx::Error                          CoreError                        │
//! │   ├─ UNIQUE   → UniqueViolation        ├─ Validation                   │
//! │   ├─ FOREIGN  → ForeignKeyViolation    └─ SettlementExceedsDue         │
//! │   ├─ CHECK    → ConstraintViolation          │                          │
//! │   ├─ timeout  → PoolExhausted                │                          │
//! │   └─ other    → QueryFailed / Internal       │                          │
//! │         │                                    │                          │
//! │         └──────────────► DbError ◄───────────┘                          │
//! │                             │                                           │
//! │                             ▼                                           │
//! │                 ApiError (CLI JSON envelope)                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use digical_core::{CoreError, ValidationError};
use sqlx::error::ErrorKind;
use thiserror::Error;

/// Ledger store errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// The referenced row doesn't exist.
    ///
    /// Raised by updates, deletes, activation, settlements and stock
    /// consumption. Plain lookups return `Ok(None)` instead.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A UNIQUE constraint rejected the write.
    ///
    /// ## When This Occurs
    /// - Creating or renaming a handler to an existing name
    /// - Adding an existing category
    /// - Customer id collision that outlived the retries
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// A row points at a handler or customer that doesn't exist.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// A CHECK constraint rejected the row (e.g. `left_qty > total_qty`).
    #[error("Constraint violation: {message}")]
    ConstraintViolation { message: String },

    /// The database file couldn't be opened or created.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// No pooled connection became free within the acquire timeout.
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// A business rule rejected the operation before anything was written.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Stored data that can't be decoded, or an unexpected driver error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Names the offending value of a UniqueViolation, which SQLite does
    /// not report. Other errors pass through untouched.
    pub fn with_duplicate_value(self, field: &str, value: &str) -> Self {
        match self {
            DbError::UniqueViolation { .. } => DbError::duplicate(field, value),
            other => other,
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self, DbError::UniqueViolation { .. })
    }
}

impl From<ValidationError> for DbError {
    fn from(err: ValidationError) -> Self {
        DbError::Core(CoreError::Validation(err))
    }
}

/// SQLite reports `UNIQUE constraint failed: handlers.name`; keep the
/// `table.column` part as the field until a caller names the value.
fn unique_field(message: &str) -> String {
    message
        .rsplit_once(": ")
        .map(|(_, field)| field.to_string())
        .unwrap_or_else(|| "value".to_string())
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                match db_err.kind() {
                    ErrorKind::UniqueViolation => DbError::UniqueViolation {
                        field: unique_field(&message),
                        value: "unknown".to_string(),
                    },
                    ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation { message },
                    ErrorKind::CheckViolation | ErrorKind::NotNullViolation => {
                        DbError::ConstraintViolation { message }
                    }
                    _ => DbError::QueryFailed(message),
                }
            }
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool is closed".to_string()),
            decode @ (sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_)) => DbError::Internal(decode.to_string()),
            other => DbError::QueryFailed(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[test]
    fn test_duplicate_value_is_filled_in() {
        let err = DbError::duplicate("handlers.name", "unknown").with_duplicate_value("name", "Asha");
        assert_eq!(err.to_string(), "Duplicate name: 'Asha' already exists");

        let untouched = DbError::PoolExhausted.with_duplicate_value("name", "Asha");
        assert!(matches!(untouched, DbError::PoolExhausted));
    }

    #[test]
    fn test_validation_becomes_core_error() {
        let err: DbError = ValidationError::required("category").into();
        assert!(matches!(err, DbError::Core(CoreError::Validation(_))));
        assert_eq!(err.to_string(), "Validation error: category is required");
    }

    #[test]
    fn test_unique_field() {
        assert_eq!(unique_field("UNIQUE constraint failed: handlers.name"), "handlers.name");
        assert_eq!(unique_field("UNIQUE"), "value");
    }

    #[tokio::test]
    async fn test_sqlite_constraints_are_classified() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let dup: DbError = sqlx::query("INSERT INTO categories (name, kind) VALUES ('Rent', 'expense')")
            .execute(db.pool())
            .await
            .unwrap_err()
            .into();
        assert!(dup.is_unique_violation());

        let check: DbError = sqlx::query(
            "INSERT INTO products (name, category, total_qty, left_qty, price) VALUES ('Pen', 'x', 1, 5, 100)",
        )
        .execute(db.pool())
        .await
        .unwrap_err()
        .into();
        assert!(matches!(check, DbError::ConstraintViolation { .. }), "{check:?}");
    }
}
