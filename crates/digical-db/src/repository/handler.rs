//! # Handler Repository
//!
//! Handlers and the single active-handler flag.
//!
//! ## Activation
//! ```text
//! set_active(h2)
//!   BEGIN
//!   UPDATE handlers SET is_active = 0 WHERE is_active = 1   -- h1 → 0
//!   UPDATE handlers SET is_active = 1 WHERE id = h2         -- h2 → 1
//!   COMMIT                     (rolled back if h2 doesn't exist)
//! ```
//! Readers never see zero or two active handlers mid-switch, and the
//! partial unique index on `is_active` backs the rule at the schema level.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use digical_core::validation::validate_new_handler;
use digical_core::{Handler, Incentive, IncentiveType, NewHandler};

/// Column list matching [`HandlerRow`].
const HANDLER_COLUMNS: &str = "id, name, incentive_type, incentive_value, is_active, created_at";

/// Raw `handlers` row; the incentive is split over two columns.
#[derive(Debug, sqlx::FromRow)]
struct HandlerRow {
    id: i64,
    name: String,
    incentive_type: String,
    incentive_value: i64,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<HandlerRow> for Handler {
    type Error = DbError;

    fn try_from(row: HandlerRow) -> DbResult<Self> {
        let incentive = row
            .incentive_type
            .parse::<IncentiveType>()
            .and_then(|kind| Incentive::from_parts(kind, row.incentive_value))
            .map_err(|e| DbError::Internal(format!("handler {} has a corrupt incentive: {}", row.id, e)))?;

        Ok(Handler {
            id: row.id,
            name: row.name,
            incentive,
            is_active: row.is_active,
            created_at: row.created_at,
        })
    }
}

/// Repository for handler database operations.
#[derive(Debug, Clone)]
pub struct HandlerRepository {
    pool: SqlitePool,
}

impl HandlerRepository {
    /// Creates a new HandlerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        HandlerRepository { pool }
    }

    /// Creates a handler, optionally making it the active one.
    ///
    /// ## Errors
    /// - `UniqueViolation` when the name is taken
    /// - `Core(Validation)` for an empty name or negative fixed incentive
    pub async fn create(&self, handler: &NewHandler, activate: bool) -> DbResult<Handler> {
        let handler = validate_new_handler(handler)?;
        let now = Utc::now();

        debug!(name = %handler.name, activate, "Creating handler");

        let mut tx = self.pool.begin().await?;

        if activate {
            deactivate_all(&mut tx).await?;
        }

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO handlers (name, incentive_type, incentive_value, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING id
            "#,
        )
        .bind(&handler.name)
        .bind(handler.incentive.kind().as_str())
        .bind(handler.incentive.hundredths())
        .bind(activate)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| DbError::from(e).with_duplicate_value("name", &handler.name))?;

        tx.commit().await?;

        info!(handler_id = id, name = %handler.name, "Handler created");

        Ok(Handler {
            id,
            name: handler.name,
            incentive: handler.incentive,
            is_active: activate,
            created_at: now,
        })
    }

    /// Gets a handler by ID.
    pub async fn get(&self, id: i64) -> DbResult<Option<Handler>> {
        let sql = format!("SELECT {HANDLER_COLUMNS} FROM handlers WHERE id = ?1");
        let row: Option<HandlerRow> = sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?;

        row.map(Handler::try_from).transpose()
    }

    /// Lists all handlers ordered by name.
    pub async fn list(&self) -> DbResult<Vec<Handler>> {
        let sql = format!("SELECT {HANDLER_COLUMNS} FROM handlers ORDER BY name, id");
        let rows: Vec<HandlerRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;

        rows.into_iter().map(Handler::try_from).collect()
    }

    /// The currently active handler, if any.
    ///
    /// Callers pass this into `calculate_incentive`; nothing is cached here.
    pub async fn active(&self) -> DbResult<Option<Handler>> {
        let sql = format!("SELECT {HANDLER_COLUMNS} FROM handlers WHERE is_active = 1 LIMIT 1");
        let row: Option<HandlerRow> = sqlx::query_as(&sql).fetch_optional(&self.pool).await?;

        row.map(Handler::try_from).transpose()
    }

    /// Makes `id` the only active handler.
    ///
    /// ## Errors
    /// `NotFound` when no handler has this id; nothing changes in that case.
    pub async fn set_active(&self, id: i64) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        deactivate_all(&mut tx).await?;

        let updated = sqlx::query("UPDATE handlers SET is_active = 1 WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if updated == 0 {
            // dropping `tx` rolls back the deactivation
            return Err(DbError::not_found("Handler", id));
        }

        tx.commit().await?;

        info!(handler_id = id, "Active handler set");
        Ok(())
    }

    /// Clears the active flag on every handler.
    pub async fn clear_active(&self) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        deactivate_all(&mut conn).await?;
        debug!("Active handler cleared");
        Ok(())
    }

    /// Renames a handler or changes its incentive. The active flag is kept.
    pub async fn update(&self, id: i64, handler: &NewHandler) -> DbResult<Handler> {
        let handler = validate_new_handler(handler)?;

        debug!(handler_id = id, name = %handler.name, "Updating handler");

        let updated = sqlx::query(
            r#"
            UPDATE handlers
            SET name = ?2, incentive_type = ?3, incentive_value = ?4
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&handler.name)
        .bind(handler.incentive.kind().as_str())
        .bind(handler.incentive.hundredths())
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from(e).with_duplicate_value("name", &handler.name))?
        .rows_affected();

        if updated == 0 {
            return Err(DbError::not_found("Handler", id));
        }

        self.get(id).await?.ok_or_else(|| DbError::not_found("Handler", id))
    }

    /// Deletes a handler. Historical transactions and calculations keep
    /// their rows with a NULL handler.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        let deleted = sqlx::query("DELETE FROM handlers WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if deleted == 0 {
            return Err(DbError::not_found("Handler", id));
        }

        info!(handler_id = id, "Handler deleted");
        Ok(())
    }
}

async fn deactivate_all(conn: &mut SqliteConnection) -> DbResult<()> {
    sqlx::query("UPDATE handlers SET is_active = 0 WHERE is_active = 1")
        .execute(&mut *conn)
        .await?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
