//! # Calculation Repository
//!
//! Append-only log of calculator evaluations, each stamped with the handler
//! that was active and the incentive it earned on that result.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use digical_core::{Calculation, HandlerPerformance, Money, NewCalculation, ValidationError};

/// Repository for the calculation log.
#[derive(Debug, Clone)]
pub struct CalculationRepository {
    pool: SqlitePool,
}

impl CalculationRepository {
    /// Creates a new CalculationRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CalculationRepository { pool }
    }

    /// Appends one evaluation to the log.
    pub async fn record(&self, calculation: &NewCalculation) -> DbResult<Calculation> {
        let expression = calculation.expression.trim();
        if expression.is_empty() {
            return Err(ValidationError::required("expression").into());
        }
        let now = Utc::now();

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO calculations (expression, result, handler_id, handler_incentive, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING id
            "#,
        )
        .bind(expression)
        .bind(&calculation.result)
        .bind(calculation.handler_id)
        .bind(calculation.handler_incentive)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::ForeignKeyViolation { .. } => {
                DbError::not_found("Handler", calculation.handler_id.unwrap_or_default())
            }
            other => other,
        })?;

        debug!(
            calculation_id = id,
            handler_id = ?calculation.handler_id,
            incentive = %calculation.handler_incentive,
            "Calculation logged"
        );

        self.get(id).await?.ok_or_else(|| DbError::not_found("Calculation", id))
    }

    /// Gets one logged calculation.
    pub async fn get(&self, id: i64) -> DbResult<Option<Calculation>> {
        let calculation = sqlx::query_as::<_, Calculation>(
            r#"
            SELECT c.id, c.expression, c.result, c.handler_id, h.name AS handler_name,
                   c.handler_incentive, c.timestamp
            FROM calculations c
            LEFT JOIN handlers h ON h.id = c.handler_id
            WHERE c.id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(calculation)
    }

    /// The most recent `limit` calculations, newest first.
    pub async fn list(&self, limit: u32) -> DbResult<Vec<Calculation>> {
        let calculations = sqlx::query_as::<_, Calculation>(
            r#"
            SELECT c.id, c.expression, c.result, c.handler_id, h.name AS handler_name,
                   c.handler_incentive, c.timestamp
            FROM calculations c
            LEFT JOIN handlers h ON h.id = c.handler_id
            ORDER BY c.timestamp DESC, c.id DESC
            LIMIT ?1
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(calculations)
    }

    /// Deletes the whole log. Returns the number of rows removed.
    pub async fn clear(&self) -> DbResult<u64> {
        let removed = sqlx::query("DELETE FROM calculations")
            .execute(&self.pool)
            .await?
            .rows_affected();

        info!(removed, "Calculation history cleared");
        Ok(removed)
    }

    /// Everything one handler has earned across the log.
    pub async fn total_incentive(&self, handler_id: i64) -> DbResult<Money> {
        let total: Money = sqlx::query_scalar(
            "SELECT COALESCE(SUM(handler_incentive), 0) FROM calculations WHERE handler_id = ?1",
        )
        .bind(handler_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }

    /// Every handler with its accumulated incentive, highest earner first.
    /// Handlers with no calculations are included with zero.
    pub async fn handler_performance(&self) -> DbResult<Vec<HandlerPerformance>> {
        let rows = sqlx::query_as::<_, HandlerPerformance>(
            r#"
            SELECT
                h.id AS handler_id,
                h.name,
                COALESCE(SUM(c.handler_incentive), 0) AS total_incentive,
                COUNT(c.id) AS calculations
            FROM handlers h
            LEFT JOIN calculations c ON c.handler_id = h.id
            GROUP BY h.id, h.name
            ORDER BY total_incentive DESC, h.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
