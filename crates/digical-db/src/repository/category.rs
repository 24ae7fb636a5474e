//! # Category Repository
//!
//! Named buckets for sales and expenses. The defaults are seeded by the
//! second migration; users can add their own.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::{DbError, DbResult};
use digical_core::validation::validate_category;
use digical_core::{Category, TransactionType};

/// Repository for category database operations.
#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    /// Creates a new CategoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    /// Categories ordered by name, optionally of one type only.
    pub async fn list(&self, kind: Option<TransactionType>) -> DbResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, name, kind
            FROM categories
            WHERE (?1 IS NULL OR kind = ?1)
            ORDER BY name
            "#,
        )
        .bind(kind)
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    /// Adds a category.
    ///
    /// ## Errors
    /// `UniqueViolation` when a category with this name exists, whatever its type.
    pub async fn add(&self, name: &str, kind: TransactionType) -> DbResult<Category> {
        let name = validate_category(name)?;

        let id: i64 = sqlx::query_scalar("INSERT INTO categories (name, kind) VALUES (?1, ?2) RETURNING id")
            .bind(&name)
            .bind(kind)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DbError::from(e).with_duplicate_value("name", &name))?;

        info!(category_id = id, name = %name, %kind, "Category added");

        Ok(Category { id, name, kind })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use digical_core::{DEFAULT_EXPENSE_CATEGORIES, DEFAULT_SALES_CATEGORIES};

    use crate::repository::test_support::test_db;

    #[tokio::test]
    async fn test_defaults_are_seeded() {
        let db = test_db().await;
        let repo = db.categories();

        let sales = repo.list(Some(TransactionType::Sale)).await.unwrap();
        let expenses = repo.list(Some(TransactionType::Expense)).await.unwrap();

        assert_eq!(sales.len(), DEFAULT_SALES_CATEGORIES.len());
        assert_eq!(expenses.len(), DEFAULT_EXPENSE_CATEGORIES.len());
        assert_eq!(repo.list(None).await.unwrap().len(), 11);

        let names: Vec<&str> = sales.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Consulting", "Other Income", "Product Sales", "Service Sales"]);
    }

    #[tokio::test]
    async fn test_add_rejects_duplicates() {
        let db = test_db().await;
        let repo = db.categories();

        let added = repo.add(" Repairs ", TransactionType::Expense).await.unwrap();
        assert_eq!(added.name, "Repairs");

        match repo.add("Repairs", TransactionType::Sale).await.unwrap_err() {
            DbError::UniqueViolation { field, value } => {
                assert_eq!(field, "name");
                assert_eq!(value, "Repairs");
            }
            other => panic!("expected UniqueViolation, got {:?}", other),
        }
    }
}
