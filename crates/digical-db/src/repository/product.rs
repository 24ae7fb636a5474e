//! # Product Repository
//!
//! Database operations for stocked products.
//!
//! ## Stock Levels
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Stock Consumption                                    │
//! │                                                                         │
//! │  create  total_qty = 10, left_qty = 10 (defaulted)                     │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  consume(3)        left_qty = 7                                        │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  consume(9)        left_qty = 0   ← clamped, logged at WARN            │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  update(...)       restocking is an explicit full update               │
//! │                                                                         │
//! │  Invariant: 0 <= left_qty <= total_qty (also a CHECK constraint)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use digical_core::validation::{validate_new_product, validate_product_update, validate_quantity};
use digical_core::{NewProduct, Product, ProductUpdate};

const PRODUCT_COLUMNS: &str = "id, name, category, total_qty, left_qty, price";

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
/// let pen = repo.create(&NewProduct { name: "Pen".into(), .. }).await?;
/// repo.consume(pen.id, 2).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Inserts a product; `left_qty` defaults to `total_qty`.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Inserted product with its new id
    /// * `Err(DbError::Core)` - Stock levels or price are invalid
    pub async fn create(&self, product: &NewProduct) -> DbResult<Product> {
        let product = validate_new_product(product)?;

        debug!(name = %product.name, total_qty = product.total_qty, "Inserting product");

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO products (name, category, total_qty, left_qty, price)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING id
            "#,
        )
        .bind(&product.name)
        .bind(&product.category)
        .bind(product.total_qty)
        .bind(product.left_qty)
        .bind(product.price)
        .fetch_one(&self.pool)
        .await?;

        info!(product_id = id, name = %product.name, "Product created");

        Ok(Product {
            id,
            name: product.name,
            category: product.category,
            total_qty: product.total_qty,
            left_qty: product.left_qty,
            price: product.price,
        })
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get(&self, id: i64) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        fetch_product(&mut conn, id).await
    }

    /// All products in insertion order.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id");
        let products = sqlx::query_as::<_, Product>(&sql).fetch_all(&self.pool).await?;
        Ok(products)
    }

    /// Replaces a product's editable fields.
    ///
    /// ## Returns
    /// * `Ok(Product)` - The stored product
    /// * `Err(DbError::Core)` - `left_qty > total_qty`, negative stock or price
    /// * `Err(DbError::NotFound)` - Product doesn't exist
    pub async fn update(&self, id: i64, product: &ProductUpdate) -> DbResult<Product> {
        let product = validate_product_update(product)?;

        debug!(product_id = id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                category = ?3,
                total_qty = ?4,
                left_qty = ?5,
                price = ?6
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&product.name)
        .bind(&product.category)
        .bind(product.total_qty)
        .bind(product.left_qty)
        .bind(product.price)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(Product {
            id,
            name: product.name,
            category: product.category,
            total_qty: product.total_qty,
            left_qty: product.left_qty,
            price: product.price,
        })
    }

    /// Deletes a product.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        info!(product_id = id, "Product deleted");
        Ok(())
    }

    /// Takes `qty` units out of stock, clamping `left_qty` at zero.
    pub async fn consume(&self, id: i64, qty: i64) -> DbResult<Product> {
        let mut conn = self.pool.acquire().await?;
        consume_stock(&mut conn, id, qty).await
    }
}

async fn fetch_product(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<Product>> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
    let product = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(product)
}

/// Decrements stock on an open connection or transaction.
///
/// ## Errors
/// - `Core(Validation)` when `qty <= 0`
/// - `NotFound` for an unknown product
pub(crate) async fn consume_stock(conn: &mut SqliteConnection, id: i64, qty: i64) -> DbResult<Product> {
    validate_quantity(qty)?;

    let mut product = fetch_product(conn, id)
        .await?
        .ok_or_else(|| DbError::not_found("Product", id))?;

    let left = product.left_qty.saturating_sub(qty);
    if left < 0 {
        warn!(
            product_id = id,
            left_qty = product.left_qty,
            requested = qty,
            "Consumed more than in stock, clamping at zero"
        );
    }
    let left = left.max(0);

    sqlx::query("UPDATE products SET left_qty = ?2 WHERE id = ?1")
        .bind(id)
        .bind(left)
        .execute(&mut *conn)
        .await?;

    debug!(product_id = id, qty, left_qty = left, "Stock consumed");

    product.left_qty = left;
    Ok(product)
}

// =============================================================================
// Unit Tests
// =============================================================================
