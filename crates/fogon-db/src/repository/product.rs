//! # Product Repository
//!
//! Database operations for products and their recipes.
//!
//! ## What This Repository Will Not Do
//! `current_stock` is never written here. Inserts start it at zero and
//! only [`StockAggregator`](super::StockAggregator) changes it afterwards.

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use fogon_core::{CoreError, NewProduct, Product, Quantity, RecipeLine};

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let mut conn = db.pool().acquire().await?;
/// let rice = ProductRepository::new(&mut conn).require(&rice_id).await?;
/// ```
#[derive(Debug)]
pub struct ProductRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> ProductRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        ProductRepository { conn }
    }

    /// Inserts a new product with zero stock.
    pub async fn insert(&mut self, new: &NewProduct) -> DbResult<Product> {
        new.validate()?;

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: new.name.trim().to_string(),
            is_dish: new.is_dish,
            base_unit: new.base_unit,
            current_stock: Quantity::zero(),
            sales_price: new.sales_price,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %product.id, name = %product.name, is_dish = product.is_dish, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, is_dish, base_unit, current_stock, sales_price,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(product.is_dish)
        .bind(product.base_unit)
        .bind(product.current_stock)
        .bind(product.sales_price)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(product)
    }

    /// Gets a product by ID.
    pub async fn get_by_id(&mut self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT
                id, name, is_dish, base_unit, current_stock, sales_price,
                created_at, updated_at
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(product)
    }

    /// Like [`get_by_id`](Self::get_by_id), failing with `ProductNotFound`.
    pub async fn require(&mut self, id: &str) -> DbResult<Product> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::from(CoreError::ProductNotFound(id.to_string())))
    }

    /// Lists products, dishes or ingredients, by name.
    pub async fn list(&mut self, dishes: Option<bool>) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT
                id, name, is_dish, base_unit, current_stock, sales_price,
                created_at, updated_at
            FROM products
            WHERE ?1 IS NULL OR is_dish = ?1
            ORDER BY name
            "#,
        )
        .bind(dishes)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(products)
    }

    pub async fn count(&mut self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&mut *self.conn)
            .await?;

        Ok(count)
    }

    // =========================================================================
    // Recipes
    // =========================================================================

    /// Sets how much of `ingredient_id` one portion of `dish_id` needs.
    ///
    /// Replaces the quantity if the pair already has a line.
    pub async fn set_recipe_line(
        &mut self,
        dish_id: &str,
        ingredient_id: &str,
        quantity_required: Quantity,
    ) -> DbResult<RecipeLine> {
        debug!(dish_id, ingredient_id, quantity = %quantity_required, "Setting recipe line");

        sqlx::query(
            r#"
            INSERT INTO recipe_lines (id, dish_id, ingredient_id, quantity_required)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (dish_id, ingredient_id)
            DO UPDATE SET quantity_required = excluded.quantity_required
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(dish_id)
        .bind(ingredient_id)
        .bind(quantity_required)
        .execute(&mut *self.conn)
        .await?;

        let line = sqlx::query_as::<_, RecipeLine>(
            r#"
            SELECT id, dish_id, ingredient_id, quantity_required
            FROM recipe_lines
            WHERE dish_id = ?1 AND ingredient_id = ?2
            "#,
        )
        .bind(dish_id)
        .bind(ingredient_id)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(line)
    }

    /// Recipe lines for a dish, in the order they were first added.
    pub async fn recipe_for(&mut self, dish_id: &str) -> DbResult<Vec<RecipeLine>> {
        let lines = sqlx::query_as::<_, RecipeLine>(
            r#"
            SELECT id, dish_id, ingredient_id, quantity_required
            FROM recipe_lines
            WHERE dish_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(dish_id)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(lines)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
