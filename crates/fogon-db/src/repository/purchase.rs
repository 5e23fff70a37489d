//! # Purchase Repository
//!
//! Purchase headers and their lines. The header's `total_cost` is a
//! running sum, bumped once per line as the processor applies it.

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use fogon_core::{Money, Purchase, PurchaseItem};

#[derive(Debug)]
pub struct PurchaseRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> PurchaseRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        PurchaseRepository { conn }
    }

    /// Creates an empty purchase header against a register.
    pub async fn create_purchase(&mut self, register_id: &str, description: &str) -> DbResult<Purchase> {
        let purchase = Purchase {
            id: Uuid::new_v4().to_string(),
            cash_register_id: register_id.to_string(),
            description: description.trim().to_string(),
            total_cost: Money::zero(),
            created_at: Utc::now(),
        };

        debug!(purchase_id = %purchase.id, register_id, "Creating purchase");

        sqlx::query(
            r#"
            INSERT INTO purchases (id, cash_register_id, description, total_cost, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&purchase.id)
        .bind(&purchase.cash_register_id)
        .bind(&purchase.description)
        .bind(purchase.total_cost)
        .bind(purchase.created_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(purchase)
    }

    /// Inserts a fully costed purchase line.
    pub async fn insert_item(&mut self, item: &PurchaseItem) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO purchase_items (
                id, purchase_id, product_id, unit_id, quantity_bought, quantity_base,
                total_cost, unit_cost, lot_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&item.id)
        .bind(&item.purchase_id)
        .bind(&item.product_id)
        .bind(&item.unit_id)
        .bind(item.quantity_bought)
        .bind(item.quantity_base)
        .bind(item.total_cost)
        .bind(item.unit_cost)
        .bind(&item.lot_id)
        .bind(item.created_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    /// Adds `amount` to the header total and returns the new total.
    pub async fn add_to_total(&mut self, purchase_id: &str, amount: Money) -> DbResult<Money> {
        let total: Option<Money> = sqlx::query_scalar(
            "UPDATE purchases SET total_cost = total_cost + ?1 WHERE id = ?2 RETURNING total_cost",
        )
        .bind(amount)
        .bind(purchase_id)
        .fetch_optional(&mut *self.conn)
        .await?;

        total.ok_or_else(|| DbError::not_found("Purchase", purchase_id))
    }

    pub async fn get_by_id(&mut self, id: &str) -> DbResult<Option<Purchase>> {
        let purchase = sqlx::query_as::<_, Purchase>(
            r#"
            SELECT id, cash_register_id, description, total_cost, created_at
            FROM purchases
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(purchase)
    }

    /// Lines of a purchase in the order they were applied.
    pub async fn get_items(&mut self, purchase_id: &str) -> DbResult<Vec<PurchaseItem>> {
        let items = sqlx::query_as::<_, PurchaseItem>(
            r#"
            SELECT
                id, purchase_id, product_id, unit_id, quantity_bought, quantity_base,
                total_cost, unit_cost, lot_id, created_at
            FROM purchase_items
            WHERE purchase_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(purchase_id)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(items)
    }

    /// Purchases paid from a register, oldest first.
    pub async fn list_for_register(&mut self, register_id: &str) -> DbResult<Vec<Purchase>> {
        let purchases = sqlx::query_as::<_, Purchase>(
            r#"
            SELECT id, cash_register_id, description, total_cost, created_at
            FROM purchases
            WHERE cash_register_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(register_id)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(purchases)
    }
}
