//! # Sale Repository
//!
//! Database operations for sales and sale items.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. CREATE HEADER                                                       │
//! │     └── create_sale(register) → Sale { total_amount: 0 }                │
//! │                                                                         │
//! │  2. ADD ITEMS (per line, after FIFO consumption of the dish)            │
//! │     └── insert_item() → SaleItem { subtotal, cost_of_goods }            │
//! │     └── add_to_total(subtotal)                                          │
//! │                                                                         │
//! │  3. POST INCOME                                                         │
//! │     └── CashLedger::record_sale_income() → one entry per sale           │
//! │                                                                         │
//! │  All three steps share the processor's transaction.                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use fogon_core::{Money, Sale, SaleItem};

/// Repository for sale database operations.
#[derive(Debug)]
pub struct SaleRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> SaleRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        SaleRepository { conn }
    }

    /// Creates an empty sale header against a register.
    pub async fn create_sale(&mut self, register_id: &str) -> DbResult<Sale> {
        let sale = Sale {
            id: Uuid::new_v4().to_string(),
            cash_register_id: register_id.to_string(),
            total_amount: Money::zero(),
            created_at: Utc::now(),
        };

        debug!(sale_id = %sale.id, register_id, "Creating sale");

        sqlx::query(
            r#"
            INSERT INTO sales (id, cash_register_id, total_amount, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.cash_register_id)
        .bind(sale.total_amount)
        .bind(sale.created_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(sale)
    }

    pub async fn insert_item(&mut self, item: &SaleItem) -> DbResult<()> {
        debug!(
            sale_id = %item.sale_id,
            dish_id = %item.dish_id,
            quantity = %item.quantity,
            subtotal = %item.subtotal,
            "Adding sale item"
        );

        sqlx::query(
            r#"
            INSERT INTO sale_items (
                id, sale_id, dish_id, quantity, unit_price, subtotal, cost_of_goods, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&item.id)
        .bind(&item.sale_id)
        .bind(&item.dish_id)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(item.subtotal)
        .bind(item.cost_of_goods)
        .bind(item.created_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    /// Adds `amount` to the sale total and returns the new total.
    pub async fn add_to_total(&mut self, sale_id: &str, amount: Money) -> DbResult<Money> {
        let total: Option<Money> = sqlx::query_scalar(
            "UPDATE sales SET total_amount = total_amount + ?1 WHERE id = ?2 RETURNING total_amount",
        )
        .bind(amount)
        .bind(sale_id)
        .fetch_optional(&mut *self.conn)
        .await?;

        total.ok_or_else(|| DbError::not_found("Sale", sale_id))
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&mut self, id: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(
            r#"
            SELECT id, cash_register_id, total_amount, created_at
            FROM sales
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(sale)
    }

    /// Gets all items for a sale.
    pub async fn get_items(&mut self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(
            r#"
            SELECT
                id, sale_id, dish_id, quantity, unit_price, subtotal, cost_of_goods, created_at
            FROM sale_items
            WHERE sale_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(sale_id)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(items)
    }

    /// Sales rung up on a register, oldest first.
    pub async fn list_for_register(&mut self, register_id: &str) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(
            r#"
            SELECT id, cash_register_id, total_amount, created_at
            FROM sales
            WHERE cash_register_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(register_id)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(sales)
    }
}
