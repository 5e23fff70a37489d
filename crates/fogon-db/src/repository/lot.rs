//! # Lot Store
//!
//! Lots are cost layers: a quantity of one product entered at one unit
//! cost. Purchases create them, FIFO consumption drains them.
//!
//! ## Entry Order
//! ```text
//! entry_seq = MAX(entry_seq) + 1     assigned inside the writing transaction
//!
//!   seq 1  rice   5.0000 @ 2.00   (purchase A)
//!   seq 2  oil    1.0000 @ 9.00   (purchase A)
//!   seq 3  rice   3.0000 @ 4.00   (purchase B)
//!
//! list_live_lots(rice) → [seq 1, seq 3]
//! ```
//! Wall-clock time never decides FIFO order; two lots entered in the same
//! millisecond still have distinct sequence numbers.

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use fogon_core::{CoreError, Lot, Money, Quantity};

const LOT_COLUMNS: &str = r#"
    id, product_id, entry_seq, initial_quantity, current_quantity,
    unit_cost, origin_purchase_id, entered_at
"#;

/// Lot persistence.
#[derive(Debug)]
pub struct LotStore<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> LotStore<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        LotStore { conn }
    }

    /// Creates a lot holding `quantity` of `product_id` at `unit_cost`.
    ///
    /// `origin_purchase_id` is `None` for kitchen-made lots.
    pub async fn create_lot(
        &mut self,
        product_id: &str,
        quantity: Quantity,
        unit_cost: Money,
        origin_purchase_id: Option<&str>,
    ) -> DbResult<Lot> {
        if quantity.is_negative() || unit_cost.is_negative() {
            return Err(CoreError::InvariantViolation(format!(
                "lot for {} with quantity {} at {}",
                product_id, quantity, unit_cost
            ))
            .into());
        }

        let entry_seq: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(entry_seq), 0) + 1 FROM lots")
            .fetch_one(&mut *self.conn)
            .await?;

        let lot = Lot {
            id: Uuid::new_v4().to_string(),
            product_id: product_id.to_string(),
            entry_seq,
            initial_quantity: quantity,
            current_quantity: quantity,
            unit_cost,
            origin_purchase_id: origin_purchase_id.map(str::to_string),
            entered_at: Utc::now(),
        };

        debug!(
            lot_id = %lot.id,
            product_id,
            entry_seq,
            quantity = %quantity,
            unit_cost = %unit_cost,
            "Creating lot"
        );

        sqlx::query(
            r#"
            INSERT INTO lots (
                id, product_id, entry_seq, initial_quantity, current_quantity,
                unit_cost, origin_purchase_id, entered_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&lot.id)
        .bind(&lot.product_id)
        .bind(lot.entry_seq)
        .bind(lot.initial_quantity)
        .bind(lot.current_quantity)
        .bind(lot.unit_cost)
        .bind(&lot.origin_purchase_id)
        .bind(lot.entered_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(lot)
    }

    pub async fn get_by_id(&mut self, id: &str) -> DbResult<Option<Lot>> {
        let sql = format!("SELECT {} FROM lots WHERE id = ?1", LOT_COLUMNS);
        let lot = sqlx::query_as::<_, Lot>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?;

        Ok(lot)
    }

    /// Lots of `product_id` with stock left, oldest first.
    pub async fn list_live_lots(&mut self, product_id: &str) -> DbResult<Vec<Lot>> {
        let sql = format!(
            "SELECT {} FROM lots WHERE product_id = ?1 AND current_quantity > 0 ORDER BY entry_seq ASC",
            LOT_COLUMNS
        );
        let lots = sqlx::query_as::<_, Lot>(&sql)
            .bind(product_id)
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(lots)
    }

    /// Live lots of every product, oldest first.
    pub async fn all_live_lots(&mut self) -> DbResult<Vec<Lot>> {
        let sql = format!(
            "SELECT {} FROM lots WHERE current_quantity > 0 ORDER BY entry_seq ASC",
            LOT_COLUMNS
        );
        let lots = sqlx::query_as::<_, Lot>(&sql)
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(lots)
    }

    /// Every lot of `product_id`, exhausted ones included, oldest first.
    pub async fn list_lots(&mut self, product_id: &str) -> DbResult<Vec<Lot>> {
        let sql = format!(
            "SELECT {} FROM lots WHERE product_id = ?1 ORDER BY entry_seq ASC",
            LOT_COLUMNS
        );
        let lots = sqlx::query_as::<_, Lot>(&sql)
            .bind(product_id)
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(lots)
    }

    /// Takes `amount` out of a lot and returns the lot as updated.
    ///
    /// `amount` must be positive and at most the lot's remaining quantity;
    /// anything else is an invariant violation, never clamped.
    pub async fn apply_depletion(&mut self, lot_id: &str, amount: Quantity) -> DbResult<Lot> {
        let lot = self
            .get_by_id(lot_id)
            .await?
            .ok_or_else(|| DbError::not_found("Lot", lot_id))?;

        if !amount.is_positive() || amount > lot.current_quantity {
            return Err(CoreError::InvariantViolation(format!(
                "cannot take {} from lot {} holding {}",
                amount, lot.id, lot.current_quantity
            ))
            .into());
        }

        let current_quantity: Quantity = sqlx::query_scalar(
            r#"
            UPDATE lots
            SET current_quantity = current_quantity - ?1
            WHERE id = ?2
            RETURNING current_quantity
            "#,
        )
        .bind(amount)
        .bind(lot_id)
        .fetch_one(&mut *self.conn)
        .await?;

        debug!(lot_id, taken = %amount, left = %current_quantity, "Lot depleted");

        Ok(Lot {
            current_quantity,
            ..lot
        })
    }

    // =========================================================================
    // Kitchen Lots
    // =========================================================================

    /// The newest lot of `product_id` that did not come from a purchase.
    pub async fn find_kitchen_lot(&mut self, product_id: &str) -> DbResult<Option<Lot>> {
        let sql = format!(
            r#"
            SELECT {} FROM lots
            WHERE product_id = ?1 AND origin_purchase_id IS NULL
            ORDER BY entry_seq DESC
            LIMIT 1
            "#,
            LOT_COLUMNS
        );
        let lot = sqlx::query_as::<_, Lot>(&sql)
            .bind(product_id)
            .fetch_optional(&mut *self.conn)
            .await?;

        Ok(lot)
    }

    /// Overwrites a kitchen lot with a fresh quantity and cost.
    ///
    /// Initial and current quantity are both reset; whatever the lot held
    /// before is gone. The lot keeps its entry sequence.
    pub async fn reset_kitchen_lot(
        &mut self,
        lot_id: &str,
        quantity: Quantity,
        unit_cost: Money,
    ) -> DbResult<Lot> {
        if quantity.is_negative() || unit_cost.is_negative() {
            return Err(CoreError::InvariantViolation(format!(
                "kitchen lot {} reset to {} at {}",
                lot_id, quantity, unit_cost
            ))
            .into());
        }

        let sql = format!(
            r#"
            UPDATE lots
            SET initial_quantity = ?1, current_quantity = ?1, unit_cost = ?2
            WHERE id = ?3 AND origin_purchase_id IS NULL
            RETURNING {}
            "#,
            LOT_COLUMNS
        );
        let lot = sqlx::query_as::<_, Lot>(&sql)
            .bind(quantity)
            .bind(unit_cost)
            .bind(lot_id)
            .fetch_optional(&mut *self.conn)
            .await?
            .ok_or_else(|| DbError::not_found("Kitchen lot", lot_id))?;

        debug!(lot_id, quantity = %quantity, unit_cost = %unit_cost, "Kitchen lot reset");

        Ok(lot)
    }
}
