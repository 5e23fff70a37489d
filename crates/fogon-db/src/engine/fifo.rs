//! # FIFO Consumer
//!
//! Applies a [`plan_fifo`] walk to stored lots.
//!
//! ```text
//! consume(product, qty)
//!   │
//!   ├── LotStore::list_live_lots(product)   oldest first
//!   ├── plan_fifo(lots, qty)                pure, in fogon-core
//!   ├── plan incomplete? → InvariantViolation, nothing written
//!   └── LotStore::apply_depletion(..)       once per touched lot
//! ```
//!
//! Callers check stock before consuming. Running short here means that
//! check was skipped, so the whole operation fails instead of
//! under-filling.

use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use crate::repository::LotStore;
use fogon_core::costing::{plan_fifo, FifoPlan};
use fogon_core::{CoreError, Quantity};

#[derive(Debug)]
pub struct FifoConsumer<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> FifoConsumer<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        FifoConsumer { conn }
    }

    /// Takes `quantity` of `product_id` from its lots, oldest first.
    ///
    /// Does not touch the cached stock; the caller recalculates it.
    pub async fn consume(&mut self, product_id: &str, quantity: Quantity) -> DbResult<FifoPlan> {
        let lots = LotStore::new(&mut *self.conn)
            .list_live_lots(product_id)
            .await?;
        let plan = plan_fifo(&lots, quantity);

        if !plan.is_complete() {
            return Err(CoreError::InvariantViolation(format!(
                "lots of {} hold {} but {} was consumed",
                product_id, plan.consumed, quantity
            ))
            .into());
        }

        let mut store = LotStore::new(&mut *self.conn);
        for depletion in &plan.depletions {
            store
                .apply_depletion(&depletion.lot_id, depletion.amount)
                .await?;
        }

        debug!(
            product_id,
            consumed = %plan.consumed,
            cost = %plan.consumed_cost,
            lots = plan.depletions.len(),
            "FIFO consumption applied"
        );

        Ok(plan)
    }
}
