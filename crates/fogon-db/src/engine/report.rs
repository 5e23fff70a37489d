//! Read-only figures built from lots and transactions.

use sqlx::SqliteConnection;

use crate::error::DbResult;
use crate::repository::{CashLedger, LotStore, StockAggregator};
use fogon_core::ledger::summarize;
use fogon_core::{CostAccumulator, InventoryValuation, RegisterSummary, StockAudit};

/// Income, expense and per-category totals of one register.
pub async fn register_summary(
    conn: &mut SqliteConnection,
    register_id: &str,
) -> DbResult<RegisterSummary> {
    let mut ledger = CashLedger::new(conn);
    let register = ledger.require(register_id).await?;
    let transactions = ledger.list_transactions(register_id).await?;

    Ok(summarize(register, &transactions))
}

/// Σ `current_quantity × unit_cost` over live lots, rounded once.
pub async fn inventory_valuation(conn: &mut SqliteConnection) -> DbResult<InventoryValuation> {
    let lots = LotStore::new(&mut *conn).all_live_lots().await?;

    let mut value = CostAccumulator::new();
    for lot in &lots {
        value.add(lot.unit_cost, lot.current_quantity);
    }

    let products_in_stock: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE current_stock > 0")
            .fetch_one(&mut *conn)
            .await?;

    Ok(InventoryValuation {
        total_value: value.total(),
        products_in_stock,
        live_lots: lots.len() as i64,
    })
}

/// Compares a product's cached stock with its lot sum.
pub async fn verify_stock(conn: &mut SqliteConnection, product_id: &str) -> DbResult<StockAudit> {
    let mut stock = StockAggregator::new(conn);
    let cached = stock.cached_stock(product_id).await?;
    let computed = stock.lot_sum(product_id).await?;

    Ok(StockAudit {
        product_id: product_id.to_string(),
        cached,
        computed,
    })
}
