//! # Stock Aggregator
//!
//! `products.current_stock` is a cache of the lot sum. Nothing updates it
//! implicitly: every path that creates or drains a lot calls
//! [`StockAggregator::recalculate`] for that product before it commits.

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use fogon_core::{CoreError, Quantity};

#[derive(Debug)]
pub struct StockAggregator<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> StockAggregator<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        StockAggregator { conn }
    }

    /// Sum of `current_quantity` over every lot of the product.
    pub async fn lot_sum(&mut self, product_id: &str) -> DbResult<Quantity> {
        let sum: Quantity = sqlx::query_scalar(
            "SELECT COALESCE(SUM(current_quantity), 0) FROM lots WHERE product_id = ?1",
        )
        .bind(product_id)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(sum)
    }

    /// The stock figure currently stored on the product row.
    pub async fn cached_stock(&mut self, product_id: &str) -> DbResult<Quantity> {
        let stock: Option<Quantity> =
            sqlx::query_scalar("SELECT current_stock FROM products WHERE id = ?1")
                .bind(product_id)
                .fetch_optional(&mut *self.conn)
                .await?;

        stock.ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()).into())
    }

    /// Recomputes the lot sum and stores it as the product's stock.
    pub async fn recalculate(&mut self, product_id: &str) -> DbResult<Quantity> {
        let stock = self.lot_sum(product_id).await?;

        let result = sqlx::query(
            "UPDATE products SET current_stock = ?1, updated_at = ?2 WHERE id = ?3",
        )
        .bind(stock)
        .bind(Utc::now())
        .bind(product_id)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::ProductNotFound(product_id.to_string()).into());
        }

        debug!(product_id, stock = %stock, "Stock recalculated");
        Ok(stock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::repository::test_support::{conn, ingredient, memory_db};
    use crate::repository::LotStore;
    use fogon_core::Money;

    #[tokio::test]
    async fn test_recalculate_matches_lot_sum() {
        let db = memory_db().await;
        let mut conn = conn(&db).await;
        let rice = ingredient(&mut conn, "Rice").await;

        let lot = LotStore::new(&mut conn)
            .create_lot(&rice.id, Quantity::from_units(5), Money::from_units(2), None)
            .await
            .unwrap();
        LotStore::new(&mut conn)
            .create_lot(&rice.id, "2.5".parse().unwrap(), Money::from_units(4), None)
            .await
            .unwrap();

        let mut stock = StockAggregator::new(&mut conn);
        assert!(stock.cached_stock(&rice.id).await.unwrap().is_zero());
        assert_eq!(
            stock.recalculate(&rice.id).await.unwrap(),
            "7.5".parse().unwrap()
        );

        LotStore::new(&mut conn)
            .apply_depletion(&lot.id, Quantity::from_units(5))
            .await
            .unwrap();

        let mut stock = StockAggregator::new(&mut conn);
        assert_eq!(stock.cached_stock(&rice.id).await.unwrap(), "7.5".parse().unwrap());
        stock.recalculate(&rice.id).await.unwrap();
        assert_eq!(
            stock.cached_stock(&rice.id).await.unwrap(),
            stock.lot_sum(&rice.id).await.unwrap()
        );
        assert_eq!(stock.cached_stock(&rice.id).await.unwrap(), "2.5".parse().unwrap());
    }

    #[tokio::test]
    async fn test_recalculate_unknown_product() {
        let db = memory_db().await;
        let mut conn = conn(&db).await;

        let result = StockAggregator::new(&mut conn).recalculate("ghost").await;
        assert!(matches!(
            result,
            Err(DbError::Domain(CoreError::ProductNotFound(_)))
        ));
    }
}
