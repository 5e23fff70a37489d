//! # Sale Processor
//!
//! Rings up dishes against the open register.
//!
//! ```text
//! lines ──► open register? ──► dishes + prices ──► stock per dish
//!                                                       │
//!            ┌──────────────────────────────────────────┘
//!            ▼
//!   sale header ──► per line: FIFO dish lots → stock → item → total
//!            │
//!            ▼
//!   one income entry, keyed sale:<id>:income
//! ```

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::debug;
use uuid::Uuid;

use crate::engine::fifo::FifoConsumer;
use crate::error::DbResult;
use crate::repository::{CashLedger, ProductRepository, SaleRepository, StockAggregator};
use fogon_core::ledger::ensure_stock;
use fogon_core::{
    validate_sale_lines, Money, Product, Quantity, SaleItem, SaleLine, SaleResult, ValidationError,
};

#[derive(Debug)]
pub struct SaleProcessor<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> SaleProcessor<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        SaleProcessor { conn }
    }

    pub async fn process(&mut self, lines: &[SaleLine]) -> DbResult<SaleResult> {
        validate_sale_lines(lines)?;

        let register = CashLedger::new(&mut *self.conn)
            .require_open_register()
            .await?;

        let mut priced: Vec<(&SaleLine, Product, Money)> = Vec::with_capacity(lines.len());
        for line in lines {
            let dish = ProductRepository::new(&mut *self.conn)
                .require(&line.dish_id)
                .await?;
            dish.ensure_dish()?;

            let price = line
                .unit_price
                .or(dish.sales_price)
                .ok_or_else(|| ValidationError::Required {
                    field: "unit_price".to_string(),
                })?;

            priced.push((line, dish, price));
        }

        // The same dish on several lines is checked against the sum
        let mut wanted: Vec<(&Product, Quantity)> = Vec::new();
        for (line, dish, _) in &priced {
            match wanted.iter_mut().find(|(d, _)| d.id == dish.id) {
                Some((_, total)) => *total += line.quantity,
                None => wanted.push((dish, line.quantity)),
            }
        }
        for (dish, needed) in wanted {
            let available = StockAggregator::new(&mut *self.conn)
                .lot_sum(&dish.id)
                .await?;
            ensure_stock(dish, available, needed)?;
        }

        let mut sale = SaleRepository::new(&mut *self.conn)
            .create_sale(&register.id)
            .await?;
        let mut items = Vec::with_capacity(priced.len());

        for (line, dish, unit_price) in &priced {
            let subtotal = unit_price.for_quantity(line.quantity);

            let plan = FifoConsumer::new(&mut *self.conn)
                .consume(&dish.id, line.quantity)
                .await?;
            StockAggregator::new(&mut *self.conn)
                .recalculate(&dish.id)
                .await?;

            let item = SaleItem {
                id: Uuid::new_v4().to_string(),
                sale_id: sale.id.clone(),
                dish_id: dish.id.clone(),
                quantity: line.quantity,
                unit_price: *unit_price,
                subtotal,
                cost_of_goods: plan.consumed_cost,
                created_at: Utc::now(),
            };

            let mut repo = SaleRepository::new(&mut *self.conn);
            repo.insert_item(&item).await?;
            sale.total_amount = repo.add_to_total(&sale.id, subtotal).await?;
            items.push(item);
        }

        let (income, _) = CashLedger::new(&mut *self.conn)
            .record_sale_income(&register.id, &sale.id, sale.total_amount)
            .await?;

        debug!(
            sale_id = %sale.id,
            register_id = %register.id,
            total = %sale.total_amount,
            lines = items.len(),
            "Sale rung up"
        );

        Ok(SaleResult { sale, items, income })
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::testing::{cook, kitchen, open_day, stock_up};
    use crate::error::DbError;
    use fogon_core::{
        CoreError, ErrorCode, Money, NewProduct, Quantity, SaleLine, TransactionCategory,
        TransactionKind, ValidationError,
    };

    #[tokio::test]
    async fn test_sale_consumes_dish_and_posts_one_income() {
        let k = kitchen().await;
        let register = open_day(&k.engine, 100).await;
        stock_up(&k, &register.id, &k.rice.id, 10, 20).await;
        cook(&k, 10, "5").await; // 10 portions @ 1.00

        let result = k
            .engine
            .record_sale(&[
                SaleLine::new(k.paella.id.clone(), Quantity::from_units(3), Money::from_units(14)),
                SaleLine {
                    dish_id: k.paella.id.clone(),
                    quantity: Quantity::from_units(2),
                    unit_price: None,
                },
            ])
            .await
            .unwrap();

        assert_eq!(result.sale.total_amount, Money::from_units(70));
        assert_eq!(result.items[0].subtotal, Money::from_units(42));
        assert_eq!(result.items[1].unit_price, Money::from_units(14));
        assert_eq!(result.cost_of_goods(), Money::from_units(5));

        assert_eq!(result.income.kind, TransactionKind::Income);
        assert_eq!(result.income.category, TransactionCategory::Sales);
        assert_eq!(result.income.amount, Money::from_units(70));

        let sales_entries: Vec<_> = k
            .engine
            .list_transactions(&register.id)
            .await
            .unwrap()
            .into_iter()
            .filter(|t| t.category == TransactionCategory::Sales)
            .collect();
        assert_eq!(sales_entries.len(), 1);

        // 100 - 20 purchase + 70 sale
        assert_eq!(
            k.engine.live_balance(&register.id).await.unwrap(),
            Money::from_units(150)
        );
        assert_eq!(
            k.engine.current_stock(&k.paella.id).await.unwrap(),
            Quantity::from_units(5)
        );
    }

    #[tokio::test]
    async fn test_oversell_rejected_without_side_effects() {
        let k = kitchen().await;
        let register = open_day(&k.engine, 100).await;
        stock_up(&k, &register.id, &k.rice.id, 10, 20).await;
        cook(&k, 3, "3").await;

        let err = k
            .engine
            .record_sale(&[
                SaleLine::new(k.paella.id.clone(), Quantity::from_units(2), Money::from_units(14)),
                SaleLine::new(k.paella.id.clone(), Quantity::from_units(2), Money::from_units(14)),
            ])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock { available, requested, .. })
                if available == Quantity::from_units(3) && requested == Quantity::from_units(4)
        ));
        assert_eq!(err.detail().code, ErrorCode::InsufficientStock);

        assert_eq!(
            k.engine.current_stock(&k.paella.id).await.unwrap(),
            Quantity::from_units(3)
        );
        assert_eq!(
            k.engine.live_balance(&register.id).await.unwrap(),
            Money::from_units(80)
        );
    }

    #[tokio::test]
    async fn test_sale_needs_open_register() {
        let k = kitchen().await;

        let err = k
            .engine
            .record_sale(&[SaleLine::new(
                k.paella.id.clone(),
                Quantity::from_units(1),
                Money::from_units(14),
            )])
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::NoOpenRegister)));
        assert_eq!(err.detail().code, ErrorCode::NoOpenRegister);
    }

    #[tokio::test]
    async fn test_sale_price_required_without_menu_price() {
        let k = kitchen().await;
        let register = open_day(&k.engine, 100).await;
        let special = k
            .engine
            .create_product(&NewProduct {
                name: "Chef's special".to_string(),
                is_dish: true,
                base_unit: fogon_core::BaseUnit::Unit,
                sales_price: None,
            })
            .await
            .unwrap();

        let err = k
            .engine
            .record_sale(&[SaleLine {
                dish_id: special.id.clone(),
                quantity: Quantity::from_units(1),
                unit_price: None,
            }])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::Validation(ValidationError::Required { ref field }))
                if field == "unit_price"
        ));
        assert!(k.engine.list_transactions(&register.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ingredients_cannot_be_sold() {
        let k = kitchen().await;
        open_day(&k.engine, 100).await;

        let err = k
            .engine
            .record_sale(&[SaleLine::new(
                k.rice.id.clone(),
                Quantity::from_units(1),
                Money::from_units(3),
            )])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::Validation(ValidationError::WrongProductKind { .. }))
        ));
    }
}
