//! # Purchase Processor
//!
//! Turns a purchase into lots, stock and cash expenses.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. validate request shape                                              │
//! │  2. register exists and is open                                        │
//! │  3. every line: product is an ingredient, unit shares its base unit     │
//! │  4. Σ line costs ≤ live balance        (whole batch, before any write)  │
//! │  ──────────────────────────── writes ───────────────────────────────── │
//! │  5. purchase header                                                     │
//! │  6. per line:                                                           │
//! │       quantity_base = quantity_bought × conversion_factor               │
//! │       unit_cost     = total_cost / quantity_base   (0 if base is 0)     │
//! │       lot → recalculate stock → expense → item → header total           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use crate::repository::{
    CashLedger, LotStore, ProductRepository, PurchaseRepository, StockAggregator, UnitRepository,
};
use fogon_core::costing::unit_cost;
use fogon_core::ledger::{ensure_funds, ensure_open};
use fogon_core::validation::MAX_DESCRIPTION_LEN;
use fogon_core::{
    Product, PurchaseItem, PurchaseLine, PurchaseRequest, PurchaseResult, TransactionCategory,
    TransactionKind, UnitOfMeasure, ValidationError,
};

#[derive(Debug)]
pub struct PurchaseProcessor<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> PurchaseProcessor<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        PurchaseProcessor { conn }
    }

    pub async fn process(&mut self, request: &PurchaseRequest) -> DbResult<PurchaseResult> {
        request.validate()?;

        let register = CashLedger::new(&mut *self.conn)
            .require(&request.register_id)
            .await?;
        ensure_open(&register)?;

        let mut resolved: Vec<(&PurchaseLine, Product, UnitOfMeasure)> =
            Vec::with_capacity(request.lines.len());
        for line in &request.lines {
            let product = ProductRepository::new(&mut *self.conn)
                .require(&line.product_id)
                .await?;
            product.ensure_ingredient()?;

            let unit = UnitRepository::new(&mut *self.conn)
                .require(&line.unit_id)
                .await?;
            if unit.base_unit != product.base_unit {
                return Err(ValidationError::UnitMismatch {
                    unit: unit.name,
                    unit_base: unit.base_unit.to_string(),
                    product: product.name,
                    product_base: product.base_unit.to_string(),
                }
                .into());
            }

            resolved.push((line, product, unit));
        }

        let balance = CashLedger::new(&mut *self.conn)
            .live_balance(&register.id)
            .await?;
        ensure_funds(&register.id, balance, request.total_cost()?)?;

        let mut purchase = PurchaseRepository::new(&mut *self.conn)
            .create_purchase(&register.id, &request.description)
            .await?;

        let mut items = Vec::with_capacity(resolved.len());
        let mut lots = Vec::with_capacity(resolved.len());
        let mut expenses = Vec::with_capacity(resolved.len());

        for (line, product, unit) in resolved {
            let quantity_base = line.quantity_bought.convert(unit.conversion_factor);
            let cost = unit_cost(line.total_cost, quantity_base);

            let lot = LotStore::new(&mut *self.conn)
                .create_lot(&product.id, quantity_base, cost, Some(&purchase.id))
                .await?;
            StockAggregator::new(&mut *self.conn)
                .recalculate(&product.id)
                .await?;

            let description = expense_description(line, &unit, &product);
            let expense = CashLedger::new(&mut *self.conn)
                .record_transaction(
                    &register.id,
                    TransactionKind::Expense,
                    TransactionCategory::Purchase,
                    line.total_cost,
                    &description,
                )
                .await?;

            let item = PurchaseItem {
                id: Uuid::new_v4().to_string(),
                purchase_id: purchase.id.clone(),
                product_id: product.id.clone(),
                unit_id: unit.id.clone(),
                quantity_bought: line.quantity_bought,
                quantity_base,
                total_cost: line.total_cost,
                unit_cost: cost,
                lot_id: lot.id.clone(),
                created_at: Utc::now(),
            };

            let mut headers = PurchaseRepository::new(&mut *self.conn);
            headers.insert_item(&item).await?;
            purchase.total_cost = headers.add_to_total(&purchase.id, line.total_cost).await?;

            debug!(
                purchase_id = %purchase.id,
                product = %product.name,
                quantity_base = %quantity_base,
                unit_cost = %cost,
                "Purchase line applied"
            );

            items.push(item);
            lots.push(lot);
            expenses.push(expense);
        }

        let balance_after = CashLedger::new(&mut *self.conn)
            .live_balance(&register.id)
            .await?;

        Ok(PurchaseResult {
            purchase,
            items,
            lots,
            expenses,
            balance_after,
        })
    }
}

/// "Purchase: 2.0000 Sack of Rice", cut to the description limit.
fn expense_description(line: &PurchaseLine, unit: &UnitOfMeasure, product: &Product) -> String {
    format!(
        "Purchase: {} {} of {}",
        line.quantity_bought, unit.name, product.name
    )
    .chars()
    .take(MAX_DESCRIPTION_LEN)
    .collect()
}

#[cfg(test)]
mod tests {
    use crate::engine::testing::{kitchen, open_day};
    use crate::error::DbError;
    use fogon_core::{
        BaseUnit, CoreError, ErrorCode, Money, NewProduct, NewUnit, PurchaseLine, PurchaseRequest,
        Quantity, ValidationError,
    };

    #[tokio::test]
    async fn test_purchase_creates_lots_stock_and_expenses() {
        let k = kitchen().await;
        let register = open_day(&k.engine, 100).await;

        let result = k
            .engine
            .record_purchase(&PurchaseRequest {
                register_id: register.id.clone(),
                description: "Market".to_string(),
                lines: vec![
                    PurchaseLine {
                        product_id: k.rice.id.clone(),
                        unit_id: k.sack.id.clone(),
                        quantity_bought: Quantity::from_units(2),
                        total_cost: Money::from_units(40),
                    },
                    PurchaseLine {
                        product_id: k.chicken.id.clone(),
                        unit_id: k.kilo.id.clone(),
                        quantity_bought: "1.5".parse().unwrap(),
                        total_cost: Money::from_units(9),
                    },
                ],
            })
            .await
            .unwrap();

        assert_eq!(result.purchase.total_cost, Money::from_units(49));
        assert_eq!(result.balance_after, Money::from_units(51));
        assert_eq!(result.expenses.len(), 2);
        assert_eq!(
            result.expenses[0].description,
            "Purchase: 2.0000 Sack of Rice"
        );

        // 2 sacks × 10 kg at 40.00 → 20 kg at 2.00
        assert_eq!(result.items[0].quantity_base, Quantity::from_units(20));
        assert_eq!(result.items[0].unit_cost, Money::from_units(2));
        assert_eq!(result.lots[0].origin_purchase_id.as_deref(), Some(result.purchase.id.as_str()));

        assert_eq!(
            k.engine.current_stock(&k.rice.id).await.unwrap(),
            Quantity::from_units(20)
        );
        assert_eq!(
            k.engine.current_stock(&k.chicken.id).await.unwrap(),
            "1.5".parse().unwrap()
        );
        assert_eq!(
            k.engine.live_balance(&register.id).await.unwrap(),
            Money::from_units(51)
        );
    }

    #[tokio::test]
    async fn test_overdraw_rejected_without_side_effects() {
        let k = kitchen().await;
        let register = open_day(&k.engine, 100).await;

        let err = k
            .engine
            .record_purchase(&PurchaseRequest {
                register_id: register.id.clone(),
                description: String::new(),
                lines: vec![PurchaseLine {
                    product_id: k.rice.id.clone(),
                    unit_id: k.kilo.id.clone(),
                    quantity_bought: Quantity::from_units(10),
                    total_cost: Money::from_units(150),
                }],
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientFunds { available, requested, .. })
                if available == Money::from_units(100) && requested == Money::from_units(150)
        ));
        let detail = err.detail();
        assert_eq!(detail.code, ErrorCode::InsufficientFunds);
        assert_eq!(detail.shortfall.unwrap().requested, "150.00");

        assert!(k.engine.lots_for(&k.rice.id).await.unwrap().is_empty());
        assert!(k.engine.list_transactions(&register.id).await.unwrap().is_empty());
        assert!(k.engine.current_stock(&k.rice.id).await.unwrap().is_zero());
        assert_eq!(
            k.engine.live_balance(&register.id).await.unwrap(),
            Money::from_units(100)
        );
    }

    #[tokio::test]
    async fn test_line_costs_overflowing_money_are_rejected() {
        let k = kitchen().await;
        let register = open_day(&k.engine, 100).await;
        let line = PurchaseLine {
            product_id: k.rice.id.clone(),
            unit_id: k.kilo.id.clone(),
            quantity_bought: Quantity::from_units(1),
            total_cost: Money::from_cents(i64::MAX / 2 + 1),
        };

        let err = k
            .engine
            .record_purchase(&PurchaseRequest {
                register_id: register.id.clone(),
                description: String::new(),
                lines: vec![line.clone(), line],
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbError::Domain(CoreError::Validation(ValidationError::OutOfRange { ref field, .. }))
                if field == "total_cost"
        ));
        assert_eq!(err.detail().code, ErrorCode::ValidationError);
        assert!(k.engine.lots_for(&k.rice.id).await.unwrap().is_empty());
        assert!(k.engine.list_transactions(&register.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_line_rejects_whole_purchase() {
        let k = kitchen().await;
        let register = open_day(&k.engine, 100).await;

        let err = k
            .engine
            .record_purchase(&PurchaseRequest {
                register_id: register.id.clone(),
                description: String::new(),
                lines: vec![
                    PurchaseLine {
                        product_id: k.rice.id.clone(),
                        unit_id: k.kilo.id.clone(),
                        quantity_bought: Quantity::from_units(1),
                        total_cost: Money::from_units(2),
                    },
                    PurchaseLine {
                        product_id: k.paella.id.clone(),
                        unit_id: k.kilo.id.clone(),
                        quantity_bought: Quantity::from_units(1),
                        total_cost: Money::from_units(2),
                    },
                ],
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbError::Domain(CoreError::Validation(ValidationError::WrongProductKind { .. }))
        ));
        assert!(k.engine.lots_for(&k.rice.id).await.unwrap().is_empty());
        assert!(k.engine.list_transactions(&register.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unit_must_match_base_unit() {
        let k = kitchen().await;
        let register = open_day(&k.engine, 100).await;
        let eggs = k
            .engine
            .create_product(&NewProduct::ingredient("Eggs", BaseUnit::Unit))
            .await
            .unwrap();

        let err = k
            .engine
            .record_purchase(&PurchaseRequest {
                register_id: register.id.clone(),
                description: String::new(),
                lines: vec![PurchaseLine {
                    product_id: eggs.id.clone(),
                    unit_id: k.kilo.id.clone(),
                    quantity_bought: Quantity::from_units(1),
                    total_cost: Money::from_units(2),
                }],
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::Validation(ValidationError::UnitMismatch { .. }))
        ));

        let dozen = k
            .engine
            .create_unit(&NewUnit {
                name: "Dozen".to_string(),
                base_unit: BaseUnit::Unit,
                conversion_factor: Quantity::from_units(12),
            })
            .await
            .unwrap();
        let result = k
            .engine
            .record_purchase(&PurchaseRequest {
                register_id: register.id.clone(),
                description: String::new(),
                lines: vec![PurchaseLine {
                    product_id: eggs.id.clone(),
                    unit_id: dozen.id.clone(),
                    quantity_bought: Quantity::from_units(2),
                    total_cost: Money::from_units(6),
                }],
            })
            .await
            .unwrap();
        assert_eq!(result.items[0].quantity_base, Quantity::from_units(24));
        assert_eq!(result.items[0].unit_cost, Money::from_cents(25));
    }

    #[tokio::test]
    async fn test_purchase_against_closed_register() {
        let k = kitchen().await;
        let register = open_day(&k.engine, 100).await;
        k.engine
            .close_register(&register.id, Money::from_units(100))
            .await
            .unwrap();

        let err = k
            .engine
            .record_purchase(&PurchaseRequest {
                register_id: register.id.clone(),
                description: String::new(),
                lines: vec![PurchaseLine {
                    product_id: k.rice.id.clone(),
                    unit_id: k.kilo.id.clone(),
                    quantity_bought: Quantity::from_units(1),
                    total_cost: Money::from_units(2),
                }],
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::RegisterClosed { .. })
        ));
    }
}
