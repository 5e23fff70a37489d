//! # Production Processor
//!
//! Cooks a dish: drains ingredient lots FIFO, costs the run, and refills
//! the dish's kitchen lot.
//!
//! ## Kitchen Lot Policy
//! ```text
//!   run 1: 10 portions @ 3.00  →  kitchen lot { 10 / 10 @ 3.00 }
//!   sell 4                      →  kitchen lot {  6 / 10 @ 3.00 }
//!   run 2:  8 portions @ 3.50  →  kitchen lot {  8 /  8 @ 3.50 }   (overwritten)
//! ```
//! A dish has one rolling kitchen lot. Each run resets it to that run's
//! quantity and unit cost; leftovers from earlier runs are not carried.

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::debug;
use uuid::Uuid;

use crate::engine::fifo::FifoConsumer;
use crate::error::DbResult;
use crate::repository::{LotStore, ProductRepository, ProductionRepository, StockAggregator};
use fogon_core::costing::unit_cost;
use fogon_core::ledger::ensure_stock;
use fogon_core::{
    Money, Production, ProductionIngredient, ProductionLine, ProductionRequest, ProductionResult,
    Quantity, ValidationError,
};

#[derive(Debug)]
pub struct ProductionProcessor<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> ProductionProcessor<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        ProductionProcessor { conn }
    }

    /// Expands a dish's recipe for `quantity` portions into a request.
    ///
    /// Each ingredient is needed at `quantity_required × quantity`.
    pub async fn request_from_recipe(
        &mut self,
        dish_id: &str,
        quantity: Quantity,
    ) -> DbResult<ProductionRequest> {
        let dish = ProductRepository::new(&mut *self.conn)
            .require(dish_id)
            .await?;
        dish.ensure_dish()?;

        let recipe = ProductRepository::new(&mut *self.conn)
            .recipe_for(dish_id)
            .await?;
        if recipe.is_empty() {
            return Err(ValidationError::Required {
                field: "recipe".to_string(),
            }
            .into());
        }

        Ok(ProductionRequest {
            dish_id: dish.id,
            quantity_produced: quantity,
            ingredients: recipe
                .into_iter()
                .map(|line| ProductionLine {
                    ingredient_id: line.ingredient_id,
                    quantity_used: line.quantity_required.convert(quantity),
                })
                .collect(),
        })
    }

    pub async fn process(&mut self, request: &ProductionRequest) -> DbResult<ProductionResult> {
        request.validate()?;

        let dish = ProductRepository::new(&mut *self.conn)
            .require(&request.dish_id)
            .await?;
        dish.ensure_dish()?;

        // Stock guard, per ingredient, before any lot is touched
        for (ingredient_id, needed) in request.required_by_ingredient() {
            let ingredient = ProductRepository::new(&mut *self.conn)
                .require(&ingredient_id)
                .await?;
            ingredient.ensure_ingredient()?;

            let available = StockAggregator::new(&mut *self.conn)
                .lot_sum(&ingredient_id)
                .await?;
            ensure_stock(&ingredient, available, needed)?;
        }

        let production_id = Uuid::new_v4().to_string();
        let mut total_cost = Money::zero();
        let mut ingredients = Vec::with_capacity(request.ingredients.len());

        for line in &request.ingredients {
            let plan = FifoConsumer::new(&mut *self.conn)
                .consume(&line.ingredient_id, line.quantity_used)
                .await?;
            StockAggregator::new(&mut *self.conn)
                .recalculate(&line.ingredient_id)
                .await?;

            total_cost += plan.consumed_cost;
            ingredients.push(ProductionIngredient {
                id: Uuid::new_v4().to_string(),
                production_id: production_id.clone(),
                ingredient_id: line.ingredient_id.clone(),
                quantity_used: line.quantity_used,
                cost_calculated: plan.consumed_cost,
            });
        }

        let unit_cost_real = unit_cost(total_cost, request.quantity_produced);

        let existing = LotStore::new(&mut *self.conn)
            .find_kitchen_lot(&dish.id)
            .await?;
        let mut lots = LotStore::new(&mut *self.conn);
        let dish_lot = match existing {
            Some(lot) => {
                lots.reset_kitchen_lot(&lot.id, request.quantity_produced, unit_cost_real)
                    .await?
            }
            None => {
                lots.create_lot(&dish.id, request.quantity_produced, unit_cost_real, None)
                    .await?
            }
        };
        StockAggregator::new(&mut *self.conn)
            .recalculate(&dish.id)
            .await?;

        let production = Production {
            id: production_id,
            dish_id: dish.id.clone(),
            quantity_produced: request.quantity_produced,
            total_cost,
            unit_cost_real,
            lot_id: dish_lot.id.clone(),
            created_at: Utc::now(),
        };

        let mut runs = ProductionRepository::new(&mut *self.conn);
        runs.insert(&production).await?;
        for line in &ingredients {
            runs.insert_ingredient(line).await?;
        }

        debug!(
            production_id = %production.id,
            dish = %dish.name,
            total_cost = %total_cost,
            unit_cost = %unit_cost_real,
            "Production costed"
        );

        Ok(ProductionResult {
            production,
            ingredients,
            dish_lot,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::testing::{kitchen, open_day, stock_up};
    use crate::error::DbError;
    use fogon_core::{
        CoreError, Money, ProductionLine, ProductionRequest, Quantity, SaleLine, ValidationError,
    };

    fn run(dish_id: &str, portions: i64, lines: &[(&str, &str)]) -> ProductionRequest {
        ProductionRequest {
            dish_id: dish_id.to_string(),
            quantity_produced: Quantity::from_units(portions),
            ingredients: lines
                .iter()
                .map(|(id, qty)| ProductionLine {
                    ingredient_id: id.to_string(),
                    quantity_used: qty.parse().unwrap(),
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_production_costs_ingredients_fifo() {
        let k = kitchen().await;
        let register = open_day(&k.engine, 500).await;
        stock_up(&k, &register.id, &k.rice.id, 5, 10).await; // 5 kg @ 2.00
        stock_up(&k, &register.id, &k.rice.id, 3, 12).await; // 3 kg @ 4.00
        stock_up(&k, &register.id, &k.chicken.id, 2, 16).await; // 2 kg @ 8.00

        let result = k
            .engine
            .record_production(&run(
                &k.paella.id,
                4,
                &[(k.rice.id.as_str(), "6"), (k.chicken.id.as_str(), "0.5")],
            ))
            .await
            .unwrap();

        // rice 5×2 + 1×4 = 14, chicken 0.5×8 = 4
        assert_eq!(result.ingredients[0].cost_calculated, Money::from_units(14));
        assert_eq!(result.ingredients[1].cost_calculated, Money::from_units(4));
        assert_eq!(result.production.total_cost, Money::from_units(18));
        assert_eq!(result.production.unit_cost_real, Money::from_cents(450));

        assert_eq!(result.dish_lot.current_quantity, Quantity::from_units(4));
        assert!(result.dish_lot.origin_purchase_id.is_none());

        assert_eq!(
            k.engine.current_stock(&k.rice.id).await.unwrap(),
            Quantity::from_units(2)
        );
        assert_eq!(
            k.engine.current_stock(&k.chicken.id).await.unwrap(),
            "1.5".parse().unwrap()
        );
        assert_eq!(
            k.engine.current_stock(&k.paella.id).await.unwrap(),
            Quantity::from_units(4)
        );
    }

    #[tokio::test]
    async fn test_second_run_overwrites_kitchen_lot() {
        let k = kitchen().await;
        let register = open_day(&k.engine, 500).await;
        stock_up(&k, &register.id, &k.rice.id, 10, 20).await; // 10 kg @ 2.00

        let first = k
            .engine
            .record_production(&run(&k.paella.id, 10, &[(k.rice.id.as_str(), "5")]))
            .await
            .unwrap();
        k.engine
            .record_sale(&[SaleLine::new(
                k.paella.id.clone(),
                Quantity::from_units(4),
                Money::from_units(14),
            )])
            .await
            .unwrap();

        let second = k
            .engine
            .record_production(&run(&k.paella.id, 2, &[(k.rice.id.as_str(), "2")]))
            .await
            .unwrap();

        assert_eq!(second.dish_lot.id, first.dish_lot.id);
        assert_eq!(second.dish_lot.initial_quantity, Quantity::from_units(2));
        assert_eq!(second.dish_lot.current_quantity, Quantity::from_units(2));
        assert_eq!(second.dish_lot.unit_cost, Money::from_units(2));

        let lots = k.engine.lots_for(&k.paella.id).await.unwrap();
        assert_eq!(lots.len(), 1);
        assert_eq!(
            k.engine.current_stock(&k.paella.id).await.unwrap(),
            Quantity::from_units(2)
        );
    }

    #[tokio::test]
    async fn test_short_ingredient_rejects_run() {
        let k = kitchen().await;
        let register = open_day(&k.engine, 500).await;
        stock_up(&k, &register.id, &k.rice.id, 2, 4).await;
        stock_up(&k, &register.id, &k.chicken.id, 1, 8).await;

        // Rice appears twice; 1.5 + 1 exceeds the 2 kg on hand
        let err = k
            .engine
            .record_production(&run(
                &k.paella.id,
                1,
                &[
                    (k.chicken.id.as_str(), "1"),
                    (k.rice.id.as_str(), "1.5"),
                    (k.rice.id.as_str(), "1"),
                ],
            ))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock { ref product_id, .. })
                if *product_id == k.rice.id
        ));
        assert_eq!(
            k.engine.current_stock(&k.chicken.id).await.unwrap(),
            Quantity::from_units(1)
        );
        assert!(k.engine.lots_for(&k.paella.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_zero_portions_costs_nothing_per_unit() {
        let k = kitchen().await;
        let register = open_day(&k.engine, 500).await;
        stock_up(&k, &register.id, &k.rice.id, 1, 2).await;

        let result = k
            .engine
            .record_production(&run(&k.paella.id, 0, &[(k.rice.id.as_str(), "1")]))
            .await
            .unwrap();
        assert_eq!(result.production.total_cost, Money::from_units(2));
        assert!(result.production.unit_cost_real.is_zero());
        assert!(result.dish_lot.current_quantity.is_zero());
    }

    #[tokio::test]
    async fn test_production_from_recipe() {
        let k = kitchen().await;
        let register = open_day(&k.engine, 500).await;
        stock_up(&k, &register.id, &k.rice.id, 5, 10).await;
        stock_up(&k, &register.id, &k.chicken.id, 5, 40).await;

        k.engine
            .set_recipe_line(&k.paella.id, &k.rice.id, "0.25".parse().unwrap())
            .await
            .unwrap();
        k.engine
            .set_recipe_line(&k.paella.id, &k.chicken.id, "0.2".parse().unwrap())
            .await
            .unwrap();

        let result = k
            .engine
            .record_production_from_recipe(&k.paella.id, Quantity::from_units(4))
            .await
            .unwrap();

        assert_eq!(result.ingredients.len(), 2);
        assert_eq!(result.ingredients[0].quantity_used, Quantity::from_units(1));
        assert_eq!(result.ingredients[1].quantity_used, "0.8".parse().unwrap());
        // 1 kg rice @ 2.00 + 0.8 kg chicken @ 8.00
        assert_eq!(result.production.total_cost, Money::from_cents(840));
        assert_eq!(result.production.unit_cost_real, Money::from_cents(210));
    }

    #[tokio::test]
    async fn test_recipe_required_and_dish_kind_checked() {
        let k = kitchen().await;

        let err = k
            .engine
            .record_production_from_recipe(&k.paella.id, Quantity::from_units(1))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::Validation(ValidationError::Required { .. }))
        ));

        let err = k
            .engine
            .record_production(&run(&k.rice.id, 1, &[(k.chicken.id.as_str(), "1")]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::Validation(ValidationError::WrongProductKind { .. }))
        ));
    }
}
