//! # Production Repository
//!
//! Production runs and the ingredient cost lines behind them. Rows are
//! written once, after the run has been costed.

use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use fogon_core::{Production, ProductionIngredient};

#[derive(Debug)]
pub struct ProductionRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> ProductionRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        ProductionRepository { conn }
    }

    pub async fn insert(&mut self, production: &Production) -> DbResult<()> {
        debug!(
            production_id = %production.id,
            dish_id = %production.dish_id,
            quantity = %production.quantity_produced,
            total_cost = %production.total_cost,
            "Inserting production"
        );

        sqlx::query(
            r#"
            INSERT INTO productions (
                id, dish_id, quantity_produced, total_cost, unit_cost_real, lot_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&production.id)
        .bind(&production.dish_id)
        .bind(production.quantity_produced)
        .bind(production.total_cost)
        .bind(production.unit_cost_real)
        .bind(&production.lot_id)
        .bind(production.created_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    pub async fn insert_ingredient(&mut self, line: &ProductionIngredient) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO production_ingredients (
                id, production_id, ingredient_id, quantity_used, cost_calculated
            ) VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&line.id)
        .bind(&line.production_id)
        .bind(&line.ingredient_id)
        .bind(line.quantity_used)
        .bind(line.cost_calculated)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    pub async fn get_by_id(&mut self, id: &str) -> DbResult<Option<Production>> {
        let production = sqlx::query_as::<_, Production>(
            r#"
            SELECT id, dish_id, quantity_produced, total_cost, unit_cost_real, lot_id, created_at
            FROM productions
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(production)
    }

    pub async fn get_ingredients(&mut self, production_id: &str) -> DbResult<Vec<ProductionIngredient>> {
        let lines = sqlx::query_as::<_, ProductionIngredient>(
            r#"
            SELECT id, production_id, ingredient_id, quantity_used, cost_calculated
            FROM production_ingredients
            WHERE production_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(production_id)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(lines)
    }

    /// Production runs of a dish, newest first.
    pub async fn list_for_dish(&mut self, dish_id: &str) -> DbResult<Vec<Production>> {
        let runs = sqlx::query_as::<_, Production>(
            r#"
            SELECT id, dish_id, quantity_produced, total_cost, unit_cost_real, lot_id, created_at
            FROM productions
            WHERE dish_id = ?1
            ORDER BY rowid DESC
            "#,
        )
        .bind(dish_id)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(runs)
    }
}
