//! # Unit Repository
//!
//! Units of measure are reference data: created once, read forever.

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use fogon_core::{CoreError, NewUnit, UnitOfMeasure};

/// Repository for units of measure.
#[derive(Debug)]
pub struct UnitRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> UnitRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        UnitRepository { conn }
    }

    pub async fn insert(&mut self, new: &NewUnit) -> DbResult<UnitOfMeasure> {
        new.validate()?;

        let unit = UnitOfMeasure {
            id: Uuid::new_v4().to_string(),
            name: new.name.trim().to_string(),
            base_unit: new.base_unit,
            conversion_factor: new.conversion_factor,
            created_at: Utc::now(),
        };

        debug!(id = %unit.id, name = %unit.name, factor = %unit.conversion_factor, "Inserting unit");

        sqlx::query(
            r#"
            INSERT INTO units_of_measure (id, name, base_unit, conversion_factor, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&unit.id)
        .bind(&unit.name)
        .bind(unit.base_unit)
        .bind(unit.conversion_factor)
        .bind(unit.created_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(unit)
    }

    pub async fn get_by_id(&mut self, id: &str) -> DbResult<Option<UnitOfMeasure>> {
        let unit = sqlx::query_as::<_, UnitOfMeasure>(
            r#"
            SELECT id, name, base_unit, conversion_factor, created_at
            FROM units_of_measure
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(unit)
    }

    /// Like [`get_by_id`](Self::get_by_id), failing with `UnitNotFound`.
    pub async fn require(&mut self, id: &str) -> DbResult<UnitOfMeasure> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::from(CoreError::UnitNotFound(id.to_string())))
    }

    pub async fn list(&mut self) -> DbResult<Vec<UnitOfMeasure>> {
        let units = sqlx::query_as::<_, UnitOfMeasure>(
            r#"
            SELECT id, name, base_unit, conversion_factor, created_at
            FROM units_of_measure
            ORDER BY name
            "#,
        )
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(units)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{conn, memory_db};
    use fogon_core::{BaseUnit, Quantity};

    #[tokio::test]
    async fn test_insert_and_fetch() {
        let db = memory_db().await;
        let mut conn = conn(&db).await;
        let mut repo = UnitRepository::new(&mut conn);

        let dozen = repo
            .insert(&NewUnit {
                name: "Dozen".to_string(),
                base_unit: BaseUnit::Unit,
                conversion_factor: Quantity::from_units(12),
            })
            .await
            .unwrap();

        let fetched = repo.get_by_id(&dozen.id).await.unwrap().unwrap();
        assert_eq!(fetched.base_unit, BaseUnit::Unit);
        assert_eq!(fetched.conversion_factor, Quantity::from_units(12));
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_name_and_missing_unit() {
        let db = memory_db().await;
        let mut conn = conn(&db).await;
        let mut repo = UnitRepository::new(&mut conn);

        let sack = NewUnit {
            name: "Sack".to_string(),
            base_unit: BaseUnit::Kilogram,
            conversion_factor: Quantity::from_units(25),
        };
        repo.insert(&sack).await.unwrap();
        assert!(matches!(
            repo.insert(&sack).await,
            Err(DbError::UniqueViolation { .. })
        ));

        assert!(matches!(
            repo.require("missing").await,
            Err(DbError::Domain(CoreError::UnitNotFound(_)))
        ));
    }
}
