//! # Repository Module
//!
//! Row-level access to every table, one repository per aggregate.
//!
//! ## Connection-Bound Repositories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Every repository borrows a `&mut SqliteConnection` instead of owning   │
//! │  the pool. The same type then works on:                                 │
//! │                                                                         │
//! │   • a transaction     LotStore::new(&mut *tx)      (engine writes)      │
//! │   • a pooled conn     LotStore::new(&mut *conn)    (engine reads)       │
//! │                                                                         │
//! │  An operation threads ONE transaction through all the repositories it   │
//! │  touches, so its reads see its own writes and a failure anywhere rolls  │
//! │  back everything.                                                       │
//! │                                                                         │
//! │  PurchaseProcessor                                                      │
//! │   ├── CashLedger::new(&mut *tx).live_balance(..)                        │
//! │   ├── LotStore::new(&mut *tx).create_lot(..)                            │
//! │   ├── StockAggregator::new(&mut *tx).recalculate(..)                    │
//! │   └── CashLedger::new(&mut *tx).record_transaction(..)                  │
//! │  tx.commit()                                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`UnitRepository`] - Units of measure
//! - [`ProductRepository`] - Products and recipes
//! - [`LotStore`] - Lot creation, listing and depletion
//! - [`StockAggregator`] - Cached stock recomputation
//! - [`CashLedger`] - Registers and cash transactions
//! - [`PurchaseRepository`], [`ProductionRepository`], [`SaleRepository`] - Event headers and lines

pub mod lot;
pub mod product;
pub mod production;
pub mod purchase;
pub mod register;
pub mod sale;
pub mod stock;
pub mod unit;

pub use lot::LotStore;
pub use product::ProductRepository;
pub use production::ProductionRepository;
pub use purchase::PurchaseRepository;
pub use register::CashLedger;
pub use sale::SaleRepository;
pub use stock::StockAggregator;
pub use unit::UnitRepository;

#[cfg(test)]
pub(crate) mod test_support {
    //! Fixtures shared by repository and engine tests.

    use fogon_core::{BaseUnit, Money, NewProduct, NewUnit, Product, UnitOfMeasure};
    use sqlx::pool::PoolConnection;
    use sqlx::Sqlite;

    use super::{ProductRepository, UnitRepository};
    use crate::{Database, DbConfig};

    pub async fn memory_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    pub async fn conn(db: &Database) -> PoolConnection<Sqlite> {
        db.pool().acquire().await.unwrap()
    }

    pub async fn ingredient(conn: &mut sqlx::SqliteConnection, name: &str) -> Product {
        ProductRepository::new(conn)
            .insert(&NewProduct::ingredient(name, BaseUnit::Kilogram))
            .await
            .unwrap()
    }

    pub async fn dish(conn: &mut sqlx::SqliteConnection, name: &str, price_units: i64) -> Product {
        ProductRepository::new(conn)
            .insert(&NewProduct::dish(name, Money::from_units(price_units)))
            .await
            .unwrap()
    }

    pub async fn kilo(conn: &mut sqlx::SqliteConnection) -> UnitOfMeasure {
        UnitRepository::new(conn)
            .insert(&NewUnit {
                name: "Kilogram".to_string(),
                base_unit: BaseUnit::Kilogram,
                conversion_factor: fogon_core::Quantity::from_units(1),
            })
            .await
            .unwrap()
    }
}
