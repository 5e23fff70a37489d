//! # fogon-db: Persistence and Ledger Engine
//!
//! SQLite storage for the kitchen's lots and cash registers, and the
//! engine that runs purchases, production and sales against it.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Fogon Data Flow                                 │
//! │                                                                         │
//! │  Caller (HTTP layer, demo-day binary, tests)                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                     fogon-db (THIS CRATE)                       │    │
//! │  │                                                                 │    │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐    │    │
//! │  │   │ LedgerEngine  │    │  Repositories │    │   Database   │    │    │
//! │  │   │  (engine/)    │    │ (repository/) │    │  (pool.rs)   │    │    │
//! │  │   │               │    │               │    │              │    │    │
//! │  │   │ Purchase      │───►│ LotStore      │───►│ SqlitePool   │    │    │
//! │  │   │ Production    │    │ StockAggreg.  │    │ Migrations   │    │    │
//! │  │   │ Sale          │    │ CashLedger    │    │ (embedded)   │    │    │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘    │    │
//! │  │                                                                 │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                     SQLite Database (fogon.db)                  │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`config`] - Environment-driven application configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Row access, one repository per aggregate
//! - [`engine`] - Serialized, atomic costing and cash operations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fogon_db::{AppConfig, Database, LedgerEngine};
//!
//! let config = AppConfig::load()?;
//! let engine = LedgerEngine::new(Database::new(config.db_config()).await?);
//!
//! let register = engine.open_register(today, Money::from_units(200)).await?;
//! let sale = engine.record_sale(&lines).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod engine;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{AppConfig, ConfigError};
pub use engine::LedgerEngine;
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::{
    CashLedger, LotStore, ProductRepository, ProductionRepository, PurchaseRepository,
    SaleRepository, StockAggregator, UnitRepository,
};
