//! # fogon-core: Pure Business Logic for Fogon
//!
//! Costing and cash-ledger rules for a restaurant kitchen, as pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Fogon Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            External layer (HTTP, admin UI, auth)                │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ requests / results / ErrorDetail       │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             fogon-db: LedgerEngine + SQLite                     │   │
//! │  │    lots, stock, register, purchase/production/sale processors   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ fogon-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐  │   │
//! │  │   │  money  │ │  types  │ │ costing │ │ ledger  │ │operation│  │   │
//! │  │   │ Money   │ │ Lot     │ │ FIFO    │ │ balance │ │ requests│  │   │
//! │  │   │Quantity │ │Register │ │ plan    │ │ close   │ │ results │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Fixed-point `Money` (cents) and `Quantity` (ten-thousandths)
//! - [`types`] - Domain rows (Product, Lot, CashRegister, CashTransaction, ...)
//! - [`operations`] - Operation requests and results
//! - [`costing`] - FIFO consumption planning
//! - [`ledger`] - Register balance, close-out and guards
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types and the serializable `ErrorDetail`
//!
//! ## Example Usage
//!
//! ```rust
//! use fogon_core::costing::plan_fifo;
//! use fogon_core::money::{Money, Quantity};
//!
//! // 3 kg bought for 10.00
//! let unit_cost = Money::from_units(10).per_quantity(Quantity::from_units(3));
//! assert_eq!(unit_cost.to_string(), "3.33");
//!
//! // Nothing to consume yet
//! let plan = plan_fifo(&[], Quantity::from_units(1));
//! assert!(!plan.is_complete());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod costing;
pub mod error;
pub mod ledger;
pub mod money;
pub mod operations;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ErrorCode, ErrorDetail, Shortfall, ValidationError};
pub use money::{CostAccumulator, Money, Quantity};
pub use operations::*;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines in a single purchase, production run or sale.
///
/// Keeps one operation's transaction short; SQLite holds the write lock
/// for its whole duration.
pub const MAX_OPERATION_LINES: usize = 100;
