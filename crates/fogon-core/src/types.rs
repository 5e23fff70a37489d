//! # Domain Types
//!
//! Rows of the kitchen and cash-drawer model.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Catalog                 Stock                     Cash                 │
//! │  ┌───────────────┐       ┌───────────────┐        ┌───────────────┐     │
//! │  │ UnitOfMeasure │       │      Lot      │        │ CashRegister  │     │
//! │  │ Product       │──1:N─►│ entry_seq     │        │ start_amount  │     │
//! │  │ RecipeLine    │       │ current_qty   │        │ is_closed     │     │
//! │  └───────────────┘       │ unit_cost     │        └───────┬───────┘     │
//! │                          └───────────────┘                │1:N          │
//! │                                                   ┌───────▼───────┐     │
//! │  Costing events (header + lines)                  │CashTransaction│     │
//! │  Purchase/PurchaseItem  Production/...  Sale/...  │ income|expense│     │
//! │                                                   └───────────────┘     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every entity is keyed by a UUID v4 string. Amounts are [`Money`], stock
//! figures and factors are [`Quantity`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::{Money, Quantity};

// =============================================================================
// Base Unit
// =============================================================================

/// What a product is counted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum BaseUnit {
    /// Weighed goods (rice, meat, oil by weight).
    #[serde(rename = "kg")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "kg"))]
    Kilogram,
    /// Counted goods (eggs, bottles, plates).
    #[serde(rename = "unit")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "unit"))]
    Unit,
}

impl BaseUnit {
    pub const fn as_str(&self) -> &'static str {
        match self {
            BaseUnit::Kilogram => "kg",
            BaseUnit::Unit => "unit",
        }
    }
}

impl fmt::Display for BaseUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BaseUnit {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kg" => Ok(BaseUnit::Kilogram),
            "unit" | "u" => Ok(BaseUnit::Unit),
            _ => Err(ValidationError::NotAllowed {
                field: "base_unit".to_string(),
                allowed: vec!["kg".to_string(), "unit".to_string()],
            }),
        }
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// A purchasing unit ("sack of 25 kg", "dozen") and how it maps onto a
/// base unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct UnitOfMeasure {
    pub id: String,
    pub name: String,
    pub base_unit: BaseUnit,
    /// Base units per one of this unit (sack → 25.0000).
    pub conversion_factor: Quantity,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A raw ingredient or a dish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub name: String,

    /// Finished good made in the kitchen (true) or bought ingredient (false).
    pub is_dish: bool,

    pub base_unit: BaseUnit,

    /// Sum of the product's lot quantities.
    ///
    /// Derived: written only by stock recalculation, never by the catalog.
    pub current_stock: Quantity,

    /// Default menu price for dishes.
    pub sales_price: Option<Money>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Fails unless the product is a dish.
    pub fn ensure_dish(&self) -> Result<(), ValidationError> {
        if self.is_dish {
            Ok(())
        } else {
            Err(ValidationError::WrongProductKind {
                product: self.name.clone(),
                expected: "a dish".to_string(),
            })
        }
    }

    /// Fails unless the product is an ingredient.
    pub fn ensure_ingredient(&self) -> Result<(), ValidationError> {
        if self.is_dish {
            Err(ValidationError::WrongProductKind {
                product: self.name.clone(),
                expected: "an ingredient".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

/// How much of one ingredient goes into one portion of a dish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct RecipeLine {
    pub id: String,
    pub dish_id: String,
    pub ingredient_id: String,
    pub quantity_required: Quantity,
}

// =============================================================================
// Lot
// =============================================================================

/// A quantity of one product acquired at one unit cost.
///
/// ## Lifecycle
/// ```text
///   created (purchase line or production run)
///       │  initial = current = q
///       ▼
///   depleted oldest-first ── current decreases, never below 0
///       │
///       ▼
///   exhausted (current = 0), kept as cost history
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Lot {
    pub id: String,
    pub product_id: String,

    /// Entry order; lower is older and consumed first.
    pub entry_seq: i64,

    pub initial_quantity: Quantity,
    pub current_quantity: Quantity,

    /// Cost of one base unit, fixed at creation.
    pub unit_cost: Money,

    /// Purchase that brought the lot in; `None` for kitchen-made lots.
    pub origin_purchase_id: Option<String>,

    #[ts(as = "String")]
    pub entered_at: DateTime<Utc>,
}

impl Lot {
    /// A lot with stock left.
    #[inline]
    pub fn is_live(&self) -> bool {
        self.current_quantity.is_positive()
    }

    #[inline]
    pub fn is_kitchen_made(&self) -> bool {
        self.origin_purchase_id.is_none()
    }

    /// Value of the remaining quantity at the lot's unit cost.
    pub fn value(&self) -> Money {
        self.unit_cost.for_quantity(self.current_quantity)
    }
}

// =============================================================================
// Cash Register
// =============================================================================

/// One business day's cash drawer.
///
/// The close-out fields stay `None` until the register is closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CashRegister {
    pub id: String,

    #[ts(as = "String")]
    pub business_date: NaiveDate,

    pub start_amount: Money,

    /// Balance computed by the system at close.
    pub end_amount_system: Option<Money>,

    /// Amount counted in the drawer at close.
    pub end_amount_real: Option<Money>,

    /// `end_amount_real - end_amount_system`; negative means cash is short.
    pub difference: Option<Money>,

    pub is_closed: bool,

    #[ts(as = "String")]
    pub opened_at: DateTime<Utc>,

    #[ts(as = "Option<String>")]
    pub closed_at: Option<DateTime<Utc>>,
}

/// Direction of a cash movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a cash movement was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum TransactionCategory {
    /// Sale income. Posted only by the sale processor.
    Sales,
    /// Ingredient purchases. Posted only by the purchase processor.
    Purchase,
    Service,
    Salary,
    Other,
}

impl TransactionCategory {
    pub const ALL: [TransactionCategory; 5] = [
        TransactionCategory::Sales,
        TransactionCategory::Purchase,
        TransactionCategory::Service,
        TransactionCategory::Salary,
        TransactionCategory::Other,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            TransactionCategory::Sales => "sales",
            TransactionCategory::Purchase => "purchase",
            TransactionCategory::Service => "service",
            TransactionCategory::Salary => "salary",
            TransactionCategory::Other => "other",
        }
    }

    /// Categories a cashier may post by hand.
    pub const fn is_manual_expense(&self) -> bool {
        matches!(
            self,
            TransactionCategory::Service | TransactionCategory::Salary | TransactionCategory::Other
        )
    }
}

impl fmt::Display for TransactionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionCategory {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        TransactionCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "category".to_string(),
                allowed: TransactionCategory::ALL
                    .iter()
                    .map(|c| c.as_str().to_string())
                    .collect(),
            })
    }
}

/// An immutable cash movement against one register.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CashTransaction {
    pub id: String,
    pub cash_register_id: String,
    pub kind: TransactionKind,
    pub category: TransactionCategory,

    /// Always non-negative; `kind` carries the direction.
    pub amount: Money,

    pub description: String,

    /// Idempotency key for processor-posted entries (`sale:<id>:income`).
    pub source_key: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl CashTransaction {
    /// Amount with the sign of its effect on the balance.
    pub fn signed_amount(&self) -> Money {
        match self.kind {
            TransactionKind::Income => self.amount,
            TransactionKind::Expense => -self.amount,
        }
    }
}

// =============================================================================
// Costing Events
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Purchase {
    pub id: String,
    pub cash_register_id: String,
    pub description: String,
    /// Running total, accumulated as lines are applied.
    pub total_cost: Money,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PurchaseItem {
    pub id: String,
    pub purchase_id: String,
    pub product_id: String,
    pub unit_id: String,
    /// In purchasing units (sacks, dozens).
    pub quantity_bought: Quantity,
    /// In the product's base unit.
    pub quantity_base: Quantity,
    pub total_cost: Money,
    pub unit_cost: Money,
    pub lot_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Production {
    pub id: String,
    pub dish_id: String,
    pub quantity_produced: Quantity,
    pub total_cost: Money,
    /// `total_cost / quantity_produced`, zero when nothing was produced.
    pub unit_cost_real: Money,
    pub lot_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ProductionIngredient {
    pub id: String,
    pub production_id: String,
    pub ingredient_id: String,
    pub quantity_used: Quantity,
    /// FIFO cost of the consumed ingredient lots.
    pub cost_calculated: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub cash_register_id: String,
    /// Running total, accumulated as lines are applied.
    pub total_amount: Money,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub dish_id: String,
    pub quantity: Quantity,
    pub unit_price: Money,
    pub subtotal: Money,
    /// FIFO cost of the dish lots this line consumed.
    pub cost_of_goods: Money,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl SaleItem {
    pub fn margin(&self) -> Money {
        self.subtotal - self.cost_of_goods
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn lot(current: i64, unit_cost: i64) -> Lot {
        Lot {
            id: "lot-1".to_string(),
            product_id: "p-1".to_string(),
            entry_seq: 1,
            initial_quantity: Quantity::from_units(10),
            current_quantity: Quantity::from_units(current),
            unit_cost: Money::from_cents(unit_cost),
            origin_purchase_id: None,
            entered_at: Utc::now(),
        }
    }

    #[test]
    fn test_base_unit_parse() {
        assert_eq!("KG".parse::<BaseUnit>().unwrap(), BaseUnit::Kilogram);
        assert_eq!("u".parse::<BaseUnit>().unwrap(), BaseUnit::Unit);
        assert!("litre".parse::<BaseUnit>().is_err());
        assert_eq!(BaseUnit::Kilogram.to_string(), "kg");
    }

    #[test]
    fn test_category_parse_and_manual() {
        assert_eq!(
            "Salary".parse::<TransactionCategory>().unwrap(),
            TransactionCategory::Salary
        );
        assert!("tips".parse::<TransactionCategory>().is_err());
        assert!(TransactionCategory::Service.is_manual_expense());
        assert!(!TransactionCategory::Sales.is_manual_expense());
        assert!(!TransactionCategory::Purchase.is_manual_expense());
    }

    #[test]
    fn test_lot_value_and_liveness() {
        let live = lot(4, 250);
        assert!(live.is_live());
        assert!(live.is_kitchen_made());
        assert_eq!(live.value().cents(), 1000);

        assert!(!lot(0, 250).is_live());
    }

    #[test]
    fn test_signed_amount() {
        let tx = CashTransaction {
            id: "t".to_string(),
            cash_register_id: "r".to_string(),
            kind: TransactionKind::Expense,
            category: TransactionCategory::Service,
            amount: Money::from_cents(500),
            description: "gas".to_string(),
            source_key: None,
            created_at: Utc::now(),
        };
        assert_eq!(tx.signed_amount().cents(), -500);
    }

    #[test]
    fn test_enum_serde_names() {
        assert_eq!(
            serde_json::to_string(&TransactionKind::Income).unwrap(),
            "\"income\""
        );
        assert_eq!(serde_json::to_string(&BaseUnit::Kilogram).unwrap(), "\"kg\"");
    }
}
