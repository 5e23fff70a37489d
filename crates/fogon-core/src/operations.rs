//! # Operation Requests & Results
//!
//! What callers hand to the ledger engine and what they get back.
//!
//! ```text
//!   PurchaseRequest ──► record_purchase ──► PurchaseResult
//!   ProductionRequest ► record_production ► ProductionResult
//!   Vec<SaleLine> ────► record_sale ──────► SaleResult
//!   ExpenseRequest ───► record_expense ───► CashTransaction
//! ```
//!
//! Requests derive `Deserialize` so an HTTP layer can accept them as-is;
//! results derive `Serialize` and carry every row the operation wrote.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::{Money, Quantity};
use crate::types::{
    BaseUnit, CashRegister, CashTransaction, Lot, Production, ProductionIngredient, Purchase,
    PurchaseItem, Sale, SaleItem, TransactionCategory, TransactionKind,
};
use crate::validation::{
    validate_description, validate_id, validate_line_count, validate_name,
    validate_non_negative_amount, validate_positive_amount, validate_positive_quantity,
    ValidationResult,
};

// =============================================================================
// Catalog
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewUnit {
    pub name: String,
    pub base_unit: BaseUnit,
    pub conversion_factor: Quantity,
}

impl NewUnit {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_name("name", &self.name)?;
        validate_positive_quantity("conversion_factor", self.conversion_factor)
    }
}

/// A product as entered in the catalog. Stock always starts at zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewProduct {
    pub name: String,
    pub is_dish: bool,
    pub base_unit: BaseUnit,
    pub sales_price: Option<Money>,
}

impl NewProduct {
    pub fn ingredient(name: impl Into<String>, base_unit: BaseUnit) -> Self {
        NewProduct {
            name: name.into(),
            is_dish: false,
            base_unit,
            sales_price: None,
        }
    }

    pub fn dish(name: impl Into<String>, sales_price: Money) -> Self {
        NewProduct {
            name: name.into(),
            is_dish: true,
            base_unit: BaseUnit::Unit,
            sales_price: Some(sales_price),
        }
    }

    pub fn validate(&self) -> ValidationResult<()> {
        validate_name("name", &self.name)?;
        if let Some(price) = self.sales_price {
            validate_non_negative_amount("sales_price", price)?;
        }
        Ok(())
    }
}

// =============================================================================
// Purchase
// =============================================================================

/// One ingredient bought in a purchasing unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchaseLine {
    pub product_id: String,
    pub unit_id: String,
    pub quantity_bought: Quantity,
    /// What was paid for the whole line.
    pub total_cost: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchaseRequest {
    pub register_id: String,
    pub description: String,
    pub lines: Vec<PurchaseLine>,
}

impl PurchaseRequest {
    /// Shape checks that need no stored state.
    pub fn validate(&self) -> ValidationResult<()> {
        validate_id("register_id", &self.register_id)?;
        validate_description(&self.description)?;
        validate_line_count(self.lines.len())?;
        for line in &self.lines {
            validate_id("product_id", &line.product_id)?;
            validate_id("unit_id", &line.unit_id)?;
            validate_positive_quantity("quantity_bought", line.quantity_bought)?;
            if line.total_cost.is_negative() {
                return Err(ValidationError::OutOfRange {
                    field: "total_cost".to_string(),
                    min: 0,
                    max: i64::MAX,
                });
            }
        }
        self.total_cost()?;
        Ok(())
    }

    /// Sum of line costs; the amount the register must cover up front.
    ///
    /// Fails when the lines together exceed what `Money` can hold.
    pub fn total_cost(&self) -> ValidationResult<Money> {
        self.lines.iter().try_fold(Money::zero(), |total, line| {
            total
                .checked_add(line.total_cost)
                .ok_or_else(|| ValidationError::OutOfRange {
                    field: "total_cost".to_string(),
                    min: 0,
                    max: i64::MAX,
                })
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchaseResult {
    pub purchase: Purchase,
    pub items: Vec<PurchaseItem>,
    pub lots: Vec<Lot>,
    pub expenses: Vec<CashTransaction>,
    /// Register balance once the purchase is paid.
    pub balance_after: Money,
}

// =============================================================================
// Production
// =============================================================================

/// Ingredient consumed by a production run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductionLine {
    pub ingredient_id: String,
    pub quantity_used: Quantity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductionRequest {
    pub dish_id: String,
    pub quantity_produced: Quantity,
    pub ingredients: Vec<ProductionLine>,
}

impl ProductionRequest {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_id("dish_id", &self.dish_id)?;
        if self.quantity_produced.is_negative() {
            return Err(ValidationError::OutOfRange {
                field: "quantity_produced".to_string(),
                min: 0,
                max: i64::MAX,
            });
        }
        validate_line_count(self.ingredients.len())?;
        for line in &self.ingredients {
            validate_id("ingredient_id", &line.ingredient_id)?;
            validate_positive_quantity("quantity_used", line.quantity_used)?;
        }
        Ok(())
    }

    /// Quantity needed per ingredient, in first-seen order.
    ///
    /// The same ingredient may appear on several lines; stock is checked
    /// against the sum.
    pub fn required_by_ingredient(&self) -> Vec<(String, Quantity)> {
        let mut totals: Vec<(String, Quantity)> = Vec::new();
        for line in &self.ingredients {
            match totals.iter_mut().find(|(id, _)| *id == line.ingredient_id) {
                Some((_, total)) => *total += line.quantity_used,
                None => totals.push((line.ingredient_id.clone(), line.quantity_used)),
            }
        }
        totals
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductionResult {
    pub production: Production,
    pub ingredients: Vec<ProductionIngredient>,
    /// The dish's kitchen lot after the run.
    pub dish_lot: Lot,
}

// =============================================================================
// Sale
// =============================================================================

/// One dish sold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleLine {
    pub dish_id: String,
    pub quantity: Quantity,
    /// Price per portion; falls back to the dish's menu price when absent.
    pub unit_price: Option<Money>,
}

impl SaleLine {
    pub fn new(dish_id: impl Into<String>, quantity: Quantity, unit_price: Money) -> Self {
        SaleLine {
            dish_id: dish_id.into(),
            quantity,
            unit_price: Some(unit_price),
        }
    }
}

/// Shape checks for a whole sale.
pub fn validate_sale_lines(lines: &[SaleLine]) -> ValidationResult<()> {
    validate_line_count(lines.len())?;
    for line in lines {
        validate_id("dish_id", &line.dish_id)?;
        validate_positive_quantity("quantity", line.quantity)?;
        if let Some(price) = line.unit_price {
            if price.is_negative() {
                return Err(ValidationError::OutOfRange {
                    field: "unit_price".to_string(),
                    min: 0,
                    max: i64::MAX,
                });
            }
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleResult {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
    /// The single income entry posted for the sale.
    pub income: CashTransaction,
}

impl SaleResult {
    /// Cost of goods across all lines.
    pub fn cost_of_goods(&self) -> Money {
        self.items.iter().map(|item| item.cost_of_goods).sum()
    }
}

// =============================================================================
// Manual Expense
// =============================================================================

/// A cash payment not tied to a purchase (gas bill, wages).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ExpenseRequest {
    pub register_id: String,
    pub category: TransactionCategory,
    pub amount: Money,
    pub description: String,
}

impl ExpenseRequest {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_id("register_id", &self.register_id)?;
        if !self.category.is_manual_expense() {
            return Err(ValidationError::NotAllowed {
                field: "category".to_string(),
                allowed: TransactionCategory::ALL
                    .iter()
                    .filter(|c| c.is_manual_expense())
                    .map(|c| c.as_str().to_string())
                    .collect(),
            });
        }
        validate_positive_amount("amount", self.amount)?;
        validate_description(&self.description)
    }
}

// =============================================================================
// Reports
// =============================================================================

/// Total for one (kind, category) pair on a register.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CategoryTotal {
    pub kind: TransactionKind,
    pub category: TransactionCategory,
    pub total: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RegisterSummary {
    pub register: CashRegister,
    pub income: Money,
    pub expense: Money,
    /// `start_amount + income - expense`.
    pub balance: Money,
    pub by_category: Vec<CategoryTotal>,
    pub transaction_count: usize,
}

/// What the pantry and the pass are worth at lot cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InventoryValuation {
    pub total_value: Money,
    pub products_in_stock: i64,
    pub live_lots: i64,
}

/// Cached stock against the lot sum for one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockAudit {
    pub product_id: String,
    pub cached: Quantity,
    pub computed: Quantity,
}

impl StockAudit {
    pub fn in_sync(&self) -> bool {
        self.cached == self.computed
    }
}

// =============================================================================
// History
// =============================================================================

/// A stored purchase with its lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchaseDetail {
    pub purchase: Purchase,
    pub items: Vec<PurchaseItem>,
}

/// A stored production run with the ingredients it drew.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductionDetail {
    pub production: Production,
    pub ingredients: Vec<ProductionIngredient>,
}

/// A stored sale with its lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleDetail {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

// =============================================================================
// Unit Tests
// =============================================================================
