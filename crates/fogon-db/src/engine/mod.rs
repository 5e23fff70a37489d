//! # Ledger Engine
//!
//! The entry point for every kitchen and cash operation.
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  engine.record_sale(lines)                                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  write_gate.lock()          one mutating operation at a time            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  pool.begin()               guard reads and writes share this tx        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SaleProcessor::new(&mut *tx).process(lines)                            │
//! │       │                                                                 │
//! │       ├── Err → tx dropped, rolled back, warn! logged                   │
//! │       └── Ok  → tx.commit(), info! logged                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Reads (balances, stock, listings, reports) go straight to the pool and
//! only ever see committed operations.

pub mod fifo;
pub mod production;
pub mod purchase;
pub mod report;
pub mod sale;

use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::repository::{
    CashLedger, LotStore, ProductRepository, ProductionRepository, PurchaseRepository,
    SaleRepository, StockAggregator, UnitRepository,
};
use fogon_core::ledger::{ensure_funds, ensure_open};
use fogon_core::validation::validate_positive_quantity;
use fogon_core::{
    CashRegister, CashTransaction, ExpenseRequest, InventoryValuation, Lot, Money, NewProduct,
    NewUnit, Product, Production, ProductionDetail, ProductionRequest, ProductionResult, Purchase,
    PurchaseDetail, PurchaseRequest, PurchaseResult, Quantity, RecipeLine, RegisterSummary, Sale,
    SaleDetail, SaleLine, SaleResult, StockAudit, TransactionKind, UnitOfMeasure,
};

pub use fifo::FifoConsumer;
pub use production::ProductionProcessor;
pub use purchase::PurchaseProcessor;
pub use sale::SaleProcessor;

/// Serialized access to the costing and cash ledger.
///
/// Cheap to clone; clones share the pool and the write gate.
#[derive(Debug, Clone)]
pub struct LedgerEngine {
    db: Database,
    write_gate: Arc<Mutex<()>>,
}

impl LedgerEngine {
    pub fn new(db: Database) -> Self {
        LedgerEngine {
            db,
            write_gate: Arc::new(Mutex::new(())),
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    pub async fn create_unit(&self, new: &NewUnit) -> DbResult<UnitOfMeasure> {
        let _gate = self.write_gate.lock().await;
        let mut tx = self.db.pool().begin().await?;

        let unit = UnitRepository::new(&mut *tx)
            .insert(new)
            .await
            .inspect_err(|e| log_rejection("create_unit", e))?;

        tx.commit().await?;
        info!(unit_id = %unit.id, name = %unit.name, "Unit of measure created");
        Ok(unit)
    }

    pub async fn list_units(&self) -> DbResult<Vec<UnitOfMeasure>> {
        let mut conn = self.db.pool().acquire().await?;
        UnitRepository::new(&mut conn).list().await
    }

    pub async fn create_product(&self, new: &NewProduct) -> DbResult<Product> {
        let _gate = self.write_gate.lock().await;
        let mut tx = self.db.pool().begin().await?;

        let product = ProductRepository::new(&mut *tx)
            .insert(new)
            .await
            .inspect_err(|e| log_rejection("create_product", e))?;

        tx.commit().await?;
        info!(product_id = %product.id, name = %product.name, "Product created");
        Ok(product)
    }

    pub async fn get_product(&self, product_id: &str) -> DbResult<Product> {
        let mut conn = self.db.pool().acquire().await?;
        ProductRepository::new(&mut conn).require(product_id).await
    }

    /// Products by name; `Some(true)` for dishes only, `Some(false)` for
    /// ingredients only.
    pub async fn list_products(&self, dishes: Option<bool>) -> DbResult<Vec<Product>> {
        let mut conn = self.db.pool().acquire().await?;
        ProductRepository::new(&mut conn).list(dishes).await
    }

    /// Sets the quantity of an ingredient in one portion of a dish.
    pub async fn set_recipe_line(
        &self,
        dish_id: &str,
        ingredient_id: &str,
        quantity_required: Quantity,
    ) -> DbResult<RecipeLine> {
        let _gate = self.write_gate.lock().await;
        let mut tx = self.db.pool().begin().await?;

        let line = async {
            validate_positive_quantity("quantity_required", quantity_required)?;
            let mut products = ProductRepository::new(&mut *tx);
            products.require(dish_id).await?.ensure_dish()?;
            products.require(ingredient_id).await?.ensure_ingredient()?;
            products
                .set_recipe_line(dish_id, ingredient_id, quantity_required)
                .await
        }
        .await
        .inspect_err(|e| log_rejection("set_recipe_line", e))?;

        tx.commit().await?;
        info!(dish_id, ingredient_id, quantity = %quantity_required, "Recipe line set");
        Ok(line)
    }

    pub async fn recipe_for(&self, dish_id: &str) -> DbResult<Vec<RecipeLine>> {
        let mut conn = self.db.pool().acquire().await?;
        ProductRepository::new(&mut conn).recipe_for(dish_id).await
    }

    // =========================================================================
    // Registers
    // =========================================================================

    pub async fn open_register(
        &self,
        business_date: NaiveDate,
        start_amount: Money,
    ) -> DbResult<CashRegister> {
        let _gate = self.write_gate.lock().await;
        let mut tx = self.db.pool().begin().await?;

        let register = CashLedger::new(&mut *tx)
            .open_register(business_date, start_amount)
            .await
            .inspect_err(|e| log_rejection("open_register", e))?;

        tx.commit().await?;
        info!(register_id = %register.id, %business_date, start = %start_amount, "Register opened");
        Ok(register)
    }

    pub async fn close_register(&self, register_id: &str, counted: Money) -> DbResult<CashRegister> {
        let _gate = self.write_gate.lock().await;
        let mut tx = self.db.pool().begin().await?;

        let register = CashLedger::new(&mut *tx)
            .close_register(register_id, counted)
            .await
            .inspect_err(|e| log_rejection("close_register", e))?;

        tx.commit().await?;
        info!(
            register_id,
            system = ?register.end_amount_system,
            counted = %counted,
            difference = ?register.difference,
            "Register closed"
        );
        Ok(register)
    }

    pub async fn live_balance(&self, register_id: &str) -> DbResult<Money> {
        let mut conn = self.db.pool().acquire().await?;
        CashLedger::new(&mut conn).live_balance(register_id).await
    }

    pub async fn current_open_register(&self) -> DbResult<Option<CashRegister>> {
        let mut conn = self.db.pool().acquire().await?;
        CashLedger::new(&mut conn).current_open_register().await
    }

    pub async fn get_register(&self, register_id: &str) -> DbResult<CashRegister> {
        let mut conn = self.db.pool().acquire().await?;
        CashLedger::new(&mut conn).require(register_id).await
    }

    /// Most recent registers first.
    pub async fn list_registers(&self, limit: i64) -> DbResult<Vec<CashRegister>> {
        let mut conn = self.db.pool().acquire().await?;
        CashLedger::new(&mut conn).list_registers(limit).await
    }

    pub async fn list_transactions(&self, register_id: &str) -> DbResult<Vec<CashTransaction>> {
        let mut conn = self.db.pool().acquire().await?;
        CashLedger::new(&mut conn).list_transactions(register_id).await
    }

    /// Pays a service, salary or other expense out of the register.
    pub async fn record_expense(&self, request: &ExpenseRequest) -> DbResult<CashTransaction> {
        let _gate = self.write_gate.lock().await;
        let mut tx = self.db.pool().begin().await?;

        let expense = async {
            request.validate()?;
            let mut ledger = CashLedger::new(&mut *tx);
            let register = ledger.require(&request.register_id).await?;
            ensure_open(&register)?;

            let balance = ledger.live_balance(&register.id).await?;
            ensure_funds(&register.id, balance, request.amount)?;

            ledger
                .record_transaction(
                    &register.id,
                    TransactionKind::Expense,
                    request.category,
                    request.amount,
                    request.description.trim(),
                )
                .await
        }
        .await
        .inspect_err(|e| log_rejection("record_expense", e))?;

        tx.commit().await?;
        info!(
            transaction_id = %expense.id,
            register_id = %expense.cash_register_id,
            category = %expense.category,
            amount = %expense.amount,
            "Expense recorded"
        );
        Ok(expense)
    }

    // =========================================================================
    // Costing Operations
    // =========================================================================

    pub async fn record_purchase(&self, request: &PurchaseRequest) -> DbResult<PurchaseResult> {
        let _gate = self.write_gate.lock().await;
        let mut tx = self.db.pool().begin().await?;

        let result = PurchaseProcessor::new(&mut *tx)
            .process(request)
            .await
            .inspect_err(|e| log_rejection("record_purchase", e))?;

        tx.commit().await?;
        info!(
            purchase_id = %result.purchase.id,
            register_id = %result.purchase.cash_register_id,
            total = %result.purchase.total_cost,
            lines = result.items.len(),
            balance = %result.balance_after,
            "Purchase recorded"
        );
        Ok(result)
    }

    pub async fn record_production(&self, request: &ProductionRequest) -> DbResult<ProductionResult> {
        let _gate = self.write_gate.lock().await;
        let mut tx = self.db.pool().begin().await?;

        let result = ProductionProcessor::new(&mut *tx)
            .process(request)
            .await
            .inspect_err(|e| log_rejection("record_production", e))?;

        tx.commit().await?;
        log_production(&result);
        Ok(result)
    }

    /// Cooks `quantity` portions of a dish from its stored recipe.
    pub async fn record_production_from_recipe(
        &self,
        dish_id: &str,
        quantity: Quantity,
    ) -> DbResult<ProductionResult> {
        let _gate = self.write_gate.lock().await;
        let mut tx = self.db.pool().begin().await?;

        let result = async {
            let mut processor = ProductionProcessor::new(&mut *tx);
            let request = processor.request_from_recipe(dish_id, quantity).await?;
            processor.process(&request).await
        }
        .await
        .inspect_err(|e| log_rejection("record_production_from_recipe", e))?;

        tx.commit().await?;
        log_production(&result);
        Ok(result)
    }

    /// Sells dishes against the currently open register.
    pub async fn record_sale(&self, lines: &[SaleLine]) -> DbResult<SaleResult> {
        let _gate = self.write_gate.lock().await;
        let mut tx = self.db.pool().begin().await?;

        let result = SaleProcessor::new(&mut *tx)
            .process(lines)
            .await
            .inspect_err(|e| log_rejection("record_sale", e))?;

        tx.commit().await?;
        info!(
            sale_id = %result.sale.id,
            register_id = %result.sale.cash_register_id,
            total = %result.sale.total_amount,
            cost_of_goods = %result.cost_of_goods(),
            "Sale recorded"
        );
        Ok(result)
    }

    // =========================================================================
    // History
    // =========================================================================

    pub async fn list_purchases(&self, register_id: &str) -> DbResult<Vec<Purchase>> {
        let mut conn = self.db.pool().acquire().await?;
        PurchaseRepository::new(&mut conn).list_for_register(register_id).await
    }

    pub async fn get_purchase(&self, purchase_id: &str) -> DbResult<PurchaseDetail> {
        let mut conn = self.db.pool().acquire().await?;
        let mut repo = PurchaseRepository::new(&mut conn);
        let purchase = repo
            .get_by_id(purchase_id)
            .await?
            .ok_or_else(|| DbError::not_found("Purchase", purchase_id))?;
        let items = repo.get_items(&purchase.id).await?;
        Ok(PurchaseDetail { purchase, items })
    }

    /// Production runs of a dish, newest first.
    pub async fn list_productions(&self, dish_id: &str) -> DbResult<Vec<Production>> {
        let mut conn = self.db.pool().acquire().await?;
        ProductionRepository::new(&mut conn).list_for_dish(dish_id).await
    }

    pub async fn get_production(&self, production_id: &str) -> DbResult<ProductionDetail> {
        let mut conn = self.db.pool().acquire().await?;
        let mut repo = ProductionRepository::new(&mut conn);
        let production = repo
            .get_by_id(production_id)
            .await?
            .ok_or_else(|| DbError::not_found("Production", production_id))?;
        let ingredients = repo.get_ingredients(&production.id).await?;
        Ok(ProductionDetail {
            production,
            ingredients,
        })
    }

    pub async fn list_sales(&self, register_id: &str) -> DbResult<Vec<Sale>> {
        let mut conn = self.db.pool().acquire().await?;
        SaleRepository::new(&mut conn).list_for_register(register_id).await
    }

    pub async fn get_sale(&self, sale_id: &str) -> DbResult<SaleDetail> {
        let mut conn = self.db.pool().acquire().await?;
        let mut repo = SaleRepository::new(&mut conn);
        let sale = repo
            .get_by_id(sale_id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", sale_id))?;
        let items = repo.get_items(&sale.id).await?;
        Ok(SaleDetail { sale, items })
    }

    // =========================================================================
    // Stock & Reports
    // =========================================================================

    pub async fn current_stock(&self, product_id: &str) -> DbResult<Quantity> {
        let mut conn = self.db.pool().acquire().await?;
        StockAggregator::new(&mut conn).cached_stock(product_id).await
    }

    /// Every lot of a product, exhausted ones included, oldest first.
    pub async fn lots_for(&self, product_id: &str) -> DbResult<Vec<Lot>> {
        let mut conn = self.db.pool().acquire().await?;
        LotStore::new(&mut conn).list_lots(product_id).await
    }

    pub async fn verify_stock(&self, product_id: &str) -> DbResult<StockAudit> {
        let mut conn = self.db.pool().acquire().await?;
        let audit = report::verify_stock(&mut conn, product_id).await?;
        if !audit.in_sync() {
            warn!(
                product_id,
                cached = %audit.cached,
                computed = %audit.computed,
                "Cached stock out of sync with lots"
            );
        }
        Ok(audit)
    }

    pub async fn inventory_valuation(&self) -> DbResult<InventoryValuation> {
        let mut conn = self.db.pool().acquire().await?;
        report::inventory_valuation(&mut conn).await
    }

    pub async fn register_summary(&self, register_id: &str) -> DbResult<RegisterSummary> {
        let mut conn = self.db.pool().acquire().await?;
        report::register_summary(&mut conn, register_id).await
    }
}

fn log_production(result: &ProductionResult) {
    info!(
        production_id = %result.production.id,
        dish_id = %result.production.dish_id,
        quantity = %result.production.quantity_produced,
        total_cost = %result.production.total_cost,
        unit_cost = %result.production.unit_cost_real,
        "Production recorded"
    );
}

/// Guard rejections are expected traffic; anything else is a fault.
fn log_rejection(operation: &str, err: &DbError) {
    match err {
        DbError::Domain(domain) => {
            warn!(operation, code = ?domain.code(), error = %domain, "Operation rejected")
        }
        other => error!(operation, error = %other, "Operation failed"),
    }
}
