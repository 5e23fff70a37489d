//! # Register Math
//!
//! Balance, close-out and guard rules for a cash register, as pure
//! functions over rows already loaded.
//!
//! ```text
//!   balance = start_amount + Σ income - Σ expense
//!
//!   close:  end_amount_system = balance
//!           end_amount_real   = counted cash
//!           difference        = real - system    (negative = short)
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::{Money, Quantity};
use crate::operations::{CategoryTotal, RegisterSummary};
use crate::types::{CashRegister, CashTransaction, Product, TransactionKind};

/// Live balance from the opening float and every transaction so far.
pub fn live_balance<'a, I>(start_amount: Money, transactions: I) -> Money
where
    I: IntoIterator<Item = &'a CashTransaction>,
{
    start_amount
        + transactions
            .into_iter()
            .map(CashTransaction::signed_amount)
            .sum::<Money>()
}

/// Frozen figures written when a register is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CloseOut {
    pub end_amount_system: Money,
    pub end_amount_real: Money,
    pub difference: Money,
}

pub fn close_out(system_balance: Money, counted: Money) -> CloseOut {
    CloseOut {
        end_amount_system: system_balance,
        end_amount_real: counted,
        difference: counted - system_balance,
    }
}

// =============================================================================
// Guards
// =============================================================================

/// Fails if the register no longer accepts transactions.
pub fn ensure_open(register: &CashRegister) -> CoreResult<()> {
    if register.is_closed {
        return Err(CoreError::RegisterClosed {
            register_id: register.id.clone(),
        });
    }
    Ok(())
}

/// Fails if paying `requested` would take the balance below zero.
pub fn ensure_funds(register_id: &str, available: Money, requested: Money) -> CoreResult<()> {
    if requested > available {
        return Err(CoreError::InsufficientFunds {
            register_id: register_id.to_string(),
            available,
            requested,
        });
    }
    Ok(())
}

/// Fails if `available` cannot cover `requested` of `product`.
pub fn ensure_stock(product: &Product, available: Quantity, requested: Quantity) -> CoreResult<()> {
    if requested > available {
        return Err(CoreError::InsufficientStock {
            product_id: product.id.clone(),
            product: product.name.clone(),
            available,
            requested,
        });
    }
    Ok(())
}

// =============================================================================
// Summary
// =============================================================================

/// Totals for a register from its transactions.
pub fn summarize(register: CashRegister, transactions: &[CashTransaction]) -> RegisterSummary {
    let mut income = Money::zero();
    let mut expense = Money::zero();
    let mut by_category: Vec<CategoryTotal> = Vec::new();

    for tx in transactions {
        match tx.kind {
            TransactionKind::Income => income += tx.amount,
            TransactionKind::Expense => expense += tx.amount,
        }
        match by_category
            .iter_mut()
            .find(|t| t.kind == tx.kind && t.category == tx.category)
        {
            Some(total) => total.total += tx.amount,
            None => by_category.push(CategoryTotal {
                kind: tx.kind,
                category: tx.category,
                total: tx.amount,
            }),
        }
    }
    by_category.sort_by_key(|t| (t.kind == TransactionKind::Expense, t.category));

    RegisterSummary {
        balance: register.start_amount + income - expense,
        register,
        income,
        expense,
        by_category,
        transaction_count: transactions.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BaseUnit, TransactionCategory};
    use chrono::{NaiveDate, Utc};

    fn register(start: i64) -> CashRegister {
        CashRegister {
            id: "reg-1".to_string(),
            business_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            start_amount: Money::from_units(start),
            end_amount_system: None,
            end_amount_real: None,
            difference: None,
            is_closed: false,
            opened_at: Utc::now(),
            closed_at: None,
        }
    }

    fn tx(kind: TransactionKind, category: TransactionCategory, units: i64) -> CashTransaction {
        CashTransaction {
            id: format!("tx-{}-{}", category, units),
            cash_register_id: "reg-1".to_string(),
            kind,
            category,
            amount: Money::from_units(units),
            description: String::new(),
            source_key: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_live_balance() {
        let txs = vec![
            tx(TransactionKind::Income, TransactionCategory::Sales, 20),
            tx(TransactionKind::Expense, TransactionCategory::Service, 5),
        ];
        assert_eq!(live_balance(Money::from_units(50), &txs), Money::from_units(65));
        assert_eq!(
            live_balance(Money::from_units(50), std::iter::empty()),
            Money::from_units(50)
        );
    }

    #[test]
    fn test_close_out_difference() {
        let exact = close_out(Money::from_units(65), Money::from_units(65));
        assert!(exact.difference.is_zero());

        let short = close_out(Money::from_units(65), Money::from_cents(6250));
        assert_eq!(short.difference.cents(), -250);
    }

    #[test]
    fn test_guards() {
        let mut reg = register(10);
        assert!(ensure_open(&reg).is_ok());
        reg.is_closed = true;
        assert!(matches!(
            ensure_open(&reg),
            Err(CoreError::RegisterClosed { .. })
        ));

        assert!(ensure_funds("reg-1", Money::from_units(100), Money::from_units(100)).is_ok());
        let err = ensure_funds("reg-1", Money::from_units(100), Money::from_units(150)).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientFunds { available, requested, .. }
                if available == Money::from_units(100) && requested == Money::from_units(150)
        ));

        let dish = Product {
            id: "dish".to_string(),
            name: "Paella".to_string(),
            is_dish: true,
            base_unit: BaseUnit::Unit,
            current_stock: Quantity::from_units(2),
            sales_price: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(ensure_stock(&dish, dish.current_stock, Quantity::from_units(2)).is_ok());
        assert!(ensure_stock(&dish, dish.current_stock, Quantity::from_units(3)).is_err());
    }

    #[test]
    fn test_summarize_groups_by_category() {
        let txs = vec![
            tx(TransactionKind::Expense, TransactionCategory::Salary, 30),
            tx(TransactionKind::Income, TransactionCategory::Sales, 20),
            tx(TransactionKind::Income, TransactionCategory::Sales, 15),
            tx(TransactionKind::Expense, TransactionCategory::Purchase, 12),
        ];
        let summary = summarize(register(100), &txs);

        assert_eq!(summary.income, Money::from_units(35));
        assert_eq!(summary.expense, Money::from_units(42));
        assert_eq!(summary.balance, Money::from_units(93));
        assert_eq!(summary.transaction_count, 4);

        let keys: Vec<_> = summary
            .by_category
            .iter()
            .map(|t| (t.kind, t.category, t.total))
            .collect();
        assert_eq!(
            keys,
            vec![
                (TransactionKind::Income, TransactionCategory::Sales, Money::from_units(35)),
                (TransactionKind::Expense, TransactionCategory::Purchase, Money::from_units(12)),
                (TransactionKind::Expense, TransactionCategory::Salary, Money::from_units(30)),
            ]
        );
    }
}
