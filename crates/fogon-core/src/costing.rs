//! # FIFO Costing
//!
//! Pure planning half of lot consumption: given a product's live lots in
//! entry order and a quantity, decide how much to take from each lot and
//! what it costs. The db crate applies the plan inside a transaction.
//!
//! ## Walk
//! ```text
//!   lots (oldest first)     need 6
//!   ┌──────────────┐
//!   │ #1  5 @ 2.00 │  take 5   → need 1   cost 10.00
//!   ├──────────────┤
//!   │ #2  3 @ 4.00 │  take 1   → need 0   cost  4.00
//!   ├──────────────┤
//!   │ #3  8 @ 5.00 │  untouched
//!   └──────────────┘
//!   consumed 6, cost 14.00, unfilled 0
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::{CostAccumulator, Money, Quantity};
use crate::types::Lot;

/// Quantity taken from one lot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Depletion {
    pub lot_id: String,
    pub amount: Quantity,
    pub unit_cost: Money,
}

/// Outcome of walking a product's lots.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FifoPlan {
    pub depletions: Vec<Depletion>,
    pub consumed: Quantity,
    pub consumed_cost: Money,
    /// Requested quantity the lots could not cover.
    pub unfilled: Quantity,
}

impl FifoPlan {
    /// Every requested unit is covered by a lot.
    pub fn is_complete(&self) -> bool {
        self.unfilled.is_zero()
    }
}

/// Plans consumption of `requested` from `lots`, oldest first.
///
/// Lots must already be in entry order; exhausted lots are skipped. The
/// cost is summed exactly and rounded once.
pub fn plan_fifo(lots: &[Lot], requested: Quantity) -> FifoPlan {
    let mut remaining = requested;
    let mut cost = CostAccumulator::new();
    let mut depletions = Vec::new();

    for lot in lots.iter().filter(|lot| lot.is_live()) {
        if !remaining.is_positive() {
            break;
        }
        let take = remaining.min(lot.current_quantity);
        cost.add(lot.unit_cost, take);
        remaining -= take;
        depletions.push(Depletion {
            lot_id: lot.id.clone(),
            amount: take,
            unit_cost: lot.unit_cost,
        });
    }

    let unfilled = if remaining.is_positive() {
        remaining
    } else {
        Quantity::zero()
    };

    FifoPlan {
        depletions,
        consumed: requested - unfilled,
        consumed_cost: cost.total(),
        unfilled,
    }
}

/// Sum of remaining quantity over `lots`.
pub fn lot_total(lots: &[Lot]) -> Quantity {
    lots.iter().map(|lot| lot.current_quantity).sum()
}

/// Cost of one unit of output when `quantity` units cost `total`.
///
/// Zero quantity yields zero.
#[inline]
pub fn unit_cost(total: Money, quantity: Quantity) -> Money {
    total.per_quantity(quantity)
}
