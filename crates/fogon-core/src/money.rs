//! # Money & Quantity
//!
//! Fixed-point types for every amount and every stock figure in Fogon.
//!
//! ## Why Fixed Point?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  0.1 kg + 0.2 kg = 0.30000000000000004 kg  ❌                           │
//! │                                                                         │
//! │  OUR SOLUTION: integers on a fixed grid                                 │
//! │    Money    → cents               (2 fractional digits)                 │
//! │    Quantity → ten-thousandths     (4 fractional digits)                 │
//! │                                                                         │
//! │  Anything that leaves the grid (unit cost = total / kg, line cost =     │
//! │  kg × unit cost) is computed in i128 and rounded ONCE, half away        │
//! │  from zero.                                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use fogon_core::money::{Money, Quantity};
//!
//! let paid: Money = "37.50".parse().unwrap();
//! let rice = Quantity::from_units(25); // 25 kg
//!
//! // What one kilo cost us
//! let unit_cost = paid.per_quantity(rice);
//! assert_eq!(unit_cost.cents(), 150);
//!
//! // What 2.5 kg of it is worth
//! let used: Quantity = "2.5".parse().unwrap();
//! assert_eq!(unit_cost.for_quantity(used).cents(), 375);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;

/// Cents in one currency unit.
pub const CENTS_PER_UNIT: i64 = 100;

/// Raw steps in one base unit of quantity (kg, litre or piece).
pub const QUANTITY_SCALE: i64 = 10_000;

// =============================================================================
// Money
// =============================================================================

/// A monetary value in cents.
///
/// Signed so that cash differences at close-out (short or over) can be
/// represented; amounts flowing through transactions are never negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from whole currency units.
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Money(units * CENTS_PER_UNIT)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Sum that reports overflow instead of wrapping.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Money> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Price of `quantity` base units when one base unit costs `self`.
    ///
    /// ## Example
    /// ```rust
    /// use fogon_core::money::{Money, Quantity};
    ///
    /// let per_plate = Money::from_cents(2500);
    /// assert_eq!(per_plate.for_quantity(Quantity::from_units(3)).cents(), 7500);
    /// ```
    pub fn for_quantity(&self, quantity: Quantity) -> Money {
        let scaled = self.0 as i128 * quantity.raw() as i128;
        Money(saturate(div_round(scaled, QUANTITY_SCALE as i128)))
    }

    /// Cost of one base unit when `quantity` base units cost `self`.
    ///
    /// A zero quantity yields a zero unit cost instead of dividing by zero;
    /// a purchase of "0 kg for 10.00" records a lot with no cost basis.
    pub fn per_quantity(&self, quantity: Quantity) -> Money {
        if quantity.is_zero() {
            return Money::zero();
        }
        let scaled = self.0 as i128 * QUANTITY_SCALE as i128;
        Money(saturate(div_round(scaled, quantity.raw() as i128)))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        f.pad(&format!(
            "{}{}.{:02}",
            sign,
            abs / CENTS_PER_UNIT as u64,
            abs % CENTS_PER_UNIT as u64
        ))
    }
}

impl FromStr for Money {
    type Err = ValidationError;

    /// Parses a decimal string with at most two fractional digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_fixed(s, 2, "amount").map(Money)
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Quantity
// =============================================================================

/// An amount of stock in ten-thousandths of the product's base unit.
///
/// Also used for dimensionless factors (unit conversion factors, recipe
/// quantities per dish) so that `Quantity::convert` covers both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[ts(export)]
pub struct Quantity(i64);

impl Quantity {
    /// Creates a quantity from its raw ten-thousandths representation.
    #[inline]
    pub const fn from_raw(raw: i64) -> Self {
        Quantity(raw)
    }

    /// Creates a quantity of whole base units.
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Quantity(units * QUANTITY_SCALE)
    }

    #[inline]
    pub const fn raw(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Quantity(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies by a factor on the same grid.
    ///
    /// ## Example
    /// ```rust
    /// use fogon_core::money::Quantity;
    ///
    /// // 2 "arrobas" of 11.5 kg each
    /// let bought = Quantity::from_units(2);
    /// let factor: Quantity = "11.5".parse().unwrap();
    /// assert_eq!(bought.convert(factor), Quantity::from_units(23));
    /// ```
    pub fn convert(&self, factor: Quantity) -> Quantity {
        let scaled = self.0 as i128 * factor.0 as i128;
        Quantity(saturate(div_round(scaled, QUANTITY_SCALE as i128)))
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        f.pad(&format!(
            "{}{}.{:04}",
            sign,
            abs / QUANTITY_SCALE as u64,
            abs % QUANTITY_SCALE as u64
        ))
    }
}

impl FromStr for Quantity {
    type Err = ValidationError;

    /// Parses a decimal string with at most four fractional digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_fixed(s, 4, "quantity").map(Quantity)
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Quantity::zero()
    }
}

impl Add for Quantity {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Quantity(self.0 + other.0)
    }
}

impl AddAssign for Quantity {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Quantity {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Quantity(self.0 - other.0)
    }
}

impl SubAssign for Quantity {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Sum for Quantity {
    fn sum<I: Iterator<Item = Quantity>>(iter: I) -> Self {
        iter.fold(Quantity::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Quantity> for Quantity {
    fn sum<I: Iterator<Item = &'a Quantity>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Cost Accumulator
// =============================================================================

/// Sums `quantity × unit_cost` products without intermediate rounding.
///
/// FIFO consumption can touch several lots; rounding each slice to cents
/// and then adding would drift by up to half a cent per lot.
///
/// ```rust
/// use fogon_core::money::{CostAccumulator, Money, Quantity};
///
/// let mut cost = CostAccumulator::new();
/// cost.add(Money::from_cents(333), "0.5".parse().unwrap()); // 1.665
/// cost.add(Money::from_cents(333), "0.5".parse().unwrap()); // 1.665
/// assert_eq!(cost.total().cents(), 333);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CostAccumulator {
    /// Cents × ten-thousandths.
    scaled: i128,
}

impl CostAccumulator {
    pub const fn new() -> Self {
        CostAccumulator { scaled: 0 }
    }

    pub fn add(&mut self, unit_cost: Money, quantity: Quantity) {
        self.scaled += unit_cost.cents() as i128 * quantity.raw() as i128;
    }

    /// The accumulated cost rounded to cents.
    pub fn total(&self) -> Money {
        Money::from_cents(saturate(div_round(self.scaled, QUANTITY_SCALE as i128)))
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Integer division rounding half away from zero.
fn div_round(numerator: i128, denominator: i128) -> i128 {
    let negative = (numerator < 0) != (denominator < 0);
    let (n, d) = (numerator.abs(), denominator.abs());
    let quotient = (n + d / 2) / d;
    if negative {
        -quotient
    } else {
        quotient
    }
}

fn saturate(value: i128) -> i64 {
    i64::try_from(value).unwrap_or(if value < 0 { i64::MIN } else { i64::MAX })
}

/// Parses `[-+]digits[.digits]` onto a grid with `decimals` fractional digits.
fn parse_fixed(input: &str, decimals: u32, field: &str) -> Result<i64, ValidationError> {
    let invalid = |reason: String| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason,
    };

    let trimmed = input.trim();
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    let (whole, frac) = digits.split_once('.').unwrap_or((digits, ""));
    if whole.is_empty() && frac.is_empty() {
        return Err(invalid(format!("'{}' is not a decimal number", input)));
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid(format!("'{}' is not a decimal number", input)));
    }
    if frac.len() > decimals as usize {
        return Err(invalid(format!("at most {} decimal places allowed", decimals)));
    }

    let too_large = || invalid(format!("'{}' is too large", input));
    let whole_value: i64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| too_large())?
    };
    let frac_value: i64 = if frac.is_empty() {
        0
    } else {
        let padding = 10i64.pow(decimals - frac.len() as u32);
        frac.parse::<i64>().map_err(|_| too_large())? * padding
    };

    let value = whole_value
        .checked_mul(10i64.pow(decimals))
        .and_then(|v| v.checked_add(frac_value))
        .ok_or_else(too_large)?;

    Ok(if negative { -value } else { value })
}

// =============================================================================
// Unit Tests
// =============================================================================
