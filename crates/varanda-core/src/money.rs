//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Where Money Comes From
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  catalog prices, payments, expenses ── stored as INTEGER centavos       │
//! │  register running totals           ── Σ of centavos, never drifts       │
//! │  print-queue JSON (preco: 25.9)    ── from_reais_f64, half away from 0  │
//! │  fractional stock (0,35 kg × cost) ── multiply_fractional, rounded once │
//! │                                                                         │
//! │  Display: "R$ 1234,56" (comma decimals, no thousands separator)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use varanda_core::money::Money;
//!
//! let price = Money::from_cents(1099); // R$ 10,99
//! let doubled = price * 2;             // R$ 21,98
//! assert_eq!(doubled.to_string(), "R$ 21,98");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use ts_rs::TS;

use crate::types::TaxRate;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in centavos (BRL).
///
/// Signed: cash differences and reversed expense totals go negative.
/// Serialized as plain cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from centavos.
    ///
    /// ## Example
    /// ```rust
    /// use varanda_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from reais and centavos.
    ///
    /// ## Example
    /// ```rust
    /// use varanda_core::money::Money;
    ///
    /// assert_eq!(Money::from_major_minor(10, 99).cents(), 1099);
    /// assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    /// ```
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Converts a decimal reais amount coming from an external payload.
    ///
    /// Only used at boundaries that carry floats (print-queue JSON); the
    /// value is rounded half away from zero to the nearest centavo.
    ///
    /// ## Example
    /// ```rust
    /// use varanda_core::money::Money;
    ///
    /// assert_eq!(Money::from_reais_f64(12.5).cents(), 1250);
    /// assert_eq!(Money::from_reais_f64(0.1 + 0.2).cents(), 30);
    /// ```
    pub fn from_reais_f64(reais: f64) -> Self {
        if !reais.is_finite() {
            return Money::zero();
        }
        Money((reais * 100.0).round() as i64)
    }

    /// Returns the value in centavos.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the reais portion.
    #[inline]
    pub const fn reais(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the centavos portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Clamps negative values to zero.
    ///
    /// ## Example
    /// ```rust
    /// use varanda_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(-10).non_negative(), Money::zero());
    /// assert_eq!(Money::from_cents(10).non_negative().cents(), 10);
    /// ```
    #[inline]
    pub const fn non_negative(&self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            Money(self.0)
        }
    }

    /// Calculates a percentage surcharge (service tax) with half-up rounding.
    ///
    /// ## Implementation
    /// Integer math: `(amount * bps + 5000) / 10000`
    ///
    /// ## Example
    /// ```rust
    /// use varanda_core::money::Money;
    /// use varanda_core::types::TaxRate;
    ///
    /// let subtotal = Money::from_cents(2550); // R$ 25,50
    /// let service = TaxRate::from_bps(1000);  // 10%
    /// assert_eq!(subtotal.calculate_tax(service).cents(), 255);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        // i128 keeps large register totals from overflowing
        let tax_cents = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_cents(tax_cents as i64)
    }

    /// Multiplies money by an integer quantity.
    ///
    /// ## Example
    /// ```rust
    /// use varanda_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(1000);
    /// assert_eq!(unit_price.multiply_quantity(2).cents(), 2000);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Multiplies a unit cost by a fractional stock quantity (e.g. 0.25 kg).
    ///
    /// ## Example
    /// ```rust
    /// use varanda_core::money::Money;
    ///
    /// let per_kg = Money::from_cents(3990); // R$ 39,90 / kg
    /// assert_eq!(per_kg.multiply_fractional(0.25).cents(), 998);
    /// ```
    pub fn multiply_fractional(&self, qty: f64) -> Self {
        Money((self.0 as f64 * qty).round() as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display in Brazilian format: `R$ 1234,56`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}R$ {},{:02}",
            sign,
            self.reais().abs(),
            self.cents_part()
        )
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

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.reais(), 10);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "R$ 10,99");
        assert_eq!(Money::from_cents(500).to_string(), "R$ 5,00");
        assert_eq!(Money::from_cents(-550).to_string(), "-R$ 5,50");
        assert_eq!(Money::from_cents(0).to_string(), "R$ 0,00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);
        assert_eq!((-a).cents(), -1000);
    }

    #[test]
    fn test_sum() {
        let items = [Money::from_cents(2000), Money::from_cents(500)];
        let total: Money = items.iter().sum();
        assert_eq!(total.cents(), 2500);
    }

    #[test]
    fn test_service_tax() {
        let amount = Money::from_cents(1000);
        assert_eq!(amount.calculate_tax(TaxRate::from_bps(1000)).cents(), 100);
        // R$ 10,00 at 8.25% = 0.825 → 83 centavos (half-up)
        assert_eq!(amount.calculate_tax(TaxRate::from_bps(825)).cents(), 83);
    }

    #[test]
    fn test_from_reais_f64_rounds() {
        assert_eq!(Money::from_reais_f64(10.0).cents(), 1000);
        assert_eq!(Money::from_reais_f64(2.675).cents(), 268);
        assert_eq!(Money::from_reais_f64(f64::NAN).cents(), 0);
    }

    #[test]
    fn test_non_negative() {
        assert!(Money::from_cents(-1).non_negative().is_zero());
        assert!(Money::from_cents(1).non_negative().is_positive());
    }
}
