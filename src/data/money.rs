//! Fixed-point cash amounts.
//!
//! `Money` pairs a `Decimal` with a currency tag. Arithmetic is checked:
//! mixing currencies, overflowing, or multiplying into more fractional digits
//! than `Decimal` can hold is an error instead of a silent rounding.

use std::fmt;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::EngineError;

/// Largest scale `Decimal` represents exactly.
const MAX_SCALE: u32 = 28;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Usd,
    Eur,
    Gbp,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Usd => "USD",
            Self::Eur => "EUR",
            Self::Gbp => "GBP",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    #[error("currency mismatch: {0} vs {1}")]
    CurrencyMismatch(&'static str, &'static str),

    #[error("arithmetic overflow")]
    Overflow,

    #[error("operation would lose precision")]
    PrecisionLoss,

    #[error("division by zero")]
    DivisionByZero,

    #[error("amount is not a finite number")]
    NotFinite,
}

impl From<MoneyError> for EngineError {
    fn from(e: MoneyError) -> Self {
        EngineError::InvalidData(format!("money: {e}"))
    }
}

/// A cash amount in a single currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    pub amount: Decimal,
    #[serde(default)]
    pub currency: Currency,
}

impl Money {
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Self { amount, currency }
    }

    pub fn usd(amount: Decimal) -> Self {
        Self::new(amount, Currency::Usd)
    }

    pub fn zero(currency: Currency) -> Self {
        Self::new(Decimal::ZERO, currency)
    }

    /// Convert a float, rejecting NaN and infinities.
    pub fn from_f64(value: f64, currency: Currency) -> Result<Self, MoneyError> {
        if !value.is_finite() {
            return Err(MoneyError::NotFinite);
        }
        let amount = Decimal::try_from(value).map_err(|_| MoneyError::Overflow)?;
        Ok(Self::new(amount, currency))
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    pub fn to_f64(&self) -> f64 {
        self.amount.to_f64().unwrap_or(0.0)
    }

    fn same_currency(&self, other: &Money) -> Result<(), MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch(
                self.currency.as_str(),
                other.currency.as_str(),
            ));
        }
        Ok(())
    }

    pub fn checked_add(&self, other: &Money) -> Result<Money, MoneyError> {
        self.same_currency(other)?;
        let amount = self
            .amount
            .checked_add(other.amount)
            .ok_or(MoneyError::Overflow)?;
        Ok(Money::new(amount, self.currency))
    }

    pub fn checked_sub(&self, other: &Money) -> Result<Money, MoneyError> {
        self.same_currency(other)?;
        let amount = self
            .amount
            .checked_sub(other.amount)
            .ok_or(MoneyError::Overflow)?;
        Ok(Money::new(amount, self.currency))
    }

    /// Multiply by a decimal factor. Fails if the exact product needs more
    /// fractional digits than `Decimal` can hold.
    pub fn checked_mul(&self, factor: Decimal) -> Result<Money, MoneyError> {
        let lhs = self.amount.normalize();
        let rhs = factor.normalize();
        if lhs.scale() + rhs.scale() > MAX_SCALE {
            return Err(MoneyError::PrecisionLoss);
        }
        let amount = lhs.checked_mul(rhs).ok_or(MoneyError::Overflow)?;
        // A product too wide for the 96-bit mantissa comes back rescaled and rounded.
        if amount.scale() != lhs.scale() + rhs.scale() {
            return Err(MoneyError::PrecisionLoss);
        }
        Ok(Money::new(amount, self.currency))
    }

    pub fn checked_mul_int(&self, factor: i64) -> Result<Money, MoneyError> {
        self.checked_mul(Decimal::from(factor))
    }

    /// `self / other` as a plain ratio.
    pub fn checked_ratio(&self, other: &Money) -> Result<f64, MoneyError> {
        self.same_currency(other)?;
        if other.amount.is_zero() {
            return Err(MoneyError::DivisionByZero);
        }
        let ratio = self
            .amount
            .checked_div(other.amount)
            .ok_or(MoneyError::Overflow)?;
        ratio.to_f64().ok_or(MoneyError::Overflow)
    }

    pub fn abs(&self) -> Money {
        Money::new(self.amount.abs(), self.currency)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:.2}", self.currency.as_str(), self.amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_checked_arithmetic() {
        let a = Money::usd(dec!(2.50));
        let b = Money::usd(dec!(1.25));
        assert_eq!(a.checked_add(&b).unwrap(), Money::usd(dec!(3.75)));
        assert_eq!(a.checked_sub(&b).unwrap(), Money::usd(dec!(1.25)));
        assert_eq!(a.checked_mul_int(100).unwrap(), Money::usd(dec!(250)));
        assert_eq!(a.checked_ratio(&b).unwrap(), 2.0);
    }

    #[test]
    fn test_currency_mismatch_rejected() {
        let usd = Money::usd(dec!(10));
        let eur = Money::new(dec!(10), Currency::Eur);
        assert_eq!(
            usd.checked_add(&eur),
            Err(MoneyError::CurrencyMismatch("USD", "EUR"))
        );
        assert!(usd.checked_sub(&eur).is_err());
        assert!(usd.checked_ratio(&eur).is_err());
        assert_eq!(
            serde_json::to_string(&Currency::Gbp).unwrap(),
            "\"GBP\""
        );
    }

    #[test]
    fn test_division_by_zero_rejected() {
        let a = Money::usd(dec!(1));
        assert_eq!(
            a.checked_ratio(&Money::zero(Currency::Usd)),
            Err(MoneyError::DivisionByZero)
        );
    }

    #[test]
    fn test_precision_loss_rejected() {
        let tiny = Money::usd(Decimal::new(1, 20));
        assert_eq!(
            tiny.checked_mul(Decimal::new(1, 10)),
            Err(MoneyError::PrecisionLoss)
        );
        // Trailing zeros do not count against the scale budget.
        let padded = Money::usd(dec!(1.500000000000000000000));
        assert!(padded.checked_mul(dec!(1.5)).is_ok());

        // Scales fit (13 + 15) but the exact product needs more mantissa
        // than Decimal has; the last digit would be rounded away.
        let wide = Money::usd(dec!(9.9999999999999));
        assert_eq!(
            wide.checked_mul(dec!(9.999999999999999)),
            Err(MoneyError::PrecisionLoss)
        );
    }

    #[test]
    fn test_overflow_rejected() {
        let huge = Money::usd(Decimal::MAX);
        assert_eq!(huge.checked_add(&huge), Err(MoneyError::Overflow));
    }

    #[test]
    fn test_from_f64_rejects_non_finite() {
        assert_eq!(
            Money::from_f64(f64::NAN, Currency::Usd),
            Err(MoneyError::NotFinite)
        );
        assert_eq!(
            Money::from_f64(100.5, Currency::Usd).unwrap(),
            Money::usd(dec!(100.5))
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::usd(dec!(182.5)).to_string(), "USD 182.50");
    }
}
