//! Type-safe money representation using decimal arithmetic.
//!
//! Cart amounts travel over the wire as bare decimals; the currency is implied
//! by the storefront (Bangladeshi Taka). [`Money`] pairs an amount with its
//! currency for display.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An amount with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in the currency's standard unit (taka, not poisha).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Money {
    /// Create a new amount.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// An amount in the storefront's default currency.
    #[must_use]
    pub const fn bdt(amount: Decimal) -> Self {
        Self::new(amount, CurrencyCode::BDT)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{:.2}",
            self.currency_code.symbol(),
            self.amount.round_dp(2)
        )
    }
}

/// ISO 4217 currency codes accepted by the storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    BDT,
    USD,
}

impl CurrencyCode {
    /// Display symbol for the currency.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::BDT => "৳",
            Self::USD => "$",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_uses_taka_symbol() {
        let money = Money::bdt(Decimal::new(123_450, 2));
        assert_eq!(money.to_string(), "৳1234.50");
    }

    #[test]
    fn test_display_pads_whole_amounts() {
        let money = Money::bdt(Decimal::from(500));
        assert_eq!(money.to_string(), "৳500.00");
    }

    #[test]
    fn test_default_currency_is_bdt() {
        assert_eq!(CurrencyCode::default(), CurrencyCode::BDT);
    }
}
