//! Deterministic exchange-rate conversion.
//!
//! Rates are configuration, quoted against EUR. A bilateral rate is derived as
//! `rate(to) / rate(from)`; results are rounded half away from zero to
//! [`AMOUNT_SCALE`] places.

use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::money::{AMOUNT_SCALE, Currency};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    #[error("Unsupported currency pair: {from} -> {to}")]
    UnsupportedCurrencyPair { from: Currency, to: Currency },
}

#[derive(Debug, Clone)]
pub struct CurrencyConverter {
    /// Units of currency per 1 EUR
    rates: BTreeMap<Currency, Decimal>,
}

impl Default for CurrencyConverter {
    fn default() -> Self {
        Self::new(Self::default_rates())
    }
}

impl CurrencyConverter {
    pub fn new(rates: BTreeMap<Currency, Decimal>) -> Self {
        // A zero or negative rate would make every derived rate meaningless
        let rates = rates
            .into_iter()
            .filter(|(_, rate)| rate.is_sign_positive() && !rate.is_zero())
            .collect();
        Self { rates }
    }

    pub fn default_rates() -> BTreeMap<Currency, Decimal> {
        BTreeMap::from([
            (Currency::Eur, Decimal::ONE),
            (Currency::Usd, Decimal::new(109, 2)),
            (Currency::Gbp, Decimal::new(86, 2)),
        ])
    }

    /// Currencies present in the rate table
    pub fn supported(&self) -> Vec<Currency> {
        self.rates.keys().copied().collect()
    }

    pub fn is_supported(&self, currency: Currency) -> bool {
        self.rates.contains_key(&currency)
    }

    /// Bilateral rate: how many `to` units one `from` unit buys.
    pub fn rate(&self, from: Currency, to: Currency) -> Result<Decimal, ConversionError> {
        let unsupported = || ConversionError::UnsupportedCurrencyPair { from, to };
        let from_rate = self.rates.get(&from).ok_or_else(unsupported)?;
        let to_rate = self.rates.get(&to).ok_or_else(unsupported)?;
        to_rate.checked_div(*from_rate).ok_or_else(unsupported)
    }

    pub fn convert(
        &self,
        amount: Decimal,
        from: Currency,
        to: Currency,
    ) -> Result<Decimal, ConversionError> {
        if from == to {
            return Ok(amount);
        }
        let rate = self.rate(from, to)?;
        let converted = amount
            .checked_mul(rate)
            .ok_or(ConversionError::UnsupportedCurrencyPair { from, to })?;
        Ok(converted.round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::MidpointAwayFromZero))
    }
}
