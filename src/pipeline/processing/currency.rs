//! Conversion of raw prices into the common currency (EUR).
//!
//! The rate table is a static snapshot compiled into the binary. An unknown
//! currency or an unparseable price yields `None` for that record only.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::constants::COMMON_CURRENCY;

/// Multiplicative factors into the common currency, keyed by exact ISO code
static EUR_RATES: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    HashMap::from([
        (COMMON_CURRENCY, 1.0),
        ("CHF", 0.95),
        ("CZK", 0.036),
        ("HUF", 0.0028),
        ("GBP", 1.13),
        ("ALL", 0.008_065_1),
        ("ISK", 0.006),
        ("MKD", 0.016),
        ("NOK", 0.091),
        ("SEK", 0.0945),
        ("RUB", 0.012),
        ("RON", 0.206),
        ("PLN", 0.223),
        ("CNY", 0.12),
        ("MDL", 0.051),
        ("BGN", 0.511_292),
        ("USD", 0.873_956),
        ("BAM", 0.511_292),
        ("UAH", 0.031),
        ("HRK", 0.132),
        ("DKK", 0.134),
    ])
});

/// A raw price as it arrives from a source table
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PriceInput<'a> {
    Number(f64),
    Text(&'a str),
    /// Absent, or of a shape that cannot be priced
    Missing,
}

impl<'a> From<Option<&'a str>> for PriceInput<'a> {
    fn from(value: Option<&'a str>) -> Self {
        match value {
            Some(text) => PriceInput::Text(text),
            None => PriceInput::Missing,
        }
    }
}

/// Read-only view over the static conversion table
#[derive(Debug, Clone, Copy)]
pub struct ConversionTable {
    rates: &'static HashMap<&'static str, f64>,
}

impl Default for ConversionTable {
    fn default() -> Self {
        Self { rates: &EUR_RATES }
    }
}

impl ConversionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Factor for a currency code, after trimming surrounding whitespace
    pub fn factor(&self, currency: &str) -> Option<f64> {
        self.rates.get(currency.trim()).copied()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Produce the common-currency amount for a price.
    ///
    /// A non-blank `prefilled` value always wins and is returned as-is (parsed),
    /// without looking at `price` or `currency`.
    pub fn normalize(
        &self,
        price: PriceInput<'_>,
        currency: Option<&str>,
        prefilled: Option<&str>,
    ) -> Option<f64> {
        if let Some(prefilled) = prefilled.filter(|v| !v.trim().is_empty()) {
            return parse_prefilled(prefilled);
        }

        let amount = match price {
            PriceInput::Number(n) if n.is_finite() => n,
            PriceInput::Number(_) => return None,
            PriceInput::Text(text) => parse_price_text(text)?,
            PriceInput::Missing => return None,
        };

        let factor = self.factor(currency?)?;
        Some(amount * factor)
    }
}

/// Parse a price written as text, dropping thousands separators
pub fn parse_price_text(text: &str) -> Option<f64> {
    let cleaned: String = text.replace(',', "");
    parse_finite(cleaned.trim())
}

fn parse_prefilled(text: &str) -> Option<f64> {
    parse_finite(text.trim())
}

fn parse_finite(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}
