//! Display currencies and USD-relative conversion.
//!
//! Rates come from the runtime's rate cache; everything here is pure so the
//! report layer can receive a [`Currency`] as a plain argument.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::formatting::format_number;

/// Codes listed ahead of all others, in this order.
pub const POPULAR_CURRENCIES: &[&str] = &["USD", "EUR", "GBP", "JPY", "AUD"];

/// Code of the source currency every payout is denominated in.
pub const BASE_CURRENCY: &str = "USD";

const CURRENCY_SYMBOLS: &[(&str, &str)] = &[
    ("USD", "$"),
    ("EUR", "€"),
    ("GBP", "£"),
    ("JPY", "¥"),
    ("CNY", "¥"),
    ("KRW", "₩"),
    ("INR", "₹"),
    ("RUB", "₽"),
    ("TRY", "₺"),
    ("NGN", "₦"),
    ("ARS", "$"),
    ("BRL", "R$"),
    ("CAD", "C$"),
    ("AUD", "A$"),
    ("NZD", "NZ$"),
    ("SGD", "S$"),
    ("HKD", "HK$"),
    ("MXN", "Mex$"),
    ("PHP", "₱"),
    ("THB", "฿"),
    ("ZAR", "R"),
    ("PLN", "zł"),
    ("SEK", "kr"),
    ("NOK", "kr"),
    ("DKK", "kr"),
    ("CZK", "Kč"),
    ("HUF", "Ft"),
    ("ILS", "₪"),
    ("CHF", "Fr"),
    ("AED", "د.إ"),
    ("SAR", "﷼"),
    ("QAR", "﷼"),
    ("KWD", "د.ك"),
    ("BHD", "د.ب"),
    ("OMR", "ر.ع."),
];

const CURRENCY_NAMES: &[(&str, &str)] = &[
    ("USD", "US Dollar"),
    ("EUR", "Euro"),
    ("GBP", "British Pound"),
    ("JPY", "Japanese Yen"),
    ("CNY", "Chinese Yuan"),
    ("KRW", "South Korean Won"),
    ("INR", "Indian Rupee"),
    ("RUB", "Russian Ruble"),
    ("TRY", "Turkish Lira"),
    ("BRL", "Brazilian Real"),
    ("CAD", "Canadian Dollar"),
    ("AUD", "Australian Dollar"),
    ("NZD", "New Zealand Dollar"),
    ("SGD", "Singapore Dollar"),
    ("HKD", "Hong Kong Dollar"),
    ("MXN", "Mexican Peso"),
];

/// A display currency with its multiplier relative to USD.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Currency {
    pub code: String,
    pub name: String,
    pub symbol: String,
    /// Units of this currency per one US dollar.
    pub rate: f64,
}

impl Default for Currency {
    fn default() -> Self {
        Self::usd()
    }
}

impl Currency {
    /// Build a currency for `code`, looking up its symbol and display name.
    /// Unknown codes use the code itself for both.
    pub fn from_rate(code: &str, rate: f64) -> Self {
        Self {
            code: code.to_string(),
            name: lookup(CURRENCY_NAMES, code).unwrap_or(code).to_string(),
            symbol: lookup(CURRENCY_SYMBOLS, code).unwrap_or(code).to_string(),
            rate,
        }
    }

    /// The source currency at a 1:1 rate.
    pub fn usd() -> Self {
        Self::from_rate(BASE_CURRENCY, 1.0)
    }

    /// Convert a USD amount into this currency.
    pub fn convert(&self, amount: f64) -> f64 {
        amount * self.rate
    }

    /// Convert a USD amount and render it with this currency's symbol.
    ///
    /// ```
    /// use pay_core::currency::Currency;
    ///
    /// let eur = Currency::from_rate("EUR", 0.5);
    /// assert_eq!(eur.format_amount(2_500.0), "€1,250.00");
    /// ```
    pub fn format_amount(&self, amount: f64) -> String {
        let converted = self.convert(amount);
        if converted < 0.0 {
            format!("-{}{}", self.symbol, format_number(converted.abs(), 2))
        } else {
            format!("{}{}", self.symbol, format_number(converted, 2))
        }
    }
}

fn lookup(table: &'static [(&'static str, &'static str)], code: &str) -> Option<&'static str> {
    table.iter().find(|(c, _)| *c == code).map(|(_, v)| *v)
}

fn popular_rank(code: &str) -> Option<usize> {
    POPULAR_CURRENCIES.iter().position(|c| *c == code)
}

/// Turn a `code → rate` map into an ordered currency list.
///
/// Popular currencies come first in [`POPULAR_CURRENCIES`] order (USD
/// leading), followed by every other code alphabetically.
pub fn build_currencies(rates: &HashMap<String, f64>) -> Vec<Currency> {
    let mut currencies: Vec<Currency> = rates
        .iter()
        .map(|(code, rate)| Currency::from_rate(code, *rate))
        .collect();

    currencies.sort_by(|a, b| match (popular_rank(&a.code), popular_rank(&b.code)) {
        (Some(ra), Some(rb)) => ra.cmp(&rb),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.code.cmp(&b.code),
    });
    currencies
}

/// Find `code` (case-insensitive) in `currencies`, falling back to USD.
pub fn find_currency(currencies: &[Currency], code: &str) -> Currency {
    currencies
        .iter()
        .find(|c| c.code.eq_ignore_ascii_case(code))
        .cloned()
        .unwrap_or_else(|| {
            tracing::debug!("currency {} not available, using USD", code);
            Currency::usd()
        })
}
