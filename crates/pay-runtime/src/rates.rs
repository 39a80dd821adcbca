//! Exchange-rate lookup with an explicitly owned TTL cache.
//!
//! Callers create a [`RateCache`], keep it for as long as they need
//! conversions and pass it to [`fetch_exchange_rates`] together with a
//! [`RateSource`]. A failed fetch never surfaces as an error: the caller
//! gets a 1:1 USD table and the failure is logged and remembered.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use pay_core::currency::{build_currencies, Currency, BASE_CURRENCY};
use pay_core::error::{PayError, Result};
use serde::Deserialize;

// ── Defaults ──────────────────────────────────────────────────────────────────

/// Rates are considered fresh for one hour.
pub const DEFAULT_RATE_TTL_SECS: u64 = 60 * 60;

const CONNECT_TIMEOUT_SECS: u64 = 5;
const READ_TIMEOUT_SECS: u64 = 15;

// ── RateSource ────────────────────────────────────────────────────────────────

/// Anything that can produce a `code → USD multiplier` table.
pub trait RateSource {
    fn fetch_rates(&self) -> Result<HashMap<String, f64>>;
}

/// Body of the exchange-rate endpoint; extra fields are ignored.
#[derive(Debug, Deserialize)]
struct RatesResponse {
    rates: HashMap<String, f64>,
}

/// [`RateSource`] backed by an HTTP endpoint returning `{ "rates": {...} }`.
pub struct HttpRateSource {
    url: String,
    agent: ureq::Agent,
}

impl HttpRateSource {
    pub fn new(url: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout_read(Duration::from_secs(READ_TIMEOUT_SECS))
            .build();
        Self {
            url: url.into(),
            agent,
        }
    }
}

impl RateSource for HttpRateSource {
    fn fetch_rates(&self) -> Result<HashMap<String, f64>> {
        let response = self.agent.get(&self.url).call().map_err(|e| match e {
            ureq::Error::Status(code, _) => PayError::RateFetch(format!("HTTP status {}", code)),
            other => PayError::RateFetch(other.to_string()),
        })?;

        let body: RatesResponse = response
            .into_json()
            .map_err(|e| PayError::RateFetch(format!("invalid response body: {}", e)))?;
        Ok(body.rates)
    }
}

// ── RateCache ─────────────────────────────────────────────────────────────────

/// Last successfully fetched rate table and when it was fetched.
pub struct RateCache {
    ttl: Duration,
    rates: Option<HashMap<String, f64>>,
    timestamp: Option<Instant>,
    last_error: Option<String>,
}

impl Default for RateCache {
    fn default() -> Self {
        Self::new(DEFAULT_RATE_TTL_SECS)
    }
}

impl RateCache {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            ttl: Duration::from_secs(ttl_secs),
            rates: None,
            timestamp: None,
            last_error: None,
        }
    }

    /// `true` when the cache holds rates that are still within the TTL.
    pub fn is_valid(&self) -> bool {
        match (self.rates.as_ref(), self.timestamp) {
            (Some(_), Some(ts)) => ts.elapsed() < self.ttl,
            _ => false,
        }
    }

    /// Discard the cached rates so the next lookup fetches again.
    pub fn invalidate(&mut self) {
        self.rates = None;
        self.timestamp = None;
        tracing::debug!("rate cache invalidated");
    }

    /// Age of the cached rates, or `None` before the first successful fetch.
    pub fn age(&self) -> Option<Duration> {
        self.timestamp.map(|ts| ts.elapsed())
    }

    /// Description of the most recent fetch failure.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn store(&mut self, rates: HashMap<String, f64>) {
        self.rates = Some(rates);
        self.timestamp = Some(Instant::now());
        self.last_error = None;
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Rate table assumed when no live rates are available.
pub fn fallback_rates() -> HashMap<String, f64> {
    HashMap::from([(BASE_CURRENCY.to_string(), 1.0)])
}

/// Return exchange rates, hitting `source` only when `cache` is stale.
///
/// On failure the error is logged and recorded on the cache, and the 1:1
/// USD fallback table is returned.
pub fn fetch_exchange_rates(cache: &mut RateCache, source: &dyn RateSource) -> HashMap<String, f64> {
    if cache.is_valid() {
        if let Some(rates) = cache.rates.as_ref() {
            tracing::debug!("returning cached exchange rates");
            return rates.clone();
        }
    }

    match source.fetch_rates() {
        Ok(rates) => {
            tracing::debug!(currencies = rates.len(), "exchange rates updated");
            cache.store(rates.clone());
            rates
        }
        Err(e) => {
            tracing::warn!(error = %e, "error fetching exchange rates; assuming USD only");
            cache.last_error = Some(e.to_string());
            fallback_rates()
        }
    }
}

/// Every available display currency, popular codes first.
///
/// Never empty: USD is returned when no rates could be loaded.
pub fn fetch_currencies(cache: &mut RateCache, source: &dyn RateSource) -> Vec<Currency> {
    let currencies = build_currencies(&fetch_exchange_rates(cache, source));
    if currencies.is_empty() {
        return vec![Currency::usd()];
    }
    currencies
}

// ── Tests ─────────────────────────────────────────────────────────────────────
