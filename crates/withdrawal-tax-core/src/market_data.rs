//! Interface to whatever supplies prices and dividend history.
//!
//! The core never fetches anything itself: callers resolve market data up
//! front (from a cache, a provider, or a fixture) and hand the classifier a
//! [`MarketDataLookup`]. Freshness and refresh policy belong to the caller.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::types::Money;

/// One dividend payment per share.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DividendPayment {
    pub date: NaiveDate,
    pub amount: Money,
}

/// Everything the core needs to know about a ticker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickerData {
    #[serde(default)]
    pub price: Option<Money>,
    /// Payments ordered oldest first.
    #[serde(default)]
    pub dividend_history: Vec<DividendPayment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beta: Option<Decimal>,
}

impl TickerData {
    pub fn has_dividend_history(&self) -> bool {
        !self.dividend_history.is_empty()
    }
}

/// Synchronous, read-only source of [`TickerData`].
///
/// Unknown tickers resolve to an empty record rather than an error; a
/// missing price only becomes fatal when a holding actually needs it.
pub trait MarketDataLookup {
    fn lookup(&self, ticker: &str) -> TickerData;
}

/// Lookup that knows nothing. Every holding must carry its own overrides.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMarketData;

impl MarketDataLookup for NoMarketData {
    fn lookup(&self, _ticker: &str) -> TickerData {
        TickerData::default()
    }
}

impl MarketDataLookup for HashMap<String, TickerData> {
    fn lookup(&self, ticker: &str) -> TickerData {
        self.get(ticker).cloned().unwrap_or_default()
    }
}

impl MarketDataLookup for BTreeMap<String, TickerData> {
    fn lookup(&self, ticker: &str) -> TickerData {
        self.get(ticker).cloned().unwrap_or_default()
    }
}

impl<T: MarketDataLookup + ?Sized> MarketDataLookup for &T {
    fn lookup(&self, ticker: &str) -> TickerData {
        (**self).lookup(ticker)
    }
}
