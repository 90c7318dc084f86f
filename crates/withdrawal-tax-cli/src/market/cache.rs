use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use withdrawal_tax_core::market_data::{MarketDataLookup, TickerData};

use super::Fetcher;

/// One cached ticker: the market data plus when it was fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedTicker {
    #[serde(flatten)]
    pub data: TickerData,
    pub fetched_at: DateTime<Utc>,
}

/// What a prefetch pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefetchSummary {
    pub fetched: usize,
    pub reused: usize,
    pub stale_kept: usize,
    pub missing: usize,
}

/// JSON file of ticker data keyed by uppercase ticker.
#[derive(Debug, Clone)]
pub struct TickerCache {
    path: PathBuf,
    entries: BTreeMap<String, CachedTicker>,
}

impl TickerCache {
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        TickerCache {
            path: path.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Load the cache at `path`. A missing or unreadable file yields an
    /// empty cache.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if !path.exists() {
            debug!(path = %path.display(), "no ticker cache yet");
            return Self::empty(path);
        }

        let parsed = fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|s| {
                serde_json::from_str::<BTreeMap<String, CachedTicker>>(&s).map_err(|e| e.to_string())
            });

        match parsed {
            Ok(entries) => {
                info!(path = %path.display(), tickers = entries.len(), "loaded ticker cache");
                TickerCache { path, entries }
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring unreadable ticker cache");
                Self::empty(path)
            }
        }
    }

    /// Write the cache back to its file as pretty JSON.
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let json = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, json)
            .map_err(|e| format!("Failed to write '{}': {}", self.path.display(), e))?;
        debug!(path = %self.path.display(), tickers = self.entries.len(), "saved ticker cache");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, ticker: &str) -> Option<&CachedTicker> {
        self.entries.get(&ticker.to_uppercase())
    }

    pub fn insert(&mut self, ticker: &str, data: TickerData, fetched_at: DateTime<Utc>) {
        self.entries
            .insert(ticker.to_uppercase(), CachedTicker { data, fetched_at });
    }

    /// True when `ticker` is cached and no older than `max_age` at `now`.
    pub fn is_fresh(&self, ticker: &str, max_age: Duration, now: DateTime<Utc>) -> bool {
        self.get(ticker)
            .map(|entry| now - entry.fetched_at <= max_age)
            .unwrap_or(false)
    }

    /// Make sure every ticker has data before classification starts.
    ///
    /// A ticker is fetched when `refresh` is set or its entry is missing or
    /// stale. A failed fetch keeps whatever stale entry exists.
    pub fn prefetch<'a, I>(
        &mut self,
        tickers: I,
        fetcher: &dyn Fetcher,
        refresh: bool,
        max_age: Duration,
        now: DateTime<Utc>,
    ) -> PrefetchSummary
    where
        I: IntoIterator<Item = &'a str>,
    {
        let unique: BTreeSet<String> = tickers.into_iter().map(str::to_uppercase).collect();
        let mut summary = PrefetchSummary::default();

        for ticker in &unique {
            if !refresh && self.is_fresh(ticker, max_age, now) {
                debug!(ticker = %ticker, "cache hit");
                summary.reused += 1;
                continue;
            }

            info!(ticker = %ticker, "fetching market data");
            match fetcher.fetch(ticker) {
                Ok(data) => {
                    self.insert(ticker, data, now);
                    summary.fetched += 1;
                }
                Err(e) if self.get(ticker).is_some() => {
                    warn!(ticker = %ticker, error = %e, "fetch failed, keeping stale cache entry");
                    summary.stale_kept += 1;
                }
                Err(e) => {
                    warn!(ticker = %ticker, error = %e, "fetch failed, no market data available");
                    summary.missing += 1;
                }
            }
        }

        summary
    }
}

impl MarketDataLookup for TickerCache {
    fn lookup(&self, ticker: &str) -> TickerData {
        self.get(ticker)
            .map(|entry| entry.data.clone())
            .unwrap_or_default()
    }
}
