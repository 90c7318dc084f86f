pub mod cache;
pub mod yahoo;

use chrono::Utc;
use tracing::{info, warn};

use withdrawal_tax_core::market_data::TickerData;

use crate::commands::MarketArgs;
use crate::config::Settings;

pub use cache::TickerCache;
pub use yahoo::YahooFetcher;

/// Source of fresh ticker data.
pub trait Fetcher {
    fn fetch(&self, ticker: &str) -> Result<TickerData, Box<dyn std::error::Error>>;
}

/// Load the cache and top it up for `tickers` unless running offline.
pub fn prepare_cache<'a, I>(
    settings: &Settings,
    args: &MarketArgs,
    tickers: I,
) -> Result<TickerCache, Box<dyn std::error::Error>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut cache = TickerCache::load(&settings.cache_file);
    let tickers: Vec<&str> = tickers.into_iter().collect();

    if args.offline {
        let now = Utc::now();
        for ticker in tickers.iter().filter(|t| !cache.is_fresh(t, settings.max_age, now)) {
            warn!(ticker = %ticker, "offline: cached data missing or stale");
        }
        return Ok(cache);
    }
    if tickers.is_empty() {
        return Ok(cache);
    }

    let fetcher = YahooFetcher::new(&settings.yahoo_base_url, settings.http_timeout)?;
    let summary = cache.prefetch(
        tickers,
        &fetcher,
        args.refresh,
        settings.max_age,
        Utc::now(),
    );
    info!(
        fetched = summary.fetched,
        reused = summary.reused,
        stale = summary.stale_kept,
        missing = summary.missing,
        "market data ready"
    );

    if summary.fetched > 0 {
        if let Err(e) = cache.save() {
            warn!(error = %e, "could not persist ticker cache");
        }
    }
    Ok(cache)
}
