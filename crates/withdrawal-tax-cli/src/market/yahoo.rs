use chrono::DateTime;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use withdrawal_tax_core::market_data::{DividendPayment, TickerData};

use super::Fetcher;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Blocking Yahoo Finance client: chart endpoint for price and dividends,
/// quote summary for beta.
pub struct YahooFetcher {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl YahooFetcher {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, Box<dyn std::error::Error>> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(YahooFetcher {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn get_json(&self, url: &str) -> Result<Value, Box<dyn std::error::Error>> {
        debug!(url = %url, "GET");
        let response = self.client.get(url).send()?.error_for_status()?;
        Ok(response.json()?)
    }

    fn fetch_beta(&self, ticker: &str) -> Option<Decimal> {
        let url = format!(
            "{}/v10/finance/quoteSummary/{}?modules=defaultKeyStatistics,summaryDetail",
            self.base_url, ticker
        );
        match self.get_json(&url) {
            Ok(json) => parse_beta(&json),
            Err(e) => {
                debug!(ticker = %ticker, error = %e, "beta unavailable");
                None
            }
        }
    }
}

impl Fetcher for YahooFetcher {
    fn fetch(&self, ticker: &str) -> Result<TickerData, Box<dyn std::error::Error>> {
        let url = format!(
            "{}/v8/finance/chart/{}?range=1y&interval=1d&events=div",
            self.base_url, ticker
        );
        let chart = self.get_json(&url)?;
        let mut data = parse_chart(ticker, &chart)?;
        data.beta = self.fetch_beta(ticker);
        debug!(
            ticker = %ticker,
            price = ?data.price,
            dividends = data.dividend_history.len(),
            beta = ?data.beta,
            "parsed market data"
        );
        Ok(data)
    }
}

/// Price and dividend history from a chart response.
pub fn parse_chart(ticker: &str, json: &Value) -> Result<TickerData, Box<dyn std::error::Error>> {
    let chart = json
        .get("chart")
        .ok_or_else(|| format!("No chart data for {}", ticker))?;

    if let Some(err) = chart.get("error").filter(|e| !e.is_null()) {
        let description = err
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(format!("Yahoo chart error for {}: {}", ticker, description).into());
    }

    let result = chart
        .get("result")
        .and_then(Value::as_array)
        .and_then(|arr| arr.first())
        .ok_or_else(|| format!("No chart data for {}", ticker))?;

    let meta = result.get("meta");
    let price = meta
        .and_then(|m| m.get("regularMarketPrice"))
        .and_then(to_decimal)
        .or_else(|| meta.and_then(|m| m.get("chartPreviousClose")).and_then(to_decimal));

    let mut dividend_history: Vec<DividendPayment> = result
        .get("events")
        .and_then(|e| e.get("dividends"))
        .and_then(Value::as_object)
        .map(|events| events.values().filter_map(parse_dividend).collect())
        .unwrap_or_default();
    dividend_history.sort_by_key(|d| d.date);

    Ok(TickerData {
        price,
        dividend_history,
        beta: None,
    })
}

fn parse_dividend(event: &Value) -> Option<DividendPayment> {
    let amount = event.get("amount").and_then(to_decimal)?;
    let date = event
        .get("date")
        .and_then(Value::as_i64)
        .and_then(|ts| DateTime::from_timestamp(ts, 0))?
        .date_naive();
    Some(DividendPayment { date, amount })
}

/// Beta from a quote-summary response, if Yahoo reports one.
pub fn parse_beta(json: &Value) -> Option<Decimal> {
    let result = json
        .get("quoteSummary")?
        .get("result")?
        .as_array()?
        .first()?;

    [
        ("defaultKeyStatistics", "beta"),
        ("summaryDetail", "beta"),
        ("defaultKeyStatistics", "beta3Year"),
    ]
    .iter()
    .find_map(|(module, field)| {
        result
            .get(module)
            .and_then(|m| m.get(field))
            .and_then(|b| to_decimal(b.get("raw").unwrap_or(b)))
    })
}

fn to_decimal(value: &Value) -> Option<Decimal> {
    let s = match value {
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    Decimal::from_str(&s)
        .or_else(|_| Decimal::from_scientific(&s))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn chart_fixture() -> Value {
        json!({
            "chart": {
                "result": [{
                    "meta": {
                        "symbol": "SCHD",
                        "regularMarketPrice": 27.42,
                        "chartPreviousClose": 25.1
                    },
                    "events": {
                        "dividends": {
                            "1742169600": { "amount": 0.25, "date": 1742169600 },
                            "1733875200": { "amount": 0.2645, "date": 1733875200 }
                        }
                    }
                }],
                "error": null
            }
        })
    }

    #[test]
    fn test_parse_chart_price_and_dividends() {
        let data = parse_chart("SCHD", &chart_fixture()).unwrap();
        assert_eq!(data.price, Some(dec!(27.42)));
        assert_eq!(data.dividend_history.len(), 2);
        // sorted oldest first
        assert_eq!(
            data.dividend_history[0].date,
            NaiveDate::from_ymd_opt(2024, 12, 11).unwrap()
        );
        assert_eq!(data.dividend_history[0].amount, dec!(0.2645));
        assert_eq!(data.dividend_history[1].amount, dec!(0.25));
    }

    #[test]
    fn test_parse_chart_falls_back_to_previous_close() {
        let json = json!({
            "chart": { "result": [{ "meta": { "chartPreviousClose": 99.5 } }], "error": null }
        });
        let data = parse_chart("BND", &json).unwrap();
        assert_eq!(data.price, Some(dec!(99.5)));
        assert!(data.dividend_history.is_empty());
    }

    #[test]
    fn test_parse_chart_error_payload() {
        let json = json!({
            "chart": { "result": null, "error": { "code": "Not Found", "description": "No data found, symbol may be delisted" } }
        });
        let err = parse_chart("ZZZZ", &json).unwrap_err();
        assert!(err.to_string().contains("delisted"));
    }

    #[test]
    fn test_parse_beta_prefers_key_statistics() {
        let json = json!({
            "quoteSummary": {
                "result": [{
                    "defaultKeyStatistics": { "beta": { "raw": 0.82, "fmt": "0.82" } },
                    "summaryDetail": { "beta": { "raw": 0.9 } }
                }]
            }
        });
        assert_eq!(parse_beta(&json), Some(dec!(0.82)));
    }

    #[test]
    fn test_parse_beta_missing() {
        let json = json!({ "quoteSummary": { "result": [{ "summaryDetail": {} }] } });
        assert_eq!(parse_beta(&json), None);
        assert_eq!(parse_beta(&json!({})), None);
    }
}
