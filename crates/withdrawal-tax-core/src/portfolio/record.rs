use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::holding::{normalize_ticker, AccountType, DividendTaxType, Holding};
use crate::error::WithdrawalTaxError;
use crate::WithdrawalTaxResult;

/// A numeric cell as it arrives from JSON (number or string) or CSV (text).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(Decimal),
    Text(String),
}

impl From<Decimal> for RawValue {
    fn from(value: Decimal) -> Self {
        RawValue::Number(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

/// Untyped holding row. Column names follow the portfolio CSV header;
/// the JSON form accepts the same keys.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HoldingRecord {
    #[serde(default)]
    pub ticker: Option<String>,
    #[serde(default)]
    pub account_type: Option<String>,
    #[serde(default)]
    pub shares: Option<RawValue>,
    #[serde(default)]
    pub price: Option<RawValue>,
    #[serde(default)]
    pub market_value: Option<RawValue>,
    #[serde(default, alias = "annual_yield_pct")]
    pub yield_pct: Option<RawValue>,
    #[serde(default, alias = "dividend_tax_type")]
    pub dividend_type: Option<String>,
    #[serde(default)]
    pub beta: Option<RawValue>,
}

impl TryFrom<HoldingRecord> for Holding {
    type Error = WithdrawalTaxError;

    fn try_from(record: HoldingRecord) -> WithdrawalTaxResult<Self> {
        let ticker = record
            .ticker
            .as_deref()
            .map(normalize_ticker)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| WithdrawalTaxError::malformed("ticker", "ticker is required"))?;

        let account_raw = non_blank(record.account_type.as_deref()).ok_or_else(|| {
            WithdrawalTaxError::malformed(format!("{ticker}.account_type"), "account_type is required")
        })?;
        let account_type = AccountType::parse(&ticker, account_raw)?;

        let shares = parse_decimal(&ticker, "shares", record.shares.as_ref())?.ok_or_else(|| {
            WithdrawalTaxError::malformed(format!("{ticker}.shares"), "shares is required")
        })?;

        let dividend_tax_type = match non_blank(record.dividend_type.as_deref()) {
            None => None,
            Some(raw) => Some(DividendTaxType::parse(raw).ok_or_else(|| {
                WithdrawalTaxError::malformed(
                    format!("{ticker}.dividend_type"),
                    format!("'{raw}' is not one of ordinary, qualified, capital_gains, interest"),
                )
            })?),
        };

        let holding = Holding {
            price: parse_decimal(&ticker, "price", record.price.as_ref())?,
            market_value: parse_decimal(&ticker, "market_value", record.market_value.as_ref())?,
            yield_pct: parse_decimal(&ticker, "yield_pct", record.yield_pct.as_ref())?,
            beta: parse_decimal(&ticker, "beta", record.beta.as_ref())?,
            dividend_tax_type,
            shares,
            account_type,
            ticker,
        };
        holding.validate()?;
        Ok(holding)
    }
}

/// Validate a batch of raw rows, failing on the first bad one.
pub fn parse_records(records: Vec<HoldingRecord>) -> WithdrawalTaxResult<Vec<Holding>> {
    records.into_iter().map(Holding::try_from).collect()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_decimal(
    ticker: &str,
    field: &str,
    value: Option<&RawValue>,
) -> WithdrawalTaxResult<Option<Decimal>> {
    match value {
        None => Ok(None),
        Some(RawValue::Number(n)) => Ok(Some(*n)),
        Some(RawValue::Text(text)) => {
            let cleaned: String = text
                .trim()
                .chars()
                .filter(|c| *c != ',' && *c != '$' && *c != '_')
                .collect();
            if cleaned.is_empty() {
                return Ok(None);
            }
            Decimal::from_str(&cleaned)
                .or_else(|_| Decimal::from_scientific(&cleaned))
                .map(Some)
                .map_err(|_| {
                    WithdrawalTaxError::malformed(
                        format!("{ticker}.{field}"),
                        format!("'{text}' is not a number"),
                    )
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn record(ticker: &str, account: &str, shares: &str) -> HoldingRecord {
        HoldingRecord {
            ticker: Some(ticker.into()),
            account_type: Some(account.into()),
            shares: Some(shares.into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_record_with_text_numbers_parses() {
        let mut r = record("vym", "brokerage", "1,200");
        r.price = Some("$110.25".into());
        r.yield_pct = Some("3.1".into());
        r.dividend_type = Some("Qualified".into());

        let h = Holding::try_from(r).unwrap();
        assert_eq!(h.ticker, "VYM");
        assert_eq!(h.shares, dec!(1200));
        assert_eq!(h.price, Some(dec!(110.25)));
        assert_eq!(h.yield_pct, Some(dec!(3.1)));
        assert_eq!(h.dividend_tax_type, Some(DividendTaxType::Qualified));
    }

    #[test]
    fn test_blank_optional_fields_are_absent() {
        let mut r = record("BND", "deferred", "10");
        r.price = Some("  ".into());
        r.dividend_type = Some("".into());
        let h = Holding::try_from(r).unwrap();
        assert_eq!(h.price, None);
        assert_eq!(h.dividend_tax_type, None);
    }

    #[test]
    fn test_missing_shares_is_malformed() {
        let mut r = record("BND", "deferred", "10");
        r.shares = None;
        match Holding::try_from(r).unwrap_err() {
            WithdrawalTaxError::MalformedInput { field, .. } => assert_eq!(field, "BND.shares"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unparsable_number_is_malformed() {
        let mut r = record("BND", "deferred", "10");
        r.yield_pct = Some("four".into());
        assert!(matches!(
            Holding::try_from(r),
            Err(WithdrawalTaxError::MalformedInput { .. })
        ));
    }

    #[test]
    fn test_unknown_account_type_is_fatal() {
        let r = record("BND", "529", "10");
        assert!(matches!(
            Holding::try_from(r),
            Err(WithdrawalTaxError::UnknownAccountType { .. })
        ));
    }

    #[test]
    fn test_unknown_dividend_type_is_malformed() {
        let mut r = record("BND", "brokerage", "10");
        r.dividend_type = Some("section_199a".into());
        assert!(matches!(
            Holding::try_from(r),
            Err(WithdrawalTaxError::MalformedInput { .. })
        ));
    }

    #[test]
    fn test_json_accepts_numbers_and_csv_style_alias() {
        let json = r#"[
            {"ticker": "schd", "account_type": "roth", "shares": 50, "price": 27.5},
            {"ticker": "BND", "account_type": "brokerage", "shares": "12",
             "annual_yield_pct": 3.7, "dividend_tax_type": "interest"}
        ]"#;
        let records: Vec<HoldingRecord> = serde_json::from_str(json).unwrap();
        let holdings = parse_records(records).unwrap();
        assert_eq!(holdings.len(), 2);
        assert_eq!(holdings[0].ticker, "SCHD");
        assert_eq!(holdings[0].price, Some(dec!(27.5)));
        assert_eq!(holdings[1].yield_pct, Some(dec!(3.7)));
        assert_eq!(holdings[1].dividend_tax_type, Some(DividendTaxType::Interest));
    }
}
