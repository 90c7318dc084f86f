use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::buckets::{IncomeBucket, IncomeBuckets};
use super::inference::{DividendTypeInference, HistoryPresenceInference};
use super::yields::{trailing_dividends, trailing_yield_pct};
use crate::error::WithdrawalTaxError;
use crate::market_data::{MarketDataLookup, TickerData};
use crate::portfolio::{AccountType, DividendTaxType, Holding};
use crate::types::{Money, Percent};
use crate::WithdrawalTaxResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueSource {
    /// Stated on the holding itself.
    Override,
    /// Price derived from the holding's market value.
    MarketValue,
    /// Taken from the market-data lookup.
    MarketData,
    /// Yield computed from trailing dividend history.
    TrailingDividends,
    /// Dividend character guessed by the inference strategy.
    Inferred,
    /// Nothing known; documented default applied.
    Default,
}

/// A holding after price, yield and tax character have been resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedHolding {
    pub ticker: String,
    pub account_type: AccountType,
    pub shares: Decimal,
    pub price: Money,
    pub price_source: ValueSource,
    pub market_value: Money,
    pub yield_pct: Percent,
    pub yield_source: ValueSource,
    pub dividend_tax_type: DividendTaxType,
    pub tax_type_source: ValueSource,
    pub annual_income: Money,
    pub bucket: IncomeBucket,
}

impl ClassifiedHolding {
    pub fn buckets(&self) -> IncomeBuckets {
        IncomeBuckets::single(self.bucket, self.annual_income)
    }
}

/// Output of a classification pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub buckets: IncomeBuckets,
    pub holdings: Vec<ClassifiedHolding>,
    /// Flat realized long-term gains folded into `brokerage_capital_gains`.
    pub additional_ltcg: Money,
}

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

/// Bucket a holding's income lands in.
///
/// Roth income is never taxed and deferred withdrawals are always ordinary,
/// whatever the underlying dividend character. Only brokerage income keeps
/// its character.
pub fn route_income(account_type: AccountType, dividend_tax_type: DividendTaxType) -> IncomeBucket {
    match account_type {
        AccountType::Roth => IncomeBucket::RothTaxfree,
        AccountType::Deferred => IncomeBucket::DeferredOrdinary,
        AccountType::Brokerage => match dividend_tax_type {
            DividendTaxType::Qualified => IncomeBucket::BrokerageQualified,
            DividendTaxType::CapitalGains => IncomeBucket::BrokerageCapitalGains,
            DividendTaxType::Ordinary | DividendTaxType::Interest => {
                IncomeBucket::BrokerageOrdinary
            }
        },
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Classify holdings with the default [`HistoryPresenceInference`] rule.
pub fn classify(
    holdings: &[Holding],
    lookup: &dyn MarketDataLookup,
    as_of: NaiveDate,
    additional_ltcg: Money,
) -> WithdrawalTaxResult<Classification> {
    classify_with(holdings, lookup, &HistoryPresenceInference, as_of, additional_ltcg)
}

/// Classify holdings into income buckets.
///
/// Each holding is resolved independently and contributes by addition only,
/// so the result does not depend on holding order. The first unresolvable
/// holding aborts the pass.
pub fn classify_with(
    holdings: &[Holding],
    lookup: &dyn MarketDataLookup,
    inference: &dyn DividendTypeInference,
    as_of: NaiveDate,
    additional_ltcg: Money,
) -> WithdrawalTaxResult<Classification> {
    if additional_ltcg < Decimal::ZERO {
        return Err(WithdrawalTaxError::malformed(
            "additional_ltcg",
            "additional long-term capital gains must be >= 0",
        ));
    }

    let classified = holdings
        .iter()
        .map(|h| classify_holding(h, lookup, inference, as_of))
        .collect::<WithdrawalTaxResult<Vec<_>>>()?;

    let mut buckets = classified
        .iter()
        .try_fold(IncomeBuckets::default(), |acc, h| acc.checked_add(&h.buckets()))
        .ok_or_else(|| WithdrawalTaxError::overflow("income_buckets"))?;
    buckets.brokerage_capital_gains = buckets
        .brokerage_capital_gains
        .checked_add(additional_ltcg)
        .ok_or_else(|| WithdrawalTaxError::overflow("additional_ltcg"))?;

    Ok(Classification {
        buckets,
        holdings: classified,
        additional_ltcg,
    })
}

/// Resolve a single holding.
pub fn classify_holding(
    holding: &Holding,
    lookup: &dyn MarketDataLookup,
    inference: &dyn DividendTypeInference,
    as_of: NaiveDate,
) -> WithdrawalTaxResult<ClassifiedHolding> {
    holding.validate()?;

    // Market data is only consulted for what the holding leaves open.
    let data = if needs_market_data(holding) {
        lookup.lookup(&holding.ticker)
    } else {
        TickerData::default()
    };

    let (price, price_source) = resolve_price(holding, &data)?;

    // A stated market value is the base yields apply to, even next to a price.
    let market_value = match holding.market_value {
        Some(mv) => mv,
        None => checked(holding, "market_value", holding.shares.checked_mul(price))?,
    };

    let (yield_pct, yield_source, annual_income) = match holding.yield_pct {
        Some(y) => {
            let income = market_value
                .checked_mul(y)
                .and_then(|v| v.checked_div(dec!(100)));
            (y, ValueSource::Override, checked(holding, "annual_income", income)?)
        }
        None if data.has_dividend_history() => {
            let history = &data.dividend_history;
            let yield_pct = checked(holding, "yield_pct", trailing_yield_pct(history, price, as_of))?;
            let ttm = checked(holding, "dividend_history", trailing_dividends(history, as_of))?;
            let income = match holding.market_value {
                Some(mv) => mv.checked_mul(ttm).and_then(|v| v.checked_div(price)),
                // shares x price x (ttm / price) without the rounding of the division
                None => holding.shares.checked_mul(ttm),
            };
            (
                yield_pct,
                ValueSource::TrailingDividends,
                checked(holding, "annual_income", income)?,
            )
        }
        None => (Decimal::ZERO, ValueSource::Default, Decimal::ZERO),
    };
    let annual_income = annual_income.max(Decimal::ZERO);

    let (dividend_tax_type, tax_type_source) = match holding.dividend_tax_type {
        Some(t) => (t, ValueSource::Override),
        None => (inference.infer(&holding.ticker, &data), ValueSource::Inferred),
    };

    let bucket = route_income(holding.account_type, dividend_tax_type);

    Ok(ClassifiedHolding {
        ticker: holding.ticker.clone(),
        account_type: holding.account_type,
        shares: holding.shares,
        price,
        price_source,
        market_value,
        yield_pct,
        yield_source,
        dividend_tax_type,
        tax_type_source,
        annual_income,
        bucket,
    })
}

/// Whether classifying `holding` consults the market-data lookup at all.
///
/// Dividend character only moves brokerage income between buckets, so a
/// deferred or Roth holding never looks it up.
pub fn needs_market_data(holding: &Holding) -> bool {
    let price_known = holding.price.is_some()
        || (holding.market_value.is_some() && holding.shares > Decimal::ZERO);
    let character_known = holding.dividend_tax_type.is_some()
        || holding.account_type != AccountType::Brokerage;
    !price_known || holding.yield_pct.is_none() || !character_known
}

/// Explicit price, else market value / shares, else looked-up price.
/// Whatever is chosen must be strictly positive.
pub(crate) fn resolve_price(
    holding: &Holding,
    data: &TickerData,
) -> WithdrawalTaxResult<(Money, ValueSource)> {
    let (price, source) = if let Some(p) = holding.price {
        (Some(p), ValueSource::Override)
    } else if let (Some(mv), true) = (holding.market_value, holding.shares > Decimal::ZERO) {
        let per_share = checked(holding, "price", mv.checked_div(holding.shares))?;
        (Some(per_share), ValueSource::MarketValue)
    } else {
        (data.price, ValueSource::MarketData)
    };

    match price {
        Some(p) if p > Decimal::ZERO => Ok((p, source)),
        _ => Err(WithdrawalTaxError::UnresolvedPrice {
            ticker: holding.ticker.clone(),
        }),
    }
}

fn checked<T>(holding: &Holding, field: &str, value: Option<T>) -> WithdrawalTaxResult<T> {
    value.ok_or_else(|| WithdrawalTaxError::overflow(format!("{}.{}", holding.ticker, field)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::income::inference::FixedInference;
    use crate::market_data::{DividendPayment, NoMarketData};
    use std::cell::Cell;
    use std::collections::HashMap;

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 15).unwrap()
    }

    fn quarterly(amount: Decimal) -> Vec<DividendPayment> {
        [(2025, 3, 20), (2025, 6, 20), (2025, 9, 20), (2025, 12, 20)]
            .into_iter()
            .map(|(y, m, d)| DividendPayment {
                date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
                amount,
            })
            .collect()
    }

    fn market() -> HashMap<String, TickerData> {
        let mut m = HashMap::new();
        m.insert(
            "SCHD".to_string(),
            TickerData {
                price: Some(dec!(25)),
                dividend_history: quarterly(dec!(0.25)),
                beta: None,
            },
        );
        m.insert(
            "SGOV".to_string(),
            TickerData {
                price: Some(dec!(100)),
                dividend_history: vec![],
                beta: None,
            },
        );
        m
    }

    #[test]
    fn test_route_roth_is_always_taxfree() {
        for t in [
            DividendTaxType::Ordinary,
            DividendTaxType::Qualified,
            DividendTaxType::CapitalGains,
            DividendTaxType::Interest,
        ] {
            assert_eq!(route_income(AccountType::Roth, t), IncomeBucket::RothTaxfree);
            assert_eq!(
                route_income(AccountType::Deferred, t),
                IncomeBucket::DeferredOrdinary
            );
        }
    }

    #[test]
    fn test_route_brokerage_by_character() {
        use DividendTaxType::*;
        assert_eq!(
            route_income(AccountType::Brokerage, Qualified),
            IncomeBucket::BrokerageQualified
        );
        assert_eq!(
            route_income(AccountType::Brokerage, CapitalGains),
            IncomeBucket::BrokerageCapitalGains
        );
        assert_eq!(
            route_income(AccountType::Brokerage, Interest),
            IncomeBucket::BrokerageOrdinary
        );
        assert_eq!(
            route_income(AccountType::Brokerage, Ordinary),
            IncomeBucket::BrokerageOrdinary
        );
    }

    #[test]
    fn test_overrides_need_no_market_data() {
        let h = Holding::new("brk", AccountType::Brokerage, dec!(100))
            .with_price(dec!(50))
            .with_yield_pct(dec!(4))
            .with_dividend_tax_type(DividendTaxType::Qualified);
        let c = classify_holding(&h, &NoMarketData, &HistoryPresenceInference, as_of()).unwrap();
        assert_eq!(c.market_value, dec!(5000));
        assert_eq!(c.annual_income, dec!(200));
        assert_eq!(c.bucket, IncomeBucket::BrokerageQualified);
        assert_eq!(c.price_source, ValueSource::Override);
    }

    #[test]
    fn test_yield_and_character_from_history() {
        let h = Holding::new("SCHD", AccountType::Brokerage, dec!(400));
        let c = classify_holding(&h, &market(), &HistoryPresenceInference, as_of()).unwrap();
        // $1.00/yr on a $25 share
        assert_eq!(c.yield_pct, dec!(4));
        assert_eq!(c.yield_source, ValueSource::TrailingDividends);
        assert_eq!(c.dividend_tax_type, DividendTaxType::Qualified);
        assert_eq!(c.tax_type_source, ValueSource::Inferred);
        assert_eq!(c.annual_income, dec!(400));
    }

    #[test]
    fn test_no_history_defaults_to_zero_yield_ordinary() {
        let h = Holding::new("SGOV", AccountType::Brokerage, dec!(10));
        let c = classify_holding(&h, &market(), &HistoryPresenceInference, as_of()).unwrap();
        assert_eq!(c.yield_pct, Decimal::ZERO);
        assert_eq!(c.yield_source, ValueSource::Default);
        assert_eq!(c.dividend_tax_type, DividendTaxType::Ordinary);
        assert_eq!(c.annual_income, Decimal::ZERO);
    }

    #[test]
    fn test_price_derived_from_market_value() {
        let h = Holding::new("FXAIX", AccountType::Deferred, dec!(200))
            .with_market_value(dec!(40_000))
            .with_yield_pct(dec!(1.5));
        let c = classify_holding(&h, &NoMarketData, &HistoryPresenceInference, as_of()).unwrap();
        assert_eq!(c.price, dec!(200));
        assert_eq!(c.price_source, ValueSource::MarketValue);
        assert_eq!(c.annual_income, dec!(600));
        assert_eq!(c.bucket, IncomeBucket::DeferredOrdinary);
    }

    #[test]
    fn test_unresolved_price_is_fatal() {
        let h = Holding::new("NOPE", AccountType::Roth, dec!(5)).with_yield_pct(dec!(2));
        let err = classify(&[h], &market(), as_of(), Decimal::ZERO).unwrap_err();
        assert!(matches!(err, WithdrawalTaxError::UnresolvedPrice { ref ticker } if ticker == "NOPE"));
    }

    #[test]
    fn test_non_positive_explicit_price_is_unresolved() {
        let h = Holding::new("VTI", AccountType::Roth, dec!(5)).with_price(Decimal::ZERO);
        assert!(matches!(
            classify_holding(&h, &market(), &HistoryPresenceInference, as_of()),
            Err(WithdrawalTaxError::UnresolvedPrice { .. })
        ));
    }

    #[test]
    fn test_additional_ltcg_added_to_capital_gains() {
        let h = Holding::new("SCHD", AccountType::Brokerage, dec!(400))
            .with_dividend_tax_type(DividendTaxType::CapitalGains);
        let c = classify(&[h], &market(), as_of(), dec!(10_000)).unwrap();
        assert_eq!(c.buckets.brokerage_capital_gains, dec!(10_400));
        assert_eq!(c.additional_ltcg, dec!(10_000));
    }

    #[test]
    fn test_negative_additional_ltcg_rejected() {
        assert!(matches!(
            classify(&[], &NoMarketData, as_of(), dec!(-1)),
            Err(WithdrawalTaxError::MalformedInput { .. })
        ));
    }

    #[test]
    fn test_inference_strategy_is_swappable() {
        let h = Holding::new("SCHD", AccountType::Brokerage, dec!(400));
        let c = classify_with(
            &[h],
            &market(),
            &FixedInference(DividendTaxType::Interest),
            as_of(),
            Decimal::ZERO,
        )
        .unwrap();
        assert_eq!(c.buckets.brokerage_ordinary, dec!(400));
        assert_eq!(c.buckets.brokerage_qualified, Decimal::ZERO);
    }

    struct CountingLookup {
        calls: Cell<u32>,
    }

    impl MarketDataLookup for CountingLookup {
        fn lookup(&self, _ticker: &str) -> TickerData {
            self.calls.set(self.calls.get() + 1);
            TickerData::default()
        }
    }

    #[test]
    fn test_lookup_skipped_when_fully_overridden() {
        let lookup = CountingLookup { calls: Cell::new(0) };
        let full = Holding::new("A", AccountType::Roth, dec!(1))
            .with_price(dec!(10))
            .with_yield_pct(dec!(1))
            .with_dividend_tax_type(DividendTaxType::Ordinary);
        let partial = Holding::new("B", AccountType::Roth, dec!(1)).with_price(dec!(10));
        classify(&[full, partial], &lookup, as_of(), Decimal::ZERO).unwrap();
        assert_eq!(lookup.calls.get(), 1);
    }

    #[test]
    fn test_deferred_and_roth_skip_lookup_for_character() {
        let lookup = CountingLookup { calls: Cell::new(0) };
        let deferred = Holding::new("A", AccountType::Deferred, dec!(1))
            .with_price(dec!(10))
            .with_yield_pct(dec!(1));
        let roth = Holding::new("B", AccountType::Roth, dec!(1))
            .with_price(dec!(10))
            .with_yield_pct(dec!(1));
        let brokerage = Holding::new("C", AccountType::Brokerage, dec!(1))
            .with_price(dec!(10))
            .with_yield_pct(dec!(1));
        assert!(!needs_market_data(&deferred));
        assert!(needs_market_data(&brokerage));

        let c = classify(&[deferred, roth, brokerage], &lookup, as_of(), Decimal::ZERO).unwrap();
        assert_eq!(lookup.calls.get(), 1);
        assert_eq!(c.buckets.deferred_ordinary, dec!(0.1));
        assert_eq!(c.buckets.roth_taxfree, dec!(0.1));
    }

    #[test]
    fn test_market_value_wins_over_shares_times_price() {
        let h = Holding::new("VTI", AccountType::Deferred, dec!(100))
            .with_price(dec!(50))
            .with_market_value(dec!(6_000))
            .with_yield_pct(dec!(4));
        let c = classify(&[h], &NoMarketData, as_of(), Decimal::ZERO).unwrap();
        assert_eq!(c.holdings[0].price, dec!(50));
        assert_eq!(c.holdings[0].market_value, dec!(6_000));
        assert_eq!(c.buckets.deferred_ordinary, dec!(240));
    }

    #[test]
    fn test_market_value_scales_trailing_income() {
        // $1.00/yr on a $25 share is 4% of the stated 10,000
        let h = Holding::new("SCHD", AccountType::Roth, dec!(100))
            .with_price(dec!(25))
            .with_market_value(dec!(10_000));
        let c = classify_holding(&h, &market(), &HistoryPresenceInference, as_of()).unwrap();
        assert_eq!(c.yield_pct, dec!(4));
        assert_eq!(c.annual_income, dec!(400));
    }

    #[test]
    fn test_oversized_position_is_malformed_not_a_panic() {
        let shares = Decimal::from_scientific("1e20").unwrap();
        let h = Holding::new("BIG", AccountType::Brokerage, shares)
            .with_price(Decimal::from_scientific("1e10").unwrap())
            .with_yield_pct(dec!(4));
        match classify(&[h], &NoMarketData, as_of(), Decimal::ZERO).unwrap_err() {
            WithdrawalTaxError::MalformedInput { field, .. } => {
                assert_eq!(field, "BIG.market_value")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_bucket_total_overflow_is_malformed() {
        let mut m = HashMap::new();
        m.insert(
            "HUGE".to_string(),
            TickerData {
                price: Some(Decimal::from_scientific("1e10").unwrap()),
                dividend_history: vec![DividendPayment {
                    date: NaiveDate::from_ymd_opt(2025, 12, 20).unwrap(),
                    amount: Decimal::from_scientific("5e28").unwrap(),
                }],
                beta: None,
            },
        );
        // Each holding fits on its own; the two together do not.
        let h = Holding::new("HUGE", AccountType::Roth, dec!(1));
        classify(&[h.clone()], &m, as_of(), Decimal::ZERO).unwrap();
        match classify(&[h.clone(), h], &m, as_of(), Decimal::ZERO).unwrap_err() {
            WithdrawalTaxError::MalformedInput { field, .. } => assert_eq!(field, "income_buckets"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
