//! Value-weighted portfolio beta, overall and per account wrapper.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::WithdrawalTaxError;
use crate::income::classifier::resolve_price;
use crate::market_data::{MarketDataLookup, TickerData};
use crate::portfolio::{AccountType, Holding};
use crate::types::{with_metadata, ComputationOutput, Money};
use crate::WithdrawalTaxResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetaSource {
    Override,
    MarketData,
    Default,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingBeta {
    pub ticker: String,
    pub account_type: AccountType,
    pub shares: Decimal,
    pub price: Money,
    pub value: Money,
    pub beta: Decimal,
    pub beta_source: BetaSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountBeta {
    pub account_type: AccountType,
    pub value: Money,
    /// `None` when the account holds nothing.
    pub beta: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioBeta {
    pub overall_beta: Decimal,
    pub total_value: Money,
    pub by_account: Vec<AccountBeta>,
    pub holdings: Vec<HoldingBeta>,
}

/// Weight each holding's beta by its market value. Holdings without a known
/// beta count as market-neutral (1.0) and are flagged.
pub fn portfolio_beta(
    holdings: &[Holding],
    lookup: &dyn MarketDataLookup,
) -> WithdrawalTaxResult<ComputationOutput<PortfolioBeta>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let mut rows: Vec<HoldingBeta> = Vec::with_capacity(holdings.len());
    for holding in holdings {
        holding.validate()?;
        let needs_lookup = holding.beta.is_none()
            || (holding.price.is_none() && holding.market_value.is_none());
        let data = if needs_lookup {
            lookup.lookup(&holding.ticker)
        } else {
            TickerData::default()
        };

        let (price, _) = resolve_price(holding, &data)?;
        let (beta, beta_source) = match (holding.beta, data.beta) {
            (Some(b), _) => (b, BetaSource::Override),
            (None, Some(b)) => (b, BetaSource::MarketData),
            (None, None) => {
                warnings.push(format!("No beta for {}, using 1.0", holding.ticker));
                (Decimal::ONE, BetaSource::Default)
            }
        };

        rows.push(HoldingBeta {
            ticker: holding.ticker.clone(),
            account_type: holding.account_type,
            shares: holding.shares,
            price,
            value: holding
                .shares
                .checked_mul(price)
                .ok_or_else(|| WithdrawalTaxError::overflow(format!("{}.value", holding.ticker)))?,
            beta,
            beta_source,
        });
    }

    let (total_value, overall_beta) = weigh(rows.iter())?;
    let overall_beta = overall_beta.unwrap_or(Decimal::ZERO);

    let by_account = AccountType::ALL
        .into_iter()
        .map(|account| -> WithdrawalTaxResult<AccountBeta> {
            let (value, beta) = weigh(rows.iter().filter(|r| r.account_type == account))?;
            Ok(AccountBeta {
                account_type: account,
                value,
                beta,
            })
        })
        .collect::<WithdrawalTaxResult<Vec<_>>>()?;

    let output = PortfolioBeta {
        overall_beta,
        total_value,
        by_account,
        holdings: rows,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Portfolio beta: market-value weighted average of holding betas",
        &serde_json::json!({
            "num_holdings": holdings.len(),
            "default_beta": "1.0",
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// Total value of `rows` and their value-weighted beta, `None` when they
/// hold nothing.
fn weigh<'a>(
    mut rows: impl Iterator<Item = &'a HoldingBeta>,
) -> WithdrawalTaxResult<(Money, Option<Decimal>)> {
    let (value, weighted) = rows
        .try_fold((Decimal::ZERO, Decimal::ZERO), |(v, w), r| {
            Some((
                v.checked_add(r.value)?,
                w.checked_add(r.value.checked_mul(r.beta)?)?,
            ))
        })
        .ok_or_else(|| WithdrawalTaxError::overflow("portfolio_value"))?;
    let beta = if value > Decimal::ZERO {
        weighted.checked_div(value)
    } else {
        None
    };
    Ok((value, beta))
}
