use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

use crate::income::{
    classify_with, ClassifiedHolding, DividendTypeInference, IncomeBuckets, ValueSource,
};
use crate::market_data::{MarketDataLookup, TickerData};
use crate::portfolio::{parse_records, AccountType, Holding, HoldingRecord};
use crate::tax::{compute_tax, FilingParameters, TaxResult};
use crate::types::{with_metadata, ComputationOutput, Money};
use crate::WithdrawalTaxResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Everything one estimate needs besides market data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimateInput {
    pub holdings: Vec<Holding>,
    #[serde(default)]
    pub ss_monthly: Money,
    #[serde(default)]
    pub additional_ltcg: Money,
    pub as_of: NaiveDate,
    #[serde(default)]
    pub filing_parameters: FilingParameters,
}

impl EstimateInput {
    pub fn new(holdings: Vec<Holding>, as_of: NaiveDate) -> Self {
        EstimateInput {
            holdings,
            ss_monthly: Decimal::ZERO,
            additional_ltcg: Decimal::ZERO,
            as_of,
            filing_parameters: FilingParameters::default(),
        }
    }
}

/// Self-contained JSON request: raw holding rows plus the market data they
/// should be priced with.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EstimateSource {
    pub holdings: Vec<HoldingRecord>,
    #[serde(default)]
    pub market_data: BTreeMap<String, TickerData>,
    #[serde(default)]
    pub ss_monthly: Money,
    #[serde(default)]
    pub additional_ltcg: Money,
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
    #[serde(default)]
    pub filing_parameters: Option<FilingParameters>,
}

impl EstimateSource {
    /// Validate the rows and split into an input and an uppercase-keyed lookup.
    pub fn into_parts(
        self,
        today: NaiveDate,
    ) -> WithdrawalTaxResult<(EstimateInput, BTreeMap<String, TickerData>)> {
        let holdings = parse_records(self.holdings)?;
        let market_data = self
            .market_data
            .into_iter()
            .map(|(ticker, data)| (ticker.trim().to_uppercase(), data))
            .collect();
        let input = EstimateInput {
            holdings,
            ss_monthly: self.ss_monthly,
            additional_ltcg: self.additional_ltcg,
            as_of: self.as_of.unwrap_or(today),
            filing_parameters: self.filing_parameters.unwrap_or_default(),
        };
        Ok((input, market_data))
    }
}

/// Annual portfolio income per account wrapper.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountTotals {
    pub deferred: Money,
    pub brokerage: Money,
    pub roth: Money,
}

impl AccountTotals {
    pub fn get(&self, account: AccountType) -> Money {
        match account {
            AccountType::Deferred => self.deferred,
            AccountType::Brokerage => self.brokerage,
            AccountType::Roth => self.roth,
        }
    }

    fn credit(&mut self, account: AccountType, amount: Money) {
        match account {
            AccountType::Deferred => self.deferred += amount,
            AccountType::Brokerage => self.brokerage += amount,
            AccountType::Roth => self.roth += amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawalEstimate {
    pub annual_by_account: AccountTotals,
    pub buckets: IncomeBuckets,
    pub holdings: Vec<ClassifiedHolding>,
    pub additional_ltcg: Money,
    /// Portfolio income across all accounts, Social Security excluded.
    pub total_annual_withdrawal: Money,
    pub total_monthly_withdrawal: Money,
    pub ss_annual: Money,
    pub tax: TaxResult,
    pub after_tax_annual_income: Money,
    pub after_tax_monthly_income: Money,
}

// ---------------------------------------------------------------------------
// Estimator
// ---------------------------------------------------------------------------

/// Classify the portfolio, run the tax engine, and assemble the annual and
/// monthly withdrawal picture.
pub fn estimate_withdrawal_tax(
    input: &EstimateInput,
    lookup: &dyn MarketDataLookup,
    inference: &dyn DividendTypeInference,
) -> WithdrawalTaxResult<ComputationOutput<WithdrawalEstimate>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let classification = classify_with(
        &input.holdings,
        lookup,
        inference,
        input.as_of,
        input.additional_ltcg,
    )?;
    let tax = compute_tax(
        &classification.buckets,
        input.ss_monthly,
        &input.filing_parameters,
    )?;

    let mut annual_by_account = AccountTotals::default();
    for h in &classification.holdings {
        annual_by_account.credit(h.account_type, h.annual_income);
    }

    // --- Warnings ---
    if input.holdings.is_empty() {
        warnings.push("Portfolio is empty; only Social Security and additional gains are taxed.".into());
    }
    for h in &classification.holdings {
        if h.yield_source == ValueSource::Default {
            warnings.push(format!(
                "{}: no dividend history or yield override, assuming 0% yield",
                h.ticker
            ));
        } else if h.tax_type_source == ValueSource::Inferred
            && h.account_type == AccountType::Brokerage
            && h.annual_income > Decimal::ZERO
        {
            warnings.push(format!(
                "{}: dividend character inferred as {} ({} rule); set dividend_type to override",
                h.ticker,
                h.dividend_tax_type,
                inference.name()
            ));
        }
    }
    if input.additional_ltcg > Decimal::ZERO {
        warnings.push(format!(
            "Includes {} of additional realized long-term capital gains.",
            input.additional_ltcg
        ));
    }
    if tax.ss_annual > Decimal::ZERO {
        warnings.push(
            "Social Security taxability uses a simplified two-tier provisional-income \
             formula, not the full IRS worksheet."
                .into(),
        );
    }

    let total_annual_withdrawal = classification.buckets.total();
    let after_tax_annual_income = total_annual_withdrawal + tax.ss_annual - tax.total_federal_tax;

    let output = WithdrawalEstimate {
        annual_by_account,
        buckets: classification.buckets,
        holdings: classification.holdings,
        additional_ltcg: classification.additional_ltcg,
        total_annual_withdrawal,
        total_monthly_withdrawal: total_annual_withdrawal / dec!(12),
        ss_annual: tax.ss_annual,
        after_tax_monthly_income: after_tax_annual_income / dec!(12),
        after_tax_annual_income,
        tax,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Withdrawal income from portfolio yields classified by account and dividend \
         character, with federal tax from stacked ordinary and preferential brackets",
        &serde_json::json!({
            "tax_year": input.filing_parameters.tax_year,
            "filing_status": input.filing_parameters.filing_status,
            "as_of": input.as_of.to_string(),
            "num_holdings": input.holdings.len(),
            "ss_monthly": input.ss_monthly.to_string(),
            "additional_ltcg": input.additional_ltcg.to_string(),
            "dividend_type_inference": inference.name(),
            "standard_deduction": input.filing_parameters.standard_deduction.to_string(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
