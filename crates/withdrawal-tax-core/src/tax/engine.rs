use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::brackets::{ordinary_tax_slices, BandSlice};
use super::params::FilingParameters;
use super::preferential::preferential_slices;
use super::social_security::taxable_social_security;
use crate::error::WithdrawalTaxError;
use crate::income::IncomeBuckets;
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::WithdrawalTaxResult;

const MONTHS_PER_YEAR: Decimal = dec!(12);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Input for a standalone tax computation on already-aggregated buckets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaxInput {
    #[serde(default)]
    pub buckets: IncomeBuckets,
    #[serde(default)]
    pub ss_monthly: Money,
    #[serde(default)]
    pub filing_parameters: FilingParameters,
}

/// Band-by-band attribution of the three tax components.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaxBreakdown {
    pub ordinary: Vec<BandSlice>,
    pub qualified_dividends: Vec<BandSlice>,
    pub capital_gains: Vec<BandSlice>,
}

/// Federal tax estimate for one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxResult {
    pub ss_annual: Money,
    pub provisional_income: Money,
    pub taxable_social_security: Money,
    /// Deferred + brokerage ordinary + taxable Social Security.
    pub ordinary_taxable_income: Money,
    pub standard_deduction_used: Money,
    pub ordinary_after_deduction: Money,
    pub ordinary_tax: Money,
    pub qualified_dividend_tax: Money,
    pub capital_gains_tax: Money,
    pub preferential_tax: Money,
    pub total_federal_tax: Money,
    /// Every taxable withdrawal including taxable Social Security; Roth excluded.
    pub taxable_withdrawals: Money,
    pub effective_rate: Rate,
    pub breakdown: TaxBreakdown,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Compute federal tax on a set of income buckets.
///
/// Order is fixed: Social Security taxability, standard deduction against
/// ordinary income only, progressive ordinary brackets, then qualified
/// dividends stacked on ordinary income and capital gains stacked on both.
pub fn compute_tax(
    buckets: &IncomeBuckets,
    ss_monthly: Money,
    params: &FilingParameters,
) -> WithdrawalTaxResult<TaxResult> {
    buckets.validate()?;
    if ss_monthly < Decimal::ZERO {
        return Err(WithdrawalTaxError::malformed(
            "ss_monthly",
            "monthly Social Security benefit must be >= 0",
        ));
    }
    params.validate()?;

    let ss_annual = ss_monthly
        .checked_mul(MONTHS_PER_YEAR)
        .ok_or_else(|| WithdrawalTaxError::overflow("ss_monthly"))?;
    // Every later sum is bounded by this one.
    buckets
        .checked_total()
        .and_then(|total| total.checked_add(ss_annual))
        .ok_or_else(|| WithdrawalTaxError::overflow("income_buckets"))?;

    // 1. Social Security
    let ss = taxable_social_security(buckets.ordinary_income(), ss_annual);

    // 2-3. Ordinary income, then the deduction. Unused deduction is lost,
    // it never shelters preferential income.
    let ordinary_taxable_income = buckets.ordinary_income() + ss.taxable_amount;
    let ordinary_after_deduction =
        (ordinary_taxable_income - params.standard_deduction).max(Decimal::ZERO);
    let standard_deduction_used = params.standard_deduction.min(ordinary_taxable_income);

    // 4. Ordinary brackets
    let ordinary = ordinary_tax_slices(ordinary_after_deduction, &params.ordinary_brackets);

    // 5. Qualified dividends sit directly on ordinary income
    let qualified = preferential_slices(
        buckets.brokerage_qualified,
        ordinary_after_deduction,
        params,
    );

    // 6. Capital gains sit on ordinary income plus qualified dividends
    let capital_gains = preferential_slices(
        buckets.brokerage_capital_gains,
        ordinary_after_deduction + buckets.brokerage_qualified,
        params,
    );

    // 7. Totals
    let ordinary_tax = sum_tax(&ordinary);
    let qualified_dividend_tax = sum_tax(&qualified);
    let capital_gains_tax = sum_tax(&capital_gains);
    let preferential_tax = qualified_dividend_tax + capital_gains_tax;
    let total_federal_tax = ordinary_tax + preferential_tax;

    // 8. Effective rate
    let taxable_withdrawals = buckets.taxable_total() + ss.taxable_amount;
    let effective_rate = if taxable_withdrawals > Decimal::ZERO {
        total_federal_tax / taxable_withdrawals
    } else {
        Decimal::ZERO
    };

    Ok(TaxResult {
        ss_annual: ss.ss_annual,
        provisional_income: ss.provisional_income,
        taxable_social_security: ss.taxable_amount,
        ordinary_taxable_income,
        standard_deduction_used,
        ordinary_after_deduction,
        ordinary_tax,
        qualified_dividend_tax,
        capital_gains_tax,
        preferential_tax,
        total_federal_tax,
        taxable_withdrawals,
        effective_rate,
        breakdown: TaxBreakdown {
            ordinary,
            qualified_dividends: qualified,
            capital_gains,
        },
    })
}

/// [`compute_tax`] wrapped in the standard output envelope.
pub fn estimate_tax(input: &TaxInput) -> WithdrawalTaxResult<ComputationOutput<TaxResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let result = compute_tax(&input.buckets, input.ss_monthly, &input.filing_parameters)?;

    if result.ss_annual > Decimal::ZERO {
        warnings.push(
            "Social Security taxability uses a simplified two-tier provisional-income \
             formula, not the full IRS worksheet."
                .into(),
        );
    }
    if result.ordinary_taxable_income < input.filing_parameters.standard_deduction
        && input.buckets.preferential_income() > Decimal::ZERO
    {
        warnings.push(format!(
            "{} of unused standard deduction is not applied to qualified dividends or capital gains.",
            input.filing_parameters.standard_deduction - result.ordinary_taxable_income
        ));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Federal income tax: provisional-income Social Security rule, standard deduction \
         against ordinary income, progressive brackets, stacked preferential bands",
        &serde_json::json!({
            "tax_year": input.filing_parameters.tax_year,
            "filing_status": input.filing_parameters.filing_status,
            "standard_deduction": input.filing_parameters.standard_deduction.to_string(),
            "cg_0pct_limit": input.filing_parameters.cg_0pct_limit.to_string(),
            "cg_15pct_limit": input.filing_parameters.cg_15pct_limit.to_string(),
            "ss_monthly": input.ss_monthly.to_string(),
        }),
        warnings,
        elapsed,
        result,
    ))
}

fn sum_tax(slices: &[BandSlice]) -> Money {
    slices.iter().map(|s| s.tax).sum()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
