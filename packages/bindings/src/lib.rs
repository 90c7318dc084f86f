use chrono::Local;
use napi::Result as NapiResult;
use napi_derive::napi;

use withdrawal_tax_core::beta;
use withdrawal_tax_core::estimator::{self, EstimateSource};
use withdrawal_tax_core::income::{self, HistoryPresenceInference};
use withdrawal_tax_core::tax::{self, FilingParameters, TaxInput};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Requests without an `as_of` date are priced as of today.
fn parse_source(input_json: &str) -> NapiResult<EstimateSource> {
    serde_json::from_str(input_json).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Estimates
// ---------------------------------------------------------------------------

#[napi]
pub fn estimate_withdrawal_tax(input_json: String) -> NapiResult<String> {
    let source = parse_source(&input_json)?;
    let (input, market_data) = source
        .into_parts(Local::now().date_naive())
        .map_err(to_napi_error)?;
    let output =
        estimator::estimate_withdrawal_tax(&input, &market_data, &HistoryPresenceInference)
            .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn classify_income(input_json: String) -> NapiResult<String> {
    let source = parse_source(&input_json)?;
    let (input, market_data) = source
        .into_parts(Local::now().date_naive())
        .map_err(to_napi_error)?;
    let output = income::classify(
        &input.holdings,
        &market_data,
        input.as_of,
        input.additional_ltcg,
    )
    .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Tax
// ---------------------------------------------------------------------------

#[napi]
pub fn compute_federal_tax(input_json: String) -> NapiResult<String> {
    let input: TaxInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = tax::estimate_tax(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn default_filing_parameters() -> NapiResult<String> {
    serde_json::to_string(&FilingParameters::default()).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Beta
// ---------------------------------------------------------------------------

#[napi]
pub fn portfolio_beta(input_json: String) -> NapiResult<String> {
    let source = parse_source(&input_json)?;
    let (input, market_data) = source
        .into_parts(Local::now().date_naive())
        .map_err(to_napi_error)?;
    let output = beta::portfolio_beta(&input.holdings, &market_data).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
