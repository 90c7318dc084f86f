use chrono::{Local, NaiveDate};
use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::info;

use withdrawal_tax_core::estimator::{estimate_withdrawal_tax, EstimateInput};
use withdrawal_tax_core::income::{needs_market_data, HistoryPresenceInference};
use withdrawal_tax_core::market_data::MarketDataLookup;

use crate::commands::{read_filing_parameters, MarketArgs};
use crate::config::Settings;
use crate::input::{self, PortfolioInput};
use crate::market;

/// Arguments for the withdrawal and federal tax estimate
#[derive(Args)]
pub struct EstimateArgs {
    /// Portfolio file (.csv or .json); reads stdin when omitted
    pub portfolio: Option<String>,

    /// Monthly Social Security benefit
    #[arg(long, allow_hyphen_values = true)]
    pub ss_monthly: Option<Decimal>,

    /// Additional realized long-term capital gains for the year
    #[arg(long, allow_hyphen_values = true)]
    pub extra_ltcg: Option<Decimal>,

    /// Show how each component fills the tax bands
    #[arg(long)]
    pub breakdown: bool,

    /// Date the trailing-12-month dividend window ends on (YYYY-MM-DD)
    #[arg(long)]
    pub as_of: Option<NaiveDate>,

    /// Filing parameters JSON file (defaults to 2026 single filer)
    #[arg(long)]
    pub params: Option<String>,

    #[command(flatten)]
    pub market: MarketArgs,
}

pub fn run_estimate(args: EstimateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let today = Local::now().date_naive();
    let params = args.params.as_deref().map(read_filing_parameters).transpose()?;

    let (input, embedded) = match input::read_portfolio(args.portfolio.as_deref())? {
        PortfolioInput::Holdings(holdings) => {
            let mut input = EstimateInput::new(holdings, args.as_of.unwrap_or(today));
            if let Some(p) = params {
                input.filing_parameters = p;
            }
            (input, None)
        }
        PortfolioInput::Source(source) => {
            let (mut input, market_data) = source.into_parts(today)?;
            if let Some(as_of) = args.as_of {
                input.as_of = as_of;
            }
            if let Some(p) = params {
                input.filing_parameters = p;
            }
            (input, Some(market_data).filter(|m| !m.is_empty()))
        }
    };
    let input = EstimateInput {
        ss_monthly: args.ss_monthly.unwrap_or(input.ss_monthly),
        additional_ltcg: args.extra_ltcg.unwrap_or(input.additional_ltcg),
        ..input
    };

    info!(
        holdings = input.holdings.len(),
        as_of = %input.as_of,
        tax_year = input.filing_parameters.tax_year,
        "estimating withdrawals"
    );

    let result = match embedded {
        Some(market_data) => {
            info!(tickers = market_data.len(), "using market data supplied with the request");
            run(&input, &market_data)?
        }
        None => {
            let settings = Settings::from_env()?.with_market_args(&args.market)?;
            let tickers = input
                .holdings
                .iter()
                .filter(|h| needs_market_data(h))
                .map(|h| h.ticker.as_str());
            let cache = market::prepare_cache(&settings, &args.market, tickers)?;
            run(&input, &cache)?
        }
    };
    Ok(result)
}

fn run(input: &EstimateInput, lookup: &dyn MarketDataLookup) -> Result<Value, Box<dyn std::error::Error>> {
    let output = estimate_withdrawal_tax(input, lookup, &HistoryPresenceInference)?;
    Ok(serde_json::to_value(output)?)
}
