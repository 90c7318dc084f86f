use clap::Args;
use serde_json::Value;
use tracing::info;

use withdrawal_tax_core::beta::{portfolio_beta, PortfolioBeta};
use withdrawal_tax_core::portfolio::Holding;
use withdrawal_tax_core::ComputationOutput;

use crate::commands::MarketArgs;
use crate::config::Settings;
use crate::input::{self, PortfolioInput};
use crate::market;

/// Arguments for the value-weighted portfolio beta
#[derive(Args)]
pub struct BetaArgs {
    /// Portfolio file (.csv or .json); reads stdin when omitted
    pub portfolio: Option<String>,

    #[command(flatten)]
    pub market: MarketArgs,
}

pub fn run_beta(args: BetaArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let output = match input::read_portfolio(args.portfolio.as_deref())? {
        PortfolioInput::Source(source) if !source.market_data.is_empty() => {
            let (input, market_data) = source.into_parts(chrono::Local::now().date_naive())?;
            info!(tickers = market_data.len(), "using market data supplied with the request");
            portfolio_beta(&input.holdings, &market_data)?
        }
        PortfolioInput::Source(source) => {
            let (input, _) = source.into_parts(chrono::Local::now().date_naive())?;
            beta_from_cache(&input.holdings, &args.market)?
        }
        PortfolioInput::Holdings(holdings) => beta_from_cache(&holdings, &args.market)?,
    };
    Ok(serde_json::to_value(output)?)
}

fn beta_from_cache(
    holdings: &[Holding],
    market_args: &MarketArgs,
) -> Result<ComputationOutput<PortfolioBeta>, Box<dyn std::error::Error>> {
    let settings = Settings::from_env()?.with_market_args(market_args)?;
    let tickers = holdings
        .iter()
        .filter(|h| needs_beta_data(h))
        .map(|h| h.ticker.as_str());
    let cache = market::prepare_cache(&settings, market_args, tickers)?;
    Ok(portfolio_beta(holdings, &cache)?)
}

fn needs_beta_data(holding: &Holding) -> bool {
    holding.beta.is_none() || (holding.price.is_none() && holding.market_value.is_none())
}
