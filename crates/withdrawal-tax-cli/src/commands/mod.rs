pub mod beta;
pub mod estimate;
pub mod params;
pub mod tax;

use clap::Args;

use withdrawal_tax_core::tax::FilingParameters;

use crate::input;

/// Market-data flags shared by commands that price holdings.
#[derive(Args, Debug, Clone, Default)]
pub struct MarketArgs {
    /// Refetch every ticker even when the cache is fresh
    #[arg(long)]
    pub refresh: bool,

    /// Never touch the network; use whatever is cached
    #[arg(long, conflicts_with = "refresh")]
    pub offline: bool,

    /// Ticker cache file [env: WTAX_CACHE_FILE]
    #[arg(long)]
    pub cache_file: Option<String>,

    /// Maximum cache age before refetching [env: WTAX_CACHE_MAX_AGE_HOURS]
    #[arg(long)]
    pub max_age_hours: Option<i64>,
}

/// Filing parameters from `--params`, validated, or the built-in preset.
pub fn load_filing_parameters(
    path: Option<&str>,
) -> Result<FilingParameters, Box<dyn std::error::Error>> {
    path.map(read_filing_parameters)
        .unwrap_or_else(|| Ok(FilingParameters::default()))
}

/// Load and validate a filing-parameter JSON file.
pub fn read_filing_parameters(path: &str) -> Result<FilingParameters, Box<dyn std::error::Error>> {
    let params: FilingParameters = input::file::read_json(path)?;
    params.validate()?;
    Ok(params)
}
