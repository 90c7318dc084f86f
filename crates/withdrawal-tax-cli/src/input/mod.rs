pub mod file;
pub mod stdin;

use serde_json::Value;

use withdrawal_tax_core::estimator::EstimateSource;
use withdrawal_tax_core::portfolio::{parse_records, Holding, HoldingRecord};

/// A portfolio as supplied on the command line.
pub enum PortfolioInput {
    /// Bare holding rows (CSV file or JSON array); prices come from the cache.
    Holdings(Vec<Holding>),
    /// Self-contained request carrying its own market data and settings.
    Source(Box<EstimateSource>),
}

/// Read the portfolio from `path`, or from piped stdin when no path is given.
pub fn read_portfolio(path: Option<&str>) -> Result<PortfolioInput, Box<dyn std::error::Error>> {
    match path {
        Some(p) if file::is_csv(p) => {
            let records = file::read_csv_records(p)?;
            Ok(PortfolioInput::Holdings(parse_records(records)?))
        }
        Some(p) => portfolio_from_value(file::read_json_value(p)?),
        None => match stdin::read_stdin()? {
            Some(stdin::Piped::Json(value)) => portfolio_from_value(value),
            Some(stdin::Piped::Csv(text)) => {
                let records = file::parse_csv_records(text.as_bytes())?;
                Ok(PortfolioInput::Holdings(parse_records(records)?))
            }
            None => Err("portfolio file (.csv or .json) or data on stdin required".into()),
        },
    }
}

/// A JSON array is a list of holding rows; an object is a full request.
pub fn portfolio_from_value(value: Value) -> Result<PortfolioInput, Box<dyn std::error::Error>> {
    match value {
        Value::Array(_) => {
            let records: Vec<HoldingRecord> = serde_json::from_value(value)?;
            Ok(PortfolioInput::Holdings(parse_records(records)?))
        }
        Value::Object(ref map) if map.contains_key("holdings") => {
            Ok(PortfolioInput::Source(Box::new(serde_json::from_value(value)?)))
        }
        _ => Err("expected a JSON array of holdings or an object with a \"holdings\" field".into()),
    }
}
