use clap::Args;
use serde_json::{json, Value};

use crate::commands::load_filing_parameters;

/// Arguments for showing the active filing parameters
#[derive(Args)]
pub struct ParamsArgs {
    /// Filing parameters JSON file to validate and show instead of the preset
    #[arg(long)]
    pub params: Option<String>,
}

pub fn run_params(args: ParamsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let params = load_filing_parameters(args.params.as_deref())?;
    let source = args.params.as_deref().unwrap_or("built-in");
    Ok(json!({
        "result": params,
        "methodology": format!("Filing parameters ({source})"),
        "warnings": [],
    }))
}
