use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use withdrawal_tax_core::income::{IncomeBucket, IncomeBuckets};
use withdrawal_tax_core::tax::{estimate_tax, TaxInput};

use crate::commands::read_filing_parameters;
use crate::input;

/// Arguments for a tax computation on explicit income buckets
#[derive(Args)]
pub struct TaxArgs {
    /// Path to JSON input file (buckets, ss_monthly, filing_parameters)
    #[arg(long)]
    pub input: Option<String>,

    /// Deferred-account withdrawals (ordinary income)
    #[arg(long, allow_hyphen_values = true)]
    pub deferred_ordinary: Option<Decimal>,

    /// Brokerage non-qualified dividends and interest
    #[arg(long, allow_hyphen_values = true)]
    pub brokerage_ordinary: Option<Decimal>,

    /// Brokerage qualified dividends
    #[arg(long, allow_hyphen_values = true)]
    pub qualified: Option<Decimal>,

    /// Brokerage long-term capital gains
    #[arg(long, allow_hyphen_values = true)]
    pub capital_gains: Option<Decimal>,

    /// Roth withdrawals (never taxed)
    #[arg(long, allow_hyphen_values = true)]
    pub roth: Option<Decimal>,

    /// Monthly Social Security benefit
    #[arg(long, allow_hyphen_values = true)]
    pub ss_monthly: Option<Decimal>,

    /// Show how each component fills the tax bands
    #[arg(long)]
    pub breakdown: bool,

    /// Filing parameters JSON file (defaults to 2026 single filer)
    #[arg(long)]
    pub params: Option<String>,
}

impl TaxArgs {
    fn bucket_flags(&self) -> [(IncomeBucket, Option<Decimal>); 5] {
        [
            (IncomeBucket::DeferredOrdinary, self.deferred_ordinary),
            (IncomeBucket::BrokerageOrdinary, self.brokerage_ordinary),
            (IncomeBucket::BrokerageQualified, self.qualified),
            (IncomeBucket::BrokerageCapitalGains, self.capital_gains),
            (IncomeBucket::RothTaxfree, self.roth),
        ]
    }
}

pub fn run_tax(args: TaxArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let has_flags = args.bucket_flags().iter().any(|(_, v)| v.is_some());

    let mut tax_input: TaxInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if has_flags || args.ss_monthly.is_some() {
        TaxInput::default()
    } else if let Some(data) = input::stdin::read_stdin_json()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input <file.json>, bucket flags, or stdin required for tax".into());
    };

    // Explicit flags replace whatever the file said for that bucket.
    tax_input.buckets = apply_flags(tax_input.buckets, &args);
    if let Some(ss) = args.ss_monthly {
        tax_input.ss_monthly = ss;
    }
    if let Some(ref path) = args.params {
        tax_input.filing_parameters = read_filing_parameters(path)?;
    }

    let result = estimate_tax(&tax_input)?;
    Ok(serde_json::to_value(result)?)
}

fn apply_flags(mut buckets: IncomeBuckets, args: &TaxArgs) -> IncomeBuckets {
    for (bucket, value) in args.bucket_flags() {
        if let Some(amount) = value {
            buckets.set(bucket, amount);
        }
    }
    buckets
}
