mod commands;
mod config;
mod input;
mod market;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::beta::BetaArgs;
use commands::estimate::EstimateArgs;
use commands::params::ParamsArgs;
use commands::tax::TaxArgs;
use output::RenderOptions;

const DEFAULT_LOG_FILTER: &str = "wtax=info,withdrawal_tax_cli=info,reqwest=warn";
const VERBOSE_LOG_FILTER: &str = "wtax=debug,withdrawal_tax_cli=debug,reqwest=info";

/// Retirement withdrawal income and federal tax estimates
#[derive(Parser)]
#[command(
    name = "wtax",
    version,
    about = "Retirement withdrawal income and federal tax estimates",
    long_about = "Estimates the annual and monthly income a portfolio yields across \
                  deferred, brokerage and Roth accounts, and the federal income tax \
                  on it: Social Security taxability, standard deduction, ordinary \
                  brackets, and stacked qualified-dividend and capital-gain bands. \
                  All arithmetic is exact decimal."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (estimate and beta default to report, others to json)
    #[arg(long, global = true)]
    output: Option<OutputFormat>,

    /// Debug logging on stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate withdrawals and federal tax for a portfolio
    Estimate(EstimateArgs),
    /// Compute federal tax for explicit income buckets
    Tax(TaxArgs),
    /// Value-weighted portfolio beta, overall and per account type
    Beta(BetaArgs),
    /// Show (or validate) the filing parameters in use
    Params(ParamsArgs),
    /// Print version information
    Version,
}

impl Commands {
    fn default_format(&self) -> OutputFormat {
        match self {
            Commands::Estimate(_) | Commands::Beta(_) => OutputFormat::Report,
            _ => OutputFormat::Json,
        }
    }

    fn render_options(&self) -> RenderOptions {
        let breakdown = match self {
            Commands::Estimate(args) => args.breakdown,
            Commands::Tax(args) => args.breakdown,
            _ => false,
        };
        RenderOptions { breakdown }
    }
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Report,
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        VERBOSE_LOG_FILTER
    } else {
        DEFAULT_LOG_FILTER
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn main() {
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if let Ok(path) = dotenv {
        debug!(path = %path.display(), "loaded .env");
    }

    let format = cli
        .output
        .clone()
        .unwrap_or_else(|| cli.command.default_format());
    let options = cli.command.render_options();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Estimate(args) => commands::estimate::run_estimate(args),
        Commands::Tax(args) => commands::tax::run_tax(args),
        Commands::Beta(args) => commands::beta::run_beta(args),
        Commands::Params(args) => commands::params::run_params(args),
        Commands::Version => {
            println!("wtax {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&format, &value, options);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
