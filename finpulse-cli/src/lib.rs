//! FinPulse CLI
//!
//! Financial reports for US-listed companies from SEC EDGAR filings.
//!
//! # Usage
//!
//! ```bash
//! # Quarterly report with the default query
//! finpulse report --ticker AAPL
//!
//! # Annual report as JSON
//! finpulse report --ticker MSFT --scope 10-K --query "cloud revenue growth" --json
//!
//! # Company details and recent filings
//! finpulse info --ticker NVDA
//! finpulse filings --ticker NVDA --limit 8 --between "2024-01-01 to 2024-12-31"
//!
//! # Drop cached indexes
//! finpulse clear-cache --ticker AAPL
//! ```

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use finpulse_edgar::FilingScope;
use finpulse_report::{DEFAULT_QUERY, parse_scope};

pub mod commands;
pub mod printer;

/// FinPulse command line interface
#[derive(Parser, Debug)]
#[command(name = "finpulse")]
#[command(author, version, about = "AI-assisted financial reports from SEC filings")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Directory for the ticker map and persisted indexes
    #[arg(long, global = true, env = "FINPULSE_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Reference date for the KPI window (YYYY-MM-DD, default today)
    #[arg(long, global = true, value_parser = parse_as_of)]
    pub as_of: Option<NaiveDate>,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a report for a company
    Report(ReportArgs),

    /// Show company details
    Info(InfoArgs),

    /// List recent filings
    Filings(FilingsArgs),

    /// Remove cached indexes
    ClearCache(ClearCacheArgs),
}

/// Arguments for the report command
#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Ticker symbol, e.g. AAPL
    #[arg(short, long)]
    pub ticker: String,

    /// Filing scope: 10Q or 10K
    #[arg(short, long, default_value = "10Q", value_parser = parse_scope)]
    pub scope: FilingScope,

    /// Question the narrative should answer
    #[arg(short, long, default_value = DEFAULT_QUERY)]
    pub query: String,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the info command
#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Ticker symbol
    #[arg(short, long)]
    pub ticker: String,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the filings command
#[derive(Args, Debug)]
pub struct FilingsArgs {
    /// Ticker symbol
    #[arg(short, long)]
    pub ticker: String,

    /// Filing scope: 10Q or 10K
    #[arg(short, long, default_value = "10Q", value_parser = parse_scope)]
    pub scope: FilingScope,

    /// Maximum filings to list
    #[arg(short, long, default_value = "5")]
    pub limit: usize,

    /// Only filings whose period ends in this range, e.g. "2024-01-01 to 2024-12-31"
    #[arg(long)]
    pub between: Option<String>,

    /// Show which calendar quarters of this year have a filing
    #[arg(long)]
    pub year: Option<i32>,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the clear-cache command
#[derive(Args, Debug)]
pub struct ClearCacheArgs {
    /// Only this ticker (all companies when omitted)
    #[arg(short, long)]
    pub ticker: Option<String>,
}

fn parse_as_of(raw: &str) -> Result<NaiveDate, String> {
    finpulse_edgar::dates::parse_date(raw).map_err(|e| e.to_string())
}
