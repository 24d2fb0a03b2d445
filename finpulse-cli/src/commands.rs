//! Command execution.

use anyhow::{Context, Result};
use chrono::Utc;
use finpulse_edgar::dates::{most_recent_period, parse_date_range};
use finpulse_report::{FinPulseConfig, ReportGenerator};
use tracing::debug;

use crate::{ClearCacheArgs, Cli, Commands, FilingsArgs, GlobalArgs, InfoArgs, ReportArgs, printer};

/// Filings whose period ended within this many days count as current.
const CURRENT_PERIOD_MAX_AGE_DAYS: i64 = 365;

/// Resolve settings from the environment, then apply command-line overrides.
pub fn load_config(global: &GlobalArgs) -> Result<FinPulseConfig> {
    let mut config = FinPulseConfig::from_env().context("failed to load configuration")?;
    if let Some(dir) = &global.cache_dir {
        config.cache_dir = dir.clone();
    }
    if let Some(as_of) = global.as_of {
        config.as_of = Some(as_of);
    }
    Ok(config)
}

pub async fn execute(cli: Cli) -> Result<()> {
    let config = load_config(&cli.global)?;
    debug!(cache_dir = %config.cache_dir.display(), "loaded configuration");
    let generator = ReportGenerator::from_config(config)?;

    match cli.command {
        Commands::Report(args) => execute_report(&generator, args).await,
        Commands::Info(args) => execute_info(&generator, args).await,
        Commands::Filings(args) => execute_filings(&generator, args).await,
        Commands::ClearCache(args) => execute_clear_cache(&generator, args).await,
    }
}

async fn execute_report(generator: &ReportGenerator, args: ReportArgs) -> Result<()> {
    let report = generator
        .generate_report(&args.ticker, args.scope, &args.query)
        .await
        .with_context(|| format!("could not generate a report for {}", args.ticker.trim()))?;

    if args.json {
        println!("{}", report.to_json()?);
    } else {
        println!("{}", report.to_markdown());
    }
    Ok(())
}

async fn execute_info(generator: &ReportGenerator, args: InfoArgs) -> Result<()> {
    let info = generator
        .get_company_info(&args.ticker)
        .await
        .with_context(|| format!("could not look up {}", args.ticker.trim()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        print!("{}", printer::company_info(&info));
    }
    Ok(())
}

async fn execute_filings(generator: &ReportGenerator, args: FilingsArgs) -> Result<()> {
    let range = args.between.as_deref().map(parse_date_range).transpose()?;

    let mut filings = generator
        .list_available_filings(&args.ticker, args.scope, args.limit)
        .await
        .with_context(|| format!("could not list filings for {}", args.ticker.trim()))?;
    if let Some(range) = range {
        filings = printer::within_range(filings, range);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&filings)?);
        return Ok(());
    }

    print!("{}", printer::filings_table(&filings));
    let as_of = generator.config().as_of.unwrap_or_else(|| Utc::now().date_naive());
    let periods = filings.iter().map(|f| f.report_date.as_str());
    match most_recent_period(periods, as_of, CURRENT_PERIOD_MAX_AGE_DAYS) {
        Some(period) => println!("\nMost recent period: {period}"),
        None => println!("\nNo period ended within {CURRENT_PERIOD_MAX_AGE_DAYS} days of {as_of}"),
    }
    if let Some(year) = args.year {
        print!("\n{}", printer::coverage_table(year, &filings));
    }
    Ok(())
}

async fn execute_clear_cache(generator: &ReportGenerator, args: ClearCacheArgs) -> Result<()> {
    let cleared = generator.clear_cache(args.ticker.as_deref()).await?;
    print!("{}", printer::cleared(args.ticker.as_deref(), cleared));
    Ok(())
}
