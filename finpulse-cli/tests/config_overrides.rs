//! Command-line flags override environment configuration.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;
use finpulse_cli::Cli;
use finpulse_cli::commands::load_config;

#[test]
fn flags_override_environment() {
    let cli = Cli::try_parse_from([
        "finpulse",
        "filings",
        "--ticker",
        "AAPL",
        "--cache-dir",
        "/tmp/finpulse-test-cache",
        "--as-of",
        "2024-11-01",
    ])
    .unwrap();

    let config = load_config(&cli.global).unwrap();
    assert_eq!(config.cache_dir, PathBuf::from("/tmp/finpulse-test-cache"));
    assert_eq!(config.as_of, NaiveDate::from_ymd_opt(2024, 11, 1));
    assert_eq!(config.index_dir(), PathBuf::from("/tmp/finpulse-test-cache/index"));
}

#[test]
fn between_must_be_a_range() {
    let cli = Cli::try_parse_from(["finpulse", "filings", "-t", "AAPL", "--between", "2024"]).unwrap();
    let finpulse_cli::Commands::Filings(args) = cli.command else { panic!("expected filings") };
    assert!(finpulse_edgar::dates::parse_date_range(args.between.as_deref().unwrap()).is_err());
}
