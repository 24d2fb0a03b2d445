//! Report orchestration for FinPulse.
//!
//! [`ReportGenerator`] turns `(ticker, scope, query)` into a [`Report`]:
//! KPIs from XBRL facts, excerpts retrieved from the most recent filings and
//! a cited narrative. Indexes are built once per `(ticker, scope, cik)` and
//! shared across requests.
//!
//! ```rust,no_run
//! use finpulse_report::{DEFAULT_QUERY, FinPulseConfig, ReportGenerator, parse_scope};
//!
//! # async fn run() -> finpulse_report::Result<()> {
//! let generator = ReportGenerator::from_config(FinPulseConfig::from_env()?)?;
//! let report = generator.generate_report("AAPL", parse_scope("10Q")?, DEFAULT_QUERY).await?;
//! println!("{}", report.to_markdown());
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod generator;
pub mod report;

pub use cache::{EvictionPolicy, IndexCache, IndexKey};
pub use config::{FinPulseConfig, FinPulseConfigBuilder};
pub use error::{ReportError, Result, Step};
pub use generator::{ClearedCache, DEFAULT_QUERY, ReportGenerator, parse_scope, validate_ticker};
pub use report::{Report, SourceCitation};
