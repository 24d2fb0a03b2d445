//! SEC EDGAR access for FinPulse.
//!
//! - [`FilingSource`]: the async seam the report pipeline depends on
//! - [`EdgarClient`]: the HTTP implementation, with a self-healing ticker map cache
//! - [`KpiExtractor`]: latest-quarter KPIs and trailing revenue from XBRL facts
//! - [`text`]: HTML stripping and the text revenue fallback
//! - [`dates`]: filing period helpers

pub mod client;
pub mod dates;
pub mod error;
pub mod kpi;
pub mod model;
pub mod source;
pub mod text;
pub mod tickers;

pub use client::{EdgarClient, EdgarConfig};
pub use error::{EdgarError, Result};
pub use kpi::{KpiExtractor, TRAILING_REVENUE, format_currency};
pub use model::{
    CompanyFacts, CompanyInfo, Concept, FactObservation, FilingRef, FilingScope, KpiMap, KpiRecord,
    pad_cik,
};
pub use source::FilingSource;
pub use text::{TextRevenue, extract_revenue_from_text, html_to_text};
pub use tickers::{TickerCache, TickerMap};
