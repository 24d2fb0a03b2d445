//! Data types exchanged with the filing source.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{EdgarError, Result};

/// The kind of periodic filing a report is built from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilingScope {
    /// Quarterly report (10-Q).
    #[default]
    #[serde(rename = "10-Q")]
    Quarterly,
    /// Annual report (10-K).
    #[serde(rename = "10-K")]
    Annual,
}

impl FilingScope {
    /// The SEC form type for this scope.
    pub fn form(&self) -> &'static str {
        match self {
            FilingScope::Quarterly => "10-Q",
            FilingScope::Annual => "10-K",
        }
    }

    /// Compact form used in cache file names.
    pub fn slug(&self) -> &'static str {
        match self {
            FilingScope::Quarterly => "10Q",
            FilingScope::Annual => "10K",
        }
    }
}

impl fmt::Display for FilingScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.form())
    }
}

impl FromStr for FilingScope {
    type Err = EdgarError;

    /// Accepts `10Q`, `10-Q`, `10K` and `10-K`, case-insensitively.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().replace('-', "").as_str() {
            "10Q" => Ok(FilingScope::Quarterly),
            "10K" => Ok(FilingScope::Annual),
            other => Err(EdgarError::Parse(format!("unknown filing scope '{other}'"))),
        }
    }
}

/// Zero-pad a CIK to the 10 digits EDGAR uses in URLs.
pub fn pad_cik(cik: &str) -> String {
    format!("{:0>10}", cik.trim())
}

/// A filing listed in a company's submissions history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilingRef {
    /// Form type, e.g. `10-Q`.
    pub form: String,
    /// Date the filing was accepted (`YYYY-MM-DD`).
    pub filing_date: String,
    /// Period of report (`YYYY-MM-DD`), empty if EDGAR omits it.
    pub report_date: String,
    /// Accession number with dashes, e.g. `0000320193-24-000123`.
    pub accession_number: String,
    /// File name of the primary document within the filing.
    pub primary_document: String,
}

impl FilingRef {
    /// Archive URL of the primary document under `base` (`https://www.sec.gov`).
    pub fn archive_url(&self, base: &str, cik: &str) -> String {
        let cik = cik.trim().trim_start_matches('0');
        let accession = self.accession_number.replace('-', "");
        format!(
            "{}/Archives/edgar/data/{cik}/{accession}/{}",
            base.trim_end_matches('/'),
            self.primary_document
        )
    }
}

/// Descriptive company details from the submissions endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyInfo {
    pub cik: String,
    pub name: String,
    pub tickers: Vec<String>,
    pub exchanges: Vec<String>,
    pub sic_description: Option<String>,
    /// Fiscal year end as `MMDD`.
    pub fiscal_year_end: Option<String>,
}

/// One reported value of an XBRL concept.
///
/// Every field is optional so a single malformed observation cannot reject a
/// whole facts payload; extraction skips observations it cannot use.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FactObservation {
    #[serde(default)]
    pub val: Option<f64>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub form: Option<String>,
    #[serde(default)]
    pub filed: Option<String>,
    #[serde(default)]
    pub accn: Option<String>,
}

/// An XBRL concept with its observations grouped by unit, in document order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Concept {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub units: IndexMap<String, Vec<FactObservation>>,
}

/// The company-facts payload (`/api/xbrl/companyfacts/CIK##########.json`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyFacts {
    #[serde(default, rename = "entityName")]
    pub entity_name: Option<String>,
    /// Taxonomy (`us-gaap`, `dei`, ...) → concept name → concept.
    #[serde(default)]
    pub facts: BTreeMap<String, BTreeMap<String, Concept>>,
}

impl CompanyFacts {
    /// Parse a facts payload from a JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| EdgarError::Parse(format!("company facts: {e}")))
    }

    /// Look up a concept in the `us-gaap` taxonomy.
    pub fn us_gaap(&self, concept: &str) -> Option<&Concept> {
        self.facts.get("us-gaap").and_then(|t| t.get(concept))
    }

    /// Whether the payload carries no facts at all.
    pub fn is_empty(&self) -> bool {
        self.facts.values().all(|t| t.is_empty())
    }
}

/// A normalized KPI extracted from company facts or filing text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiRecord {
    pub name: String,
    pub value: f64,
    /// Period end date, or a comma-separated list for derived records.
    pub period: String,
    #[serde(rename = "form")]
    pub filing_form: String,
    #[serde(rename = "filed")]
    pub filed_date: String,
}

/// KPI records keyed by metric name, in extraction order.
pub type KpiMap = IndexMap<String, KpiRecord>;
