//! The filing-source abstraction.

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{CompanyFacts, CompanyInfo, FilingRef, FilingScope};

/// A provider of company filings and XBRL facts.
///
/// [`EdgarClient`](crate::EdgarClient) talks to SEC EDGAR; tests substitute
/// in-memory sources.
#[async_trait]
pub trait FilingSource: Send + Sync {
    /// Resolve a ticker to a 10-digit CIK, or `None` if it is unknown.
    async fn resolve_identifier(&self, ticker: &str) -> Result<Option<String>>;

    /// Fetch the company-facts payload for `cik`.
    async fn get_facts(&self, cik: &str) -> Result<CompanyFacts>;

    /// List up to `limit` of the most recent filings of `scope`, newest first.
    async fn list_filings(
        &self,
        cik: &str,
        scope: FilingScope,
        limit: usize,
    ) -> Result<Vec<FilingRef>>;

    /// Fetch the raw primary document of a filing.
    async fn get_document_text(
        &self,
        accession_number: &str,
        primary_document: &str,
        cik: &str,
    ) -> Result<String>;

    /// Fetch descriptive company details.
    async fn get_company_info(&self, cik: &str) -> Result<CompanyInfo>;

    /// URL a reader can follow to the filing's primary document.
    fn document_url(&self, filing: &FilingRef, cik: &str) -> String {
        filing.archive_url(crate::client::DEFAULT_ARCHIVES_URL, cik)
    }
}
