//! SEC EDGAR HTTP client.
//!
//! Talks to `data.sec.gov` for XBRL facts and submissions and to
//! `www.sec.gov` for filing documents and the ticker map. SEC rejects
//! requests without a descriptive User-Agent, so one is always sent.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

use crate::error::{EdgarError, Result};
use crate::model::{CompanyFacts, CompanyInfo, FilingRef, FilingScope, pad_cik};
use crate::source::FilingSource;
use crate::tickers::{TickerCache, TickerMap};

/// Default host for the XBRL and submissions APIs.
pub const DEFAULT_DATA_URL: &str = "https://data.sec.gov";

/// Default host for filing archives and the ticker map.
pub const DEFAULT_ARCHIVES_URL: &str = "https://www.sec.gov";

/// Default User-Agent sent to SEC.
pub const DEFAULT_USER_AGENT: &str = "FinPulse/1.0 (team@example.com)";

const TICKERS_PATH: &str = "/files/company_tickers.json";
const METADATA_TIMEOUT: Duration = Duration::from_secs(30);
const DOCUMENT_TIMEOUT: Duration = Duration::from_secs(60);

/// Connection settings for [`EdgarClient`].
#[derive(Debug, Clone)]
pub struct EdgarConfig {
    pub user_agent: String,
    pub data_url: String,
    pub archives_url: String,
    /// Directory holding `company_tickers.json`; `None` disables the disk cache.
    pub cache_dir: Option<PathBuf>,
    pub metadata_timeout: Duration,
    pub document_timeout: Duration,
}

impl Default for EdgarConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            data_url: DEFAULT_DATA_URL.to_string(),
            archives_url: DEFAULT_ARCHIVES_URL.to_string(),
            cache_dir: None,
            metadata_timeout: METADATA_TIMEOUT,
            document_timeout: DOCUMENT_TIMEOUT,
        }
    }
}

impl EdgarConfig {
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Point both hosts at `base`, e.g. a local mirror.
    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        let base = base.into();
        self.data_url = base.clone();
        self.archives_url = base;
        self
    }
}

// ── EDGAR submissions payload ───────────────────────────────────────

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct Submissions {
    name: String,
    tickers: Vec<String>,
    exchanges: Vec<Option<String>>,
    sic_description: Option<String>,
    fiscal_year_end: Option<String>,
    filings: SubmissionFilings,
}

impl Submissions {
    /// `known_tickers` stands in when EDGAR lists none for the company.
    fn into_company_info(self, cik: &str, known_tickers: Vec<String>) -> CompanyInfo {
        let tickers = if self.tickers.is_empty() { known_tickers } else { self.tickers };
        CompanyInfo {
            cik: pad_cik(cik),
            name: self.name,
            tickers,
            exchanges: self.exchanges.into_iter().flatten().collect(),
            sic_description: self.sic_description.filter(|s| !s.is_empty()),
            fiscal_year_end: self.fiscal_year_end.filter(|s| !s.is_empty()),
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct SubmissionFilings {
    recent: RecentFilings,
}

/// Parallel arrays, one element per filing, newest first.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct RecentFilings {
    accession_number: Vec<String>,
    filing_date: Vec<String>,
    report_date: Vec<String>,
    form: Vec<String>,
    primary_document: Vec<String>,
}

impl RecentFilings {
    fn of_form(&self, form: &str, limit: usize) -> Vec<FilingRef> {
        let field = |column: &[String], i: usize| column.get(i).cloned().unwrap_or_default();
        self.form
            .iter()
            .enumerate()
            .filter(|(_, f)| f.as_str() == form)
            .filter(|(i, _)| self.accession_number.get(*i).is_some_and(|a| !a.is_empty()))
            .take(limit)
            .map(|(i, f)| FilingRef {
                form: f.clone(),
                filing_date: field(&self.filing_date, i),
                report_date: field(&self.report_date, i),
                accession_number: field(&self.accession_number, i),
                primary_document: field(&self.primary_document, i),
            })
            .collect()
    }
}

// ── Client ──────────────────────────────────────────────────────────

/// A [`FilingSource`] backed by the SEC EDGAR public APIs.
///
/// # Example
///
/// ```rust,ignore
/// use finpulse_edgar::{EdgarClient, EdgarConfig, FilingScope, FilingSource};
///
/// let client = EdgarClient::new(EdgarConfig::default().with_user_agent("Acme research ops@acme.test"))?;
/// let cik = client.resolve_identifier("AAPL").await?.unwrap();
/// let filings = client.list_filings(&cik, FilingScope::Quarterly, 3).await?;
/// ```
pub struct EdgarClient {
    http: reqwest::Client,
    config: EdgarConfig,
    tickers: OnceCell<TickerMap>,
}

impl EdgarClient {
    /// Create a client from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`EdgarError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: EdgarConfig) -> Result<Self> {
        let http = reqwest::Client::builder().user_agent(config.user_agent.clone()).build().map_err(
            |source| EdgarError::Transport { url: config.data_url.clone(), source },
        )?;
        Ok(Self { http, config, tickers: OnceCell::new() })
    }

    pub fn config(&self) -> &EdgarConfig {
        &self.config
    }

    async fn send(&self, url: &str, timeout: Duration) -> Result<reqwest::Response> {
        debug!(url, "EDGAR request");
        let response = self.http.get(url).timeout(timeout).send().await.map_err(|source| {
            error!(url, error = %source, "EDGAR request failed");
            EdgarError::Transport { url: url.to_string(), source }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(EdgarError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            error!(url, %status, "EDGAR returned an error status");
            return Err(EdgarError::Status { url: url.to_string(), status: status.as_u16() });
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.send(url, self.config.metadata_timeout).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|source| EdgarError::Transport { url: url.to_string(), source })?;
        serde_json::from_slice(&bytes).map_err(|e| {
            error!(url, error = %e, "failed to parse EDGAR response");
            EdgarError::Parse(format!("{url}: {e}"))
        })
    }

    async fn submissions(&self, cik: &str) -> Result<Submissions> {
        let url = format!("{}/submissions/CIK{}.json", self.config.data_url, pad_cik(cik));
        self.get_json(&url).await
    }

    async fn download_ticker_map(&self) -> Result<TickerMap> {
        let url = format!("{}{TICKERS_PATH}", self.config.archives_url);
        let response = self.send(&url, self.config.metadata_timeout).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|source| EdgarError::Transport { url: url.clone(), source })?;
        TickerMap::parse(&bytes)
    }

    /// The ticker map: disk cache, else a fresh download, else the built-in
    /// table. Whatever is resolved is written back to the cache.
    async fn ticker_map(&self) -> &TickerMap {
        self.tickers
            .get_or_init(|| async {
                let cache = self.config.cache_dir.as_ref().map(TickerCache::in_dir);
                if let Some(cache) = &cache {
                    if let Some(map) = cache.load().await {
                        return map;
                    }
                }

                let map = match self.download_ticker_map().await {
                    Ok(map) => {
                        info!(tickers = map.len(), "downloaded SEC ticker map");
                        map
                    }
                    Err(e) => {
                        warn!(error = %e, "ticker map download failed, using built-in table");
                        TickerMap::builtin()
                    }
                };

                if let Some(cache) = &cache {
                    if let Err(e) = cache.save(&map).await {
                        warn!(path = %cache.path().display(), error = %e, "could not cache ticker map");
                    }
                }
                map
            })
            .await
    }
}

#[async_trait]
impl FilingSource for EdgarClient {
    async fn resolve_identifier(&self, ticker: &str) -> Result<Option<String>> {
        let cik = self.ticker_map().await.lookup(ticker).map(|entry| entry.cik.clone());
        debug!(ticker, cik = ?cik, "resolved ticker");
        Ok(cik)
    }

    async fn get_facts(&self, cik: &str) -> Result<CompanyFacts> {
        let url = format!("{}/api/xbrl/companyfacts/CIK{}.json", self.config.data_url, pad_cik(cik));
        self.get_json(&url).await
    }

    async fn list_filings(
        &self,
        cik: &str,
        scope: FilingScope,
        limit: usize,
    ) -> Result<Vec<FilingRef>> {
        let submissions = self.submissions(cik).await?;
        let filings = submissions.filings.recent.of_form(scope.form(), limit);
        debug!(cik, form = scope.form(), count = filings.len(), "listed filings");
        Ok(filings)
    }

    async fn get_document_text(
        &self,
        accession_number: &str,
        primary_document: &str,
        cik: &str,
    ) -> Result<String> {
        let filing = FilingRef {
            form: String::new(),
            filing_date: String::new(),
            report_date: String::new(),
            accession_number: accession_number.to_string(),
            primary_document: primary_document.to_string(),
        };
        let url = filing.archive_url(&self.config.archives_url, cik);
        let response = self.send(&url, self.config.document_timeout).await?;
        response.text().await.map_err(|source| EdgarError::Transport { url, source })
    }

    async fn get_company_info(&self, cik: &str) -> Result<CompanyInfo> {
        let submissions = self.submissions(cik).await?;
        let known_tickers = if submissions.tickers.is_empty() {
            self.ticker_map().await.tickers_for(cik).into_iter().map(str::to_string).collect()
        } else {
            Vec::new()
        };
        Ok(submissions.into_company_info(cik, known_tickers))
    }

    fn document_url(&self, filing: &FilingRef, cik: &str) -> String {
        filing.archive_url(&self.config.archives_url, cik)
    }
}
