//! The report pipeline.
//!
//! [`ReportGenerator::generate_report`] runs one request end to end:
//!
//! 1. validate the ticker and resolve it to a CIK
//! 2. fetch company facts and extract KPIs
//! 3. list the most recent filings of the scope
//! 4. aggregate trailing revenue, falling back to filing text
//! 5. list the analyzed filings as display sources
//! 6. build or reuse the relevance index for `(ticker, scope, cik)`
//! 7. retrieve the top excerpts for the query
//! 8. synthesize the narrative and render the KPI table
//! 9. assemble the [`Report`]
//!
//! Any failure aborts the request with the step that failed.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use finpulse_edgar::{
    CompanyInfo, EdgarClient, EdgarConfig, EdgarError, FilingRef, FilingScope, FilingSource,
    KpiExtractor, KpiRecord, TRAILING_REVENUE, extract_revenue_from_text, html_to_text,
};
use finpulse_model::{
    FALLBACK_CITATIONS, GeminiClient, GenerationService, ModelError, NarrativeSynthesizer,
    kpi_table,
};
use finpulse_rag::{JsonFileChunkStore, RelevanceIndex, RetrievalResult, SourceDocument};
use futures::future::{join_all, try_join_all};
use tracing::{debug, info, instrument, warn};

use crate::cache::{IndexCache, IndexKey};
use crate::config::FinPulseConfig;
use crate::error::{ReportError, Result, Step};
use crate::report::{Report, SourceCitation};

/// Query used when the caller does not supply one.
pub const DEFAULT_QUERY: &str = "latest quarterly performance";

/// Chunk metadata key naming the filing a chunk came from.
const META_ACCESSION_NUMBER: &str = "accession_number";

const MAX_TICKER_LEN: usize = 10;

/// What [`ReportGenerator::clear_cache`] removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClearedCache {
    /// In-memory indexes dropped.
    pub indexes_dropped: usize,
    /// Snapshot files deleted.
    pub files_removed: usize,
}

/// Stand-in used when no generation credentials are configured; every call
/// fails, so narratives use the fallback summary.
struct UnconfiguredGeneration;

#[async_trait]
impl GenerationService for UnconfiguredGeneration {
    async fn complete(&self, _prompt: &str) -> finpulse_model::Result<String> {
        Err(ModelError::ConfigError("GEMINI_API_KEY is not set".to_string()))
    }

    fn name(&self) -> &str {
        "unconfigured"
    }
}

/// Produces financial reports from a filing source and a generation service.
///
/// `Send + Sync`; share it behind an [`Arc`] to serve concurrent requests.
/// Built indexes are cached per `(ticker, scope, cik)` for the life of the
/// generator, with at most one build in flight per key.
pub struct ReportGenerator {
    source: Arc<dyn FilingSource>,
    synthesizer: NarrativeSynthesizer,
    config: FinPulseConfig,
    cache: IndexCache,
}

impl ReportGenerator {
    pub fn new(
        source: Arc<dyn FilingSource>,
        generation: Arc<dyn GenerationService>,
        config: FinPulseConfig,
    ) -> Self {
        let cache = IndexCache::new(config.eviction);
        Self { source, synthesizer: NarrativeSynthesizer::new(generation), config, cache }
    }

    /// Wire the SEC EDGAR client and, when an API key is configured, Gemini.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Config`] if either client cannot be created.
    pub fn from_config(config: FinPulseConfig) -> Result<Self> {
        let edgar_config = EdgarConfig::default()
            .with_user_agent(config.user_agent.clone())
            .with_cache_dir(config.cache_dir.clone());
        let edgar = EdgarClient::new(edgar_config).map_err(|e| ReportError::Config(e.to_string()))?;

        let generation: Arc<dyn GenerationService> = match &config.gemini_api_key {
            Some(key) => Arc::new(
                GeminiClient::new(key.clone())
                    .map_err(|e| ReportError::Config(e.to_string()))?
                    .with_model(config.gemini_model.clone()),
            ),
            None => {
                warn!("GEMINI_API_KEY not set; narratives will use the fallback summary");
                Arc::new(UnconfiguredGeneration)
            }
        };

        Ok(Self::new(Arc::new(edgar), generation, config))
    }

    pub fn config(&self) -> &FinPulseConfig {
        &self.config
    }

    fn as_of(&self) -> NaiveDate {
        self.config.as_of.unwrap_or_else(|| Utc::now().date_naive())
    }

    /// Run the full pipeline for one request.
    ///
    /// # Errors
    ///
    /// - [`ReportError::Validation`] for a blank or malformed ticker
    /// - [`ReportError::NotFound`] if the ticker or its filings do not exist
    /// - [`ReportError::Source`] / [`ReportError::Index`] for failures in a step
    ///
    /// Generation failures are not errors: the narrative falls back to a
    /// deterministic summary.
    #[instrument(skip(self))]
    pub async fn generate_report(
        &self,
        ticker: &str,
        scope: FilingScope,
        query: &str,
    ) -> Result<Report> {
        let (ticker, cik) = self.resolve(ticker).await?;
        let query = match query.trim() {
            "" => DEFAULT_QUERY,
            trimmed => trimmed,
        };
        let as_of = self.as_of();
        info!(ticker, cik, %scope, %as_of, "generating report");

        let facts =
            self.source.get_facts(&cik).await.map_err(|e| ReportError::from_source(Step::FetchFacts, e))?;
        let extractor = KpiExtractor::new(as_of);
        let mut kpis = extractor.extract_kpis(&facts);

        let filings = self.recent_filings(&cik, scope).await?;

        let mut documents = HashMap::new();
        let trailing = match extractor.trailing_revenue(&facts) {
            Some(record) => Some(record),
            None => self.text_revenue(&cik, &filings, &mut documents).await,
        };
        if let Some(record) = trailing {
            kpis.insert(TRAILING_REVENUE.to_string(), record);
        }

        let sources = filings.iter().map(|f| self.filing_source(f, &cik)).collect();

        let key = IndexKey::new(&ticker, scope, &cik);
        let index = self
            .cache
            .get_or_build(&key, || self.build_index(&key, &cik, &filings, &documents))
            .await?;

        let results = index
            .retrieve(query, index.config().top_k)
            .await
            .map_err(|e| ReportError::from_index(Step::Retrieve, e))?;
        let citations = retrieval_citations(&results);

        let narrative = self.synthesizer.summarize(&kpis, &results, query).await;
        let kpi_table = kpi_table(&kpis);

        info!(
            ticker,
            kpi_count = kpis.len(),
            filings = filings.len(),
            excerpts = results.len(),
            "report generated"
        );
        Ok(Report {
            ticker,
            cik,
            scope,
            query: query.to_string(),
            kpis,
            kpi_table,
            narrative,
            sources,
            citations,
            filings_analyzed: filings.len(),
            as_of,
            generated_at: Utc::now(),
        })
    }

    /// Descriptive details for `ticker`.
    pub async fn get_company_info(&self, ticker: &str) -> Result<CompanyInfo> {
        let (_, cik) = self.resolve(ticker).await?;
        self.source.get_company_info(&cik).await.map_err(|e| ReportError::from_source(Step::CompanyInfo, e))
    }

    /// Up to `limit` recent filings of `scope` for `ticker`, newest first.
    /// An empty list is not an error here.
    pub async fn list_available_filings(
        &self,
        ticker: &str,
        scope: FilingScope,
        limit: usize,
    ) -> Result<Vec<FilingRef>> {
        let (_, cik) = self.resolve(ticker).await?;
        self.source
            .list_filings(&cik, scope, limit)
            .await
            .map_err(|e| ReportError::from_source(Step::ListFilings, e))
    }

    /// Drop cached indexes and their snapshot files, for `ticker` or for all
    /// companies.
    pub async fn clear_cache(&self, ticker: Option<&str>) -> Result<ClearedCache> {
        let ticker = ticker.map(validate_ticker).transpose()?;
        let dropped = self.cache.remove(ticker.as_deref()).await;

        let dir = self.config.index_dir();
        let io_error = |source: std::io::Error| ReportError::Io {
            step: Step::ClearCache,
            path: dir.display().to_string(),
            source,
        };
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ClearedCache { indexes_dropped: dropped.len(), files_removed: 0 });
            }
            Err(e) => return Err(io_error(e)),
        };

        let prefix = ticker.map(|t| format!("{t}_"));
        let mut files_removed = 0;
        while let Some(entry) = entries.next_entry().await.map_err(io_error)? {
            let name = entry.file_name().to_string_lossy().into_owned();
            let matches_ticker = prefix.as_ref().is_none_or(|p| name.starts_with(p.as_str()));
            let snapshot = name.ends_with(".json") || name.ends_with(".json.tmp");
            if snapshot && matches_ticker {
                tokio::fs::remove_file(entry.path()).await.map_err(io_error)?;
                files_removed += 1;
            }
        }

        info!(indexes_dropped = dropped.len(), files_removed, "cleared index cache");
        Ok(ClearedCache { indexes_dropped: dropped.len(), files_removed })
    }

    async fn resolve(&self, ticker: &str) -> Result<(String, String)> {
        let ticker = validate_ticker(ticker)?;
        let cik = self
            .source
            .resolve_identifier(&ticker)
            .await
            .map_err(|e| ReportError::from_source(Step::ResolveCompany, e))?
            .ok_or_else(|| ReportError::NotFound {
                step: Step::ResolveCompany,
                message: format!("no CIK found for ticker '{ticker}'"),
            })?;
        debug!(ticker, cik, "resolved company");
        Ok((ticker, cik))
    }

    async fn recent_filings(&self, cik: &str, scope: FilingScope) -> Result<Vec<FilingRef>> {
        let filings = self
            .source
            .list_filings(cik, scope, self.config.filings_limit)
            .await
            .map_err(|e| ReportError::from_source(Step::ListFilings, e))?;
        if filings.is_empty() {
            return Err(ReportError::NotFound {
                step: Step::ListFilings,
                message: format!("no {scope} filings found for CIK {cik}"),
            });
        }
        Ok(filings)
    }

    async fn fetch_text(&self, cik: &str, filing: &FilingRef) -> finpulse_edgar::Result<String> {
        let html = self
            .source
            .get_document_text(&filing.accession_number, &filing.primary_document, cik)
            .await?;
        Ok(html_to_text(&html))
    }

    /// Best-effort revenue from filing text. Fetched texts are kept in
    /// `documents` for the index build; fetch failures are logged and skipped.
    async fn text_revenue(
        &self,
        cik: &str,
        filings: &[FilingRef],
        documents: &mut HashMap<String, String>,
    ) -> Option<KpiRecord> {
        let fetched = join_all(filings.iter().map(|f| self.fetch_text(cik, f))).await;

        let mut found = None;
        for (filing, text) in filings.iter().zip(fetched) {
            let text = match text {
                Ok(text) => text,
                Err(e) => {
                    warn!(
                        accession = %filing.accession_number,
                        error = %e,
                        "filing document unavailable for text revenue"
                    );
                    continue;
                }
            };
            if found.is_none() {
                if let Some(revenue) = extract_revenue_from_text(&text) {
                    debug!(accession = %filing.accession_number, matched = %revenue.matched, "revenue found in filing text");
                    found = Some(KpiRecord {
                        name: TRAILING_REVENUE.to_string(),
                        value: revenue.value,
                        period: filing.report_date.clone(),
                        filing_form: format!("{} (text)", filing.form),
                        filed_date: filing.filing_date.clone(),
                    });
                }
            }
            documents.insert(filing.accession_number.clone(), text);
        }
        found
    }

    fn filing_source(&self, filing: &FilingRef, cik: &str) -> SourceCitation {
        let label = if filing.report_date.is_empty() {
            format!("{} filed {}", filing.form, filing.filing_date)
        } else {
            format!("{} filed {} (period {})", filing.form, filing.filing_date, filing.report_date)
        };
        SourceCitation { label, url: self.source.document_url(filing, cik), score: 1.0 }
    }

    async fn build_index(
        &self,
        key: &IndexKey,
        cik: &str,
        filings: &[FilingRef],
        prefetched: &HashMap<String, String>,
    ) -> Result<Arc<RelevanceIndex>> {
        let mut builder = RelevanceIndex::builder().config(self.config.index.clone());
        if self.config.persist_indexes {
            let path = self.config.index_dir().join(key.file_name());
            builder = builder.store(Arc::new(JsonFileChunkStore::new(path)));
        }
        let index = builder.build().await.map_err(|e| ReportError::from_index(Step::BuildIndex, e))?;

        let stats = index.stats().await;
        if stats.total_chunks > 0 {
            let indexed = index.metadata_values(META_ACCESSION_NUMBER).await;
            let current: BTreeSet<String> = filings.iter().map(|f| f.accession_number.clone()).collect();
            if indexed == current {
                info!(key = %key, chunks = stats.total_chunks, "reusing persisted index");
                return Ok(Arc::new(index));
            }
            info!(
                key = %key,
                indexed = indexed.len(),
                current = current.len(),
                "persisted index covers other filings, rebuilding"
            );
            index.clear().await.map_err(|e| ReportError::from_index(Step::BuildIndex, e))?;
        }

        let missing = filings.iter().filter(|f| !prefetched.contains_key(&f.accession_number));
        let fetched: HashMap<&str, String> = try_join_all(missing.map(|filing| async move {
            let text = self.fetch_text(cik, filing).await?;
            Ok::<_, EdgarError>((filing.accession_number.as_str(), text))
        }))
        .await
        .map_err(|e| ReportError::from_source(Step::FetchDocuments, e))?
        .into_iter()
        .collect();

        let mut documents = Vec::with_capacity(filings.len());
        let mut metadata = Vec::with_capacity(filings.len());
        for filing in filings {
            let text = prefetched
                .get(&filing.accession_number)
                .or_else(|| fetched.get(filing.accession_number.as_str()))
                .cloned()
                .unwrap_or_default();
            documents.push(SourceDocument::new(text, self.source.document_url(filing, cik)));
            metadata.push(BTreeMap::from([
                ("form".to_string(), filing.form.clone()),
                ("filing_date".to_string(), filing.filing_date.clone()),
                ("report_date".to_string(), filing.report_date.clone()),
                (META_ACCESSION_NUMBER.to_string(), filing.accession_number.clone()),
            ]));
        }

        let chunk_count = index
            .index(&documents, Some(metadata.as_slice()))
            .await
            .map_err(|e| ReportError::from_index(Step::BuildIndex, e))?;
        info!(key = %key, documents = documents.len(), chunk_count, "built relevance index");
        Ok(Arc::new(index))
    }
}

/// Reject blank or implausible tickers before any network call.
pub fn validate_ticker(raw: &str) -> Result<String> {
    let ticker = raw.trim().to_uppercase();
    if ticker.is_empty() {
        return Err(ReportError::Validation("ticker must not be empty".to_string()));
    }
    let plausible = ticker.len() <= MAX_TICKER_LEN
        && ticker.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    if !plausible {
        return Err(ReportError::Validation(format!("'{}' is not a valid ticker", raw.trim())));
    }
    Ok(ticker)
}

/// Parse a filing scope (`10Q`, `10-Q`, `10K`, `10-K`).
pub fn parse_scope(raw: &str) -> Result<FilingScope> {
    raw.parse().map_err(|_| {
        ReportError::Validation(format!("unknown filing scope '{}', expected 10Q or 10K", raw.trim()))
    })
}

fn retrieval_citations(results: &[RetrievalResult]) -> Vec<SourceCitation> {
    if results.is_empty() {
        return FALLBACK_CITATIONS
            .iter()
            .enumerate()
            .map(|(i, (description, url))| SourceCitation {
                label: format!("[S{}] {description}", i + 1),
                url: url.to_string(),
                score: 0.0,
            })
            .collect();
    }
    results
        .iter()
        .enumerate()
        .map(|(i, r)| SourceCitation {
            label: format!("[S{}]", i + 1),
            url: r.source_url.clone(),
            score: r.score,
        })
        .collect()
}
