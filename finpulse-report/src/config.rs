//! Orchestrator configuration.

use std::path::PathBuf;

use chrono::NaiveDate;
use finpulse_edgar::client::DEFAULT_USER_AGENT;
use finpulse_model::gemini::DEFAULT_MODEL;
use finpulse_rag::IndexConfig;

use crate::cache::EvictionPolicy;
use crate::error::{ReportError, Result};

/// Default directory for the ticker map and persisted indexes.
pub const DEFAULT_CACHE_DIR: &str = "data/cache";

/// Default number of recent filings analyzed per report.
pub const DEFAULT_FILINGS_LIMIT: usize = 3;

/// Settings for a [`ReportGenerator`](crate::ReportGenerator).
#[derive(Debug, Clone, PartialEq)]
pub struct FinPulseConfig {
    /// Holds `company_tickers.json` and `index/`.
    pub cache_dir: PathBuf,
    /// Sent to SEC with every request.
    pub user_agent: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub index: IndexConfig,
    /// Most recent filings fetched per report.
    pub filings_limit: usize,
    /// Reference date for the KPI window; today when unset.
    pub as_of: Option<NaiveDate>,
    pub eviction: EvictionPolicy,
    /// Write index snapshots under `cache_dir/index`.
    pub persist_indexes: bool,
}

impl Default for FinPulseConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            gemini_api_key: None,
            gemini_model: DEFAULT_MODEL.to_string(),
            index: IndexConfig::default(),
            filings_limit: DEFAULT_FILINGS_LIMIT,
            as_of: None,
            eviction: EvictionPolicy::default(),
            persist_indexes: true,
        }
    }
}

impl FinPulseConfig {
    /// Create a new builder for constructing a [`FinPulseConfig`].
    pub fn builder() -> FinPulseConfigBuilder {
        FinPulseConfigBuilder::default()
    }

    /// Read settings from the environment, falling back to defaults.
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `FINPULSE_CACHE_DIR` | `cache_dir` |
    /// | `FINPULSE_USER_AGENT` | `user_agent` |
    /// | `GEMINI_API_KEY` | `gemini_api_key` |
    /// | `FINPULSE_GEMINI_MODEL` | `gemini_model` |
    /// | `FINPULSE_AS_OF` | `as_of` (`YYYY-MM-DD`) |
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// [`from_env`](Self::from_env) over an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let mut builder = FinPulseConfig::builder();
        if let Some(dir) = var("FINPULSE_CACHE_DIR") {
            builder = builder.cache_dir(dir);
        }
        if let Some(user_agent) = var("FINPULSE_USER_AGENT") {
            builder = builder.user_agent(user_agent);
        }
        if let Some(key) = var("GEMINI_API_KEY") {
            builder = builder.gemini_api_key(key);
        }
        if let Some(model) = var("FINPULSE_GEMINI_MODEL") {
            builder = builder.gemini_model(model);
        }
        if let Some(raw) = var("FINPULSE_AS_OF") {
            let as_of = finpulse_edgar::dates::parse_date(&raw)
                .map_err(|e| ReportError::Config(format!("FINPULSE_AS_OF: {e}")))?;
            builder = builder.as_of(as_of);
        }
        builder.build()
    }

    /// Directory holding persisted index snapshots.
    pub fn index_dir(&self) -> PathBuf {
        self.cache_dir.join("index")
    }
}

/// Builder for constructing a validated [`FinPulseConfig`].
#[derive(Debug, Clone, Default)]
pub struct FinPulseConfigBuilder {
    config: FinPulseConfig,
}

impl FinPulseConfigBuilder {
    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.cache_dir = dir.into();
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn gemini_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.gemini_api_key = Some(key.into());
        self
    }

    pub fn gemini_model(mut self, model: impl Into<String>) -> Self {
        self.config.gemini_model = model.into();
        self
    }

    pub fn index(mut self, index: IndexConfig) -> Self {
        self.config.index = index;
        self
    }

    pub fn filings_limit(mut self, limit: usize) -> Self {
        self.config.filings_limit = limit;
        self
    }

    /// Pin the KPI window to end at `as_of` instead of today.
    pub fn as_of(mut self, as_of: NaiveDate) -> Self {
        self.config.as_of = Some(as_of);
        self
    }

    pub fn eviction(mut self, eviction: EvictionPolicy) -> Self {
        self.config.eviction = eviction;
        self
    }

    pub fn persist_indexes(mut self, persist: bool) -> Self {
        self.config.persist_indexes = persist;
        self
    }

    /// Build the [`FinPulseConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Config`] if:
    /// - `user_agent` is blank
    /// - `filings_limit == 0`
    /// - the eviction policy keeps zero entries
    pub fn build(self) -> Result<FinPulseConfig> {
        if self.config.user_agent.trim().is_empty() {
            return Err(ReportError::Config("user_agent must not be empty".to_string()));
        }
        if self.config.filings_limit == 0 {
            return Err(ReportError::Config("filings_limit must be greater than zero".to_string()));
        }
        if self.config.eviction == EvictionPolicy::MaxEntries(0) {
            return Err(ReportError::Config("MaxEntries eviction must keep at least one index".to_string()));
        }
        Ok(self.config)
    }
}
