//! Ticker to CIK resolution.
//!
//! The mapping comes from SEC's `company_tickers.json`, cached on disk. A
//! missing or corrupt cache is replaced by a fresh download, and when the
//! download fails a small built-in table of common tickers is used instead.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::{EdgarError, Result};
use crate::model::pad_cik;

/// Common tickers used when the SEC mapping cannot be fetched.
const BUILTIN_TICKERS: &[(&str, &str)] = &[
    ("AAPL", "0000320193"),
    ("MSFT", "0000789019"),
    ("GOOGL", "0001652044"),
    ("GOOG", "0001652044"),
    ("AMZN", "0001018724"),
    ("TSLA", "0001318605"),
    ("META", "0001326801"),
    ("NVDA", "0001045810"),
    ("NFLX", "0001065280"),
    ("AMD", "0000002488"),
    ("INTC", "0000050863"),
    ("CRM", "0001108524"),
    ("ADBE", "0000796343"),
    ("ORCL", "0001341439"),
    ("IBM", "0000051143"),
    ("CSCO", "0000858877"),
    ("QCOM", "0000804328"),
    ("PYPL", "0001633917"),
    ("UBER", "0001543151"),
    ("SNAP", "0001564408"),
    ("TWTR", "0001418091"),
    ("SQ", "0001512673"),
    ("ROKU", "0001428439"),
    ("ZM", "0001585521"),
    ("SPOT", "0001639920"),
    ("SHOP", "0001594805"),
    ("DOCU", "0001261333"),
    ("OKTA", "0001660134"),
    ("CRWD", "0001535527"),
    ("PLTR", "0001321655"),
];

/// A company entry in the ticker map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickerEntry {
    /// CIK padded to 10 digits.
    pub cik: String,
    pub title: Option<String>,
}

/// One record of SEC's `company_tickers.json`.
#[derive(Debug, Serialize, Deserialize)]
struct SecTickerRecord {
    cik_str: Value,
    ticker: String,
    #[serde(default)]
    title: Option<String>,
}

/// Case-insensitive ticker to CIK mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickerMap {
    entries: BTreeMap<String, TickerEntry>,
}

impl TickerMap {
    /// The built-in table of common tickers.
    pub fn builtin() -> Self {
        let entries = BUILTIN_TICKERS
            .iter()
            .map(|(ticker, cik)| {
                (ticker.to_string(), TickerEntry { cik: cik.to_string(), title: None })
            })
            .collect();
        Self { entries }
    }

    /// Parse either SEC's `{"0": {"cik_str", "ticker", "title"}}` layout or a
    /// flat `{"TICKER": cik}` object.
    ///
    /// # Errors
    ///
    /// Returns [`EdgarError::Parse`] for malformed JSON, an unrecognized layout,
    /// or a mapping with no entries.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| EdgarError::Parse(format!("ticker map: {e}")))?;
        let Value::Object(object) = value else {
            return Err(EdgarError::Parse("ticker map must be a JSON object".into()));
        };

        let mut entries = BTreeMap::new();
        for (key, value) in object {
            let (ticker, cik, title) = match value {
                Value::Object(_) => {
                    let record: SecTickerRecord = serde_json::from_value(value)
                        .map_err(|e| EdgarError::Parse(format!("ticker record '{key}': {e}")))?;
                    (record.ticker, cik_text(&record.cik_str), record.title)
                }
                other => (key, cik_text(&other), None),
            };
            let cik = cik.ok_or_else(|| EdgarError::Parse(format!("ticker '{ticker}' has no CIK")))?;
            entries.insert(ticker.to_uppercase(), TickerEntry { cik: pad_cik(&cik), title });
        }

        if entries.is_empty() {
            return Err(EdgarError::Parse("ticker map is empty".into()));
        }
        Ok(Self { entries })
    }

    /// Serialize in SEC's layout.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        let records: BTreeMap<String, SecTickerRecord> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, (ticker, entry))| {
                let cik = entry
                    .cik
                    .trim_start_matches('0')
                    .parse::<u64>()
                    .map(Value::from)
                    .unwrap_or_else(|_| Value::from(entry.cik.clone()));
                let record =
                    SecTickerRecord { cik_str: cik, ticker: ticker.clone(), title: entry.title.clone() };
                (i.to_string(), record)
            })
            .collect();
        serde_json::to_vec(&records).map_err(|e| EdgarError::Parse(format!("ticker map: {e}")))
    }

    /// Look up a ticker, ignoring case.
    pub fn lookup(&self, ticker: &str) -> Option<&TickerEntry> {
        self.entries.get(&ticker.trim().to_uppercase())
    }

    /// Tickers that map to `cik`.
    pub fn tickers_for(&self, cik: &str) -> Vec<&str> {
        let cik = pad_cik(cik);
        self.entries.iter().filter(|(_, e)| e.cik == cik).map(|(t, _)| t.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn cik_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => n.as_u64().map(|n| n.to_string()),
        _ => None,
    }
}

/// The on-disk copy of the ticker map.
#[derive(Debug, Clone)]
pub struct TickerCache {
    path: PathBuf,
}

impl TickerCache {
    /// Cache at `dir/company_tickers.json`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self { path: dir.as_ref().join("company_tickers.json") }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the cached map. A missing file yields `None`; so does a corrupt
    /// one, after a warning.
    pub async fn load(&self) -> Option<TickerMap> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no cached ticker map");
                return None;
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "unreadable ticker map cache");
                return None;
            }
        };

        match TickerMap::parse(&bytes) {
            Ok(map) => {
                debug!(path = %self.path.display(), tickers = map.len(), "loaded cached ticker map");
                Some(map)
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "corrupt ticker map cache, refetching");
                None
            }
        }
    }

    /// Write `map` atomically (temp file then rename).
    pub async fn save(&self, map: &TickerMap) -> Result<()> {
        let cache_error =
            |source: std::io::Error| EdgarError::Cache { path: self.path.display().to_string(), source };

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(cache_error)?;
        }
        let bytes = map.to_json()?;
        let temp = self.path.with_extension("json.tmp");
        let mut out = tokio::fs::File::create(&temp).await.map_err(cache_error)?;
        out.write_all(&bytes).await.map_err(cache_error)?;
        out.sync_all().await.map_err(cache_error)?;
        drop(out);
        tokio::fs::rename(&temp, &self.path).await.map_err(cache_error)?;
        Ok(())
    }
}
