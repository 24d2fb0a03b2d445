//! Process-scoped cache of built relevance indexes.
//!
//! One slot per `(ticker, scope, cik)`. Each slot is a [`OnceCell`], so at
//! most one build runs per key: concurrent callers wait for the first
//! builder and share its index. A failed build leaves the slot empty and the
//! next caller builds again.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use finpulse_edgar::FilingScope;
use finpulse_rag::RelevanceIndex;
use indexmap::IndexMap;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::error::Result;

/// How many indexes the cache keeps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EvictionPolicy {
    /// Keep every index for the life of the process.
    #[default]
    Unbounded,
    /// Keep at most this many, evicting the oldest inserted first.
    MaxEntries(usize),
}

/// Identifies one company's index for one filing scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexKey {
    pub ticker: String,
    pub scope: FilingScope,
    pub cik: String,
}

impl IndexKey {
    pub fn new(ticker: &str, scope: FilingScope, cik: &str) -> Self {
        Self { ticker: ticker.trim().to_uppercase(), scope, cik: cik.to_string() }
    }

    /// Snapshot file name, e.g. `AAPL_10Q_0000320193.json`.
    pub fn file_name(&self) -> String {
        format!("{self}.json")
    }
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.ticker, self.scope.slug(), self.cik)
    }
}

type Slot = Arc<OnceCell<Arc<RelevanceIndex>>>;

/// Built indexes keyed by [`IndexKey`], with single-flight builds.
#[derive(Default)]
pub struct IndexCache {
    policy: EvictionPolicy,
    slots: Mutex<IndexMap<IndexKey, Slot>>,
}

impl IndexCache {
    pub fn new(policy: EvictionPolicy) -> Self {
        Self { policy, slots: Mutex::new(IndexMap::new()) }
    }

    fn slots(&self) -> MutexGuard<'_, IndexMap<IndexKey, Slot>> {
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Return the cached index for `key`, running `build` if there is none.
    ///
    /// # Errors
    ///
    /// Returns the error from `build`. The slot stays empty so a later call
    /// retries.
    pub async fn get_or_build<F, Fut>(
        &self,
        key: &IndexKey,
        build: F,
    ) -> Result<Arc<RelevanceIndex>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<RelevanceIndex>>>,
    {
        let slot = {
            let mut slots = self.slots();
            let slot = slots.entry(key.clone()).or_default().clone();
            if let EvictionPolicy::MaxEntries(max) = self.policy {
                while slots.len() > max.max(1) {
                    let Some((evicted, _)) = slots.shift_remove_index(0) else { break };
                    debug!(key = %evicted, "evicted cached index");
                }
            }
            slot
        };

        if slot.initialized() {
            debug!(key = %key, "reusing cached index");
        }
        slot.get_or_try_init(build).await.cloned()
    }

    /// Whether a built index is cached for `key`.
    pub fn contains(&self, key: &IndexKey) -> bool {
        self.slots().get(key).is_some_and(|slot| slot.initialized())
    }

    /// Drop cached indexes for `ticker`, or all of them. Returns the removed keys.
    ///
    /// Builds still running for a removed key are awaited before returning,
    /// so their snapshot files are on disk by the time this resolves.
    pub async fn remove(&self, ticker: Option<&str>) -> Vec<IndexKey> {
        let ticker = ticker.map(|t| t.trim().to_uppercase());
        let removed: Vec<(IndexKey, Slot)> = {
            let mut slots = self.slots();
            let keys: Vec<IndexKey> = slots
                .keys()
                .filter(|key| ticker.as_ref().is_none_or(|t| &key.ticker == t))
                .cloned()
                .collect();
            keys.into_iter()
                .filter_map(|key| slots.shift_remove(&key).map(|slot| (key, slot)))
                .collect()
        };

        for (key, slot) in &removed {
            if !slot.initialized() {
                debug!(key = %key, "waiting for in-flight index build");
                // Succeeds once a running build finishes; otherwise returns the error at once.
                let _ = slot.get_or_try_init(|| async { Err::<Arc<RelevanceIndex>, ()>(()) }).await;
            }
        }
        removed.into_iter().map(|(key, _)| key).collect()
    }

    /// Number of slots, built or in progress.
    pub fn len(&self) -> usize {
        self.slots().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use tokio::sync::oneshot;

    use crate::error::{ReportError, Step};

    use super::*;

    fn key(ticker: &str) -> IndexKey {
        IndexKey::new(ticker, FilingScope::Quarterly, "0000320193")
    }

    async fn empty_index() -> Result<Arc<RelevanceIndex>> {
        let index = RelevanceIndex::builder()
            .build()
            .await
            .map_err(|e| ReportError::from_index(Step::BuildIndex, e))?;
        Ok(Arc::new(index))
    }

    #[test]
    fn key_formats_as_file_name() {
        assert_eq!(key("aapl").file_name(), "AAPL_10Q_0000320193.json");
    }

    #[tokio::test]
    async fn second_call_reuses_the_index() {
        let cache = IndexCache::default();
        let builds = AtomicUsize::new(0);

        for _ in 0..3 {
            cache
                .get_or_build(&key("AAPL"), || async {
                    builds.fetch_add(1, Ordering::SeqCst);
                    empty_index().await
                })
                .await
                .unwrap();
        }
        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert!(cache.contains(&key("AAPL")));
    }

    #[tokio::test]
    async fn failed_build_leaves_slot_empty() {
        let cache = IndexCache::default();
        let err = cache
            .get_or_build(&key("AAPL"), || async { Err(ReportError::Validation("boom".into())) })
            .await;
        assert!(err.is_err());
        assert!(!cache.contains(&key("AAPL")));

        cache.get_or_build(&key("AAPL"), empty_index).await.unwrap();
        assert!(cache.contains(&key("AAPL")));
    }

    #[tokio::test]
    async fn max_entries_evicts_oldest() {
        let cache = IndexCache::new(EvictionPolicy::MaxEntries(2));
        for ticker in ["AAPL", "MSFT", "NVDA"] {
            cache.get_or_build(&key(ticker), empty_index).await.unwrap();
        }
        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(&key("AAPL")));
        assert!(cache.contains(&key("NVDA")));
    }

    #[tokio::test]
    async fn remove_by_ticker() {
        let cache = IndexCache::default();
        cache.get_or_build(&key("AAPL"), empty_index).await.unwrap();
        let annual = IndexKey::new("AAPL", FilingScope::Annual, "0000320193");
        cache.get_or_build(&annual, empty_index).await.unwrap();
        cache.get_or_build(&key("MSFT"), empty_index).await.unwrap();

        assert_eq!(cache.remove(Some("aapl")).await.len(), 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.remove(None).await.len(), 1);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn remove_waits_for_in_flight_build() {
        let cache = Arc::new(IndexCache::default());
        let finished = Arc::new(AtomicBool::new(false));
        let (started_tx, started_rx) = oneshot::channel();

        let build = tokio::spawn({
            let cache = cache.clone();
            let finished = finished.clone();
            async move {
                cache
                    .get_or_build(&key("AAPL"), || async move {
                        let _ = started_tx.send(());
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        finished.store(true, Ordering::SeqCst);
                        empty_index().await
                    })
                    .await
            }
        });
        started_rx.await.unwrap();

        assert_eq!(cache.remove(Some("AAPL")).await, vec![key("AAPL")]);
        assert!(finished.load(Ordering::SeqCst));
        assert!(cache.is_empty());
        build.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn remove_skips_slots_left_empty_by_a_failed_build() {
        let cache = IndexCache::default();
        let _ = cache
            .get_or_build(&key("AAPL"), || async { Err(ReportError::Validation("boom".into())) })
            .await;

        assert_eq!(cache.remove(None).await, vec![key("AAPL")]);
    }
}
