//! The relevance index.
//!
//! [`RelevanceIndex`] chunks filing documents, commits the chunks (optionally
//! through a [`ChunkStore`]), and ranks them against free-text queries.
//!
//! # Example
//!
//! ```rust,ignore
//! use finpulse_rag::{IndexConfig, RelevanceIndex, SourceDocument};
//!
//! let index = RelevanceIndex::builder().config(IndexConfig::default()).build().await?;
//! index.index(&[SourceDocument::new(text, url)], None).await?;
//! let results = index.retrieve("revenue growth", 5).await?;
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::chunking::{Chunker, SentenceBoundaryChunker};
use crate::config::IndexConfig;
use crate::document::{
    FilingChunk, IndexStats, META_CHUNK_INDEX, META_DOCUMENT_INDEX, META_LENGTH, META_SOURCE_URL,
    RetrievalResult, ScoringKind, SourceDocument,
};
use crate::embedding::{EmbeddingProvider, cosine_similarity, similarity_to_score};
use crate::error::{RagError, Result};
use crate::lexical::ExpandedQuery;
use crate::store::{ChunkStore, IndexSnapshot, StoredChunk};

/// How an index scores chunks against a query.
#[derive(Clone, Default)]
pub enum ScoringStrategy {
    /// Keyword matching with synonym expansion.
    #[default]
    Lexical,
    /// Cosine similarity between embeddings from the given provider.
    Embedding(Arc<dyn EmbeddingProvider>),
}

impl ScoringStrategy {
    fn kind(&self) -> ScoringKind {
        match self {
            ScoringStrategy::Lexical => ScoringKind::Lexical,
            ScoringStrategy::Embedding(_) => ScoringKind::Embedding,
        }
    }
}

/// Stores filing chunks and answers ranked queries over them.
///
/// Each [`index`](RelevanceIndex::index) call commits all of its chunks or
/// none of them: the new snapshot is written to the store before the
/// in-memory state is replaced.
pub struct RelevanceIndex {
    config: IndexConfig,
    chunker: Arc<dyn Chunker>,
    strategy: ScoringStrategy,
    store: Option<Arc<dyn ChunkStore>>,
    state: RwLock<IndexSnapshot>,
}

impl RelevanceIndex {
    /// Create a new [`RelevanceIndexBuilder`].
    pub fn builder() -> RelevanceIndexBuilder {
        RelevanceIndexBuilder::default()
    }

    /// Return a reference to the index configuration.
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Chunk and commit `documents`.
    ///
    /// Each chunk's metadata holds `document_index`, `chunk_index`,
    /// `source_url` and `length`, merged with the matching entry of
    /// `metadata`. Caller-supplied values override the derived ones on key
    /// collision. Returns the number of chunks committed.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidInput`] if `metadata` does not have one entry
    /// per document, or the embedding/store error if the commit fails. A failed
    /// call commits nothing.
    pub async fn index(
        &self,
        documents: &[SourceDocument],
        metadata: Option<&[BTreeMap<String, String>]>,
    ) -> Result<usize> {
        if documents.is_empty() {
            warn!("index called with no documents; nothing to commit");
            return Ok(0);
        }
        if let Some(metadata) = metadata {
            if metadata.len() != documents.len() {
                return Err(RagError::InvalidInput(format!(
                    "metadata has {} entries but {} documents were given",
                    metadata.len(),
                    documents.len()
                )));
            }
        }

        let mut state = self.state.write().await;
        let base = state.documents;

        let mut fresh = Vec::new();
        for (offset, document) in documents.iter().enumerate() {
            let document_index = base + offset;
            let pieces = self.chunker.chunk(&document.text);
            if pieces.is_empty() {
                debug!(document_index, source_url = %document.source_url, "document produced no chunks");
            }

            for (chunk_index, text) in pieces.into_iter().enumerate() {
                let length = text.chars().count();
                let mut merged = BTreeMap::from([
                    (META_DOCUMENT_INDEX.to_string(), document_index.to_string()),
                    (META_CHUNK_INDEX.to_string(), chunk_index.to_string()),
                    (META_SOURCE_URL.to_string(), document.source_url.clone()),
                    (META_LENGTH.to_string(), length.to_string()),
                ]);
                if let Some(extra) = metadata.map(|m| &m[offset]) {
                    merged.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
                }

                fresh.push(StoredChunk {
                    chunk: FilingChunk {
                        chunk_id: format!("{document_index}_{chunk_index}"),
                        text,
                        source_url: document.source_url.clone(),
                        document_index,
                        chunk_index,
                        length,
                        metadata: merged,
                    },
                    embedding: Vec::new(),
                });
            }
        }

        if let ScoringStrategy::Embedding(provider) = &self.strategy {
            let texts: Vec<&str> = fresh.iter().map(|c| c.chunk.text.as_str()).collect();
            let embeddings = provider.embed_batch(&texts).await.map_err(|e| {
                error!(error = %e, "embedding failed during indexing");
                e
            })?;
            if embeddings.len() != fresh.len() {
                return Err(RagError::EmbeddingError {
                    provider: "index".to_string(),
                    message: format!(
                        "expected {} embeddings, got {}",
                        fresh.len(),
                        embeddings.len()
                    ),
                });
            }
            for (chunk, embedding) in fresh.iter_mut().zip(embeddings) {
                chunk.embedding = embedding;
            }
        }

        let chunk_count = fresh.len();
        let mut next = IndexSnapshot { documents: base + documents.len(), chunks: state.chunks.clone() };
        next.chunks.extend(fresh);

        if let Some(store) = &self.store {
            store.commit(&next).await.map_err(|e| {
                error!(error = %e, "chunk store commit failed");
                e
            })?;
        }

        *state = next;
        info!(
            documents = documents.len(),
            chunk_count,
            total_chunks = state.chunks.len(),
            "indexed documents"
        );
        Ok(chunk_count)
    }

    /// Return at most `k` chunks ranked by descending relevance to `query`.
    ///
    /// An empty index or `k == 0` yields an empty result.
    ///
    /// # Errors
    ///
    /// Returns an embedding error if the query cannot be embedded under the
    /// embedding strategy. Lexical retrieval never fails.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievalResult>> {
        let state = self.state.read().await;
        if state.chunks.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let results = match &self.strategy {
            ScoringStrategy::Lexical => rank_lexical(&state.chunks, query, k),
            ScoringStrategy::Embedding(provider) => {
                let query_embedding = provider.embed(query).await.map_err(|e| {
                    error!(error = %e, "embedding failed during retrieval");
                    e
                })?;
                rank_by_embedding(&state.chunks, &query_embedding, k)
            }
        };

        debug!(query, k, result_count = results.len(), "retrieval completed");
        Ok(results)
    }

    /// Remove every chunk, including the persisted snapshot.
    ///
    /// # Errors
    ///
    /// Returns the store error if the persisted snapshot cannot be removed;
    /// the in-memory state is left untouched in that case.
    pub async fn clear(&self) -> Result<()> {
        let mut state = self.state.write().await;
        if let Some(store) = &self.store {
            store.clear().await?;
        }
        let removed = state.chunks.len();
        *state = IndexSnapshot::default();
        info!(removed, "cleared index");
        Ok(())
    }

    /// Distinct values of one metadata field across the committed chunks.
    pub async fn metadata_values(&self, key: &str) -> BTreeSet<String> {
        let state = self.state.read().await;
        state.chunks.iter().filter_map(|stored| stored.chunk.metadata.get(key).cloned()).collect()
    }

    /// Observability snapshot.
    pub async fn stats(&self) -> IndexStats {
        let state = self.state.read().await;
        IndexStats {
            total_chunks: state.chunks.len(),
            total_documents: state.documents,
            strategy: self.strategy.kind(),
            persisted: self.store.as_ref().is_some_and(|s| s.is_persistent()),
        }
    }
}

fn to_result(stored: &StoredChunk, score: f32) -> RetrievalResult {
    RetrievalResult {
        text: stored.chunk.text.clone(),
        source_url: stored.chunk.citation_url().to_string(),
        score,
    }
}

fn rank_lexical(chunks: &[StoredChunk], query: &str, k: usize) -> Vec<RetrievalResult> {
    let expanded = ExpandedQuery::parse(query);
    if expanded.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(u32, &StoredChunk)> = chunks
        .iter()
        .map(|stored| (expanded.raw_score(&stored.chunk.text), stored))
        .filter(|(score, _)| *score > 0)
        .collect();

    // sort_by is stable: equal scores keep insertion order
    scored.sort_by(|a, b| b.0.cmp(&a.0));

    scored.into_iter().take(k).map(|(raw, stored)| to_result(stored, expanded.normalize(raw))).collect()
}

fn rank_by_embedding(chunks: &[StoredChunk], query: &[f32], k: usize) -> Vec<RetrievalResult> {
    let mut scored: Vec<(f32, &StoredChunk)> = chunks
        .iter()
        .map(|stored| (similarity_to_score(cosine_similarity(&stored.embedding, query)), stored))
        .collect();

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    scored.into_iter().take(k).map(|(score, stored)| to_result(stored, score)).collect()
}

/// Builder for constructing a [`RelevanceIndex`].
///
/// Every field is optional: the defaults are [`IndexConfig::default()`], a
/// [`SentenceBoundaryChunker`] sized from the config, lexical scoring, and no
/// persistence.
#[derive(Default)]
pub struct RelevanceIndexBuilder {
    config: Option<IndexConfig>,
    chunker: Option<Arc<dyn Chunker>>,
    strategy: ScoringStrategy,
    store: Option<Arc<dyn ChunkStore>>,
}

impl RelevanceIndexBuilder {
    /// Set the index configuration.
    pub fn config(mut self, config: IndexConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Replace the default chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Score with embeddings from `provider` instead of keywords.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.strategy = ScoringStrategy::Embedding(provider);
        self
    }

    /// Persist commits through `store`.
    pub fn store(mut self, store: Arc<dyn ChunkStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Build the index, reloading any snapshot previously committed to the store.
    ///
    /// # Errors
    ///
    /// Returns the store error if the snapshot exists but cannot be read.
    /// A corrupt snapshot is not an error: it loads as empty.
    pub async fn build(self) -> Result<RelevanceIndex> {
        let config = self.config.unwrap_or_default();
        let chunker = self.chunker.unwrap_or_else(|| {
            Arc::new(SentenceBoundaryChunker::new(config.chunk_size, config.chunk_overlap))
        });

        let snapshot = match &self.store {
            Some(store) => store.load().await?,
            None => IndexSnapshot::default(),
        };
        if !snapshot.chunks.is_empty() {
            info!(chunks = snapshot.chunks.len(), "reloaded committed chunks");
        }

        Ok(RelevanceIndex {
            config,
            chunker,
            strategy: self.strategy,
            store: self.store,
            state: RwLock::new(snapshot),
        })
    }
}
