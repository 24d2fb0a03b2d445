//! Filing chunking and relevance ranking for FinPulse.
//!
//! This crate provides:
//! - Sentence-aware overlapping chunking ([`chunk_text`], [`SentenceBoundaryChunker`])
//! - Keyword scoring with investor-vocabulary synonym expansion ([`ExpandedQuery`])
//! - Optional embedding scoring ([`EmbeddingProvider`], [`HashingEmbedder`])
//! - A [`RelevanceIndex`] with atomic, crash-safe JSON persistence ([`JsonFileChunkStore`])

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod index;
pub mod lexical;
pub mod store;

pub use chunking::{Chunker, SentenceBoundaryChunker, chunk_text};
pub use config::{IndexConfig, IndexConfigBuilder};
pub use document::{FilingChunk, IndexStats, RetrievalResult, ScoringKind, SourceDocument};
pub use embedding::{EmbeddingProvider, HashingEmbedder};
pub use error::{RagError, Result};
pub use index::{RelevanceIndex, RelevanceIndexBuilder, ScoringStrategy};
pub use lexical::ExpandedQuery;
pub use store::{ChunkStore, IndexSnapshot, JsonFileChunkStore, StoredChunk};
