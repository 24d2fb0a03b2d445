//! Data types for source documents, stored chunks, and retrieval results.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Metadata key for the position of the parent document in the index.
pub const META_DOCUMENT_INDEX: &str = "document_index";
/// Metadata key for the position of the chunk within its document.
pub const META_CHUNK_INDEX: &str = "chunk_index";
/// Metadata key for the URL of the parent document.
pub const META_SOURCE_URL: &str = "source_url";
/// Metadata key for the chunk length in characters.
pub const META_LENGTH: &str = "length";

/// A filing document handed to the index: raw text plus the URL it came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceDocument {
    /// The plain text content of the document.
    pub text: String,
    /// URL of the original filing document.
    pub source_url: String,
}

impl SourceDocument {
    /// Create a new source document.
    pub fn new(text: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self { text: text.into(), source_url: source_url.into() }
    }
}

/// A segment of a [`SourceDocument`] committed to the index.
///
/// The positional fields are always derived by the index. `metadata` holds
/// the derived fields merged with the caller-supplied per-document fields,
/// where caller-supplied values win on key collision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FilingChunk {
    /// Unique identifier within the index: `{document_index}_{chunk_index}`.
    pub chunk_id: String,
    /// The text content of the chunk.
    pub text: String,
    /// URL of the parent document.
    pub source_url: String,
    /// Position of the parent document across all `index` calls.
    pub document_index: usize,
    /// Position of this chunk within its document.
    pub chunk_index: usize,
    /// Length of `text` in characters.
    pub length: usize,
    /// Merged metadata.
    pub metadata: BTreeMap<String, String>,
}

impl FilingChunk {
    /// The URL to cite for this chunk, honoring a caller override of `source_url`.
    pub fn citation_url(&self) -> &str {
        self.metadata.get(META_SOURCE_URL).map(String::as_str).unwrap_or(&self.source_url)
    }
}

/// A retrieved chunk paired with its relevance score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalResult {
    /// The chunk text.
    pub text: String,
    /// URL of the filing the chunk came from.
    pub source_url: String,
    /// Relevance in `[0, 1]`, higher is more relevant.
    pub score: f32,
}

/// Which scoring strategy an index uses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScoringKind {
    /// Keyword scoring with synonym expansion.
    Lexical,
    /// Cosine similarity over embeddings.
    Embedding,
}

/// Observability snapshot of an index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexStats {
    /// Number of chunks currently stored.
    pub total_chunks: usize,
    /// Number of documents indexed so far.
    pub total_documents: usize,
    /// Active scoring strategy.
    pub strategy: ScoringKind,
    /// Whether commits are written to a persistent store.
    pub persisted: bool,
}
