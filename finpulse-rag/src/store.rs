//! Chunk stores backing a [`RelevanceIndex`](crate::RelevanceIndex).
//!
//! A store receives the complete set of committed chunks on every commit and
//! hands it back on load. [`JsonFileChunkStore`] writes the snapshot to a
//! sibling temp file and renames it into place, so a crash mid-write leaves
//! the previous snapshot intact.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::document::FilingChunk;
use crate::error::{RagError, Result};

/// Snapshot format version written by [`JsonFileChunkStore`].
const SNAPSHOT_VERSION: u32 = 1;

/// A chunk together with the embedding computed for it, if any.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredChunk {
    /// The committed chunk.
    pub chunk: FilingChunk,
    /// Embedding vector; empty under lexical scoring.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
}

/// Everything an index has committed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IndexSnapshot {
    /// Number of documents indexed so far.
    pub documents: usize,
    /// Chunks in insertion order.
    pub chunks: Vec<StoredChunk>,
}

/// Persistence backend for committed chunks.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Load the last committed snapshot. A missing or unreadable snapshot
    /// loads as empty.
    async fn load(&self) -> Result<IndexSnapshot>;

    /// Replace the stored snapshot with `snapshot`.
    async fn commit(&self, snapshot: &IndexSnapshot) -> Result<()>;

    /// Remove every stored chunk.
    async fn clear(&self) -> Result<()>;

    /// Whether commits survive a process restart.
    fn is_persistent(&self) -> bool;
}

#[derive(Serialize, Deserialize)]
struct SnapshotFile {
    version: u32,
    #[serde(flatten)]
    snapshot: IndexSnapshot,
}

/// A store that persists the snapshot as a single JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileChunkStore {
    path: PathBuf,
}

impl JsonFileChunkStore {
    /// Create a store writing to `path`. Parent directories are created on
    /// the first commit.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn store_error(&self, message: impl std::fmt::Display) -> RagError {
        RagError::StoreError {
            backend: "JsonFile".to_string(),
            message: format!("{}: {message}", self.path.display()),
        }
    }
}

#[async_trait]
impl ChunkStore for JsonFileChunkStore {
    async fn load(&self) -> Result<IndexSnapshot> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no chunk snapshot on disk");
                return Ok(IndexSnapshot::default());
            }
            Err(e) => return Err(self.store_error(e)),
        };

        match serde_json::from_slice::<SnapshotFile>(&bytes) {
            Ok(file) if file.version == SNAPSHOT_VERSION => Ok(file.snapshot),
            Ok(file) => {
                warn!(
                    path = %self.path.display(),
                    version = file.version,
                    "unsupported chunk snapshot version, starting empty"
                );
                Ok(IndexSnapshot::default())
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "corrupt chunk snapshot, starting empty");
                Ok(IndexSnapshot::default())
            }
        }
    }

    async fn commit(&self, snapshot: &IndexSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| self.store_error(e))?;
        }

        let file = SnapshotFile { version: SNAPSHOT_VERSION, snapshot: snapshot.clone() };
        let bytes = serde_json::to_vec(&file).map_err(|e| self.store_error(e))?;

        let temp = self.temp_path();
        let mut out = tokio::fs::File::create(&temp).await.map_err(|e| self.store_error(e))?;
        out.write_all(&bytes).await.map_err(|e| self.store_error(e))?;
        out.sync_all().await.map_err(|e| self.store_error(e))?;
        drop(out);
        tokio::fs::rename(&temp, &self.path).await.map_err(|e| self.store_error(e))?;

        debug!(path = %self.path.display(), chunks = snapshot.chunks.len(), "committed chunk snapshot");
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.store_error(e)),
        }
    }

    fn is_persistent(&self) -> bool {
        true
    }
}
