//! Document chunking.
//!
//! Filing text is split into overlapping windows that prefer to end on a
//! sentence terminal, so a chunk rarely stops in the middle of a sentence.

/// A strategy for splitting document text into chunks.
pub trait Chunker: Send + Sync {
    /// Split text into trimmed, non-empty chunks in document order.
    fn chunk(&self, text: &str) -> Vec<String>;
}

/// Splits text into windows of at most `chunk_size` characters, cutting at the
/// last sentence terminal found within `overlap` characters of the window edge.
///
/// # Example
///
/// ```rust
/// use finpulse_rag::{Chunker, SentenceBoundaryChunker};
///
/// let chunker = SentenceBoundaryChunker::new(40, 10);
/// let chunks = chunker.chunk("Revenue grew. Margins held steady. Cash rose sharply this quarter.");
/// assert!(chunks.iter().all(|c| c.chars().count() <= 40));
/// ```
#[derive(Debug, Clone)]
pub struct SentenceBoundaryChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl SentenceBoundaryChunker {
    /// Create a new `SentenceBoundaryChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size`: maximum number of characters per chunk
    /// * `chunk_overlap`: number of overlapping characters between consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap }
    }
}

impl Chunker for SentenceBoundaryChunker {
    fn chunk(&self, text: &str) -> Vec<String> {
        chunk_text(text, self.chunk_size, self.chunk_overlap)
    }
}

fn is_sentence_terminal(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

/// Split `text` into overlapping, sentence-aware chunks.
///
/// Sizes are measured in characters. The window start always moves forward,
/// so the loop terminates even when `overlap >= chunk_size`.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let chunk_size = chunk_size.max(1);
    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();

    if total <= chunk_size {
        let trimmed = text.trim();
        return if trimmed.is_empty() { Vec::new() } else { vec![trimmed.to_string()] };
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < total {
        let mut end = (start + chunk_size).min(total);

        if end < total {
            let floor = end.saturating_sub(overlap).max(start + 1);
            if let Some(pos) = (floor..end).rev().find(|&i| is_sentence_terminal(chars[i])) {
                end = pos + 1;
            }
        }

        let piece: String = chars[start..end].iter().collect();
        let piece = piece.trim();
        if !piece.is_empty() {
            chunks.push(piece.to_string());
        }

        if end >= total {
            break;
        }

        let next = end.saturating_sub(overlap);
        start = if next > start { next } else { start + 1 };
    }

    chunks
}
