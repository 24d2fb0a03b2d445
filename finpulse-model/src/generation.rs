//! The generation-service seam.

use async_trait::async_trait;

use crate::error::Result;

/// A text-completion backend.
///
/// Implementations send one prompt and return the model's text. Failures are
/// reported, never retried; the caller decides how to degrade.
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Complete `prompt`.
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Short provider name used in logs.
    fn name(&self) -> &str;
}
