//! Narrative generation for FinPulse.
//!
//! A [`GenerationService`] turns a prompt into text; [`GeminiClient`] is the
//! production implementation. [`NarrativeSynthesizer`] assembles the prompt
//! from KPIs and retrieved excerpts, normalizes the citation list and falls
//! back to a deterministic summary when generation fails.

pub mod error;
pub mod gemini;
pub mod generation;
pub mod narrative;

pub use error::{ModelError, Result};
pub use gemini::GeminiClient;
pub use generation::GenerationService;
pub use narrative::{
    Citation, FALLBACK_CITATIONS, NarrativeSynthesizer, build_prompt, citations, kpi_table,
};
