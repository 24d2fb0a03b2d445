//! Error types for the `finpulse-report` crate.

use std::fmt;

use finpulse_edgar::EdgarError;
use finpulse_rag::RagError;
use thiserror::Error;

/// The pipeline step a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    ResolveCompany,
    FetchFacts,
    ListFilings,
    CompanyInfo,
    FetchDocuments,
    BuildIndex,
    Retrieve,
    ClearCache,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::ResolveCompany => "resolve company",
            Step::FetchFacts => "fetch company facts",
            Step::ListFilings => "list filings",
            Step::CompanyInfo => "fetch company info",
            Step::FetchDocuments => "fetch filing documents",
            Step::BuildIndex => "build relevance index",
            Step::Retrieve => "retrieve excerpts",
            Step::ClearCache => "clear cache",
        };
        f.write_str(name)
    }
}

/// Errors that abort a report request.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Input rejected before any external call.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Invalid orchestrator configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The company or its filings do not exist.
    #[error("{step} failed: {message}")]
    NotFound { step: Step, message: String },

    /// The filing source failed.
    #[error("{step} failed: {source}")]
    Source {
        step: Step,
        #[source]
        source: EdgarError,
    },

    /// The relevance index failed.
    #[error("{step} failed: {source}")]
    Index {
        step: Step,
        #[source]
        source: RagError,
    },

    /// Local cache files could not be removed.
    #[error("{step} failed at {path}: {source}")]
    Io {
        step: Step,
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ReportError {
    /// Wrap a filing-source error, keeping "not found" distinct from transport failures.
    pub fn from_source(step: Step, source: EdgarError) -> Self {
        match source {
            EdgarError::NotFound(message) => ReportError::NotFound { step, message },
            source => ReportError::Source { step, source },
        }
    }

    pub fn from_index(step: Step, source: RagError) -> Self {
        ReportError::Index { step, source }
    }

    /// The step that failed, if the error happened inside the pipeline.
    pub fn step(&self) -> Option<Step> {
        match self {
            ReportError::Validation(_) | ReportError::Config(_) => None,
            ReportError::NotFound { step, .. }
            | ReportError::Source { step, .. }
            | ReportError::Index { step, .. }
            | ReportError::Io { step, .. } => Some(*step),
        }
    }
}

/// A convenience result type for report operations.
pub type Result<T> = std::result::Result<T, ReportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edgar_not_found_stays_not_found() {
        let err = ReportError::from_source(Step::FetchFacts, EdgarError::NotFound("CIK0000000000".into()));
        assert!(matches!(err, ReportError::NotFound { step: Step::FetchFacts, .. }));
        assert_eq!(err.to_string(), "fetch company facts failed: CIK0000000000");
    }

    #[test]
    fn message_names_the_step() {
        let err = ReportError::from_source(Step::ListFilings, EdgarError::Parse("bad json".into()));
        assert_eq!(err.to_string(), "list filings failed: Parse error: bad json");
        assert_eq!(err.step(), Some(Step::ListFilings));
        assert_eq!(ReportError::Validation("empty".into()).step(), None);
    }
}
