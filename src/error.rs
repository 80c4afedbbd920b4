//! Error types for the document pipeline.
//!
//! Every failure that can cross a module boundary is a [`PipelineError`]
//! variant, so callers (and ultimately the HTTP layer) can branch on the
//! kind without parsing message strings. Provider failures keep their
//! classification (auth / quota / service) all the way from the API call
//! to the response status code.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while processing, indexing, or querying documents.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// No usable text could be obtained from a source document.
    #[error("no usable text extracted: {0}")]
    Extraction(String),

    /// The embedding or completion provider rejected our credentials.
    #[error("provider authentication failed: {0}")]
    ProviderAuth(String),

    /// The provider reported an exhausted quota or rate limit.
    #[error("provider quota exceeded: {0}")]
    ProviderQuota(String),

    /// Any other provider-side failure (5xx, malformed response, network).
    #[error("provider service error: {0}")]
    ProviderService(String),

    /// Unknown document id, or an empty registry when a default was requested.
    #[error("document not found: {0}")]
    NotFound(String),

    /// A registry record exists but its index artifact is gone from disk.
    #[error("index artifact missing at {}", .0.display())]
    IndexMissing(PathBuf),

    /// Filesystem read/write failure on an index or registry artifact.
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// Anything else during ingestion (serialization, format mismatch, ...).
    #[error("build error: {0}")]
    Build(String),
}

impl PipelineError {
    /// True for failures originating at the embedding/completion provider.
    ///
    /// These must stay distinguishable from generic ingestion failures at
    /// every layer; the HTTP boundary maps them to 401/429/503.
    pub fn is_provider(&self) -> bool {
        matches!(
            self,
            PipelineError::ProviderAuth(_)
                | PipelineError::ProviderQuota(_)
                | PipelineError::ProviderService(_)
        )
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(e: serde_json::Error) -> Self {
        PipelineError::Build(format!("serialization failed: {e}"))
    }
}

/// A convenience result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
