//! Error types for assembly ingestion
//!
//! Only a failed pipeline run is handled by the job driver (the tracker row is
//! marked `Failed` before the error is returned). Everything else propagates
//! to the binary, which logs it and exits non-zero.

use thiserror::Error;

/// Result type alias for ingestion operations
pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Error, Debug)]
pub enum IngestError {
    /// SQL query or connection error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read or write YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Common(#[from] eva_common::EvaError),

    /// Configuration is missing or invalid
    #[error("Configuration error: {0}. Check the assembly config file (ASSEMBLYCONFIG).")]
    Config(String),

    /// The external pipeline exited with a non-zero status
    #[error("Nextflow pipeline failed for source assembly {assembly}: {status}")]
    PipelineFailed { assembly: String, status: String },

    #[error("Contig alias service returned {status}: {body}")]
    ContigAlias { status: u16, body: String },

    /// External lookup service did not return a usable answer
    #[error("Lookup failed: {0}")]
    Lookup(String),
}

impl IngestError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Whether this error came from the external pipeline rather than from
    /// our own bookkeeping
    pub fn is_pipeline_failure(&self) -> bool {
        matches!(self, Self::PipelineFailed { .. })
    }
}
