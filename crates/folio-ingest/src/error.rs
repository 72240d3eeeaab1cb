//! Error types for ingestion

use folio_domain::PortError;
use thiserror::Error;

/// Errors surfaced by the pipeline and the inference orchestrator
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IngestError {
    /// Missing credentials or invalid settings
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Input rejected before any side effect
    #[error("Validation error: {0}")]
    Validation(String),

    /// A collaborator call failed
    #[error("{service} call failed: {message}")]
    ExternalService {
        /// Which collaborator failed
        service: &'static str,
        /// Diagnostic detail (not user-safe)
        message: String,
    },

    /// Structured output could not be decoded
    #[error("Could not decode {what}: {message}")]
    Parse {
        /// What was being decoded
        what: &'static str,
        /// Decoder message
        message: String,
    },

    /// Owner-scoped name collision
    #[error("Document type name already exists: {0}")]
    Conflict(String),

    /// The owner has no document types to classify against
    #[error("No document types are configured; create at least one before uploading")]
    NoTypesConfigured,

    /// Record does not exist
    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<PortError> for IngestError {
    fn from(e: PortError) -> Self {
        match e {
            PortError::Service { service, message } => {
                IngestError::ExternalService { service, message }
            }
            PortError::Parse { what, message } => IngestError::Parse { what, message },
            PortError::Conflict(name) => IngestError::Conflict(name),
            PortError::NotFound(what) => IngestError::NotFound(what),
            PortError::Rejected(reason) => IngestError::Validation(reason),
        }
    }
}
