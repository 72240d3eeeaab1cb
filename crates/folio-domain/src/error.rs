//! Error type shared by the capability traits

use thiserror::Error;

/// Failure reported by a capability adapter
///
/// Adapters map their own error types onto these variants so that the
/// ingestion layer can tell an unavailable service from undecodable output
/// or a name collision.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PortError {
    /// The external service call failed
    #[error("{service} call failed: {message}")]
    Service {
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

    /// An owner-scoped name is already taken
    #[error("Name already in use: {0}")]
    Conflict(String),

    /// The referenced record or file does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The operation refused to act (e.g. deleting a non-empty folder)
    #[error("Rejected: {0}")]
    Rejected(String),
}

impl PortError {
    /// Shorthand for a service failure
    pub fn service(service: &'static str, message: impl Into<String>) -> Self {
        PortError::Service {
            service,
            message: message.into(),
        }
    }

    /// Shorthand for a decode failure
    pub fn parse(what: &'static str, message: impl Into<String>) -> Self {
        PortError::Parse {
            what,
            message: message.into(),
        }
    }
}
