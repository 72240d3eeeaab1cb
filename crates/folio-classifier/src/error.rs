//! Error types for the Classifier

use folio_domain::PortError;
use thiserror::Error;

/// Errors that can occur during classification and extraction
#[derive(Error, Debug)]
pub enum ClassifierError {
    /// LLM provider error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Model output could not be decoded, even leniently
    #[error("Could not decode {what}: {message}")]
    Parse {
        /// What was being decoded
        what: &'static str,
        /// Decoder message
        message: String,
    },

    /// Decoded output violates the expected contract
    #[error("Invalid {what}: {message}")]
    InvalidFormat {
        /// What was being decoded
        what: &'static str,
        /// What was wrong
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<ClassifierError> for PortError {
    fn from(e: ClassifierError) -> Self {
        match e {
            ClassifierError::Parse { what, message }
            | ClassifierError::InvalidFormat { what, message } => PortError::parse(what, message),
            ClassifierError::Llm(message) => PortError::service("reasoning", message),
            ClassifierError::Config(message) => PortError::service("reasoning", message),
        }
    }
}
