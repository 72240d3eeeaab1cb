//! Error types for text extraction

use folio_domain::PortError;
use thiserror::Error;

/// Errors that can occur during text extraction
#[derive(Error, Debug)]
pub enum OcrError {
    /// HTTP communication failure
    #[error("OCR request failed: {0}")]
    Communication(String),

    /// The service answered with an error status
    #[error("OCR service returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// The service answered with something we could not read
    #[error("Invalid OCR response: {0}")]
    InvalidResponse(String),

    /// The service recognized no text
    #[error("No text recognized")]
    EmptyText,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<OcrError> for PortError {
    fn from(e: OcrError) -> Self {
        PortError::service("ocr", e.to_string())
    }
}
