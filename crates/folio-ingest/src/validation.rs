//! Boundary checks run before any side effect

use crate::config::{InferenceConfig, PipelineConfig};
use crate::error::IngestError;

/// A file received from a caller
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingFile {
    /// Original filename
    pub filename: String,
    /// Declared mime type
    pub mime_type: String,
    /// File content
    pub bytes: Vec<u8>,
}

impl IncomingFile {
    /// Create a file
    pub fn new(filename: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }
}

fn check_file(
    file: &IncomingFile,
    max_bytes: usize,
    accepted: &[String],
) -> Result<(), IngestError> {
    if file.filename.trim().is_empty() {
        return Err(IngestError::Validation("file name is missing".to_string()));
    }
    if file.bytes.is_empty() {
        return Err(IngestError::Validation(format!("'{}' is empty", file.filename)));
    }
    if file.bytes.len() > max_bytes {
        return Err(IngestError::Validation(format!(
            "'{}' is {} bytes; the limit is {} bytes",
            file.filename,
            file.bytes.len(),
            max_bytes
        )));
    }
    let mime = file.mime_type.trim().to_lowercase();
    if !accepted.iter().any(|m| m.eq_ignore_ascii_case(&mime)) {
        return Err(IngestError::Validation(format!(
            "'{}' has unsupported type '{}' (accepted: {})",
            file.filename,
            file.mime_type,
            accepted.join(", ")
        )));
    }
    Ok(())
}

/// Check a single upload against the pipeline limits
pub fn validate_upload(file: &IncomingFile, config: &PipelineConfig) -> Result<(), IngestError> {
    check_file(file, config.max_file_bytes, &config.accepted_mime_types)
}

/// Check an inference batch: sample count first, then every file
pub fn validate_samples(
    files: &[IncomingFile],
    config: &InferenceConfig,
) -> Result<(), IngestError> {
    if files.len() < config.min_samples {
        return Err(IngestError::Validation(format!(
            "at least {} sample documents are required, got {}",
            config.min_samples,
            files.len()
        )));
    }
    if files.len() > config.max_samples {
        return Err(IngestError::Validation(format!(
            "at most {} sample documents are accepted, got {}",
            config.max_samples,
            files.len()
        )));
    }
    for file in files {
        check_file(file, config.max_file_bytes, &config.accepted_mime_types)?;
    }
    Ok(())
}
