//! Documents: the persisted outcome of an ingestion

use crate::field::{ExtractionResult, InferredFieldsResult};
use crate::ids::{DocumentId, DocumentTypeId, OwnerId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Processing status of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    /// Ingestion in progress
    Processing,
    /// Ingestion finished successfully
    Completed,
    /// Ingestion failed
    Failed,
}

impl DocumentStatus {
    /// Stored name
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Processing => "processing",
            DocumentStatus::Completed => "completed",
            DocumentStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(DocumentStatus::Processing),
            "completed" => Ok(DocumentStatus::Completed),
            "failed" => Ok(DocumentStatus::Failed),
            other => Err(format!("Unknown document status: {}", other)),
        }
    }
}

/// An ingested document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier
    pub id: DocumentId,

    /// Owner of the document
    pub owner_id: OwnerId,

    /// Resolved type (absent only transiently)
    pub document_type_id: Option<DocumentTypeId>,

    /// Original filename
    pub filename: String,

    /// File id in the file store
    pub file_id: String,

    /// Link to the file in the file store
    pub file_link: String,

    /// Mime type of the stored file
    pub mime_type: String,

    /// Extracted summary and field values
    pub extracted_data: ExtractionResult,

    /// Inference output, kept only for catch-all documents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inferred_data: Option<InferredFieldsResult>,

    /// Raw recognized text, when text extraction ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,

    /// Confidence in [0, 1]
    pub confidence: f64,

    /// Processing status
    pub status: DocumentStatus,

    /// Creation time
    pub created_at: DateTime<Utc>,

    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Create a completed document with a fresh id
    ///
    /// Confidence is clamped to [0, 1].
    pub fn completed(
        owner_id: OwnerId,
        document_type_id: DocumentTypeId,
        filename: impl Into<String>,
        mime_type: impl Into<String>,
        extracted_data: ExtractionResult,
        confidence: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: DocumentId::new(),
            owner_id,
            document_type_id: Some(document_type_id),
            filename: filename.into(),
            file_id: String::new(),
            file_link: String::new(),
            mime_type: mime_type.into(),
            extracted_data,
            inferred_data: None,
            raw_text: None,
            confidence: confidence.clamp(0.0, 1.0),
            status: DocumentStatus::Completed,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the stored file location
    pub fn stored_at(mut self, file_id: impl Into<String>, file_link: impl Into<String>) -> Self {
        self.file_id = file_id.into();
        self.file_link = file_link.into();
        self
    }

    /// Attach raw recognized text
    pub fn with_raw_text(mut self, text: impl Into<String>) -> Self {
        self.raw_text = Some(text.into());
        self
    }

    /// Attach inference output
    pub fn with_inferred_data(mut self, inferred: InferredFieldsResult) -> Self {
        self.inferred_data = Some(inferred);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            DocumentStatus::Processing,
            DocumentStatus::Completed,
            DocumentStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<DocumentStatus>().unwrap(), status);
        }
        assert!("done".parse::<DocumentStatus>().is_err());
    }

    #[test]
    fn test_completed_clamps_confidence() {
        let doc = Document::completed(
            OwnerId::new("o"),
            DocumentTypeId::new(),
            "a.pdf",
            "application/pdf",
            ExtractionResult::default(),
            1.7,
        )
        .stored_at("file-1", "https://files/1");
        assert_eq!(doc.confidence, 1.0);
        assert_eq!(doc.status, DocumentStatus::Completed);
        assert_eq!(doc.file_id, "file-1");
        assert!(doc.raw_text.is_none());
    }
}
