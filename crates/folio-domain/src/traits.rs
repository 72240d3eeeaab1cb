//! Trait definitions for external interactions
//!
//! These traits define the boundaries between ingestion logic and
//! infrastructure. Implementations live in other crates:
//!
//! - [`TextBackend`] / [`TextExtractor`]: `folio-ocr`
//! - [`Classifier`]: `folio-classifier`
//! - [`LlmProvider`]: `folio-llm`
//! - [`FileStore`]: `folio-drive`
//! - [`Catalog`] / [`TokenStore`]: `folio-store`

use crate::classification::{ClassificationResult, RawText, TextExtraction};
use crate::document::Document;
use crate::document_type::DocumentType;
use crate::error::PortError;
use crate::field::{ExtractionResult, InferredFieldsResult};
use crate::files::{FileRef, FolderRef, StoreStatus};
use crate::ids::{DocumentId, DocumentTypeId, OwnerId};
use crate::sample::{FieldConsolidation, LabelMerge, ProcessedDocument};
use crate::token::OAuthToken;
use async_trait::async_trait;

/// A single text recognition backend with two modes
#[async_trait]
pub trait TextBackend: Send + Sync {
    /// Fast structured extraction
    async fn extract_standard(&self, source_url: &str, mime_type: &str)
        -> Result<RawText, PortError>;

    /// Layout-aware vision extraction
    async fn extract_vision(&self, source_url: &str, mime_type: &str)
        -> Result<RawText, PortError>;

    /// Whether vision mode accepts this mime type
    fn supports_vision(&self, mime_type: &str) -> bool;
}

/// Turns a file reference into text, choosing the mode itself
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extract text from the file at `source_url`
    async fn extract(&self, source_url: &str, mime_type: &str)
        -> Result<TextExtraction, PortError>;
}

/// Document understanding: classification, extraction and inference
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Pick the best candidate type for `text`, or flag it as unclassified
    async fn classify(
        &self,
        text: &str,
        candidates: &[DocumentType],
    ) -> Result<ClassificationResult, PortError>;

    /// Fill `document_type`'s schema from recognized text
    async fn extract_fields(
        &self,
        text: &str,
        document_type: &DocumentType,
    ) -> Result<ExtractionResult, PortError>;

    /// Fill `document_type`'s schema from the raw file
    async fn extract_fields_vision(
        &self,
        bytes: &[u8],
        mime_type: &str,
        document_type: &DocumentType,
    ) -> Result<ExtractionResult, PortError>;

    /// Propose a type label and key fields from recognized text
    async fn infer_unclassified(&self, text: &str) -> Result<InferredFieldsResult, PortError>;

    /// Propose a type label and key fields from the raw file
    async fn infer_unclassified_vision(
        &self,
        bytes: &[u8],
        mime_type: &str,
    ) -> Result<InferredFieldsResult, PortError>;

    /// Group labels that denote the same document concept
    ///
    /// Labels with no true equivalent must not appear in any merge.
    async fn homologate_labels(&self, labels: &[String]) -> Result<Vec<LabelMerge>, PortError>;

    /// Merge per-document field lists into canonical fields
    async fn consolidate_fields(
        &self,
        type_label: &str,
        documents: &[ProcessedDocument],
    ) -> Result<FieldConsolidation, PortError>;
}

/// Attachment passed alongside a prompt
#[derive(Debug, Clone, Copy)]
pub struct Attachment<'a> {
    /// Mime type of `data`
    pub mime_type: &'a str,
    /// Raw bytes
    pub data: &'a [u8],
}

/// Trait for LLM provider operations
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Error type for LLM operations
    type Error: std::error::Error + Send + Sync + 'static;

    /// Generate text completion
    async fn generate(&self, prompt: &str) -> Result<String, Self::Error>;

    /// Generate a completion grounded on an attached file
    async fn generate_with_attachment(
        &self,
        prompt: &str,
        attachment: Attachment<'_>,
    ) -> Result<String, Self::Error>;
}

/// Hierarchical object store
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Id of the root folder new folders are created under by default
    fn root_folder(&self) -> &str;

    /// Create a folder under `parent` (root when `None`)
    async fn create_folder(&self, name: &str, parent: Option<&str>)
        -> Result<FolderRef, PortError>;

    /// Find a folder by exact name under `parent` (root when `None`)
    async fn find_folder(&self, name: &str, parent: Option<&str>)
        -> Result<Option<FolderRef>, PortError>;

    /// Upload bytes into a folder
    async fn upload(
        &self,
        bytes: &[u8],
        name: &str,
        mime_type: &str,
        folder_id: &str,
    ) -> Result<FileRef, PortError>;

    /// Move a file into another folder; its id does not change
    async fn move_file(&self, file_id: &str, target_folder_id: &str) -> Result<(), PortError>;

    /// Delete a file or folder
    ///
    /// With `check_empty`, a non-empty folder is refused with
    /// [`PortError::Rejected`].
    async fn delete(&self, file_id: &str, check_empty: bool) -> Result<(), PortError>;

    /// Make the file readable by link and return a URL external services can fetch
    async fn public_url(&self, file_id: &str) -> Result<String, PortError>;

    /// Browsable link to the file, if the store has one
    async fn file_link(&self, file_id: &str) -> Result<Option<String>, PortError>;

    /// List the entries of a folder
    async fn list(&self, folder_id: &str) -> Result<Vec<FileRef>, PortError>;

    /// Connection state, without touching the remote service
    async fn status(&self) -> Result<StoreStatus, PortError>;

    /// Find a folder by name or create it
    async fn ensure_folder(&self, name: &str, parent: Option<&str>)
        -> Result<FolderRef, PortError> {
        if let Some(folder) = self.find_folder(name, parent).await? {
            return Ok(folder);
        }
        self.create_folder(name, parent).await
    }
}

/// Persistent store of document types and documents, keyed by owner
#[async_trait]
pub trait Catalog: Send + Sync {
    /// All types of an owner, newest first
    async fn find_types_by_owner(&self, owner: &OwnerId) -> Result<Vec<DocumentType>, PortError>;

    /// Find a type by name (trimmed, case-insensitive)
    async fn find_type_by_name(
        &self,
        owner: &OwnerId,
        name: &str,
    ) -> Result<Option<DocumentType>, PortError>;

    /// Get a type by id
    async fn get_type(
        &self,
        owner: &OwnerId,
        id: DocumentTypeId,
    ) -> Result<Option<DocumentType>, PortError>;

    /// Insert a new type; [`PortError::Conflict`] if the name is taken
    async fn save_type(&self, document_type: &DocumentType) -> Result<(), PortError>;

    /// Replace name, description, fields and folder of an existing type
    async fn update_type(&self, document_type: &DocumentType) -> Result<(), PortError>;

    /// Delete a type and its documents; returns the number of documents removed
    async fn delete_type(&self, owner: &OwnerId, id: DocumentTypeId) -> Result<usize, PortError>;

    /// Insert a document
    async fn save_document(&self, document: &Document) -> Result<(), PortError>;

    /// All documents of an owner, newest first
    async fn find_documents_by_owner(&self, owner: &OwnerId) -> Result<Vec<Document>, PortError>;

    /// Get a document by id
    async fn get_document(
        &self,
        owner: &OwnerId,
        id: DocumentId,
    ) -> Result<Option<Document>, PortError>;

    /// Delete a document; returns whether it existed
    async fn delete_document(&self, owner: &OwnerId, id: DocumentId) -> Result<bool, PortError>;
}

/// Persistence for file store credentials
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Load the token stored for `account`
    async fn load(&self, account: &str) -> Result<Option<OAuthToken>, PortError>;

    /// Store (or replace) the token for `account`
    async fn save(&self, account: &str, token: &OAuthToken) -> Result<(), PortError>;
}
