//! Folio Domain Layer
//!
//! Core model and capability contracts for document ingestion. Every other
//! crate in the workspace depends on this one; it holds no I/O of its own.
//!
//! ## Key Concepts
//!
//! - **DocumentType**: a named, owner-scoped schema describing what to extract
//! - **FieldDefinition**: one field of a schema, with a closed [`FieldType`]
//! - **Document**: the persisted outcome of one successful ingestion
//! - **ClassificationResult**: which type (if any) a document belongs to
//! - **Catch-all type**: the fallback type used when classification is not
//!   confident enough or nothing matches
//!
//! ## Architecture
//!
//! Infrastructure (OCR, reasoning model, file store, catalog) is reached only
//! through the async traits in [`traits`]. Adapters live in other crates and
//! report failures as [`PortError`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod classification;
pub mod document;
pub mod document_type;
pub mod error;
pub mod field;
pub mod files;
pub mod ids;
pub mod sample;
pub mod token;
pub mod traits;

// Re-exports for convenience
pub use classification::{
    ClassificationProposal, ClassificationResult, ExtractionMethod, RawText, TextExtraction,
};
pub use document::{Document, DocumentStatus};
pub use document_type::{DocumentType, FolderHandle};
pub use error::PortError;
pub use field::{
    ConsolidatedField, ExtractedField, ExtractionResult, FieldDefinition, FieldType,
    FieldWithValue, InferredFieldsResult,
};
pub use files::{FileRef, FolderRef, StoreStatus};
pub use ids::{DocumentId, DocumentTypeId, OwnerId};
pub use sample::{
    ConsolidatedType, FieldConsolidation, FieldProposal, LabelMerge, ProcessedDocument,
};
pub use token::OAuthToken;
