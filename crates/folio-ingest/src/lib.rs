//! Folio Ingest
//!
//! The two stateful workflows of Folio: ingesting one uploaded document, and
//! discovering document types from a batch of samples.
//!
//! # Overview
//!
//! [`DocumentPipeline`] takes one file through seven ordered stages:
//!
//! ```text
//! stage → extract text → classify → resolve type → extract fields → relocate → persist
//! ```
//!
//! Once the file is staged, any failure deletes the staged file exactly once
//! before the error is returned, so a failed run leaves neither a document
//! record nor a stray file behind.
//!
//! [`TypeInferenceOrchestrator`] groups sample files by inferred type label,
//! merges synonymous labels, consolidates one schema per new type and creates
//! the type. Existing types are reused as they are.
//!
//! Both depend only on the capability traits in `folio_domain::traits`.
//!
//! # Example Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use folio_classifier::{ClassifierConfig, LlmClassifier};
//! use folio_domain::OwnerId;
//! use folio_drive::LocalFileStore;
//! use folio_ingest::{DocumentPipeline, IncomingFile};
//! use folio_llm::{GeminiConfig, GeminiProvider};
//! use folio_ocr::{MistralOcr, OcrConfig, QualityGatedExtractor};
//! use folio_store::SqliteCatalog;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let ocr = MistralOcr::new(OcrConfig::default(), "ocr-key")?;
//! let llm = GeminiProvider::new(GeminiConfig::new("llm-key"))?;
//!
//! let pipeline = DocumentPipeline::new(
//!     Arc::new(QualityGatedExtractor::new(ocr)),
//!     Arc::new(LlmClassifier::new(llm, ClassifierConfig::default())),
//!     Arc::new(LocalFileStore::new("./files")?),
//!     Arc::new(SqliteCatalog::new("folio.db")?),
//! );
//!
//! let file = IncomingFile::new("receipt.png", "image/png", std::fs::read("receipt.png")?);
//! let outcome = pipeline.process(&OwnerId::from("alice"), &file).await?;
//! println!("{}", outcome.message);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod catch_all;
pub mod config;
pub mod consolidation;
pub mod error;
pub mod fanout;
pub mod inference;
pub mod matching;
pub mod pipeline;
pub mod validation;

// Re-exports for convenience
pub use config::{CatchAllConfig, InferenceConfig, PipelineConfig};
pub use error::IngestError;
pub use fanout::BoundedFanOut;
pub use inference::{
    InferenceReport, InferenceRequest, InferredTypeSummary, TypeInferenceOrchestrator,
};
pub use matching::TypeMatch;
pub use pipeline::{DocumentPipeline, PipelineStage, ProcessingOutcome};
pub use validation::IncomingFile;
