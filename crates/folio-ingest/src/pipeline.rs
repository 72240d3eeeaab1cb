//! Single-document ingestion pipeline
//!
//! A file moves through the stages of [`PipelineStage`] strictly in order.
//! Once it has been staged in the file store, any later failure triggers one
//! best-effort delete of the staged file before the error is returned. Each
//! external call is attempted once.

use crate::catch_all::resolve_catch_all;
use crate::config::{CatchAllConfig, PipelineConfig};
use crate::error::IngestError;
use crate::matching::{match_type, TypeMatch};
use crate::validation::{validate_upload, IncomingFile};
use folio_domain::traits::{Catalog, Classifier, FileStore, TextExtractor};
use folio_domain::{
    ClassificationResult, Document, DocumentType, ExtractionResult, FolderHandle,
    InferredFieldsResult, OwnerId,
};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Label used when the model offers no type name for an unclassified file
pub(crate) const UNNAMED_TYPE: &str = "Unclassified Document";

/// Pipeline stages, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    /// Uploaded to the staging folder
    Staged,
    /// Text recognized
    TextExtracted,
    /// Classifier consulted
    Classified,
    /// Target type decided (possibly the catch-all)
    TypeResolved,
    /// Structured data extracted
    FieldsExtracted,
    /// Moved into the type's folder
    Relocated,
    /// Document record saved
    Persisted,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (n, name) = match self {
            PipelineStage::Staged => (1, "staged"),
            PipelineStage::TextExtracted => (2, "text extracted"),
            PipelineStage::Classified => (3, "classified"),
            PipelineStage::TypeResolved => (4, "type resolved"),
            PipelineStage::FieldsExtracted => (5, "fields extracted"),
            PipelineStage::Relocated => (6, "relocated"),
            PipelineStage::Persisted => (7, "persisted"),
        };
        write!(f, "{}/7 {}", n, name)
    }
}

/// Result of processing one file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessingOutcome {
    /// The stored document
    pub document: Document,
    /// False when the document went to the catch-all type
    pub was_classified: bool,
    /// Whether this run created the catch-all type
    pub created_catch_all: bool,
    /// User-facing summary
    pub message: String,
}

enum Resolution {
    Known(DocumentType),
    CatchAll {
        document_type: DocumentType,
        created: bool,
        inferred: InferredFieldsResult,
    },
}

/// Runs the single-document pipeline against injected collaborators
pub struct DocumentPipeline {
    extractor: Arc<dyn TextExtractor>,
    classifier: Arc<dyn Classifier>,
    files: Arc<dyn FileStore>,
    catalog: Arc<dyn Catalog>,
    config: PipelineConfig,
    catch_all: CatchAllConfig,
}

impl DocumentPipeline {
    /// Create a pipeline with default settings
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        classifier: Arc<dyn Classifier>,
        files: Arc<dyn FileStore>,
        catalog: Arc<dyn Catalog>,
    ) -> Self {
        Self {
            extractor,
            classifier,
            files,
            catalog,
            config: PipelineConfig::default(),
            catch_all: CatchAllConfig::default(),
        }
    }

    /// Replace the settings
    pub fn with_config(mut self, config: PipelineConfig, catch_all: CatchAllConfig) -> Self {
        self.config = config;
        self.catch_all = catch_all;
        self
    }

    /// Process one uploaded file for `owner`
    pub async fn process(
        &self,
        owner: &OwnerId,
        file: &IncomingFile,
    ) -> Result<ProcessingOutcome, IngestError> {
        validate_upload(file, &self.config)?;
        info!("Processing '{}' ({} bytes) for {}", file.filename, file.bytes.len(), owner);

        let staged_id = self.stage(file).await?;

        match self.run_staged(owner, file, &staged_id).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                error!("Processing '{}' failed: {}", file.filename, e);
                self.compensate(&staged_id).await;
                Err(e)
            }
        }
    }

    async fn stage(&self, file: &IncomingFile) -> Result<String, IngestError> {
        let folder = self
            .files
            .ensure_folder(&self.config.staging_folder, None)
            .await?;
        let staged = self
            .files
            .upload(&file.bytes, &file.filename, &file.mime_type, &folder.id)
            .await?;
        info!(stage = %PipelineStage::Staged, "'{}' staged as {}", file.filename, staged.id);
        Ok(staged.id)
    }

    async fn compensate(&self, staged_id: &str) {
        match self.files.delete(staged_id, false).await {
            Ok(()) => info!("Removed staged file {} after failure", staged_id),
            Err(e) => error!("Could not remove staged file {}: {}", staged_id, e),
        }
    }

    async fn run_staged(
        &self,
        owner: &OwnerId,
        file: &IncomingFile,
        staged_id: &str,
    ) -> Result<ProcessingOutcome, IngestError> {
        let public_url = self.files.public_url(staged_id).await?;

        let extraction = self.extractor.extract(&public_url, &file.mime_type).await?;
        info!(
            stage = %PipelineStage::TextExtracted,
            "{} characters via {:?} mode",
            extraction.text.chars().count(),
            extraction.method
        );

        let candidates = self.catalog.find_types_by_owner(owner).await?;
        if candidates.is_empty() {
            return Err(IngestError::NoTypesConfigured);
        }

        let classification = self.classifier.classify(&extraction.text, &candidates).await?;
        info!(
            stage = %PipelineStage::Classified,
            "is_others={} confidence={:.2} candidate={:?}",
            classification.is_others(),
            classification.confidence(),
            classification.matched_type_name()
        );

        let resolution = self
            .resolve_type(owner, file, &classification, &candidates)
            .await?;

        let (mut document_type, extracted, catch_all) = match resolution {
            Resolution::Known(document_type) => {
                info!(stage = %PipelineStage::TypeResolved, "Using type '{}'", document_type.name);
                let extracted = self
                    .classifier
                    .extract_fields_vision(&file.bytes, &file.mime_type, &document_type)
                    .await?;
                (document_type, extracted, None)
            }
            Resolution::CatchAll {
                document_type,
                created,
                inferred,
            } => {
                info!(
                    stage = %PipelineStage::TypeResolved,
                    "Using catch-all type '{}' (suggested: '{}')",
                    document_type.name,
                    inferred.inferred_type
                );
                let extracted = inferred.to_extraction();
                (document_type, extracted, Some((created, inferred)))
            }
        };
        info!(
            stage = %PipelineStage::FieldsExtracted,
            "{} fields",
            extracted.fields.len()
        );

        let folder_id = type_folder(&*self.files, &*self.catalog, &mut document_type).await?;
        self.files.move_file(staged_id, &folder_id).await?;
        let link = self
            .files
            .file_link(staged_id)
            .await?
            .unwrap_or(public_url);
        info!(stage = %PipelineStage::Relocated, "Moved to '{}'", document_type.name);

        let outcome = self.persist(
            owner,
            file,
            staged_id,
            link,
            &document_type,
            extracted,
            extraction.text,
            &classification,
            catch_all,
        );
        self.catalog.save_document(&outcome.document).await?;
        info!(stage = %PipelineStage::Persisted, "Document {} saved", outcome.document.id);

        Ok(outcome)
    }

    async fn resolve_type(
        &self,
        owner: &OwnerId,
        file: &IncomingFile,
        classification: &ClassificationResult,
        candidates: &[DocumentType],
    ) -> Result<Resolution, IngestError> {
        if !classification.is_others() {
            let name = classification.matched_type_name().unwrap_or_default();
            match match_type(name, candidates) {
                TypeMatch::Exact(ty) => return Ok(Resolution::Known(ty.clone())),
                TypeMatch::Fuzzy(ty) => {
                    warn!("No exact type named '{}'; using similar type '{}'", name, ty.name);
                    return Ok(Resolution::Known(ty.clone()));
                }
                TypeMatch::NoMatch => {
                    warn!("No type matches '{}'; filing as unclassified", name);
                }
            }
        }

        let (document_type, created) =
            resolve_catch_all(owner, &self.catch_all, &*self.catalog, &*self.files).await?;
        let inferred = self
            .classifier
            .infer_unclassified_vision(&file.bytes, &file.mime_type)
            .await?;
        Ok(Resolution::CatchAll {
            document_type,
            created,
            inferred,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn persist(
        &self,
        owner: &OwnerId,
        file: &IncomingFile,
        staged_id: &str,
        link: String,
        document_type: &DocumentType,
        extracted: ExtractionResult,
        raw_text: String,
        classification: &ClassificationResult,
        catch_all: Option<(bool, InferredFieldsResult)>,
    ) -> ProcessingOutcome {
        let document = Document::completed(
            owner.clone(),
            document_type.id,
            file.filename.clone(),
            file.mime_type.clone(),
            extracted,
            classification.confidence(),
        )
        .stored_at(staged_id, link)
        .with_raw_text(raw_text);

        match catch_all {
            None => ProcessingOutcome {
                message: format!(
                    "Classified as \"{}\" with {:.1}% confidence",
                    document_type.name,
                    classification.confidence() * 100.0
                ),
                document,
                was_classified: true,
                created_catch_all: false,
            },
            Some((created, inferred)) => {
                let suggested = if inferred.inferred_type.trim().is_empty() {
                    UNNAMED_TYPE.to_string()
                } else {
                    inferred.inferred_type.clone()
                };
                ProcessingOutcome {
                    message: format!(
                        "Stored in \"{}\". The model suggests it may be: \"{}\"",
                        document_type.name, suggested
                    ),
                    document: document.with_inferred_data(inferred),
                    was_classified: false,
                    created_catch_all: created,
                }
            }
        }
    }
}

/// Folder of a type, created and recorded if the type has none yet
pub(crate) async fn type_folder(
    files: &dyn FileStore,
    catalog: &dyn Catalog,
    document_type: &mut DocumentType,
) -> Result<String, IngestError> {
    if let Some(folder) = &document_type.folder {
        return Ok(folder.id.clone());
    }
    warn!("Type '{}' has no folder; creating one", document_type.name);
    let folder = files.ensure_folder(&document_type.name, None).await?;
    document_type.folder = Some(FolderHandle {
        id: folder.id.clone(),
        link: folder.link,
    });
    catalog.update_type(document_type).await?;
    Ok(folder.id)
}
