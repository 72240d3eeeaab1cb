//! Sample-based type inference
//!
//! Given a handful of unlabeled sample files, [`TypeInferenceOrchestrator`]
//! discovers which document types they represent, merges near-duplicate type
//! names, consolidates one schema per new type and creates it. Optionally the
//! samples are stored as documents of the resulting types.
//!
//! Failures are contained: a file that cannot be inferred is left out, a
//! group that cannot be consolidated or created is left out, and the batch
//! carries on with the rest.

use crate::config::InferenceConfig;
use crate::consolidation::consolidate;
use crate::error::IngestError;
use crate::fanout::BoundedFanOut;
use crate::pipeline::{type_folder, UNNAMED_TYPE};
use crate::validation::{validate_samples, IncomingFile};
use folio_domain::document_type::name_key;
use folio_domain::traits::{Catalog, Classifier, FileStore};
use folio_domain::{
    ConsolidatedField, ConsolidatedType, Document, DocumentType, DocumentTypeId, FolderHandle,
    LabelMerge, OwnerId, ProcessedDocument,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// A batch of samples to infer types from
#[derive(Debug, Clone)]
pub struct InferenceRequest {
    /// Owner the types are created for
    pub owner: OwnerId,
    /// Sample files
    pub files: Vec<IncomingFile>,
    /// Also store every sample as a document
    pub persist_samples: bool,
}

/// One type the batch created or added documents to
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InferredTypeSummary {
    /// Type id
    pub id: DocumentTypeId,
    /// Type name
    pub name: String,
    /// Type description
    pub description: String,
    /// Number of schema fields
    pub field_count: usize,
    /// Number of samples in the group
    pub sample_count: usize,
    /// Folder id in the file store
    pub folder_id: Option<String>,
    /// Browsable folder link
    pub folder_link: Option<String>,
    /// Schema fields with their observed frequency
    pub fields: Vec<ConsolidatedField>,
    /// False when samples were added to a type that already existed
    pub is_new: bool,
}

impl InferredTypeSummary {
    fn created(document_type: &DocumentType, consolidated: &ConsolidatedType) -> Self {
        Self {
            id: document_type.id,
            name: document_type.name.clone(),
            description: consolidated.description.clone(),
            field_count: consolidated.fields.len(),
            sample_count: consolidated.sample_count(),
            folder_id: document_type.folder.as_ref().map(|f| f.id.clone()),
            folder_link: document_type.folder.as_ref().and_then(|f| f.link.clone()),
            fields: consolidated.fields.clone(),
            is_new: true,
        }
    }

    fn existing(document_type: &DocumentType, sample_count: usize) -> Self {
        let description = match document_type.description.as_deref() {
            Some(d) if !d.trim().is_empty() => {
                format!("{} ({} documents added)", d, sample_count)
            }
            _ => format!("{} documents added", sample_count),
        };
        Self {
            id: document_type.id,
            name: document_type.name.clone(),
            description,
            field_count: document_type.fields.len(),
            sample_count,
            folder_id: document_type.folder.as_ref().map(|f| f.id.clone()),
            folder_link: document_type.folder.as_ref().and_then(|f| f.link.clone()),
            fields: document_type
                .fields
                .iter()
                .map(|f| ConsolidatedField {
                    name: f.name.clone(),
                    label: f.label.clone(),
                    type_label: f.field_type.as_str().to_string(),
                    required: f.required,
                    description: f.description.clone(),
                    frequency: 1.0,
                })
                .collect(),
            is_new: false,
        }
    }
}

/// Outcome of a batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InferenceReport {
    /// Types created or extended, in discovery order
    pub created_types: Vec<InferredTypeSummary>,
    /// Samples submitted
    pub total_documents_processed: usize,
    /// Entries in `created_types`
    pub total_types_created: usize,
}

/// Samples that share a type label
#[derive(Debug)]
struct SampleGroup<'a> {
    label: String,
    files: Vec<&'a IncomingFile>,
    existing: Option<DocumentType>,
}

/// Drives type discovery over a batch of samples
pub struct TypeInferenceOrchestrator {
    classifier: Arc<dyn Classifier>,
    files: Arc<dyn FileStore>,
    catalog: Arc<dyn Catalog>,
    config: InferenceConfig,
}

impl TypeInferenceOrchestrator {
    /// Create an orchestrator with default settings
    pub fn new(
        classifier: Arc<dyn Classifier>,
        files: Arc<dyn FileStore>,
        catalog: Arc<dyn Catalog>,
    ) -> Self {
        Self {
            classifier,
            files,
            catalog,
            config: InferenceConfig::default(),
        }
    }

    /// Replace the settings
    pub fn with_config(mut self, config: InferenceConfig) -> Self {
        self.config = config;
        self
    }

    /// Run the whole batch
    ///
    /// Only validation and the initial catalog read fail the batch; every
    /// later failure is logged and excludes the affected file or group.
    pub async fn infer(&self, request: InferenceRequest) -> Result<InferenceReport, IngestError> {
        validate_samples(&request.files, &self.config)?;
        info!(
            "Inferring types from {} samples for {} (persist: {})",
            request.files.len(),
            request.owner,
            request.persist_samples
        );

        let groups = self.classify_and_group(&request.owner, &request.files).await?;
        let groups = self.homologate(groups).await;

        let mut created_types = Vec::new();
        for group in groups {
            info!("Processing group '{}' ({} samples)", group.label, group.files.len());
            let summary = match group.existing {
                Some(existing) => {
                    self.store_in_existing(
                        &request.owner,
                        existing,
                        &group.files,
                        request.persist_samples,
                    )
                    .await
                }
                None => {
                    self.create_new_type(
                        &request.owner,
                        &group.label,
                        &group.files,
                        request.persist_samples,
                    )
                    .await
                }
            };
            created_types.extend(summary);
        }

        info!("Inference finished: {} types", created_types.len());
        Ok(InferenceReport {
            total_documents_processed: request.files.len(),
            total_types_created: created_types.len(),
            created_types,
        })
    }

    async fn classify_and_group<'a>(
        &self,
        owner: &OwnerId,
        files: &'a [IncomingFile],
    ) -> Result<Vec<SampleGroup<'a>>, IngestError> {
        let known = self.catalog.find_types_by_owner(owner).await?;
        let fan_out = BoundedFanOut::new(self.config.max_concurrency);
        let classifier = &*self.classifier;

        let results = fan_out
            .run(files.iter(), |file| async move {
                let result = classifier
                    .infer_unclassified_vision(&file.bytes, &file.mime_type)
                    .await;
                (file, result)
            })
            .await;

        let mut groups: Vec<SampleGroup<'a>> = Vec::new();
        for (file, result) in results {
            let inferred = match result {
                Ok(inferred) => inferred,
                Err(e) => {
                    error!("Could not infer a type for '{}': {}", file.filename, e);
                    continue;
                }
            };
            let label = match inferred.inferred_type.trim() {
                "" => UNNAMED_TYPE.to_string(),
                l => l.to_string(),
            };
            let key = name_key(&label);
            debug!("'{}' looks like '{}'", file.filename, label);

            match groups.iter_mut().find(|g| name_key(&g.label) == key) {
                Some(group) => group.files.push(file),
                None => {
                    let existing = known.iter().find(|t| t.name_key() == key).cloned();
                    if let Some(ty) = &existing {
                        info!("Label '{}' matches existing type '{}'", label, ty.name);
                    }
                    groups.push(SampleGroup {
                        label,
                        files: vec![file],
                        existing,
                    });
                }
            }
        }
        Ok(groups)
    }

    async fn homologate<'a>(&self, groups: Vec<SampleGroup<'a>>) -> Vec<SampleGroup<'a>> {
        let new_labels: Vec<String> = groups
            .iter()
            .filter(|g| g.existing.is_none())
            .map(|g| g.label.clone())
            .collect();
        if new_labels.len() <= 1 {
            return groups;
        }

        match self.classifier.homologate_labels(&new_labels).await {
            Ok(merges) => {
                info!("Homologation returned {} merges", merges.len());
                apply_merges(groups, &merges)
            }
            Err(e) => {
                warn!("Label homologation failed, keeping labels as they are: {}", e);
                groups
            }
        }
    }

    async fn store_in_existing(
        &self,
        owner: &OwnerId,
        mut document_type: DocumentType,
        files: &[&IncomingFile],
        persist: bool,
    ) -> Option<InferredTypeSummary> {
        if !persist {
            info!("Type '{}' already exists; samples not stored", document_type.name);
            return None;
        }

        let folder_id =
            match type_folder(&*self.files, &*self.catalog, &mut document_type).await {
                Ok(id) => id,
                Err(e) => {
                    error!("No folder for type '{}': {}", document_type.name, e);
                    return None;
                }
            };

        for file in files {
            if let Err(e) = self
                .store_sample(
                    owner,
                    &document_type,
                    &folder_id,
                    &file.filename,
                    &file.mime_type,
                    &file.bytes,
                )
                .await
            {
                error!("Could not store '{}': {}", file.filename, e);
            }
        }
        Some(InferredTypeSummary::existing(&document_type, files.len()))
    }

    async fn create_new_type(
        &self,
        owner: &OwnerId,
        label: &str,
        files: &[&IncomingFile],
        persist: bool,
    ) -> Option<InferredTypeSummary> {
        let mut samples = Vec::with_capacity(files.len());
        for file in files {
            match self
                .classifier
                .infer_unclassified_vision(&file.bytes, &file.mime_type)
                .await
            {
                Ok(inferred) => samples.push(ProcessedDocument {
                    filename: file.filename.clone(),
                    inferred_type: label.to_string(),
                    fields: inferred.key_fields,
                    bytes: file.bytes.clone(),
                    mime_type: file.mime_type.clone(),
                }),
                Err(e) => error!("Could not extract fields from '{}': {}", file.filename, e),
            }
        }
        if samples.is_empty() {
            error!("No sample of '{}' yielded fields; skipping group", label);
            return None;
        }

        let consolidated =
            match consolidate(label, samples, &*self.classifier, self.config.max_fields).await {
                Ok(consolidated) => consolidated,
                Err(e) => {
                    error!("Consolidation of '{}' failed; nothing created: {}", label, e);
                    return None;
                }
            };

        match self.catalog.find_type_by_name(owner, label).await {
            Ok(Some(existing)) => {
                warn!("Type '{}' appeared meanwhile; using it", existing.name);
                return self.store_in_existing(owner, existing, files, persist).await;
            }
            Ok(None) => {}
            Err(e) => {
                error!("Could not check for type '{}': {}", label, e);
                return None;
            }
        }

        let document_type = match self.create_type(owner, &consolidated).await {
            Ok(document_type) => document_type,
            Err(IngestError::Conflict(_)) => {
                warn!("Type '{}' was created concurrently; using it", label);
                return match self.catalog.find_type_by_name(owner, label).await {
                    Ok(Some(existing)) => {
                        self.store_in_existing(owner, existing, files, persist).await
                    }
                    Ok(None) => {
                        error!(
                            "Type '{}' conflicted on create but is not in the catalog; skipping group",
                            label
                        );
                        None
                    }
                    Err(e) => {
                        error!("Could not load type '{}': {}", label, e);
                        None
                    }
                };
            }
            Err(e) => {
                error!("Could not create type '{}': {}", label, e);
                return None;
            }
        };
        info!(
            "Created type '{}' with {} fields",
            document_type.name,
            document_type.fields.len()
        );

        if persist {
            if let Some(folder) = &document_type.folder {
                for sample in &consolidated.samples {
                    if let Err(e) = self
                        .store_sample(
                            owner,
                            &document_type,
                            &folder.id,
                            &sample.filename,
                            &sample.mime_type,
                            &sample.bytes,
                        )
                        .await
                    {
                        error!("Could not store '{}': {}", sample.filename, e);
                    }
                }
            }
        }

        Some(InferredTypeSummary::created(&document_type, &consolidated))
    }

    async fn create_type(
        &self,
        owner: &OwnerId,
        consolidated: &ConsolidatedType,
    ) -> Result<DocumentType, IngestError> {
        let folder = self.files.ensure_folder(&consolidated.name, None).await?;
        let fields = consolidated
            .fields
            .iter()
            .map(ConsolidatedField::to_definition)
            .collect();
        let document_type = DocumentType::new(owner.clone(), consolidated.name.clone(), fields)
            .with_description(consolidated.description.clone())
            .with_folder(FolderHandle {
                id: folder.id,
                link: folder.link,
            });
        self.catalog.save_type(&document_type).await?;
        Ok(document_type)
    }

    /// Extract against `document_type`'s schema, upload and save one sample
    async fn store_sample(
        &self,
        owner: &OwnerId,
        document_type: &DocumentType,
        folder_id: &str,
        filename: &str,
        mime_type: &str,
        bytes: &[u8],
    ) -> Result<(), IngestError> {
        let extracted = self
            .classifier
            .extract_fields_vision(bytes, mime_type, document_type)
            .await?;
        let file = self.files.upload(bytes, filename, mime_type, folder_id).await?;

        let saved = async {
            let url = self.files.public_url(&file.id).await?;
            let document = Document::completed(
                owner.clone(),
                document_type.id,
                filename,
                mime_type,
                extracted,
                self.config.sample_confidence,
            )
            .stored_at(file.id.clone(), url);
            self.catalog.save_document(&document).await?;
            Ok::<_, IngestError>(document.id)
        }
        .await;

        match saved {
            Ok(id) => {
                info!("Stored '{}' as document {}", filename, id);
                Ok(())
            }
            Err(e) => {
                if let Err(cleanup) = self.files.delete(&file.id, false).await {
                    error!("Could not remove uploaded file {}: {}", file.id, cleanup);
                }
                Err(e)
            }
        }
    }
}

/// Apply label merges to the new-type groups
///
/// Each merge gathers the groups whose label is the canonical name or one of
/// its variants into the first of them, renamed to the canonical name.
/// Groups matched to existing types are never touched, and a merge that
/// names no present group changes nothing.
fn apply_merges<'a>(
    mut groups: Vec<SampleGroup<'a>>,
    merges: &[LabelMerge],
) -> Vec<SampleGroup<'a>> {
    for merge in merges {
        let canonical = merge.canonical_name.trim();
        if canonical.is_empty() {
            continue;
        }
        let mut names: Vec<String> = merge.variants.iter().map(|v| name_key(v)).collect();
        names.push(name_key(canonical));

        let members: Vec<usize> = groups
            .iter()
            .enumerate()
            .filter(|(_, g)| {
                g.existing.is_none() && !g.files.is_empty() && names.contains(&name_key(&g.label))
            })
            .map(|(i, _)| i)
            .collect();
        let Some((&first, rest)) = members.split_first() else {
            debug!("Merge into '{}' matched no group; ignored", canonical);
            continue;
        };

        for &i in rest {
            let moved = std::mem::take(&mut groups[i].files);
            groups[first].files.extend(moved);
        }
        if groups[first].label != canonical {
            info!("Merged {} group(s) into '{}'", members.len(), canonical);
            groups[first].label = canonical.to_string();
        }
    }
    groups.retain(|g| !g.files.is_empty());
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_domain::OwnerId;

    fn file(name: &str) -> IncomingFile {
        IncomingFile::new(name, "image/png", vec![1, 2, 3])
    }

    fn merge(canonical: &str, variants: &[&str]) -> LabelMerge {
        LabelMerge {
            canonical_name: canonical.to_string(),
            variants: variants.iter().map(|v| v.to_string()).collect(),
        }
    }

    fn labels(groups: &[SampleGroup<'_>]) -> Vec<(String, usize)> {
        groups.iter().map(|g| (g.label.clone(), g.files.len())).collect()
    }

    #[test]
    fn test_no_merges_keeps_groups() {
        let (a, b) = (file("a.png"), file("b.png"));
        let groups = vec![
            SampleGroup { label: "Purchase Order".into(), files: vec![&a], existing: None },
            SampleGroup { label: "Invoice".into(), files: vec![&b], existing: None },
        ];
        let groups = apply_merges(groups, &[]);
        assert_eq!(
            labels(&groups),
            vec![("Purchase Order".to_string(), 1), ("Invoice".to_string(), 1)]
        );
    }

    #[test]
    fn test_synonyms_merge_into_first_group() {
        let (a, b, c) = (file("a.png"), file("b.png"), file("c.png"));
        let groups = vec![
            SampleGroup { label: "Orden de Compra".into(), files: vec![&a], existing: None },
            SampleGroup { label: "Invoice".into(), files: vec![&b], existing: None },
            SampleGroup { label: "Purchase Order".into(), files: vec![&c], existing: None },
        ];
        let groups = apply_merges(
            groups,
            &[merge("Purchase Order", &["Purchase Order", "Orden de Compra"])],
        );
        assert_eq!(
            labels(&groups),
            vec![("Purchase Order".to_string(), 2), ("Invoice".to_string(), 1)]
        );
        let names: Vec<&str> = groups[0].files.iter().map(|f| f.filename.as_str()).collect();
        assert_eq!(names, vec!["a.png", "c.png"]);
    }

    #[test]
    fn test_existing_type_groups_are_untouched() {
        let (a, b) = (file("a.png"), file("b.png"));
        let invoice = DocumentType::new(OwnerId::from("owner"), "Invoice", vec![]);
        let groups = vec![
            SampleGroup { label: "Invoice".into(), files: vec![&a], existing: Some(invoice) },
            SampleGroup { label: "Bill".into(), files: vec![&b], existing: None },
        ];
        let groups = apply_merges(groups, &[merge("Invoice", &["Invoice", "Bill"])]);
        assert_eq!(groups.len(), 2);
        assert!(groups[0].existing.is_some());
        assert_eq!(groups[0].files.len(), 1);
        // The new group is only renamed, so creation will find the existing type
        assert_eq!(groups[1].label, "Invoice");
    }

    #[test]
    fn test_merge_of_absent_labels_is_ignored() {
        let a = file("a.png");
        let groups = vec![SampleGroup { label: "Receipt".into(), files: vec![&a], existing: None }];
        let groups = apply_merges(groups, &[merge("Contract", &["Agreement", "Deal"])]);
        assert_eq!(labels(&groups), vec![("Receipt".to_string(), 1)]);
    }

    #[test]
    fn test_variant_matching_ignores_case_and_spacing() {
        let (a, b) = (file("a.png"), file("b.png"));
        let groups = vec![
            SampleGroup { label: "Utility Bill".into(), files: vec![&a], existing: None },
            SampleGroup { label: "electricity bill".into(), files: vec![&b], existing: None },
        ];
        let groups = apply_merges(groups, &[merge("Utility Bill", &[" ELECTRICITY BILL "])]);
        assert_eq!(labels(&groups), vec![("Utility Bill".to_string(), 2)]);
    }

    #[test]
    fn test_existing_summary_description() {
        let ty = DocumentType::new(OwnerId::from("owner"), "Invoice", vec![])
            .with_description("Supplier invoices");
        let summary = InferredTypeSummary::existing(&ty, 3);
        assert_eq!(summary.description, "Supplier invoices (3 documents added)");
        assert!(!summary.is_new);
        assert_eq!(summary.sample_count, 3);
    }
}
