//! Core Classifier implementation

use crate::config::ClassifierConfig;
use crate::error::ClassifierError;
use crate::parser::decode;
use crate::prompt::PromptBuilder;
use crate::types::{
    ClassificationWire, ConsolidationWire, ExtractionWire, HomologationWire, InferenceWire,
};
use async_trait::async_trait;
use folio_domain::traits::{Attachment, Classifier, LlmProvider};
use folio_domain::{
    ClassificationProposal, ClassificationResult, DocumentType, ExtractedField, ExtractionResult,
    FieldConsolidation, InferredFieldsResult, LabelMerge, PortError, ProcessedDocument,
};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Classifier backed by an LLM
pub struct LlmClassifier<L> {
    llm: L,
    config: ClassifierConfig,
}

impl<L> LlmClassifier<L>
where
    L: LlmProvider,
{
    /// Create a new classifier
    pub fn new(llm: L, config: ClassifierConfig) -> Self {
        Self { llm, config }
    }

    /// Active configuration
    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    async fn ask(
        &self,
        prompt: &str,
        attachment: Option<Attachment<'_>>,
    ) -> Result<String, ClassifierError> {
        debug!("Prompt length: {} chars", prompt.len());
        let response = match attachment {
            Some(attachment) => self.llm.generate_with_attachment(prompt, attachment).await,
            None => self.llm.generate(prompt).await,
        }
        .map_err(|e| ClassifierError::Llm(e.to_string()))?;
        debug!("LLM response length: {} chars", response.len());
        Ok(response)
    }

    async fn extract_with(
        &self,
        document_type: &DocumentType,
        text: Option<&str>,
        attachment: Option<Attachment<'_>>,
    ) -> Result<ExtractionResult, ClassifierError> {
        let prompt = PromptBuilder::extract(document_type, text);
        let response = self.ask(&prompt, attachment).await?;
        let wire: ExtractionWire = decode("extraction", &response)?;
        Ok(align_to_schema(document_type, wire))
    }

    async fn infer_with(
        &self,
        text: Option<&str>,
        attachment: Option<Attachment<'_>>,
    ) -> Result<InferredFieldsResult, ClassifierError> {
        let prompt = PromptBuilder::infer(
            text,
            self.config.min_key_fields,
            self.config.max_key_fields,
            self.config.infer_text_limit,
        );
        let response = self.ask(&prompt, attachment).await?;
        let wire: InferenceWire = decode("inference", &response)?;

        let inferred_type = wire.inferred_type.trim().to_string();
        if inferred_type.is_empty() {
            return Err(ClassifierError::InvalidFormat {
                what: "inference",
                message: "empty inferred_type".to_string(),
            });
        }

        let mut seen = HashSet::new();
        let key_fields: Vec<_> = wire
            .key_fields
            .into_iter()
            .filter(|f| !f.name.trim().is_empty())
            .filter(|f| seen.insert(f.name.trim().to_lowercase()))
            .take(self.config.max_key_fields)
            .collect();

        info!(
            "Inferred type '{}' with {} key fields",
            inferred_type,
            key_fields.len()
        );
        Ok(InferredFieldsResult {
            inferred_type,
            summary: wire.summary,
            key_fields,
        })
    }
}

/// Lay extracted values out in schema order; unknown names are dropped and
/// missing fields become `null`
fn align_to_schema(document_type: &DocumentType, wire: ExtractionWire) -> ExtractionResult {
    let mut values: HashMap<String, Value> = HashMap::new();
    for item in wire.fields {
        values
            .entry(item.name.trim().to_lowercase())
            .or_insert(item.value);
    }

    let fields = document_type
        .fields
        .iter()
        .map(|definition| ExtractedField {
            definition: definition.clone(),
            value: values
                .remove(&definition.name.trim().to_lowercase())
                .unwrap_or(Value::Null),
        })
        .collect();

    if !values.is_empty() {
        debug!("Dropped {} values outside the schema", values.len());
    }

    ExtractionResult {
        summary: wire.summary,
        fields,
    }
}

/// Keep only merges whose variants are input labels, each label in at most
/// one merge, and at least two labels per merge
fn sanitize_merges(labels: &[String], merges: Vec<crate::types::MergeWire>) -> Vec<LabelMerge> {
    let by_key: HashMap<String, &String> = labels
        .iter()
        .map(|l| (l.trim().to_lowercase(), l))
        .collect();
    let mut claimed: HashSet<String> = HashSet::new();
    let mut result = Vec::new();

    for merge in merges {
        let mut variants = Vec::new();
        for variant in &merge.variants {
            let key = variant.trim().to_lowercase();
            match by_key.get(&key) {
                Some(original) if !claimed.contains(&key) => {
                    claimed.insert(key);
                    variants.push((*original).clone());
                }
                Some(_) => debug!("Label '{}' already merged elsewhere", variant),
                None => warn!("Ignoring unknown label '{}' in merge", variant),
            }
        }
        if variants.len() < 2 {
            for v in &variants {
                claimed.remove(&v.trim().to_lowercase());
            }
            continue;
        }
        let canonical_name = if merge.canonical_name.trim().is_empty() {
            variants[0].clone()
        } else {
            merge.canonical_name.trim().to_string()
        };
        result.push(LabelMerge {
            canonical_name,
            variants,
        });
    }
    result
}

#[async_trait]
impl<L> Classifier for LlmClassifier<L>
where
    L: LlmProvider,
{
    async fn classify(
        &self,
        text: &str,
        candidates: &[DocumentType],
    ) -> Result<ClassificationResult, PortError> {
        if candidates.is_empty() {
            let proposal = ClassificationProposal {
                is_others: true,
                ..Default::default()
            };
            return Ok(ClassificationResult::gate(
                proposal,
                self.config.confidence_threshold,
            ));
        }

        let prompt = PromptBuilder::classify(text, candidates, self.config.classify_text_limit);
        let response = self.ask(&prompt, None).await?;
        let wire: ClassificationWire = decode("classification", &response)?;
        let result =
            ClassificationResult::gate(wire.into(), self.config.confidence_threshold);

        info!(
            "Classified as {:?} (confidence {:.2}, others={})",
            result.matched_type_name(),
            result.confidence(),
            result.is_others()
        );
        Ok(result)
    }

    async fn extract_fields(
        &self,
        text: &str,
        document_type: &DocumentType,
    ) -> Result<ExtractionResult, PortError> {
        Ok(self.extract_with(document_type, Some(text), None).await?)
    }

    async fn extract_fields_vision(
        &self,
        bytes: &[u8],
        mime_type: &str,
        document_type: &DocumentType,
    ) -> Result<ExtractionResult, PortError> {
        let attachment = Attachment {
            mime_type,
            data: bytes,
        };
        Ok(self
            .extract_with(document_type, None, Some(attachment))
            .await?)
    }

    async fn infer_unclassified(&self, text: &str) -> Result<InferredFieldsResult, PortError> {
        Ok(self.infer_with(Some(text), None).await?)
    }

    async fn infer_unclassified_vision(
        &self,
        bytes: &[u8],
        mime_type: &str,
    ) -> Result<InferredFieldsResult, PortError> {
        let attachment = Attachment {
            mime_type,
            data: bytes,
        };
        Ok(self.infer_with(None, Some(attachment)).await?)
    }

    async fn homologate_labels(&self, labels: &[String]) -> Result<Vec<LabelMerge>, PortError> {
        if labels.len() <= 1 {
            return Ok(Vec::new());
        }
        let prompt = PromptBuilder::homologate(labels);
        let response = self.ask(&prompt, None).await?;
        let wire: HomologationWire = decode("homologation", &response)?;
        let merges = sanitize_merges(labels, wire.merges);
        info!("Homologation of {} labels: {} merges", labels.len(), merges.len());
        Ok(merges)
    }

    async fn consolidate_fields(
        &self,
        type_label: &str,
        documents: &[ProcessedDocument],
    ) -> Result<FieldConsolidation, PortError> {
        if documents.is_empty() {
            return Err(ClassifierError::InvalidFormat {
                what: "consolidation",
                message: "no documents to consolidate".to_string(),
            }
            .into());
        }
        let prompt = PromptBuilder::consolidate(
            type_label,
            documents,
            self.config.max_consolidated_fields,
        );
        let response = self.ask(&prompt, None).await?;
        let wire: ConsolidationWire = decode("consolidation", &response)?;
        if wire.consolidated_fields.is_empty() {
            return Err(ClassifierError::InvalidFormat {
                what: "consolidation",
                message: "no fields returned".to_string(),
            }
            .into());
        }
        Ok(FieldConsolidation {
            description: wire.type_description.filter(|d| !d.trim().is_empty()),
            fields: wire.consolidated_fields,
        })
    }
}
