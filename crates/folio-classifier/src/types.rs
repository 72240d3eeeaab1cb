//! Wire shapes of the model's structured output

use folio_domain::{ClassificationProposal, FieldProposal, FieldWithValue};
use serde::Deserialize;
use serde_json::Value;

/// Classification answer
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ClassificationWire {
    #[serde(default)]
    pub matched_type_id: Option<String>,
    #[serde(default)]
    pub matched_type_name: Option<String>,
    pub confidence: f64,
    #[serde(default)]
    pub is_others: bool,
    #[serde(default)]
    pub inferred_type: Option<String>,
    #[serde(default)]
    pub suggested_fields: Vec<FieldWithValue>,
    #[serde(default)]
    pub reasoning: Option<String>,
}

impl From<ClassificationWire> for ClassificationProposal {
    fn from(wire: ClassificationWire) -> Self {
        ClassificationProposal {
            matched_type_id: wire.matched_type_id.filter(|s| !s.trim().is_empty()),
            matched_type_name: wire.matched_type_name.filter(|s| !s.trim().is_empty()),
            confidence: wire.confidence,
            is_others: wire.is_others,
            inferred_type: wire.inferred_type.filter(|s| !s.trim().is_empty()),
            suggested_fields: wire.suggested_fields,
            reasoning: wire.reasoning,
        }
    }
}

/// One extracted value
#[derive(Debug, Deserialize)]
pub(crate) struct ValueWire {
    pub name: String,
    #[serde(default)]
    pub value: Value,
}

/// Extraction answer
#[derive(Debug, Deserialize)]
pub(crate) struct ExtractionWire {
    #[serde(default)]
    pub summary: String,
    pub fields: Vec<ValueWire>,
}

/// Inference answer
#[derive(Debug, Deserialize)]
pub(crate) struct InferenceWire {
    pub inferred_type: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub key_fields: Vec<FieldWithValue>,
}

/// One label merge
#[derive(Debug, Deserialize)]
pub(crate) struct MergeWire {
    pub canonical_name: String,
    #[serde(default)]
    pub variants: Vec<String>,
}

/// Homologation answer
#[derive(Debug, Deserialize)]
pub(crate) struct HomologationWire {
    pub merges: Vec<MergeWire>,
}

/// Consolidation answer
#[derive(Debug, Deserialize)]
pub(crate) struct ConsolidationWire {
    #[serde(default, alias = "typeDescription")]
    pub type_description: Option<String>,
    #[serde(alias = "consolidatedFields")]
    pub consolidated_fields: Vec<FieldProposal>,
}
