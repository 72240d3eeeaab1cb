//! Transient types used while inferring document types from samples

use crate::field::{ConsolidatedField, FieldWithValue};
use serde::{Deserialize, Serialize};

/// A sample document after per-file inference
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedDocument {
    /// Original filename
    pub filename: String,
    /// Type label inference assigned to the file
    pub inferred_type: String,
    /// Fields observed in this file
    pub fields: Vec<FieldWithValue>,
    /// Raw file bytes, kept for re-extraction
    pub bytes: Vec<u8>,
    /// Mime type of the file
    pub mime_type: String,
}

impl ProcessedDocument {
    /// Whether this document carries a field under any of `names`
    /// (case-insensitive)
    pub fn has_any_field(&self, names: &[String]) -> bool {
        self.fields.iter().any(|f| {
            let key = f.name.trim().to_lowercase();
            names.iter().any(|n| n.trim().to_lowercase() == key)
        })
    }
}

/// One canonical type name and the labels it absorbs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelMerge {
    /// Name the merged group takes
    pub canonical_name: String,
    /// Labels merged into the group
    pub variants: Vec<String>,
}

/// A field proposed by the reasoning step during consolidation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldProposal {
    /// Canonical field name
    pub name: String,
    /// Display label
    #[serde(default)]
    pub label: String,
    /// Open-vocabulary type label
    #[serde(rename = "type", default)]
    pub type_label: String,
    /// Model's opinion on whether the field is required (not trusted)
    #[serde(default)]
    pub required: bool,
    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
    /// Model-reported frequency (used only when it cannot be recomputed)
    #[serde(default)]
    pub frequency: f64,
    /// Per-document field names this canonical field merges
    #[serde(default)]
    pub variants: Vec<String>,
}

/// Raw consolidation output from the reasoning step
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FieldConsolidation {
    /// Suggested type description
    #[serde(default)]
    pub description: Option<String>,
    /// Proposed canonical fields
    #[serde(default)]
    pub fields: Vec<FieldProposal>,
}

/// A consolidated schema for one discovered type
#[derive(Debug, Clone, PartialEq)]
pub struct ConsolidatedType {
    /// Type name
    pub name: String,
    /// Type description
    pub description: String,
    /// Ranked, capped field list
    pub fields: Vec<ConsolidatedField>,
    /// The samples that produced the schema
    pub samples: Vec<ProcessedDocument>,
}

impl ConsolidatedType {
    /// Number of samples that contributed
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }
}
