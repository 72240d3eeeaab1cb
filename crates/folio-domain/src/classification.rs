//! Text extraction and classification results

use crate::field::FieldWithValue;
use serde::{Deserialize, Serialize};

/// Which text extraction mode produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMethod {
    /// Fast structured OCR
    Standard,
    /// Slower layout-aware vision mode
    Vision,
}

/// Output of a single text backend call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawText {
    /// Recognized text
    pub text: String,
    /// Backend-reported confidence in [0, 1]
    pub confidence: f64,
}

/// Output of the quality-gated text extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextExtraction {
    /// Recognized text
    pub text: String,
    /// Confidence in [0, 1]
    pub confidence: f64,
    /// Mode that produced the text
    pub method: ExtractionMethod,
}

impl TextExtraction {
    /// Tag a backend result with the mode that produced it
    pub fn from_raw(raw: RawText, method: ExtractionMethod) -> Self {
        Self {
            text: raw.text,
            confidence: raw.confidence,
            method,
        }
    }
}

/// What the reasoning step proposed, before confidence gating
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClassificationProposal {
    /// Id of the candidate type the model picked
    pub matched_type_id: Option<String>,
    /// Name of the candidate type the model picked
    pub matched_type_name: Option<String>,
    /// Model confidence
    pub confidence: f64,
    /// Whether the model itself flagged the document as unclassified
    pub is_others: bool,
    /// Proposed new type name
    pub inferred_type: Option<String>,
    /// Proposed fields for the new type
    pub suggested_fields: Vec<FieldWithValue>,
    /// Free-text reasoning
    pub reasoning: Option<String>,
}

/// Classification outcome
///
/// Constructed only through [`ClassificationResult::gate`], so that a
/// confidence below the threshold always yields `is_others == true`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    matched_type_id: Option<String>,
    matched_type_name: Option<String>,
    confidence: f64,
    is_others: bool,
    proposed_type: Option<String>,
    proposed_fields: Vec<FieldWithValue>,
    reasoning: Option<String>,
}

impl ClassificationResult {
    /// Apply the confidence threshold to a proposal
    ///
    /// # Examples
    ///
    /// ```
    /// use folio_domain::{ClassificationProposal, ClassificationResult};
    ///
    /// let proposal = ClassificationProposal {
    ///     matched_type_id: Some("t1".into()),
    ///     matched_type_name: Some("Invoice".into()),
    ///     confidence: 0.4,
    ///     ..Default::default()
    /// };
    /// let result = ClassificationResult::gate(proposal, 0.7);
    /// assert!(result.is_others());
    /// ```
    pub fn gate(proposal: ClassificationProposal, threshold: f64) -> Self {
        let confidence = if proposal.confidence.is_finite() {
            proposal.confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let is_others = proposal.is_others || confidence < threshold;
        let (proposed_type, proposed_fields) = if is_others {
            (proposal.inferred_type, proposal.suggested_fields)
        } else {
            (None, Vec::new())
        };
        Self {
            matched_type_id: proposal.matched_type_id,
            matched_type_name: proposal.matched_type_name,
            confidence,
            is_others,
            proposed_type,
            proposed_fields,
            reasoning: proposal.reasoning,
        }
    }

    /// Candidate type id
    pub fn matched_type_id(&self) -> Option<&str> {
        self.matched_type_id.as_deref()
    }

    /// Candidate type name
    pub fn matched_type_name(&self) -> Option<&str> {
        self.matched_type_name.as_deref()
    }

    /// Confidence in [0, 1]
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Whether the document goes to the catch-all type
    pub fn is_others(&self) -> bool {
        self.is_others
    }

    /// Proposed type name (only when `is_others`)
    pub fn proposed_type(&self) -> Option<&str> {
        self.proposed_type.as_deref()
    }

    /// Proposed fields (only when `is_others`)
    pub fn proposed_fields(&self) -> &[FieldWithValue] {
        &self.proposed_fields
    }

    /// Model reasoning, if provided
    pub fn reasoning(&self) -> Option<&str> {
        self.reasoning.as_deref()
    }
}
