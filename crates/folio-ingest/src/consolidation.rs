//! Field consolidation for a group of same-type samples
//!
//! The classifier decides which per-document fields are synonyms. Everything
//! that can be computed locally is recomputed here: frequencies come from the
//! samples themselves, `required` follows from frequency, and the ranking is
//! deterministic.

use crate::error::IngestError;
use folio_domain::traits::Classifier;
use folio_domain::{ConsolidatedField, ConsolidatedType, FieldProposal, ProcessedDocument};
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::{debug, info};

/// Fields observed in at least this share of samples are required
pub const REQUIRED_FREQUENCY: f64 = 0.5;

/// Merge the samples' field lists into one ranked schema
///
/// Fails when the classifier call fails or yields no usable field.
pub async fn consolidate(
    type_label: &str,
    samples: Vec<ProcessedDocument>,
    classifier: &dyn Classifier,
    max_fields: usize,
) -> Result<ConsolidatedType, IngestError> {
    if samples.is_empty() {
        return Err(IngestError::Validation(format!(
            "no samples to consolidate for '{}'",
            type_label
        )));
    }

    let proposal = classifier.consolidate_fields(type_label, &samples).await?;
    debug!(
        "Consolidation for '{}' proposed {} fields",
        type_label,
        proposal.fields.len()
    );

    let fields = finalize_fields(&proposal.fields, &samples, max_fields);
    if fields.is_empty() {
        return Err(IngestError::Parse {
            what: "field consolidation",
            message: format!("no usable fields for '{}'", type_label),
        });
    }

    let description = proposal
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| {
            format!(
                "Document type \"{}\" created automatically from {} samples",
                type_label,
                samples.len()
            )
        });

    info!(
        "Consolidated '{}': {} fields from {} samples",
        type_label,
        fields.len(),
        samples.len()
    );
    Ok(ConsolidatedType {
        name: type_label.to_string(),
        description,
        fields,
        samples,
    })
}

/// Recompute frequency and `required`, drop unusable or duplicate fields,
/// rank by frequency (ties keep proposal order) and cap at `max_fields`
pub fn finalize_fields(
    proposals: &[FieldProposal],
    samples: &[ProcessedDocument],
    max_fields: usize,
) -> Vec<ConsolidatedField> {
    let total = samples.len();
    let mut seen = HashSet::new();
    let mut fields = Vec::with_capacity(proposals.len());

    for proposal in proposals {
        let name = proposal.name.trim();
        let label = proposal.label.trim();
        if name.is_empty() || label.is_empty() {
            continue;
        }
        if !seen.insert(name.to_lowercase()) {
            continue;
        }

        let mut names = Vec::with_capacity(proposal.variants.len() + 1);
        names.push(name.to_string());
        names.extend(proposal.variants.iter().cloned());

        let hits = samples.iter().filter(|s| s.has_any_field(&names)).count();
        // Observed only; the model's reported frequency is never trusted
        let frequency = if total > 0 {
            hits as f64 / total as f64
        } else {
            0.0
        };

        let type_label = match proposal.type_label.trim() {
            "" => "string".to_string(),
            t => t.to_string(),
        };

        fields.push(ConsolidatedField {
            name: name.to_string(),
            label: label.to_string(),
            type_label,
            required: frequency >= REQUIRED_FREQUENCY,
            description: proposal
                .description
                .as_ref()
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            frequency,
        });
    }

    // Stable: equal frequencies keep proposal order
    fields.sort_by(|a, b| {
        b.frequency
            .partial_cmp(&a.frequency)
            .unwrap_or(Ordering::Equal)
    });
    fields.truncate(max_fields);
    fields
}
