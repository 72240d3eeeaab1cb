//! LLM prompt engineering for document understanding
//!
//! Every prompt opens with a `TASK:` line naming the operation, which keeps
//! logs readable and lets test doubles route responses by task.

use folio_domain::{DocumentType, ProcessedDocument};

/// Header of classification prompts
pub const CLASSIFY_TASK: &str = "TASK: classify-document";
/// Header of field extraction prompts
pub const EXTRACT_TASK: &str = "TASK: extract-fields";
/// Header of unclassified inference prompts
pub const INFER_TASK: &str = "TASK: infer-document";
/// Header of label homologation prompts
pub const HOMOLOGATE_TASK: &str = "TASK: homologate-labels";
/// Header of field consolidation prompts
pub const CONSOLIDATE_TASK: &str = "TASK: consolidate-fields";

/// Builds prompts for the document understanding tasks
pub struct PromptBuilder;

impl PromptBuilder {
    /// Classification against a candidate set
    pub fn classify(text: &str, candidates: &[DocumentType], text_limit: usize) -> String {
        let mut prompt = String::new();
        prompt.push_str(CLASSIFY_TASK);
        prompt.push_str("\n\n");
        prompt.push_str(CLASSIFY_INSTRUCTIONS);
        prompt.push_str("\n\nAvailable document types:\n");
        for candidate in candidates {
            prompt.push_str(&format!("- id: {}\n  name: {}\n", candidate.id, candidate.name));
            if let Some(description) = &candidate.description {
                prompt.push_str(&format!("  description: {}\n", description));
            }
            let fields: Vec<String> = candidate
                .fields
                .iter()
                .map(|f| format!("{} ({})", f.label, f.field_type))
                .collect();
            prompt.push_str(&format!("  fields: {}\n", fields.join(", ")));
        }
        prompt.push_str("\nDocument text:\n---\n");
        prompt.push_str(truncate(text, text_limit));
        prompt.push_str("\n---\n\n");
        prompt.push_str(CLASSIFY_FORMAT);
        prompt
    }

    /// Extraction of a schema's values, from text or (when `text` is `None`)
    /// from the attached file
    pub fn extract(document_type: &DocumentType, text: Option<&str>) -> String {
        let mut prompt = String::new();
        prompt.push_str(EXTRACT_TASK);
        prompt.push_str("\n\n");
        prompt.push_str(&format!(
            "Extract the values of the fields below from this \"{}\" document.\n",
            document_type.name
        ));
        prompt.push_str(EXTRACT_INSTRUCTIONS);
        prompt.push_str("\n\nFields:\n");
        for field in &document_type.fields {
            prompt.push_str(&format!(
                "- name: {} | label: {} | type: {} | required: {}",
                field.name, field.label, field.field_type, field.required
            ));
            if let Some(description) = &field.description {
                prompt.push_str(&format!(" | description: {}", description));
            }
            prompt.push('\n');
        }
        match text {
            Some(text) => {
                prompt.push_str("\nDocument text:\n---\n");
                prompt.push_str(text);
                prompt.push_str("\n---\n\n");
            }
            None => prompt.push_str("\nThe document is attached.\n\n"),
        }
        prompt.push_str(EXTRACT_FORMAT);
        prompt
    }

    /// Inference of type and key fields for an unclassified document
    pub fn infer(text: Option<&str>, min_fields: usize, max_fields: usize, text_limit: usize) -> String {
        let mut prompt = String::new();
        prompt.push_str(INFER_TASK);
        prompt.push_str("\n\n");
        prompt.push_str(INFER_INSTRUCTIONS);
        prompt.push_str(&format!(
            "\nReport between {} and {} key fields, most important first.\n",
            min_fields, max_fields
        ));
        match text {
            Some(text) => {
                prompt.push_str("\nDocument text:\n---\n");
                prompt.push_str(truncate(text, text_limit));
                prompt.push_str("\n---\n\n");
            }
            None => prompt.push_str("\nThe document is attached.\n\n"),
        }
        prompt.push_str(INFER_FORMAT);
        prompt
    }

    /// Grouping of type labels that denote the same concept
    pub fn homologate(labels: &[String]) -> String {
        let mut prompt = String::new();
        prompt.push_str(HOMOLOGATE_TASK);
        prompt.push_str("\n\n");
        prompt.push_str(HOMOLOGATE_INSTRUCTIONS);
        prompt.push_str("\n\nLabels:\n");
        for label in labels {
            prompt.push_str(&format!("- {}\n", label));
        }
        prompt.push('\n');
        prompt.push_str(HOMOLOGATE_FORMAT);
        prompt
    }

    /// Consolidation of per-document field lists for one type
    pub fn consolidate(type_label: &str, documents: &[ProcessedDocument], max_fields: usize) -> String {
        let mut prompt = String::new();
        prompt.push_str(CONSOLIDATE_TASK);
        prompt.push_str("\n\n");
        prompt.push_str(&format!(
            "{} samples of the document type \"{}\" were analyzed independently. ",
            documents.len(),
            type_label
        ));
        prompt.push_str(CONSOLIDATE_INSTRUCTIONS);
        prompt.push_str(&format!("\nReturn at most {} fields.\n\n", max_fields));
        for (idx, document) in documents.iter().enumerate() {
            prompt.push_str(&format!("Document {} ({}):\n", idx + 1, document.filename));
            for field in &document.fields {
                prompt.push_str(&format!(
                    "- {} | {} | {}\n",
                    field.name, field.label, field.type_label
                ));
            }
        }
        prompt.push('\n');
        prompt.push_str(CONSOLIDATE_FORMAT);
        prompt
    }
}

/// Truncate to at most `limit` characters on a char boundary
pub fn truncate(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

const CLASSIFY_INSTRUCTIONS: &str = r#"Decide which of the available document types the document below belongs to.

Rules:
- Pick a type only if the document clearly is that kind of document
- Report your confidence between 0.0 and 1.0
- If no type fits, set isOthers to true, propose a short name for the new type in inferredType and list the fields such a document carries in suggestedFields"#;

const CLASSIFY_FORMAT: &str = r#"Output format (JSON object only, no additional text):
{
  "matchedTypeId": "id of the chosen type or null",
  "matchedTypeName": "name of the chosen type or null",
  "confidence": 0.0-1.0,
  "isOthers": true|false,
  "inferredType": "proposed type name or null",
  "suggestedFields": [{"name": "snake_case", "label": "Label", "type": "string|number|date|boolean|array", "required": true|false}],
  "reasoning": "one sentence"
}

Remember: Return ONLY valid JSON, no markdown code blocks, no explanations."#;

const EXTRACT_INSTRUCTIONS: &str = r#"Rules:
- Return one entry per listed field, using the field name exactly as given
- Use null when the value is not present; never invent values
- Numbers as JSON numbers without thousands separators or currency symbols
- Dates as YYYY-MM-DD
- Booleans as true/false, arrays as JSON arrays
- Add a one or two sentence summary of the document"#;

const EXTRACT_FORMAT: &str = r#"Output format (JSON object only, no additional text):
{
  "summary": "short summary",
  "fields": [{"name": "field_name", "value": "..."}]
}

Remember: Return ONLY valid JSON, no markdown code blocks, no explanations."#;

const INFER_INSTRUCTIONS: &str = r#"Identify what kind of document this is and which fields carry its essential information.

Rules:
- inferred_type is a short, generic name for the kind of document (e.g. "Invoice", "Purchase Order")
- Each key field has a snake_case name, a human label, a type, and the value found in the document
- Types may be string, number, date, boolean, array, currency, email or phone"#;

const INFER_FORMAT: &str = r#"Output format (JSON object only, no additional text):
{
  "inferred_type": "Document type name",
  "summary": "short summary",
  "key_fields": [{"name": "snake_case", "label": "Label", "type": "string", "required": true, "description": "optional", "value": "..."}]
}

Remember: Return ONLY valid JSON, no markdown code blocks, no explanations."#;

const HOMOLOGATE_INSTRUCTIONS: &str = r#"The labels below were assigned to documents independently. Some may name the same kind of document in different words or languages (e.g. "Purchase Order" and "Orden de Compra").

Rules:
- Merge labels only when you are confident they denote the same kind of document
- Related but different documents (e.g. "Invoice" and "Purchase Order") must NOT be merged
- Every variant must be copied exactly from the list
- Labels without a true equivalent are simply left out
- When unsure, do not merge"#;

const HOMOLOGATE_FORMAT: &str = r#"Output format (JSON object only, no additional text):
{
  "merges": [{"canonical_name": "Name to use", "variants": ["label as listed", "other label as listed"]}]
}

Return {"merges": []} when nothing should be merged.
Remember: Return ONLY valid JSON, no markdown code blocks, no explanations."#;

const CONSOLIDATE_INSTRUCTIONS: &str = r#"Their field lists differ in naming. Merge fields that denote the same concept into one canonical field.

Rules:
- Canonical names are snake_case; labels are human readable
- List in variants every per-document field name the canonical field merges
- frequency is the fraction of documents in which the field appears
- Order fields by importance, most frequent and most critical first"#;

const CONSOLIDATE_FORMAT: &str = r#"Output format (JSON object only, no additional text):
{
  "type_description": "one sentence describing the document type",
  "consolidated_fields": [{"name": "snake_case", "label": "Label", "type": "string", "required": true, "description": "optional", "frequency": 0.0-1.0, "variants": ["name_in_doc_1", "name_in_doc_2"]}]
}

Remember: Return ONLY valid JSON, no markdown code blocks, no explanations."#;
