//! Field schema types
//!
//! Inference and extraction speak an open vocabulary of type labels
//! ("currency", "email", "datetime", ...). Persisted schemas only ever carry
//! the closed [`FieldType`] set; [`FieldType::normalize`] is the single
//! mapping between the two.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Canonical field types stored in a schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Free text (also the fallback for anything unrecognized)
    #[default]
    String,
    /// Any numeric quantity, including amounts of money
    Number,
    /// Calendar dates and timestamps
    Date,
    /// Yes/no values
    Boolean,
    /// Repeated values
    Array,
}

impl FieldType {
    /// Map an open-vocabulary type label onto the canonical set
    ///
    /// Total over all strings: unknown labels become [`FieldType::String`].
    ///
    /// # Examples
    ///
    /// ```
    /// use folio_domain::FieldType;
    ///
    /// assert_eq!(FieldType::normalize("Currency"), FieldType::Number);
    /// assert_eq!(FieldType::normalize("datetime"), FieldType::Date);
    /// assert_eq!(FieldType::normalize("email"), FieldType::String);
    /// ```
    pub fn normalize(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "number" | "integer" | "int" | "float" | "double" | "decimal" | "currency"
            | "money" => FieldType::Number,
            "date" | "datetime" | "timestamp" => FieldType::Date,
            "boolean" | "bool" => FieldType::Boolean,
            "array" | "list" => FieldType::Array,
            _ => FieldType::String,
        }
    }

    /// Canonical lowercase name, as stored
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Date => "date",
            FieldType::Boolean => "boolean",
            FieldType::Array => "array",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = String;

    /// Strict parse: only the five canonical names are accepted
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(FieldType::String),
            "number" => Ok(FieldType::Number),
            "date" => Ok(FieldType::Date),
            "boolean" => Ok(FieldType::Boolean),
            "array" => Ok(FieldType::Array),
            other => Err(format!("Unknown field type: {}", other)),
        }
    }
}

/// One field of a persisted schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Stable identifier (snake_case by convention)
    pub name: String,

    /// Display label
    pub label: String,

    /// Canonical type
    #[serde(rename = "type")]
    pub field_type: FieldType,

    /// Whether the field is expected on every document of the type
    #[serde(default)]
    pub required: bool,

    /// Optional hint for extraction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldDefinition {
    /// Create an optional field
    pub fn new(name: impl Into<String>, label: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            field_type,
            required: false,
            description: None,
        }
    }

    /// Mark the field as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Attach a description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Check that name and label are present
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("field name must not be empty".to_string());
        }
        if self.label.trim().is_empty() {
            return Err(format!("field '{}' has an empty label", self.name));
        }
        Ok(())
    }
}

fn default_type_label() -> String {
    FieldType::String.as_str().to_string()
}

/// A field as emitted by inference, before normalization
///
/// `type_label` is whatever the reasoning step produced and is never persisted
/// as a schema type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldWithValue {
    /// Field identifier
    pub name: String,

    /// Display label
    #[serde(default)]
    pub label: String,

    /// Open-vocabulary type label
    #[serde(rename = "type", default = "default_type_label")]
    pub type_label: String,

    /// Whether inference considered the field essential
    #[serde(default)]
    pub required: bool,

    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Value observed in the document
    #[serde(default)]
    pub value: Value,
}

impl FieldWithValue {
    /// Convert to a schema field, normalizing the type label
    pub fn to_definition(&self) -> FieldDefinition {
        FieldDefinition {
            name: self.name.clone(),
            label: if self.label.trim().is_empty() {
                self.name.clone()
            } else {
                self.label.clone()
            },
            field_type: FieldType::normalize(&self.type_label),
            required: self.required,
            description: self.description.clone(),
        }
    }
}

/// A schema field together with its extracted value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedField {
    /// The field this value belongs to
    #[serde(flatten)]
    pub definition: FieldDefinition,

    /// Extracted value, `null` when absent from the document
    #[serde(default)]
    pub value: Value,
}

/// Structured data extracted from one document
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Short human summary of the document
    pub summary: String,

    /// Field values, in schema order
    pub fields: Vec<ExtractedField>,
}

impl ExtractionResult {
    /// Look up a value by field name
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|f| f.definition.name == name)
            .map(|f| &f.value)
    }
}

/// Result of inferring fields for a document that matched no known type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferredFieldsResult {
    /// Proposed type label
    pub inferred_type: String,

    /// Short summary of the document
    #[serde(default)]
    pub summary: String,

    /// The document's most relevant fields with their values
    #[serde(default)]
    pub key_fields: Vec<FieldWithValue>,
}

impl InferredFieldsResult {
    /// View the inferred fields as extracted data
    pub fn to_extraction(&self) -> ExtractionResult {
        ExtractionResult {
            summary: self.summary.clone(),
            fields: self
                .key_fields
                .iter()
                .map(|f| ExtractedField {
                    definition: f.to_definition(),
                    value: f.value.clone(),
                })
                .collect(),
        }
    }
}

/// A field produced by consolidation, with its observed frequency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedField {
    /// Canonical field identifier
    pub name: String,

    /// Display label
    pub label: String,

    /// Type label, not yet normalized
    #[serde(rename = "type")]
    pub type_label: String,

    /// `frequency >= 0.5`
    pub required: bool,

    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Fraction of sample documents in which the field was observed
    pub frequency: f64,
}

impl ConsolidatedField {
    /// Build the persisted schema field (type normalized here, once)
    pub fn to_definition(&self) -> FieldDefinition {
        FieldDefinition {
            name: self.name.clone(),
            label: self.label.clone(),
            field_type: FieldType::normalize(&self.type_label),
            required: self.required,
            description: self.description.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalization_table() {
        let cases = [
            ("currency", FieldType::Number),
            ("integer", FieldType::Number),
            ("float", FieldType::Number),
            ("number", FieldType::Number),
            ("bool", FieldType::Boolean),
            ("boolean", FieldType::Boolean),
            ("list", FieldType::Array),
            ("array", FieldType::Array),
            ("date", FieldType::Date),
            ("datetime", FieldType::Date),
            ("timestamp", FieldType::Date),
            ("time", FieldType::String),
            ("email", FieldType::String),
            ("phone", FieldType::String),
            ("something-else", FieldType::String),
        ];
        for (label, expected) in cases {
            assert_eq!(FieldType::normalize(label), expected, "label {}", label);
        }
    }

    #[test]
    fn test_normalization_ignores_case_and_whitespace() {
        assert_eq!(FieldType::normalize("  DateTime "), FieldType::Date);
        assert_eq!(FieldType::normalize("CURRENCY"), FieldType::Number);
    }

    #[test]
    fn test_strict_parse() {
        assert_eq!("number".parse::<FieldType>().unwrap(), FieldType::Number);
        assert!("currency".parse::<FieldType>().is_err());
    }

    #[test]
    fn test_field_definition_validate() {
        assert!(FieldDefinition::new("total", "Total", FieldType::Number).validate().is_ok());
        assert!(FieldDefinition::new("", "Total", FieldType::Number).validate().is_err());
        assert!(FieldDefinition::new("total", " ", FieldType::Number).validate().is_err());
    }

    #[test]
    fn test_field_definition_serializes_type_key() {
        let field = FieldDefinition::new("issued_on", "Issued on", FieldType::Date).required();
        let json = serde_json::to_value(&field).unwrap();
        assert_eq!(json["type"], "date");
        assert_eq!(json["required"], true);
        assert!(json.get("description").is_none());
    }

    #[test]
    fn test_field_with_value_defaults() {
        let field: FieldWithValue = serde_json::from_value(json!({"name": "rut"})).unwrap();
        assert_eq!(field.type_label, "string");
        assert_eq!(field.value, Value::Null);
        assert_eq!(field.to_definition().label, "rut");
    }

    #[test]
    fn test_inferred_to_extraction_normalizes_types() {
        let inferred = InferredFieldsResult {
            inferred_type: "Boleta".to_string(),
            summary: "A receipt".to_string(),
            key_fields: vec![FieldWithValue {
                name: "total".to_string(),
                label: "Total".to_string(),
                type_label: "currency".to_string(),
                required: true,
                description: None,
                value: json!(1500),
            }],
        };
        let data = inferred.to_extraction();
        assert_eq!(data.summary, "A receipt");
        assert_eq!(data.fields[0].definition.field_type, FieldType::Number);
        assert_eq!(data.value("total"), Some(&json!(1500)));
    }
}
