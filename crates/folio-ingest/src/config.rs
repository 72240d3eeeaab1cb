//! Configuration for ingestion
//!
//! Each section deserializes on its own with defaults for missing keys, so a
//! config file only needs the values it changes.

use serde::{Deserialize, Serialize};

/// Mime types accepted for a single upload
pub const UPLOAD_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "image/png",
    "image/jpeg",
    "image/jpg",
    "image/webp",
];

/// Mime types accepted as inference samples
pub const SAMPLE_MIME_TYPES: &[&str] = &["application/pdf", "image/png", "image/jpeg", "image/jpg"];

/// Single-document pipeline settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Folder (under the store root) files wait in while being processed
    pub staging_folder: String,

    /// Largest accepted upload, in bytes
    pub max_file_bytes: usize,

    /// Accepted upload mime types
    pub accepted_mime_types: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            staging_folder: "Processing".to_string(),
            max_file_bytes: 10 * 1024 * 1024,
            accepted_mime_types: UPLOAD_MIME_TYPES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl PipelineConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.staging_folder.trim().is_empty() {
            return Err("pipeline.staging_folder must not be empty".to_string());
        }
        if self.max_file_bytes == 0 {
            return Err("pipeline.max_file_bytes must be greater than 0".to_string());
        }
        if self.accepted_mime_types.is_empty() {
            return Err("pipeline.accepted_mime_types must not be empty".to_string());
        }
        Ok(())
    }
}

/// The type unclassifiable documents are filed under
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatchAllConfig {
    /// Type (and folder) name
    pub name: String,

    /// Type description
    pub description: String,
}

impl Default for CatchAllConfig {
    fn default() -> Self {
        Self {
            name: "Otros Documentos".to_string(),
            description: "Documents without automatic classification. The type and key \
                          fields of each document are identified automatically."
                .to_string(),
        }
    }
}

impl CatchAllConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("catch_all.name must not be empty".to_string());
        }
        Ok(())
    }
}

/// Sample-based type inference settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Classifier calls in flight while grouping samples
    pub max_concurrency: usize,

    /// Fewest samples accepted per request
    pub min_samples: usize,

    /// Most samples accepted per request
    pub max_samples: usize,

    /// Largest accepted sample, in bytes
    pub max_file_bytes: usize,

    /// Accepted sample mime types
    pub accepted_mime_types: Vec<String>,

    /// Fields kept per consolidated schema
    pub max_fields: usize,

    /// Confidence recorded on documents stored from samples
    pub sample_confidence: f64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 3,
            min_samples: 2,
            max_samples: 10,
            max_file_bytes: 10 * 1024 * 1024,
            accepted_mime_types: SAMPLE_MIME_TYPES.iter().map(|s| s.to_string()).collect(),
            max_fields: 20,
            sample_confidence: 0.95,
        }
    }
}

impl InferenceConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrency == 0 {
            return Err("inference.max_concurrency must be greater than 0".to_string());
        }
        if self.min_samples == 0 || self.min_samples > self.max_samples {
            return Err("inference.min_samples must be within 1..=max_samples".to_string());
        }
        if self.max_fields == 0 {
            return Err("inference.max_fields must be greater than 0".to_string());
        }
        if !(0.0..=1.0).contains(&self.sample_confidence) {
            return Err("inference.sample_confidence must be within [0, 1]".to_string());
        }
        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}
