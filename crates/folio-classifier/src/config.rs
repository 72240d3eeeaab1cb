//! Configuration for the Classifier

use serde::{Deserialize, Serialize};

/// Configuration for the Classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Classifications below this confidence go to the catch-all type
    pub confidence_threshold: f64,

    /// Characters of recognized text included in a classification prompt
    pub classify_text_limit: usize,

    /// Characters of recognized text included in an inference prompt
    pub infer_text_limit: usize,

    /// Minimum key fields requested from inference
    pub min_key_fields: usize,

    /// Maximum key fields kept from inference
    pub max_key_fields: usize,

    /// Maximum fields kept from consolidation
    pub max_consolidated_fields: usize,
}

impl ClassifierConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err("confidence_threshold must be within [0, 1]".to_string());
        }
        if self.classify_text_limit == 0 || self.infer_text_limit == 0 {
            return Err("text limits must be greater than 0".to_string());
        }
        if self.min_key_fields > self.max_key_fields {
            return Err("min_key_fields cannot exceed max_key_fields".to_string());
        }
        if self.max_consolidated_fields == 0 {
            return Err("max_consolidated_fields must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Strict preset: only confident classifications are accepted
    pub fn strict() -> Self {
        Self {
            confidence_threshold: 0.85,
            ..Self::default()
        }
    }

    /// Lenient preset: accept weaker matches, send more text
    pub fn lenient() -> Self {
        Self {
            confidence_threshold: 0.5,
            classify_text_limit: 10_000,
            infer_text_limit: 16_000,
            ..Self::default()
        }
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

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.7,
            classify_text_limit: 5_000,
            infer_text_limit: 8_000,
            min_key_fields: 3,
            max_key_fields: 20,
            max_consolidated_fields: 20,
        }
    }
}
