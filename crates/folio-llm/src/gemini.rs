//! Gemini Provider Implementation
//!
//! Talks to the Generative Language REST API (`models/{model}:generateContent`).
//! Attachments are sent inline as base64 parts.
//!
//! Each call is attempted exactly once; callers decide what a failure means.
//!
//! # Examples
//!
//! ```no_run
//! use folio_llm::{GeminiConfig, GeminiProvider};
//!
//! let provider = GeminiProvider::new(GeminiConfig::new("api-key")).unwrap();
//! ```

use crate::LlmError;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use folio_domain::traits::{Attachment, LlmProvider};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Default API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

/// Default model
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Default timeout for LLM requests (seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Connection settings for [`GeminiProvider`]
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API base URL
    pub endpoint: String,
    /// Model name
    pub model: String,
    /// API key
    pub api_key: String,
    /// Per-request timeout (seconds)
    pub timeout_secs: u64,
}

impl GeminiConfig {
    /// Default endpoint and model with the given key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: api_key.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Override the model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

/// Gemini API provider
pub struct GeminiProvider {
    config: GeminiConfig,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text { text: &'a str },
    Inline { inline_data: InlineData<'a> },
}

#[derive(Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiProvider {
    /// Create a provider
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Config`] if the API key is empty or the HTTP client
    /// cannot be built.
    pub fn new(config: GeminiConfig) -> Result<Self, LlmError> {
        if config.api_key.trim().is_empty() {
            return Err(LlmError::Config("Gemini API key is empty".to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    /// Model in use
    pub fn model(&self) -> &str {
        &self.config.model
    }

    async fn send(&self, parts: Vec<Part<'_>>) -> Result<String, LlmError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        );
        let body = GenerateRequest {
            contents: vec![Content { parts }],
        };

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.config.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Communication(format!("Request failed: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimitExceeded);
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(LlmError::ModelNotAvailable(self.config.model.clone()));
        }
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(LlmError::Communication(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(LlmError::InvalidResponse("Empty completion".to_string()));
        }
        debug!("Gemini response length: {} chars", text.len());
        Ok(text)
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    type Error = LlmError;

    async fn generate(&self, prompt: &str) -> Result<String, Self::Error> {
        self.send(vec![Part::Text { text: prompt }]).await
    }

    async fn generate_with_attachment(
        &self,
        prompt: &str,
        attachment: Attachment<'_>,
    ) -> Result<String, Self::Error> {
        let inline = Part::Inline {
            inline_data: InlineData {
                mime_type: attachment.mime_type,
                data: STANDARD.encode(attachment.data),
            },
        };
        self.send(vec![inline, Part::Text { text: prompt }]).await
    }
}
