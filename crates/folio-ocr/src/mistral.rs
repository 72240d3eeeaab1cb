//! Mistral OCR backend
//!
//! Standard mode uses the dedicated OCR endpoint; vision mode asks a
//! multimodal chat model to transcribe the image while keeping its layout.

use crate::error::OcrError;
use async_trait::async_trait;
use folio_domain::traits::TextBackend;
use folio_domain::{PortError, RawText};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Separator placed between pages of a multi-page document
pub const PAGE_SEPARATOR: &str = "\n\n--- PAGE ---\n\n";

/// Confidence reported for standard OCR output
pub const STANDARD_CONFIDENCE: f64 = 0.95;

/// Confidence reported for vision output
pub const VISION_CONFIDENCE: f64 = 0.90;

const VISION_PROMPT: &str = "Transcribe ALL text visible in this document image. \
Preserve the layout: keep label/value pairs on the same line, keep table rows on one line \
with cells separated by ' | ', and keep numbers, dates, amounts and identifiers exactly as printed. \
Return only the transcribed text, without commentary.";

/// Connection settings for [`MistralOcr`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// API base URL
    pub endpoint: String,
    /// Model for standard OCR
    pub ocr_model: String,
    /// Model for vision transcription
    pub vision_model: String,
    /// Per-request timeout (seconds)
    pub timeout_secs: u64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.mistral.ai".to_string(),
            ocr_model: "mistral-ocr-latest".to_string(),
            vision_model: "pixtral-12b-latest".to_string(),
            timeout_secs: 120,
        }
    }
}

impl OcrConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.endpoint.trim().is_empty() {
            return Err("ocr.endpoint must not be empty".to_string());
        }
        if self.ocr_model.trim().is_empty() || self.vision_model.trim().is_empty() {
            return Err("ocr model names must not be empty".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("ocr.timeout_secs must be greater than 0".to_string());
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct OcrRequest<'a> {
    model: &'a str,
    document: OcrDocument<'a>,
    include_image_base64: bool,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OcrDocument<'a> {
    DocumentUrl { document_url: &'a str },
    ImageUrl { image_url: &'a str },
}

#[derive(Deserialize)]
struct OcrResponse {
    #[serde(default)]
    pages: Vec<OcrPage>,
}

#[derive(Deserialize)]
struct OcrPage {
    #[serde(default)]
    markdown: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: Vec<ChatPart<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ChatPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: &'a str },
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Mistral OCR and vision client
pub struct MistralOcr {
    config: OcrConfig,
    api_key: String,
    client: reqwest::Client,
}

impl MistralOcr {
    /// Create a client
    ///
    /// # Errors
    ///
    /// Returns [`OcrError::Config`] if the API key is empty or the HTTP client
    /// cannot be built.
    pub fn new(config: OcrConfig, api_key: impl Into<String>) -> Result<Self, OcrError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(OcrError::Config("OCR API key is empty".to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| OcrError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.endpoint.trim_end_matches('/'), path)
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<reqwest::Response, OcrError> {
        let response = self
            .client
            .post(self.url(path))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| OcrError::Communication(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(OcrError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Run standard OCR and join the pages
    pub async fn ocr(&self, source_url: &str, mime_type: &str) -> Result<String, OcrError> {
        let document = if crate::is_paginated(mime_type) {
            OcrDocument::DocumentUrl {
                document_url: source_url,
            }
        } else {
            OcrDocument::ImageUrl {
                image_url: source_url,
            }
        };
        let request = OcrRequest {
            model: &self.config.ocr_model,
            document,
            include_image_base64: false,
        };

        let response: OcrResponse = self
            .post("/v1/ocr", &request)
            .await?
            .json()
            .await
            .map_err(|e| OcrError::InvalidResponse(e.to_string()))?;

        let pages: Vec<String> = response
            .pages
            .into_iter()
            .filter_map(|p| p.markdown.or(p.text))
            .collect();
        debug!("OCR returned {} pages", pages.len());

        let text = pages.join(PAGE_SEPARATOR);
        if text.trim().is_empty() {
            return Err(OcrError::EmptyText);
        }
        Ok(text)
    }

    /// Transcribe an image with the vision model
    pub async fn transcribe(&self, source_url: &str) -> Result<String, OcrError> {
        let request = ChatRequest {
            model: &self.config.vision_model,
            messages: vec![ChatMessage {
                role: "user",
                content: vec![
                    ChatPart::Text {
                        text: VISION_PROMPT,
                    },
                    ChatPart::ImageUrl {
                        image_url: source_url,
                    },
                ],
            }],
        };

        let response: ChatResponse = self
            .post("/v1/chat/completions", &request)
            .await?
            .json()
            .await
            .map_err(|e| OcrError::InvalidResponse(e.to_string()))?;

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(OcrError::EmptyText);
        }
        Ok(text)
    }
}

#[async_trait]
impl TextBackend for MistralOcr {
    async fn extract_standard(
        &self,
        source_url: &str,
        mime_type: &str,
    ) -> Result<RawText, PortError> {
        let text = self.ocr(source_url, mime_type).await?;
        Ok(RawText {
            text,
            confidence: STANDARD_CONFIDENCE,
        })
    }

    async fn extract_vision(
        &self,
        source_url: &str,
        mime_type: &str,
    ) -> Result<RawText, PortError> {
        if !self.supports_vision(mime_type) {
            return Err(OcrError::Config(format!("vision mode does not accept {}", mime_type)).into());
        }
        let text = self.transcribe(source_url).await?;
        Ok(RawText {
            text,
            confidence: VISION_CONFIDENCE,
        })
    }

    fn supports_vision(&self, mime_type: &str) -> bool {
        crate::is_supported_mime(mime_type) && !crate::is_paginated(mime_type)
    }
}
