//! Quality-gated dual-mode extraction

use crate::quality;
use async_trait::async_trait;
use folio_domain::traits::{TextBackend, TextExtractor};
use folio_domain::{ExtractionMethod, PortError, TextExtraction};
use tracing::{debug, info, warn};

/// Runs standard OCR first and re-runs in vision mode when the output looks
/// poor and the input is a single image
pub struct QualityGatedExtractor<B> {
    backend: B,
}

impl<B: TextBackend> QualityGatedExtractor<B> {
    /// Wrap a backend
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Borrow the backend
    pub fn backend(&self) -> &B {
        &self.backend
    }
}

#[async_trait]
impl<B: TextBackend> TextExtractor for QualityGatedExtractor<B> {
    async fn extract(
        &self,
        source_url: &str,
        mime_type: &str,
    ) -> Result<TextExtraction, PortError> {
        let standard = self.backend.extract_standard(source_url, mime_type).await?;
        let report = quality::assess(&standard.text);
        debug!(
            "Standard OCR: {} chars, {}/{} value lines, passed={}",
            report.chars, report.value_lines, report.lines, report.passed
        );

        if report.passed {
            return Ok(TextExtraction::from_raw(standard, ExtractionMethod::Standard));
        }

        if crate::is_paginated(mime_type) || !self.backend.supports_vision(mime_type) {
            warn!(
                "Low OCR quality (ratio {:.2}) for {}, vision mode unavailable; keeping standard result",
                report.ratio, mime_type
            );
            return Ok(TextExtraction::from_raw(standard, ExtractionMethod::Standard));
        }

        info!(
            "Low OCR quality (ratio {:.2}) for {}, retrying in vision mode",
            report.ratio, mime_type
        );
        let vision = self.backend.extract_vision(source_url, mime_type).await?;
        Ok(TextExtraction::from_raw(vision, ExtractionMethod::Vision))
    }
}
