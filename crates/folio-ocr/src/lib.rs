//! Folio Text Extraction
//!
//! Turns a staged file into text. Two layers:
//!
//! - [`MistralOcr`]: a [`TextBackend`](folio_domain::traits::TextBackend) with a
//!   fast OCR mode and a layout-aware vision mode
//! - [`QualityGatedExtractor`]: runs the fast mode, checks the output with
//!   [`quality::assess`], and falls back to vision mode for single images
//!
//! ```text
//! file URL → standard OCR → quality gate ─ pass ─────────────→ text
//!                                        └ fail → vision OCR → text
//! ```

#![warn(missing_docs)]

mod error;
mod gated;
mod mistral;
pub mod quality;

pub use error::OcrError;
pub use gated::QualityGatedExtractor;
pub use mistral::{MistralOcr, OcrConfig};

/// Mime types accepted for text extraction
pub const SUPPORTED_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "image/png",
    "image/jpeg",
    "image/jpg",
    "image/webp",
];

/// Whether a mime type can be sent to the OCR backend
pub fn is_supported_mime(mime_type: &str) -> bool {
    SUPPORTED_MIME_TYPES.contains(&mime_type)
}

/// Whether the mime type is a paginated document rather than a single image
pub fn is_paginated(mime_type: &str) -> bool {
    mime_type == "application/pdf"
}
