//! Folio Classifier
//!
//! Document understanding on top of an LLM per the `Classifier` contract in
//! `folio-domain`.
//!
//! # Overview
//!
//! Every operation follows the same path:
//!
//! ```text
//! prompt → LLM → lenient JSON decode → typed wire struct → domain value
//! ```
//!
//! Decoding is strict about shape but tolerant of the usual model noise
//! (markdown fences, trailing commas, comments, raw newlines inside strings).
//! Output that still cannot be decoded is a `PortError::Parse`; nothing is
//! ever substituted for it.
//!
//! # Example Usage
//!
//! ```
//! use folio_classifier::{ClassifierConfig, LlmClassifier};
//! use folio_domain::traits::Classifier;
//! use folio_llm::MockProvider;
//!
//! # tokio_test::block_on(async {
//! let llm = MockProvider::new(r#"{"inferred_type": "Receipt", "summary": "A receipt", "key_fields": []}"#);
//! let classifier = LlmClassifier::new(llm, ClassifierConfig::default());
//!
//! let inferred = classifier.infer_unclassified("Total 1.500").await.unwrap();
//! assert_eq!(inferred.inferred_type, "Receipt");
//! # });
//! ```

#![warn(missing_docs)]

mod classifier;
mod config;
mod error;
pub mod parser;
pub mod prompt;
mod types;


pub use classifier::LlmClassifier;
pub use config::ClassifierConfig;
pub use error::ClassifierError;
