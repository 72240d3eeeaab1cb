//! Folio LLM Provider Layer
//!
//! Implementations of the `LlmProvider` trait from `folio-domain`.
//!
//! # Providers
//!
//! - `MockProvider`: Deterministic mock for testing
//! - `GeminiProvider`: Google Generative Language API (`generateContent`)
//!
//! # Examples
//!
//! ```
//! use folio_llm::MockProvider;
//! use folio_domain::traits::LlmProvider;
//!
//! # tokio_test::block_on(async {
//! let provider = MockProvider::new("Hello from LLM!");
//! let result = provider.generate("test prompt").await.unwrap();
//! assert_eq!(result, "Hello from LLM!");
//! # });
//! ```

#![warn(missing_docs)]

pub mod gemini;

use async_trait::async_trait;
use folio_domain::traits::{Attachment, LlmProvider};
use std::sync::{Arc, Mutex};
use thiserror::Error;

pub use gemini::{GeminiConfig, GeminiProvider};

/// Errors that can occur during LLM operations
#[derive(Error, Debug)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response from LLM
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Provider misconfigured (e.g. missing API key)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

#[derive(Debug, Clone)]
enum Scripted {
    Reply(String),
    Fail,
}

#[derive(Debug, Default)]
struct MockState {
    scripts: Vec<(String, Scripted)>,
    prompts: Vec<String>,
    attachment_calls: usize,
}

/// Mock LLM provider for deterministic testing
///
/// Responses are keyed by a prompt fragment: the first registered fragment
/// contained in the prompt wins, otherwise the default response is returned.
/// Prompts are recorded so tests can assert on what was asked.
///
/// # Examples
///
/// ```
/// use folio_llm::MockProvider;
/// use folio_domain::traits::LlmProvider;
///
/// # tokio_test::block_on(async {
/// let provider = MockProvider::default();
/// provider.add_response("classify", "{\"confidence\": 0.9}");
/// assert_eq!(
///     provider.generate("please classify this").await.unwrap(),
///     "{\"confidence\": 0.9}"
/// );
/// assert_eq!(provider.call_count(), 1);
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_response: String,
    state: Arc<Mutex<MockState>>,
}

impl MockProvider {
    /// Create a new MockProvider with a fixed response for all prompts
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Respond with `response` to any prompt containing `fragment`
    pub fn add_response(&self, fragment: impl Into<String>, response: impl Into<String>) {
        self.lock()
            .scripts
            .push((fragment.into(), Scripted::Reply(response.into())));
    }

    /// Fail any prompt containing `fragment`
    pub fn add_error(&self, fragment: impl Into<String>) {
        self.lock().scripts.push((fragment.into(), Scripted::Fail));
    }

    /// Get the number of times the provider was called
    pub fn call_count(&self) -> usize {
        self.lock().prompts.len()
    }

    /// Number of calls that carried an attachment
    pub fn attachment_calls(&self) -> usize {
        self.lock().attachment_calls
    }

    /// All prompts received so far, in order
    pub fn prompts(&self) -> Vec<String> {
        self.lock().prompts.clone()
    }

    /// Reset the recorded calls
    pub fn reset_call_count(&self) {
        let mut state = self.lock();
        state.prompts.clear();
        state.attachment_calls = 0;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        // A poisoned mock only happens after a panicking test
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn respond(&self, prompt: &str, with_attachment: bool) -> Result<String, LlmError> {
        let mut state = self.lock();
        state.prompts.push(prompt.to_string());
        if with_attachment {
            state.attachment_calls += 1;
        }

        let scripted = state
            .scripts
            .iter()
            .find(|(fragment, _)| prompt.contains(fragment.as_str()))
            .map(|(_, s)| s.clone());

        match scripted {
            Some(Scripted::Reply(response)) => Ok(response),
            Some(Scripted::Fail) => Err(LlmError::Other("Mock error".to_string())),
            None => Ok(self.default_response.clone()),
        }
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    type Error = LlmError;

    async fn generate(&self, prompt: &str) -> Result<String, Self::Error> {
        self.respond(prompt, false)
    }

    async fn generate_with_attachment(
        &self,
        prompt: &str,
        _attachment: Attachment<'_>,
    ) -> Result<String, Self::Error> {
        self.respond(prompt, true)
    }
}
