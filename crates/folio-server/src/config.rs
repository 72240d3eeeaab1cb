//! Configuration file parsing for the server.
//!
//! Every section has defaults, so a config file only lists what it changes.
//! Secrets never live in the file: they are read from the environment by
//! [`Credentials`].

use folio_classifier::ClassifierConfig;
use folio_drive::{DriveConfig, OAuthClient};
use folio_ingest::{CatchAllConfig, InferenceConfig, PipelineConfig};
use folio_llm::gemini::{DEFAULT_ENDPOINT, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS};
use folio_llm::GeminiConfig;
use folio_ocr::OcrConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Reasoning service API key
pub const REASONING_KEY_VAR: &str = "FOLIO_REASONING_API_KEY";
/// OCR service API key
pub const OCR_KEY_VAR: &str = "FOLIO_OCR_API_KEY";
/// Drive OAuth client id
pub const DRIVE_CLIENT_ID_VAR: &str = "FOLIO_DRIVE_CLIENT_ID";
/// Drive OAuth client secret
pub const DRIVE_CLIENT_SECRET_VAR: &str = "FOLIO_DRIVE_CLIENT_SECRET";
/// Refresh token used to seed an empty token store
pub const DRIVE_REFRESH_TOKEN_VAR: &str = "FOLIO_DRIVE_REFRESH_TOKEN";

/// Server configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// A section failed validation
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// A required environment variable is unset or empty
    #[error("Missing credential: {0} is not set")]
    MissingCredential(&'static str),
}

/// Top-level configuration loaded from TOML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FolioConfig {
    /// HTTP listener
    pub server: ServerSection,
    /// Single-document pipeline
    pub pipeline: PipelineConfig,
    /// Sample-based type inference
    pub inference: InferenceConfig,
    /// Catch-all type
    pub catch_all: CatchAllConfig,
    /// Classifier thresholds and limits
    pub classifier: ClassifierConfig,
    /// OCR service
    pub ocr: OcrConfig,
    /// Reasoning service
    pub llm: LlmSection,
    /// Catalog and file store
    pub storage: StorageSection,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Bind address (e.g., "127.0.0.1")
    pub bind_address: String,
    /// Bind port
    pub bind_port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            bind_port: 8080,
        }
    }
}

/// Reasoning service settings (the key comes from the environment)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// API base URL
    pub endpoint: String,
    /// Model name
    pub model: String,
    /// Per-request timeout (seconds)
    pub timeout_secs: u64,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl LlmSection {
    /// Provider settings for the given API key
    pub fn provider_config(&self, api_key: &str) -> GeminiConfig {
        let mut config = GeminiConfig::new(api_key)
            .with_endpoint(self.endpoint.clone())
            .with_model(self.model.clone());
        config.timeout_secs = self.timeout_secs;
        config
    }
}

/// Which file store backs the deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Google Drive
    Drive,
    /// A directory on local disk
    Local,
}

/// Catalog and file store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// SQLite database file
    pub database_path: PathBuf,
    /// File store backend
    pub backend: StorageBackend,
    /// Root directory of the local backend
    pub local_root: PathBuf,
    /// Drive backend settings
    pub drive: DriveConfig,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("folio.db"),
            backend: StorageBackend::Local,
            local_root: PathBuf::from("folio-files"),
            drive: DriveConfig::default(),
        }
    }
}

impl FolioConfig {
    /// Load and validate configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: FolioConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Validate every section
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.bind_address.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "server.bind_address must not be empty".to_string(),
            ));
        }
        if self.llm.model.trim().is_empty() || self.llm.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "llm.model must be set and llm.timeout_secs greater than 0".to_string(),
            ));
        }
        self.pipeline.validate().map_err(ConfigError::Invalid)?;
        self.inference.validate().map_err(ConfigError::Invalid)?;
        self.catch_all.validate().map_err(ConfigError::Invalid)?;
        self.classifier.validate().map_err(ConfigError::Invalid)?;
        self.ocr.validate().map_err(ConfigError::Invalid)?;
        if self.storage.backend == StorageBackend::Drive {
            self.storage.drive.validate().map_err(ConfigError::Invalid)?;
        }
        Ok(())
    }

    /// Get the full bind address (address:port)
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.bind_address, self.server.bind_port)
    }

    /// Largest request body the server accepts
    ///
    /// Sized for a full batch of inference samples plus multipart overhead.
    pub fn max_body_bytes(&self) -> usize {
        let batch = self.inference.max_samples * self.inference.max_file_bytes;
        batch.max(self.pipeline.max_file_bytes) + 1024 * 1024
    }
}

/// Secrets read from the environment at startup
#[derive(Clone)]
pub struct Credentials {
    /// Reasoning service key
    pub reasoning_api_key: String,
    /// OCR service key
    pub ocr_api_key: String,
    /// Drive OAuth client, when configured
    pub drive_client: Option<OAuthClient>,
    /// Refresh token to seed into an empty token store
    pub drive_refresh_token: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("drive_client", &self.drive_client.is_some())
            .field("drive_refresh_token", &self.drive_refresh_token.is_some())
            .finish_non_exhaustive()
    }
}

impl Credentials {
    /// Read credentials from the process environment
    pub fn from_env(backend: StorageBackend) -> Result<Self, ConfigError> {
        Self::from_lookup(backend, |name| std::env::var(name).ok())
    }

    /// Read credentials through `lookup`; blank values count as unset
    pub fn from_lookup<F>(backend: StorageBackend, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let require = |name: &'static str| get(name).ok_or(ConfigError::MissingCredential(name));

        let reasoning_api_key = require(REASONING_KEY_VAR)?;
        let ocr_api_key = require(OCR_KEY_VAR)?;

        let (drive_client, drive_refresh_token) = match backend {
            StorageBackend::Local => (None, None),
            StorageBackend::Drive => {
                let client = OAuthClient {
                    client_id: require(DRIVE_CLIENT_ID_VAR)?,
                    client_secret: require(DRIVE_CLIENT_SECRET_VAR)?,
                };
                (Some(client), get(DRIVE_REFRESH_TOKEN_VAR))
            }
        };

        Ok(Self {
            reasoning_api_key,
            ocr_api_key,
            drive_client,
            drive_refresh_token,
        })
    }
}
