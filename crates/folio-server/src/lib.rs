//! Folio Server
//!
//! HTTP surface over the ingestion pipeline, the type-inference orchestrator
//! and document-type management. Wires the production adapters (Mistral OCR,
//! Gemini, SQLite, Drive or local files) from a [`FolioConfig`] and
//! environment [`Credentials`].

#![warn(missing_docs)]

pub mod config;
pub mod handlers;

use config::{ConfigError, Credentials, FolioConfig, StorageBackend, DRIVE_REFRESH_TOKEN_VAR};
use folio_classifier::LlmClassifier;
use folio_domain::traits::{Catalog, FileStore, TokenStore};
use folio_domain::OAuthToken;
use folio_drive::{DriveFileStore, LocalFileStore};
use folio_ingest::{DocumentPipeline, TypeInferenceOrchestrator};
use folio_llm::GeminiProvider;
use folio_ocr::{MistralOcr, QualityGatedExtractor};
use folio_store::SqliteCatalog;
use handlers::{create_router, AppState};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Server error
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration or credential error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// An adapter could not be constructed
    #[error("Initialization error: {0}")]
    Init(String),

    /// Server binding error
    #[error("Failed to bind server: {0}")]
    Bind(#[from] std::io::Error),

    /// Server error
    #[error("Server error: {0}")]
    Server(String),
}

/// Install the stderr log subscriber; `RUST_LOG` overrides the `info` default
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A subscriber installed earlier (tests, embedding) wins
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Make sure the drive account has a token, seeding one from a refresh token
async fn ensure_drive_token(
    tokens: &dyn TokenStore,
    account: &str,
    refresh_token: Option<&str>,
) -> Result<(), ServerError> {
    let stored = tokens
        .load(account)
        .await
        .map_err(|e| ServerError::Init(e.to_string()))?;
    if stored.is_some() {
        return Ok(());
    }

    let refresh_token =
        refresh_token.ok_or(ConfigError::MissingCredential(DRIVE_REFRESH_TOKEN_VAR))?;
    // Expired on arrival so the first request refreshes it
    let seed = OAuthToken {
        access_token: String::new(),
        refresh_token: Some(refresh_token.to_string()),
        expires_at_ms: Some(0),
        scope: None,
        token_type: Some("Bearer".to_string()),
    };
    tokens
        .save(account, &seed)
        .await
        .map_err(|e| ServerError::Init(e.to_string()))?;
    info!("Seeded file store token for '{}'", account);
    Ok(())
}

/// Build the production adapters and the application state
pub async fn build_state(
    config: &FolioConfig,
    credentials: &Credentials,
) -> Result<AppState, ServerError> {
    config.validate()?;

    let catalog = SqliteCatalog::new(&config.storage.database_path)
        .map_err(|e| ServerError::Init(e.to_string()))?;
    info!("Catalog: {}", config.storage.database_path.display());

    let files: Arc<dyn FileStore> = match config.storage.backend {
        StorageBackend::Local => {
            info!("File store: local ({})", config.storage.local_root.display());
            Arc::new(
                LocalFileStore::new(config.storage.local_root.clone())
                    .map_err(|e| ServerError::Init(e.to_string()))?,
            )
        }
        StorageBackend::Drive => {
            let drive = &config.storage.drive;
            ensure_drive_token(
                &catalog,
                &drive.account,
                credentials.drive_refresh_token.as_deref(),
            )
            .await?;
            info!("File store: drive (root folder {})", drive.root_folder_id);
            Arc::new(
                DriveFileStore::new(
                    drive.clone(),
                    credentials.drive_client.clone(),
                    Arc::new(catalog.clone()),
                )
                .map_err(|e| ServerError::Init(e.to_string()))?,
            )
        }
    };

    let ocr = MistralOcr::new(config.ocr.clone(), credentials.ocr_api_key.as_str())
        .map_err(|e| ServerError::Init(e.to_string()))?;
    let llm = GeminiProvider::new(config.llm.provider_config(&credentials.reasoning_api_key))
        .map_err(|e| ServerError::Init(e.to_string()))?;
    info!("Reasoning model: {}", llm.model());

    let extractor = Arc::new(QualityGatedExtractor::new(ocr));
    let classifier = Arc::new(LlmClassifier::new(llm, config.classifier.clone()));
    let catalog: Arc<dyn Catalog> = Arc::new(catalog);

    let pipeline = DocumentPipeline::new(
        extractor,
        classifier.clone(),
        files.clone(),
        catalog.clone(),
    )
    .with_config(config.pipeline.clone(), config.catch_all.clone());
    let orchestrator = TypeInferenceOrchestrator::new(classifier, files.clone(), catalog.clone())
        .with_config(config.inference.clone());

    Ok(AppState {
        pipeline: Arc::new(pipeline),
        orchestrator: Arc::new(orchestrator),
        catalog,
        files,
        max_body_bytes: config.max_body_bytes(),
    })
}

/// Start the HTTP server
///
/// Reads credentials from the environment, builds the adapters and serves
/// until the process is stopped.
pub async fn start_server(config: FolioConfig) -> Result<(), ServerError> {
    init_tracing();

    info!("Starting Folio server");
    info!("Bind address: {}", config.bind_addr());
    if config.storage.backend == StorageBackend::Local {
        warn!("Using the local file store; files are not shared outside this host");
    }

    let credentials = Credentials::from_env(config.storage.backend)?;
    let state = build_state(&config, &credentials).await?;
    let app = create_router(state);

    let listener = TcpListener::bind(&config.bind_addr()).await?;
    info!("Server listening on {}", config.bind_addr());

    axum::serve(listener, app)
        .await
        .map_err(|e| ServerError::Server(e.to_string()))?;

    Ok(())
}
