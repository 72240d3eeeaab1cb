//! HTTP request handlers for the server.
//!
//! Every route is owner-scoped through the `x-owner-id` header. Collaborator
//! failures are logged with their detail and answered with a generic body.

use axum::{
    async_trait,
    extract::{
        multipart::MultipartError, DefaultBodyLimit, FromRequestParts, Multipart, Path, Query,
        State,
    },
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
    Router as AxumRouter,
};
use folio_domain::traits::{Catalog, FileStore};
use folio_domain::{
    Document, DocumentId, DocumentType, DocumentTypeId, FieldDefinition, FileRef, FolderHandle,
    OwnerId, PortError, StoreStatus,
};
use folio_ingest::{
    DocumentPipeline, IncomingFile, InferenceReport, InferenceRequest, IngestError,
    ProcessingOutcome, TypeInferenceOrchestrator,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Header carrying the caller's owner id
pub const OWNER_HEADER: &str = "x-owner-id";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Single-document pipeline
    pub pipeline: Arc<DocumentPipeline>,
    /// Sample-based type inference
    pub orchestrator: Arc<TypeInferenceOrchestrator>,
    /// Document and type records
    pub catalog: Arc<dyn Catalog>,
    /// Folder management and browsing
    pub files: Arc<dyn FileStore>,
    /// Largest accepted request body
    pub max_body_bytes: usize,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    /// Error from ingestion or a collaborator
    Ingest(IngestError),
    /// Malformed request
    BadRequest(String),
    /// Multipart body could not be read
    Multipart(MultipartError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Multipart(e) => (e.status(), e.body_text()),
            AppError::Ingest(e) => match e {
                IngestError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
                IngestError::Conflict(_) => (StatusCode::CONFLICT, e.to_string()),
                IngestError::NoTypesConfigured => {
                    (StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
                }
                IngestError::NotFound(_) => (StatusCode::NOT_FOUND, e.to_string()),
                IngestError::ExternalService { .. } | IngestError::Parse { .. } => {
                    error!("Request failed: {}", e);
                    (
                        StatusCode::BAD_GATEWAY,
                        "An upstream service failed; please try again later".to_string(),
                    )
                }
                IngestError::Configuration(_) => {
                    error!("Request failed: {}", e);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Internal server error".to_string(),
                    )
                }
            },
        };

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}

impl From<IngestError> for AppError {
    fn from(e: IngestError) -> Self {
        AppError::Ingest(e)
    }
}

impl From<PortError> for AppError {
    fn from(e: PortError) -> Self {
        AppError::Ingest(e.into())
    }
}

impl From<MultipartError> for AppError {
    fn from(e: MultipartError) -> Self {
        AppError::Multipart(e)
    }
}

/// Owner id taken from the [`OWNER_HEADER`] header
#[derive(Debug, Clone)]
pub struct Owner(pub OwnerId);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Owner {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(OWNER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| Owner(OwnerId::new(v)))
            .ok_or_else(|| AppError::BadRequest(format!("missing {} header", OWNER_HEADER)))
    }
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    /// Always "ok" while the process serves requests
    pub status: String,
    /// Server version
    pub version: String,
}

/// A document with the name of its type
#[derive(Debug, Serialize)]
pub struct DocumentView {
    /// The document record
    #[serde(flatten)]
    pub document: Document,
    /// Name of the document's type, when it still exists
    pub document_type_name: Option<String>,
}

/// Result of a delete that leaves stored files in place
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    /// Always true on success
    pub deleted: bool,
    /// Documents removed with a type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_documents: Option<usize>,
    /// What was intentionally left behind
    pub warnings: Vec<String>,
}

/// Body of `POST /document-types`
#[derive(Debug, Deserialize)]
pub struct CreateTypeRequest {
    /// Type name, unique per owner
    pub name: String,
    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
    /// Field schema
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
}

/// Body of `PATCH /document-types/:id`; absent members are left unchanged
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTypeRequest {
    /// New name
    #[serde(default)]
    pub name: Option<String>,
    /// New description (empty clears it)
    #[serde(default)]
    pub description: Option<String>,
    /// Replacement field schema
    #[serde(default)]
    pub fields: Option<Vec<FieldDefinition>>,
}

/// Query of the inference route
#[derive(Debug, Default, Deserialize)]
pub struct InferParams {
    /// Also store every sample as a document
    #[serde(default)]
    pub upload_samples: bool,
}

/// Response of the inference route
#[derive(Debug, Serialize)]
pub struct InferenceResponse {
    /// User-facing summary
    pub message: String,
    /// Batch outcome
    #[serde(flatten)]
    pub report: InferenceReport,
}

/// Entries of one file store folder
#[derive(Debug, Serialize, Deserialize)]
pub struct FolderListing {
    /// Folder that was listed
    pub folder_id: String,
    /// Number of entries
    pub files_count: usize,
    /// The entries, sub-folders included
    pub files: Vec<FileRef>,
}

/// Query of the folder delete route
#[derive(Debug, Default, Deserialize)]
pub struct DeleteFolderParams {
    /// Refuse to delete a folder that still has entries
    #[serde(default)]
    pub check_empty: bool,
}

/// Result of a folder delete
#[derive(Debug, Serialize, Deserialize)]
pub struct FolderDeleted {
    /// Always true on success
    pub deleted: bool,
    /// The removed folder
    pub folder_id: String,
}

/// File store connection state
#[derive(Debug, Serialize, Deserialize)]
pub struct StorageStatusResponse {
    /// Backend and credential state
    #[serde(flatten)]
    pub status: StoreStatus,
    /// Folder listed by `GET /files`
    pub root_folder_id: String,
    /// User-facing summary
    pub message: String,
}

fn parse_type_id(raw: &str) -> Result<DocumentTypeId, AppError> {
    DocumentTypeId::parse(raw).map_err(AppError::BadRequest)
}

fn parse_document_id(raw: &str) -> Result<DocumentId, AppError> {
    DocumentId::parse(raw).map_err(AppError::BadRequest)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Collect every file part named `field_name`
async fn read_files(
    multipart: &mut Multipart,
    field_name: &str,
) -> Result<Vec<IncomingFile>, AppError> {
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(field_name) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let mime_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field.bytes().await?;
        files.push(IncomingFile::new(filename, mime_type, bytes.to_vec()));
    }
    Ok(files)
}

async fn load_type(
    state: &AppState,
    owner: &OwnerId,
    id: DocumentTypeId,
) -> Result<DocumentType, AppError> {
    state
        .catalog
        .get_type(owner, id)
        .await?
        .ok_or_else(|| IngestError::NotFound(format!("document type {}", id)).into())
}

/// GET /health - Liveness check
async fn health_check() -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// POST /documents/upload - Run one file through the pipeline
async fn upload_document(
    State(state): State<AppState>,
    Owner(owner): Owner,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ProcessingOutcome>), AppError> {
    let file = read_files(&mut multipart, "file")
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::BadRequest("multipart field 'file' is required".to_string()))?;

    let outcome = state.pipeline.process(&owner, &file).await?;
    info!(
        "Stored '{}' as document {} for {}",
        file.filename, outcome.document.id, owner
    );
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// GET /documents - Owner's documents, newest first
async fn list_documents(
    State(state): State<AppState>,
    Owner(owner): Owner,
) -> Result<Json<Vec<DocumentView>>, AppError> {
    let names: HashMap<DocumentTypeId, String> = state
        .catalog
        .find_types_by_owner(&owner)
        .await?
        .into_iter()
        .map(|t| (t.id, t.name))
        .collect();

    let documents = state.catalog.find_documents_by_owner(&owner).await?;
    let views = documents
        .into_iter()
        .map(|document| {
            let document_type_name = document
                .document_type_id
                .and_then(|id| names.get(&id).cloned());
            DocumentView {
                document,
                document_type_name,
            }
        })
        .collect();
    Ok(Json(views))
}

/// GET /documents/:id
async fn get_document(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<String>,
) -> Result<Json<DocumentView>, AppError> {
    let id = parse_document_id(&id)?;
    let document = state
        .catalog
        .get_document(&owner, id)
        .await?
        .ok_or_else(|| IngestError::NotFound(format!("document {}", id)))?;

    let document_type_name = match document.document_type_id {
        Some(type_id) => state.catalog.get_type(&owner, type_id).await?.map(|t| t.name),
        None => None,
    };
    Ok(Json(DocumentView {
        document,
        document_type_name,
    }))
}

/// DELETE /documents/:id - Remove the record; the stored file stays
async fn delete_document(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    let id = parse_document_id(&id)?;
    let document = state
        .catalog
        .get_document(&owner, id)
        .await?
        .ok_or_else(|| IngestError::NotFound(format!("document {}", id)))?;

    if !state.catalog.delete_document(&owner, id).await? {
        return Err(IngestError::NotFound(format!("document {}", id)).into());
    }
    info!("Deleted document {} for {}", id, owner);

    Ok(Json(DeleteResponse {
        deleted: true,
        deleted_documents: None,
        warnings: vec![format!(
            "File '{}' ({}) was kept in the file store",
            document.filename, document.file_id
        )],
    }))
}

/// POST /document-types - Create a type and its folder
async fn create_document_type(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Json(request): Json<CreateTypeRequest>,
) -> Result<(StatusCode, Json<DocumentType>), AppError> {
    let mut document_type = DocumentType::new(owner.clone(), request.name.trim(), request.fields);
    document_type.description = non_blank(request.description);
    document_type.validate().map_err(AppError::BadRequest)?;

    if state
        .catalog
        .find_type_by_name(&owner, &document_type.name)
        .await?
        .is_some()
    {
        return Err(IngestError::Conflict(document_type.name).into());
    }

    match state.files.ensure_folder(&document_type.name, None).await {
        Ok(folder) => {
            document_type.folder = Some(FolderHandle {
                id: folder.id,
                link: folder.link,
            })
        }
        Err(e) => warn!(
            "Folder for '{}' could not be created, saving the type without one: {}",
            document_type.name, e
        ),
    }

    state.catalog.save_type(&document_type).await?;
    info!(
        "Created document type '{}' ({} fields) for {}",
        document_type.name,
        document_type.fields.len(),
        owner
    );
    Ok((StatusCode::CREATED, Json(document_type)))
}

/// GET /document-types - Owner's types, newest first
async fn list_document_types(
    State(state): State<AppState>,
    Owner(owner): Owner,
) -> Result<Json<Vec<DocumentType>>, AppError> {
    Ok(Json(state.catalog.find_types_by_owner(&owner).await?))
}

/// GET /document-types/:id
async fn get_document_type(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<String>,
) -> Result<Json<DocumentType>, AppError> {
    let id = parse_type_id(&id)?;
    Ok(Json(load_type(&state, &owner, id).await?))
}

/// PATCH /document-types/:id - Rename, redescribe or replace the schema
async fn update_document_type(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<String>,
    Json(request): Json<UpdateTypeRequest>,
) -> Result<Json<DocumentType>, AppError> {
    let id = parse_type_id(&id)?;
    let mut document_type = load_type(&state, &owner, id).await?;

    if let Some(name) = request.name {
        document_type.name = name.trim().to_string();
    }
    if let Some(description) = request.description {
        document_type.description = non_blank(Some(description));
    }
    if let Some(fields) = request.fields {
        document_type.fields = fields;
    }
    document_type.validate().map_err(AppError::BadRequest)?;

    state.catalog.update_type(&document_type).await?;
    info!("Updated document type {} for {}", id, owner);
    Ok(Json(load_type(&state, &owner, id).await?))
}

/// DELETE /document-types/:id - Remove the type and its documents; the folder stays
async fn delete_document_type(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    let id = parse_type_id(&id)?;
    let document_type = load_type(&state, &owner, id).await?;

    let deleted_documents = state.catalog.delete_type(&owner, id).await?;
    info!(
        "Deleted document type '{}' and {} documents for {}",
        document_type.name, deleted_documents, owner
    );

    let mut warnings = Vec::new();
    if let Some(folder) = &document_type.folder {
        warnings.push(format!(
            "Folder '{}' ({}) and its files were kept in the file store",
            document_type.name, folder.id
        ));
    }
    Ok(Json(DeleteResponse {
        deleted: true,
        deleted_documents: Some(deleted_documents),
        warnings,
    }))
}

/// POST /document-types/infer-from-samples - Build types from sample files
async fn infer_from_samples(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Query(params): Query<InferParams>,
    mut multipart: Multipart,
) -> Result<Json<InferenceResponse>, AppError> {
    let files = read_files(&mut multipart, "files").await?;
    let submitted = files.len();

    let report = state
        .orchestrator
        .infer(InferenceRequest {
            owner,
            files,
            persist_samples: params.upload_samples,
        })
        .await?;

    let message = format!(
        "{} document types identified from {} samples",
        report.total_types_created, submitted
    );
    Ok(Json(InferenceResponse { message, report }))
}

async fn list_folder(state: &AppState, folder_id: &str) -> Result<FolderListing, AppError> {
    let files = state.files.list(folder_id).await?;
    Ok(FolderListing {
        folder_id: folder_id.to_string(),
        files_count: files.len(),
        files,
    })
}

/// GET /files - Entries of the store's root folder
async fn list_root_files(
    State(state): State<AppState>,
    Owner(_): Owner,
) -> Result<Json<FolderListing>, AppError> {
    let root = state.files.root_folder().to_string();
    Ok(Json(list_folder(&state, &root).await?))
}

/// GET /files/:folder_id
async fn list_folder_files(
    State(state): State<AppState>,
    Owner(_): Owner,
    Path(folder_id): Path<String>,
) -> Result<Json<FolderListing>, AppError> {
    Ok(Json(list_folder(&state, &folder_id).await?))
}

/// DELETE /folders/:folder_id?check_empty=true
async fn delete_folder(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(folder_id): Path<String>,
    Query(params): Query<DeleteFolderParams>,
) -> Result<Json<FolderDeleted>, AppError> {
    if folder_id == state.files.root_folder() {
        return Err(AppError::BadRequest(
            "the root folder cannot be deleted".to_string(),
        ));
    }

    state.files.delete(&folder_id, params.check_empty).await?;
    info!("Deleted folder {} for {}", folder_id, owner);
    Ok(Json(FolderDeleted {
        deleted: true,
        folder_id,
    }))
}

/// GET /storage/status - Whether the file store can serve requests
async fn storage_status(
    State(state): State<AppState>,
    Owner(_): Owner,
) -> Result<Json<StorageStatusResponse>, AppError> {
    let status = state.files.status().await?;
    let message = if status.authenticated {
        format!("Connected to the {} file store", status.backend)
    } else {
        format!(
            "The {} file store has no usable credentials; seed a refresh token",
            status.backend
        )
    };
    Ok(Json(StorageStatusResponse {
        root_folder_id: state.files.root_folder().to_string(),
        status,
        message,
    }))
}

/// Create the axum router with all routes
pub fn create_router(state: AppState) -> AxumRouter {
    let body_limit = state.max_body_bytes;
    AxumRouter::new()
        .route("/health", get(health_check))
        .route("/documents", get(list_documents))
        .route("/documents/upload", post(upload_document))
        .route("/documents/:id", get(get_document).delete(delete_document))
        .route(
            "/document-types",
            post(create_document_type).get(list_document_types),
        )
        .route("/document-types/infer-from-samples", post(infer_from_samples))
        .route(
            "/document-types/:id",
            get(get_document_type)
                .patch(update_document_type)
                .delete(delete_document_type),
        )
        .route("/files", get(list_root_files))
        .route("/files/:folder_id", get(list_folder_files))
        .route("/folders/:folder_id", delete(delete_folder))
        .route("/storage/status", get(storage_status))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
