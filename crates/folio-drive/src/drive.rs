//! Google Drive v3 file store
//!
//! Every request carries a bearer token loaded from the injected
//! `TokenStore`. A token within five minutes of expiry is refreshed through the
//! OAuth token endpoint and written back before use.

use crate::DriveError;
use async_trait::async_trait;
use chrono::Utc;
use folio_domain::traits::{FileStore, TokenStore};
use folio_domain::{FileRef, FolderRef, OAuthToken, PortError, StoreStatus};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Mime type Drive uses for folders
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

const FILE_FIELDS: &str = "id, name, mimeType, webViewLink";
const LIST_FIELDS: &str = "files(id, name, mimeType, webViewLink)";

/// Drive adapter settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    /// API base URL
    pub api_base: String,
    /// OAuth token endpoint used for refreshes
    pub token_url: String,
    /// Folder new folders are created under by default
    pub root_folder_id: String,
    /// Key under which the token is kept in the token store
    pub account: String,
    /// Per-request timeout (seconds)
    pub timeout_secs: u64,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            api_base: "https://www.googleapis.com".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            root_folder_id: "root".to_string(),
            account: "default".to_string(),
            timeout_secs: 60,
        }
    }
}

impl DriveConfig {
    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.root_folder_id.trim().is_empty() {
            return Err("drive root_folder_id must not be empty".to_string());
        }
        if self.account.trim().is_empty() {
            return Err("drive account must not be empty".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("drive timeout_secs must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// OAuth client credentials needed to refresh tokens
#[derive(Debug, Clone)]
pub struct OAuthClient {
    /// Client id
    pub client_id: String,
    /// Client secret
    pub client_secret: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    web_view_link: Option<String>,
    #[serde(default)]
    web_content_link: Option<String>,
    #[serde(default)]
    parents: Vec<String>,
}

impl DriveFile {
    fn into_file_ref(self) -> FileRef {
        let is_folder = self.mime_type.as_deref() == Some(FOLDER_MIME_TYPE);
        FileRef {
            id: self.id,
            name: self.name,
            mime_type: self.mime_type,
            link: self.web_view_link,
            is_folder,
        }
    }

    fn into_folder_ref(self) -> FolderRef {
        FolderRef {
            id: self.id,
            name: self.name,
            link: self.web_view_link,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
}

/// Escape a value for a Drive search query string literal
fn quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Google Drive backed `FileStore`
pub struct DriveFileStore {
    config: DriveConfig,
    client: Option<OAuthClient>,
    tokens: Arc<dyn TokenStore>,
    http: reqwest::Client,
    refresh_lock: Mutex<()>,
}

impl DriveFileStore {
    /// Create a store
    ///
    /// Without `client` credentials an expired token cannot be refreshed and
    /// requests fail with [`DriveError::TokenExpired`].
    pub fn new(
        config: DriveConfig,
        client: Option<OAuthClient>,
        tokens: Arc<dyn TokenStore>,
    ) -> Result<Self, DriveError> {
        config.validate().map_err(DriveError::Config)?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DriveError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            config,
            client,
            tokens,
            http,
            refresh_lock: Mutex::new(()),
        })
    }

    fn files_url(&self) -> String {
        format!("{}/drive/v3/files", self.config.api_base)
    }

    fn file_url(&self, file_id: &str) -> String {
        format!("{}/drive/v3/files/{}", self.config.api_base, file_id)
    }

    async fn load_token(&self) -> Result<OAuthToken, DriveError> {
        self.tokens
            .load(&self.config.account)
            .await
            .map_err(DriveError::TokenStore)?
            .ok_or_else(|| DriveError::NotAuthenticated(self.config.account.clone()))
    }

    /// Current access token, refreshed if it is about to expire
    async fn access_token(&self) -> Result<String, DriveError> {
        let token = self.load_token().await?;
        if !token.is_expired_at(Utc::now().timestamp_millis()) {
            return Ok(token.access_token);
        }

        let _guard = self.refresh_lock.lock().await;
        // Another request may have refreshed while we waited
        let token = self.load_token().await?;
        if !token.is_expired_at(Utc::now().timestamp_millis()) {
            return Ok(token.access_token);
        }
        Ok(self.refresh(token).await?.access_token)
    }

    async fn refresh(&self, current: OAuthToken) -> Result<OAuthToken, DriveError> {
        let refresh_token = current
            .refresh_token
            .clone()
            .ok_or(DriveError::TokenExpired)?;
        let client = self.client.as_ref().ok_or(DriveError::TokenExpired)?;

        let response = self
            .http
            .post(&self.config.token_url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
                ("client_id", client.client_id.as_str()),
                ("client_secret", client.client_secret.as_str()),
            ])
            .send()
            .await?;
        let body: RefreshResponse = check(response).await?.json().await?;

        let now_ms = Utc::now().timestamp_millis();
        let refreshed = OAuthToken {
            access_token: body.access_token,
            refresh_token: body.refresh_token.or(Some(refresh_token)),
            expires_at_ms: body.expires_in.map(|secs| now_ms + secs * 1000),
            scope: body.scope.or(current.scope),
            token_type: body.token_type.or(current.token_type),
        };
        self.tokens
            .save(&self.config.account, &refreshed)
            .await
            .map_err(DriveError::TokenStore)?;
        info!("Refreshed file store access token for '{}'", self.config.account);
        Ok(refreshed)
    }

    async fn request(&self, method: Method, url: String) -> Result<RequestBuilder, DriveError> {
        let token = self.access_token().await?;
        Ok(self.http.request(method, url).bearer_auth(token))
    }

    async fn get_file(&self, file_id: &str, fields: &str) -> Result<DriveFile, DriveError> {
        let request = self
            .request(Method::GET, self.file_url(file_id))
            .await?
            .query(&[("fields", fields)]);
        send_json(request).await
    }

    async fn list_children(&self, folder_id: &str) -> Result<Vec<DriveFile>, DriveError> {
        let q = format!("'{}' in parents and trashed = false", quote(folder_id));
        let request = self
            .request(Method::GET, self.files_url())
            .await?
            .query(&[("q", q.as_str()), ("fields", LIST_FIELDS), ("orderBy", "name")]);
        let list: FileList = send_json(request).await?;
        Ok(list.files)
    }
}

async fn check(response: Response) -> Result<Response, DriveError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(DriveError::NotFound(body));
    }
    Err(DriveError::Status {
        status: status.as_u16(),
        body,
    })
}

async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, DriveError> {
    let response = check(request.send().await?).await?;
    response
        .json()
        .await
        .map_err(|e| DriveError::InvalidResponse(e.to_string()))
}

async fn send_empty(request: RequestBuilder) -> Result<(), DriveError> {
    check(request.send().await?).await?;
    Ok(())
}

/// Build a `multipart/related` body with JSON metadata and the file content
fn related_body(boundary: &str, metadata: &serde_json::Value, mime_type: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(bytes.len() + 512);
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{m}\r\n--{b}\r\nContent-Type: {t}\r\n\r\n",
            b = boundary,
            m = metadata,
            t = mime_type
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}

#[async_trait]
impl FileStore for DriveFileStore {
    fn root_folder(&self) -> &str {
        &self.config.root_folder_id
    }

    async fn create_folder(
        &self,
        name: &str,
        parent: Option<&str>,
    ) -> Result<FolderRef, PortError> {
        let parent = parent.unwrap_or(&self.config.root_folder_id);
        let request = self
            .request(Method::POST, self.files_url())
            .await?
            .query(&[("fields", FILE_FIELDS)])
            .json(&json!({
                "name": name,
                "mimeType": FOLDER_MIME_TYPE,
                "parents": [parent],
            }));
        let folder: DriveFile = send_json(request).await?;
        info!("Folder created: {} ({})", folder.name, folder.id);
        Ok(folder.into_folder_ref())
    }

    async fn find_folder(
        &self,
        name: &str,
        parent: Option<&str>,
    ) -> Result<Option<FolderRef>, PortError> {
        let parent = parent.unwrap_or(&self.config.root_folder_id);
        let q = format!(
            "name = '{}' and '{}' in parents and mimeType = '{}' and trashed = false",
            quote(name),
            quote(parent),
            FOLDER_MIME_TYPE
        );
        let request = self
            .request(Method::GET, self.files_url())
            .await?
            .query(&[("q", q.as_str()), ("fields", LIST_FIELDS)]);
        let list: FileList = send_json(request).await?;
        Ok(list.files.into_iter().next().map(DriveFile::into_folder_ref))
    }

    async fn upload(
        &self,
        bytes: &[u8],
        name: &str,
        mime_type: &str,
        folder_id: &str,
    ) -> Result<FileRef, PortError> {
        let boundary = format!("folio-{}", uuid::Uuid::now_v7().simple());
        let metadata = json!({ "name": name, "parents": [folder_id] });
        let body = related_body(&boundary, &metadata, mime_type, bytes);

        let url = format!("{}/upload/drive/v3/files", self.config.api_base);
        let request = self
            .request(Method::POST, url)
            .await?
            .query(&[("uploadType", "multipart"), ("fields", FILE_FIELDS)])
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={}", boundary),
            )
            .body(body);
        let file: DriveFile = send_json(request).await?;
        info!("File uploaded: {} ({})", file.name, file.id);
        Ok(file.into_file_ref())
    }

    async fn move_file(&self, file_id: &str, target_folder_id: &str) -> Result<(), PortError> {
        let current = self.get_file(file_id, "parents").await?;
        let previous = current.parents.join(",");
        let request = self
            .request(Method::PATCH, self.file_url(file_id))
            .await?
            .query(&[
                ("addParents", target_folder_id),
                ("removeParents", previous.as_str()),
                ("fields", "id, parents"),
            ])
            .json(&json!({}));
        send_empty(request).await?;
        info!("Moved {} to folder {}", file_id, target_folder_id);
        Ok(())
    }

    async fn delete(&self, file_id: &str, check_empty: bool) -> Result<(), PortError> {
        if check_empty {
            let entries = self.list_children(file_id).await?;
            if !entries.is_empty() {
                return Err(DriveError::FolderNotEmpty(entries.len()).into());
            }
        }
        let request = self.request(Method::DELETE, self.file_url(file_id)).await?;
        send_empty(request).await?;
        info!("Deleted {}", file_id);
        Ok(())
    }

    async fn public_url(&self, file_id: &str) -> Result<String, PortError> {
        let permissions = format!("{}/permissions", self.file_url(file_id));
        let request = self
            .request(Method::POST, permissions)
            .await?
            .json(&json!({ "role": "reader", "type": "anyone" }));
        send_empty(request).await?;

        let file = self.get_file(file_id, "webContentLink, webViewLink").await?;
        let url = file
            .web_content_link
            .or(file.web_view_link)
            .ok_or_else(|| DriveError::InvalidResponse(format!("no link for file {}", file_id)))?;
        debug!("Public URL for {}: {}", file_id, url);
        Ok(url)
    }

    async fn file_link(&self, file_id: &str) -> Result<Option<String>, PortError> {
        let file = self.get_file(file_id, "webViewLink").await?;
        Ok(file.web_view_link)
    }

    async fn list(&self, folder_id: &str) -> Result<Vec<FileRef>, PortError> {
        let files = self.list_children(folder_id).await?;
        Ok(files.into_iter().map(DriveFile::into_file_ref).collect())
    }

    async fn status(&self) -> Result<StoreStatus, PortError> {
        let token = self.tokens.load(&self.config.account).await?;
        let has_access_token = token.as_ref().is_some_and(|t| {
            !t.access_token.is_empty() && !t.is_expired_at(Utc::now().timestamp_millis())
        });
        let can_refresh = self.client.is_some()
            && token.as_ref().is_some_and(|t| t.refresh_token.is_some());
        Ok(StoreStatus {
            backend: "drive".to_string(),
            authenticated: has_access_token || can_refresh,
            has_access_token,
        })
    }
}
