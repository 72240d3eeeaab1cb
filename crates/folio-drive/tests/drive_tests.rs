//! Drive adapter tests against a mock HTTP server

use async_trait::async_trait;
use chrono::Utc;
use folio_domain::traits::{FileStore, TokenStore};
use folio_domain::{OAuthToken, PortError};
use folio_drive::{DriveConfig, DriveFileStore, OAuthClient, FOLDER_MIME_TYPE};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct MemoryTokens {
    tokens: Mutex<HashMap<String, OAuthToken>>,
}

impl MemoryTokens {
    fn with(account: &str, token: OAuthToken) -> Arc<Self> {
        let store = Self::default();
        store.tokens.lock().unwrap().insert(account.to_string(), token);
        Arc::new(store)
    }

    fn get(&self, account: &str) -> Option<OAuthToken> {
        self.tokens.lock().unwrap().get(account).cloned()
    }
}

#[async_trait]
impl TokenStore for MemoryTokens {
    async fn load(&self, account: &str) -> Result<Option<OAuthToken>, PortError> {
        Ok(self.get(account))
    }

    async fn save(&self, account: &str, token: &OAuthToken) -> Result<(), PortError> {
        self.tokens
            .lock()
            .unwrap()
            .insert(account.to_string(), token.clone());
        Ok(())
    }
}

fn token(access: &str, expires_in_ms: i64) -> OAuthToken {
    OAuthToken {
        access_token: access.to_string(),
        refresh_token: Some("refresh-1".to_string()),
        expires_at_ms: Some(Utc::now().timestamp_millis() + expires_in_ms),
        scope: None,
        token_type: Some("Bearer".to_string()),
    }
}

fn config(server: &MockServer) -> DriveConfig {
    DriveConfig {
        api_base: server.uri(),
        token_url: format!("{}/token", server.uri()),
        root_folder_id: "root-id".to_string(),
        account: "drive".to_string(),
        timeout_secs: 5,
    }
}

fn client() -> Option<OAuthClient> {
    Some(OAuthClient {
        client_id: "client".to_string(),
        client_secret: "secret".to_string(),
    })
}

#[tokio::test]
async fn test_create_folder_under_root() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/drive/v3/files"))
        .and(header("authorization", "Bearer live-token"))
        .and(body_partial_json(json!({
            "name": "Invoices",
            "mimeType": FOLDER_MIME_TYPE,
            "parents": ["root-id"],
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "folder-1",
            "name": "Invoices",
            "webViewLink": "https://drive.example/folder-1",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tokens = MemoryTokens::with("drive", token("live-token", 3_600_000));
    let store = DriveFileStore::new(config(&server), client(), tokens).unwrap();

    let folder = store.create_folder("Invoices", None).await.unwrap();
    assert_eq!(folder.id, "folder-1");
    assert_eq!(folder.link.as_deref(), Some("https://drive.example/folder-1"));
}

#[tokio::test]
async fn test_expiring_token_is_refreshed_and_saved() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh-token",
            "expires_in": 3600,
            "token_type": "Bearer",
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files/file-1"))
        .and(header("authorization", "Bearer fresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "file-1",
            "webViewLink": "https://drive.example/file-1",
        })))
        .mount(&server)
        .await;

    // Two minutes left is inside the five minute margin
    let tokens = MemoryTokens::with("drive", token("stale-token", 120_000));
    let store = DriveFileStore::new(config(&server), client(), tokens.clone()).unwrap();

    let link = store.file_link("file-1").await.unwrap();
    assert_eq!(link.as_deref(), Some("https://drive.example/file-1"));

    let saved = tokens.get("drive").unwrap();
    assert_eq!(saved.access_token, "fresh-token");
    // The refresh response had no refresh token, so the old one is kept
    assert_eq!(saved.refresh_token.as_deref(), Some("refresh-1"));
}

#[tokio::test]
async fn test_expired_token_without_client_fails() {
    let server = MockServer::start().await;
    let tokens = MemoryTokens::with("drive", token("stale-token", -1_000));
    let store = DriveFileStore::new(config(&server), None, tokens).unwrap();

    let err = store.list("folder-1").await.unwrap_err();
    assert!(matches!(err, PortError::Service { service: "file-store", .. }));
}

#[tokio::test]
async fn test_missing_token_is_service_error() {
    let server = MockServer::start().await;
    let store =
        DriveFileStore::new(config(&server), client(), Arc::new(MemoryTokens::default())).unwrap();

    let err = store.create_folder("Invoices", None).await.unwrap_err();
    assert!(matches!(err, PortError::Service { .. }));
}

#[tokio::test]
async fn test_delete_non_empty_folder_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [{"id": "file-1", "name": "a.pdf", "mimeType": "application/pdf"}],
        })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let tokens = MemoryTokens::with("drive", token("live-token", 3_600_000));
    let store = DriveFileStore::new(config(&server), client(), tokens).unwrap();

    let err = store.delete("folder-1", true).await.unwrap_err();
    assert!(matches!(err, PortError::Rejected(_)));
}

#[tokio::test]
async fn test_public_url_grants_reader_permission() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/drive/v3/files/file-1/permissions"))
        .and(body_partial_json(json!({"role": "reader", "type": "anyone"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "perm"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files/file-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "file-1",
            "webContentLink": "https://drive.example/download/file-1",
            "webViewLink": "https://drive.example/view/file-1",
        })))
        .mount(&server)
        .await;

    let tokens = MemoryTokens::with("drive", token("live-token", 3_600_000));
    let store = DriveFileStore::new(config(&server), client(), tokens).unwrap();

    let url = store.public_url("file-1").await.unwrap();
    assert_eq!(url, "https://drive.example/download/file-1");
}

#[tokio::test]
async fn test_move_file_swaps_parents() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files/file-1"))
        .and(query_param("fields", "parents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "file-1",
            "parents": ["processing"],
        })))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/drive/v3/files/file-1"))
        .and(query_param("addParents", "invoices"))
        .and(query_param("removeParents", "processing"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "file-1"})))
        .expect(1)
        .mount(&server)
        .await;

    let tokens = MemoryTokens::with("drive", token("live-token", 3_600_000));
    let store = DriveFileStore::new(config(&server), client(), tokens).unwrap();

    store.move_file("file-1", "invoices").await.unwrap();
}

#[tokio::test]
async fn test_upload_uses_multipart_related() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload/drive/v3/files"))
        .and(query_param("uploadType", "multipart"))
        .and(body_string_contains("\"parents\":[\"processing\"]"))
        .and(body_string_contains("%PDF-1.4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "file-9",
            "name": "scan.pdf",
            "mimeType": "application/pdf",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tokens = MemoryTokens::with("drive", token("live-token", 3_600_000));
    let store = DriveFileStore::new(config(&server), client(), tokens).unwrap();

    let file = store
        .upload(b"%PDF-1.4 body", "scan.pdf", "application/pdf", "processing")
        .await
        .unwrap();
    assert_eq!(file.id, "file-9");
    assert!(!file.is_folder);
}

#[tokio::test]
async fn test_missing_file_maps_to_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files/ghost"))
        .respond_with(ResponseTemplate::new(404).set_body_string("File not found"))
        .mount(&server)
        .await;

    let tokens = MemoryTokens::with("drive", token("live-token", 3_600_000));
    let store = DriveFileStore::new(config(&server), client(), tokens).unwrap();

    let err = store.file_link("ghost").await.unwrap_err();
    assert!(matches!(err, PortError::NotFound(_)));
}

#[tokio::test]
async fn test_status_reflects_stored_token() {
    let server = MockServer::start().await;

    let fresh = MemoryTokens::with("drive", token("access", 3_600_000));
    let store = DriveFileStore::new(config(&server), None, fresh).unwrap();
    let status = store.status().await.unwrap();
    assert_eq!(status.backend, "drive");
    assert!(status.authenticated);
    assert!(status.has_access_token);

    let stale = MemoryTokens::with("drive", token("stale-token", -1_000));
    let store = DriveFileStore::new(config(&server), client(), stale.clone()).unwrap();
    let status = store.status().await.unwrap();
    assert!(status.authenticated);
    assert!(!status.has_access_token);

    let store = DriveFileStore::new(config(&server), None, stale).unwrap();
    assert!(!store.status().await.unwrap().authenticated);

    let store =
        DriveFileStore::new(config(&server), client(), Arc::new(MemoryTokens::default())).unwrap();
    assert!(!store.status().await.unwrap().authenticated);
}
