//! HTTP tests against the full router with local adapters and a scripted LLM

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use folio_classifier::prompt::{CLASSIFY_TASK, CONSOLIDATE_TASK, EXTRACT_TASK, INFER_TASK};
use folio_classifier::{ClassifierConfig, LlmClassifier};
use folio_domain::traits::TextExtractor;
use folio_domain::{ExtractionMethod, PortError, TextExtraction};
use folio_drive::LocalFileStore;
use folio_ingest::{DocumentPipeline, TypeInferenceOrchestrator};
use folio_llm::MockProvider;
use folio_server::config::FolioConfig;
use folio_server::handlers::{create_router, AppState, OWNER_HEADER};
use folio_store::SqliteCatalog;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt; // for oneshot

const OWNER: &str = "owner-1";
const BOUNDARY: &str = "folio-test-boundary";

struct StubExtractor {
    fail: bool,
}

#[async_trait]
impl TextExtractor for StubExtractor {
    async fn extract(&self, _url: &str, _mime: &str) -> Result<TextExtraction, PortError> {
        if self.fail {
            return Err(PortError::service("ocr", "connection reset by peer"));
        }
        Ok(TextExtraction {
            text: "Total: $92.045 CLP, Fecha: 2024-01-15".to_string(),
            confidence: 0.9,
            method: ExtractionMethod::Standard,
        })
    }
}

struct TestApp {
    app: Router,
    llm: MockProvider,
    dir: TempDir,
}

fn test_app_with(ocr_fails: bool) -> TestApp {
    let dir = TempDir::new().unwrap();
    let files = Arc::new(LocalFileStore::new(dir.path()).unwrap());
    let catalog = Arc::new(SqliteCatalog::in_memory().unwrap());
    let llm = MockProvider::default();
    let classifier = Arc::new(LlmClassifier::new(llm.clone(), ClassifierConfig::default()));

    let pipeline = DocumentPipeline::new(
        Arc::new(StubExtractor { fail: ocr_fails }),
        classifier.clone(),
        files.clone(),
        catalog.clone(),
    );
    let orchestrator = TypeInferenceOrchestrator::new(classifier, files.clone(), catalog.clone());

    let state = AppState {
        pipeline: Arc::new(pipeline),
        orchestrator: Arc::new(orchestrator),
        catalog,
        files,
        max_body_bytes: FolioConfig::default().max_body_bytes(),
    };
    TestApp {
        app: create_router(state),
        llm,
        dir,
    }
}

fn test_app() -> TestApp {
    test_app_with(false)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, value)
}

fn request(method: &str, uri: &str, owner: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(OWNER_HEADER, owner)
        .body(Body::empty())
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(OWNER_HEADER, OWNER)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn multipart_request(uri: &str, field: &str, files: &[(&str, &str, &[u8])]) -> Request<Body> {
    let mut body = Vec::new();
    for (filename, mime, bytes) in files {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                 Content-Type: {}\r\n\r\n",
                BOUNDARY, field, filename, mime
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(OWNER_HEADER, OWNER)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn upload(filename: &str, mime: &str) -> Request<Body> {
    multipart_request(
        "/documents/upload",
        "file",
        &[(filename, mime, b"receipt-bytes".as_slice())],
    )
}

async fn create_receipt_type(app: &Router) -> Value {
    let (status, body) = send(
        app,
        json_request(
            "POST",
            "/document-types",
            json!({
                "name": "Receipt",
                "description": "Store receipts",
                "fields": [
                    {"name": "total", "label": "Total", "type": "number", "required": true},
                    {"name": "date", "label": "Date", "type": "date", "required": true}
                ]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body
}

fn script_receipt(llm: &MockProvider, type_id: &str) {
    llm.add_response(
        CLASSIFY_TASK,
        json!({
            "matchedTypeId": type_id,
            "matchedTypeName": "Receipt",
            "confidence": 0.93,
            "isOthers": false
        })
        .to_string(),
    );
    llm.add_response(
        EXTRACT_TASK,
        json!({
            "summary": "Store receipt",
            "fields": [{"name": "total", "value": 92045}, {"name": "date", "value": "2024-01-15"}]
        })
        .to_string(),
    );
}

fn script_samples(llm: &MockProvider) {
    llm.add_response(
        INFER_TASK,
        json!({
            "inferred_type": "Receipt",
            "summary": "A store receipt",
            "key_fields": [{"name": "total", "label": "Total", "type": "currency", "value": 10}]
        })
        .to_string(),
    );
    llm.add_response(
        CONSOLIDATE_TASK,
        json!({
            "typeDescription": "Store receipts",
            "consolidatedFields": [{
                "name": "total", "label": "Total", "type": "currency",
                "required": true, "frequency": 1.0, "variants": []
            }]
        })
        .to_string(),
    );
}

#[tokio::test]
async fn test_health_check() {
    let t = test_app();

    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&t.app, req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_missing_owner_header_is_rejected() {
    let t = test_app();

    let req = Request::builder()
        .uri("/document-types")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&t.app, req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains(OWNER_HEADER));
}

#[tokio::test]
async fn test_create_type_creates_folder() {
    let t = test_app();

    let body = create_receipt_type(&t.app).await;

    assert_eq!(body["name"], "Receipt");
    assert_eq!(body["folder"]["id"], "Receipt");
    assert_eq!(body["fields"][0]["type"], "number");
    assert!(t.dir.path().join("Receipt").is_dir());

    let (status, list) = send(&t.app, request("GET", "/document-types", OWNER)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_duplicate_type_name_conflicts() {
    let t = test_app();
    create_receipt_type(&t.app).await;

    let (status, _) = send(
        &t.app,
        json_request("POST", "/document-types", json!({"name": "  receipt "})),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_invalid_type_is_rejected() {
    let t = test_app();

    let (status, _) = send(
        &t.app,
        json_request("POST", "/document-types", json!({"name": "   "})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_type() {
    let t = test_app();
    let receipt = create_receipt_type(&t.app).await;
    let (_, invoice) = send(
        &t.app,
        json_request("POST", "/document-types", json!({"name": "Invoice"})),
    )
    .await;

    let uri = format!("/document-types/{}", invoice["id"].as_str().unwrap());
    let (status, _) = send(&t.app, json_request("PATCH", &uri, json!({"name": "RECEIPT"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let uri = format!("/document-types/{}", receipt["id"].as_str().unwrap());
    let (status, body) = send(
        &t.app,
        json_request(
            "PATCH",
            &uri,
            json!({
                "description": "",
                "fields": [{"name": "amount", "label": "Amount", "type": "number"}]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Receipt");
    assert!(body.get("description").is_none());
    assert_eq!(body["fields"].as_array().unwrap().len(), 1);
    assert_eq!(body["fields"][0]["name"], "amount");
}

#[tokio::test]
async fn test_unknown_and_malformed_type_ids() {
    let t = test_app();

    let uri = "/document-types/0190f5d2-7c1e-7000-8000-000000000000";
    let (status, _) = send(&t.app, request("GET", uri, OWNER)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&t.app, request("GET", "/document-types/not-a-uuid", OWNER)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_without_types() {
    let t = test_app();

    let (status, body) = send(&t.app, upload("receipt.png", "image/png")).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("No document types"));
}

#[tokio::test]
async fn test_upload_and_manage_document() {
    let t = test_app();
    let receipt = create_receipt_type(&t.app).await;
    script_receipt(&t.llm, receipt["id"].as_str().unwrap());

    let (status, body) = send(&t.app, upload("receipt.png", "image/png")).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["was_classified"], true);
    assert_eq!(body["document"]["status"], "completed");
    let document_id = body["document"]["id"].as_str().unwrap().to_string();

    let (status, list) = send(&t.app, request("GET", "/documents", OWNER)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["document_type_name"], "Receipt");
    assert_eq!(list[0]["filename"], "receipt.png");

    let uri = format!("/documents/{}", document_id);
    let (status, document) = send(&t.app, request("GET", &uri, OWNER)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(document["document_type_name"], "Receipt");

    let (status, deleted) = send(&t.app, request("DELETE", &uri, OWNER)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["deleted"], true);
    assert_eq!(deleted["warnings"].as_array().unwrap().len(), 1);

    let (status, _) = send(&t.app, request("DELETE", &uri, OWNER)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_documents_are_owner_scoped() {
    let t = test_app();
    let receipt = create_receipt_type(&t.app).await;
    script_receipt(&t.llm, receipt["id"].as_str().unwrap());
    let (_, body) = send(&t.app, upload("receipt.png", "image/png")).await;
    let uri = format!("/documents/{}", body["document"]["id"].as_str().unwrap());

    let (status, list) = send(&t.app, request("GET", "/documents", "owner-2")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(list.as_array().unwrap().is_empty());

    let (status, _) = send(&t.app, request("GET", &uri, "owner-2")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_type_cascades_documents_and_keeps_folder() {
    let t = test_app();
    let receipt = create_receipt_type(&t.app).await;
    script_receipt(&t.llm, receipt["id"].as_str().unwrap());
    send(&t.app, upload("receipt.png", "image/png")).await;

    let uri = format!("/document-types/{}", receipt["id"].as_str().unwrap());
    let (status, body) = send(&t.app, request("DELETE", &uri, OWNER)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted_documents"], 1);
    assert_eq!(body["warnings"].as_array().unwrap().len(), 1);
    assert!(t.dir.path().join("Receipt").is_dir());

    let (_, list) = send(&t.app, request("GET", "/documents", OWNER)).await;
    assert!(list.as_array().unwrap().is_empty());
    let (status, _) = send(&t.app, request("GET", &uri, OWNER)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upload_with_unsupported_type() {
    let t = test_app();
    create_receipt_type(&t.app).await;

    let (status, _) = send(&t.app, upload("notes.txt", "text/plain")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(t.llm.call_count(), 0);
}

#[tokio::test]
async fn test_upload_without_file_field() {
    let t = test_app();
    create_receipt_type(&t.app).await;

    let req = multipart_request(
        "/documents/upload",
        "attachment",
        &[("receipt.png", "image/png", b"receipt-bytes".as_slice())],
    );
    let (status, body) = send(&t.app, req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("'file'"));
}

#[tokio::test]
async fn test_collaborator_failure_is_a_bad_gateway_with_generic_body() {
    let t = test_app_with(true);
    create_receipt_type(&t.app).await;

    let (status, body) = send(&t.app, upload("receipt.png", "image/png")).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let message = body["error"].as_str().unwrap();
    assert!(!message.contains("connection reset"));
    assert!(!message.contains("ocr"));
}

#[tokio::test]
async fn test_infer_from_samples_needs_two_files() {
    let t = test_app();

    let req = multipart_request(
        "/document-types/infer-from-samples",
        "files",
        &[("a.png", "image/png", b"a".as_slice())],
    );
    let (status, _) = send(&t.app, req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(t.llm.call_count(), 0);
}

#[tokio::test]
async fn test_infer_from_samples_creates_type() {
    let t = test_app();
    script_samples(&t.llm);

    let req = multipart_request(
        "/document-types/infer-from-samples",
        "files",
        &[
            ("a.png", "image/png", b"sample-a".as_slice()),
            ("b.pdf", "application/pdf", b"sample-b".as_slice()),
        ],
    );
    let (status, body) = send(&t.app, req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_documents_processed"], 2);
    assert_eq!(body["total_types_created"], 1);
    assert_eq!(body["created_types"][0]["name"], "Receipt");
    assert_eq!(body["created_types"][0]["is_new"], true);
    assert!(body["message"].as_str().unwrap().contains('1'));

    let (_, types) = send(&t.app, request("GET", "/document-types", OWNER)).await;
    assert_eq!(types.as_array().unwrap().len(), 1);
    assert_eq!(types[0]["description"], "Store receipts");
    assert_eq!(types[0]["fields"][0]["type"], "number");

    let (_, documents) = send(&t.app, request("GET", "/documents", OWNER)).await;
    assert!(documents.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_infer_from_samples_can_store_samples() {
    let t = test_app();
    script_samples(&t.llm);
    t.llm.add_response(
        EXTRACT_TASK,
        json!({"summary": "Receipt", "fields": [{"name": "total", "value": 10}]}).to_string(),
    );

    let req = multipart_request(
        "/document-types/infer-from-samples?upload_samples=true",
        "files",
        &[
            ("a.png", "image/png", b"sample-a".as_slice()),
            ("b.png", "image/png", b"sample-b".as_slice()),
        ],
    );
    let (status, body) = send(&t.app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["created_types"][0]["sample_count"], 2);

    let (_, documents) = send(&t.app, request("GET", "/documents", OWNER)).await;
    let documents = documents.as_array().unwrap();
    assert_eq!(documents.len(), 2);
    assert!(documents
        .iter()
        .all(|d| d["document_type_name"] == "Receipt" && d["extracted_data"].is_object()));
}

#[tokio::test]
async fn test_file_store_browsing() {
    let t = test_app();
    let receipt = create_receipt_type(&t.app).await;
    script_receipt(&t.llm, receipt["id"].as_str().unwrap());
    let (status, _) = send(&t.app, upload("receipt.png", "image/png")).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, root) = send(&t.app, request("GET", "/files", OWNER)).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = root["files"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"Receipt"));
    assert_eq!(root["files_count"], root["files"].as_array().unwrap().len());

    let (status, folder) = send(&t.app, request("GET", "/files/Receipt", OWNER)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(folder["folder_id"], "Receipt");
    assert_eq!(folder["files_count"], 1);
    assert_eq!(folder["files"][0]["name"], "receipt.png");

    let (status, _) = send(&t.app, request("GET", "/files/Nowhere", OWNER)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let anonymous = Request::builder()
        .uri("/files")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&t.app, anonymous).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_folder_respects_check_empty() {
    let t = test_app();
    let receipt = create_receipt_type(&t.app).await;
    script_receipt(&t.llm, receipt["id"].as_str().unwrap());
    send(&t.app, upload("receipt.png", "image/png")).await;

    let (status, body) = send(
        &t.app,
        request("DELETE", "/folders/Receipt?check_empty=true", OWNER),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("entries"));
    assert!(t.dir.path().join("Receipt").is_dir());

    let (status, body) = send(&t.app, request("DELETE", "/folders/Receipt", OWNER)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], true);
    assert_eq!(body["folder_id"], "Receipt");
    assert!(!t.dir.path().join("Receipt").exists());

    let (status, _) = send(&t.app, request("DELETE", "/folders/Receipt", OWNER)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_empty_folder_deleted_with_check() {
    let t = test_app();
    create_receipt_type(&t.app).await;

    let (status, _) = send(
        &t.app,
        request("DELETE", "/folders/Receipt?check_empty=true", OWNER),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!t.dir.path().join("Receipt").exists());
}

#[tokio::test]
async fn test_storage_status() {
    let t = test_app();

    let (status, body) = send(&t.app, request("GET", "/storage/status", OWNER)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["backend"], "local");
    assert_eq!(body["authenticated"], true);
    assert_eq!(body["root_folder_id"], "");
}
