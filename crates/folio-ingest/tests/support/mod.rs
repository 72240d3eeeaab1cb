//! Test doubles shared by the ingest integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use folio_domain::document_type::name_key;
use folio_domain::traits::{Catalog, Classifier, FileStore, TextExtractor};
use folio_domain::{
    ClassificationProposal, ClassificationResult, Document, DocumentId, DocumentType,
    DocumentTypeId, ExtractedField, ExtractionMethod, ExtractionResult, FieldConsolidation,
    FieldDefinition, FieldType, FieldWithValue, FileRef, FolderRef, InferredFieldsResult,
    LabelMerge, OwnerId, PortError, ProcessedDocument, StoreStatus, TextExtraction,
};
use folio_drive::LocalFileStore;
use folio_store::SqliteCatalog;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tempfile::TempDir;

pub fn owner() -> OwnerId {
    OwnerId::from("owner-1")
}

/// Returns the same text for every file
pub struct FakeExtractor {
    text: String,
    calls: AtomicUsize,
}

impl FakeExtractor {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextExtractor for FakeExtractor {
    async fn extract(&self, _url: &str, _mime: &str) -> Result<TextExtraction, PortError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(TextExtraction {
            text: self.text.clone(),
            confidence: 0.9,
            method: ExtractionMethod::Standard,
        })
    }
}

/// A directory-backed store that records deletes and can be told to fail
pub struct RecordingFiles {
    inner: LocalFileStore,
    _dir: TempDir,
    deletes: Mutex<Vec<String>>,
    uploads: AtomicUsize,
    failing: Mutex<HashSet<&'static str>>,
}

impl RecordingFiles {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        Self {
            inner: LocalFileStore::new(dir.path()).unwrap(),
            _dir: dir,
            deletes: Mutex::new(Vec::new()),
            uploads: AtomicUsize::new(0),
            failing: Mutex::new(HashSet::new()),
        }
    }

    /// Make every call of `operation` fail from now on
    pub fn fail_on(&self, operation: &'static str) {
        self.failing.lock().unwrap().insert(operation);
    }

    pub fn deletes(&self) -> Vec<String> {
        self.deletes.lock().unwrap().clone()
    }

    pub fn uploads(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    /// Files (not folders) in a folder, by display name
    pub async fn file_names(&self, folder_id: &str) -> Vec<String> {
        match self.inner.list(folder_id).await {
            Ok(entries) => entries
                .into_iter()
                .filter(|e| !e.is_folder)
                .map(|e| e.name)
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    fn check(&self, operation: &'static str) -> Result<(), PortError> {
        if self.failing.lock().unwrap().contains(operation) {
            return Err(PortError::service("file-store", format!("{} failed", operation)));
        }
        Ok(())
    }
}

#[async_trait]
impl FileStore for RecordingFiles {
    fn root_folder(&self) -> &str {
        self.inner.root_folder()
    }

    async fn create_folder(
        &self,
        name: &str,
        parent: Option<&str>,
    ) -> Result<FolderRef, PortError> {
        self.check("create_folder")?;
        self.inner.create_folder(name, parent).await
    }

    async fn find_folder(
        &self,
        name: &str,
        parent: Option<&str>,
    ) -> Result<Option<FolderRef>, PortError> {
        self.check("find_folder")?;
        self.inner.find_folder(name, parent).await
    }

    async fn upload(
        &self,
        bytes: &[u8],
        name: &str,
        mime_type: &str,
        folder_id: &str,
    ) -> Result<FileRef, PortError> {
        self.check("upload")?;
        self.uploads.fetch_add(1, Ordering::SeqCst);
        self.inner.upload(bytes, name, mime_type, folder_id).await
    }

    async fn move_file(&self, file_id: &str, target: &str) -> Result<(), PortError> {
        self.check("move_file")?;
        self.inner.move_file(file_id, target).await
    }

    async fn delete(&self, file_id: &str, check_empty: bool) -> Result<(), PortError> {
        self.deletes.lock().unwrap().push(file_id.to_string());
        self.check("delete")?;
        self.inner.delete(file_id, check_empty).await
    }

    async fn public_url(&self, file_id: &str) -> Result<String, PortError> {
        self.check("public_url")?;
        self.inner.public_url(file_id).await
    }

    async fn file_link(&self, file_id: &str) -> Result<Option<String>, PortError> {
        self.check("file_link")?;
        self.inner.file_link(file_id).await
    }

    async fn list(&self, folder_id: &str) -> Result<Vec<FileRef>, PortError> {
        self.inner.list(folder_id).await
    }

    async fn status(&self) -> Result<StoreStatus, PortError> {
        self.inner.status().await
    }
}

/// An in-memory catalog with fault injection
pub struct FlakyCatalog {
    inner: SqliteCatalog,
    failing: Mutex<HashSet<&'static str>>,
    /// Type names another writer creates right before our insert
    racing_names: Mutex<Vec<String>>,
}

impl FlakyCatalog {
    pub fn new() -> Self {
        Self {
            inner: SqliteCatalog::in_memory().unwrap(),
            failing: Mutex::new(HashSet::new()),
            racing_names: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_on(&self, operation: &'static str) {
        self.failing.lock().unwrap().insert(operation);
    }

    /// Simulate a concurrent request creating `name` just before we do
    pub fn race_on(&self, name: &str) {
        self.racing_names.lock().unwrap().push(name.to_string());
    }

    fn check(&self, operation: &'static str) -> Result<(), PortError> {
        if self.failing.lock().unwrap().contains(operation) {
            return Err(PortError::service("catalog", format!("{} failed", operation)));
        }
        Ok(())
    }
}

#[async_trait]
impl Catalog for FlakyCatalog {
    async fn find_types_by_owner(&self, owner: &OwnerId) -> Result<Vec<DocumentType>, PortError> {
        self.check("find_types_by_owner")?;
        self.inner.find_types_by_owner(owner).await
    }

    async fn find_type_by_name(
        &self,
        owner: &OwnerId,
        name: &str,
    ) -> Result<Option<DocumentType>, PortError> {
        self.inner.find_type_by_name(owner, name).await
    }

    async fn get_type(
        &self,
        owner: &OwnerId,
        id: DocumentTypeId,
    ) -> Result<Option<DocumentType>, PortError> {
        self.inner.get_type(owner, id).await
    }

    async fn save_type(&self, document_type: &DocumentType) -> Result<(), PortError> {
        self.check("save_type")?;
        // A conflict whose winning row never becomes visible
        if self.failing.lock().unwrap().contains("save_type_conflict") {
            return Err(PortError::Conflict(document_type.name.clone()));
        }
        let racing = {
            let mut names = self.racing_names.lock().unwrap();
            let key = document_type.name_key();
            names
                .iter()
                .position(|n| name_key(n) == key)
                .map(|i| names.remove(i))
        };
        if let Some(name) = racing {
            let fields = vec![FieldDefinition::new("reference", "Reference", FieldType::String)];
            let winner = DocumentType::new(document_type.owner_id.clone(), name, fields);
            self.inner.save_type(&winner).await?;
        }
        self.inner.save_type(document_type).await
    }

    async fn update_type(&self, document_type: &DocumentType) -> Result<(), PortError> {
        self.check("update_type")?;
        self.inner.update_type(document_type).await
    }

    async fn delete_type(&self, owner: &OwnerId, id: DocumentTypeId) -> Result<usize, PortError> {
        self.inner.delete_type(owner, id).await
    }

    async fn save_document(&self, document: &Document) -> Result<(), PortError> {
        self.check("save_document")?;
        self.inner.save_document(document).await
    }

    async fn find_documents_by_owner(&self, owner: &OwnerId) -> Result<Vec<Document>, PortError> {
        self.inner.find_documents_by_owner(owner).await
    }

    async fn get_document(
        &self,
        owner: &OwnerId,
        id: DocumentId,
    ) -> Result<Option<Document>, PortError> {
        self.inner.get_document(owner, id).await
    }

    async fn delete_document(&self, owner: &OwnerId, id: DocumentId) -> Result<bool, PortError> {
        self.inner.delete_document(owner, id).await
    }
}

pub fn field(name: &str, type_label: &str, value: Value) -> FieldWithValue {
    FieldWithValue {
        name: name.to_string(),
        label: name.replace('_', " "),
        type_label: type_label.to_string(),
        required: false,
        description: None,
        value,
    }
}

/// What inference reports for one sample, keyed by the sample's bytes
#[derive(Clone)]
pub struct SampleScript {
    pub label: String,
    pub fields: Vec<FieldWithValue>,
}

/// A scripted classifier for orchestrator tests
///
/// Samples are recognized by their bytes. Extraction echoes every schema
/// field with a value derived from the field name and the sample bytes, so
/// tests can tell which schema a stored document was extracted against.
#[derive(Default)]
pub struct ScriptedClassifier {
    samples: Mutex<HashMap<Vec<u8>, Option<SampleScript>>>,
    merges: Mutex<Option<Vec<LabelMerge>>>,
    consolidations: Mutex<HashMap<String, FieldConsolidation>>,
    classification: Mutex<Option<ClassificationProposal>>,
    infer_calls: AtomicUsize,
    homologate_calls: Mutex<Vec<Vec<String>>>,
    extract_calls: Mutex<Vec<(String, Vec<u8>)>>,
}

impl ScriptedClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sample(&self, bytes: &[u8], label: &str, fields: Vec<FieldWithValue>) {
        self.samples.lock().unwrap().insert(
            bytes.to_vec(),
            Some(SampleScript {
                label: label.to_string(),
                fields,
            }),
        );
    }

    /// Inference fails for this sample
    pub fn unreadable(&self, bytes: &[u8]) {
        self.samples.lock().unwrap().insert(bytes.to_vec(), None);
    }

    /// Homologation answer; without one, homologation fails
    pub fn merges(&self, merges: Vec<LabelMerge>) {
        *self.merges.lock().unwrap() = Some(merges);
    }

    /// Consolidation answer for a type label; without one, consolidation fails
    pub fn consolidation(&self, label: &str, consolidation: FieldConsolidation) {
        self.consolidations
            .lock()
            .unwrap()
            .insert(label.to_string(), consolidation);
    }

    pub fn classification(&self, proposal: ClassificationProposal) {
        *self.classification.lock().unwrap() = Some(proposal);
    }

    pub fn infer_calls(&self) -> usize {
        self.infer_calls.load(Ordering::SeqCst)
    }

    pub fn homologate_calls(&self) -> Vec<Vec<String>> {
        self.homologate_calls.lock().unwrap().clone()
    }

    /// (type name, sample bytes) of every extraction
    pub fn extract_calls(&self) -> Vec<(String, Vec<u8>)> {
        self.extract_calls.lock().unwrap().clone()
    }

    fn extraction(document_type: &DocumentType, bytes: &[u8]) -> ExtractionResult {
        let origin = String::from_utf8_lossy(bytes);
        ExtractionResult {
            summary: format!("{} from {}", document_type.name, origin),
            fields: document_type
                .fields
                .iter()
                .map(|definition| ExtractedField {
                    definition: definition.clone(),
                    value: json!(format!("{}@{}", definition.name, origin)),
                })
                .collect(),
        }
    }
}

#[async_trait]
impl Classifier for ScriptedClassifier {
    async fn classify(
        &self,
        _text: &str,
        _candidates: &[DocumentType],
    ) -> Result<ClassificationResult, PortError> {
        let proposal = self
            .classification
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| PortError::service("classifier", "no classification scripted"))?;
        Ok(ClassificationResult::gate(proposal, 0.7))
    }

    async fn extract_fields(
        &self,
        text: &str,
        document_type: &DocumentType,
    ) -> Result<ExtractionResult, PortError> {
        Ok(Self::extraction(document_type, text.as_bytes()))
    }

    async fn extract_fields_vision(
        &self,
        bytes: &[u8],
        _mime_type: &str,
        document_type: &DocumentType,
    ) -> Result<ExtractionResult, PortError> {
        self.extract_calls
            .lock()
            .unwrap()
            .push((document_type.name.clone(), bytes.to_vec()));
        Ok(Self::extraction(document_type, bytes))
    }

    async fn infer_unclassified(&self, text: &str) -> Result<InferredFieldsResult, PortError> {
        self.infer_unclassified_vision(text.as_bytes(), "text/plain").await
    }

    async fn infer_unclassified_vision(
        &self,
        bytes: &[u8],
        _mime_type: &str,
    ) -> Result<InferredFieldsResult, PortError> {
        self.infer_calls.fetch_add(1, Ordering::SeqCst);
        match self.samples.lock().unwrap().get(bytes) {
            Some(Some(script)) => Ok(InferredFieldsResult {
                inferred_type: script.label.clone(),
                summary: String::new(),
                key_fields: script.fields.clone(),
            }),
            _ => Err(PortError::service("classifier", "model unavailable")),
        }
    }

    async fn homologate_labels(&self, labels: &[String]) -> Result<Vec<LabelMerge>, PortError> {
        self.homologate_calls.lock().unwrap().push(labels.to_vec());
        self.merges
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| PortError::parse("label merges", "unexpected output"))
    }

    async fn consolidate_fields(
        &self,
        type_label: &str,
        _documents: &[ProcessedDocument],
    ) -> Result<FieldConsolidation, PortError> {
        self.consolidations
            .lock()
            .unwrap()
            .get(type_label)
            .cloned()
            .ok_or_else(|| PortError::parse("field consolidation", "unexpected output"))
    }
}
