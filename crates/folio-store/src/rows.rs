//! Row <-> domain conversions

use crate::CatalogError;
use chrono::{DateTime, SecondsFormat, Utc};
use folio_domain::{
    Document, DocumentId, DocumentStatus, DocumentType, DocumentTypeId, FieldDefinition,
    FolderHandle, OwnerId,
};
use rusqlite::Row;

pub(crate) const TYPE_COLUMNS: &str =
    "id, owner_id, name, description, fields, folder_id, folder_link, created_at, updated_at";

pub(crate) const DOCUMENT_COLUMNS: &str = "id, owner_id, document_type_id, filename, file_id, \
     file_link, mime_type, extracted_data, inferred_data, raw_text, confidence, status, \
     created_at, updated_at";

/// Timestamps are stored as RFC 3339 UTC with fixed precision so they sort as text
pub(crate) fn ts(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>, CatalogError> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| CatalogError::InvalidData(format!("Bad timestamp '{}': {}", s, e)))
}

fn parse_uuid(s: &str) -> Result<uuid::Uuid, CatalogError> {
    uuid::Uuid::parse_str(s).map_err(|e| CatalogError::InvalidData(format!("Bad id '{}': {}", s, e)))
}

/// Raw `document_types` row
pub(crate) struct TypeRow {
    id: String,
    owner_id: String,
    name: String,
    description: Option<String>,
    fields: String,
    folder_id: Option<String>,
    folder_link: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TypeRow {
    pub(crate) fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            fields: row.get(4)?,
            folder_id: row.get(5)?,
            folder_link: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    pub(crate) fn into_domain(self) -> Result<DocumentType, CatalogError> {
        let fields: Vec<FieldDefinition> = serde_json::from_str(&self.fields)?;
        Ok(DocumentType {
            id: DocumentTypeId::from_uuid(parse_uuid(&self.id)?),
            owner_id: OwnerId::new(self.owner_id),
            name: self.name,
            description: self.description,
            fields,
            folder: self.folder_id.map(|id| FolderHandle {
                id,
                link: self.folder_link,
            }),
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}

/// Raw `documents` row
pub(crate) struct DocumentRow {
    id: String,
    owner_id: String,
    document_type_id: Option<String>,
    filename: String,
    file_id: String,
    file_link: String,
    mime_type: String,
    extracted_data: String,
    inferred_data: Option<String>,
    raw_text: Option<String>,
    confidence: f64,
    status: String,
    created_at: String,
    updated_at: String,
}

impl DocumentRow {
    pub(crate) fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            document_type_id: row.get(2)?,
            filename: row.get(3)?,
            file_id: row.get(4)?,
            file_link: row.get(5)?,
            mime_type: row.get(6)?,
            extracted_data: row.get(7)?,
            inferred_data: row.get(8)?,
            raw_text: row.get(9)?,
            confidence: row.get(10)?,
            status: row.get(11)?,
            created_at: row.get(12)?,
            updated_at: row.get(13)?,
        })
    }

    pub(crate) fn into_domain(self) -> Result<Document, CatalogError> {
        let document_type_id = match self.document_type_id {
            Some(id) => Some(DocumentTypeId::from_uuid(parse_uuid(&id)?)),
            None => None,
        };
        let inferred_data = match self.inferred_data {
            Some(json) => Some(serde_json::from_str(&json)?),
            None => None,
        };
        let status: DocumentStatus = self.status.parse().map_err(CatalogError::InvalidData)?;

        Ok(Document {
            id: DocumentId::from_uuid(parse_uuid(&self.id)?),
            owner_id: OwnerId::new(self.owner_id),
            document_type_id,
            filename: self.filename,
            file_id: self.file_id,
            file_link: self.file_link,
            mime_type: self.mime_type,
            extracted_data: serde_json::from_str(&self.extracted_data)?,
            inferred_data,
            raw_text: self.raw_text,
            confidence: self.confidence,
            status,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}
