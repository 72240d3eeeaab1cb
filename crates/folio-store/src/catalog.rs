//! `Catalog` implementation

use crate::rows::{ts, DocumentRow, TypeRow, DOCUMENT_COLUMNS, TYPE_COLUMNS};
use crate::{is_unique_violation, CatalogError, SqliteCatalog};
use async_trait::async_trait;
use chrono::Utc;
use folio_domain::document_type::name_key;
use folio_domain::traits::Catalog;
use folio_domain::{Document, DocumentId, DocumentType, DocumentTypeId, OwnerId, PortError};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

fn type_id_by_name(
    conn: &Connection,
    owner: &str,
    key: &str,
) -> Result<Option<String>, CatalogError> {
    Ok(conn
        .query_row(
            "SELECT id FROM document_types WHERE owner_id = ?1 AND name_key = ?2",
            params![owner, key],
            |row| row.get(0),
        )
        .optional()?)
}

fn conflict_or(e: rusqlite::Error, name: &str) -> CatalogError {
    if is_unique_violation(&e) {
        CatalogError::Conflict(name.to_string())
    } else {
        CatalogError::Database(e)
    }
}

#[async_trait]
impl Catalog for SqliteCatalog {
    async fn find_types_by_owner(&self, owner: &OwnerId) -> Result<Vec<DocumentType>, PortError> {
        let owner = owner.as_str().to_string();
        let types = self
            .with_conn(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM document_types WHERE owner_id = ?1 \
                     ORDER BY created_at DESC, id DESC",
                    TYPE_COLUMNS
                ))?;
                let rows = stmt
                    .query_map(params![owner], TypeRow::read)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows.into_iter().map(TypeRow::into_domain).collect()
            })
            .await?;
        Ok(types)
    }

    async fn find_type_by_name(
        &self,
        owner: &OwnerId,
        name: &str,
    ) -> Result<Option<DocumentType>, PortError> {
        let owner = owner.as_str().to_string();
        let key = name_key(name);
        let found = self
            .with_conn(move |conn| {
                let row = conn
                    .query_row(
                        &format!(
                            "SELECT {} FROM document_types WHERE owner_id = ?1 AND name_key = ?2",
                            TYPE_COLUMNS
                        ),
                        params![owner, key],
                        TypeRow::read,
                    )
                    .optional()?;
                row.map(TypeRow::into_domain).transpose()
            })
            .await?;
        Ok(found)
    }

    async fn get_type(
        &self,
        owner: &OwnerId,
        id: DocumentTypeId,
    ) -> Result<Option<DocumentType>, PortError> {
        let owner = owner.as_str().to_string();
        let found = self
            .with_conn(move |conn| {
                let row = conn
                    .query_row(
                        &format!(
                            "SELECT {} FROM document_types WHERE owner_id = ?1 AND id = ?2",
                            TYPE_COLUMNS
                        ),
                        params![owner, id.to_string()],
                        TypeRow::read,
                    )
                    .optional()?;
                row.map(TypeRow::into_domain).transpose()
            })
            .await?;
        Ok(found)
    }

    async fn save_type(&self, document_type: &DocumentType) -> Result<(), PortError> {
        document_type
            .validate()
            .map_err(|e| PortError::from(CatalogError::InvalidData(e)))?;
        let ty = document_type.clone();
        self.with_conn(move |conn| {
            let key = ty.name_key();
            if type_id_by_name(conn, ty.owner_id.as_str(), &key)?.is_some() {
                return Err(CatalogError::Conflict(ty.name.clone()));
            }
            let fields = serde_json::to_string(&ty.fields)?;
            conn.execute(
                "INSERT INTO document_types (id, owner_id, name, name_key, description, fields, \
                 folder_id, folder_link, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    ty.id.to_string(),
                    ty.owner_id.as_str(),
                    ty.name,
                    key,
                    ty.description,
                    fields,
                    ty.folder.as_ref().map(|f| f.id.clone()),
                    ty.folder.as_ref().and_then(|f| f.link.clone()),
                    ts(&ty.created_at),
                    ts(&ty.updated_at),
                ],
            )
            .map_err(|e| conflict_or(e, &ty.name))?;
            info!("Saved document type '{}' ({})", ty.name, ty.id);
            Ok(())
        })
        .await?;
        Ok(())
    }

    async fn update_type(&self, document_type: &DocumentType) -> Result<(), PortError> {
        document_type
            .validate()
            .map_err(|e| PortError::from(CatalogError::InvalidData(e)))?;
        let ty = document_type.clone();
        self.with_conn(move |conn| {
            let key = ty.name_key();
            let id = ty.id.to_string();
            if let Some(existing) = type_id_by_name(conn, ty.owner_id.as_str(), &key)? {
                if existing != id {
                    return Err(CatalogError::Conflict(ty.name.clone()));
                }
            }
            let fields = serde_json::to_string(&ty.fields)?;
            let updated = conn
                .execute(
                    "UPDATE document_types SET name = ?1, name_key = ?2, description = ?3, \
                     fields = ?4, folder_id = ?5, folder_link = ?6, updated_at = ?7 \
                     WHERE id = ?8 AND owner_id = ?9",
                    params![
                        ty.name,
                        key,
                        ty.description,
                        fields,
                        ty.folder.as_ref().map(|f| f.id.clone()),
                        ty.folder.as_ref().and_then(|f| f.link.clone()),
                        ts(&Utc::now()),
                        id,
                        ty.owner_id.as_str(),
                    ],
                )
                .map_err(|e| conflict_or(e, &ty.name))?;
            if updated == 0 {
                return Err(CatalogError::NotFound(format!("document type {}", id)));
            }
            Ok(())
        })
        .await?;
        Ok(())
    }

    async fn delete_type(&self, owner: &OwnerId, id: DocumentTypeId) -> Result<usize, PortError> {
        let owner = owner.as_str().to_string();
        let removed = self
            .with_conn(move |conn| {
                let tx = conn.transaction()?;
                let documents = tx.execute(
                    "DELETE FROM documents WHERE owner_id = ?1 AND document_type_id = ?2",
                    params![owner, id.to_string()],
                )?;
                let types = tx.execute(
                    "DELETE FROM document_types WHERE owner_id = ?1 AND id = ?2",
                    params![owner, id.to_string()],
                )?;
                if types == 0 {
                    return Err(CatalogError::NotFound(format!("document type {}", id)));
                }
                tx.commit()?;
                debug!("Deleted document type {} and {} documents", id, documents);
                Ok(documents)
            })
            .await?;
        Ok(removed)
    }

    async fn save_document(&self, document: &Document) -> Result<(), PortError> {
        let doc = document.clone();
        self.with_conn(move |conn| {
            let extracted = serde_json::to_string(&doc.extracted_data)?;
            let inferred = doc
                .inferred_data
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?;
            conn.execute(
                &format!(
                    "INSERT INTO documents ({}) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                    DOCUMENT_COLUMNS
                ),
                params![
                    doc.id.to_string(),
                    doc.owner_id.as_str(),
                    doc.document_type_id.map(|id| id.to_string()),
                    doc.filename,
                    doc.file_id,
                    doc.file_link,
                    doc.mime_type,
                    extracted,
                    inferred,
                    doc.raw_text,
                    doc.confidence,
                    doc.status.as_str(),
                    ts(&doc.created_at),
                    ts(&doc.updated_at),
                ],
            )?;
            debug!("Saved document {} ({})", doc.id, doc.filename);
            Ok(())
        })
        .await?;
        Ok(())
    }

    async fn find_documents_by_owner(&self, owner: &OwnerId) -> Result<Vec<Document>, PortError> {
        let owner = owner.as_str().to_string();
        let documents = self
            .with_conn(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM documents WHERE owner_id = ?1 \
                     ORDER BY created_at DESC, id DESC",
                    DOCUMENT_COLUMNS
                ))?;
                let rows = stmt
                    .query_map(params![owner], DocumentRow::read)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows.into_iter().map(DocumentRow::into_domain).collect()
            })
            .await?;
        Ok(documents)
    }

    async fn get_document(
        &self,
        owner: &OwnerId,
        id: DocumentId,
    ) -> Result<Option<Document>, PortError> {
        let owner = owner.as_str().to_string();
        let found = self
            .with_conn(move |conn| {
                let row = conn
                    .query_row(
                        &format!(
                            "SELECT {} FROM documents WHERE owner_id = ?1 AND id = ?2",
                            DOCUMENT_COLUMNS
                        ),
                        params![owner, id.to_string()],
                        DocumentRow::read,
                    )
                    .optional()?;
                row.map(DocumentRow::into_domain).transpose()
            })
            .await?;
        Ok(found)
    }

    async fn delete_document(&self, owner: &OwnerId, id: DocumentId) -> Result<bool, PortError> {
        let owner = owner.as_str().to_string();
        let deleted = self
            .with_conn(move |conn| {
                let n = conn.execute(
                    "DELETE FROM documents WHERE owner_id = ?1 AND id = ?2",
                    params![owner, id.to_string()],
                )?;
                Ok(n > 0)
            })
            .await?;
        Ok(deleted)
    }
}
