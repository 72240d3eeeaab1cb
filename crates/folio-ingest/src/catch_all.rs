//! The catch-all document type

use crate::config::CatchAllConfig;
use crate::error::IngestError;
use folio_domain::traits::{Catalog, FileStore};
use folio_domain::{DocumentType, FieldDefinition, FieldType, FolderHandle, OwnerId, PortError};
use tracing::{info, warn};

/// Fixed schema of the catch-all type
pub fn catch_all_fields() -> Vec<FieldDefinition> {
    vec![
        FieldDefinition::new("document_title", "Document Title", FieldType::String)
            .with_description("Type or title of the document as identified by the model"),
        FieldDefinition::new("document_category", "Category", FieldType::String)
            .with_description("General category of the document"),
        FieldDefinition::new("key_entities", "Summary / Key Entities", FieldType::String)
            .with_description("Short summary or main entities found"),
    ]
}

/// Find the owner's catch-all type, creating it (and its folder) on first use
///
/// Returns the type and whether this call created it. When a concurrent
/// caller wins the insert, its row is returned instead.
pub async fn resolve_catch_all(
    owner: &OwnerId,
    config: &CatchAllConfig,
    catalog: &dyn Catalog,
    files: &dyn FileStore,
) -> Result<(DocumentType, bool), IngestError> {
    if let Some(existing) = catalog.find_type_by_name(owner, &config.name).await? {
        return Ok((existing, false));
    }

    let folder = files.ensure_folder(&config.name, None).await?;
    let document_type = DocumentType::new(owner.clone(), config.name.clone(), catch_all_fields())
        .with_description(config.description.clone())
        .with_folder(FolderHandle {
            id: folder.id,
            link: folder.link,
        });

    match catalog.save_type(&document_type).await {
        Ok(()) => {
            info!("Created catch-all type '{}' for {}", config.name, owner);
            Ok((document_type, true))
        }
        Err(PortError::Conflict(_)) => {
            warn!("Catch-all type '{}' was created concurrently; using it", config.name);
            let existing = catalog
                .find_type_by_name(owner, &config.name)
                .await?
                .ok_or_else(|| IngestError::Conflict(config.name.clone()))?;
            Ok((existing, false))
        }
        Err(e) => Err(e.into()),
    }
}
