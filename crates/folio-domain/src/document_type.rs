//! Document types: owner-scoped extraction schemas

use crate::field::FieldDefinition;
use crate::ids::{DocumentTypeId, OwnerId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a type's documents live in the file store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderHandle {
    /// Folder id in the file store
    pub id: String,

    /// Browsable link to the folder, if the store provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// A named schema describing what to extract from a class of documents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentType {
    /// Unique identifier
    pub id: DocumentTypeId,

    /// Owner of the type
    pub owner_id: OwnerId,

    /// Display name, unique per owner (compared case-insensitively)
    pub name: String,

    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Ordered field schema
    pub fields: Vec<FieldDefinition>,

    /// Folder holding the type's documents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<FolderHandle>,

    /// Creation time
    pub created_at: DateTime<Utc>,

    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl DocumentType {
    /// Create a new type with a fresh id
    pub fn new(owner_id: OwnerId, name: impl Into<String>, fields: Vec<FieldDefinition>) -> Self {
        let now = Utc::now();
        Self {
            id: DocumentTypeId::new(),
            owner_id,
            name: name.into(),
            description: None,
            fields,
            folder: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Attach a description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Attach a folder
    pub fn with_folder(mut self, folder: FolderHandle) -> Self {
        self.folder = Some(folder);
        self
    }

    /// Name key used for owner-scoped uniqueness and lookups
    pub fn name_key(&self) -> String {
        name_key(&self.name)
    }

    /// Validate name and every field
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("document type name must not be empty".to_string());
        }
        let mut seen = std::collections::HashSet::new();
        for field in &self.fields {
            field.validate()?;
            if !seen.insert(field.name.as_str()) {
                return Err(format!("duplicate field name '{}'", field.name));
            }
        }
        Ok(())
    }
}

/// Trimmed, lowercased form of a type name
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}
