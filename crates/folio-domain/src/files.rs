//! File store references

use serde::{Deserialize, Serialize};

/// A folder in the file store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderRef {
    /// Store-specific folder id
    pub id: String,
    /// Folder name
    pub name: String,
    /// Browsable link, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// A file (or sub-folder) in the file store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    /// Store-specific file id
    pub id: String,
    /// File name
    pub name: String,
    /// Mime type, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Browsable link, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// Whether this entry is itself a folder
    #[serde(default)]
    pub is_folder: bool,
}

/// Whether a file store can currently serve requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStatus {
    /// Backend name (`local`, `drive`)
    pub backend: String,
    /// Credentials are present and usable, directly or after a refresh
    pub authenticated: bool,
    /// An unexpired access token is stored right now
    pub has_access_token: bool,
}
