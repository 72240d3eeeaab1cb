//! Folio File Stores
//!
//! Two `FileStore` implementations:
//!
//! - [`DriveFileStore`]: Google Drive v3 over REST, with bearer tokens loaded
//!   from an injected `TokenStore` and refreshed on demand
//! - [`LocalFileStore`]: a directory tree on the local filesystem, used for
//!   local runs and tests

#![warn(missing_docs)]

mod drive;
mod local;

pub use drive::{DriveConfig, DriveFileStore, OAuthClient, FOLDER_MIME_TYPE};
pub use local::LocalFileStore;

use folio_domain::PortError;
use thiserror::Error;

/// Errors raised by the file store adapters
#[derive(Error, Debug)]
pub enum DriveError {
    /// Transport failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success response from the API
    #[error("Drive API returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// No token has been stored for the configured account
    #[error("Not authenticated with the file store (no token for account '{0}')")]
    NotAuthenticated(String),

    /// The token expired and cannot be refreshed
    #[error("Access token expired and no refresh token is available")]
    TokenExpired,

    /// Token persistence failed
    #[error("Token store error: {0}")]
    TokenStore(PortError),

    /// Folder deletion refused because it still has entries
    #[error("Folder contains {0} entries; delete them first")]
    FolderNotEmpty(usize),

    /// Name or id that cannot be used in this store
    #[error("Invalid name: {0}")]
    InvalidName(String),

    /// File or folder does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Local filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Response did not have the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Invalid adapter configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<DriveError> for PortError {
    fn from(e: DriveError) -> Self {
        match e {
            DriveError::FolderNotEmpty(_) | DriveError::InvalidName(_) => {
                PortError::Rejected(e.to_string())
            }
            DriveError::NotFound(what) => PortError::NotFound(what),
            other => PortError::service("file-store", other.to_string()),
        }
    }
}
