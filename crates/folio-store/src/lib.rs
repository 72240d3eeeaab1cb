//! Folio Storage Layer
//!
//! Implements the `Catalog` and `TokenStore` traits on SQLite.
//!
//! # Architecture
//!
//! - One connection behind a mutex; every operation runs on the blocking pool
//! - Field schemas and extracted data are JSON columns
//! - Type names are unique per owner on their trimmed, lowercased form, checked
//!   before writing and enforced again by a `UNIQUE` constraint
//!
//! # Examples
//!
//! ```no_run
//! use folio_store::SqliteCatalog;
//!
//! let catalog = SqliteCatalog::new("folio.db").unwrap();
//! // Catalog is now ready for document and type operations
//! ```

#![warn(missing_docs)]

mod catalog;
mod rows;
mod tokens;

use folio_domain::PortError;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// JSON column could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Owner-scoped name already taken
    #[error("Document type name already exists: {0}")]
    Conflict(String),

    /// Blocking task failed
    #[error("Storage task failed: {0}")]
    Task(String),
}

impl From<CatalogError> for PortError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::Conflict(name) => PortError::Conflict(name),
            CatalogError::NotFound(what) => PortError::NotFound(what),
            other => PortError::service("catalog", other.to_string()),
        }
    }
}

/// SQLite-based implementation of `Catalog` and `TokenStore`
///
/// Cloning is cheap; clones share the connection.
#[derive(Clone)]
pub struct SqliteCatalog {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCatalog {
    /// Open (or create) a catalog at the given database path
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(include_str!("schema.sql"))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory catalog
    pub fn in_memory() -> Result<Self, CatalogError> {
        Self::new(":memory:")
    }

    /// Run `f` against the connection on the blocking pool
    async fn with_conn<F, T>(&self, f: F) -> Result<T, CatalogError>
    where
        F: FnOnce(&mut Connection) -> Result<T, CatalogError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| CatalogError::Task("connection mutex poisoned".to_string()))?;
            f(&mut guard)
        })
        .await
        .map_err(|e| CatalogError::Task(e.to_string()))?
    }
}

/// Whether a SQLite error is a uniqueness violation
pub(crate) fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
