//! Filesystem-backed file store
//!
//! Folders are directories and their ids are paths relative to the store root
//! (the root itself is `""`). Files are written under a generated unique name
//! that doubles as their id, so moving a file between folders keeps its id.
//! Public URLs are `file://` URIs.

use crate::DriveError;
use async_trait::async_trait;
use folio_domain::traits::FileStore;
use folio_domain::{FileRef, FolderRef, PortError, StoreStatus};
use std::path::{Component, Path, PathBuf};
use tracing::info;

/// Separator between the generated id prefix and the original file name
const ID_SEPARATOR: char = '_';

/// `FileStore` over a local directory tree
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    /// Open a store rooted at `root`, creating the directory if needed
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, DriveError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        let root = root.canonicalize()?;
        Ok(Self { root })
    }

    /// Store root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of a folder id, refusing ids that leave the root
    fn folder_path(&self, folder_id: &str) -> Result<PathBuf, DriveError> {
        let relative = Path::new(folder_id);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(DriveError::InvalidName(folder_id.to_string()));
        }
        Ok(self.root.join(relative))
    }

    fn folder_id(parent: &str, name: &str) -> String {
        if parent.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", parent.trim_end_matches('/'), name)
        }
    }

    fn to_url(path: &Path) -> String {
        format!("file://{}", path.display())
    }

    /// Locate an entry by id: folder ids resolve directly, file ids by search
    async fn locate(&self, id: &str) -> Result<PathBuf, DriveError> {
        let direct = self.folder_path(id)?;
        if tokio::fs::try_exists(&direct).await? {
            return Ok(direct);
        }

        let mut pending = vec![self.root.clone()];
        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                } else if entry.file_name().to_string_lossy() == id {
                    return Ok(path);
                }
            }
        }
        Err(DriveError::NotFound(id.to_string()))
    }

    fn relative_id(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }
}

fn check_name(name: &str) -> Result<(), DriveError> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(DriveError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Original file name of a stored file
fn display_name(stored: &str) -> &str {
    stored
        .split_once(ID_SEPARATOR)
        .map(|(_, name)| name)
        .unwrap_or(stored)
}

#[async_trait]
impl FileStore for LocalFileStore {
    fn root_folder(&self) -> &str {
        ""
    }

    async fn create_folder(
        &self,
        name: &str,
        parent: Option<&str>,
    ) -> Result<FolderRef, PortError> {
        check_name(name)?;
        let id = Self::folder_id(parent.unwrap_or(""), name);
        let path = self.folder_path(&id)?;
        tokio::fs::create_dir_all(&path).await.map_err(DriveError::from)?;
        info!("Folder created: {} ({})", name, id);
        Ok(FolderRef {
            id,
            name: name.to_string(),
            link: Some(Self::to_url(&path)),
        })
    }

    async fn find_folder(
        &self,
        name: &str,
        parent: Option<&str>,
    ) -> Result<Option<FolderRef>, PortError> {
        check_name(name)?;
        let id = Self::folder_id(parent.unwrap_or(""), name);
        let path = self.folder_path(&id)?;
        let is_dir = tokio::fs::metadata(&path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        Ok(is_dir.then(|| FolderRef {
            id,
            name: name.to_string(),
            link: Some(Self::to_url(&path)),
        }))
    }

    async fn upload(
        &self,
        bytes: &[u8],
        name: &str,
        mime_type: &str,
        folder_id: &str,
    ) -> Result<FileRef, PortError> {
        check_name(name)?;
        let folder = self.folder_path(folder_id)?;
        if !tokio::fs::metadata(&folder)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
        {
            return Err(DriveError::NotFound(format!("folder '{}'", folder_id)).into());
        }

        let id = format!("{}{}{}", uuid::Uuid::now_v7().simple(), ID_SEPARATOR, name);
        let path = folder.join(&id);
        tokio::fs::write(&path, bytes).await.map_err(DriveError::from)?;
        info!("File uploaded: {} ({} bytes)", name, bytes.len());
        Ok(FileRef {
            id,
            name: name.to_string(),
            mime_type: Some(mime_type.to_string()),
            link: Some(Self::to_url(&path)),
            is_folder: false,
        })
    }

    async fn move_file(&self, file_id: &str, target_folder_id: &str) -> Result<(), PortError> {
        let source = self.locate(file_id).await?;
        let target = self.folder_path(target_folder_id)?.join(file_id);
        tokio::fs::rename(&source, &target)
            .await
            .map_err(DriveError::from)?;
        info!("Moved {} to folder '{}'", file_id, target_folder_id);
        Ok(())
    }

    async fn delete(&self, file_id: &str, check_empty: bool) -> Result<(), PortError> {
        let path = self.locate(file_id).await?;
        if path == self.root {
            return Err(DriveError::InvalidName("store root".to_string()).into());
        }
        let metadata = tokio::fs::metadata(&path).await.map_err(DriveError::from)?;
        if metadata.is_dir() {
            if check_empty {
                let entries = self.list(&self.relative_id(&path)).await?;
                if !entries.is_empty() {
                    return Err(DriveError::FolderNotEmpty(entries.len()).into());
                }
            }
            tokio::fs::remove_dir_all(&path)
                .await
                .map_err(DriveError::from)?;
        } else {
            tokio::fs::remove_file(&path)
                .await
                .map_err(DriveError::from)?;
        }
        info!("Deleted {}", file_id);
        Ok(())
    }

    async fn public_url(&self, file_id: &str) -> Result<String, PortError> {
        let path = self.locate(file_id).await?;
        Ok(Self::to_url(&path))
    }

    async fn file_link(&self, file_id: &str) -> Result<Option<String>, PortError> {
        let path = self.locate(file_id).await?;
        Ok(Some(Self::to_url(&path)))
    }

    async fn list(&self, folder_id: &str) -> Result<Vec<FileRef>, PortError> {
        let folder = self.folder_path(folder_id)?;
        let mut entries = match tokio::fs::read_dir(&folder).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DriveError::NotFound(format!("folder '{}'", folder_id)).into())
            }
            Err(e) => return Err(DriveError::from(e).into()),
        };
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(DriveError::from)? {
            let path = entry.path();
            let stored = entry.file_name().to_string_lossy().into_owned();
            let is_folder = entry
                .file_type()
                .await
                .map_err(DriveError::from)?
                .is_dir();
            let (id, name) = if is_folder {
                (self.relative_id(&path), stored)
            } else {
                (stored.clone(), display_name(&stored).to_string())
            };
            files.push(FileRef {
                id,
                name,
                mime_type: None,
                link: Some(Self::to_url(&path)),
                is_folder,
            });
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    async fn status(&self) -> Result<StoreStatus, PortError> {
        Ok(StoreStatus {
            backend: "local".to_string(),
            authenticated: true,
            has_access_token: false,
        })
    }
}
