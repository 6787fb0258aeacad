//! Local-disk file store. Folders are directories under a root path.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use super::{FileStore, StoredFile, UploadFile};
use crate::error::StorageError;

pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn folder_path(&self, folder_id: &str) -> Result<PathBuf, StorageError> {
        let as_file = UploadFile {
            file_name: folder_id.to_string(),
            mime_type: String::new(),
            bytes: Vec::new(),
        };
        as_file.validate_name()?;
        Ok(self.root.join(folder_id))
    }
}

/// First of `name`, `stem-1.ext`, `stem-2.ext`, ... that doesn't exist yet.
async fn free_path(dir: &Path, name: &str) -> Result<PathBuf, StorageError> {
    let candidate = dir.join(name);
    if !tokio::fs::try_exists(&candidate).await? {
        return Ok(candidate);
    }
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    };
    let mut n = 1;
    loop {
        let numbered = match ext {
            Some(ext) => format!("{stem}-{n}.{ext}"),
            None => format!("{stem}-{n}"),
        };
        let candidate = dir.join(numbered);
        if !tokio::fs::try_exists(&candidate).await? {
            return Ok(candidate);
        }
        n += 1;
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn ensure_folder(&self, name: &str) -> Result<String, StorageError> {
        let path = self.folder_path(name)?;
        tokio::fs::create_dir_all(&path).await?;
        Ok(name.to_string())
    }

    async fn upload(&self, folder_id: &str, file: UploadFile) -> Result<StoredFile, StorageError> {
        file.validate_name()?;
        let dir = self.folder_path(folder_id)?;
        tokio::fs::create_dir_all(&dir).await?;

        let path = free_path(&dir, file.file_name.trim()).await?;
        tokio::fs::write(&path, &file.bytes).await?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        info!(folder = %folder_id, file = %name, bytes = file.bytes.len(), "File stored");

        Ok(StoredFile {
            id: format!("{folder_id}/{name}"),
            name,
            mime_type: Some(file.mime_type),
            web_link: None,
        })
    }

    async fn list(&self, folder_id: &str) -> Result<Vec<StoredFile>, StorageError> {
        let dir = self.folder_path(folder_id)?;
        if !tokio::fs::try_exists(&dir).await? {
            return Ok(Vec::new());
        }

        let mut entries = tokio::fs::read_dir(&dir).await?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            files.push(StoredFile {
                id: format!("{folder_id}/{name}"),
                name,
                mime_type: None,
                web_link: None,
            });
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }
}
