//! Document storage for contract paperwork.
//!
//! Each request gets one folder named `{first}_{last}_{id}`. Folder ids are
//! memoized in a [`FolderCache`] owned by whoever builds the adapter.

pub mod drive;
pub mod local;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::StorageError;

pub use drive::{DriveConfig, DriveFileStore};
pub use local::LocalFileStore;

/// A file to store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    /// Reject names that could escape the folder or are empty.
    pub fn validate_name(&self) -> Result<(), StorageError> {
        let name = self.file_name.trim();
        if name.is_empty()
            || name == "."
            || name == ".."
            || name.contains(['/', '\\'])
            || name.contains('\0')
        {
            return Err(StorageError::InvalidFileName(self.file_name.clone()));
        }
        Ok(())
    }
}

/// A stored file as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    /// Browser link, when the backend has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_link: Option<String>,
}

/// Folder-based file storage.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Find or create the folder called `name`. Returns its id.
    async fn ensure_folder(&self, name: &str) -> Result<String, StorageError>;

    /// Store `file` inside folder `folder_id`.
    async fn upload(&self, folder_id: &str, file: UploadFile) -> Result<StoredFile, StorageError>;

    /// Files in folder `folder_id`.
    async fn list(&self, folder_id: &str) -> Result<Vec<StoredFile>, StorageError>;
}

/// Folder name → folder id memo, shared across requests.
#[derive(Debug, Default)]
pub struct FolderCache {
    inner: RwLock<HashMap<String, String>>,
}

impl FolderCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, name: &str) -> Option<String> {
        self.inner.read().await.get(name).cloned()
    }

    pub async fn insert(&self, name: impl Into<String>, id: impl Into<String>) {
        self.inner.write().await.insert(name.into(), id.into());
    }
}
