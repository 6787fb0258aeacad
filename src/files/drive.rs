//! Google Drive v3 adapter.
//!
//! Folders are created under a configured parent folder. Requests carry a
//! pre-issued OAuth access token as a bearer header.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, info};

use super::{FileStore, FolderCache, StoredFile, UploadFile};
use crate::error::{ConfigError, StorageError};

const FOLDER_MIME: &str = "application/vnd.google-apps.folder";
const DEFAULT_API_BASE: &str = "https://www.googleapis.com";

/// Drive settings.
#[derive(Debug, Clone)]
pub struct DriveConfig {
    pub access_token: SecretString,
    /// Folder that holds every request folder.
    pub parent_folder_id: String,
    /// Overridable for tests.
    pub api_base: String,
}

impl DriveConfig {
    /// Build config from `GOOGLE_DRIVE_*` variables.
    /// Returns `Ok(None)` if `GOOGLE_DRIVE_ACCESS_TOKEN` is not set.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Option<Self>, ConfigError> {
        let Some(token) = var("GOOGLE_DRIVE_ACCESS_TOKEN") else {
            return Ok(None);
        };
        let parent_folder_id = var("GOOGLE_DRIVE_PARENT_FOLDER_ID")
            .ok_or_else(|| ConfigError::MissingEnvVar("GOOGLE_DRIVE_PARENT_FOLDER_ID".into()))?;
        let api_base = var("GOOGLE_DRIVE_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        Ok(Some(Self {
            access_token: SecretString::from(token),
            parent_folder_id,
            api_base,
        }))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    web_view_link: Option<String>,
}

impl From<DriveFile> for StoredFile {
    fn from(f: DriveFile) -> Self {
        Self {
            id: f.id,
            name: f.name,
            mime_type: f.mime_type,
            web_link: f.web_view_link,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

/// Drive-backed [`FileStore`].
pub struct DriveFileStore {
    config: DriveConfig,
    cache: Arc<FolderCache>,
    client: reqwest::Client,
}

impl DriveFileStore {
    pub fn new(config: DriveConfig, cache: Arc<FolderCache>) -> Self {
        Self {
            config,
            cache,
            client: reqwest::Client::new(),
        }
    }

    fn files_url(&self) -> String {
        format!("{}/drive/v3/files", self.config.api_base.trim_end_matches('/'))
    }

    fn upload_url(&self) -> String {
        format!(
            "{}/upload/drive/v3/files",
            self.config.api_base.trim_end_matches('/')
        )
    }

    /// Send a request and decode a JSON body, mapping non-2xx to `Provider`.
    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
    ) -> Result<T, StorageError> {
        let resp = req
            .bearer_auth(self.config.access_token.expose_secret())
            .send()
            .await
            .map_err(|e| StorageError::Request(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StorageError::Provider {
                status: status.as_u16(),
                body,
            });
        }
        resp.json::<T>()
            .await
            .map_err(|e| StorageError::Request(format!("bad Drive response: {e}")))
    }

    async fn find_folder(&self, name: &str) -> Result<Option<String>, StorageError> {
        let q = format!(
            "name='{}' and mimeType='{FOLDER_MIME}' and '{}' in parents and trashed=false",
            escape_query(name),
            escape_query(&self.config.parent_folder_id)
        );
        let list: FileList = self
            .call(self.client.get(self.files_url()).query(&[
                ("q", q.as_str()),
                ("fields", "files(id,name)"),
                ("spaces", "drive"),
            ]))
            .await?;
        Ok(list.files.into_iter().next().map(|f| f.id))
    }

    async fn create_folder(&self, name: &str) -> Result<String, StorageError> {
        let body = serde_json::json!({
            "name": name,
            "mimeType": FOLDER_MIME,
            "parents": [self.config.parent_folder_id],
        });
        let created: DriveFile = self
            .call(
                self.client
                    .post(self.files_url())
                    .query(&[("fields", "id")])
                    .json(&body),
            )
            .await?;
        info!(folder = %name, folder_id = %created.id, "Drive folder created");
        Ok(created.id)
    }
}

/// Escape a value for a single-quoted Drive query literal.
fn escape_query(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

#[async_trait]
impl FileStore for DriveFileStore {
    async fn ensure_folder(&self, name: &str) -> Result<String, StorageError> {
        if let Some(id) = self.cache.get(name).await {
            debug!(folder = %name, "Drive folder cache hit");
            return Ok(id);
        }

        let id = match self.find_folder(name).await? {
            Some(id) => id,
            None => self.create_folder(name).await?,
        };
        self.cache.insert(name, id.clone()).await;
        Ok(id)
    }

    async fn upload(&self, folder_id: &str, file: UploadFile) -> Result<StoredFile, StorageError> {
        file.validate_name()?;

        let metadata = serde_json::json!({
            "name": file.file_name,
            "parents": [folder_id],
        });
        let metadata_part = Part::text(metadata.to_string())
            .mime_str("application/json")
            .map_err(|e| StorageError::Request(e.to_string()))?;
        let file_part = Part::bytes(file.bytes)
            .file_name(file.file_name.clone())
            .mime_str(&file.mime_type)
            .map_err(|e| StorageError::Request(format!("mime type {}: {e}", file.mime_type)))?;
        let form = Form::new()
            .part("metadata", metadata_part)
            .part("file", file_part);

        let uploaded: DriveFile = self
            .call(
                self.client
                    .post(self.upload_url())
                    .query(&[
                        ("uploadType", "multipart"),
                        ("fields", "id,name,mimeType,webViewLink"),
                    ])
                    .multipart(form),
            )
            .await?;

        info!(folder_id = %folder_id, file = %uploaded.name, "File uploaded to Drive");
        Ok(uploaded.into())
    }

    async fn list(&self, folder_id: &str) -> Result<Vec<StoredFile>, StorageError> {
        let q = format!("'{}' in parents and trashed=false", escape_query(folder_id));
        let list: FileList = self
            .call(self.client.get(self.files_url()).query(&[
                ("q", q.as_str()),
                ("fields", "files(id,name,mimeType,webViewLink)"),
                ("orderBy", "createdTime"),
            ]))
            .await?;
        Ok(list.files.into_iter().map(StoredFile::from).collect())
    }
}
