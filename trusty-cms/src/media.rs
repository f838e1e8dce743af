//! Media upload boundary
//!
//! Handlers hand an [`UploadedFile`] and a target folder to a
//! [`MediaStorage`] and get back the URL that is stored on the document.
//! Two backends exist: files on local disk served under `/uploads`, and the
//! Cloudinary upload API.

use async_trait::async_trait;
use axum::body::Bytes;
use chrono::Utc;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{CloudinaryConfig, MediaBackend, MediaConfig};
use crate::error::{Error, Result};
use crate::ids::DocumentId;

/// One file received in a multipart body
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Form field the file arrived in
    pub field: String,
    /// Client-supplied file name
    pub file_name: String,
    /// Declared MIME type
    pub content_type: Option<String>,
    /// File contents
    pub bytes: Bytes,
}

impl UploadedFile {
    /// `<stem>` of the file name reduced to URL-safe characters
    pub fn safe_stem(&self) -> String {
        let stem = Path::new(&self.file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        let cleaned: String = stem
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
            .collect();
        let cleaned = cleaned.trim_matches('-').to_lowercase();
        if cleaned.is_empty() {
            "file".to_string()
        } else {
            cleaned
        }
    }

    /// `<millis>-<stem>-<tag>`, distinct even for same-named files stored
    /// within one millisecond
    pub fn unique_stem(&self) -> String {
        let id = DocumentId::generate("upl");
        let random = id.as_str();
        let tag = &random[random.len() - 10..];
        format!("{}-{}-{}", Utc::now().timestamp_millis(), self.safe_stem(), tag)
    }

    /// Lowercased extension, if any
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|s| s.to_str())
            .map(str::to_lowercase)
    }

    /// True when the declared type is an image
    pub fn is_image(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|t| t.starts_with("image/"))
    }
}

/// Upload failures
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    /// File bigger than `media.max_file_size_mb`
    #[error("File exceeds the {limit_mb} MB upload limit")]
    TooLarge { limit_mb: usize },

    /// Local write failed
    #[error("Failed to store upload: {0}")]
    Io(#[from] std::io::Error),

    /// Media host unreachable
    #[error("Media host request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Media host answered with an error status
    #[error("Media host rejected upload ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Media host answered with something unexpected
    #[error("Unexpected media host response: {0}")]
    InvalidResponse(String),
}

/// Stores uploaded files and returns their public URL
#[async_trait]
pub trait MediaStorage: Send + Sync {
    /// Backend name for logs
    fn backend(&self) -> &'static str;

    /// Stores `file` under `folder`
    async fn store(&self, file: &UploadedFile, folder: &str) -> std::result::Result<String, MediaError>;
}

/// Builds the configured backend
pub fn from_config(config: &MediaConfig) -> Result<Arc<dyn MediaStorage>> {
    match config.backend {
        MediaBackend::Local => Ok(Arc::new(LocalMediaStorage::new(
            config.upload_dir.clone(),
            config.public_path.clone(),
        ))),
        MediaBackend::Cloudinary => {
            let cloudinary = config.cloudinary.clone().ok_or_else(|| {
                Error::Media("media.backend is cloudinary but [media.cloudinary] is missing".into())
            })?;
            Ok(Arc::new(CloudinaryStorage::new(cloudinary)?))
        }
    }
}

/// Files on local disk
#[derive(Debug, Clone)]
pub struct LocalMediaStorage {
    upload_dir: PathBuf,
    public_path: String,
}

impl LocalMediaStorage {
    pub fn new(upload_dir: impl Into<PathBuf>, public_path: impl Into<String>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            public_path: public_path.into(),
        }
    }
}

#[async_trait]
impl MediaStorage for LocalMediaStorage {
    fn backend(&self) -> &'static str {
        "local"
    }

    async fn store(&self, file: &UploadedFile, folder: &str) -> std::result::Result<String, MediaError> {
        let dir = self.upload_dir.join(folder);
        tokio::fs::create_dir_all(&dir).await?;

        let mut name = file.unique_stem();
        if let Some(ext) = file.extension() {
            name.push('.');
            name.push_str(&ext);
        }
        tokio::fs::write(dir.join(&name), &file.bytes).await?;

        tracing::debug!(folder, file = %name, bytes = file.bytes.len(), "Stored upload on disk");
        Ok(format!("{}/{}/{}", self.public_path.trim_end_matches('/'), folder, name))
    }
}

/// Cloudinary signed uploads
#[derive(Debug, Clone)]
pub struct CloudinaryStorage {
    config: CloudinaryConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    error: Option<UploadErrorBody>,
}

#[derive(Debug, Deserialize)]
struct UploadErrorBody {
    message: String,
}

impl CloudinaryStorage {
    pub fn new(config: CloudinaryConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("trusty-cms/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Media(format!("Failed to build media client: {e}")))?;
        Ok(Self { config, client })
    }

    fn upload_url(&self) -> String {
        format!(
            "{}/{}/auto/upload",
            self.config.api_base.trim_end_matches('/'),
            self.config.cloud_name
        )
    }
}

/// Request signature: SHA-256 over the sorted `key=value` pairs followed by the secret
pub fn sign(params: &[(&str, String)], api_secret: &str) -> String {
    let mut sorted: Vec<_> = params.iter().filter(|(_, v)| !v.is_empty()).collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait]
impl MediaStorage for CloudinaryStorage {
    fn backend(&self) -> &'static str {
        "cloudinary"
    }

    async fn store(&self, file: &UploadedFile, folder: &str) -> std::result::Result<String, MediaError> {
        let timestamp = Utc::now().timestamp();
        let mut params: Vec<(&str, String)> = vec![
            ("folder", folder.to_string()),
            ("public_id", file.unique_stem()),
            ("timestamp", timestamp.to_string()),
        ];
        if file.is_image() {
            params.push(("transformation", "c_limit,w_1000".to_string()));
        }
        let signature = sign(&params, &self.config.api_secret);

        let mut part = reqwest::multipart::Part::bytes(file.bytes.to_vec()).file_name(file.file_name.clone());
        if let Some(content_type) = &file.content_type {
            part = part
                .mime_str(content_type)
                .map_err(|e| MediaError::InvalidResponse(format!("Invalid content type: {e}")))?;
        }

        let mut form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("api_key", self.config.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");
        for (key, value) in params {
            form = form.text(key, value);
        }

        let response = self.client.post(self.upload_url()).multipart(form).send().await?;
        let status = response.status();
        let body = response.text().await?;
        let parsed: Option<UploadResponse> = serde_json::from_str(&body).ok();

        if !status.is_success() {
            let message = parsed
                .and_then(|r| r.error)
                .map(|e| e.message)
                .unwrap_or(body);
            tracing::warn!(folder, status = status.as_u16(), %message, "Cloudinary rejected upload");
            return Err(MediaError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        parsed
            .and_then(|r| r.secure_url)
            .ok_or_else(|| MediaError::InvalidResponse("missing secure_url".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, content_type: &str) -> UploadedFile {
        UploadedFile {
            field: "image".into(),
            file_name: name.into(),
            content_type: Some(content_type.into()),
            bytes: Bytes::from_static(b"\x89PNG"),
        }
    }

    #[test]
    fn test_safe_stem_and_extension() {
        let f = file("My Photo (1).PNG", "image/png");
        assert_eq!(f.safe_stem(), "my-photo--1");
        assert_eq!(f.extension().as_deref(), Some("png"));
        assert!(f.is_image());
        assert_eq!(file("???", "application/pdf").safe_stem(), "file");
    }

    #[test]
    fn test_signature_ignores_param_order() {
        let a = sign(&[("timestamp", "1".into()), ("folder", "general".into())], "secret");
        let b = sign(&[("folder", "general".into()), ("timestamp", "1".into())], "secret");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, sign(&[("folder", "general".into()), ("timestamp", "1".into())], "other"));
    }

    #[tokio::test]
    async fn test_local_store_writes_under_folder() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalMediaStorage::new(dir.path(), "/uploads/");

        let url = storage.store(&file("cover.png", "image/png"), "general").await.unwrap();
        assert!(url.starts_with("/uploads/general/"));
        assert!(url.contains("-cover-"));
        assert!(url.ends_with(".png"));

        let name = url.rsplit('/').next().unwrap();
        let written = std::fs::read(dir.path().join("general").join(name)).unwrap();
        assert_eq!(written, b"\x89PNG");
    }

    #[tokio::test]
    async fn test_same_name_uploads_do_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalMediaStorage::new(dir.path(), "/uploads");

        let mut first = file("photo.jpg", "image/jpeg");
        first.bytes = Bytes::from_static(b"first");
        let mut second = file("photo.jpg", "image/jpeg");
        second.bytes = Bytes::from_static(b"second");

        let (a, b) = tokio::join!(storage.store(&first, "projects"), storage.store(&second, "projects"));
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_ne!(a, b);

        let read = |url: &str| std::fs::read(dir.path().join("projects").join(url.rsplit('/').next().unwrap())).unwrap();
        assert_eq!(read(&a), b"first");
        assert_eq!(read(&b), b"second");
    }

    #[test]
    fn test_unique_stem_keeps_the_file_name() {
        let f = file("Site Plan.pdf", "application/pdf");
        let (x, y) = (f.unique_stem(), f.unique_stem());
        assert_ne!(x, y);
        assert!(x.contains("-site-plan-"));
    }

    #[test]
    fn test_cloudinary_requires_credentials() {
        let config = MediaConfig {
            backend: MediaBackend::Cloudinary,
            cloudinary: None,
            ..MediaConfig::default()
        };
        assert!(matches!(from_config(&config), Err(Error::Media(_))));
    }
}
