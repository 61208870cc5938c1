//! Document storage: evidence uploads and generated agreement letters
//!
//! Metadata lives in Postgres, bytes on local disk under a configured
//! directory. Document references are create-once; deletion only happens on
//! explicit request (compensating cleanup when an approval or disbursement
//! fails after its evidence file was stored).

mod local;
mod memory;

pub use local::LocalFileStore;
pub use memory::MemoryFileStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::error::ApiError;

/// Stored file metadata
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FileRecord {
    pub file_id: Uuid,
    /// Original or generated file name
    pub label: String,
    /// Backend-specific location (path on disk)
    pub location: String,
    pub content_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// File storage failure
#[derive(Debug, Error)]
pub enum FileError {
    #[error("file not found")]
    NotFound,

    #[error("unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("storage failure: {0}")]
    Storage(String),
}

impl From<sqlx::Error> for FileError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => FileError::NotFound,
            _ => FileError::Storage(err.to_string()),
        }
    }
}

impl From<std::io::Error> for FileError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            FileError::NotFound
        } else {
            FileError::Storage(err.to_string())
        }
    }
}

impl From<FileError> for ApiError {
    fn from(err: FileError) -> Self {
        match err {
            FileError::NotFound => ApiError::NotFound("file not found".to_string()),
            FileError::UnsupportedType(t) => {
                ApiError::Validation(format!("unsupported file type: {}", t))
            }
            FileError::Storage(e) => ApiError::Storage(e),
        }
    }
}

/// Blob + metadata storage contract.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Store bytes under a fresh id and record the metadata.
    async fn create(
        &self,
        label: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<FileRecord, FileError>;

    /// Fetch metadata and bytes.
    async fn open(&self, file_id: Uuid) -> Result<(FileRecord, Vec<u8>), FileError>;

    /// Remove bytes and metadata.
    async fn delete(&self, file_id: Uuid) -> Result<(), FileError>;
}

/// Upload allow-list: extension and the MIME type it must declare.
const ALLOWED_UPLOADS: &[(&str, &str)] = &[
    (".jpg", "image/jpeg"),
    (".jpeg", "image/jpeg"),
    (".png", "image/png"),
    (".pdf", "application/pdf"),
];

/// Validate an uploaded file name against the allow-list, returning the
/// canonical content type for it.
pub fn validate_upload(filename: &str) -> Result<&'static str, FileError> {
    let ext = filename
        .rfind('.')
        .map(|i| filename[i..].to_lowercase())
        .unwrap_or_default();

    ALLOWED_UPLOADS
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| *mime)
        .ok_or_else(|| {
            FileError::UnsupportedType(format!(
                "'{}': only JPG, PNG, PDF are allowed",
                filename
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_upload_allowed() {
        assert_eq!(validate_upload("visit.jpg").unwrap(), "image/jpeg");
        assert_eq!(validate_upload("visit.JPEG").unwrap(), "image/jpeg");
        assert_eq!(validate_upload("agreement.pdf").unwrap(), "application/pdf");
    }

    #[test]
    fn test_validate_upload_rejected() {
        assert!(validate_upload("malware.exe").is_err());
        assert!(validate_upload("noextension").is_err());
    }
}
