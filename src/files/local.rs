//! Disk-backed file store with Postgres metadata

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use super::{FileError, FileRecord, FileStore};

pub struct LocalFileStore {
    pool: PgPool,
    base_dir: PathBuf,
}

impl LocalFileStore {
    pub fn new(pool: PgPool, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            pool,
            base_dir: base_dir.into(),
        }
    }

    /// Create the storage directory if it does not exist yet.
    pub async fn ensure_base_dir(&self) -> Result<(), FileError> {
        tokio::fs::create_dir_all(&self.base_dir).await?;
        Ok(())
    }

    async fn metadata(&self, file_id: Uuid) -> Result<FileRecord, FileError> {
        let record =
            sqlx::query_as::<_, FileRecord>("SELECT * FROM files WHERE file_id = $1")
                .bind(file_id)
                .fetch_optional(&self.pool)
                .await?;
        record.ok_or(FileError::NotFound)
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn create(
        &self,
        label: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<FileRecord, FileError> {
        let file_id = Uuid::new_v4();
        let ext = label.rfind('.').map(|i| &label[i..]).unwrap_or("");
        let location = self.base_dir.join(format!("{}{}", file_id, ext));

        tokio::fs::write(&location, &bytes).await?;

        let now = Utc::now();
        let record = sqlx::query_as::<_, FileRecord>(
            r#"
            INSERT INTO files (file_id, label, location, content_type, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING *
            "#,
        )
        .bind(file_id)
        .bind(label)
        .bind(location.to_string_lossy().as_ref())
        .bind(content_type)
        .bind(now)
        .fetch_one(&self.pool)
        .await;

        match record {
            Ok(record) => Ok(record),
            Err(e) => {
                // Metadata insert failed; do not leave orphaned bytes behind.
                let _ = tokio::fs::remove_file(&location).await;
                Err(e.into())
            }
        }
    }

    async fn open(&self, file_id: Uuid) -> Result<(FileRecord, Vec<u8>), FileError> {
        let record = self.metadata(file_id).await?;
        let bytes = tokio::fs::read(&record.location).await?;
        Ok((record, bytes))
    }

    async fn delete(&self, file_id: Uuid) -> Result<(), FileError> {
        let record = self.metadata(file_id).await?;

        tokio::fs::remove_file(&record.location).await?;

        sqlx::query("DELETE FROM files WHERE file_id = $1")
            .bind(file_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
