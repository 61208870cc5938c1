//! In-memory file store for tests and local development

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{FileError, FileRecord, FileStore};

#[derive(Default)]
pub struct MemoryFileStore {
    files: Mutex<HashMap<Uuid, (FileRecord, Vec<u8>)>>,
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored files; handy in tests.
    pub fn len(&self) -> usize {
        self.files.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn create(
        &self,
        label: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<FileRecord, FileError> {
        let now = Utc::now();
        let file_id = Uuid::new_v4();
        let record = FileRecord {
            file_id,
            label: label.to_string(),
            location: format!("mem://{}", file_id),
            content_type: content_type.to_string(),
            created_at: now,
            updated_at: now,
        };

        self.files
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(file_id, (record.clone(), bytes));
        Ok(record)
    }

    async fn open(&self, file_id: Uuid) -> Result<(FileRecord, Vec<u8>), FileError> {
        self.files
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&file_id)
            .cloned()
            .ok_or(FileError::NotFound)
    }

    async fn delete(&self, file_id: Uuid) -> Result<(), FileError> {
        self.files
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&file_id)
            .map(|_| ())
            .ok_or(FileError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_roundtrip() {
        let store = MemoryFileStore::new();
        let record = store
            .create("visit.jpg", "image/jpeg", vec![1, 2, 3])
            .await
            .unwrap();

        let (meta, bytes) = store.open(record.file_id).await.unwrap();
        assert_eq!(meta.label, "visit.jpg");
        assert_eq!(bytes, vec![1, 2, 3]);

        store.delete(record.file_id).await.unwrap();
        assert!(matches!(
            store.open(record.file_id).await.unwrap_err(),
            FileError::NotFound
        ));
    }
}
