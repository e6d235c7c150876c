use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::{BlobStore, StorageError, check_path};

/// Process-local blob store, used by tests and local demos.
#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<Mutex<HashMap<String, (String, Vec<u8>)>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blobs currently held.
    pub fn len(&self) -> usize {
        self.blobs.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Content type recorded for a blob, if present.
    pub fn content_type(&self, path: &str) -> Option<String> {
        let map = self.blobs.lock().unwrap_or_else(|e| e.into_inner());
        map.get(path).map(|(ct, _)| ct.clone())
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<(), StorageError> {
        check_path(path)?;
        let mut map = self.blobs.lock().unwrap_or_else(|e| e.into_inner());
        map.insert(path.to_string(), (content_type.to_string(), bytes.to_vec()));
        Ok(())
    }

    async fn download(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let map = self.blobs.lock().unwrap_or_else(|e| e.into_inner());
        map.get(path)
            .map(|(_, bytes)| bytes.clone())
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        let mut map = self.blobs.lock().unwrap_or_else(|e| e.into_inner());
        map.remove(path);
        Ok(())
    }
}
