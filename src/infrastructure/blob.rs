use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::ports::BlobStore;
use crate::error::Result;

/// Keeps uploaded blobs in a map and hands back `memory://` URLs. Stands in
/// for the object storage bucket in tests and embedded deployments.
#[derive(Default)]
pub struct InMemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.blobs
            .lock()
            .expect("blob mutex poisoned")
            .get(path)
            .cloned()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<String> {
        self.blobs
            .lock()
            .expect("blob mutex poisoned")
            .insert(path.to_string(), bytes);
        Ok(format!("memory://{path}"))
    }
}
