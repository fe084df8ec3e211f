use super::traits::BlobStore;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Process-local blob store for development runs and tests.
#[derive(Default)]
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<String, StoredBlob>>,
}

#[derive(Clone)]
struct StoredBlob {
    data: Vec<u8>,
    content_type: String,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, path: &str) -> bool {
        self.blobs.read().await.contains_key(path)
    }

    pub async fn content_type(&self, path: &str) -> Option<String> {
        self.blobs
            .read()
            .await
            .get(path)
            .map(|b| b.content_type.clone())
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(&self, path: &str, data: Vec<u8>, content_type: &str) -> anyhow::Result<()> {
        self.blobs.write().await.insert(
            path.to_string(),
            StoredBlob {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn get(&self, path: &str) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.blobs.read().await.get(path).map(|b| b.data.clone()))
    }

    async fn delete(&self, path: &str) -> anyhow::Result<()> {
        self.blobs.write().await.remove(path);
        Ok(())
    }

    async fn copy(&self, source: &str, destination: &str) -> anyhow::Result<()> {
        let mut blobs = self.blobs.write().await;
        let blob = blobs
            .get(source)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no blob stored at {}", source))?;
        blobs.insert(destination.to_string(), blob);
        Ok(())
    }
}
