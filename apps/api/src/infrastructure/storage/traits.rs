use async_trait::async_trait;

/// Byte-level raster storage keyed by a logical path (`{origin}/{name}`).
///
/// The bucket is bound into the concrete store when it is built.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, path: &str, data: Vec<u8>, content_type: &str) -> anyhow::Result<()>;
    /// `None` when nothing is stored at `path`.
    async fn get(&self, path: &str) -> anyhow::Result<Option<Vec<u8>>>;
    /// Succeeds when `path` is already absent.
    async fn delete(&self, path: &str) -> anyhow::Result<()>;
    async fn copy(&self, source: &str, destination: &str) -> anyhow::Result<()>;
}
