use super::traits::BlobStore;
use async_trait::async_trait;
use aws_sdk_s3::{
    Client, config::BehaviorVersion, config::Credentials, config::Region, primitives::ByteStream,
};
use tracing::{debug, instrument};

/// S3-compatible blob store (AWS S3, Cloudflare R2, MinIO).
pub struct S3BlobStore {
    client: Client,
    bucket: String,
}

impl S3BlobStore {
    pub fn new(
        key: String,
        secret: String,
        endpoint: Option<String>,
        region: String,
        force_path_style: bool,
        bucket: String,
    ) -> Self {
        let creds = Credentials::new(key, secret, None, None, "picture-api");
        let mut builder = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(creds)
            .region(Region::new(region))
            .force_path_style(force_path_style);
        if let Some(endpoint) = endpoint {
            builder = builder.endpoint_url(endpoint);
        }
        Self {
            client: Client::from_conf(builder.build()),
            bucket,
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    #[instrument(skip(self, data), fields(bucket = %self.bucket, size = data.len()))]
    async fn put(&self, path: &str, data: Vec<u8>, content_type: &str) -> anyhow::Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(path)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn get(&self, path: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
        {
            Ok(output) => output,
            Err(err) if err.as_service_error().is_some_and(|e| e.is_no_such_key()) => {
                debug!("No object stored at {}", path);
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };
        let bytes = output.body.collect().await?.into_bytes();
        Ok(Some(bytes.to_vec()))
    }

    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn delete(&self, path: &str) -> anyhow::Result<()> {
        // DeleteObject already succeeds for missing keys.
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn copy(&self, source: &str, destination: &str) -> anyhow::Result<()> {
        self.client
            .copy_object()
            .bucket(&self.bucket)
            .copy_source(format!("{}/{}", self.bucket, source))
            .key(destination)
            .send()
            .await?;
        Ok(())
    }
}
