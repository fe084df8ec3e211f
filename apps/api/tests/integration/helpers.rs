use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use chrono::Utc;
use picture_api::{
    application::lifecycle::use_case::PictureLifecycle,
    config::{BlobBackend, Config, PersistenceBackend},
    domain::picture::{
        entity::{BoundingBox, BoxInformation, Picture, PictureFilter, PictureKey, Size, Tag},
        errors::DomainError,
        repository::{PictureRepository, StageStores},
        stage::Stage,
    },
    infrastructure::{
        codec::image_codec::ImageCodec,
        repositories::memory_picture_repository::InMemoryPictureRepository,
        storage::{memory_blob_store::InMemoryBlobStore, traits::BlobStore},
    },
    presentation::http::{routes::create_router, state::AppState},
};
use serde::de::DeserializeOwned;
use std::{
    collections::BTreeMap,
    io::Cursor,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};
use tower::ServiceExt;
use uuid::Uuid;

/// Wraps an in-memory store and fails deletes while the switch is on.
pub struct FlakyRepository {
    pub inner: InMemoryPictureRepository,
    pub fail_deletes: AtomicBool,
    pub fail_creates: AtomicBool,
}

impl FlakyRepository {
    pub fn new(stage: Stage) -> Self {
        Self {
            inner: InMemoryPictureRepository::new(stage),
            fail_deletes: AtomicBool::new(false),
            fail_creates: AtomicBool::new(false),
        }
    }

    fn injected(op: &str) -> DomainError {
        DomainError::InfrastructureError(format!("injected {} failure", op))
    }
}

#[async_trait]
impl PictureRepository for FlakyRepository {
    async fn create(&self, picture: &Picture) -> Result<(), DomainError> {
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(Self::injected("create"));
        }
        self.inner.create(picture).await
    }

    async fn find(&self, key: &PictureKey) -> Result<Option<Picture>, DomainError> {
        self.inner.find(key).await
    }

    async fn update(&self, picture: &Picture) -> Result<(), DomainError> {
        self.inner.update(picture).await
    }

    async fn delete(&self, key: &PictureKey) -> Result<(), DomainError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(Self::injected("delete"));
        }
        self.inner.delete(key).await
    }

    async fn list(
        &self,
        origin: &str,
        filter: &PictureFilter,
    ) -> Result<Vec<Picture>, DomainError> {
        self.inner.list(origin, filter).await
    }

    async fn create_tag(
        &self,
        key: &PictureKey,
        tag_id: Uuid,
        tag: &Tag,
    ) -> Result<(), DomainError> {
        self.inner.create_tag(key, tag_id, tag).await
    }

    async fn update_tag(
        &self,
        key: &PictureKey,
        tag_id: Uuid,
        tag: &Tag,
    ) -> Result<(), DomainError> {
        self.inner.update_tag(key, tag_id, tag).await
    }

    async fn delete_tag(&self, key: &PictureKey, tag_id: Uuid) -> Result<(), DomainError> {
        self.inner.delete_tag(key, tag_id).await
    }
}

/// Blob store whose writes or deletes can be switched to fail.
#[derive(Default)]
pub struct FlakyBlobStore {
    pub inner: InMemoryBlobStore,
    pub fail_puts: AtomicBool,
    pub fail_deletes: AtomicBool,
}

#[async_trait]
impl BlobStore for FlakyBlobStore {
    async fn put(&self, path: &str, data: Vec<u8>, content_type: &str) -> anyhow::Result<()> {
        if self.fail_puts.load(Ordering::SeqCst) {
            anyhow::bail!("injected put failure");
        }
        self.inner.put(path, data, content_type).await
    }

    async fn get(&self, path: &str) -> anyhow::Result<Option<Vec<u8>>> {
        self.inner.get(path).await
    }

    async fn delete(&self, path: &str) -> anyhow::Result<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            anyhow::bail!("injected delete failure");
        }
        self.inner.delete(path).await
    }

    async fn copy(&self, source: &str, destination: &str) -> anyhow::Result<()> {
        self.inner.copy(source, destination).await
    }
}

pub struct Harness {
    pub lifecycle: Arc<PictureLifecycle>,
    pub pending: Arc<FlakyRepository>,
    pub validated: Arc<FlakyRepository>,
    pub published: Arc<FlakyRepository>,
    pub blocked: Arc<FlakyRepository>,
    pub blobs: Arc<FlakyBlobStore>,
}

impl Harness {
    pub fn new() -> Self {
        let pending = Arc::new(FlakyRepository::new(Stage::Pending));
        let validated = Arc::new(FlakyRepository::new(Stage::Validated));
        let published = Arc::new(FlakyRepository::new(Stage::Published));
        let blocked = Arc::new(FlakyRepository::new(Stage::Blocked));
        let blobs = Arc::new(FlakyBlobStore::default());

        let stores = StageStores::new(
            pending.clone(),
            validated.clone(),
            published.clone(),
            blocked.clone(),
        );
        let lifecycle = Arc::new(PictureLifecycle::new(
            stores,
            blobs.clone(),
            Arc::new(ImageCodec),
        ));

        Self {
            lifecycle,
            pending,
            validated,
            published,
            blocked,
            blobs,
        }
    }

    pub fn store(&self, stage: Stage) -> &FlakyRepository {
        match stage {
            Stage::Pending => &self.pending,
            Stage::Validated => &self.validated,
            Stage::Published => &self.published,
            Stage::Blocked => &self.blocked,
        }
    }

    pub fn router(&self) -> Router {
        create_router(AppState {
            lifecycle: self.lifecycle.clone(),
            db: None,
            config: test_config(),
        })
    }
}

pub fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        persistence_backend: PersistenceBackend::Memory,
        database_url: None,
        database_max_connections: 5,
        blob_backend: BlobBackend::Memory,
        s3: None,
        max_upload_bytes: 5 * 1024 * 1024,
        cors_allowed_origins: Vec::new(),
        enable_stage_audit: false,
        stage_audit_origins: Vec::new(),
        stage_audit_interval_seconds: 60,
        ignore_missing_migrations: true,
    }
}

/// A picture whose only size covers a `width` x `height` raster, carrying
/// one spatial tag per given box.
pub fn sample_picture(name: &str, width: u32, height: u32, boxes: &[BoundingBox]) -> Picture {
    let size_id = Uuid::now_v7();
    let mut sizes = BTreeMap::new();
    sizes.insert(
        size_id,
        Size {
            creation_date: Utc::now(),
            bounds: BoundingBox::new(0, 0, width, height),
        },
    );
    let tags = boxes
        .iter()
        .map(|b| {
            (
                Uuid::now_v7(),
                Tag {
                    name: "subject".into(),
                    origin: "reviewer".into(),
                    creation_date: Utc::now(),
                    box_information: Some(BoxInformation {
                        image_size_id: size_id,
                        bounds: *b,
                    }),
                },
            )
        })
        .collect();
    Picture {
        origin: "flickr".into(),
        name: name.into(),
        origin_id: name.into(),
        extension: "png".into(),
        creation_date: Utc::now(),
        sizes,
        tags,
    }
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = image::RgbaImage::from_fn(width, height, |x, y| {
        image::Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
    });
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(image)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("failed to encode png");
    bytes
}

pub fn png_dimensions(bytes: &[u8]) -> (u32, u32) {
    let decoded = image::load_from_memory(bytes).expect("failed to decode png");
    (decoded.width(), decoded.height())
}

pub fn multipart_upload_body(picture_json: &str, image_bytes: &[u8]) -> (String, Vec<u8>) {
    let boundary = format!("----picture-boundary-{}", Uuid::now_v7());
    let mut body = Vec::new();

    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"picture\"\r\n");
    body.extend_from_slice(b"Content-Type: application/json\r\n\r\n");
    body.extend_from_slice(picture_json.as_bytes());
    body.extend_from_slice(b"\r\n");

    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        b"Content-Disposition: form-data; name=\"file\"; filename=\"image.png\"\r\n",
    );
    body.extend_from_slice(b"Content-Type: image/png\r\n\r\n");
    body.extend_from_slice(image_bytes);
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());

    (boundary, body)
}

pub async fn send(app: &Router, req: Request<Body>) -> axum::response::Response {
    app.clone().oneshot(req).await.expect("request failed")
}

pub async fn read_json<T: DeserializeOwned>(res: axum::response::Response) -> T {
    let bytes = to_bytes(res.into_body(), usize::MAX)
        .await
        .expect("failed to read body");
    serde_json::from_slice(&bytes).expect("failed to parse json")
}

pub async fn read_text(res: axum::response::Response) -> String {
    let bytes = to_bytes(res.into_body(), usize::MAX)
        .await
        .expect("failed to read body");
    String::from_utf8(bytes.to_vec()).expect("invalid utf8")
}

pub async fn expect_status(
    res: axum::response::Response,
    expected: StatusCode,
) -> axum::response::Response {
    let actual = res.status();
    if actual == expected {
        return res;
    }

    let body = read_text(res).await;
    panic!(
        "HTTP status mismatch. Expected {}, got {}. Response body: {}",
        expected, actual, body
    );
}
