use super::{
    entity::{Picture, PictureFilter, PictureKey, Tag},
    errors::DomainError,
    stage::Stage,
};
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

/// Picture store for a single review stage.
///
/// Stores cannot see each other, so cross-store uniqueness of a key is a
/// protocol property of the lifecycle controller, not of this trait.
/// `create` never overwrites; replacing an existing record goes through
/// `update`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PictureRepository: Send + Sync {
    /// Fails with `AlreadyExists` if the key is occupied.
    async fn create(&self, picture: &Picture) -> Result<(), DomainError>;
    async fn find(&self, key: &PictureKey) -> Result<Option<Picture>, DomainError>;
    /// Replaces an existing record, `NotFound` if there is none.
    async fn update(&self, picture: &Picture) -> Result<(), DomainError>;
    /// `NotFound` if there was nothing to delete.
    async fn delete(&self, key: &PictureKey) -> Result<(), DomainError>;
    async fn list(&self, origin: &str, filter: &PictureFilter)
    -> Result<Vec<Picture>, DomainError>;
    async fn create_tag(&self, key: &PictureKey, tag_id: Uuid, tag: &Tag)
    -> Result<(), DomainError>;
    async fn update_tag(&self, key: &PictureKey, tag_id: Uuid, tag: &Tag)
    -> Result<(), DomainError>;
    async fn delete_tag(&self, key: &PictureKey, tag_id: Uuid) -> Result<(), DomainError>;
}

/// Fixed lookup from stage to the store instance that backs it.
#[derive(Clone)]
pub struct StageStores {
    pending: Arc<dyn PictureRepository>,
    validated: Arc<dyn PictureRepository>,
    published: Arc<dyn PictureRepository>,
    blocked: Arc<dyn PictureRepository>,
}

impl StageStores {
    pub fn new(
        pending: Arc<dyn PictureRepository>,
        validated: Arc<dyn PictureRepository>,
        published: Arc<dyn PictureRepository>,
        blocked: Arc<dyn PictureRepository>,
    ) -> Self {
        Self {
            pending,
            validated,
            published,
            blocked,
        }
    }

    /// Builds one store per stage with the given constructor.
    pub fn from_fn<F>(mut build: F) -> Self
    where
        F: FnMut(Stage) -> Arc<dyn PictureRepository>,
    {
        Self {
            pending: build(Stage::Pending),
            validated: build(Stage::Validated),
            published: build(Stage::Published),
            blocked: build(Stage::Blocked),
        }
    }

    pub fn store(&self, stage: Stage) -> &Arc<dyn PictureRepository> {
        match stage {
            Stage::Pending => &self.pending,
            Stage::Validated => &self.validated,
            Stage::Published => &self.published,
            Stage::Blocked => &self.blocked,
        }
    }
}
