use crate::domain::picture::{
    entity::{Picture, PictureFilter, PictureKey, Tag},
    errors::DomainError,
    repository::PictureRepository,
    stage::Stage,
};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Process-local picture store for one stage.
///
/// Used when `PERSISTENCE_BACKEND=memory` and by the test suites. Semantics
/// match the PostgreSQL store: `create` never overwrites, `update` and
/// `delete` require an existing record.
pub struct InMemoryPictureRepository {
    stage: Stage,
    pictures: RwLock<HashMap<PictureKey, Picture>>,
}

impl InMemoryPictureRepository {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            pictures: RwLock::new(HashMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.pictures.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.pictures.read().await.is_empty()
    }

    fn not_found(&self, key: &PictureKey) -> DomainError {
        DomainError::NotFound {
            stage: self.stage,
            key: key.clone(),
        }
    }
}

#[async_trait]
impl PictureRepository for InMemoryPictureRepository {
    async fn create(&self, picture: &Picture) -> Result<(), DomainError> {
        let key = picture.key();
        let mut pictures = self.pictures.write().await;
        if pictures.contains_key(&key) {
            return Err(DomainError::AlreadyExists {
                stage: self.stage,
                key,
            });
        }
        pictures.insert(key, picture.clone());
        Ok(())
    }

    async fn find(&self, key: &PictureKey) -> Result<Option<Picture>, DomainError> {
        Ok(self.pictures.read().await.get(key).cloned())
    }

    async fn update(&self, picture: &Picture) -> Result<(), DomainError> {
        let key = picture.key();
        let mut pictures = self.pictures.write().await;
        match pictures.get_mut(&key) {
            Some(existing) => {
                *existing = picture.clone();
                Ok(())
            }
            None => Err(self.not_found(&key)),
        }
    }

    async fn delete(&self, key: &PictureKey) -> Result<(), DomainError> {
        self.pictures
            .write()
            .await
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| self.not_found(key))
    }

    async fn list(
        &self,
        origin: &str,
        filter: &PictureFilter,
    ) -> Result<Vec<Picture>, DomainError> {
        let page = filter.pagination.clamped();
        let pictures = self.pictures.read().await;
        let mut matching: Vec<Picture> = pictures
            .values()
            .filter(|p| p.origin == origin)
            .filter(|p| {
                filter
                    .origin_id
                    .as_deref()
                    .is_none_or(|id| p.origin_id == id)
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            b.creation_date
                .cmp(&a.creation_date)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(matching
            .into_iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .collect())
    }

    async fn create_tag(
        &self,
        key: &PictureKey,
        tag_id: Uuid,
        tag: &Tag,
    ) -> Result<(), DomainError> {
        let mut pictures = self.pictures.write().await;
        let picture = pictures.get_mut(key).ok_or_else(|| self.not_found(key))?;
        picture.tags.insert(tag_id, tag.clone());
        Ok(())
    }

    async fn update_tag(
        &self,
        key: &PictureKey,
        tag_id: Uuid,
        tag: &Tag,
    ) -> Result<(), DomainError> {
        let mut pictures = self.pictures.write().await;
        let picture = pictures.get_mut(key).ok_or_else(|| self.not_found(key))?;
        let existing = picture
            .tags
            .get_mut(&tag_id)
            .ok_or_else(|| DomainError::TagNotFound {
                key: key.clone(),
                tag_id,
            })?;
        *existing = tag.clone();
        Ok(())
    }

    async fn delete_tag(&self, key: &PictureKey, tag_id: Uuid) -> Result<(), DomainError> {
        let mut pictures = self.pictures.write().await;
        let picture = pictures.get_mut(key).ok_or_else(|| self.not_found(key))?;
        picture
            .tags
            .remove(&tag_id)
            .map(|_| ())
            .ok_or_else(|| DomainError::TagNotFound {
                key: key.clone(),
                tag_id,
            })
    }
}
