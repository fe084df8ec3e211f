use crate::{
    application::lifecycle::dto::{StageDuplicate, TagRequest},
    domain::picture::{
        codec::Codec,
        entity::{BoundingBox, Picture, PictureFilter, PictureKey},
        errors::DomainError,
        recompute::{recompute_annotations, recompute_raster},
        repository::StageStores,
        stage::Stage,
    },
    domain::shared::pagination::{MAX_PAGE_LIMIT, PaginationRequest},
    infrastructure::storage::traits::BlobStore,
};
use chrono::{DateTime, Utc};
use std::{collections::BTreeMap, sync::Arc};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Orchestrates every picture state change across the stage stores and the
/// blob store.
///
/// # Consistency model
/// The stores share no transaction. Every multi-store operation is a fixed
/// sequence of single-store steps; a failing step is reported immediately
/// and nothing already committed is rolled back, except where noted. Callers
/// are expected to serialize operations on the same key.
///
/// # Ordering guarantees
/// - `transfer`: read source, write destination, delete source
/// - `block`: delete raster, write or replace blocked record, delete source record
/// - `delete_with_blob`: delete record, delete raster
/// - `apply_crop`: overwrite raster, then replace the record
pub struct PictureLifecycle {
    stores: StageStores,
    blobs: Arc<dyn BlobStore>,
    codec: Arc<dyn Codec>,
}

impl PictureLifecycle {
    pub fn new(stores: StageStores, blobs: Arc<dyn BlobStore>, codec: Arc<dyn Codec>) -> Self {
        info!("Initializing PictureLifecycle");
        Self {
            stores,
            blobs,
            codec,
        }
    }

    async fn fetch(&self, stage: Stage, key: &PictureKey) -> Result<Picture, DomainError> {
        self.stores
            .store(stage)
            .find(key)
            .await?
            .ok_or_else(|| DomainError::NotFound {
                stage,
                key: key.clone(),
            })
    }

    /// Writes a fully populated picture into `stage`.
    #[instrument(skip(self, picture), fields(stage = %stage, key = %picture.key()))]
    pub async fn create(&self, stage: Stage, picture: Picture) -> Result<Picture, DomainError> {
        picture.validate()?;
        self.stores.store(stage).create(&picture).await?;
        info!("Picture created");
        Ok(picture)
    }

    /// Creates the record and stores its raster.
    ///
    /// The record goes first so a key collision never overwrites another
    /// picture's raster. If the raster write fails the fresh record is
    /// removed again.
    #[instrument(skip(self, picture, raster), fields(stage = %stage, key = %picture.key(), size = raster.len()))]
    pub async fn create_with_blob(
        &self,
        stage: Stage,
        picture: Picture,
        raster: Vec<u8>,
    ) -> Result<Picture, DomainError> {
        let kind = picture.container_kind()?;
        let created = self.create(stage, picture).await?;
        let key = created.key();

        if let Err(e) = self
            .blobs
            .put(&key.blob_path(), raster, kind.content_type())
            .await
        {
            error!("Raster upload failed for {}: {}", key, e);
            if let Err(cleanup) = self.stores.store(stage).delete(&key).await {
                error!("Could not remove record {} after failed upload: {}", key, cleanup);
            }
            return Err(DomainError::Storage(format!("Failed to store raster: {}", e)));
        }

        Ok(created)
    }

    pub async fn read(&self, stage: Stage, key: &PictureKey) -> Result<Picture, DomainError> {
        self.fetch(stage, key).await
    }

    pub async fn list(
        &self,
        stage: Stage,
        origin: &str,
        filter: &PictureFilter,
    ) -> Result<Vec<Picture>, DomainError> {
        self.stores.store(stage).list(origin, filter).await
    }

    #[instrument(skip(self), fields(stage = %stage, key = %key))]
    pub async fn delete(&self, stage: Stage, key: &PictureKey) -> Result<(), DomainError> {
        self.stores.store(stage).delete(key).await?;
        info!("Picture deleted");
        Ok(())
    }

    /// Deletes the record, then its raster.
    ///
    /// A raster that cannot be removed after the record is gone is reported
    /// as `OrphanBlob`; the record is not restored.
    #[instrument(skip(self), fields(stage = %stage, key = %key))]
    pub async fn delete_with_blob(&self, stage: Stage, key: &PictureKey) -> Result<(), DomainError> {
        self.stores.store(stage).delete(key).await?;

        let path = key.blob_path();
        if let Err(e) = self.blobs.delete(&path).await {
            warn!("Record {} deleted but raster {} remains: {}", key, path, e);
            return Err(DomainError::OrphanBlob {
                key: key.clone(),
                path,
                reason: e.to_string(),
            });
        }

        info!("Picture and raster deleted");
        Ok(())
    }

    /// Batch form of [`Self::delete_with_blob`], stopping at the first failure.
    ///
    /// Returns how many pictures were fully removed.
    pub async fn delete_many_with_blob(
        &self,
        stage: Stage,
        keys: &[PictureKey],
    ) -> Result<usize, DomainError> {
        for (done, key) in keys.iter().enumerate() {
            if let Err(e) = self.delete_with_blob(stage, key).await {
                warn!("Batch delete stopped after {} of {} pictures", done, keys.len());
                return Err(e);
            }
        }
        Ok(keys.len())
    }

    /// Moves a picture between neighbouring review stages.
    ///
    /// Not atomic: if the source delete fails after the destination write,
    /// the key is left in both stores and `PartialTransferFailure` is
    /// returned. That state is never corrected here.
    #[instrument(skip(self), fields(from = %from, to = %to, key = %key))]
    pub async fn transfer(
        &self,
        from: Stage,
        to: Stage,
        key: &PictureKey,
    ) -> Result<Picture, DomainError> {
        if !from.can_transfer_to(to) {
            return Err(DomainError::InvalidTransition { from, to });
        }

        let mut picture = self.fetch(from, key).await?;
        picture.creation_date = Utc::now();
        self.stores.store(to).create(&picture).await?;

        if let Err(e) = self.stores.store(from).delete(key).await {
            error!("Picture {} now present in both {} and {}: {}", key, from, to, e);
            return Err(DomainError::PartialTransferFailure {
                from,
                to,
                key: key.clone(),
                source: Box::new(e),
            });
        }

        info!("Picture transferred");
        Ok(picture)
    }

    /// Copies a picture and its raster under a freshly derived name in the
    /// same stage.
    #[instrument(skip(self), fields(stage = %stage, key = %key))]
    pub async fn duplicate(&self, stage: Stage, key: &PictureKey) -> Result<Picture, DomainError> {
        let store = self.stores.store(stage);
        let source = self.fetch(stage, key).await?;

        let now = Utc::now();
        let mut copy = source.clone();
        copy.name = duplicate_name(&source.origin_id, now);
        copy.creation_date = now;
        let copy_key = PictureKey::new(copy.origin.clone(), copy.name.clone())?;

        if copy_key == *key || store.find(&copy_key).await?.is_some() {
            return Err(DomainError::AlreadyExists {
                stage,
                key: copy_key,
            });
        }

        self.blobs
            .copy(&key.blob_path(), &copy_key.blob_path())
            .await
            .map_err(|e| {
                error!("Raster copy {} -> {} failed: {}", key, copy_key, e);
                DomainError::Storage(format!("Failed to copy raster: {}", e))
            })?;

        if let Err(e) = store.create(&copy).await {
            if let Err(cleanup) = self.blobs.delete(&copy_key.blob_path()).await {
                warn!("Copied raster {} left behind: {}", copy_key, cleanup);
            }
            return Err(e);
        }

        info!(duplicate = %copy_key, "Picture duplicated");
        Ok(copy)
    }

    /// Moves a picture from a review stage into the terminal blocked stage.
    ///
    /// The raster goes first so a half-failed block never leaves a reachable
    /// raster behind a record that claims to be blocked.
    ///
    /// Safe to retry. A blocked record already holding the key, left by an
    /// earlier partial block or by a re-admitted picture, is replaced.
    #[instrument(skip(self), fields(stage = %stage, key = %key))]
    pub async fn block(&self, stage: Stage, key: &PictureKey) -> Result<Picture, DomainError> {
        if !stage.is_review_stage() {
            return Err(DomainError::InvalidTransition {
                from: stage,
                to: Stage::Blocked,
            });
        }

        let mut picture = self.fetch(stage, key).await?;
        let blocked = self.stores.store(Stage::Blocked);
        let already_blocked = blocked.find(key).await?.is_some();

        self.blobs.delete(&key.blob_path()).await.map_err(|e| {
            error!("Raster delete failed while blocking {}: {}", key, e);
            DomainError::Storage(format!("Failed to delete raster: {}", e))
        })?;

        picture.creation_date = Utc::now();
        if already_blocked {
            debug!("Replacing existing blocked record");
            blocked.update(&picture).await?;
        } else {
            blocked.create(&picture).await?;
        }

        if let Err(e) = self.stores.store(stage).delete(key).await {
            error!("Picture {} now present in both {} and blocked: {}", key, stage, e);
            return Err(DomainError::PartialTransferFailure {
                from: stage,
                to: Stage::Blocked,
                key: key.clone(),
                source: Box::new(e),
            });
        }

        info!("Picture blocked");
        Ok(picture)
    }

    /// Crops the stored raster in place and re-anchors the picture's tags.
    ///
    /// The crop box is in the coordinate space of the current raster. The
    /// previous raster bytes are overwritten; only its size entry survives.
    #[instrument(skip(self), fields(stage = %stage, key = %key, crop = %crop))]
    pub async fn apply_crop(
        &self,
        stage: Stage,
        key: &PictureKey,
        crop: BoundingBox,
    ) -> Result<Picture, DomainError> {
        let picture = self.fetch(stage, key).await?;
        let kind = picture.container_kind()?;
        let path = key.blob_path();

        let raster = self
            .blobs
            .get(&path)
            .await
            .map_err(|e| DomainError::Storage(format!("Failed to read raster: {}", e)))?
            .ok_or_else(|| DomainError::BlobNotFound { path: path.clone() })?;

        let codec = Arc::clone(&self.codec);
        let extension = picture.extension.clone();
        let cropped = tokio::task::spawn_blocking(move || {
            recompute_raster(&crop, &raster, &extension, codec.as_ref())
        })
        .await
        .map_err(|e| DomainError::InfrastructureError(format!("Crop task failed: {}", e)))??;

        let tags_before = picture.tags.len();
        let updated = recompute_annotations(&crop, picture, Uuid::now_v7(), Utc::now());
        debug!(
            "Crop kept {} of {} tags",
            updated.tags.len(),
            tags_before
        );

        self.blobs
            .put(&path, cropped, kind.content_type())
            .await
            .map_err(|e| {
                error!("Cropped raster upload failed for {}: {}", key, e);
                DomainError::Storage(format!("Failed to store cropped raster: {}", e))
            })?;
        self.stores.store(stage).update(&updated).await?;

        info!("Crop applied");
        Ok(updated)
    }

    /// Adds a tag and returns its id.
    #[instrument(skip(self, request), fields(stage = %stage, key = %key))]
    pub async fn create_tag(
        &self,
        stage: Stage,
        key: &PictureKey,
        request: TagRequest,
    ) -> Result<Uuid, DomainError> {
        let picture = self.fetch(stage, key).await?;
        let tag = request.into_tag(Utc::now());
        picture.validate_tag(&tag)?;

        let tag_id = Uuid::now_v7();
        self.stores.store(stage).create_tag(key, tag_id, &tag).await?;
        info!(%tag_id, "Tag created");
        Ok(tag_id)
    }

    #[instrument(skip(self, request), fields(stage = %stage, key = %key))]
    pub async fn update_tag(
        &self,
        stage: Stage,
        key: &PictureKey,
        tag_id: Uuid,
        request: TagRequest,
    ) -> Result<(), DomainError> {
        let picture = self.fetch(stage, key).await?;
        // Edits keep the date the tag was first created.
        let created = picture
            .tags
            .get(&tag_id)
            .map(|t| t.creation_date)
            .ok_or_else(|| DomainError::TagNotFound {
                key: key.clone(),
                tag_id,
            })?;
        let tag = request.into_tag(created);
        picture.validate_tag(&tag)?;

        self.stores.store(stage).update_tag(key, tag_id, &tag).await
    }

    #[instrument(skip(self), fields(stage = %stage, key = %key))]
    pub async fn delete_tag(
        &self,
        stage: Stage,
        key: &PictureKey,
        tag_id: Uuid,
    ) -> Result<(), DomainError> {
        self.stores.store(stage).delete_tag(key, tag_id).await
    }

    /// Lists every key of `origin` that exists in more than one stage store.
    #[instrument(skip(self))]
    pub async fn find_cross_stage_duplicates(
        &self,
        origin: &str,
    ) -> Result<Vec<StageDuplicate>, DomainError> {
        let mut seen: BTreeMap<PictureKey, Vec<Stage>> = BTreeMap::new();

        for stage in Stage::ALL {
            let mut offset = 0;
            loop {
                let filter = PictureFilter {
                    origin_id: None,
                    pagination: PaginationRequest {
                        limit: MAX_PAGE_LIMIT,
                        offset,
                    },
                };
                let page = self.stores.store(stage).list(origin, &filter).await?;
                let fetched = page.len() as i64;
                for picture in page {
                    seen.entry(picture.key()).or_default().push(stage);
                }
                if fetched < MAX_PAGE_LIMIT {
                    break;
                }
                offset += fetched;
            }
        }

        Ok(seen
            .into_iter()
            .filter(|(_, stages)| stages.len() > 1)
            .map(|(key, stages)| StageDuplicate { key, stages })
            .collect())
    }
}

/// Name for a duplicated picture: the source id plus a millisecond UTC
/// timestamp, path safe and unique under a monotonic clock.
pub fn duplicate_name(origin_id: &str, now: DateTime<Utc>) -> String {
    format!("{}_{}", origin_id, now.format("%Y%m%dT%H%M%S%3fZ"))
}
