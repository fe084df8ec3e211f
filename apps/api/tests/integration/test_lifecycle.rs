use super::helpers::{Harness, png_bytes, png_dimensions, sample_picture};
use picture_api::{
    application::lifecycle::dto::TagRequest,
    domain::picture::{
        entity::{BoundingBox, BoxInformation, PictureFilter, PictureKey},
        errors::DomainError,
        repository::PictureRepository,
        stage::Stage,
    },
    infrastructure::storage::traits::BlobStore,
};
use std::sync::atomic::Ordering;

async fn seeded(harness: &Harness, stage: Stage, name: &str) -> PictureKey {
    let picture = sample_picture(
        name,
        400,
        300,
        &[
            BoundingBox::new(10, 10, 100, 100),
            BoundingBox::new(350, 250, 50, 50),
        ],
    );
    let key = picture.key();
    harness
        .lifecycle
        .create_with_blob(stage, picture, png_bytes(400, 300))
        .await
        .expect("seed failed");
    key
}

#[tokio::test]
async fn create_with_blob_stores_record_and_raster() {
    let h = Harness::new();
    let key = seeded(&h, Stage::Pending, "100").await;

    assert!(h.pending.inner.find(&key).await.unwrap().is_some());
    assert!(h.blobs.inner.contains("flickr/100").await);
    assert_eq!(
        h.blobs.inner.content_type("flickr/100").await.as_deref(),
        Some("image/png")
    );
}

#[tokio::test]
async fn create_with_blob_removes_record_when_upload_fails() {
    let h = Harness::new();
    h.blobs.fail_puts.store(true, Ordering::SeqCst);

    let picture = sample_picture("101", 400, 300, &[]);
    let key = picture.key();
    let err = h
        .lifecycle
        .create_with_blob(Stage::Pending, picture, png_bytes(4, 4))
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::Storage(_)));
    assert!(h.pending.inner.is_empty().await);
    assert!(matches!(
        h.lifecycle.read(Stage::Pending, &key).await,
        Err(DomainError::NotFound { .. })
    ));
}

#[tokio::test]
async fn create_rejects_existing_key_without_touching_raster() {
    let h = Harness::new();
    let key = seeded(&h, Stage::Pending, "102").await;

    let again = sample_picture("102", 10, 10, &[]);
    let err = h
        .lifecycle
        .create_with_blob(Stage::Pending, again, png_bytes(10, 10))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::AlreadyExists { .. }));

    let raster = h.blobs.inner.get(&key.blob_path()).await.unwrap().unwrap();
    assert_eq!(png_dimensions(&raster), (400, 300));
}

#[tokio::test]
async fn transfer_moves_record_between_adjacent_stages() {
    let h = Harness::new();
    let key = seeded(&h, Stage::Pending, "200").await;
    let before = h.lifecycle.read(Stage::Pending, &key).await.unwrap();

    let moved = h
        .lifecycle
        .transfer(Stage::Pending, Stage::Validated, &key)
        .await
        .unwrap();

    assert_eq!(moved.key(), key);
    assert!(moved.creation_date >= before.creation_date);
    assert_eq!(moved.tags, before.tags);
    assert!(h.pending.inner.find(&key).await.unwrap().is_none());
    assert!(h.validated.inner.find(&key).await.unwrap().is_some());
    assert!(h.blobs.inner.contains(&key.blob_path()).await);
}

#[tokio::test]
async fn transfer_with_failed_source_delete_leaves_key_in_both_stores() {
    let h = Harness::new();
    let key = seeded(&h, Stage::Pending, "201").await;
    h.pending.fail_deletes.store(true, Ordering::SeqCst);

    let err = h
        .lifecycle
        .transfer(Stage::Pending, Stage::Validated, &key)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DomainError::PartialTransferFailure {
            from: Stage::Pending,
            to: Stage::Validated,
            ..
        }
    ));
    assert!(h.pending.inner.find(&key).await.unwrap().is_some());
    assert!(h.validated.inner.find(&key).await.unwrap().is_some());

    let duplicates = h
        .lifecycle
        .find_cross_stage_duplicates("flickr")
        .await
        .unwrap();
    assert_eq!(duplicates.len(), 1);
    assert_eq!(duplicates[0].key, key);
    assert_eq!(duplicates[0].stages, vec![Stage::Pending, Stage::Validated]);
}

#[tokio::test]
async fn transfer_of_missing_picture_is_not_found() {
    let h = Harness::new();
    let key = PictureKey::new("flickr", "missing").unwrap();
    let err = h
        .lifecycle
        .transfer(Stage::Validated, Stage::Published, &key)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DomainError::NotFound {
            stage: Stage::Validated,
            ..
        }
    ));
}

#[tokio::test]
async fn block_drops_raster_and_moves_record() {
    let h = Harness::new();
    let key = seeded(&h, Stage::Published, "300").await;

    h.lifecycle.block(Stage::Published, &key).await.unwrap();

    assert!(!h.blobs.inner.contains(&key.blob_path()).await);
    assert!(h.published.inner.find(&key).await.unwrap().is_none());
    assert!(h.blocked.inner.find(&key).await.unwrap().is_some());
}

#[tokio::test]
async fn block_from_blocked_is_rejected() {
    let h = Harness::new();
    let key = PictureKey::new("flickr", "301").unwrap();
    let err = h.lifecycle.block(Stage::Blocked, &key).await.unwrap_err();
    assert!(matches!(err, DomainError::InvalidTransition { .. }));
}

#[tokio::test]
async fn block_with_failed_source_delete_is_partial() {
    let h = Harness::new();
    let key = seeded(&h, Stage::Validated, "302").await;
    h.validated.fail_deletes.store(true, Ordering::SeqCst);

    let err = h.lifecycle.block(Stage::Validated, &key).await.unwrap_err();

    assert!(matches!(
        err,
        DomainError::PartialTransferFailure {
            to: Stage::Blocked,
            ..
        }
    ));
    assert!(!h.blobs.inner.contains(&key.blob_path()).await);
    assert!(h.blocked.inner.find(&key).await.unwrap().is_some());
}

#[tokio::test]
async fn block_can_be_retried_after_partial_failure() {
    let h = Harness::new();
    let key = seeded(&h, Stage::Validated, "303").await;
    h.validated.fail_deletes.store(true, Ordering::SeqCst);
    assert!(h.lifecycle.block(Stage::Validated, &key).await.is_err());

    h.validated.fail_deletes.store(false, Ordering::SeqCst);
    h.lifecycle.block(Stage::Validated, &key).await.unwrap();

    assert!(h.validated.inner.find(&key).await.unwrap().is_none());
    assert!(h.blocked.inner.find(&key).await.unwrap().is_some());
    assert_eq!(h.blocked.inner.len().await, 1);
}

#[tokio::test]
async fn readmitted_picture_can_be_blocked_again() {
    let h = Harness::new();
    let key = seeded(&h, Stage::Pending, "304").await;
    h.lifecycle.block(Stage::Pending, &key).await.unwrap();

    let again = seeded(&h, Stage::Pending, "304").await;
    assert_eq!(again, key);
    assert!(h.blobs.inner.contains(&key.blob_path()).await);

    h.lifecycle.block(Stage::Pending, &key).await.unwrap();

    assert_eq!(h.pending.inner.len().await, 0);
    assert!(h.blocked.inner.find(&key).await.unwrap().is_some());
    assert!(!h.blobs.inner.contains(&key.blob_path()).await);
}

#[tokio::test]
async fn delete_with_blob_removes_both() {
    let h = Harness::new();
    let key = seeded(&h, Stage::Pending, "400").await;

    h.lifecycle
        .delete_with_blob(Stage::Pending, &key)
        .await
        .unwrap();

    assert!(h.pending.inner.is_empty().await);
    assert!(!h.blobs.inner.contains(&key.blob_path()).await);
}

#[tokio::test]
async fn delete_with_blob_reports_orphan_when_raster_survives() {
    let h = Harness::new();
    let key = seeded(&h, Stage::Pending, "401").await;
    h.blobs.fail_deletes.store(true, Ordering::SeqCst);

    let err = h
        .lifecycle
        .delete_with_blob(Stage::Pending, &key)
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::OrphanBlob { .. }));
    assert!(h.pending.inner.is_empty().await);
    assert!(h.blobs.inner.contains(&key.blob_path()).await);
}

#[tokio::test]
async fn delete_many_stops_at_first_missing_key() {
    let h = Harness::new();
    let first = seeded(&h, Stage::Pending, "402").await;
    let missing = PictureKey::new("flickr", "nope").unwrap();
    let last = seeded(&h, Stage::Pending, "403").await;

    let err = h
        .lifecycle
        .delete_many_with_blob(Stage::Pending, &[first.clone(), missing, last.clone()])
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::NotFound { .. }));
    assert!(h.pending.inner.find(&first).await.unwrap().is_none());
    assert!(h.pending.inner.find(&last).await.unwrap().is_some());

    let removed = h
        .lifecycle
        .delete_many_with_blob(Stage::Pending, &[last])
        .await
        .unwrap();
    assert_eq!(removed, 1);
}

#[tokio::test]
async fn duplicate_copies_record_and_raster_under_new_name() {
    let h = Harness::new();
    let key = seeded(&h, Stage::Validated, "500").await;

    let copy = h.lifecycle.duplicate(Stage::Validated, &key).await.unwrap();

    assert_ne!(copy.name, key.name);
    assert!(copy.name.starts_with("500_"));
    assert_eq!(copy.origin, key.origin);
    let copy_key = copy.key();
    assert!(h.validated.inner.find(&copy_key).await.unwrap().is_some());
    assert!(h.validated.inner.find(&key).await.unwrap().is_some());

    let original = h.blobs.inner.get(&key.blob_path()).await.unwrap().unwrap();
    let copied = h
        .blobs
        .inner
        .get(&copy_key.blob_path())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(original, copied);
}

#[tokio::test]
async fn origin_id_must_be_usable_in_a_duplicate_name() {
    let h = Harness::new();

    let mut spaced = sample_picture("502", 200, 200, &[]);
    spaced.origin_id = "user 42".into();
    let err = h.lifecycle.create(Stage::Pending, spaced).await.unwrap_err();
    assert!(matches!(err, DomainError::ValidationError(_)));
    assert_eq!(h.pending.inner.len().await, 0);

    let mut long = sample_picture("503", 200, 200, &[]);
    long.origin_id = "7".repeat(108);
    let key = long.key();
    h.lifecycle
        .create_with_blob(Stage::Pending, long, png_bytes(200, 200))
        .await
        .unwrap();

    let copy = h.lifecycle.duplicate(Stage::Pending, &key).await.unwrap();
    assert_eq!(copy.name.len(), 128);
    assert!(h.blobs.inner.contains(&copy.key().blob_path()).await);
}

#[tokio::test]
async fn duplicate_removes_copied_raster_when_record_write_fails() {
    let h = Harness::new();
    let key = seeded(&h, Stage::Pending, "501").await;
    h.pending.fail_creates.store(true, Ordering::SeqCst);

    let err = h.lifecycle.duplicate(Stage::Pending, &key).await.unwrap_err();
    assert!(matches!(err, DomainError::InfrastructureError(_)));
    assert_eq!(h.pending.inner.len().await, 1);
    assert!(h.blobs.inner.contains(&key.blob_path()).await);

    let listed = h
        .lifecycle
        .list(Stage::Pending, "flickr", &PictureFilter::default())
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn crop_rewrites_raster_and_reanchors_tags() {
    let h = Harness::new();
    let key = seeded(&h, Stage::Pending, "600").await;
    let before = h.lifecycle.read(Stage::Pending, &key).await.unwrap();
    let crop = BoundingBox::new(50, 0, 200, 200);

    let updated = h
        .lifecycle
        .apply_crop(Stage::Pending, &key, crop)
        .await
        .unwrap();

    assert_eq!(updated.key(), key);
    assert_eq!(updated.sizes.len(), before.sizes.len() + 1);
    for (id, size) in &before.sizes {
        assert_eq!(updated.sizes.get(id), Some(size));
    }
    let (new_size_id, newest) = updated.current_size().unwrap();
    assert_eq!(newest.bounds, crop);

    assert_eq!(updated.tags.len(), 1);
    let info = updated
        .tags
        .values()
        .next()
        .and_then(|t| t.box_information.as_ref())
        .unwrap();
    assert_eq!(info.image_size_id, *new_size_id);
    assert_eq!(info.bounds, BoundingBox::new(0, 10, 60, 100));

    let raster = h.blobs.inner.get(&key.blob_path()).await.unwrap().unwrap();
    assert_eq!(png_dimensions(&raster), (200, 200));

    let stored = h.lifecycle.read(Stage::Pending, &key).await.unwrap();
    assert_eq!(stored, updated);
}

#[tokio::test]
async fn crop_outside_raster_is_uncroppable_and_changes_nothing() {
    let h = Harness::new();
    let key = seeded(&h, Stage::Pending, "601").await;
    let before = h.lifecycle.read(Stage::Pending, &key).await.unwrap();

    let err = h
        .lifecycle
        .apply_crop(Stage::Pending, &key, BoundingBox::new(1000, 1000, 10, 10))
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::UncroppableRegion { .. }));
    assert_eq!(h.lifecycle.read(Stage::Pending, &key).await.unwrap(), before);
}

#[tokio::test]
async fn crop_without_raster_reports_missing_blob() {
    let h = Harness::new();
    let picture = sample_picture("602", 400, 300, &[]);
    let key = picture.key();
    h.lifecycle.create(Stage::Pending, picture).await.unwrap();

    let err = h
        .lifecycle
        .apply_crop(Stage::Pending, &key, BoundingBox::new(0, 0, 10, 10))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::BlobNotFound { ref path } if path == "flickr/602"));
}

#[tokio::test]
async fn tags_can_be_created_updated_and_deleted() {
    let h = Harness::new();
    let key = seeded(&h, Stage::Pending, "700").await;
    let picture = h.lifecycle.read(Stage::Pending, &key).await.unwrap();
    let (size_id, _) = picture.current_size().unwrap();

    let tag_id = h
        .lifecycle
        .create_tag(
            Stage::Pending,
            &key,
            TagRequest {
                name: "lighthouse".into(),
                origin: "reviewer".into(),
                box_information: Some(BoxInformation {
                    image_size_id: *size_id,
                    bounds: BoundingBox::new(100, 100, 80, 80),
                }),
            },
        )
        .await
        .unwrap();
    let created = h.lifecycle.read(Stage::Pending, &key).await.unwrap().tags[&tag_id]
        .creation_date;

    h.lifecycle
        .update_tag(
            Stage::Pending,
            &key,
            tag_id,
            TagRequest {
                name: "harbour light".into(),
                origin: "reviewer".into(),
                box_information: None,
            },
        )
        .await
        .unwrap();
    let stored = h.lifecycle.read(Stage::Pending, &key).await.unwrap();
    assert_eq!(stored.tags[&tag_id].name, "harbour light");
    assert!(stored.tags[&tag_id].box_information.is_none());
    assert_eq!(stored.tags[&tag_id].creation_date, created);

    h.lifecycle
        .delete_tag(Stage::Pending, &key, tag_id)
        .await
        .unwrap();
    let err = h
        .lifecycle
        .delete_tag(Stage::Pending, &key, tag_id)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::TagNotFound { .. }));
}

#[tokio::test]
async fn tag_bound_to_unknown_size_is_rejected() {
    let h = Harness::new();
    let key = seeded(&h, Stage::Pending, "701").await;

    let err = h
        .lifecycle
        .create_tag(
            Stage::Pending,
            &key,
            TagRequest {
                name: "ghost".into(),
                origin: "reviewer".into(),
                box_information: Some(BoxInformation {
                    image_size_id: uuid::Uuid::now_v7(),
                    bounds: BoundingBox::new(0, 0, 60, 60),
                }),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::ValidationError(_)));
}

#[tokio::test]
async fn list_filters_by_origin_id_and_pages() {
    let h = Harness::new();
    for name in ["800", "801", "802"] {
        seeded(&h, Stage::Published, name).await;
    }

    let all = h
        .lifecycle
        .list(Stage::Published, "flickr", &PictureFilter::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 3);

    let one = h
        .lifecycle
        .list(
            Stage::Published,
            "flickr",
            &PictureFilter {
                origin_id: Some("801".into()),
                ..PictureFilter::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(one.len(), 1);
    assert_eq!(one[0].name, "801");

    let other_origin = h
        .lifecycle
        .list(Stage::Published, "unsplash", &PictureFilter::default())
        .await
        .unwrap();
    assert!(other_origin.is_empty());
}
