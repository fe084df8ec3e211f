//! Spatial recompute engine.
//!
//! Pure functions that, given a crop rectangle expressed in the coordinate
//! space of a picture's current raster, produce the cropped raster and an
//! annotation set consistent with it. No I/O happens here.
//!
//! A crop only ever shrinks or removes a tag box. Boxes are clipped one axis
//! at a time (x, then y) and dropped as soon as an axis falls below
//! [`MIN_VIABLE_EXTENT`].

use super::{
    codec::Codec,
    entity::{BoundingBox, MIN_VIABLE_EXTENT, Picture, Size},
    errors::DomainError,
    value_objects::ContainerKind,
};
use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

/// One axis of a re-anchored box, in the cropped coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisSpan {
    pub origin: u32,
    pub extent: u32,
}

/// Clips the span `[tag_origin, tag_origin + tag_extent)` against the crop
/// span on one axis.
///
/// Returns `None` when the tag is disjoint from the crop on this axis or the
/// clipped extent is below [`MIN_VIABLE_EXTENT`].
pub fn recompute_axis(
    tag_origin: u32,
    tag_extent: u32,
    crop_origin: u32,
    crop_extent: u32,
) -> Option<AxisSpan> {
    let t = u64::from(tag_origin);
    let tag_end = t + u64::from(tag_extent);
    let c = u64::from(crop_origin);
    let crop_end = c + u64::from(crop_extent);

    if t > crop_end {
        return None;
    }

    let (origin, extent) = if t < c {
        if tag_end < c {
            (0, 0)
        } else {
            // Clamped to the far edge too, so a tag spanning the whole crop
            // never grows past it.
            (0, tag_end.min(crop_end) - c)
        }
    } else if tag_end > crop_end {
        (t - c, crop_end - t)
    } else {
        (t - c, u64::from(tag_extent))
    };

    if extent < u64::from(MIN_VIABLE_EXTENT) {
        return None;
    }

    // origin <= tag_origin and extent <= tag_extent, both already u32.
    Some(AxisSpan {
        origin: origin as u32,
        extent: extent as u32,
    })
}

/// Re-anchors a tag box into the coordinate space of `crop`.
pub fn reanchor_box(tag_box: &BoundingBox, crop: &BoundingBox) -> Option<BoundingBox> {
    let x = recompute_axis(tag_box.left, tag_box.width, crop.left, crop.width)?;
    let y = recompute_axis(tag_box.top, tag_box.height, crop.top, crop.height)?;
    Some(BoundingBox::new(x.origin, y.origin, x.extent, y.extent))
}

/// Appends the crop to the size history and rewrites every spatial tag.
///
/// Surviving tags point at `new_size_id`; tags that end up disjoint or below
/// the viability threshold are removed. Image-level tags pass through.
pub fn recompute_annotations(
    crop: &BoundingBox,
    mut picture: Picture,
    new_size_id: Uuid,
    now: DateTime<Utc>,
) -> Picture {
    picture.sizes.insert(
        new_size_id,
        Size {
            creation_date: now,
            bounds: *crop,
        },
    );

    picture.tags.retain(|tag_id, tag| {
        let Some(info) = tag.box_information.as_mut() else {
            return true;
        };
        match reanchor_box(&info.bounds, crop) {
            Some(bounds) => {
                info.image_size_id = new_size_id;
                info.bounds = bounds;
                true
            }
            None => {
                debug!(%tag_id, tag_box = %info.bounds, %crop, "dropping tag outside crop");
                false
            }
        }
    });

    picture
}

/// Crops an encoded raster and re-encodes it in the container implied by
/// `extension`.
///
/// The crop is intersected with the raster's true bounds first, since the
/// stored metadata and the blob may have drifted apart.
pub fn recompute_raster(
    crop: &BoundingBox,
    raster: &[u8],
    extension: &str,
    codec: &dyn Codec,
) -> Result<Vec<u8>, DomainError> {
    let kind = ContainerKind::from_extension(extension)?;
    let grid = codec.decode(raster)?;
    let bounds = BoundingBox::new(0, 0, grid.width(), grid.height());

    let region = crop
        .intersect(&bounds)
        .ok_or(DomainError::UncroppableRegion {
            crop: *crop,
            width: bounds.width,
            height: bounds.height,
        })?;

    debug!(%crop, %region, "cropping raster");
    let cropped = codec.subregion(&grid, region);
    codec.encode(&cropped, kind)
}
