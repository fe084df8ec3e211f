use super::{
    errors::DomainError,
    value_objects::{ContainerKind, KeySegment},
};
use crate::domain::shared::pagination::PaginationRequest;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};
use ts_rs::TS;
use uuid::Uuid;

/// Boxes narrower or shorter than this are not viable spatial bindings.
pub const MIN_VIABLE_EXTENT: u32 = 50;

/// Longest accepted `origin_id`. Duplicate names append a 20 character
/// timestamp suffix and must still fit a key segment.
pub const MAX_ORIGIN_ID_LEN: usize = 108;

/// Core domain entity representing one scraped and reviewed photograph.
///
/// A picture is fetched fresh for every operation and written back wholesale;
/// it is never shared mutable state between callers.
///
/// # Invariants
/// - (`origin`, `name`) is the identity key in every stage and never changes
/// - `sizes` is append-only; the most recently created entry describes the
///   raster currently stored under the picture's blob path
/// - a tag's `box_information.image_size_id` references an entry of `sizes`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Picture {
    /// Ingestion source / partition the picture came from
    pub origin: String,

    /// Unique within `origin`
    pub name: String,

    /// Native identifier in the source system, used to derive duplicate names
    #[serde(rename = "originID")]
    pub origin_id: String,

    /// Raster container kind (`jpg`, `jpeg`, `png`, `webp`)
    pub extension: String,

    /// Refreshed on every physical write of the record, transfers included
    pub creation_date: DateTime<Utc>,

    /// Raster size history keyed by size id
    #[serde(default)]
    pub sizes: BTreeMap<Uuid, Size>,

    /// Annotations keyed by tag id
    #[serde(default)]
    pub tags: BTreeMap<Uuid, Tag>,
}

/// One entry of a picture's raster size history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Size {
    pub creation_date: DateTime<Utc>,

    /// Crop box that produced this raster, in the coordinate space of the
    /// raster before it (the full extent for an ingested raster).
    #[serde(rename = "box")]
    pub bounds: BoundingBox,
}

/// An annotation attached to a picture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Tag {
    /// Label text
    pub name: String,

    /// Who produced the tag (a reviewer, an automated tagger)
    pub origin: String,

    pub creation_date: DateTime<Utc>,

    /// Absent for image-level tags with no spatial binding
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub box_information: Option<BoxInformation>,
}

/// Spatial binding of a tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BoxInformation {
    /// Size entry whose coordinate space `bounds` is expressed in
    #[serde(rename = "imageSizeID")]
    pub image_size_id: Uuid,

    #[serde(rename = "box")]
    pub bounds: BoundingBox,
}

/// Axis-aligned pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BoundingBox {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(left: u32, top: u32, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn is_viable(&self) -> bool {
        self.width >= MIN_VIABLE_EXTENT && self.height >= MIN_VIABLE_EXTENT
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Overlap of two rectangles, `None` when it has no area.
    pub fn intersect(&self, other: &BoundingBox) -> Option<BoundingBox> {
        let left = self.left.max(other.left);
        let top = self.top.max(other.top);
        let right = (u64::from(self.left) + u64::from(self.width))
            .min(u64::from(other.left) + u64::from(other.width));
        let bottom = (u64::from(self.top) + u64::from(self.height))
            .min(u64::from(other.top) + u64::from(other.height));

        if right <= u64::from(left) || bottom <= u64::from(top) {
            return None;
        }

        // Both extents are bounded by the inputs' own u32 extents.
        Some(BoundingBox {
            left,
            top,
            width: (right - u64::from(left)) as u32,
            height: (bottom - u64::from(top)) as u32,
        })
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{},{} {}x{}]",
            self.left, self.top, self.width, self.height
        )
    }
}

/// Identity of a picture across every stage store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PictureKey {
    pub origin: String,
    pub name: String,
}

impl PictureKey {
    /// Builds a key after checking both segments are path safe.
    pub fn new(origin: impl Into<String>, name: impl Into<String>) -> Result<Self, DomainError> {
        let origin = KeySegment::new(origin.into())?.value;
        let name = KeySegment::new(name.into())?.value;
        Ok(Self { origin, name })
    }

    /// Logical blob path of the picture's current raster.
    pub fn blob_path(&self) -> String {
        format!("{}/{}", self.origin, self.name)
    }
}

impl fmt::Display for PictureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.origin, self.name)
    }
}

impl Picture {
    pub fn key(&self) -> PictureKey {
        PictureKey {
            origin: self.origin.clone(),
            name: self.name.clone(),
        }
    }

    pub fn container_kind(&self) -> Result<ContainerKind, DomainError> {
        ContainerKind::from_extension(&self.extension)
    }

    /// Most recently created size entry, i.e. the raster currently stored.
    ///
    /// Ties on `creation_date` fall back to the id, which is time ordered.
    pub fn current_size(&self) -> Option<(&Uuid, &Size)> {
        self.sizes
            .iter()
            .max_by(|(a_id, a), (b_id, b)| {
                a.creation_date
                    .cmp(&b.creation_date)
                    .then_with(|| a_id.cmp(b_id))
            })
    }

    /// Checks a tag's spatial binding against this picture's size history.
    pub fn validate_tag(&self, tag: &Tag) -> Result<(), DomainError> {
        let Some(info) = &tag.box_information else {
            return Ok(());
        };
        if !self.sizes.contains_key(&info.image_size_id) {
            return Err(DomainError::ValidationError(format!(
                "tag box references unknown size {}",
                info.image_size_id
            )));
        }
        if info.bounds.is_empty() {
            return Err(DomainError::ValidationError(format!(
                "tag box {} has no area",
                info.bounds
            )));
        }
        Ok(())
    }

    /// Full consistency check run before a record is first written.
    pub fn validate(&self) -> Result<(), DomainError> {
        PictureKey::new(self.origin.clone(), self.name.clone())?;
        if self.origin_id.trim().is_empty() {
            return Err(DomainError::ValidationError("originID is required".into()));
        }
        KeySegment::new(self.origin_id.clone())?;
        if self.origin_id.len() > MAX_ORIGIN_ID_LEN {
            return Err(DomainError::ValidationError(format!(
                "originID exceeds {} characters",
                MAX_ORIGIN_ID_LEN
            )));
        }
        self.container_kind()?;
        for tag in self.tags.values() {
            self.validate_tag(tag)?;
        }
        Ok(())
    }
}

/// Optional narrowing for store listings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PictureFilter {
    pub origin_id: Option<String>,
    pub pagination: PaginationRequest,
}
