use super::{
    entity::{BoundingBox, PictureKey},
    stage::Stage,
};
use thiserror::Error;
use uuid::Uuid;

/// Failures surfaced by the picture core.
///
/// None of these are retried internally. Each variant carries enough context
/// (stage, key, failing sub-step) for the caller to decide on remediation.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("picture {key} not found in {stage} store")]
    NotFound { stage: Stage, key: PictureKey },

    #[error("tag {tag_id} not found on picture {key}")]
    TagNotFound { key: PictureKey, tag_id: Uuid },

    #[error("picture {key} already exists in {stage} store")]
    AlreadyExists { stage: Stage, key: PictureKey },

    #[error("raster blob {path} not found")]
    BlobNotFound { path: String },

    #[error("crop {crop} does not intersect the {width}x{height} raster")]
    UncroppableRegion {
        crop: BoundingBox,
        width: u32,
        height: u32,
    },

    #[error("unsupported container kind: {0}")]
    UnsupportedContainer(String),

    /// Destination write succeeded, source delete failed. The key now lives
    /// in both stores and must be reconciled out of band.
    #[error("picture {key} was written to {to} but could not be removed from {from}")]
    PartialTransferFailure {
        from: Stage,
        to: Stage,
        key: PictureKey,
        #[source]
        source: Box<DomainError>,
    },

    /// Metadata delete succeeded, blob delete failed.
    #[error("picture {key} deleted but its raster {path} remains: {reason}")]
    OrphanBlob {
        key: PictureKey,
        path: String,
        reason: String,
    },

    #[error("unknown stage: {0}")]
    UnknownStage(String),

    #[error("transition from {from} to {to} is not allowed")]
    InvalidTransition { from: Stage, to: Stage },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Infrastructure error: {0}")]
    InfrastructureError(String),
}

impl From<validator::ValidationErrors> for DomainError {
    fn from(err: validator::ValidationErrors) -> Self {
        DomainError::ValidationError(err.to_string())
    }
}
