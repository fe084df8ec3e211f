use super::{entity::BoundingBox, errors::DomainError, value_objects::ContainerKind};
use image::DynamicImage;

/// Raster decode/encode collaborator.
///
/// The pixel grid is an `image::DynamicImage`; `subregion` is only called
/// with a region already clipped to the grid's bounds.
pub trait Codec: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, DomainError>;
    fn encode(&self, grid: &DynamicImage, kind: ContainerKind) -> Result<Vec<u8>, DomainError>;
    fn subregion(&self, grid: &DynamicImage, region: BoundingBox) -> DynamicImage;
}
