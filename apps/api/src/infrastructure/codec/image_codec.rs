use crate::domain::picture::{
    codec::Codec, entity::BoundingBox, errors::DomainError, value_objects::ContainerKind,
};
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use tracing::debug;

/// `image` crate backed codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCodec;

impl Codec for ImageCodec {
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, DomainError> {
        image::load_from_memory(bytes)
            .map_err(|e| DomainError::Codec(format!("Invalid or corrupted image data: {}", e)))
    }

    fn encode(&self, grid: &DynamicImage, kind: ContainerKind) -> Result<Vec<u8>, DomainError> {
        let mut buffer = Cursor::new(Vec::new());
        let result = match kind {
            // JPEG has no alpha channel.
            ContainerKind::Jpeg => DynamicImage::ImageRgb8(grid.to_rgb8())
                .write_to(&mut buffer, ImageFormat::Jpeg),
            ContainerKind::Png => grid.write_to(&mut buffer, ImageFormat::Png),
            ContainerKind::WebP => DynamicImage::ImageRgba8(grid.to_rgba8())
                .write_to(&mut buffer, ImageFormat::WebP),
        };
        result.map_err(|e| DomainError::Codec(format!("{:?} encoding failed: {}", kind, e)))?;

        let data = buffer.into_inner();
        debug!("Encoded {:?} raster, output size: {} bytes", kind, data.len());
        Ok(data)
    }

    fn subregion(&self, grid: &DynamicImage, region: BoundingBox) -> DynamicImage {
        // Reads through a borrowed view of the source and copies only the
        // selected pixels, keeping the source colour type.
        grid.crop_imm(region.left, region.top, region.width, region.height)
    }
}
