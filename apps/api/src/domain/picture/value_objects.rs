use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use validator::Validate;

lazy_static! {
    // Segments end up in blob paths (`{origin}/{name}`), so no separators and no leading dot.
    static ref KEY_SEGMENT_REGEX: regex::Regex =
        regex::Regex::new(r"^[A-Za-z0-9_-][A-Za-z0-9._-]*$").unwrap();
}

/// One half of a picture identity key (`origin` or `name`).
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct KeySegment {
    #[validate(length(min = 1, max = 128), regex(path = *KEY_SEGMENT_REGEX))]
    pub value: String,
}

impl KeySegment {
    pub fn new(value: String) -> Result<Self, validator::ValidationErrors> {
        let segment = Self { value };
        segment.validate()?;
        Ok(segment)
    }
}

/// Raster container kinds the codec can round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Jpeg,
    Png,
    WebP,
}

impl ContainerKind {
    /// Resolves a picture `extension` to a container kind.
    ///
    /// `jpg` and `jpeg` are the same container. Anything outside the closed
    /// set is reported instead of falling back to a default.
    pub fn from_extension(extension: &str) -> Result<Self, super::errors::DomainError> {
        match extension.trim().to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(ContainerKind::Jpeg),
            "png" => Ok(ContainerKind::Png),
            "webp" => Ok(ContainerKind::WebP),
            other => Err(super::errors::DomainError::UnsupportedContainer(
                other.to_string(),
            )),
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ContainerKind::Jpeg => "image/jpeg",
            ContainerKind::Png => "image/png",
            ContainerKind::WebP => "image/webp",
        }
    }
}
