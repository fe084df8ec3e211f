use crate::domain::picture::{
    entity::{BoxInformation, PictureKey, Tag},
    stage::Stage,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Caller-supplied annotation; the controller stamps the creation date.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagRequest {
    pub name: String,
    pub origin: String,
    #[serde(default)]
    pub box_information: Option<BoxInformation>,
}

impl TagRequest {
    pub fn into_tag(self, now: DateTime<Utc>) -> Tag {
        Tag {
            name: self.name,
            origin: self.origin,
            creation_date: now,
            box_information: self.box_information,
        }
    }
}

/// A key found in more than one stage store, typically the trace of a
/// transfer whose source delete failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageDuplicate {
    pub key: PictureKey,
    pub stages: Vec<Stage>,
}
