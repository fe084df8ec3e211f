use super::errors::DomainError;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use ts_rs::TS;

/// Review stage a picture currently lives in.
///
/// Every stage is backed by its own physical store. A picture exists in at
/// most one of them at a time; moving between stores is the job of the
/// lifecycle controller, never of the stores themselves.
///
/// # Transitions
/// - `Pending <-> Validated <-> Published` (reviewer driven, both directions)
/// - `Pending | Validated | Published -> Blocked` (one way, drops the raster)
///
/// Nothing leaves `Blocked`; re-admitting a picture is a fresh create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Stage {
    /// Freshly ingested, awaiting a first review
    Pending,

    /// Accepted by a reviewer, not yet public
    Validated,

    /// Publicly reachable
    Published,

    /// Terminal stage; the raster has been removed
    Blocked,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::Pending,
        Stage::Validated,
        Stage::Published,
        Stage::Blocked,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Pending => "pending",
            Stage::Validated => "validated",
            Stage::Published => "published",
            Stage::Blocked => "blocked",
        }
    }

    /// Returns true for the stages a reviewer can move pictures between.
    pub fn is_review_stage(&self) -> bool {
        !matches!(self, Stage::Blocked)
    }

    /// Returns true if a reviewer transfer from `self` to `to` is allowed.
    ///
    /// Only neighbouring review stages are connected. Blocking goes through
    /// its own operation and is never a transfer.
    pub fn can_transfer_to(&self, to: Stage) -> bool {
        matches!(
            (self, to),
            (Stage::Pending, Stage::Validated)
                | (Stage::Validated, Stage::Pending)
                | (Stage::Validated, Stage::Published)
                | (Stage::Published, Stage::Validated)
        )
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Stage::Pending),
            "validated" => Ok(Stage::Validated),
            "published" => Ok(Stage::Published),
            "blocked" => Ok(Stage::Blocked),
            _ => Err(DomainError::UnknownStage(s.to_string())),
        }
    }
}
