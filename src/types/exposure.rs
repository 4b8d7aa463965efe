//! Exposure levels.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Visibility tier requested for a render.
///
/// Levels are totally ordered from least to most inclusive:
/// `Short < Public < All`. A field declared at level `L` is visible in
/// every render requested at `L` or above.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ExposureLevel {
    /// Baseline fields only.
    #[default]
    Short,
    /// Fields meant for public consumers.
    Public,
    /// Every declared field.
    All,
}

impl ExposureLevel {
    /// All levels, least inclusive first.
    pub const ALL_LEVELS: [ExposureLevel; 3] = [Self::Short, Self::Public, Self::All];

    /// Parse a level from its name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "short" => Some(Self::Short),
            "public" => Some(Self::Public),
            "all" => Some(Self::All),
            _ => None,
        }
    }

    /// Stable name used in cache keys and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Public => "public",
            Self::All => "all",
        }
    }

    /// Whether a field declared at `min` is visible at this level.
    pub fn admits(&self, min: ExposureLevel) -> bool {
        *self >= min
    }

    /// Exposure level used to expand a reference declared at `field_min`
    /// when the parent is rendered at `self`.
    ///
    /// A reference rendered at exactly its own threshold yields baseline
    /// children; above the threshold the parent's level carries down.
    pub fn cascade(&self, field_min: ExposureLevel) -> ExposureLevel {
        if *self == field_min {
            Self::Short
        } else {
            *self
        }
    }
}

impl fmt::Display for ExposureLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
