use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Coordinate convention for mapping-node values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UvConvention {
    /// Mapping values already use the interchange convention (top-left origin).
    #[default]
    Interchange,
    /// Mapping values use a bottom-left origin and are converted on the way out.
    BottomLeft,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResolverSettings {
    pub uv_convention: UvConvention,
    /// Distinct images packed into one binding must have the same known pixel size.
    pub require_same_size: bool,
    /// Group tiled images into UDIM sets. When off, tiled images are plain images.
    pub udim: bool,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            uv_convention: UvConvention::Interchange,
            require_same_size: true,
            udim: true,
        }
    }
}

impl ResolverSettings {
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("failed to parse resolver settings json")
    }
}
