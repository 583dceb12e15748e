//! Documents collected from the source tree or the customizations directory.

use serde::{Deserialize, Serialize};
use std::path::Path;

pub const IMAGE_METADATA_KIND: &str = "ImageMetadata";

/// Metadata about a prebuilt container image, keyed by its tags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageInfo {
    #[serde(default)]
    pub api_version: String,
    pub kind: String,
    #[serde(default)]
    pub spec: ImageInfoSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageInfoSpec {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub ports_to_expose: Vec<u16>,
    #[serde(default, rename = "userID")]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub accessed_dirs: Vec<String>,
}

impl ImageInfo {
    /// Reads `path` and returns it only if it is an image metadata document.
    pub fn read(path: &Path) -> anyhow::Result<Option<Self>> {
        let content = std::fs::read_to_string(path)?;
        match serde_yaml::from_str::<ImageInfo>(&content) {
            Ok(info) if info.kind == IMAGE_METADATA_KIND => Ok(Some(info)),
            _ => Ok(None),
        }
    }
}
