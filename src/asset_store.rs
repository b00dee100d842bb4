use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};

use crate::dsl::MaterialDSL;

/// Metadata + raw bytes for a single image asset.
#[derive(Debug, Clone)]
pub struct AssetData {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub original_name: String,
}

/// Thread-safe, clone-friendly in-memory asset cache keyed by `assetId`.
#[derive(Debug, Clone, Default)]
pub struct AssetStore {
    inner: Arc<Mutex<HashMap<String, AssetData>>>,
}

impl AssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an asset. If the `asset_id` already exists, this is a no-op
    /// (content-addressed dedup).
    pub fn insert(&self, asset_id: impl Into<String>, data: AssetData) {
        let asset_id = asset_id.into();
        let Ok(mut map) = self.inner.lock() else {
            return;
        };
        map.entry(asset_id).or_insert(data);
    }

    /// Retrieve a clone of the asset data for the given id.
    pub fn get(&self, asset_id: &str) -> Option<AssetData> {
        let map = self.inner.lock().ok()?;
        map.get(asset_id).cloned()
    }

    /// Check if an asset exists without cloning its bytes.
    pub fn contains(&self, asset_id: &str) -> bool {
        self.inner
            .lock()
            .ok()
            .is_some_and(|map| map.contains_key(asset_id))
    }

    pub fn clear(&self) {
        if let Ok(mut map) = self.inner.lock() {
            map.clear();
        }
    }

    /// Pixel size of an image asset, read from its header only. Returns `None` if the
    /// asset is missing, or an error if the bytes are not a recognizable image.
    pub fn image_dimensions(&self, asset_id: &str) -> Result<Option<[u32; 2]>> {
        let Some(data) = self.get(asset_id) else {
            return Ok(None);
        };
        let (w, h) = image::ImageReader::new(Cursor::new(&data.bytes))
            .with_guessed_format()
            .with_context(|| format!("failed to sniff image format for asset '{asset_id}'"))?
            .into_dimensions()
            .with_context(|| format!("failed to decode image header for asset '{asset_id}'"))?;
        Ok(Some([w, h]))
    }
}

/// Populate an `AssetStore` from the material's image table: every image that carries both
/// `assetId` and `path` is read from `base_dir.join(path)`.
pub fn load_from_material_dir(material: &MaterialDSL, base_dir: &Path) -> Result<AssetStore> {
    let store = AssetStore::new();
    for (image_id, entry) in &material.images {
        let (Some(asset_id), Some(path)) = (entry.asset_id.as_deref(), entry.path.as_deref())
        else {
            continue;
        };
        let file_path = base_dir.join(path);
        let bytes = std::fs::read(&file_path).with_context(|| {
            format!(
                "failed to read image '{}' (asset '{}') at {}",
                image_id,
                asset_id,
                file_path.display()
            )
        })?;
        store.insert(
            asset_id,
            AssetData {
                bytes,
                mime_type: mime_type_for_path(path).to_string(),
                original_name: entry.name.clone(),
            },
        );
    }
    Ok(store)
}

fn mime_type_for_path(path: &str) -> &'static str {
    let lower = path.to_ascii_lowercase();
    if lower.ends_with(".png") {
        "image/png"
    } else if lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
        "image/jpeg"
    } else if lower.ends_with(".exr") {
        "image/x-exr"
    } else {
        "application/octet-stream"
    }
}
