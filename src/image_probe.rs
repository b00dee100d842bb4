//! Image dimension probing for the material image table.
//!
//! Runs while the graph index is built, never during resolution. Sources are tried in
//! order: explicit `width`/`height`, inline `dataUrl`, `assetId` via an [`AssetStore`],
//! then `path` on disk (relative paths are tried against `base_dir`).

use std::{
    io::Cursor,
    path::{Path, PathBuf},
};

use anyhow::{Result, anyhow, bail};
use base64::{Engine as _, engine::general_purpose};

use crate::{asset_store::AssetStore, dsl::ImageEntry};

/// Decode percent-encoded bytes in a data URL.
fn percent_decode_to_bytes(s: &str) -> Result<Vec<u8>> {
    let bytes = s.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                if i + 2 >= bytes.len() {
                    bail!("invalid percent-encoding: truncated");
                }
                let hex = |b: u8| -> Option<u8> {
                    match b {
                        b'0'..=b'9' => Some(b - b'0'),
                        b'a'..=b'f' => Some(b - b'a' + 10),
                        b'A'..=b'F' => Some(b - b'A' + 10),
                        _ => None,
                    }
                };
                let Some(hi) = hex(bytes[i + 1]) else {
                    bail!("invalid percent-encoding");
                };
                let Some(lo) = hex(bytes[i + 2]) else {
                    bail!("invalid percent-encoding");
                };
                out.push((hi << 4) | lo);
                i += 3;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    Ok(out)
}

/// Decode a data URL to raw bytes.
pub fn decode_data_url(data_url: &str) -> Result<Vec<u8>> {
    let s = data_url.trim();
    let Some(rest) = s.strip_prefix("data:") else {
        bail!("not a data URL");
    };
    let (meta, data) = rest
        .split_once(',')
        .ok_or_else(|| anyhow!("invalid data URL: missing comma"))?;

    let is_base64 = meta
        .split(';')
        .any(|t| t.trim().eq_ignore_ascii_case("base64"));

    if is_base64 {
        general_purpose::STANDARD
            .decode(data.trim())
            .or_else(|_| general_purpose::URL_SAFE.decode(data.trim()))
            .map_err(|e| anyhow!("invalid base64 in data URL: {e}"))
    } else {
        percent_decode_to_bytes(data)
    }
}

fn dimensions_from_bytes(bytes: &[u8]) -> Option<[u32; 2]> {
    let reader = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?;
    reader.into_dimensions().ok().map(|(w, h)| [w, h])
}

/// Pixel size of an image table entry, or `None` when no source yields one.
pub fn probe_image_dimensions(
    entry: &ImageEntry,
    asset_store: Option<&AssetStore>,
    base_dir: Option<&Path>,
) -> Option<[u32; 2]> {
    if let (Some(w), Some(h)) = (entry.width, entry.height) {
        return Some([w, h]);
    }

    if let Some(s) = entry.data_url.as_deref().filter(|s| !s.trim().is_empty()) {
        match decode_data_url(s) {
            Ok(bytes) => {
                if let Some(size) = dimensions_from_bytes(&bytes) {
                    return Some(size);
                }
            }
            Err(e) => log::debug!("[image-probe] '{}': {e:#}", entry.name),
        }
    }

    if let (Some(asset_id), Some(store)) = (entry.asset_id.as_deref(), asset_store) {
        match store.image_dimensions(asset_id) {
            Ok(Some(size)) => return Some(size),
            Ok(None) => {}
            Err(e) => log::debug!("[image-probe] '{}': {e:#}", entry.name),
        }
    }

    let p = entry.path.as_deref().filter(|s| !s.trim().is_empty())?;
    let pb = PathBuf::from(p);
    let candidates: Vec<PathBuf> = match base_dir {
        Some(base) if !pb.is_absolute() => vec![base.join(&pb), pb],
        _ => vec![pb],
    };
    for cand in &candidates {
        if let Ok((w, h)) = image::image_dimensions(cand) {
            return Some([w, h]);
        }
    }
    None
}
