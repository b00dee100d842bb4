//! glTF texture-info and sampler emission.

use anyhow::{Context, Result};
use gltf::json::{
    material::{NormalTexture, OcclusionTexture},
    texture::{Info, Sampler},
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

use super::{OutputKind, TextureBinding, TextureResolution, TextureTransform, WrapMode};

pub const KHR_TEXTURE_TRANSFORM: &str = "KHR_texture_transform";

fn transform_json(t: &TextureTransform) -> Value {
    let mut out = Map::new();
    if t.offset != [0.0, 0.0] {
        out.insert("offset".to_string(), json!(t.offset));
    }
    if t.rotation != 0.0 {
        out.insert("rotation".to_string(), json!(t.rotation));
    }
    if t.scale != [1.0, 1.0] {
        out.insert("scale".to_string(), json!(t.scale));
    }
    Value::Object(out)
}

impl TextureBinding {
    /// Texture-info object for this binding; `None` when unbound. Fields equal to their
    /// glTF defaults are left out, and an identity transform emits no extension.
    pub fn to_gltf_json(&self) -> Option<Value> {
        let index = self.image_index?;
        let mut out = Map::new();
        out.insert("index".to_string(), json!(index));
        if let Some(tex_coord) = self.uv_channel.filter(|c| *c != 0) {
            out.insert("texCoord".to_string(), json!(tex_coord));
        }
        match (self.kind, self.scalar) {
            (OutputKind::Normal, Some(scale)) => {
                out.insert("scale".to_string(), json!(scale));
            }
            (OutputKind::Occlusion, Some(strength)) => {
                out.insert("strength".to_string(), json!(strength));
            }
            _ => {}
        }

        let mut extensions = Map::new();
        if let Some(t) = self.uv_transform.filter(|t| !t.is_identity()) {
            extensions.insert(KHR_TEXTURE_TRANSFORM.to_string(), transform_json(&t));
        }
        for (name, value) in &self.extensions {
            extensions.insert(name.clone(), value.clone());
        }
        if !extensions.is_empty() {
            out.insert("extensions".to_string(), Value::Object(extensions));
        }
        Some(Value::Object(out))
    }

    pub fn to_gltf_info(&self) -> Result<Option<Info>> {
        self.typed("textureInfo")
    }

    pub fn to_gltf_normal_texture(&self) -> Result<Option<NormalTexture>> {
        self.typed("normalTextureInfo")
    }

    pub fn to_gltf_occlusion_texture(&self) -> Result<Option<OcclusionTexture>> {
        self.typed("occlusionTextureInfo")
    }

    fn typed<T: DeserializeOwned>(&self, what: &str) -> Result<Option<T>> {
        let Some(value) = self.to_gltf_json() else {
            return Ok(None);
        };
        let text = value.to_string();
        serde_json::from_str(&text)
            .map(Some)
            .with_context(|| format!("binding does not form a valid glTF {what}: {text}"))
    }
}

impl TextureResolution {
    /// Sampler object carrying the wrap modes; `None` when unbound. Repeat axes are left
    /// out, so a plain repeating texture emits `{}`.
    pub fn to_gltf_sampler_json(&self) -> Option<Value> {
        let wrap = self.wrap.filter(|_| self.binding.is_bound())?;
        let mut out = Map::new();
        for (key, mode) in [("wrapS", wrap.wrap_s), ("wrapT", wrap.wrap_t)] {
            if mode != WrapMode::Repeat {
                out.insert(key.to_string(), json!(mode.gl_enum()));
            }
        }
        Some(Value::Object(out))
    }

    pub fn to_gltf_sampler(&self) -> Result<Option<Sampler>> {
        let Some(value) = self.to_gltf_sampler_json() else {
            return Ok(None);
        };
        let text = value.to_string();
        serde_json::from_str(&text)
            .map(Some)
            .with_context(|| format!("wrap does not form a valid glTF sampler: {text}"))
    }
}
