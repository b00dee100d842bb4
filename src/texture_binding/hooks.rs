//! Host-supplied capabilities: the post-processing hook and UV layer lookup.

use std::collections::{BTreeMap, HashMap};

use super::{ChannelSet, TextureBinding};

/// Called once per bound resolution, before it is cached. May rewrite the record.
pub trait TextureInfoHook {
    fn gather_texture_info_hook(&self, binding: &mut TextureBinding, channels: &ChannelSet);
}

impl<F> TextureInfoHook for F
where
    F: Fn(&mut TextureBinding, &ChannelSet),
{
    fn gather_texture_info_hook(&self, binding: &mut TextureBinding, channels: &ChannelSet) {
        self(binding, channels)
    }
}

/// Named UV layers of one mesh.
pub trait UvLayerLookup {
    fn uv_layer_index(&self, name: &str) -> Option<u32>;
}

impl UvLayerLookup for HashMap<String, u32> {
    fn uv_layer_index(&self, name: &str) -> Option<u32> {
        self.get(name).copied()
    }
}

impl UvLayerLookup for BTreeMap<String, u32> {
    fn uv_layer_index(&self, name: &str) -> Option<u32> {
        self.get(name).copied()
    }
}

/// Layer names in layer order.
impl UvLayerLookup for [String] {
    fn uv_layer_index(&self, name: &str) -> Option<u32> {
        self.iter().position(|n| n == name).map(|i| i as u32)
    }
}

impl UvLayerLookup for Vec<String> {
    fn uv_layer_index(&self, name: &str) -> Option<u32> {
        self.as_slice().uv_layer_index(name)
    }
}
