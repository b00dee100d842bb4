//! Texture binding resolver for node-forge material graphs.
//!
//! Load a material with [`dsl::load_material_from_path`], index it with
//! [`shader_graph::GraphIndex`], then ask a [`texture_binding::TextureBindingResolver`]
//! for glTF texture references.

pub mod asset_store;
pub mod dsl;
pub mod graph;
pub mod image_probe;
pub mod schema;
pub mod shader_graph;
pub mod texture_binding;

#[cfg(test)]
mod test_fixtures;

pub use shader_graph::{GraphIndex, NodeHandle, NodeSocket, ShaderGraph, ShaderNode, SocketValue, ValueKind};
pub use texture_binding::{
    ChannelDefault, ChannelSet, FilterPolicy, OutputKind, ResolverSettings, TextureBinding,
    TextureBindingResolver, TextureResolution, UvSource,
};
