use std::collections::BTreeMap;

use crate::shader_graph::{NodeSocket, SocketValue, TextureExtension};

use super::{hooks::UvLayerLookup, registry::ImageSource};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OutputKind {
    Default,
    Normal,
    Occlusion,
}

/// How many channel sockets must reach a texture before a binding is attempted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FilterPolicy {
    All,
    Any,
    None,
}

impl FilterPolicy {
    /// `textured` of `arity` slots reach a texture. Absent slots count as untextured.
    pub fn passes(self, textured: usize, arity: usize) -> bool {
        match self {
            FilterPolicy::All => textured == arity,
            FilterPolicy::Any => textured >= 1,
            FilterPolicy::None => true,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum UvSource {
    /// An explicitly named UV map.
    Fixed(String),
    /// A named geometry attribute, usable when the mesh has a UV layer of that name.
    Attribute(String),
    #[default]
    Active,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextureTransform {
    pub offset: [f32; 2],
    pub rotation: f32,
    pub scale: [f32; 2],
}

impl TextureTransform {
    pub const IDENTITY: TextureTransform = TextureTransform {
        offset: [0.0, 0.0],
        rotation: 0.0,
        scale: [1.0, 1.0],
    };

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

impl Default for TextureTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Where one destination channel of the bound image gets its data.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChannelSource {
    /// Channel `source_channel` (0..=3, RGBA) of image `image`.
    Texture { image: String, source_channel: u8 },
    Constant(SocketValue),
    Unresolved,
}

impl ChannelSource {
    pub fn is_texture(&self) -> bool {
        matches!(self, ChannelSource::Texture { .. })
    }

    pub fn image(&self) -> Option<&str> {
        match self {
            ChannelSource::Texture { image, .. } => Some(image),
            _ => None,
        }
    }
}

/// Fallback for a channel slot that does not reach a texture.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChannelDefault {
    Value(SocketValue),
    /// Use the inline value of this (unlinked) socket.
    Socket(NodeSocket),
}

/// Fixed-arity tuple of channel sockets with parallel fallbacks.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ChannelSet {
    pub sockets: Vec<Option<NodeSocket>>,
    pub defaults: Vec<Option<ChannelDefault>>,
}

impl ChannelSet {
    pub fn new(sockets: Vec<Option<NodeSocket>>) -> Self {
        Self {
            sockets,
            defaults: Vec::new(),
        }
    }

    pub fn single(socket: NodeSocket) -> Self {
        Self::new(vec![Some(socket)])
    }

    /// Defaults beyond the socket arity are ignored; missing ones are `None`.
    pub fn with_defaults(mut self, defaults: Vec<Option<ChannelDefault>>) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn arity(&self) -> usize {
        self.sockets.len()
    }

    pub fn default_for(&self, slot: usize) -> Option<&ChannelDefault> {
        self.defaults.get(slot).and_then(Option::as_ref)
    }

    /// Empty or all-absent tuples cannot produce a binding.
    pub fn is_vacant(&self) -> bool {
        self.sockets.iter().all(Option::is_none)
    }
}

/// Tile-set facts for a query. `udim` is also set when tiled images failed to merge; the
/// binding is then unbound.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UdimInfo {
    pub udim: bool,
    /// Representative image id of the tile set.
    pub image: Option<String>,
}

/// Sampler wrap modes, with interchange enum values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WrapMode {
    Repeat,
    MirroredRepeat,
    ClampToEdge,
}

impl WrapMode {
    pub fn gl_enum(self) -> u32 {
        match self {
            WrapMode::Repeat => 10497,
            WrapMode::MirroredRepeat => 33648,
            WrapMode::ClampToEdge => 33071,
        }
    }
}

impl From<TextureExtension> for WrapMode {
    fn from(extension: TextureExtension) -> Self {
        match extension {
            TextureExtension::Repeat => WrapMode::Repeat,
            TextureExtension::Mirror => WrapMode::MirroredRepeat,
            // No border color in glTF samplers; clip degrades to clamp.
            TextureExtension::Extend | TextureExtension::Clip => WrapMode::ClampToEdge,
        }
    }
}

/// Per-axis sampler wrap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SamplerWrap {
    pub wrap_s: WrapMode,
    pub wrap_t: WrapMode,
}

impl SamplerWrap {
    /// Same wrap on both axes, as set by an image texture's extension mode.
    pub fn uniform(mode: WrapMode) -> Self {
        Self {
            wrap_s: mode,
            wrap_t: mode,
        }
    }
}

/// Normalized texture reference. `image_index == None` means "no binding": every other
/// field is then meaningless.
#[derive(Clone, Debug, PartialEq)]
pub struct TextureBinding {
    pub kind: OutputKind,
    pub image_index: Option<u32>,
    /// Set by [`TextureBinding::with_uv_channel`]; `None` means the active UV layer.
    pub uv_channel: Option<u32>,
    pub uv_transform: Option<TextureTransform>,
    pub uv_source: UvSource,
    /// Normal scale or occlusion strength, depending on `kind`.
    pub scalar: Option<f32>,
    pub channel_layout: Vec<ChannelSource>,
    /// Extension objects added by hooks, keyed by extension name.
    pub extensions: BTreeMap<String, serde_json::Value>,
}

impl TextureBinding {
    pub fn unbound(kind: OutputKind) -> Self {
        Self {
            kind,
            image_index: None,
            uv_channel: None,
            uv_transform: None,
            uv_source: UvSource::Active,
            scalar: None,
            channel_layout: Vec::new(),
            extensions: BTreeMap::new(),
        }
    }

    pub fn is_bound(&self) -> bool {
        self.image_index.is_some()
    }

    pub fn normal_scale(&self) -> Option<f32> {
        match self.kind {
            OutputKind::Normal => self.scalar,
            _ => None,
        }
    }

    pub fn occlusion_strength(&self) -> Option<f32> {
        match self.kind {
            OutputKind::Occlusion => self.scalar,
            _ => None,
        }
    }

    /// UV layer index of the UV source on a specific mesh.
    pub fn resolve_uv_channel(&self, lookup: &dyn UvLayerLookup) -> Option<u32> {
        match &self.uv_source {
            UvSource::Fixed(name) | UvSource::Attribute(name) => lookup.uv_layer_index(name),
            UvSource::Active => None,
        }
    }

    /// Merge a mesh's UV layer table into the binding.
    pub fn with_uv_channel(mut self, lookup: &dyn UvLayerLookup) -> Self {
        self.uv_channel = self.resolve_uv_channel(lookup);
        self
    }
}

/// Everything computed for one query; the unit the session cache stores.
#[derive(Clone, Debug, PartialEq)]
pub struct TextureResolution {
    pub binding: TextureBinding,
    pub udim: UdimInfo,
    /// Sampler wrap of the primary texture: a hand-built wrapping subgraph when one is
    /// recognized, the texture's extension mode otherwise. `None` when unbound.
    pub wrap: Option<SamplerWrap>,
    /// Logical image behind `binding.image_index`.
    pub image: Option<ImageSource>,
}

impl TextureResolution {
    pub fn unbound(kind: OutputKind) -> Self {
        Self {
            binding: TextureBinding::unbound(kind),
            udim: UdimInfo::default(),
            wrap: None,
            image: None,
        }
    }
}
