//! Material graph -> glTF texture reference.
//!
//! [`TextureBindingResolver`] walks back from a material input to the image it samples,
//! recognizes the UV chain in front of the texture, merges per-channel sockets into one
//! logical image and memoizes the result for the session.

pub mod cache;
pub mod channels;
pub mod detectors;
pub mod hooks;
pub mod interchange;
pub mod registry;
pub mod resolver;
pub mod settings;
pub mod types;

pub use cache::{CacheKey, CacheStats, ResultCache};
pub use channels::{ChannelResolution, count_textured, resolve_channels};
pub use detectors::UvDetection;
pub use hooks::{TextureInfoHook, UvLayerLookup};
pub use interchange::KHR_TEXTURE_TRANSFORM;
pub use registry::{ImageRegistry, ImageSource};
pub use resolver::TextureBindingResolver;
pub use settings::{ResolverSettings, UvConvention};
pub use types::{
    ChannelDefault, ChannelSet, ChannelSource, FilterPolicy, OutputKind, SamplerWrap, TextureBinding,
    TextureResolution, TextureTransform, UdimInfo, UvSource, WrapMode,
};
