use std::sync::Arc;

use crate::shader_graph::{NodeSocket, ShaderGraph, ShaderNode, texture_node_from_socket};

use super::{
    CacheKey, CacheStats, ChannelSet, FilterPolicy, ImageRegistry, OutputKind, ResolverSettings,
    ResultCache, SamplerWrap, TextureBinding, TextureInfoHook, TextureResolution,
    channels::{count_textured, resolve_channels},
    detectors::{detect_normal_scale, detect_occlusion_strength, detect_uv},
};

/// One export session: settings, memo table, image registry and hooks.
///
/// Results are shared through `Arc`; asking the same question twice in a session returns
/// the same allocation.
pub struct TextureBindingResolver {
    settings: ResolverSettings,
    cache: ResultCache,
    registry: ImageRegistry,
    hooks: Vec<Box<dyn TextureInfoHook>>,
}

impl Default for TextureBindingResolver {
    fn default() -> Self {
        Self::new(ResolverSettings::default())
    }
}

impl TextureBindingResolver {
    pub fn new(settings: ResolverSettings) -> Self {
        Self {
            settings,
            cache: ResultCache::new(),
            registry: ImageRegistry::new(),
            hooks: Vec::new(),
        }
    }

    pub fn with_hook(mut self, hook: impl TextureInfoHook + 'static) -> Self {
        self.add_hook(hook);
        self
    }

    pub fn add_hook(&mut self, hook: impl TextureInfoHook + 'static) {
        self.hooks.push(Box::new(hook));
    }

    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    pub fn registry(&self) -> &ImageRegistry {
        &self.registry
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Forget everything computed so far. Call when the graph may have changed.
    pub fn begin_session(&mut self) {
        self.cache.clear();
        self.registry.clear();
    }

    pub fn resolve<G: ShaderGraph + ?Sized>(
        &mut self,
        graph: &G,
        primary: &NodeSocket,
        channels: &ChannelSet,
        kind: OutputKind,
        filter: FilterPolicy,
    ) -> Arc<TextureResolution> {
        let key = CacheKey::new(primary, channels, kind, filter);
        let settings = &self.settings;
        let registry = &mut self.registry;
        let hooks = &self.hooks;
        self.cache.get_or_compute(key, || {
            compute(graph, primary, channels, kind, filter, settings, registry, hooks)
        })
    }

    /// Generic texture reference, or `None` when nothing binds.
    pub fn gather_texture_info<G: ShaderGraph + ?Sized>(
        &mut self,
        graph: &G,
        primary: &NodeSocket,
        channels: &ChannelSet,
        filter: FilterPolicy,
    ) -> Option<TextureBinding> {
        self.gather(graph, primary, channels, OutputKind::Default, filter)
    }

    pub fn gather_normal_texture_info<G: ShaderGraph + ?Sized>(
        &mut self,
        graph: &G,
        primary: &NodeSocket,
        channels: &ChannelSet,
        filter: FilterPolicy,
    ) -> Option<TextureBinding> {
        self.gather(graph, primary, channels, OutputKind::Normal, filter)
    }

    pub fn gather_occlusion_texture_info<G: ShaderGraph + ?Sized>(
        &mut self,
        graph: &G,
        primary: &NodeSocket,
        channels: &ChannelSet,
        filter: FilterPolicy,
    ) -> Option<TextureBinding> {
        self.gather(graph, primary, channels, OutputKind::Occlusion, filter)
    }

    fn gather<G: ShaderGraph + ?Sized>(
        &mut self,
        graph: &G,
        primary: &NodeSocket,
        channels: &ChannelSet,
        kind: OutputKind,
        filter: FilterPolicy,
    ) -> Option<TextureBinding> {
        let resolution = self.resolve(graph, primary, channels, kind, filter);
        resolution.binding.is_bound().then(|| resolution.binding.clone())
    }
}

#[allow(clippy::too_many_arguments)]
fn compute<G: ShaderGraph + ?Sized>(
    graph: &G,
    primary: &NodeSocket,
    channels: &ChannelSet,
    kind: OutputKind,
    filter: FilterPolicy,
    settings: &ResolverSettings,
    registry: &mut ImageRegistry,
    hooks: &[Box<dyn TextureInfoHook>],
) -> TextureResolution {
    if channels.is_vacant() {
        log::debug!("[texture-binding] empty channel set for {primary:?}");
        return TextureResolution::unbound(kind);
    }
    let Some(texture) = texture_node_from_socket(graph, primary) else {
        log::debug!("[texture-binding] primary socket {primary:?} reaches no texture");
        return TextureResolution::unbound(kind);
    };

    let textured = count_textured(graph, channels);
    if !filter.passes(textured, channels.arity()) {
        log::debug!(
            "[texture-binding] {filter:?} gate failed: {textured} of {} channels textured",
            channels.arity()
        );
        return TextureResolution::unbound(kind);
    }

    let uv = detect_uv(graph, primary, settings);
    let resolved = resolve_channels(graph, channels, settings, registry);

    let Some(image_index) = resolved.image_index else {
        // Tile sets that failed to merge keep their UV source for the caller.
        let mut binding = TextureBinding::unbound(kind);
        if resolved.udim.udim {
            binding.uv_source = uv.source;
        }
        return TextureResolution {
            binding,
            udim: resolved.udim,
            wrap: None,
            image: None,
        };
    };

    let scalar = match kind {
        OutputKind::Default => None,
        OutputKind::Normal => detect_normal_scale(graph, primary),
        OutputKind::Occlusion => detect_occlusion_strength(graph, primary),
    };

    let mut binding = TextureBinding {
        kind,
        image_index: Some(image_index),
        uv_channel: None,
        uv_transform: uv.transform,
        uv_source: uv.source,
        scalar,
        channel_layout: resolved.layout,
        extensions: Default::default(),
    };
    for hook in hooks {
        hook.gather_texture_info_hook(&mut binding, channels);
    }

    let wrap = match (uv.wrap, texture.node) {
        (Some(manual), _) => Some(manual),
        (None, ShaderNode::ImageTexture { extension, .. }) => {
            Some(SamplerWrap::uniform((*extension).into()))
        }
        (None, _) => None,
    };

    TextureResolution {
        binding,
        udim: resolved.udim,
        wrap,
        image: resolved.image,
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use serde_json::json;

    use super::*;
    use crate::texture_binding::{ChannelSource, UvSource, WrapMode};
    use crate::test_fixtures::{conn, image, material, node, tiled_image};

    #[test]
    fn repeated_queries_share_one_result() {
        let g = material(
            vec![
                node("tex", "ImageTexture", json!({"image": "albedo"})),
                node("bsdf", "PrincipledBSDF", json!({})),
            ],
            vec![conn("tex", "color", "bsdf", "base_color")],
        )
        .image("albedo", image("albedo.png", 4, 4))
        .index();

        let calls = Rc::new(Cell::new(0));
        let seen = Rc::clone(&calls);
        let mut resolver = TextureBindingResolver::default().with_hook(move |_: &mut TextureBinding, _: &ChannelSet| {
            seen.set(seen.get() + 1);
        });

        let primary = g.socket("bsdf", "base_color").unwrap();
        let set = ChannelSet::single(primary.clone());
        let a = resolver.resolve(&g, &primary, &set, OutputKind::Default, FilterPolicy::All);
        let b = resolver.resolve(&g, &primary, &set, OutputKind::Default, FilterPolicy::All);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(calls.get(), 1);
        assert_eq!(resolver.cache_stats().misses, 1);
        assert_eq!(a.binding.image_index, Some(0));

        resolver.begin_session();
        let c = resolver.resolve(&g, &primary, &set, OutputKind::Default, FilterPolicy::All);
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(*a, *c);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn vacant_channel_sets_never_bind() {
        let g = material(vec![node("bsdf", "PrincipledBSDF", json!({}))], vec![]).index();
        let primary = g.socket("bsdf", "base_color").unwrap();
        let mut resolver = TextureBindingResolver::default();
        for filter in [FilterPolicy::All, FilterPolicy::Any, FilterPolicy::None] {
            let r = resolver.resolve(&g, &primary, &ChannelSet::new(vec![None, None]), OutputKind::Default, filter);
            assert!(!r.binding.is_bound());
            let r = resolver.resolve(&g, &primary, &ChannelSet::default(), OutputKind::Default, filter);
            assert!(!r.binding.is_bound());
        }
    }

    #[test]
    fn hooks_skip_unbound_results_and_may_edit_bound_ones() {
        let g = material(
            vec![
                node("uv", "UVMap", json!({"uvMap": "UVMap"})),
                node("tex", "ImageTexture", json!({"image": "albedo"})),
                node("bsdf", "PrincipledBSDF", json!({})),
            ],
            vec![conn("uv", "uv", "tex", "vector"), conn("tex", "color", "bsdf", "base_color")],
        )
        .image("albedo", image("albedo.png", 4, 4))
        .index();

        let mut resolver = TextureBindingResolver::default().with_hook(|b: &mut TextureBinding, _: &ChannelSet| {
            b.extensions
                .insert("EXT_hooked".to_string(), json!({"image": b.image_index}));
        });

        let primary = g.socket("bsdf", "base_color").unwrap();
        let bound = resolver
            .gather_texture_info(&g, &primary, &ChannelSet::single(primary.clone()), FilterPolicy::Any)
            .unwrap();
        assert_eq!(bound.uv_source, UvSource::Fixed("UVMap".to_string()));
        assert_eq!(bound.extensions["EXT_hooked"], json!({"image": 0}));

        let roughness = g.socket("bsdf", "roughness").unwrap();
        let unbound = resolver.resolve(
            &g,
            &roughness,
            &ChannelSet::single(roughness.clone()),
            OutputKind::Default,
            FilterPolicy::None,
        );
        assert!(!unbound.binding.is_bound());
        assert!(unbound.binding.extensions.is_empty());
    }

    #[test]
    fn untextured_primary_never_binds() {
        let g = material(
            vec![
                node("t_r", "ImageTexture", json!({"image": "r"})),
                node("t_m", "ImageTexture", json!({"image": "m"})),
                node("bsdf", "PrincipledBSDF", json!({})),
                node("gltf", "GltfSettings", json!({})),
            ],
            vec![
                conn("t_r", "color", "bsdf", "roughness"),
                conn("t_m", "color", "bsdf", "metallic"),
            ],
        )
        .image("r", image("r.png", 8, 8))
        .image("m", image("m.png", 8, 8))
        .index();

        let occlusion = g.socket("gltf", "occlusion").unwrap();
        let channels = ChannelSet::new(vec![
            Some(occlusion.clone()),
            g.socket("bsdf", "roughness"),
            g.socket("bsdf", "metallic"),
        ]);
        let mut resolver = TextureBindingResolver::default();
        for filter in [FilterPolicy::Any, FilterPolicy::None] {
            let r = resolver.resolve(&g, &occlusion, &channels, OutputKind::Occlusion, filter);
            assert!(!r.binding.is_bound(), "{filter:?}");
            assert_eq!(r.wrap, None);
        }
        assert!(resolver.registry().is_empty());

        // The same channels bind for roughness/metallic, leaving occlusion unresolved.
        let roughness = g.socket("bsdf", "roughness").unwrap();
        let r = resolver.resolve(&g, &roughness, &channels, OutputKind::Default, FilterPolicy::Any);
        assert_eq!(r.binding.image_index, Some(0));
        assert_eq!(r.binding.channel_layout[0], ChannelSource::Unresolved);
    }

    #[test]
    fn failed_tile_merge_keeps_uv_source() {
        let g = material(
            vec![
                node("uv", "UVMap", json!({"uvMap": "Body"})),
                node("t_r", "ImageTexture", json!({"image": "body_r"})),
                node("t_m", "ImageTexture", json!({"image": "body_m"})),
                node("bsdf", "PrincipledBSDF", json!({})),
            ],
            vec![
                conn("uv", "uv", "t_r", "vector"),
                conn("t_r", "color", "bsdf", "roughness"),
                conn("t_m", "color", "bsdf", "metallic"),
            ],
        )
        .image("body_r", tiled_image("body.<UDIM>.png", &[1001, 1002]))
        .image("body_m", tiled_image("body.<UDIM>.png", &[1001]))
        .index();

        let primary = g.socket("bsdf", "roughness").unwrap();
        let channels = ChannelSet::new(vec![Some(primary.clone()), g.socket("bsdf", "metallic")]);
        let r = TextureBindingResolver::default().resolve(&g, &primary, &channels, OutputKind::Default, FilterPolicy::All);
        assert!(!r.binding.is_bound());
        assert!(r.udim.udim);
        assert_eq!(r.udim.image.as_deref(), Some("body_r"));
        assert_eq!(r.binding.uv_source, UvSource::Fixed("Body".to_string()));
    }

    #[test]
    fn size_mismatch_reports_no_uv_source() {
        let g = material(
            vec![
                node("uv", "UVMap", json!({"uvMap": "Body"})),
                node("t_r", "ImageTexture", json!({"image": "r"})),
                node("t_m", "ImageTexture", json!({"image": "m"})),
                node("bsdf", "PrincipledBSDF", json!({})),
            ],
            vec![
                conn("uv", "uv", "t_r", "vector"),
                conn("t_r", "color", "bsdf", "roughness"),
                conn("t_m", "color", "bsdf", "metallic"),
            ],
        )
        .image("r", image("r.png", 8, 8))
        .image("m", image("m.png", 16, 16))
        .index();

        let primary = g.socket("bsdf", "roughness").unwrap();
        let channels = ChannelSet::new(vec![Some(primary.clone()), g.socket("bsdf", "metallic")]);
        let r = TextureBindingResolver::default().resolve(&g, &primary, &channels, OutputKind::Default, FilterPolicy::All);
        assert!(!r.binding.is_bound());
        assert!(!r.udim.udim);
        assert_eq!(r.binding.uv_source, UvSource::Active);
    }

    #[test]
    fn sampler_wrap_follows_texture_extension() {
        let g = material(
            vec![
                node("mirror", "ImageTexture", json!({"image": "a", "extension": "MIRROR"})),
                node("clip", "ImageTexture", json!({"image": "b", "extension": "CLIP"})),
                node("plain", "ImageTexture", json!({"image": "c"})),
                node("bsdf", "PrincipledBSDF", json!({})),
            ],
            vec![
                conn("mirror", "color", "bsdf", "base_color"),
                conn("clip", "color", "bsdf", "roughness"),
                conn("plain", "color", "bsdf", "metallic"),
            ],
        )
        .image("a", image("a.png", 4, 4))
        .image("b", image("b.png", 4, 4))
        .image("c", image("c.png", 4, 4))
        .index();

        let mut resolver = TextureBindingResolver::default();
        let mut wrap = |port: &str| {
            let socket = g.socket("bsdf", port).unwrap();
            let set = ChannelSet::single(socket.clone());
            resolver.resolve(&g, &socket, &set, OutputKind::Default, FilterPolicy::All).wrap
        };
        assert_eq!(wrap("base_color"), Some(SamplerWrap::uniform(WrapMode::MirroredRepeat)));
        assert_eq!(wrap("roughness"), Some(SamplerWrap::uniform(WrapMode::ClampToEdge)));
        assert_eq!(wrap("metallic"), Some(SamplerWrap::uniform(WrapMode::Repeat)));
    }
}
