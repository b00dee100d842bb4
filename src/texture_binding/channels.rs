//! Per-channel texture resolution and image assembly.

use crate::shader_graph::{
    ImageInfo, Link, NodeSocket, ShaderGraph, ShaderNode, SocketValue, previous_socket,
    texture_node_from_socket,
};

use super::{
    ChannelDefault, ChannelSet, ChannelSource, ImageRegistry, ImageSource, ResolverSettings, UdimInfo,
};

/// Outcome of resolving a channel set to one logical image.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChannelResolution {
    pub image_index: Option<u32>,
    pub layout: Vec<ChannelSource>,
    pub udim: UdimInfo,
    pub image: Option<ImageSource>,
}

/// Number of present slots whose socket reaches a texture with an image.
pub fn count_textured<G: ShaderGraph + ?Sized>(graph: &G, channels: &ChannelSet) -> usize {
    channels
        .sockets
        .iter()
        .flatten()
        .filter(|s| texture_node_from_socket(graph, s).is_some())
        .count()
}

pub fn resolve_channels<G: ShaderGraph + ?Sized>(
    graph: &G,
    channels: &ChannelSet,
    settings: &ResolverSettings,
    registry: &mut ImageRegistry,
) -> ChannelResolution {
    let layout: Vec<ChannelSource> = channels
        .sockets
        .iter()
        .enumerate()
        .map(|(slot, socket)| channel_source(graph, channels, slot, socket.as_ref()))
        .collect();

    let mut distinct: Vec<String> = Vec::new();
    for image in layout.iter().filter_map(ChannelSource::image) {
        if !distinct.iter().any(|d| d == image) {
            distinct.push(image.to_string());
        }
    }
    if distinct.is_empty() {
        log::debug!("[texture-binding] no channel reaches an image");
        return ChannelResolution {
            layout,
            ..Default::default()
        };
    }

    let mut infos: Vec<&ImageInfo> = Vec::with_capacity(distinct.len());
    for id in &distinct {
        let Some(info) = graph.image(id) else {
            log::debug!("[texture-binding] image '{id}' missing from the image table");
            return ChannelResolution {
                layout,
                ..Default::default()
            };
        };
        infos.push(info);
    }

    let tiled = settings.udim && infos.iter().any(|i| i.is_tiled());
    let source = if tiled {
        udim_source(&infos)
    } else {
        flat_source(&infos, &layout, settings)
    };
    let Some(source) = source else {
        // A failed tile merge still reports which tile set was involved.
        let udim = if tiled {
            UdimInfo {
                udim: true,
                image: distinct.first().cloned(),
            }
        } else {
            UdimInfo::default()
        };
        return ChannelResolution {
            layout,
            udim,
            ..Default::default()
        };
    };

    let udim = match &source {
        ImageSource::Udim { images, .. } => UdimInfo {
            udim: true,
            image: images.first().cloned(),
        },
        _ => UdimInfo::default(),
    };
    let image_index = registry.register(source.clone());

    ChannelResolution {
        image_index: Some(image_index),
        layout,
        udim,
        image: Some(source),
    }
}

fn channel_source<G: ShaderGraph + ?Sized>(
    graph: &G,
    channels: &ChannelSet,
    slot: usize,
    socket: Option<&NodeSocket>,
) -> ChannelSource {
    if let Some(socket) = socket {
        if let Some(texture) = texture_node_from_socket(graph, socket) {
            if let ShaderNode::ImageTexture { image: Some(image), .. } = texture.node {
                return ChannelSource::Texture {
                    image: image.clone(),
                    source_channel: source_channel(graph, socket, &texture, slot),
                };
            }
        }
    }

    let value = match channels.default_for(slot) {
        Some(ChannelDefault::Value(v)) => Some(*v),
        Some(ChannelDefault::Socket(s)) => inline_value(graph, s),
        None => None,
    };
    value.map_or(ChannelSource::Unresolved, ChannelSource::Constant)
}

fn inline_value<G: ShaderGraph + ?Sized>(graph: &G, socket: &NodeSocket) -> Option<SocketValue> {
    if graph.link(socket.node, &socket.port).is_some() {
        return None;
    }
    graph.default_value(socket.node, &socket.port)
}

/// Image channel read by `socket`: a separate-color output picks R/G/B, the texture's
/// alpha output picks A, anything else maps the slot straight through.
fn source_channel<G: ShaderGraph + ?Sized>(
    graph: &G,
    socket: &NodeSocket,
    texture: &Link<'_>,
    slot: usize,
) -> u8 {
    let Some(from) = previous_socket(graph, socket) else {
        return slot as u8;
    };
    match graph.node(from.node) {
        Some(ShaderNode::SeparateColor) => match from.port.as_str() {
            "r" => 0,
            "g" => 1,
            "b" => 2,
            _ => slot as u8,
        },
        Some(ShaderNode::ImageTexture { .. }) if from == texture.output && from.port == "alpha" => 3,
        _ => slot as u8,
    }
}

fn udim_source(infos: &[&ImageInfo]) -> Option<ImageSource> {
    let first = infos[0];
    let consistent = infos
        .iter()
        .all(|i| i.is_tiled() && i.name == first.name && i.tiles == first.tiles);
    if !consistent {
        log::debug!(
            "[texture-binding] tiled images do not form one tile set (first '{}')",
            first.name
        );
        return None;
    }
    Some(ImageSource::Udim {
        name: first.name.clone(),
        tiles: first.tiles.clone(),
        images: infos.iter().map(|i| i.id.clone()).collect(),
    })
}

fn flat_source(infos: &[&ImageInfo], layout: &[ChannelSource], settings: &ResolverSettings) -> Option<ImageSource> {
    if infos.len() > 1 && settings.require_same_size {
        let size = infos[0].size;
        if size.is_none() || infos.iter().any(|i| i.size != size) {
            log::debug!(
                "[texture-binding] packed images differ in size: {:?}",
                infos.iter().map(|i| (&i.id, i.size)).collect::<Vec<_>>()
            );
            return None;
        }
    }

    let straight = infos.len() == 1
        && layout.iter().enumerate().all(|(slot, c)| {
            matches!(c, ChannelSource::Texture { source_channel, .. } if *source_channel as usize == slot)
        });
    if straight {
        return Some(ImageSource::Single {
            image: infos[0].id.clone(),
        });
    }
    Some(ImageSource::Packed {
        channels: layout.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::shader_graph::GraphIndex;
    use crate::test_fixtures::{conn, image, material, node, tiled_image};

    /// Three textures wired into roughness/metallic/alpha of a BSDF.
    fn orm(images: [&str; 3]) -> crate::test_fixtures::MaterialBuilder {
        material(
            vec![
                node("t0", "ImageTexture", json!({"image": images[0]})),
                node("t1", "ImageTexture", json!({"image": images[1]})),
                node("t2", "ImageTexture", json!({"image": images[2]})),
                node("bsdf", "PrincipledBSDF", json!({})),
            ],
            vec![
                conn("t0", "color", "bsdf", "roughness"),
                conn("t1", "color", "bsdf", "metallic"),
                conn("t2", "color", "bsdf", "alpha"),
            ],
        )
    }

    fn channels(g: &GraphIndex) -> ChannelSet {
        ChannelSet::new(
            ["roughness", "metallic", "alpha"]
                .iter()
                .map(|p| g.socket("bsdf", p))
                .collect(),
        )
    }

    #[test]
    fn single_image_straight_through() {
        let g = material(
            vec![
                node("tex", "ImageTexture", json!({"image": "albedo"})),
                node("bsdf", "PrincipledBSDF", json!({})),
            ],
            vec![conn("tex", "color", "bsdf", "base_color")],
        )
        .image("albedo", image("albedo.png", 4, 4))
        .index();
        let mut registry = ImageRegistry::new();
        let set = ChannelSet::single(g.socket("bsdf", "base_color").unwrap());

        let r = resolve_channels(&g, &set, &ResolverSettings::default(), &mut registry);
        assert_eq!(r.image_index, Some(0));
        assert_eq!(
            r.image,
            Some(ImageSource::Single {
                image: "albedo".to_string()
            })
        );
        assert!(!r.udim.udim);
    }

    #[test]
    fn equal_sizes_pack_into_one_image() {
        let g = orm(["r", "m", "a"])
            .image("r", image("r.png", 64, 64))
            .image("m", image("m.png", 64, 64))
            .image("a", image("a.png", 64, 64))
            .index();
        let mut registry = ImageRegistry::new();
        let r = resolve_channels(&g, &channels(&g), &ResolverSettings::default(), &mut registry);
        assert_eq!(r.image_index, Some(0));
        assert!(matches!(r.image, Some(ImageSource::Packed { ref channels }) if channels.len() == 3));
        assert!(r.layout.iter().all(ChannelSource::is_texture));

        // Same query registers the same logical image.
        let again = resolve_channels(&g, &channels(&g), &ResolverSettings::default(), &mut registry);
        assert_eq!(again.image_index, Some(0));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn mismatched_sizes_do_not_bind() {
        let g = orm(["r", "m", "a"])
            .image("r", image("r.png", 64, 64))
            .image("m", image("m.png", 32, 32))
            .image("a", image("a.png", 64, 64))
            .index();
        let mut registry = ImageRegistry::new();
        let r = resolve_channels(&g, &channels(&g), &ResolverSettings::default(), &mut registry);
        assert_eq!(r.image_index, None);
        assert!(!r.udim.udim);
        assert!(registry.is_empty());

        let relaxed = ResolverSettings {
            require_same_size: false,
            ..Default::default()
        };
        let r = resolve_channels(&g, &channels(&g), &relaxed, &mut registry);
        assert_eq!(r.image_index, Some(0));
    }

    #[test]
    fn udim_tiles_group_into_one_record() {
        let g = orm(["skin_a", "skin_b", "skin_a"])
            .image("skin_a", tiled_image("skin.<UDIM>.png", &[1001, 1002]))
            .image("skin_b", tiled_image("skin.<UDIM>.png", &[1002, 1001]))
            .index();
        let mut registry = ImageRegistry::new();
        let r = resolve_channels(&g, &channels(&g), &ResolverSettings::default(), &mut registry);
        assert_eq!(r.image_index, Some(0));
        assert!(r.udim.udim);
        assert_eq!(r.udim.image.as_deref(), Some("skin_a"));
        assert_eq!(
            r.image,
            Some(ImageSource::Udim {
                name: "skin.<UDIM>.png".to_string(),
                tiles: vec![1001, 1002],
                images: vec!["skin_a".to_string(), "skin_b".to_string()],
            })
        );
    }

    #[test]
    fn udim_tile_sets_must_match() {
        let g = orm(["skin_a", "skin_b", "skin_a"])
            .image("skin_a", tiled_image("skin.<UDIM>.png", &[1001, 1002]))
            .image("skin_b", tiled_image("skin.<UDIM>.png", &[1001]))
            .index();
        let r = resolve_channels(&g, &channels(&g), &ResolverSettings::default(), &mut ImageRegistry::new());
        assert_eq!(r.image_index, None);
        assert!(r.udim.udim);
        assert_eq!(r.udim.image.as_deref(), Some("skin_a"));

        let flat = ResolverSettings {
            udim: false,
            ..Default::default()
        };
        let r = resolve_channels(&g, &channels(&g), &flat, &mut ImageRegistry::new());
        assert!(!r.udim.udim);
        assert!(matches!(r.image, Some(ImageSource::Packed { .. })));
    }

    #[test]
    fn defaults_fill_untextured_slots() {
        let g = material(
            vec![
                node("tex", "ImageTexture", json!({"image": "rough"})),
                node("bsdf", "PrincipledBSDF", json!({"metallic": 0.25})),
            ],
            vec![conn("tex", "color", "bsdf", "roughness")],
        )
        .image("rough", image("rough.png", 16, 16))
        .index();
        let set = ChannelSet::new(vec![
            g.socket("bsdf", "roughness"),
            g.socket("bsdf", "metallic"),
            None,
        ])
        .with_defaults(vec![
            None,
            Some(ChannelDefault::Socket(g.socket("bsdf", "metallic").unwrap())),
            None,
        ]);

        let r = resolve_channels(&g, &set, &ResolverSettings::default(), &mut ImageRegistry::new());
        assert_eq!(r.image_index, Some(0));
        assert_eq!(
            r.layout,
            vec![
                ChannelSource::Texture {
                    image: "rough".to_string(),
                    source_channel: 0
                },
                ChannelSource::Constant(SocketValue::Scalar(0.25)),
                ChannelSource::Unresolved,
            ]
        );
        assert!(matches!(r.image, Some(ImageSource::Packed { .. })));
    }

    #[test]
    fn source_channels_follow_separate_color_and_alpha() {
        let g = material(
            vec![
                node("tex", "ImageTexture", json!({"image": "orm"})),
                node("sep", "SeparateColor", json!({})),
                node("bsdf", "PrincipledBSDF", json!({})),
            ],
            vec![
                conn("tex", "color", "sep", "color"),
                conn("sep", "g", "bsdf", "roughness"),
                conn("sep", "b", "bsdf", "metallic"),
                conn("tex", "alpha", "bsdf", "alpha"),
            ],
        )
        .image("orm", image("orm.png", 16, 16))
        .index();

        let r = resolve_channels(&g, &channels(&g), &ResolverSettings::default(), &mut ImageRegistry::new());
        let picked: Vec<u8> = r
            .layout
            .iter()
            .map(|c| match c {
                ChannelSource::Texture { source_channel, .. } => *source_channel,
                _ => u8::MAX,
            })
            .collect();
        assert_eq!(picked, [1, 2, 3]);
        assert!(matches!(r.image, Some(ImageSource::Packed { .. })));
    }
}
