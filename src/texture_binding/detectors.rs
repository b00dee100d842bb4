//! Sub-pattern recognizers. Every detector is total: an unexpected shape yields `None`.

use crate::shader_graph::{
    AttributeType, BlendType, Link, MappingVectorType, MathOperation, MixDataType, NodeSocket,
    ShaderGraph, ShaderNode, ValueKind, constant, find_upstream, previous,
    texture_node_from_socket,
};

use super::{ResolverSettings, SamplerWrap, TextureTransform, UvConvention, UvSource, WrapMode};

const TRS_EPSILON: f32 = 1e-5;

/// UV-side findings for the texture behind a primary socket.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UvDetection {
    pub transform: Option<TextureTransform>,
    pub source: UvSource,
    pub wrap: Option<SamplerWrap>,
}

/// Recognizes `SeparateXYZ -> [Math PINGPONG | Math WRAP | nothing] per axis -> CombineXYZ`
/// feeding `vector`. Returns the per-axis wrap and the socket the UV walk continues from.
pub fn detect_manual_wrap<G: ShaderGraph + ?Sized>(
    graph: &G,
    vector: &NodeSocket,
) -> Option<(SamplerWrap, NodeSocket)> {
    let combine = previous(graph, vector)?;
    if !matches!(combine.node, ShaderNode::CombineXyz) {
        return None;
    }

    let (wrap_s, sep_s) = wrapped_axis(graph, &combine.input("x"), "x")?;
    let (wrap_t, sep_t) = wrapped_axis(graph, &combine.input("y"), "y")?;
    if sep_s.handle() != sep_t.handle() || sep_s.group_path() != sep_t.group_path() {
        log::debug!("[texture-binding] manual wrap axes come from different SeparateXYZ nodes");
        return None;
    }

    Some((SamplerWrap { wrap_s, wrap_t }, sep_s.input("vector")))
}

fn wrapped_axis<'g, G: ShaderGraph + ?Sized>(
    graph: &'g G,
    axis: &NodeSocket,
    component: &str,
) -> Option<(WrapMode, Link<'g>)> {
    let link = previous(graph, axis)?;
    let scalar = |port: &str| constant(graph, &link.input(port), ValueKind::Scalar).and_then(|v| v.as_scalar());

    let (mode, separate) = match link.node {
        ShaderNode::SeparateXyz => (WrapMode::ClampToEdge, link.clone()),
        ShaderNode::Math {
            operation: MathOperation::PingPong,
        } if scalar("b") == Some(1.0) => (WrapMode::MirroredRepeat, previous(graph, &link.input("a"))?),
        ShaderNode::Math {
            operation: MathOperation::Wrap,
        } if scalar("b") == Some(1.0) && scalar("c") == Some(0.0) => {
            (WrapMode::Repeat, previous(graph, &link.input("a"))?)
        }
        _ => return None,
    };

    if !matches!(separate.node, ShaderNode::SeparateXyz) || separate.output.port != component {
        return None;
    }
    Some((mode, separate))
}

/// UV source and transform for the texture `primary` samples. The transform node is
/// consumed first; the source is classified from whatever feeds the transform.
pub fn detect_uv<G: ShaderGraph + ?Sized>(
    graph: &G,
    primary: &NodeSocket,
    settings: &ResolverSettings,
) -> UvDetection {
    let Some(texture) = texture_node_from_socket(graph, primary) else {
        return UvDetection::default();
    };

    let mut socket = texture.input("vector");
    let wrap = match detect_manual_wrap(graph, &socket) {
        Some((wrap, next)) => {
            socket = next;
            Some(wrap)
        }
        None => None,
    };

    let mut transform = None;
    if let Some(mapping) = previous(graph, &socket) {
        if let ShaderNode::Mapping { vector_type } = mapping.node {
            transform = mapping_transform(graph, &mapping, *vector_type, settings);
            socket = mapping.input("vector");
        }
    }

    UvDetection {
        transform,
        source: classify_uv_source(previous(graph, &socket)),
        wrap,
    }
}

fn classify_uv_source(link: Option<Link<'_>>) -> UvSource {
    let Some(link) = link else {
        return UvSource::Active;
    };
    match link.node {
        ShaderNode::UvMap { uv_map: Some(name) } => UvSource::Fixed(name.clone()),
        ShaderNode::Attribute {
            attribute_type: AttributeType::Geometry,
            name: Some(name),
        } => UvSource::Attribute(name.clone()),
        _ => UvSource::Active,
    }
}

/// Offset/rotation/scale of a mapping node, in interchange terms.
pub fn mapping_transform<G: ShaderGraph + ?Sized>(
    graph: &G,
    mapping: &Link<'_>,
    vector_type: MappingVectorType,
    settings: &ResolverSettings,
) -> Option<TextureTransform> {
    if vector_type == MappingVectorType::Normal {
        log::warn!("[texture-binding] mapping node of type 'normal' is not exportable as a UV transform");
        return None;
    }

    let vector = |port: &str| constant(graph, &mapping.input(port), ValueKind::Vector).and_then(|v| v.as_vector());
    let location = vector("location")?;
    let rotation = vector("rotation")?;
    let scale = vector("scale")?;

    let mut t = TextureTransform {
        offset: match vector_type {
            MappingVectorType::Vector => [0.0, 0.0],
            _ => [location[0], location[1]],
        },
        rotation: rotation[2],
        scale: [scale[0], scale[1]],
    };

    if vector_type == MappingVectorType::Texture {
        let Some(inverse) = invert_transform(&t) else {
            log::warn!("[texture-binding] texture-space mapping has no TRS inverse, transform dropped");
            return None;
        };
        t = inverse;
    }

    if settings.uv_convention == UvConvention::BottomLeft {
        t = bottom_left_to_interchange(&t);
    }
    Some(t)
}

/// Inverse of a TRS transform, when it is itself a TRS.
pub fn invert_transform(t: &TextureTransform) -> Option<TextureTransform> {
    let [ox, oy] = t.offset;
    let [sx, sy] = t.scale;
    let r = t.rotation;

    if r.abs() > TRS_EPSILON && (sx - sy).abs() > TRS_EPSILON {
        return None;
    }
    if sx.abs() < TRS_EPSILON || sy.abs() < TRS_EPSILON {
        return None;
    }

    let (sin, cos) = r.sin_cos();
    Some(TextureTransform {
        offset: [(-cos * ox - sin * oy) / sx, (sin * ox - cos * oy) / sy],
        rotation: -r,
        scale: [1.0 / sx, 1.0 / sy],
    })
}

pub fn bottom_left_to_interchange(t: &TextureTransform) -> TextureTransform {
    let [ox, oy] = t.offset;
    let sy = t.scale[1];
    let (sin, cos) = t.rotation.sin_cos();
    TextureTransform {
        offset: [ox - sy * sin, 1.0 - oy - sy * cos],
        rotation: t.rotation,
        scale: t.scale,
    }
}

/// Strength of the first normal-map node upstream of `primary`, unless it is the default.
pub fn detect_normal_scale<G: ShaderGraph + ?Sized>(graph: &G, primary: &NodeSocket) -> Option<f32> {
    let normal_map = find_upstream(graph, primary, |n| matches!(n, ShaderNode::NormalMap))?;
    let strength = constant(graph, &normal_map.input("strength"), ValueKind::Scalar)?.as_scalar()?;
    (strength != 1.0).then_some(strength)
}

/// Strength encoded by a mix-toward-white directly in front of `primary`.
///
/// `mix(f, white, tex)` yields `f`; `mix(f, tex, white)` yields `1 - f`.
pub fn detect_occlusion_strength<G: ShaderGraph + ?Sized>(graph: &G, primary: &NodeSocket) -> Option<f32> {
    let mix = previous(graph, primary)?;
    let (factor_port, a_port, b_port) = match mix.node {
        ShaderNode::Mix {
            blend: BlendType::Mix,
            data_type,
            legacy,
        } if *legacy || *data_type == MixDataType::Rgba => mix.node.mix_ports()?,
        _ => return None,
    };

    let factor = constant(graph, &mix.input(factor_port), ValueKind::Scalar)?.as_scalar()?;
    let a = constant(graph, &mix.input(a_port), ValueKind::Color).and_then(|v| v.as_rgb());
    let b = constant(graph, &mix.input(b_port), ValueKind::Color).and_then(|v| v.as_rgb());

    let white = |c: [f32; 3]| c == [1.0, 1.0, 1.0];
    match (a, b) {
        (Some(a), None) if white(a) => Some(factor),
        (None, Some(b)) if white(b) => Some(1.0 - factor),
        _ => {
            log::debug!("[texture-binding] occlusion mix does not blend toward white, strength omitted");
            None
        }
    }
}
