//! Closed set of node kinds the resolver understands.

use crate::dsl::{Node, parse_str};

/// Input port of a reroute node.
pub const REROUTE_INPUT: &str = "input";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureExtension {
    Repeat,
    Extend,
    Clip,
    Mirror,
}

impl TextureExtension {
    fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "extend" => Self::Extend,
            "clip" => Self::Clip,
            "mirror" => Self::Mirror,
            _ => Self::Repeat,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MappingVectorType {
    Point,
    Texture,
    Vector,
    Normal,
}

impl MappingVectorType {
    fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "texture" => Self::Texture,
            "vector" => Self::Vector,
            "normal" => Self::Normal,
            _ => Self::Point,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttributeType {
    Geometry,
    Object,
    Instancer,
    ViewLayer,
}

impl AttributeType {
    fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "object" => Self::Object,
            "instancer" => Self::Instancer,
            "view_layer" | "viewlayer" => Self::ViewLayer,
            _ => Self::Geometry,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlendType {
    Mix,
    Multiply,
    Add,
    Other,
}

impl BlendType {
    fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "mix" => Self::Mix,
            "multiply" => Self::Multiply,
            "add" => Self::Add,
            _ => Self::Other,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MixDataType {
    Float,
    Vector,
    Rgba,
}

impl MixDataType {
    fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "float" => Self::Float,
            "vector" => Self::Vector,
            _ => Self::Rgba,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MathOperation {
    PingPong,
    Wrap,
    Other,
}

impl MathOperation {
    fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "pingpong" | "ping_pong" => Self::PingPong,
            "wrap" => Self::Wrap,
            _ => Self::Other,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ShaderNode {
    ImageTexture {
        image: Option<String>,
        extension: TextureExtension,
    },
    Mapping {
        vector_type: MappingVectorType,
    },
    UvMap {
        uv_map: Option<String>,
    },
    Attribute {
        attribute_type: AttributeType,
        name: Option<String>,
    },
    /// `legacy` marks the older MixRGB node (`fac`/`color1`/`color2`).
    Mix {
        blend: BlendType,
        data_type: MixDataType,
        legacy: bool,
    },
    NormalMap,
    SeparateXyz,
    CombineXyz,
    Math {
        operation: MathOperation,
    },
    SeparateColor,
    Reroute,
    GroupInput,
    GroupOutput,
    Group {
        group_id: String,
    },
    Other {
        node_type: String,
    },
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl ShaderNode {
    pub fn from_dsl(node: &Node) -> Self {
        let p = &node.params;
        match node.node_type.as_str() {
            "ImageTexture" => ShaderNode::ImageTexture {
                image: non_empty(parse_str(p, "image")),
                extension: TextureExtension::parse(parse_str(p, "extension").unwrap_or("repeat")),
            },
            "Mapping" => ShaderNode::Mapping {
                vector_type: MappingVectorType::parse(parse_str(p, "vectorType").unwrap_or("point")),
            },
            "UVMap" => ShaderNode::UvMap {
                uv_map: non_empty(parse_str(p, "uvMap")),
            },
            "Attribute" => ShaderNode::Attribute {
                attribute_type: AttributeType::parse(
                    parse_str(p, "attributeType").unwrap_or("geometry"),
                ),
                name: non_empty(parse_str(p, "attributeName")),
            },
            "Mix" => ShaderNode::Mix {
                blend: BlendType::parse(parse_str(p, "blendType").unwrap_or("mix")),
                data_type: MixDataType::parse(parse_str(p, "dataType").unwrap_or("rgba")),
                legacy: false,
            },
            "MixRGB" => ShaderNode::Mix {
                blend: BlendType::parse(parse_str(p, "blendType").unwrap_or("mix")),
                data_type: MixDataType::Rgba,
                legacy: true,
            },
            "NormalMap" => ShaderNode::NormalMap,
            "SeparateXYZ" => ShaderNode::SeparateXyz,
            "CombineXYZ" => ShaderNode::CombineXyz,
            "Math" => ShaderNode::Math {
                operation: MathOperation::parse(parse_str(p, "operation").unwrap_or("add")),
            },
            "SeparateColor" | "SeparateRGB" => ShaderNode::SeparateColor,
            "Reroute" => ShaderNode::Reroute,
            "GroupInput" => ShaderNode::GroupInput,
            "GroupOutput" => ShaderNode::GroupOutput,
            "Group" => ShaderNode::Group {
                group_id: parse_str(p, "groupId").unwrap_or_default().to_string(),
            },
            other => ShaderNode::Other {
                node_type: other.to_string(),
            },
        }
    }

    /// `(factor, a, b)` input ports of a mix node.
    pub fn mix_ports(&self) -> Option<(&'static str, &'static str, &'static str)> {
        match self {
            ShaderNode::Mix { legacy: false, .. } => Some(("factor", "a", "b")),
            ShaderNode::Mix { legacy: true, .. } => Some(("fac", "color1", "color2")),
            _ => None,
        }
    }

    pub fn is_texture_with_image(&self) -> bool {
        matches!(self, ShaderNode::ImageTexture { image: Some(_), .. })
    }
}
