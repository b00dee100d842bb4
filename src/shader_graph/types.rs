use std::hash::{Hash, Hasher};

/// Opaque node identity handed out by a [`super::ShaderGraph`] implementation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle(pub(crate) u32);

impl NodeHandle {
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A port on a node, seen from a specific position in the group nesting.
///
/// `group_path` lists the group-instance nodes entered to reach `node`, outermost first.
/// Two sockets are the same socket only if all three parts match; structurally similar
/// sockets on different nodes never compare equal.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NodeSocket {
    pub node: NodeHandle,
    pub port: String,
    pub group_path: Vec<NodeHandle>,
}

impl NodeSocket {
    pub fn new(node: NodeHandle, port: impl Into<String>) -> Self {
        Self {
            node,
            port: port.into(),
            group_path: Vec::new(),
        }
    }

    pub fn in_group(node: NodeHandle, port: impl Into<String>, group_path: Vec<NodeHandle>) -> Self {
        Self {
            node,
            port: port.into(),
            group_path,
        }
    }

    /// Another port of the same node, at the same nesting.
    pub fn sibling(&self, port: impl Into<String>) -> Self {
        Self {
            node: self.node,
            port: port.into(),
            group_path: self.group_path.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Scalar,
    Color,
    Vector,
}

/// Compile-time value of an unconnected input.
#[derive(Clone, Copy, Debug)]
pub enum SocketValue {
    Scalar(f32),
    Rgb([f32; 3]),
    Vector([f32; 3]),
}

impl SocketValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            SocketValue::Scalar(_) => ValueKind::Scalar,
            SocketValue::Rgb(_) => ValueKind::Color,
            SocketValue::Vector(_) => ValueKind::Vector,
        }
    }

    pub fn as_scalar(&self) -> Option<f32> {
        match self {
            SocketValue::Scalar(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_rgb(&self) -> Option<[f32; 3]> {
        match self {
            SocketValue::Rgb(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<[f32; 3]> {
        match self {
            SocketValue::Vector(v) => Some(*v),
            _ => None,
        }
    }

    fn bits(&self) -> (u8, [u32; 3]) {
        match self {
            SocketValue::Scalar(v) => (0, [v.to_bits(), 0, 0]),
            SocketValue::Rgb(c) => (1, c.map(f32::to_bits)),
            SocketValue::Vector(c) => (2, c.map(f32::to_bits)),
        }
    }
}

// Bitwise comparison keeps values usable inside cache keys.
impl PartialEq for SocketValue {
    fn eq(&self, other: &Self) -> bool {
        self.bits() == other.bits()
    }
}

impl Eq for SocketValue {}

impl Hash for SocketValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bits().hash(state);
    }
}

/// An entry of the image table as seen by the resolver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageInfo {
    pub id: String,
    pub name: String,
    /// Pixel size, when it could be determined.
    pub size: Option<[u32; 2]>,
    /// Sorted UDIM tile numbers; empty for single images.
    pub tiles: Vec<u32>,
}

impl ImageInfo {
    pub fn is_tiled(&self) -> bool {
        !self.tiles.is_empty()
    }
}
