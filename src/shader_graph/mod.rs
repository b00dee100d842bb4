//! Read-only view of a material node graph.
//!
//! - `types`: socket/node identities, socket values, image table entries
//! - `node`: the closed [`ShaderNode`] kind set
//! - `index`: [`GraphIndex`], the DSL-backed implementation of [`ShaderGraph`]
//! - `walk`: backward walks, upstream searches and constant extraction

pub mod index;
pub mod node;
pub mod types;
pub mod walk;

pub use index::GraphIndex;
pub use node::{
    AttributeType, BlendType, MappingVectorType, MathOperation, MixDataType, ShaderNode,
    TextureExtension,
};
pub use types::{ImageInfo, NodeHandle, NodeSocket, SocketValue, ValueKind};
pub use walk::{
    Link, constant, find_upstream, previous, previous_socket, search_upstream,
    texture_node_from_socket,
};

/// Adjacency queries the resolver needs from the host graph. Implementations never hand
/// out mutable access; all resolver code is a pure function of these answers.
pub trait ShaderGraph {
    fn node(&self, handle: NodeHandle) -> Option<&ShaderNode>;

    /// Input ports of `handle`, in socket order.
    fn input_ports(&self, handle: NodeHandle) -> Vec<&str>;

    /// Output socket `(node, port)` linked into `handle.port`, within the same tree.
    fn link(&self, handle: NodeHandle, port: &str) -> Option<(NodeHandle, &str)>;

    /// Inline value of `handle.port`, meaningful only while the input is unlinked.
    fn default_value(&self, handle: NodeHandle, port: &str) -> Option<SocketValue>;

    /// The `GroupOutput` node inside the group instantiated by `group_node`.
    fn group_output(&self, group_node: NodeHandle) -> Option<NodeHandle>;

    fn image(&self, image_id: &str) -> Option<&ImageInfo>;
}
