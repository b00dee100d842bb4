use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::{Context, Result, anyhow};

use crate::{
    asset_store::{self, AssetStore},
    dsl::{
        Connection, ImageSourceKind, MaterialDSL, Node, incoming_connection, load_material_from_path,
        value_as_f32, value_as_vec,
    },
    graph::{group_dependency_order, tree_topo_sort},
    image_probe::probe_image_dimensions,
    schema::{self, NodeScheme, PortType, has_instance_defined_ports},
};

use super::{ImageInfo, NodeHandle, NodeSocket, ShaderGraph, ShaderNode, SocketValue};

/// First tile of a UDIM set, used when a tiled image lists no tiles.
const UDIM_FIRST_TILE: u32 = 1001;

#[derive(Clone, Debug)]
struct InputSlot {
    port: String,
    link: Option<(NodeHandle, String)>,
    default: Option<SocketValue>,
}

#[derive(Clone, Debug)]
struct IndexedNode {
    id: String,
    kind: ShaderNode,
    inputs: Vec<InputSlot>,
}

#[derive(Clone, Debug)]
struct GroupTree {
    nodes: HashMap<String, NodeHandle>,
    output: Option<NodeHandle>,
}

/// Immutable, handle-based index over a [`MaterialDSL`].
///
/// Group definitions are indexed once; instances share the definition's node handles and
/// are told apart by the socket group path.
#[derive(Clone, Debug)]
pub struct GraphIndex {
    nodes: Vec<IndexedNode>,
    root: HashMap<String, NodeHandle>,
    groups: HashMap<String, GroupTree>,
    images: BTreeMap<String, ImageInfo>,
}

impl GraphIndex {
    /// Index with the bundled node scheme and no external image sources.
    pub fn from_material(material: &MaterialDSL) -> Result<Self> {
        let scheme = schema::load_default_scheme()?;
        Self::build(material, &scheme, None, None)
    }

    /// Load a material file and index it; image files are resolved next to the material.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let material = load_material_from_path(path)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let assets = asset_store::load_from_material_dir(&material, base_dir)?;
        let scheme = schema::load_default_scheme()?;
        Self::build(&material, &scheme, Some(&assets), Some(base_dir))
            .with_context(|| format!("failed to index material {}", path.display()))
    }

    pub fn build(
        material: &MaterialDSL,
        scheme: &NodeScheme,
        asset_store: Option<&AssetStore>,
        base_dir: Option<&Path>,
    ) -> Result<Self> {
        schema::validate_material_against(material, scheme)?;
        tree_topo_sort(&material.nodes, &material.connections).context("root node tree")?;
        for group in &material.groups {
            tree_topo_sort(&group.nodes, &group.connections)
                .with_context(|| format!("node group '{}'", group.id))?;
        }
        group_dependency_order(material)?;

        let mut images: BTreeMap<String, ImageInfo> = BTreeMap::new();
        for (id, entry) in &material.images {
            let tiles = match entry.source {
                ImageSourceKind::Single => Vec::new(),
                ImageSourceKind::Tiled => {
                    let mut tiles = entry.tiles.clone();
                    if tiles.is_empty() {
                        tiles.push(UDIM_FIRST_TILE);
                    }
                    tiles.sort_unstable();
                    tiles.dedup();
                    tiles
                }
            };
            images.insert(
                id.clone(),
                ImageInfo {
                    id: id.clone(),
                    name: entry.name.clone(),
                    size: probe_image_dimensions(entry, asset_store, base_dir),
                    tiles,
                },
            );
        }

        let mut index = GraphIndex {
            nodes: Vec::new(),
            root: HashMap::new(),
            groups: HashMap::new(),
            images,
        };

        index.root = index.add_tree(&material.nodes);
        let mut trees: Vec<(&str, HashMap<String, NodeHandle>)> = Vec::new();
        for group in &material.groups {
            let handles = index.add_tree(&group.nodes);
            trees.push((group.id.as_str(), handles));
        }

        let root_handles = index.root.clone();
        index.wire_tree(&material.nodes, &material.connections, &root_handles, scheme)?;
        for (group, (group_id, handles)) in material.groups.iter().zip(&trees) {
            index
                .wire_tree(&group.nodes, &group.connections, handles, scheme)
                .with_context(|| format!("node group '{group_id}'"))?;
        }

        for (group_id, handles) in trees {
            let output = group_output_handle(&index.nodes, &handles);
            index.groups.insert(
                group_id.to_string(),
                GroupTree {
                    nodes: handles,
                    output,
                },
            );
        }

        Ok(index)
    }

    fn add_tree(&mut self, nodes: &[Node]) -> HashMap<String, NodeHandle> {
        let mut handles = HashMap::new();
        for n in nodes {
            let handle = NodeHandle(self.nodes.len() as u32);
            let mut kind = ShaderNode::from_dsl(n);
            if let ShaderNode::ImageTexture { image, .. } = &mut kind {
                if image.as_ref().is_some_and(|id| !self.images.contains_key(id)) {
                    log::warn!(
                        "[graph-index] ImageTexture '{}' refers to unknown image '{}', treated as empty",
                        n.id,
                        image.as_deref().unwrap_or_default()
                    );
                    *image = None;
                }
            }
            self.nodes.push(IndexedNode {
                id: n.id.clone(),
                kind,
                inputs: Vec::new(),
            });
            handles.insert(n.id.clone(), handle);
        }
        handles
    }

    fn wire_tree(
        &mut self,
        nodes: &[Node],
        connections: &[Connection],
        handles: &HashMap<String, NodeHandle>,
        scheme: &NodeScheme,
    ) -> Result<()> {
        for n in nodes {
            let handle = handles
                .get(&n.id)
                .copied()
                .ok_or_else(|| anyhow!("internal: missing handle for node '{}'", n.id))?;
            let mut slots = Vec::new();
            for (port, ty) in declared_inputs(n, scheme, connections) {
                let link = match incoming_connection(connections, &n.id, &port) {
                    Some(c) => {
                        let from = handles.get(&c.from.node_id).copied().ok_or_else(|| {
                            anyhow!("connection '{}' references missing node '{}'", c.id, c.from.node_id)
                        })?;
                        Some((from, c.from.port_id.clone()))
                    }
                    None => None,
                };
                let default = n.params.get(&port).and_then(|v| parse_default(v, ty));
                slots.push(InputSlot {
                    port,
                    link,
                    default,
                });
            }
            self.nodes[handle.index()].inputs = slots;
        }
        Ok(())
    }

    /// Handle of a node in the root tree.
    pub fn handle(&self, node_id: &str) -> Option<NodeHandle> {
        self.root.get(node_id).copied()
    }

    /// DSL id of a node (unique within its own tree).
    pub fn node_id(&self, handle: NodeHandle) -> Option<&str> {
        self.nodes.get(handle.index()).map(|n| n.id.as_str())
    }

    /// Socket on a root-tree node.
    pub fn socket(&self, node_id: &str, port: &str) -> Option<NodeSocket> {
        self.handle(node_id).map(|h| NodeSocket::new(h, port))
    }

    /// Socket on a node nested inside group instances; `instance_path` lists the group node
    /// ids to enter, starting from the root tree.
    pub fn group_socket(&self, instance_path: &[&str], node_id: &str, port: &str) -> Option<NodeSocket> {
        let mut tree = &self.root;
        let mut path = Vec::with_capacity(instance_path.len());
        for instance_id in instance_path {
            let h = tree.get(*instance_id).copied()?;
            let ShaderNode::Group { group_id } = &self.nodes.get(h.index())?.kind else {
                return None;
            };
            tree = &self.groups.get(group_id)?.nodes;
            path.push(h);
        }
        let h = tree.get(node_id).copied()?;
        Some(NodeSocket::in_group(h, port, path))
    }

    pub fn images(&self) -> impl Iterator<Item = &ImageInfo> {
        self.images.values()
    }
}

impl ShaderGraph for GraphIndex {
    fn node(&self, handle: NodeHandle) -> Option<&ShaderNode> {
        self.nodes.get(handle.index()).map(|n| &n.kind)
    }

    fn input_ports(&self, handle: NodeHandle) -> Vec<&str> {
        self.nodes
            .get(handle.index())
            .map(|n| n.inputs.iter().map(|s| s.port.as_str()).collect())
            .unwrap_or_default()
    }

    fn link(&self, handle: NodeHandle, port: &str) -> Option<(NodeHandle, &str)> {
        let node = self.nodes.get(handle.index())?;
        let slot = node.inputs.iter().find(|s| s.port == port)?;
        slot.link.as_ref().map(|(h, p)| (*h, p.as_str()))
    }

    fn default_value(&self, handle: NodeHandle, port: &str) -> Option<SocketValue> {
        let node = self.nodes.get(handle.index())?;
        node.inputs.iter().find(|s| s.port == port)?.default
    }

    fn group_output(&self, group_node: NodeHandle) -> Option<NodeHandle> {
        let ShaderNode::Group { group_id } = &self.nodes.get(group_node.index())?.kind else {
            return None;
        };
        self.groups.get(group_id)?.output
    }

    fn image(&self, image_id: &str) -> Option<&ImageInfo> {
        self.images.get(image_id)
    }
}

fn group_output_handle(nodes: &[IndexedNode], handles: &HashMap<String, NodeHandle>) -> Option<NodeHandle> {
    // Several GroupOutput nodes are legal in a definition; the first declared one is active.
    handles
        .values()
        .copied()
        .filter(|h| matches!(nodes[h.index()].kind, ShaderNode::GroupOutput))
        .min()
}

/// Input ports of a node with their declared kinds. Known types use the scheme order;
/// instance-defined and unknown types expose the ports they are linked on, plus (for
/// group instances) any inline values.
fn declared_inputs(
    node: &Node,
    scheme: &NodeScheme,
    connections: &[Connection],
) -> Vec<(String, Option<PortType>)> {
    if let Some(s) = scheme.nodes.get(&node.node_type) {
        if !has_instance_defined_ports(&node.node_type) {
            return s
                .inputs
                .iter()
                .map(|p| (p.id.clone(), Some(p.port_type)))
                .collect();
        }
    }

    let mut ports: Vec<(String, Option<PortType>)> = Vec::new();
    for c in connections {
        if c.to.node_id == node.id && !ports.iter().any(|(p, _)| *p == c.to.port_id) {
            ports.push((c.to.port_id.clone(), None));
        }
    }
    if node.node_type == "Group" {
        let mut keys: Vec<&String> = node.params.keys().filter(|k| *k != "groupId").collect();
        keys.sort();
        for k in keys {
            if !ports.iter().any(|(p, _)| p == k) {
                ports.push((k.clone(), None));
            }
        }
    }
    ports
}

fn parse_default(value: &serde_json::Value, ty: Option<PortType>) -> Option<SocketValue> {
    match ty {
        Some(PortType::Float) => value_as_f32(value).map(SocketValue::Scalar),
        Some(PortType::Color) => rgb(value).map(SocketValue::Rgb),
        Some(PortType::Vector) => vector(value).map(SocketValue::Vector),
        Some(PortType::Shader) | Some(PortType::Any) => None,
        None => {
            if let Some(v) = value_as_f32(value) {
                return Some(SocketValue::Scalar(v));
            }
            match value_as_vec(value)?.len() {
                4 => rgb(value).map(SocketValue::Rgb),
                2 | 3 => vector(value).map(SocketValue::Vector),
                _ => None,
            }
        }
    }
}

fn rgb(value: &serde_json::Value) -> Option<[f32; 3]> {
    let v = value_as_vec(value)?;
    if v.len() < 3 {
        return None;
    }
    Some([v[0], v[1], v[2]])
}

fn vector(value: &serde_json::Value) -> Option<[f32; 3]> {
    let v = value_as_vec(value)?;
    match v.len() {
        0 | 1 => None,
        2 => Some([v[0], v[1], 0.0]),
        _ => Some([v[0], v[1], v[2]]),
    }
}
