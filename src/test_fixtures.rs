//! Graph builders shared by unit tests.

use std::collections::BTreeMap;

use crate::dsl::{Connection, Endpoint, GroupDSL, ImageEntry, ImageSourceKind, MaterialDSL, Metadata, Node};
use crate::shader_graph::GraphIndex;

pub(crate) fn node(id: &str, node_type: &str, params: serde_json::Value) -> Node {
    Node {
        id: id.to_string(),
        node_type: node_type.to_string(),
        params: params
            .as_object()
            .cloned()
            .map(|m| m.into_iter().collect())
            .unwrap_or_default(),
    }
}

pub(crate) fn conn(from_node: &str, from_port: &str, to_node: &str, to_port: &str) -> Connection {
    Connection {
        id: format!("{from_node}.{from_port}->{to_node}.{to_port}"),
        from: Endpoint {
            node_id: from_node.to_string(),
            port_id: from_port.to_string(),
        },
        to: Endpoint {
            node_id: to_node.to_string(),
            port_id: to_port.to_string(),
        },
    }
}

pub(crate) fn group(id: &str, nodes: Vec<Node>, connections: Vec<Connection>) -> GroupDSL {
    GroupDSL {
        id: id.to_string(),
        nodes,
        connections,
    }
}

pub(crate) fn image(name: &str, width: u32, height: u32) -> ImageEntry {
    ImageEntry {
        name: name.to_string(),
        width: Some(width),
        height: Some(height),
        ..Default::default()
    }
}

pub(crate) fn tiled_image(name: &str, tiles: &[u32]) -> ImageEntry {
    ImageEntry {
        name: name.to_string(),
        width: Some(1024),
        height: Some(1024),
        source: ImageSourceKind::Tiled,
        tiles: tiles.to_vec(),
        ..Default::default()
    }
}

pub(crate) struct MaterialBuilder {
    material: MaterialDSL,
}

pub(crate) fn material(nodes: Vec<Node>, connections: Vec<Connection>) -> MaterialBuilder {
    MaterialBuilder {
        material: MaterialDSL {
            version: "1.0".to_string(),
            metadata: Metadata {
                name: "test".to_string(),
                created: None,
                modified: None,
            },
            nodes,
            connections,
            groups: Vec::new(),
            images: BTreeMap::new(),
        },
    }
}

impl MaterialBuilder {
    pub(crate) fn group(mut self, group: GroupDSL) -> Self {
        self.material.groups.push(group);
        self
    }

    pub(crate) fn image(mut self, id: &str, entry: ImageEntry) -> Self {
        self.material.images.insert(id.to_string(), entry);
        self
    }

    pub(crate) fn build(mut self) -> MaterialDSL {
        crate::dsl::normalize_material_defaults(&mut self.material).unwrap();
        self.material
    }

    pub(crate) fn index(self) -> GraphIndex {
        GraphIndex::from_material(&self.build()).unwrap()
    }
}
