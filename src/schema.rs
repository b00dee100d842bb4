use std::collections::HashMap;

use anyhow::{Result, anyhow, bail};
use serde::Deserialize;

use crate::dsl::{Connection, MaterialDSL, Node};

const DEFAULT_NODE_SCHEME_JSON: &str = include_str!("../assets/node-scheme.json");

/// Node types whose ports are defined per instance (by the group they reference).
const INSTANCE_DEFINED_PORT_TYPES: &[&str] = &["Group", "GroupInput", "GroupOutput"];

#[derive(Debug, Clone)]
pub struct NodeScheme {
    pub nodes: HashMap<String, NodeTypeScheme>,
}

#[derive(Debug, Clone, Deserialize)]
struct GeneratedNodeScheme {
    #[serde(rename = "schemaVersion")]
    #[allow(dead_code)]
    pub schema_version: u32,
    #[serde(rename = "generatedAt")]
    #[allow(dead_code)]
    pub generated_at: Option<String>,
    #[serde(default)]
    pub nodes: Vec<GeneratedNodeDef>,
}

#[derive(Debug, Clone, Deserialize)]
struct GeneratedNodeDef {
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub inputs: Vec<PortScheme>,
    #[serde(default)]
    pub outputs: Vec<PortScheme>,
    #[serde(rename = "defaultParams", default)]
    pub default_params: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PortScheme {
    pub id: String,
    #[serde(rename = "type")]
    pub port_type: PortType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortType {
    Float,
    Color,
    Vector,
    Shader,
    Any,
}

#[derive(Debug, Clone)]
pub struct NodeTypeScheme {
    pub category: Option<String>,
    /// Declared input ports, in socket order. Upstream searches visit inputs in this order.
    pub inputs: Vec<PortScheme>,
    pub outputs: Vec<PortScheme>,
    pub default_params: HashMap<String, serde_json::Value>,
}

impl NodeTypeScheme {
    pub fn input(&self, port_id: &str) -> Option<&PortScheme> {
        self.inputs.iter().find(|p| p.id == port_id)
    }

    pub fn output(&self, port_id: &str) -> Option<&PortScheme> {
        self.outputs.iter().find(|p| p.id == port_id)
    }
}

pub fn load_default_scheme() -> Result<NodeScheme> {
    let scheme: GeneratedNodeScheme = serde_json::from_str(DEFAULT_NODE_SCHEME_JSON)
        .map_err(|e| anyhow!("failed to parse assets/node-scheme.json: {e}"))?;
    let mut nodes: HashMap<String, NodeTypeScheme> = HashMap::new();
    for n in scheme.nodes {
        nodes.insert(
            n.node_type,
            NodeTypeScheme {
                category: n.category,
                inputs: n.inputs,
                outputs: n.outputs,
                default_params: n.default_params,
            },
        );
    }
    Ok(NodeScheme { nodes })
}

pub fn has_instance_defined_ports(node_type: &str) -> bool {
    INSTANCE_DEFINED_PORT_TYPES.contains(&node_type)
}

pub fn validate_material(material: &MaterialDSL) -> Result<()> {
    let scheme = load_default_scheme()?;
    validate_material_against(material, &scheme)
}

/// Checks every tree (root and group definitions) against the scheme.
///
/// Unknown node types are tolerated: they become opaque nodes for the resolver and only
/// get a warning. Dangling connections and undeclared ports on known types are errors.
pub fn validate_material_against(material: &MaterialDSL, scheme: &NodeScheme) -> Result<()> {
    let mut errors: Vec<String> = Vec::new();

    validate_tree("root", &material.nodes, &material.connections, scheme, &mut errors);
    for group in &material.groups {
        let label = format!("group '{}'", group.id);
        validate_tree(&label, &group.nodes, &group.connections, scheme, &mut errors);
    }

    for n in material.nodes.iter().chain(material.groups.iter().flat_map(|g| g.nodes.iter())) {
        if n.node_type != "Group" {
            continue;
        }
        match n.params.get("groupId").and_then(|v| v.as_str()) {
            Some(gid) if material.groups.iter().any(|g| g.id == gid) => {}
            Some(gid) => errors.push(format!("group node '{}' refers to missing group '{gid}'", n.id)),
            None => errors.push(format!("group node '{}' missing params.groupId", n.id)),
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        bail!(
            "material failed scheme validation ({} error(s)):\n- {}",
            errors.len(),
            errors.join("\n- ")
        )
    }
}

fn validate_tree(
    label: &str,
    nodes: &[Node],
    connections: &[Connection],
    scheme: &NodeScheme,
    errors: &mut Vec<String>,
) {
    let mut nodes_by_id: HashMap<&str, &Node> = HashMap::new();
    for n in nodes {
        if nodes_by_id.insert(n.id.as_str(), n).is_some() {
            errors.push(format!("{label}: duplicate node id '{}'", n.id));
        }
        if !scheme.nodes.contains_key(&n.node_type) {
            log::warn!(
                "[scheme] {label}: unknown node type '{}' ({}), treated as opaque",
                n.node_type,
                n.id
            );
        }
    }

    for c in connections {
        validate_connection(label, c, &nodes_by_id, scheme, errors);
    }
}

fn validate_connection(
    label: &str,
    c: &Connection,
    nodes_by_id: &HashMap<&str, &Node>,
    scheme: &NodeScheme,
    errors: &mut Vec<String>,
) {
    let Some(from_node) = nodes_by_id.get(c.from.node_id.as_str()).copied() else {
        errors.push(format!(
            "{label}: connection '{}' references missing from.nodeId '{}'",
            c.id, c.from.node_id
        ));
        return;
    };
    let Some(to_node) = nodes_by_id.get(c.to.node_id.as_str()).copied() else {
        errors.push(format!(
            "{label}: connection '{}' references missing to.nodeId '{}'",
            c.id, c.to.node_id
        ));
        return;
    };

    if let Some(from_scheme) = scheme.nodes.get(&from_node.node_type) {
        if !has_instance_defined_ports(&from_node.node_type)
            && from_scheme.output(&c.from.port_id).is_none()
        {
            errors.push(format!(
                "{label}: connection '{}' uses unknown from port '{}.{}' (type {})",
                c.id, c.from.node_id, c.from.port_id, from_node.node_type
            ));
        }
    }

    if let Some(to_scheme) = scheme.nodes.get(&to_node.node_type) {
        if !has_instance_defined_ports(&to_node.node_type)
            && to_scheme.input(&c.to.port_id).is_none()
        {
            errors.push(format!(
                "{label}: connection '{}' uses unknown to port '{}.{}' (type {})",
                c.id, c.to.node_id, c.to.port_id, to_node.node_type
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn material(value: serde_json::Value) -> MaterialDSL {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn bundled_scheme_declares_ordered_inputs() {
        let scheme = load_default_scheme().unwrap();
        let mapping = scheme.nodes.get("Mapping").unwrap();
        let ids: Vec<&str> = mapping.inputs.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["vector", "location", "rotation", "scale"]);
        assert_eq!(mapping.input("scale").unwrap().port_type, PortType::Vector);
    }

    #[test]
    fn rejects_unknown_ports_and_dangling_links() {
        let m = material(json!({
            "version": "1.0",
            "metadata": {"name": "m", "created": null, "modified": null},
            "nodes": [
                {"id": "tex", "type": "ImageTexture"},
                {"id": "bsdf", "type": "PrincipledBSDF"}
            ],
            "connections": [
                {"id": "c1", "from": {"nodeId": "tex", "portId": "colour"}, "to": {"nodeId": "bsdf", "portId": "base_color"}},
                {"id": "c2", "from": {"nodeId": "ghost", "portId": "color"}, "to": {"nodeId": "bsdf", "portId": "roughness"}}
            ]
        }));
        let err = validate_material(&m).unwrap_err().to_string();
        assert!(err.contains("2 error(s)"), "{err}");
        assert!(err.contains("tex.colour"));
        assert!(err.contains("ghost"));
    }

    #[test]
    fn tolerates_unknown_node_types_and_group_ports() {
        let m = material(json!({
            "version": "1.0",
            "metadata": {"name": "m", "created": null, "modified": null},
            "nodes": [
                {"id": "custom", "type": "VendorNoise"},
                {"id": "grp", "type": "Group", "params": {"groupId": "g"}},
                {"id": "bsdf", "type": "PrincipledBSDF"}
            ],
            "connections": [
                {"id": "c1", "from": {"nodeId": "custom", "portId": "fac"}, "to": {"nodeId": "grp", "portId": "anything"}},
                {"id": "c2", "from": {"nodeId": "grp", "portId": "out"}, "to": {"nodeId": "bsdf", "portId": "roughness"}}
            ],
            "groups": [{"id": "g", "nodes": [], "connections": []}]
        }));
        validate_material(&m).unwrap();
    }

    #[test]
    fn rejects_group_nodes_without_definition() {
        let m = material(json!({
            "version": "1.0",
            "metadata": {"name": "m", "created": null, "modified": null},
            "nodes": [{"id": "grp", "type": "Group", "params": {"groupId": "missing"}}],
            "connections": []
        }));
        let err = validate_material(&m).unwrap_err().to_string();
        assert!(err.contains("missing group 'missing'"), "{err}");
    }
}
