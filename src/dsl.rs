use std::collections::{BTreeMap, HashMap};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::schema;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MaterialDSL {
    pub version: String,
    pub metadata: Metadata,
    pub nodes: Vec<Node>,
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub groups: Vec<GroupDSL>,
    /// Image table keyed by image id; `ImageTexture.params.image` refers to these ids.
    #[serde(default)]
    pub images: BTreeMap<String, ImageEntry>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Metadata {
    pub name: String,
    pub created: Option<String>,
    pub modified: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub params: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Connection {
    pub id: String,
    pub from: Endpoint,
    pub to: Endpoint,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct Endpoint {
    #[serde(rename = "nodeId")]
    pub node_id: String,
    #[serde(rename = "portId")]
    pub port_id: String,
}

/// A reusable node-group definition. Instances are `Group` nodes with `params.groupId`.
///
/// The group talks to its instances through a `GroupInput` node (its outputs mirror the
/// instance's inputs) and a `GroupOutput` node (its inputs mirror the instance's outputs).
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GroupDSL {
    pub id: String,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ImageSourceKind {
    #[default]
    Single,
    Tiled,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ImageEntry {
    pub name: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub source: ImageSourceKind,
    /// UDIM tile numbers (1001, 1002, ...). Only meaningful for tiled images.
    #[serde(default)]
    pub tiles: Vec<u32>,
    #[serde(default, rename = "dataUrl")]
    pub data_url: Option<String>,
    #[serde(default, rename = "assetId")]
    pub asset_id: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

pub fn load_material_from_path(path: impl AsRef<std::path::Path>) -> Result<MaterialDSL> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read material json at {}", path.display()))?;
    load_material_from_str(&text)
        .with_context(|| format!("failed to load material from {}", path.display()))
}

pub fn load_material_from_str(text: &str) -> Result<MaterialDSL> {
    let mut material: MaterialDSL =
        serde_json::from_str(text).context("failed to parse material json")?;

    // Normalize params with defaults from the bundled node scheme.
    // This keeps hand-written graphs compatible when nodes omit parameters.
    normalize_material_defaults(&mut material)?;

    Ok(material)
}

pub fn normalize_material_defaults(material: &mut MaterialDSL) -> Result<()> {
    let scheme = schema::load_default_scheme()?;
    apply_node_default_params(&mut material.nodes, &scheme);
    for group in &mut material.groups {
        apply_node_default_params(&mut group.nodes, &scheme);
    }
    Ok(())
}

fn apply_node_default_params(nodes: &mut [Node], scheme: &schema::NodeScheme) {
    for node in nodes {
        let Some(node_scheme) = scheme.nodes.get(&node.node_type) else {
            continue;
        };
        if node_scheme.default_params.is_empty() {
            continue;
        }

        let mut merged = node_scheme.default_params.clone();
        for (k, v) in std::mem::take(&mut node.params) {
            merged.insert(k, v);
        }
        node.params = merged;
    }
}

/// First connection driving `to_node_id.to_port_id`. Inputs accept a single link; extra
/// links into the same input are ignored.
pub fn incoming_connection<'a>(
    connections: &'a [Connection],
    to_node_id: &str,
    to_port_id: &str,
) -> Option<&'a Connection> {
    connections
        .iter()
        .find(|c| c.to.node_id == to_node_id && c.to.port_id == to_port_id)
}

pub fn parse_f32(params: &HashMap<String, serde_json::Value>, key: &str) -> Option<f32> {
    params.get(key).and_then(value_as_f32)
}

pub fn parse_str<'a>(params: &'a HashMap<String, serde_json::Value>, key: &str) -> Option<&'a str> {
    params.get(key).and_then(|v| v.as_str())
}

/// Numeric array param (`[x, y, z]`, `[r, g, b, a]`) or an `{x, y, z}` object.
pub fn parse_vec(params: &HashMap<String, serde_json::Value>, key: &str) -> Option<Vec<f32>> {
    params.get(key).and_then(value_as_vec)
}

pub(crate) fn value_as_f32(v: &serde_json::Value) -> Option<f32> {
    v.as_f64()
        .map(|x| x as f32)
        .or_else(|| v.as_u64().map(|x| x as f32))
        .or_else(|| v.as_i64().map(|x| x as f32))
}

pub(crate) fn value_as_vec(v: &serde_json::Value) -> Option<Vec<f32>> {
    if let Some(items) = v.as_array() {
        return items.iter().map(value_as_f32).collect();
    }
    let obj = v.as_object()?;
    let mut out = Vec::with_capacity(4);
    for key in ["x", "y", "z", "w"] {
        match obj.get(key) {
            Some(c) => out.push(value_as_f32(c)?),
            None => break,
        }
    }
    if out.is_empty() { None } else { Some(out) }
}
