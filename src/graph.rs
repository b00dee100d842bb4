use std::collections::{HashMap, VecDeque};

use anyhow::{Result, bail};

use crate::dsl::{Connection, MaterialDSL, Node};

/// Kahn's algorithm over string ids. Fails on dangling edges and on cycles.
pub fn topo_sort<'a>(node_ids: &[&'a str], edges: &[(&'a str, &'a str)]) -> Result<Vec<String>> {
    let mut indeg: HashMap<&str, usize> = node_ids.iter().map(|id| (*id, 0usize)).collect();

    let mut outgoing: HashMap<&str, Vec<&str>> = HashMap::new();
    for (from, to) in edges {
        let Some(d) = indeg.get_mut(to) else {
            bail!("edge references missing node: {from} -> {to}");
        };
        *d += 1;
        if !indeg.contains_key(from) {
            bail!("edge references missing node: {from} -> {to}");
        }
        outgoing.entry(from).or_default().push(to);
    }

    // Seed in declaration order so the result is stable.
    let mut q: VecDeque<&str> = node_ids
        .iter()
        .copied()
        .filter(|id| indeg.get(id) == Some(&0))
        .collect();
    let mut order: Vec<String> = Vec::with_capacity(node_ids.len());

    while let Some(n) = q.pop_front() {
        order.push(n.to_string());
        if let Some(nexts) = outgoing.get(n) {
            for m in nexts {
                if let Some(entry) = indeg.get_mut(m) {
                    *entry -= 1;
                    if *entry == 0 {
                        q.push_back(m);
                    }
                }
            }
        }
    }

    if order.len() != indeg.len() {
        bail!("cycle detected in graph (cannot topologically sort)");
    }
    Ok(order)
}

/// Topological order of one node tree (root or group definition).
pub fn tree_topo_sort(nodes: &[Node], connections: &[Connection]) -> Result<Vec<String>> {
    let ids: Vec<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
    let edges: Vec<(&str, &str)> = connections
        .iter()
        .map(|c| (c.from.node_id.as_str(), c.to.node_id.as_str()))
        .collect();
    topo_sort(&ids, &edges)
}

/// Order in which group definitions can be instantiated: a group comes after every group
/// it instantiates. Fails when groups (transitively) contain themselves.
pub fn group_dependency_order(material: &MaterialDSL) -> Result<Vec<String>> {
    let ids: Vec<&str> = material.groups.iter().map(|g| g.id.as_str()).collect();
    let mut edges: Vec<(&str, &str)> = Vec::new();
    for g in &material.groups {
        for n in &g.nodes {
            if n.node_type != "Group" {
                continue;
            }
            if let Some(inner) = n.params.get("groupId").and_then(|v| v.as_str()) {
                edges.push((inner, g.id.as_str()));
            }
        }
    }
    topo_sort(&ids, &edges).map_err(|e| anyhow::anyhow!("recursive node groups: {e}"))
}
