//! Backward traversal over a [`ShaderGraph`].
//!
//! Walks start at an input socket and move against link direction. Reroutes and group
//! boundaries are pass-through: callers only ever see the nodes that compute something,
//! together with the group path they live at.

use std::collections::HashSet;

use super::{NodeHandle, NodeSocket, ShaderGraph, ShaderNode, SocketValue, ValueKind, node::REROUTE_INPUT};

/// The producing side of a link: a non-pass-through node and the output socket used.
#[derive(Clone, Debug)]
pub struct Link<'g> {
    pub node: &'g ShaderNode,
    pub output: NodeSocket,
}

impl Link<'_> {
    pub fn handle(&self) -> NodeHandle {
        self.output.node
    }

    pub fn group_path(&self) -> &[NodeHandle] {
        &self.output.group_path
    }

    /// Input `port` of the producing node, at the producer's nesting.
    pub fn input(&self, port: &str) -> NodeSocket {
        self.output.sibling(port)
    }
}

/// Output socket feeding `socket`, after skipping reroutes and group boundaries.
/// `None` when the input is unlinked or the walk leaves the root tree.
pub fn previous_socket<G: ShaderGraph + ?Sized>(graph: &G, socket: &NodeSocket) -> Option<NodeSocket> {
    let (mut node, port) = graph.link(socket.node, &socket.port)?;
    let mut port = port.to_string();
    let mut path = socket.group_path.clone();

    loop {
        match graph.node(node)? {
            ShaderNode::Reroute => {
                let (n, p) = graph.link(node, REROUTE_INPUT)?;
                node = n;
                port = p.to_string();
            }
            ShaderNode::Group { .. } => {
                let inner = graph.group_output(node)?;
                path.push(node);
                let (n, p) = graph.link(inner, &port)?;
                node = n;
                port = p.to_string();
            }
            ShaderNode::GroupInput => {
                // Root-level group inputs have no instance to unwind to.
                let instance = path.pop()?;
                let (n, p) = graph.link(instance, &port)?;
                node = n;
                port = p.to_string();
            }
            _ => return Some(NodeSocket::in_group(node, port, path)),
        }
    }
}

pub fn previous<'g, G: ShaderGraph + ?Sized>(graph: &'g G, socket: &NodeSocket) -> Option<Link<'g>> {
    let output = previous_socket(graph, socket)?;
    let node = graph.node(output.node)?;
    Some(Link { node, output })
}

/// All producers upstream of `socket` accepted by `filter`, depth first in input order.
///
/// Each node (at a given group path) is visited once even when several paths reach it.
pub fn search_upstream<'g, G, F>(graph: &'g G, socket: &NodeSocket, filter: F) -> Vec<Link<'g>>
where
    G: ShaderGraph + ?Sized,
    F: Fn(&ShaderNode) -> bool,
{
    let mut found = Vec::new();
    walk_upstream(graph, socket, &filter, |link| {
        found.push(link);
        true
    });
    found
}

/// First producer upstream of `socket` accepted by `filter`.
pub fn find_upstream<'g, G, F>(graph: &'g G, socket: &NodeSocket, filter: F) -> Option<Link<'g>>
where
    G: ShaderGraph + ?Sized,
    F: Fn(&ShaderNode) -> bool,
{
    let mut found = None;
    walk_upstream(graph, socket, &filter, |link| {
        found = Some(link);
        false
    });
    found
}

fn walk_upstream<'g, G, F, V>(graph: &'g G, socket: &NodeSocket, filter: &F, mut visit: V)
where
    G: ShaderGraph + ?Sized,
    F: Fn(&ShaderNode) -> bool,
    V: FnMut(Link<'g>) -> bool,
{
    let mut seen: HashSet<(NodeHandle, Vec<NodeHandle>)> = HashSet::new();
    let mut stack: Vec<NodeSocket> = vec![socket.clone()];

    while let Some(input) = stack.pop() {
        let Some(link) = previous(graph, &input) else {
            continue;
        };
        if !seen.insert((link.handle(), link.group_path().to_vec())) {
            continue;
        }

        let ports = graph.input_ports(link.handle());
        for port in ports.iter().rev() {
            stack.push(link.input(port));
        }

        if filter(link.node) && !visit(link) {
            return;
        }
    }
}

/// The image texture that `socket` samples from, if any.
pub fn texture_node_from_socket<'g, G: ShaderGraph + ?Sized>(
    graph: &'g G,
    socket: &NodeSocket,
) -> Option<Link<'g>> {
    find_upstream(graph, socket, ShaderNode::is_texture_with_image)
}

/// Inline value of an unlinked input, if it has the requested shape.
pub fn constant<G: ShaderGraph + ?Sized>(graph: &G, socket: &NodeSocket, kind: ValueKind) -> Option<SocketValue> {
    if graph.link(socket.node, &socket.port).is_some() {
        return None;
    }
    let value = graph.default_value(socket.node, &socket.port)?;
    (value.kind() == kind).then_some(value)
}
