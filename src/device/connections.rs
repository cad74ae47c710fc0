// src/device/connections.rs
//
// The device graph: a DAG of Devices joined by per-port edges. Rendering
// is a memoised evaluation rooted at the master sink, walking per-(device,
// port) edges rather than a flat node list with one input vector.
//
// Cycle detection runs once, at build time (`Connections::build`), via
// three-colour DFS -- the render path trusts the graph is acyclic and
// never re-checks.

use std::collections::HashMap;

use crate::device::{Device, DeviceId, DeviceKind};

#[derive(Debug, Clone, Copy)]
pub struct Edge {
    pub from_device: DeviceId,
    pub from_port: u8,
    pub to_port: u8,
}

#[derive(Debug, Clone, Default)]
pub struct DeviceNode {
    pub device_id: DeviceId,
    /// Incoming edges, grouped implicitly by `to_port` (callers filter).
    pub incoming: Vec<Edge>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionsError {
    UnknownDevice(DeviceId),
    NonexistentPort { device: DeviceId, port: u8, receive: bool },
    Cycle,
}

impl std::fmt::Display for ConnectionsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionsError::UnknownDevice(id) => write!(f, "connection references unknown device {id}"),
            ConnectionsError::NonexistentPort { device, port, receive } => write!(
                f,
                "device {device} has no {} port {port}",
                if *receive { "receive" } else { "send" }
            ),
            ConnectionsError::Cycle => write!(f, "device graph contains a cycle"),
        }
    }
}

impl std::error::Error for ConnectionsError {}

/// A validated, acyclic device graph rooted at `sink`.
#[derive(Debug, Clone, Default)]
pub struct Connections {
    nodes: HashMap<DeviceId, DeviceNode>,
    order: Vec<DeviceId>,
    sink: DeviceId,
}

impl Connections {
    /// Build from a raw edge list plus the device table (for port/existence
    /// validation) and the id of the sink device (master, or an audio
    /// unit's output interface). Returns the edges in a valid topological
    /// order alongside the graph, or an error if validation fails.
    pub fn build(
        devices: &HashMap<DeviceId, Device>,
        edges: &[(DeviceId, u8, DeviceId, u8)],
        sink: DeviceId,
    ) -> Result<Self, ConnectionsError> {
        let mut nodes: HashMap<DeviceId, DeviceNode> = HashMap::new();
        nodes.entry(sink).or_insert_with(|| DeviceNode { device_id: sink, incoming: Vec::new() });

        for &(from, from_port, to, to_port) in edges {
            let from_dev = devices.get(&from).ok_or(ConnectionsError::UnknownDevice(from))?;
            let to_dev = devices.get(&to).ok_or(ConnectionsError::UnknownDevice(to))?;

            if !matches!(from_dev.kind, DeviceKind::Master) && !from_dev.ports.send_exists(from_port as usize) {
                return Err(ConnectionsError::NonexistentPort { device: from, port: from_port, receive: false });
            }
            if !matches!(to_dev.kind, DeviceKind::Master) && !to_dev.ports.receive_exists(to_port as usize) {
                return Err(ConnectionsError::NonexistentPort { device: to, port: to_port, receive: true });
            }

            nodes.entry(from).or_insert_with(|| DeviceNode { device_id: from, incoming: Vec::new() });
            nodes.entry(to).or_insert_with(|| DeviceNode { device_id: to, incoming: Vec::new() }).incoming.push(
                Edge { from_device: from, from_port, to_port },
            );
        }

        let order = topo_order(&nodes, sink)?;

        Ok(Self { nodes, order, sink })
    }

    pub fn sink(&self) -> DeviceId {
        self.sink
    }

    pub fn node(&self, id: DeviceId) -> Option<&DeviceNode> {
        self.nodes.get(&id)
    }

    /// Devices in dependency order: every device appears after all devices
    /// it receives from. Rendering walks this order once per block.
    pub fn render_order(&self) -> &[DeviceId] {
        &self.order
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }
}

fn topo_order(
    nodes: &HashMap<DeviceId, DeviceNode>,
    sink: DeviceId,
) -> Result<Vec<DeviceId>, ConnectionsError> {
    #[derive(PartialEq, Clone, Copy)]
    enum Mark {
        Unvisited,
        InProgress,
        Done,
    }

    let mut marks: HashMap<DeviceId, Mark> = nodes.keys().map(|&id| (id, Mark::Unvisited)).collect();
    let mut order = Vec::with_capacity(nodes.len());

    fn visit(
        id: DeviceId,
        nodes: &HashMap<DeviceId, DeviceNode>,
        marks: &mut HashMap<DeviceId, Mark>,
        order: &mut Vec<DeviceId>,
    ) -> Result<(), ConnectionsError> {
        match marks.get(&id) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::InProgress) => return Err(ConnectionsError::Cycle),
            _ => {}
        }
        marks.insert(id, Mark::InProgress);
        if let Some(node) = nodes.get(&id) {
            for edge in &node.incoming {
                visit(edge.from_device, nodes, marks, order)?;
            }
        }
        marks.insert(id, Mark::Done);
        order.push(id);
        Ok(())
    }

    visit(sink, nodes, &mut marks, &mut order)?;
    Ok(order)
}
