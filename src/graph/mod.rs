//! # Node-Graph Model
//!
//! Nodes, ports and connections handed to the compiler by the editor. The compiler
//! only ever reads a [`Graph`]; mutation happens at edit time through
//! [`Graph::connect`] and the component re-shaping rules.

mod module;
mod node;
mod port;

pub use module::{ModuleLibrary, ModuleSource, MODULE_NAME_KEY};
pub use node::{Node, NodeData, NodeId};
pub use port::{Port, PortDirection, PortTag, Socket, FLOW_TAG_NAME};

use crate::components;
use crate::error::{ConnectionError, DfgcError, Result};
use crate::metadata::LanguageContext;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A connection between an output port and an input port
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connection {
    /// Producing node
    pub from_node: NodeId,
    /// Producing output port key
    pub from_port: String,
    /// Consuming node
    pub to_node: NodeId,
    /// Consuming input port key
    pub to_port: String,
}

impl Connection {
    /// Create a new connection
    pub fn new(
        from_node: NodeId,
        from_port: impl Into<String>,
        to_node: NodeId,
        to_port: impl Into<String>,
    ) -> Self {
        Self {
            from_node,
            from_port: from_port.into(),
            to_node,
            to_port: to_port.into(),
        }
    }

    /// Check if this connection involves a specific node
    pub fn involves_node(&self, node_id: NodeId) -> bool {
        self.from_node == node_id || self.to_node == node_id
    }
}

/// A node graph
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Graph {
    /// Graph name
    pub name: String,
    nodes: IndexMap<NodeId, Node>,
    connections: Vec<Connection>,
}

impl Graph {
    /// Create a new empty graph
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: IndexMap::new(),
            connections: Vec::new(),
        }
    }

    /// Add a node to the graph
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = node.id;
        self.nodes.insert(id, node);
        id
    }

    /// Next unused node id
    pub fn next_node_id(&self) -> NodeId {
        NodeId(self.nodes.keys().map(|id| id.0 + 1).max().unwrap_or(1))
    }

    /// Instantiate `component` with the given data, build its ports and add it
    pub fn create_node(
        &mut self,
        lang: &LanguageContext,
        modules: &ModuleLibrary,
        component: &str,
        data: NodeData,
    ) -> Result<NodeId> {
        let blueprint = lang
            .component(component)
            .ok_or_else(|| DfgcError::UnknownComponent(component.to_string()))?;
        let mut node = Node::new(self.next_node_id(), component);
        node.data = data;
        components::build_ports(blueprint, &mut node, lang, modules);
        Ok(self.add_node(node))
    }

    /// Remove a node and its connections
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<Node> {
        self.connections.retain(|c| !c.involves_node(node_id));
        self.nodes.shift_remove(&node_id)
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// Get a mutable node by ID
    pub fn node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&node_id)
    }

    /// Get all nodes, in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Add a validated connection between ports
    pub fn connect(
        &mut self,
        from_node: NodeId,
        from_port: &str,
        to_node: NodeId,
        to_port: &str,
    ) -> Result<(), ConnectionError> {
        if from_node == to_node {
            return Err(ConnectionError::SelfLoop);
        }

        let source = self.nodes.get(&from_node).ok_or(ConnectionError::NodeNotFound(from_node))?;
        let target = self.nodes.get(&to_node).ok_or(ConnectionError::NodeNotFound(to_node))?;
        let source_port = source.output(from_port).ok_or_else(|| ConnectionError::PortNotFound {
            node: from_node,
            port: from_port.to_string(),
        })?;
        let target_port = target.input(to_port).ok_or_else(|| ConnectionError::PortNotFound {
            node: to_node,
            port: to_port.to_string(),
        })?;

        if !PortTag::compatible(&source_port.tag, &target_port.tag) {
            return Err(ConnectionError::IncompatiblePorts {
                from: source_port.tag.to_string(),
                to: target_port.tag.to_string(),
            });
        }
        if !target_port.multi_connect && self.incoming(to_node, to_port).next().is_some() {
            return Err(ConnectionError::PortAlreadyConnected {
                node: to_node,
                port: to_port.to_string(),
            });
        }
        if !source_port.multi_connect && self.outgoing(from_node, from_port).next().is_some() {
            return Err(ConnectionError::PortAlreadyConnected {
                node: from_node,
                port: from_port.to_string(),
            });
        }

        self.connections.push(Connection::new(from_node, from_port, to_node, to_port));
        Ok(())
    }

    /// Insert a connection without validation, as restored from storage
    pub fn add_connection(&mut self, connection: Connection) {
        self.connections.push(connection);
    }

    /// Remove a connection
    pub fn disconnect(&mut self, connection: &Connection) -> bool {
        let before = self.connections.len();
        self.connections.retain(|c| c != connection);
        before != self.connections.len()
    }

    /// Get all connections
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter()
    }

    /// Connections leaving an output port
    pub fn outgoing<'a>(&'a self, node: NodeId, port: &'a str) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections
            .iter()
            .filter(move |c| c.from_node == node && c.from_port == port)
    }

    /// Connections entering an input port
    pub fn incoming<'a>(&'a self, node: NodeId, port: &'a str) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections
            .iter()
            .filter(move |c| c.to_node == node && c.to_port == port)
    }

    /// First connection entering an input port
    pub fn source_of(&self, node: NodeId, port: &str) -> Option<&Connection> {
        self.connections
            .iter()
            .find(|c| c.to_node == node && c.to_port == port)
    }

    /// First connection leaving an output port
    pub fn target_of(&self, node: NodeId, port: &str) -> Option<&Connection> {
        self.connections
            .iter()
            .find(|c| c.from_node == node && c.from_port == port)
    }

    /// Number of consumers currently reading an output port
    pub fn fan_out(&self, node: NodeId, port: &str) -> usize {
        self.outgoing(node, port).count()
    }

    /// Socket of the port feeding an input, if connected to a value port
    pub fn source_socket(&self, node: NodeId, port: &str) -> Option<&Socket> {
        let connection = self.source_of(node, port)?;
        self.nodes
            .get(&connection.from_node)?
            .output(&connection.from_port)?
            .socket()
    }

    /// Get the number of connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Retag an output port; connections that became incompatible are severed and returned.
    pub fn set_output_tag(&mut self, node_id: NodeId, key: &str, tag: PortTag) -> Vec<Connection> {
        let Some(port) = self.nodes.get_mut(&node_id).and_then(|n| n.output_mut(key)) else {
            return Vec::new();
        };
        if port.tag == tag {
            return Vec::new();
        }
        port.tag = tag.clone();

        let nodes = &self.nodes;
        let stale: Vec<Connection> = self
            .outgoing(node_id, key)
            .filter(|c| {
                nodes
                    .get(&c.to_node)
                    .and_then(|n| n.input(&c.to_port))
                    .map_or(true, |input| !PortTag::compatible(&tag, &input.tag))
            })
            .cloned()
            .collect();
        self.sever(stale)
    }

    /// Retag an input port; connections that became incompatible are severed and returned.
    pub fn set_input_tag(&mut self, node_id: NodeId, key: &str, tag: PortTag) -> Vec<Connection> {
        let Some(port) = self.nodes.get_mut(&node_id).and_then(|n| n.input_mut(key)) else {
            return Vec::new();
        };
        if port.tag == tag {
            return Vec::new();
        }
        port.tag = tag.clone();

        let nodes = &self.nodes;
        let stale: Vec<Connection> = self
            .incoming(node_id, key)
            .filter(|c| {
                nodes
                    .get(&c.from_node)
                    .and_then(|n| n.output(&c.from_port))
                    .map_or(true, |output| !PortTag::compatible(&output.tag, &tag))
            })
            .cloned()
            .collect();
        self.sever(stale)
    }

    /// Remove an input port together with its connections
    pub fn remove_input(&mut self, node_id: NodeId, key: &str) -> Vec<Connection> {
        let attached: Vec<Connection> = self.incoming(node_id, key).cloned().collect();
        if let Some(node) = self.nodes.get_mut(&node_id) {
            node.remove_input(key);
        }
        self.sever(attached)
    }

    /// Remove an output port together with its connections
    pub fn remove_output(&mut self, node_id: NodeId, key: &str) -> Vec<Connection> {
        let attached: Vec<Connection> = self.outgoing(node_id, key).cloned().collect();
        if let Some(node) = self.nodes.get_mut(&node_id) {
            node.remove_output(key);
        }
        self.sever(attached)
    }

    fn sever(&mut self, stale: Vec<Connection>) -> Vec<Connection> {
        for connection in &stale {
            tracing::debug!(
                "[DFGC] Severing {}.{} -> {}.{}",
                connection.from_node,
                connection.from_port,
                connection.to_node,
                connection.to_port
            );
            self.disconnect(connection);
        }
        stale
    }
}
