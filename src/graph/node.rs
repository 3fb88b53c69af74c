//! Node definitions for the graph model.

use crate::graph::port::Port;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Stable node identifier within one graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Literal data bag of a node, keyed by field name
pub type NodeData = IndexMap<String, Value>;

/// A node instance in the graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Unique instance ID
    pub id: NodeId,
    /// Name of the component (blueprint) this node instantiates
    pub component: String,
    /// Literal data
    pub data: NodeData,
    /// Position in the editor canvas
    pub position: [f32; 2],
    inputs: IndexMap<String, Port>,
    outputs: IndexMap<String, Port>,
}

impl Node {
    /// Create a node without ports
    pub fn new(id: NodeId, component: impl Into<String>) -> Self {
        Self {
            id,
            component: component.into(),
            data: NodeData::new(),
            position: [0.0, 0.0],
            inputs: IndexMap::new(),
            outputs: IndexMap::new(),
        }
    }

    /// Set a data field
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Set the position
    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.position = [x, y];
        self
    }

    /// Add (or replace) an input port
    pub fn add_input(&mut self, port: Port) {
        self.inputs.insert(port.key.clone(), port);
    }

    /// Add (or replace) an output port
    pub fn add_output(&mut self, port: Port) {
        self.outputs.insert(port.key.clone(), port);
    }

    /// Remove an input port. Connections are the graph's business.
    pub(crate) fn remove_input(&mut self, key: &str) -> Option<Port> {
        self.inputs.shift_remove(key)
    }

    /// Remove an output port. Connections are the graph's business.
    pub(crate) fn remove_output(&mut self, key: &str) -> Option<Port> {
        self.outputs.shift_remove(key)
    }

    /// Input port by key
    pub fn input(&self, key: &str) -> Option<&Port> {
        self.inputs.get(key)
    }

    /// Output port by key
    pub fn output(&self, key: &str) -> Option<&Port> {
        self.outputs.get(key)
    }

    pub(crate) fn input_mut(&mut self, key: &str) -> Option<&mut Port> {
        self.inputs.get_mut(key)
    }

    pub(crate) fn output_mut(&mut self, key: &str) -> Option<&mut Port> {
        self.outputs.get_mut(key)
    }

    /// Input ports in declaration order
    pub fn inputs(&self) -> impl Iterator<Item = &Port> {
        self.inputs.values()
    }

    /// Output ports in declaration order
    pub fn outputs(&self) -> impl Iterator<Item = &Port> {
        self.outputs.values()
    }

    /// Get all ports
    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.inputs.values().chain(self.outputs.values())
    }

    /// Data field as text. Numbers and booleans are spelled out; null and objects are absent.
    pub fn data_str(&self, key: &str) -> Option<String> {
        match self.data.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Data field as a count. Accepts numbers and numeric strings.
    pub fn data_usize(&self, key: &str) -> Option<usize> {
        match self.data.get(key)? {
            Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Data field as a flag; absent means false
    pub fn data_bool(&self, key: &str) -> bool {
        match self.data.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s == "true",
            _ => false,
        }
    }

    /// Set a data field
    pub fn set_data(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(key.into(), value.into());
    }

    /// Set a data field only if it is absent or null
    pub fn set_data_default(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let slot = self.data.entry(key.into()).or_insert(Value::Null);
        if slot.is_null() {
            *slot = value.into();
        }
    }

    /// Remove a data field
    pub fn remove_data(&mut self, key: &str) -> Option<Value> {
        self.data.shift_remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::port::Socket;

    #[test]
    fn test_data_accessors() {
        let node = Node::new(NodeId(1), "Function")
            .with_data("name", "main")
            .with_data("numArgs", 2)
            .with_data("count", "3")
            .with_data("mainFuncMark", true)
            .with_data("value", 1.5);

        assert_eq!(node.data_str("name").as_deref(), Some("main"));
        assert_eq!(node.data_str("value").as_deref(), Some("1.5"));
        assert_eq!(node.data_usize("numArgs"), Some(2));
        assert_eq!(node.data_usize("count"), Some(3));
        assert!(node.data_bool("mainFuncMark"));
        assert!(!node.data_bool("missing"));
    }

    #[test]
    fn test_set_data_default_keeps_existing() {
        let mut node = Node::new(NodeId(1), "int").with_data("value", "7");
        node.set_data_default("value", "0");
        node.set_data_default("other", "0");
        assert_eq!(node.data_str("value").as_deref(), Some("7"));
        assert_eq!(node.data_str("other").as_deref(), Some("0"));
    }

    #[test]
    fn test_port_order_is_declaration_order() {
        let mut node = Node::new(NodeId(1), "Call");
        node.add_input(Port::input("b", "b", Socket::new("int", false)));
        node.add_input(Port::input("a", "a", Socket::new("int", false)));
        let keys: Vec<_> = node.inputs().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, vec!["b", "a"]);
    }
}
