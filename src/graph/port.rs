//! Port definitions for node inputs/outputs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name carried by the single global flow tag
pub const FLOW_TAG_NAME: &str = "exec-flow";

/// Type-compatibility label of a value port.
///
/// Derived from a type descriptor's base-or-own machine name plus whether the
/// descriptor is the designated "any" type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Socket {
    /// Underlying machine name
    pub type_name: String,
    /// Whether this is the "any" socket
    pub is_any: bool,
}

impl Socket {
    /// Create a new socket
    pub fn new(type_name: impl Into<String>, is_any: bool) -> Self {
        Self {
            type_name: type_name.into(),
            is_any,
        }
    }

    /// Whether a producer carrying `self` may feed a consumer carrying `consumer`
    pub fn compatible_with(&self, consumer: &Socket) -> bool {
        self == consumer || consumer.is_any || self.type_name == consumer.type_name
    }
}

/// Tag of any port: either the global flow tag or a value socket
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortTag {
    /// Execution order only
    Flow,
    /// Data of a given socket type
    Value(Socket),
}

impl PortTag {
    /// Whether a connection `producer -> consumer` may exist
    pub fn compatible(producer: &PortTag, consumer: &PortTag) -> bool {
        match (producer, consumer) {
            (Self::Flow, Self::Flow) => true,
            (Self::Value(from), Self::Value(to)) => from.compatible_with(to),
            _ => false,
        }
    }

    /// Socket of a value tag
    pub fn socket(&self) -> Option<&Socket> {
        match self {
            Self::Flow => None,
            Self::Value(socket) => Some(socket),
        }
    }

    /// Whether this is the flow tag
    pub fn is_flow(&self) -> bool {
        matches!(self, Self::Flow)
    }

    /// Machine name for values, [`FLOW_TAG_NAME`] for flow
    pub fn name(&self) -> &str {
        match self {
            Self::Flow => FLOW_TAG_NAME,
            Self::Value(socket) => &socket.type_name,
        }
    }
}

impl fmt::Display for PortTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Port direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortDirection {
    /// Input port
    Input,
    /// Output port
    Output,
}

/// A port on a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    /// Key, unique among the node's ports of the same direction
    pub key: String,
    /// Display title
    pub title: String,
    /// Port direction
    pub direction: PortDirection,
    /// Compatibility tag
    pub tag: PortTag,
    /// Whether multiple connections are allowed
    pub multi_connect: bool,
}

impl Port {
    /// Create a new value input port. Inputs take a single connection.
    pub fn input(key: impl Into<String>, title: impl Into<String>, socket: Socket) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            direction: PortDirection::Input,
            tag: PortTag::Value(socket),
            multi_connect: false,
        }
    }

    /// Create a new value output port
    pub fn output(
        key: impl Into<String>,
        title: impl Into<String>,
        socket: Socket,
        multi_connect: bool,
    ) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            direction: PortDirection::Output,
            tag: PortTag::Value(socket),
            multi_connect,
        }
    }

    /// Create a flow input port
    pub fn flow_in(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            title: String::new(),
            direction: PortDirection::Input,
            tag: PortTag::Flow,
            multi_connect: false,
        }
    }

    /// Create a flow output port. A flow exit leads to exactly one place.
    pub fn flow_out(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            title: String::new(),
            direction: PortDirection::Output,
            tag: PortTag::Flow,
            multi_connect: false,
        }
    }

    /// Set the display title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Socket of a value port
    pub fn socket(&self) -> Option<&Socket> {
        self.tag.socket()
    }
}
