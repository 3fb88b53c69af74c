//! # Error Types
//!
//! Fatal errors surface as [`DfgcError`]. Problems with a single catalog entry are
//! [`CatalogError`]s: they are collected and the entry is dropped, the rest of the
//! language still loads. Edit-time graph mutations fail with [`ConnectionError`].
//!
//! Graph-shape problems found while compiling are never errors in this sense; they
//! become node diagnostics and the pass keeps going.

use crate::graph::NodeId;

/// Crate-wide result alias
pub type Result<T, E = DfgcError> = std::result::Result<T, E>;

/// Fatal compiler errors
#[derive(Debug, thiserror::Error)]
pub enum DfgcError {
    /// Language or config JSON could not be parsed
    #[error("Malformed descriptor JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The language declares no usable "any" type
    #[error("Language has no designated any type")]
    MissingAnyType,

    /// The core descriptor names a logic type the language does not define
    #[error("Logic type '{0}' is not defined by the language")]
    MissingLogicType(String),

    /// A node refers to a component that is not registered
    #[error("Unknown component: {0}")]
    UnknownComponent(String),

    /// A module could not be fetched from its source
    #[error("Failed to load module '{name}': {reason}")]
    ModuleLoad {
        /// Module name as referenced by the call-site node
        name: String,
        /// Source-specific failure text
        reason: String,
    },
}

/// A single rejected type or function descriptor
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    /// Function argument refers to an unknown type
    #[error("Function's {function} argument {argument} with unknown type {type_mn}")]
    UnknownArgumentType {
        /// Function name
        function: String,
        /// Argument name
        argument: String,
        /// Machine name that failed to resolve
        type_mn: String,
    },

    /// Function argument has a void type
    #[error("Function's {function} argument {argument} is void")]
    VoidArgument {
        /// Function name
        function: String,
        /// Argument name
        argument: String,
    },

    /// Function result refers to an unknown type
    #[error("Function {function} has unknown result type {type_mn}")]
    UnknownResultType {
        /// Function name
        function: String,
        /// Machine name that failed to resolve
        type_mn: String,
    },

    /// Two types share a machine name
    #[error("Type {0} already exists")]
    DuplicateType(String),

    /// A type's validator is not a valid pattern
    #[error("Type {type_mn} has invalid validator: {reason}")]
    InvalidValidator {
        /// Machine name of the type
        type_mn: String,
        /// Regex compile error
        reason: String,
    },
}

/// Error when editing connections
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionError {
    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Port not found
    #[error("Port not found: {node}.{port}")]
    PortNotFound {
        /// Owning node
        node: NodeId,
        /// Port key
        port: String,
    },

    /// Value and flow ports cannot be wired together, nor can incompatible types
    #[error("Incompatible ports: {from} -> {to}")]
    IncompatiblePorts {
        /// Producing tag name
        from: String,
        /// Consuming tag name
        to: String,
    },

    /// Port only accepts one connection
    #[error("Port already connected: {node}.{port}")]
    PortAlreadyConnected {
        /// Owning node
        node: NodeId,
        /// Port key
        port: String,
    },

    /// Self-loop not allowed
    #[error("Self-loop not allowed")]
    SelfLoop,
}
