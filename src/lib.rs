//! # Dasflow Graph Compiler (DFGC)
//!
//! Compiler for transforming visual flow graphs into indented daScript source.
//!
//! DFGC owns the whole path from a finished editor graph to text:
//! - Language metadata loaded from the backend's JSON descriptors
//! - A typed port model that keeps connections wire-compatible
//! - Demand-driven code generation with inlining or let-binding of values
//! - Subgraph ("module") calls bridged through named Input/Output nodes
//! - A line map that sends toolchain errors back to the node that caused them
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dfgc::{compile_graph, Graph, LanguageContext};
//!
//! let core = std::fs::read_to_string("core.json")?;
//! let lang = std::fs::read_to_string("lang.json")?;
//! let lang = LanguageContext::from_json(&core, &lang, None)?;
//!
//! let graph: Graph = serde_json::from_str(&std::fs::read_to_string("main.graph.json")?)?;
//! // ... or build one with Graph::create_node and Graph::connect
//!
//! let output = compile_graph(&graph, &lang);
//! std::fs::write("main.das", &output.code)?;
//! for (node, messages) in output.diagnostics.node_errors() {
//!     eprintln!("node {}: {}", node, messages.join("; "));
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! DFGC follows a multi-phase compilation pipeline:
//!
//! 1. **Metadata Loading** - Types, functions and components from the language descriptors
//! 2. **Module Resolution** - Fetch every called subgraph before the pass (optional)
//! 3. **Code Generation** - Walk definitions, follow flow, resolve values on demand
//! 4. **Diagnostics** - Collect node errors, later remap toolchain errors through the line map

pub mod codegen;
pub mod compiler;
pub mod components;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod graph;
pub mod metadata;

// Re-export the main compilation API
pub use compiler::{
    compile_graph,
    compile_graph_with_config,
    compile_graph_with_modules,
    compile_graph_with_source,
    CompileOutput,
};

pub use config::CompilerConfig;
pub use diagnostics::{Annotation, Diagnostics, GlobalDiagnostic, LineMap, NativeError};
pub use error::{CatalogError, ConnectionError, DfgcError, Result};
pub use graph::{Connection, Graph, ModuleLibrary, ModuleSource, Node, NodeData, NodeId, Port, PortTag, Socket};

// Re-export metadata types
pub use metadata::{LangType, LanguageContext};
