//! # daScript Code Generation
//!
//! Demand-driven text generation for flow graphs.

mod context;
mod das_codegen;
mod node_handlers;

pub use context::{Block, BuiltText, CompileContext, NodeKey, PassState};
pub use das_codegen::{DasCodeGenerator, Resolved};
