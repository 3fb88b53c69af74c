//! # Compiler Configuration
//!
//! Knobs for a compile pass. Every field has a default so a partial JSON object
//! (or none at all) is enough.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Settings shared by every compile pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompilerConfig {
    /// Inline single-use local values instead of let-binding them
    pub optimize_flow: bool,
    /// Indentation emitted per nesting depth
    pub indent: String,
    /// Lines the backend prepends to the generated text before reporting errors
    pub header_lines: usize,
    /// Line written in place of a node that failed to generate
    pub discard_marker: String,
    /// No-op statement used for empty blocks
    pub placeholder: String,
    /// Keyword that opens an import line
    pub import_keyword: String,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            optimize_flow: true,
            indent: "\t".to_string(),
            header_lines: 3,
            discard_marker: "//ERROR: node error here, code discarded".to_string(),
            placeholder: "pass".to_string(),
            import_keyword: "require".to_string(),
        }
    }
}

impl CompilerConfig {
    /// Parse a configuration from JSON, defaulting missing fields
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Indentation for the given depth
    pub fn indent_for(&self, depth: usize) -> String {
        self.indent.repeat(depth)
    }
}
