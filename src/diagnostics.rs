//! # Diagnostics
//!
//! Node-scoped and file-level messages collected during a compile pass, the
//! line→node table of the generated text, and the mapping of backend toolchain
//! errors back onto nodes.

use crate::graph::{Graph, NodeId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Message raised for a node referenced as a value but never compiled
pub const NOT_PROCESSED: &str = "Node is not processed";

/// An error reported by the external toolchain against the generated file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NativeError {
    /// Path of the file the error refers to
    pub file: String,
    /// 1-based line number in the file as the toolchain saw it
    pub line: usize,
    /// Error text
    pub message: String,
    /// Suggested fix, empty if none
    pub fixme: String,
    /// Additional detail, empty if none
    pub extra: String,
}

impl NativeError {
    /// Message with the optional fix and detail lines appended
    pub fn annotated_message(&self) -> String {
        let mut text = self.message.clone();
        if !self.fixme.is_empty() {
            text.push_str("\nfixme: ");
            text.push_str(&self.fixme);
        }
        if !self.extra.is_empty() {
            text.push_str("\nextra: ");
            text.push_str(&self.extra);
        }
        text
    }
}

/// A file-level message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalDiagnostic {
    /// Line relative to the toolchain header
    pub line: i64,
    /// Message text
    pub message: String,
}

/// Inline annotation to show next to a node on the canvas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Annotated node
    pub node: NodeId,
    /// Canvas position of the node
    pub position: [f32; 2],
    /// Text to show
    pub text: String,
}

/// Diagnostics of one compile pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    node_errors: IndexMap<NodeId, Vec<String>>,
    global: Vec<GlobalDiagnostic>,
}

impl Diagnostics {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message against a node
    pub fn add_node_error(&mut self, node: NodeId, message: impl Into<String>) {
        self.node_errors.entry(node).or_default().push(message.into());
    }

    /// Record a file-level message
    pub fn add_global(&mut self, line: i64, message: impl Into<String>) {
        self.global.push(GlobalDiagnostic {
            line,
            message: message.into(),
        });
    }

    /// Messages of one node
    pub fn errors_for(&self, node: NodeId) -> &[String] {
        self.node_errors.get(&node).map_or(&[], Vec::as_slice)
    }

    /// All node messages, in the order nodes were first diagnosed
    pub fn node_errors(&self) -> impl Iterator<Item = (NodeId, &[String])> {
        self.node_errors.iter().map(|(id, messages)| (*id, messages.as_slice()))
    }

    /// File-level messages
    pub fn global(&self) -> &[GlobalDiagnostic] {
        &self.global
    }

    /// File-level messages as one text, a `<message> in line <n>` entry per line
    pub fn global_text(&self) -> String {
        self.global
            .iter()
            .map(|d| format!("{} in line {}", d.message, d.line))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Whether any node was diagnosed
    pub fn has_errors(&self) -> bool {
        !self.node_errors.is_empty()
    }

    /// Whether nothing at all was recorded
    pub fn is_empty(&self) -> bool {
        self.node_errors.is_empty() && self.global.is_empty()
    }

    /// Drop everything, ready for the next pass
    pub fn clear(&mut self) {
        self.node_errors.clear();
        self.global.clear();
    }

    /// Log every message through `tracing`
    pub fn log_errors(&self, graph: &Graph) {
        for (id, messages) in &self.node_errors {
            let component = graph.node(*id).map_or("?", |node| node.component.as_str());
            tracing::warn!("[DFGC] Node {}:{}\n\t{}", component, id, messages.join("\n\t"));
        }
        for diagnostic in &self.global {
            tracing::warn!("[DFGC] {} in line {}", diagnostic.message, diagnostic.line);
        }
    }

    /// One annotation per diagnosed node that exists in `graph`
    pub fn annotations(&self, graph: &Graph) -> Vec<Annotation> {
        self.node_errors
            .iter()
            .filter_map(|(id, messages)| {
                let node = graph.node(*id)?;
                Some(Annotation {
                    node: *id,
                    position: node.position,
                    text: messages.join("\n"),
                })
            })
            .collect()
    }
}

/// Which node produced each line of the generated body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineMap {
    owners: Vec<Option<NodeId>>,
    req_offset: usize,
    header_lines: usize,
}

impl LineMap {
    /// Build a map for a body whose lines are owned by `owners`.
    ///
    /// `req_offset` is the height of the import block in front of the body,
    /// `header_lines` the number of lines the toolchain adds in front of that.
    pub fn new(owners: Vec<Option<NodeId>>, req_offset: usize, header_lines: usize) -> Self {
        Self {
            owners,
            req_offset,
            header_lines,
        }
    }

    /// Height of the import block
    pub fn req_offset(&self) -> usize {
        self.req_offset
    }

    /// Number of body lines
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    /// Whether the body is empty
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Owner of a 0-based body line
    pub fn owner(&self, body_line: usize) -> Option<NodeId> {
        self.owners.get(body_line).copied().flatten()
    }

    /// Body lines owned by `node`
    pub fn lines_of(&self, node: NodeId) -> Vec<usize> {
        self.owners
            .iter()
            .enumerate()
            .filter(|(_, owner)| **owner == Some(node))
            .map(|(line, _)| line)
            .collect()
    }

    /// Owner of a 1-based line as numbered by the toolchain
    pub fn node_at(&self, native_line: usize) -> Option<NodeId> {
        let body_line = native_line.checked_sub(self.header_lines + 1 + self.req_offset)?;
        self.owner(body_line)
    }

    /// Map toolchain errors for `file` onto nodes; the rest become file-level messages.
    ///
    /// Errors are matched by the last path segment of their file.
    pub fn remap(&self, diagnostics: &mut Diagnostics, errors: &[NativeError], file: &str) {
        for error in errors {
            let error_file = error.file.rsplit('/').next().unwrap_or(&error.file);
            if error_file != file {
                continue;
            }
            match self.node_at(error.line) {
                Some(node) => diagnostics.add_node_error(node, error.annotated_message()),
                None => diagnostics.add_global(error.line as i64 - self.header_lines as i64, error.message.clone()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error(file: &str, line: usize, message: &str) -> NativeError {
        NativeError {
            file: file.into(),
            line,
            message: message.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_remap_accounts_for_header_and_imports() {
        // Two import lines plus two blank lines, then a three line body
        let map = LineMap::new(vec![Some(NodeId(7)), None, Some(NodeId(9))], 4, 3);
        let mut diagnostics = Diagnostics::new();

        map.remap(
            &mut diagnostics,
            &[
                error("/tmp/out/main.das", 8, "bad call"),
                error("main.das", 10, "bad type"),
                error("main.das", 9, "stray"),
                error("other.das", 8, "ignored"),
            ],
            "main.das",
        );

        assert_eq!(diagnostics.errors_for(NodeId(7)), ["bad call".to_string()]);
        assert_eq!(diagnostics.errors_for(NodeId(9)), ["bad type".to_string()]);
        assert_eq!(diagnostics.global_text(), "stray in line 6");
    }

    #[test]
    fn test_native_message_carries_fixme_and_extra() {
        let native = NativeError {
            fixme: "add a cast".into(),
            extra: "int vs float".into(),
            ..error("a.das", 1, "mismatch")
        };
        assert_eq!(native.annotated_message(), "mismatch\nfixme: add a cast\nextra: int vs float");
    }

    #[test]
    fn test_annotations_follow_node_positions() {
        let mut graph = Graph::new("g");
        graph.add_node(crate::graph::Node::new(NodeId(1), "If").with_position(10.0, 20.0));
        let mut diagnostics = Diagnostics::new();
        diagnostics.add_node_error(NodeId(1), "then exit expected");
        diagnostics.add_node_error(NodeId(1), "input expected");
        diagnostics.add_node_error(NodeId(5), "gone");

        let annotations = diagnostics.annotations(&graph);
        assert_eq!(annotations.len(), 1);
        assert_eq!(annotations[0].position, [10.0, 20.0]);
        assert_eq!(annotations[0].text, "then exit expected\ninput expected");
        assert!(diagnostics.has_errors());
    }
}
