//! # Compile Context
//!
//! [`PassState`] holds everything shared by one compile pass. A [`CompileContext`]
//! borrows it and owns only an indentation depth and a line buffer; nested scopes
//! are child contexts whose buffer is appended to the parent on close.

use crate::config::CompilerConfig;
use crate::diagnostics::{Diagnostics, LineMap, NOT_PROCESSED};
use crate::graph::NodeId;
use indexmap::IndexSet;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// A node as seen by one pass: its id plus the module call sites leading to it.
///
/// The same subgraph node compiled under two different call sites is two
/// different keys, so memoized results never leak between call sites.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey {
    /// Module call-site nodes, outermost first
    pub path: Vec<NodeId>,
    /// Node id inside the innermost graph
    pub id: NodeId,
}

impl NodeKey {
    /// Key of a node in the root graph
    pub fn root(id: NodeId) -> Self {
        Self { path: Vec::new(), id }
    }

    /// Key of a node reached under the call sites in `path`
    pub fn scoped(path: &[NodeId], id: NodeId) -> Self {
        Self {
            path: path.to_vec(),
            id,
        }
    }

    /// Node of the root graph this key is attributed to
    pub fn root_id(&self) -> NodeId {
        self.path.first().copied().unwrap_or(self.id)
    }

    /// Unique suffix used in generated identifiers
    pub fn suffix(&self) -> String {
        self.path
            .iter()
            .chain(std::iter::once(&self.id))
            .map(NodeId::to_string)
            .collect::<Vec<_>>()
            .join("_")
    }

    /// Default identifier bound to this node's value
    pub fn ident(&self) -> String {
        format!("_{}", self.suffix())
    }

    /// Innermost module call site, in the scope it was called from
    pub fn call_site(&self) -> Option<NodeKey> {
        let (id, path) = self.path.split_last()?;
        Some(Self {
            path: path.to_vec(),
            id: *id,
        })
    }

    /// Key of node `id` inside the module called by this node
    pub fn inside(&self, id: NodeId) -> NodeKey {
        let mut path = self.path.clone();
        path.push(self.id);
        Self { path, id }
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.suffix())
    }
}

/// Pass-wide bookkeeping shared by every context of one pass
#[derive(Debug)]
pub struct PassState {
    pub(crate) config: CompilerConfig,
    pub(crate) diagnostics: Diagnostics,
    lazy_inited: HashSet<NodeKey>,
    resolving: HashSet<NodeKey>,
    requirements: IndexSet<String>,
    node_results: HashMap<NodeKey, String>,
    processed: HashSet<NodeKey>,
    required: IndexSet<NodeKey>,
    flow_visited: HashSet<NodeKey>,
    main_functions: Vec<String>,
}

impl PassState {
    /// Fresh state for a new pass
    pub fn new(config: CompilerConfig) -> Self {
        Self {
            config,
            diagnostics: Diagnostics::new(),
            lazy_inited: HashSet::new(),
            resolving: HashSet::new(),
            requirements: IndexSet::new(),
            node_results: HashMap::new(),
            processed: HashSet::new(),
            required: IndexSet::new(),
            flow_visited: HashSet::new(),
            main_functions: Vec::new(),
        }
    }

    /// Active configuration
    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Diagnostics so far
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Whether the node's lazy initialization has started
    pub fn is_lazy_inited(&self, key: &NodeKey) -> bool {
        self.lazy_inited.contains(key)
    }

    /// Mark lazy initialization as started
    pub fn set_lazy_inited(&mut self, key: NodeKey) {
        self.lazy_inited.insert(key);
    }

    /// Mark the node as being resolved; false if it already is
    pub fn begin_resolving(&mut self, key: NodeKey) -> bool {
        self.resolving.insert(key)
    }

    /// Clear the resolving mark
    pub fn end_resolving(&mut self, key: &NodeKey) {
        self.resolving.remove(key);
    }

    /// Whether the node is currently being resolved
    pub fn is_resolving(&self, key: &NodeKey) -> bool {
        self.resolving.contains(key)
    }

    /// Record an import
    pub fn add_req_module(&mut self, module: impl Into<String>) {
        self.requirements.insert(module.into());
    }

    /// Record several imports
    pub fn add_req_modules<'r>(&mut self, modules: impl IntoIterator<Item = &'r String>) {
        for module in modules {
            self.requirements.insert(module.clone());
        }
    }

    /// Memoize the expression standing for a node's value
    pub fn set_node_result(&mut self, key: NodeKey, text: impl Into<String>) {
        self.node_results.insert(key, text.into());
    }

    /// Memoized expression or bound identifier of a node
    pub fn node_ref(&self, key: &NodeKey) -> String {
        self.node_results.get(key).cloned().unwrap_or_else(|| key.ident())
    }

    /// Mark a node as referenced
    pub fn require(&mut self, key: NodeKey) {
        self.required.insert(key);
    }

    /// Mark a node as compiled
    pub fn mark_processed(&mut self, key: NodeKey) {
        self.processed.insert(key);
    }

    /// Whether the node has been compiled
    pub fn is_processed(&self, key: &NodeKey) -> bool {
        self.processed.contains(key)
    }

    /// Record a flow visit; false if the node was already reached through flow
    pub fn visit_flow(&mut self, key: NodeKey) -> bool {
        self.flow_visited.insert(key)
    }

    /// Record a definition marked as main
    pub fn set_main_func(&mut self, name: impl Into<String>) {
        self.main_functions.push(name.into());
    }

    /// First definition marked as main
    pub fn main_func(&self) -> Option<&str> {
        self.main_functions.first().map(String::as_str)
    }

    /// Record a node diagnostic without touching the text
    pub fn add_error_id(&mut self, node: NodeId, message: impl Into<String>) {
        self.diagnostics.add_node_error(node, message);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Line {
    owner: Option<NodeId>,
    text: String,
}

/// Lines of a closed child scope, ready to be appended to its parent
#[derive(Debug, Default)]
pub struct Block {
    lines: Vec<Line>,
}

impl Block {
    /// Number of lines
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the block has no lines
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Output of a finished pass
#[derive(Debug)]
pub struct BuiltText {
    /// Import lines followed by the body
    pub code: String,
    /// Imported modules, in first-use order
    pub imports: Vec<String>,
    /// Line ownership of the body
    pub line_map: LineMap,
    /// First definition marked as main
    pub main_function: Option<String>,
    /// Diagnostics of the pass
    pub diagnostics: Diagnostics,
}

/// One scope of a pass: an indentation depth and a private line buffer
#[derive(Debug)]
pub struct CompileContext<'p> {
    pass: &'p mut PassState,
    depth: usize,
    lines: Vec<Line>,
}

impl<'p> CompileContext<'p> {
    /// Top-level context of a pass
    pub fn new(pass: &'p mut PassState) -> Self {
        Self {
            pass,
            depth: 0,
            lines: Vec::new(),
        }
    }

    /// Shared pass state
    pub fn pass(&self) -> &PassState {
        &*self.pass
    }

    /// Shared pass state, mutably
    pub fn pass_mut(&mut self) -> &mut PassState {
        &mut *self.pass
    }

    /// Nesting depth
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Append `text` at the current indentation, one line per `\n`-separated part
    pub fn write_line(&mut self, owner: Option<NodeId>, text: &str) {
        let indent = self.pass.config.indent_for(self.depth);
        for part in text.split('\n') {
            self.lines.push(Line {
                owner,
                text: format!("{indent}{part}"),
            });
        }
    }

    /// Replace a node's output with the discard marker and record `message`
    pub fn add_error(&mut self, node: NodeId, message: impl Into<String>) {
        let marker = self.pass.config.discard_marker.clone();
        self.write_line(Some(node), &marker);
        self.pass.add_error_id(node, message);
    }

    /// Child scope one level deeper
    pub fn child(&mut self) -> CompileContext<'_> {
        self.child_with_indent(1)
    }

    /// Child scope `extra` levels deeper
    pub fn child_with_indent(&mut self, extra: usize) -> CompileContext<'_> {
        CompileContext {
            depth: self.depth + extra,
            pass: &mut *self.pass,
            lines: Vec::new(),
        }
    }

    /// Close this scope, handing its lines to the parent
    pub fn into_block(self) -> Block {
        Block { lines: self.lines }
    }

    /// Append a closed child's lines
    pub fn close_child(&mut self, block: Block) {
        self.lines.extend(block.lines);
    }

    /// Lines written so far in this scope
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Finish the pass: prepend imports, build the line map and report nodes
    /// that were referenced but never compiled.
    pub fn build(self) -> BuiltText {
        let pass = self.pass;
        let config = &pass.config;

        let imports: Vec<String> = pass.requirements.drain(..).collect();
        let mut code = String::new();
        for import in &imports {
            code.push_str(&format!("{} {}\n", config.import_keyword, import));
        }
        let req_offset = if imports.is_empty() {
            0
        } else {
            code.push_str("\n\n");
            imports.len() + 2
        };

        let mut owners = Vec::with_capacity(self.lines.len());
        for line in self.lines {
            code.push_str(&line.text);
            code.push('\n');
            owners.push(line.owner);
        }
        let line_map = LineMap::new(owners, req_offset, config.header_lines);

        let unprocessed: Vec<NodeKey> = pass
            .required
            .iter()
            .filter(|key| !pass.processed.contains(*key))
            .cloned()
            .collect();
        let mut reported = HashSet::new();
        for key in unprocessed {
            if reported.insert(key.root_id()) {
                tracing::debug!("[DFGC] Node {} was required but never processed", key);
                pass.diagnostics.add_node_error(key.root_id(), NOT_PROCESSED);
            }
        }

        BuiltText {
            code,
            imports,
            line_map,
            main_function: pass.main_functions.first().cloned(),
            diagnostics: std::mem::take(&mut pass.diagnostics),
        }
    }
}
