//! Subgraph ("module") resolution.
//!
//! Module call sites refer to other graphs by name. Fetching them is the storage
//! layer's job; everything a pass will touch must be collected here first.

use crate::components::MODULE;
use crate::error::Result;
use crate::graph::Graph;
use indexmap::IndexMap;
use std::collections::HashMap;

/// Data key naming the callee of a module node
pub const MODULE_NAME_KEY: &str = "module";

/// Where module graphs come from
pub trait ModuleSource {
    /// Fetch a module graph by name. `Ok(None)` means the module does not exist.
    fn load_module(&self, name: &str) -> Result<Option<Graph>>;
}

impl ModuleSource for HashMap<String, Graph> {
    fn load_module(&self, name: &str) -> Result<Option<Graph>> {
        Ok(self.get(name).cloned())
    }
}

impl ModuleSource for IndexMap<String, Graph> {
    fn load_module(&self, name: &str) -> Result<Option<Graph>> {
        Ok(self.get(name).cloned())
    }
}

/// Resolved module graphs, addressable by name
#[derive(Debug, Clone, Default)]
pub struct ModuleLibrary {
    modules: IndexMap<String, Graph>,
}

impl ModuleLibrary {
    /// Create an empty library
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module graph
    pub fn insert(&mut self, name: impl Into<String>, graph: Graph) {
        self.modules.insert(name.into(), graph);
    }

    /// Look a module up by name
    pub fn get(&self, name: &str) -> Option<&Graph> {
        self.modules.get(name)
    }

    /// Whether a module is already resolved
    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    /// Number of resolved modules
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether no module is resolved
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Resolve every module referenced from `graph`, transitively.
    ///
    /// Each name is fetched at most once, in reference order. A module the source
    /// does not know is stored as an empty graph so bridges can report it.
    pub fn collect(&mut self, graph: &Graph, source: &dyn ModuleSource) -> Result<()> {
        let mut pending: Vec<String> = module_references(graph);
        pending.reverse();

        while let Some(name) = pending.pop() {
            if self.contains(&name) {
                continue;
            }
            tracing::debug!("[DFGC] Loading module '{}'", name);
            let module = match source.load_module(&name)? {
                Some(module) => module,
                None => {
                    tracing::warn!("[DFGC] Module '{}' not found, treating it as empty", name);
                    Graph::new(name.clone())
                }
            };
            let mut nested = module_references(&module);
            nested.reverse();
            pending.extend(nested);
            self.insert(name, module);
        }
        Ok(())
    }
}

fn module_references(graph: &Graph) -> Vec<String> {
    graph
        .nodes()
        .filter(|node| node.component == MODULE)
        .filter_map(|node| node.data_str(MODULE_NAME_KEY))
        .filter(|name| !name.is_empty())
        .collect()
}
