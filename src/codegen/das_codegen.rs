//! # daScript Code Generator
//!
//! Walks a graph from its top-level definitions, follows flow connections in
//! program order and resolves value connections on demand.

use crate::codegen::context::{BuiltText, CompileContext, NodeKey, PassState};
use crate::codegen::node_handlers;
use crate::components::{slot_index, Component, ComponentKind, FLOW_OUT, INPUT_FLOW, OUTPUT};
use crate::config::CompilerConfig;
use crate::graph::{Graph, ModuleLibrary, Node, NodeId, MODULE_NAME_KEY};
use crate::metadata::LanguageContext;

/// Where a consumer's input value comes from: the producing node and the output read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Producing node
    pub key: NodeKey,
    /// Output port key on the producer
    pub port: String,
}

/// Generates daScript text for one graph and the modules it calls
pub struct DasCodeGenerator<'a> {
    graph: &'a Graph,
    lang: &'a LanguageContext,
    modules: &'a ModuleLibrary,
}

impl<'a> DasCodeGenerator<'a> {
    pub fn new(graph: &'a Graph, lang: &'a LanguageContext, modules: &'a ModuleLibrary) -> Self {
        Self { graph, lang, modules }
    }

    /// Run a full pass and return the finished text with its diagnostics
    pub fn generate_program(&self, config: &CompilerConfig) -> BuiltText {
        let mut pass = PassState::new(config.clone());
        let mut ctx = CompileContext::new(&mut pass);

        let entries: Vec<NodeId> = self
            .graph
            .nodes()
            .filter(|node| self.component(node).is_some_and(Component::is_top_level))
            .map(|node| node.id)
            .collect();
        tracing::debug!("[DFGC] {} top-level node(s)", entries.len());

        for id in entries {
            self.construct(&mut ctx, &NodeKey::root(id));
        }

        ctx.build()
    }

    /// Loaded language
    pub fn lang(&self) -> &'a LanguageContext {
        self.lang
    }

    /// Graph reached through the call sites in `path`
    pub fn graph_of(&self, path: &[NodeId]) -> Option<&'a Graph> {
        path.iter().try_fold(self.graph, |graph, call_site| {
            let name = graph.node(*call_site)?.data_str(MODULE_NAME_KEY)?;
            self.modules.get(&name)
        })
    }

    /// Node behind a key
    pub fn node(&self, key: &NodeKey) -> Option<&'a Node> {
        self.graph_of(&key.path)?.node(key.id)
    }

    /// Component a node instantiates
    pub fn component(&self, node: &Node) -> Option<&'a Component> {
        self.lang.component(&node.component)
    }

    /// Consumers reading a node's output
    pub fn fan_out(&self, key: &NodeKey, port: &str) -> usize {
        self.graph_of(&key.path).map_or(0, |graph| graph.fan_out(key.id, port))
    }

    /// Record a node error and write the discard marker.
    ///
    /// Errors inside a module land on the outermost call site, prefixed with the module name.
    pub fn error(&self, ctx: &mut CompileContext<'_>, key: &NodeKey, message: impl Into<String>) {
        let message = self.attributed(key, message.into());
        tracing::debug!("[DFGC] Node {}: {}", key, message);
        ctx.add_error(key.root_id(), message);
    }

    /// Record a node error without touching the text
    pub fn report(&self, ctx: &mut CompileContext<'_>, key: &NodeKey, message: impl Into<String>) {
        let message = self.attributed(key, message.into());
        tracing::debug!("[DFGC] Node {}: {}", key, message);
        ctx.pass_mut().add_error_id(key.root_id(), message);
    }

    fn attributed(&self, key: &NodeKey, message: String) -> String {
        if key.path.is_empty() {
            return message;
        }
        match self.graph_of(&key.path) {
            Some(module) => format!("{}: {}", module.name, message),
            None => message,
        }
    }

    /// Compile a node once: its own text, then the flow that follows it
    pub fn construct(&self, ctx: &mut CompileContext<'_>, key: &NodeKey) {
        let Some(node) = self.node(key) else {
            return;
        };
        let Some(component) = self.component(node) else {
            self.error(ctx, key, format!("Unknown component: {}", node.component));
            return;
        };

        if component.has_flow_in() && !ctx.pass_mut().visit_flow(key.clone()) {
            tracing::warn!("[DFGC] Flow reaches node {} more than once, skipping", key);
            self.report(ctx, key, "Flow node is reached more than once");
            return;
        }

        tracing::debug!("[DFGC] Generating {} node {}", node.component, key);
        ctx.pass_mut().mark_processed(key.clone());
        node_handlers::generate(self, ctx, key, node, component);

        if component.continues_flow() {
            self.flow_out(ctx, key, FLOW_OUT);
        }
    }

    /// Compile a value node on first demand. Flow nodes are left to the flow walk.
    fn auto_init(&self, ctx: &mut CompileContext<'_>, key: &NodeKey, component: &Component) {
        if ctx.pass().is_lazy_inited(key) {
            if ctx.pass().is_resolving(key) {
                self.error(ctx, key, "cyclic value dependency");
            }
            return;
        }
        if !component.is_lazy() {
            return;
        }

        ctx.pass_mut().set_lazy_inited(key.clone());
        ctx.pass_mut().begin_resolving(key.clone());
        self.construct(ctx, key);
        ctx.pass_mut().end_resolving(key);
    }

    /// Resolve the producer connected to an input, compiling it if needed
    pub fn optional_in(
        &self,
        ctx: &mut CompileContext<'_>,
        key: &NodeKey,
        port: &str,
    ) -> Option<Resolved> {
        let graph = self.graph_of(&key.path)?;
        let connection = graph.source_of(key.id, port)?;
        let producer = graph.node(connection.from_node)?;
        let producer_key = NodeKey::scoped(&key.path, producer.id);

        let Some(component) = self.component(producer) else {
            self.error(ctx, &producer_key, format!("Unknown component: {}", producer.component));
            return None;
        };

        match component.kind() {
            ComponentKind::Input => self.resolve_module_input(ctx, &producer_key, producer),
            ComponentKind::Module => {
                self.resolve_module_output(ctx, &producer_key, producer, &connection.from_port)
            }
            ComponentKind::Function => {
                slot_index(&connection.from_port, "out")?;
                Some(Resolved {
                    key: producer_key,
                    port: connection.from_port.clone(),
                })
            }
            ComponentKind::Set => self.optional_in(ctx, &producer_key, "inVariable"),
            _ => {
                self.auto_init(ctx, &producer_key, component);
                ctx.pass_mut().require(producer_key.clone());
                Some(Resolved {
                    key: producer_key,
                    port: connection.from_port.clone(),
                })
            }
        }
    }

    /// Like [`Self::optional_in`], but a missing connection is an error
    pub fn required_in(
        &self,
        ctx: &mut CompileContext<'_>,
        key: &NodeKey,
        port: &str,
    ) -> Option<Resolved> {
        let resolved = self.optional_in(ctx, key, port);
        if resolved.is_none() {
            self.error(ctx, key, "input expected");
        }
        resolved
    }

    /// Text a consumer uses to refer to a resolved value
    pub fn arg_name(&self, ctx: &CompileContext<'_>, resolved: &Resolved) -> String {
        let kind = self
            .node(&resolved.key)
            .and_then(|node| self.component(node))
            .map(Component::kind);
        match kind {
            Some(ComponentKind::For) => match slot_index(&resolved.port, "val") {
                Some(i) => format!("x{}_{}", i, resolved.key.suffix()),
                None => ctx.pass().node_ref(&resolved.key),
            },
            Some(ComponentKind::Function) => match slot_index(&resolved.port, "out") {
                Some(i) => format!("{}_{}", resolved.key.ident(), i),
                None => ctx.pass().node_ref(&resolved.key),
            },
            _ => ctx.pass().node_ref(&resolved.key),
        }
    }

    /// Follow a flow output. Returns whether anything was connected to it.
    pub fn flow_out(&self, ctx: &mut CompileContext<'_>, key: &NodeKey, port: &str) -> bool {
        let Some(graph) = self.graph_of(&key.path) else {
            return false;
        };
        let Some(connection) = graph.target_of(key.id, port) else {
            return false;
        };
        let Some(next) = graph.node(connection.to_node) else {
            return false;
        };
        let next_key = NodeKey::scoped(&key.path, next.id);

        match self.component(next).map(Component::kind) {
            Some(ComponentKind::OutputFlow) => self.flow_out_of_module(ctx, &next_key, next),
            Some(ComponentKind::Module) => {
                self.flow_into_module(ctx, &next_key, next, &connection.to_port)
            }
            _ => self.construct(ctx, &next_key),
        }
        true
    }

    /// Value of a module input: the argument connected at the call site
    fn resolve_module_input(
        &self,
        ctx: &mut CompileContext<'_>,
        input_key: &NodeKey,
        input: &Node,
    ) -> Option<Resolved> {
        let Some(call_site) = input_key.call_site() else {
            self.error(ctx, input_key, "Input node is not in module");
            return None;
        };
        let name = input.data_str("name").unwrap_or_default();
        self.optional_in(ctx, &call_site, &name)
    }

    /// Flow leaving a module continues after the call site
    fn flow_out_of_module(
        &self,
        ctx: &mut CompileContext<'_>,
        output_key: &NodeKey,
        output: &Node,
    ) {
        let Some(call_site) = output_key.call_site() else {
            self.error(ctx, output_key, "OutputFlow node is not in module");
            return;
        };
        let name = output.data_str("name").unwrap_or_default();
        self.flow_out(ctx, &call_site, &name);
    }

    /// Callee of a module call site, refusing a module that is already being expanded
    fn enter_module(
        &self,
        ctx: &mut CompileContext<'_>,
        call_key: &NodeKey,
        call: &Node,
    ) -> Option<&'a Graph> {
        let name = call.data_str(MODULE_NAME_KEY).unwrap_or_default();
        let Some(callee) = self.modules.get(&name) else {
            self.error(ctx, call_key, format!("Module '{}' is not loaded", name));
            return None;
        };
        let recursive = (0..call_key.path.len()).any(|depth| {
            let Some(outer) = self.graph_of(&call_key.path[..depth]) else {
                return false;
            };
            outer
                .node(call_key.path[depth])
                .and_then(|site| site.data_str(MODULE_NAME_KEY))
                .is_some_and(|outer_name| outer_name == name)
        });
        if recursive {
            self.error(ctx, call_key, format!("Recursive call of module '{}'", name));
            return None;
        }

        ctx.pass_mut().mark_processed(call_key.clone());
        Some(callee)
    }

    fn resolve_module_output(
        &self,
        ctx: &mut CompileContext<'_>,
        call_key: &NodeKey,
        call: &Node,
        output_name: &str,
    ) -> Option<Resolved> {
        let callee = self.enter_module(ctx, call_key, call)?;
        match find_bridge(callee, OUTPUT, output_name) {
            Some(output) => self.optional_in(ctx, &call_key.inside(output.id), "input"),
            None => {
                self.error(ctx, call_key, format!("Module output '{}' not found", output_name));
                None
            }
        }
    }

    fn flow_into_module(
        &self,
        ctx: &mut CompileContext<'_>,
        call_key: &NodeKey,
        call: &Node,
        input_name: &str,
    ) {
        let Some(callee) = self.enter_module(ctx, call_key, call) else {
            return;
        };
        match find_bridge(callee, INPUT_FLOW, input_name) {
            Some(entry) => {
                self.flow_out(ctx, &call_key.inside(entry.id), "output");
            }
            None => {
                self.error(ctx, call_key, format!("Module flow input '{}' not found", input_name))
            }
        }
    }
}

/// Bridge node of a given component named `name`
fn find_bridge<'g>(graph: &'g Graph, component: &str, name: &str) -> Option<&'g Node> {
    graph
        .nodes()
        .find(|node| node.component == component && node.data_str("name").as_deref() == Some(name))
}
