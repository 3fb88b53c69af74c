//! # Components
//!
//! One blueprint per node kind. The set of kinds is closed; the data-driven
//! catalog entries (literal constructors and function calls) are wrapped by the
//! [`ComponentKind::TypeCtor`] and [`ComponentKind::Call`] variants, so loading a
//! language never needs a new source-level type.
//!
//! Each kind declares:
//! - its initial ports ([`build_ports`]),
//! - its edit-time shape rule ([`reshape`]),
//! - its code-generation rule (see `codegen::node_handlers`).

mod shape;

pub use shape::reshape;

use crate::graph::{ModuleLibrary, Node, Port, PortDirection, MODULE_NAME_KEY};
use crate::metadata::LanguageContext;
use indexmap::IndexMap;

/// Component name of raw top-level text
pub const INJECT_TOP_LEVEL_CODE: &str = "InjectTopLevelCode";
/// Component name of inline raw text
pub const INJECT_CODE: &str = "InjectCode";
/// Component name of the flow fan-out node
pub const SEQUENCE: &str = "Sequence";
/// Component name of variable declarations
pub const VARIABLE: &str = "Variable";
/// Component name of function definitions
pub const FUNCTION: &str = "Function";
/// Component name of struct definitions
pub const STRUCT: &str = "Struct";
/// Component name of branches
pub const IF: &str = "If";
/// Component name of `while` loops
pub const WHILE: &str = "While";
/// Component name of `for` loops
pub const FOR: &str = "For";
/// Component name of module call sites
pub const MODULE: &str = "Module";
/// Component name of subgraph value inputs
pub const INPUT: &str = "Input";
/// Component name of subgraph value outputs
pub const OUTPUT: &str = "Output";
/// Component name of subgraph flow entries
pub const INPUT_FLOW: &str = "InputFlow";
/// Component name of subgraph flow exits
pub const OUTPUT_FLOW: &str = "OutputFlow";
/// Component name of assignments
pub const SET: &str = "Set";

/// Default flow input key
pub const FLOW_IN: &str = "fin";
/// Default flow output key
pub const FLOW_OUT: &str = "fout";
/// Value output key of value-producing nodes
pub const RESULT: &str = "result";

/// Node kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentKind {
    /// Literal of a text-enterable type
    TypeCtor {
        /// Machine name of the constructed type
        type_mn: String,
    },
    /// Call of a catalog function
    Call {
        /// Machine name of the function
        function_mn: String,
        /// Whether calls sit on the flow path
        side_effect: bool,
    },
    /// Raw text at top level; following flow continues as sibling statements
    InjectTopLevelCode,
    /// Raw text spliced into the current flow position
    InjectCode,
    /// Ordered fan-out of control flow
    Sequence,
    /// Declared variable with a persistent identity
    Variable,
    /// Function definition
    Function,
    /// Struct definition
    Struct,
    /// Two-armed branch
    If,
    /// Conditional loop
    While,
    /// Range loop over one or more ranges
    For,
    /// Call of a subgraph
    Module,
    /// Subgraph value input bridge
    Input,
    /// Subgraph value output bridge
    Output,
    /// Subgraph flow entry bridge
    InputFlow,
    /// Subgraph flow exit bridge
    OutputFlow,
    /// Assignment to a variable or its fields
    Set,
}

/// A registered blueprint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    name: String,
    kind: ComponentKind,
}

impl Component {
    /// Create a new component
    pub fn new(name: impl Into<String>, kind: ComponentKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Registered name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kind
    pub fn kind(&self) -> &ComponentKind {
        &self.kind
    }

    /// Instances are compile-pass entry points
    pub fn is_top_level(&self) -> bool {
        matches!(
            self.kind,
            ComponentKind::Function | ComponentKind::Struct | ComponentKind::InjectTopLevelCode
        )
    }

    /// Instances carry a flow input, so they compile in flow order rather than on demand
    pub fn has_flow_in(&self) -> bool {
        match &self.kind {
            ComponentKind::Call { side_effect, .. } => *side_effect,
            ComponentKind::InjectCode
            | ComponentKind::Sequence
            | ComponentKind::If
            | ComponentKind::While
            | ComponentKind::For
            | ComponentKind::Set
            | ComponentKind::OutputFlow => true,
            _ => false,
        }
    }

    /// Compiled lazily on first demand
    pub fn is_lazy(&self) -> bool {
        !self.has_flow_in()
    }

    /// After the node body, flow continues through the [`FLOW_OUT`] exit
    pub fn continues_flow(&self) -> bool {
        match &self.kind {
            ComponentKind::Call { side_effect, .. } => *side_effect,
            ComponentKind::InjectCode
            | ComponentKind::If
            | ComponentKind::While
            | ComponentKind::For
            | ComponentKind::Set => true,
            _ => false,
        }
    }
}

/// Registered blueprints keyed by name
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    components: IndexMap<String, Component>,
}

impl ComponentRegistry {
    /// Registry holding every fixed kind
    pub fn with_builtins() -> Self {
        let mut registry = Self::default();
        for (name, kind) in [
            (INJECT_TOP_LEVEL_CODE, ComponentKind::InjectTopLevelCode),
            (INJECT_CODE, ComponentKind::InjectCode),
            (SEQUENCE, ComponentKind::Sequence),
            (VARIABLE, ComponentKind::Variable),
            (FUNCTION, ComponentKind::Function),
            (IF, ComponentKind::If),
            (WHILE, ComponentKind::While),
            (FOR, ComponentKind::For),
            (MODULE, ComponentKind::Module),
            (INPUT, ComponentKind::Input),
            (OUTPUT, ComponentKind::Output),
            (INPUT_FLOW, ComponentKind::InputFlow),
            (OUTPUT_FLOW, ComponentKind::OutputFlow),
            (SET, ComponentKind::Set),
            (STRUCT, ComponentKind::Struct),
        ] {
            registry.register(Component::new(name, kind));
        }
        registry
    }

    /// Register a component; a later registration under the same name wins
    pub fn register(&mut self, component: Component) {
        if self.components.contains_key(component.name()) {
            tracing::warn!("[DFGC] Component '{}' registered twice", component.name());
        }
        self.components.insert(component.name().to_string(), component);
    }

    /// Get a component by name
    pub fn get(&self, name: &str) -> Option<&Component> {
        self.components.get(name)
    }

    /// Get all registered components
    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.components.values()
    }

    /// Number of components
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

/// Data key of a numbered slot, e.g. `typeName2`
pub(crate) fn slot_key(prefix: &str, index: usize) -> String {
    format!("{prefix}{index}")
}

/// Data key holding the stored literal of a Set field
pub(crate) fn set_field_value_key(index: usize, title: &str) -> String {
    format!("{index}_{title}Value")
}

/// Data key holding the machine type name of a Set field
pub(crate) fn set_field_type_key(index: usize, title: &str) -> String {
    format!("{index}_{title}Type")
}

/// Index encoded in a numbered port key, e.g. `val3` -> 3
pub(crate) fn slot_index(key: &str, prefix: &str) -> Option<usize> {
    key.strip_prefix(prefix)?.parse().ok()
}

/// Give a freshly created node the ports its kind declares.
///
/// Literal defaults are written into the node's data where absent.
pub fn build_ports(component: &Component, node: &mut Node, lang: &LanguageContext, modules: &ModuleLibrary) {
    let types = lang.types();
    let any = types.any_type().socket().clone();
    let typed = |key: &str, node: &Node| types.resolve_or_any(node.data_str(key).as_deref()).socket().clone();

    match component.kind() {
        ComponentKind::TypeCtor { type_mn } => {
            let Some(lang_type) = types.resolve(type_mn) else {
                return;
            };
            node.add_output(Port::output(RESULT, "Result", lang_type.socket().clone(), lang_type.is_local()));
            if let Some(default) = &lang_type.desc().default {
                node.set_data_default("value", default.clone());
            }
        }
        ComponentKind::Call { function_mn, side_effect } => {
            let Some(function) = lang.functions().get(function_mn) else {
                return;
            };
            let res_type = types.resolve_or_any(Some(&function.desc().res_mn));
            if !res_type.is_void() {
                node.add_output(Port::output(RESULT, "Result", res_type.socket().clone(), res_type.is_local()));
            }
            if *side_effect {
                node.add_input(Port::flow_in(FLOW_IN));
                node.add_output(Port::flow_out(FLOW_OUT));
            }
            for arg in &function.desc().args {
                let Some(arg_type) = types.resolve(&arg.mn) else {
                    tracing::error!("[DFGC] type {} not found", arg.mn);
                    continue;
                };
                if let Some(default) = &arg_type.desc().default {
                    node.set_data_default(arg.name.clone(), default.clone());
                }
                node.add_input(Port::input(arg.name.clone(), arg.name.clone(), arg_type.socket().clone()));
            }
        }
        ComponentKind::InjectTopLevelCode | ComponentKind::Function => {
            node.add_output(Port::flow_out(FLOW_OUT));
            if component.kind() == &ComponentKind::Function {
                for i in 0..node.data_usize("numArgs").unwrap_or(0) {
                    node.add_input(Port::input(slot_key("arg", i), format!("Argument {}", i + 1), any.clone()));
                    let socket = typed(&slot_key("typeName", i), node);
                    node.add_output(Port::output(slot_key("out", i), format!("Output {}", i + 1), socket, true));
                }
            }
        }
        ComponentKind::InjectCode => {
            node.add_input(Port::flow_in(FLOW_IN));
            node.add_output(Port::flow_out(FLOW_OUT));
        }
        ComponentKind::Sequence => {
            node.add_input(Port::flow_in(FLOW_IN));
            for i in 0..node.data_usize("numExits").unwrap_or(0) {
                node.add_output(Port::flow_out(slot_key("out", i)).with_title(format!("Output {}", i + 1)));
            }
        }
        ComponentKind::Variable => {
            let socket = typed("typeName", node);
            node.add_output(Port::output(RESULT, "Result", socket, true));
        }
        ComponentKind::Struct => {}
        ComponentKind::If => {
            node.add_input(Port::flow_in(FLOW_IN));
            node.add_output(Port::flow_out(FLOW_OUT));
            node.add_output(Port::flow_out("then").with_title("then"));
            node.add_output(Port::flow_out("else").with_title("else"));
            node.add_input(Port::input("inValue", "Condition", types.logic_type().socket().clone()));
        }
        ComponentKind::While => {
            node.add_input(Port::flow_in(FLOW_IN));
            node.add_output(Port::flow_out(FLOW_OUT));
            node.add_output(Port::flow_out("body").with_title("body"));
            node.add_input(Port::input("inValue", "Condition", types.logic_type().socket().clone()));
        }
        ComponentKind::For => {
            node.add_input(Port::flow_in(FLOW_IN));
            node.add_output(Port::flow_out(FLOW_OUT));
            node.add_output(Port::flow_out("body").with_title("body"));
            let num_args = node.data_usize("numArgs").unwrap_or(1);
            node.set_data("numArgs", num_args);
            for i in 0..num_args {
                node.add_input(Port::input(slot_key("range", i), format!("Range {}", i + 1), any.clone()));
                let socket = typed(&slot_key("typeName", i), node);
                node.add_output(Port::output(slot_key("val", i), format!("Value {}", i + 1), socket, true));
            }
        }
        ComponentKind::Module => {
            if let Some(callee) = node.data_str(MODULE_NAME_KEY).and_then(|name| modules.get(&name)) {
                for port in shape::module_ports(callee, lang) {
                    match port.direction {
                        PortDirection::Input => node.add_input(port),
                        PortDirection::Output => node.add_output(port),
                    }
                }
            }
        }
        ComponentKind::Input => {
            let socket = typed("typeName", node);
            node.add_output(Port::output("output", "Value", socket, true));
        }
        ComponentKind::Output => {
            let socket = typed("typeName", node);
            node.add_input(Port::input("input", "Value", socket));
        }
        ComponentKind::InputFlow => {
            node.add_output(Port::flow_out("output"));
        }
        ComponentKind::OutputFlow => {
            node.add_input(Port::flow_in("input"));
        }
        ComponentKind::Set => {
            node.add_input(Port::flow_in(FLOW_IN));
            node.add_output(Port::flow_out(FLOW_OUT));
            node.add_input(Port::input("inVariable", "Variable", any.clone()));
            let socket = typed("typeName", node);
            node.add_output(Port::output(RESULT, "Result", socket, true));

            for i in 0..node.data_usize("numArgs").unwrap_or(0) {
                let (title, type_mn) = shape::set_field_slot(node, i).unwrap_or_else(|| ("value".to_string(), None));
                let field_type = types.resolve_or_any(type_mn.as_deref());
                node.add_input(Port::input(slot_key("inValue", i), title, field_type.socket().clone()));
            }
        }
    }
}
