//! Edit-time port re-shaping.
//!
//! Every rule reads the node's data and live connections, brings the port set in
//! line with them and returns the connections it had to sever.

use super::{set_field_type_key, set_field_value_key, slot_index, slot_key, ComponentKind, INPUT, INPUT_FLOW, OUTPUT, OUTPUT_FLOW, RESULT};
use crate::graph::{Connection, Graph, ModuleLibrary, Node, NodeId, Port, PortDirection, MODULE_NAME_KEY};
use crate::metadata::{LangType, LanguageContext};

/// Re-run the shape rule of `node_id`'s kind. Returns the severed connections.
pub fn reshape(graph: &mut Graph, lang: &LanguageContext, modules: &ModuleLibrary, node_id: NodeId) -> Vec<Connection> {
    let Some(kind) = graph
        .node(node_id)
        .and_then(|node| lang.component(&node.component))
        .map(|component| component.kind().clone())
    else {
        return Vec::new();
    };

    let severed = match kind {
        ComponentKind::Variable => track_declared_type(graph, lang, node_id, RESULT),
        ComponentKind::Input => track_declared_type(graph, lang, node_id, "output"),
        ComponentKind::Output => track_output_producer(graph, lang, node_id),
        ComponentKind::For => reshape_for(graph, lang, node_id),
        ComponentKind::Function => reshape_function(graph, lang, node_id),
        ComponentKind::Sequence => reshape_sequence(graph, node_id),
        ComponentKind::Struct => {
            trim_struct_fields(graph, node_id);
            Vec::new()
        }
        ComponentKind::Set => reshape_set(graph, lang, node_id),
        ComponentKind::Module => reshape_module(graph, lang, modules, node_id),
        _ => Vec::new(),
    };

    if !severed.is_empty() {
        tracing::debug!("[DFGC] Reshape of node {} severed {} connection(s)", node_id, severed.len());
    }
    severed
}

/// Ports a call site of `callee` exposes, one per named bridge node
pub(crate) fn module_ports(callee: &Graph, lang: &LanguageContext) -> Vec<Port> {
    let types = lang.types();
    callee
        .nodes()
        .filter_map(|node| {
            let name = node.data_str("name").filter(|name| !name.is_empty())?;
            let socket = || types.resolve_or_any(node.data_str("typeName").as_deref()).socket().clone();
            match node.component.as_str() {
                INPUT => Some(Port::input(name.clone(), name, socket())),
                OUTPUT => Some(Port::output(name.clone(), name, socket(), true)),
                INPUT_FLOW => Some(Port::flow_in(name.clone()).with_title(name)),
                OUTPUT_FLOW => Some(Port::flow_out(name.clone()).with_title(name)),
                _ => None,
            }
        })
        .collect()
}

/// Title and type of a Set field slot, recovered from its `{i}_{title}Type` data key
pub(crate) fn set_field_slot(node: &Node, index: usize) -> Option<(String, Option<String>)> {
    let prefix = format!("{index}_");
    node.data.keys().find_map(|key| {
        let title = key.strip_prefix(&prefix)?.strip_suffix("Type")?;
        (!title.is_empty()).then(|| (title.to_string(), node.data_str(key)))
    })
}

/// Type of the producer feeding `port`, if connected and known
fn producer_type<'l>(graph: &Graph, lang: &'l LanguageContext, node_id: NodeId, port: &str) -> Option<&'l LangType> {
    graph
        .source_socket(node_id, port)
        .and_then(|socket| lang.types().resolve(&socket.type_name))
}

/// Effective type of a value input fed by a local value.
///
/// Unconnected inputs fall back to `unconnected`. A producer that is neither local
/// nor "any" cannot be bound, so its connection is removed and the type is "any".
fn local_input_type<'l>(
    graph: &mut Graph,
    lang: &'l LanguageContext,
    node_id: NodeId,
    port: &str,
    unconnected: &'l LangType,
    severed: &mut Vec<Connection>,
) -> &'l LangType {
    let Some(connection) = graph.source_of(node_id, port).cloned() else {
        return unconnected;
    };
    match producer_type(graph, lang, node_id, port) {
        Some(producer) if !producer.is_local() && !producer.is_any() => {
            graph.disconnect(&connection);
            severed.push(connection);
            lang.types().any_type()
        }
        Some(producer) => producer,
        None => lang.types().any_type(),
    }
}

fn retype_output(graph: &mut Graph, node_id: NodeId, key: &str, data_key: &str, lang_type: &LangType) -> Vec<Connection> {
    let severed = graph.set_output_tag(node_id, key, lang_type.tag());
    if let Some(node) = graph.node_mut(node_id) {
        node.set_data(data_key, lang_type.mn());
    }
    severed
}

fn track_declared_type(graph: &mut Graph, lang: &LanguageContext, node_id: NodeId, key: &str) -> Vec<Connection> {
    let declared = graph.node(node_id).and_then(|node| node.data_str("typeName"));
    let lang_type = lang.types().resolve_or_any(declared.as_deref());
    retype_output(graph, node_id, key, "typeName", lang_type)
}

fn track_output_producer(graph: &mut Graph, lang: &LanguageContext, node_id: NodeId) -> Vec<Connection> {
    let mut severed = Vec::new();
    let any = lang.types().any_type();
    let lang_type = local_input_type(graph, lang, node_id, "input", any, &mut severed);

    severed.extend(graph.set_input_tag(node_id, "input", lang_type.tag()));
    if let Some(node) = graph.node_mut(node_id) {
        node.set_data("typeName", lang_type.mn());
    }
    severed
}

/// Number of present slots whose key is `prefix{i}`
fn slot_count<'a>(ports: impl Iterator<Item = &'a Port>, prefix: &str) -> usize {
    ports.filter(|port| slot_index(&port.key, prefix).is_some()).count()
}

/// Grow or shrink the paired `in_prefix{i}` / `out_prefix{i}` slots of an argument-count node
fn resize_arg_slots(
    graph: &mut Graph,
    lang: &LanguageContext,
    node_id: NodeId,
    (in_prefix, in_title): (&str, &str),
    (out_prefix, out_title): (&str, &str),
    required: usize,
) -> Vec<Connection> {
    let mut severed = Vec::new();
    let any = lang.types().any_type();
    let Some(node) = graph.node_mut(node_id) else {
        return severed;
    };
    let present = slot_count(node.inputs(), in_prefix);

    for i in present..required {
        node.add_input(Port::input(slot_key(in_prefix, i), format!("{in_title} {}", i + 1), any.socket().clone()));
        node.add_output(Port::output(slot_key(out_prefix, i), format!("{out_title} {}", i + 1), any.socket().clone(), true));
        node.set_data(slot_key("typeName", i), any.mn());
    }
    for i in required..present {
        severed.extend(graph.remove_input(node_id, &slot_key(in_prefix, i)));
        severed.extend(graph.remove_output(node_id, &slot_key(out_prefix, i)));
        if let Some(node) = graph.node_mut(node_id) {
            node.remove_data(&slot_key("typeName", i));
        }
    }
    severed
}

fn reshape_for(graph: &mut Graph, lang: &LanguageContext, node_id: NodeId) -> Vec<Connection> {
    let Some(required) = graph.node_mut(node_id).map(|node| {
        let required = node.data_usize("numArgs").unwrap_or(1);
        node.set_data("numArgs", required);
        required
    }) else {
        return Vec::new();
    };

    let mut severed = resize_arg_slots(graph, lang, node_id, ("range", "Range"), ("val", "Value"), required);
    let any = lang.types().any_type();

    for i in 0..required {
        let range = slot_key("range", i);
        let element = match graph.source_of(node_id, &range).cloned() {
            None => any,
            Some(connection) => match producer_type(graph, lang, node_id, &range) {
                Some(producer) if (!producer.is_local() && !producer.is_any()) || !producer.is_iterable() => {
                    graph.disconnect(&connection);
                    severed.push(connection);
                    any
                }
                _ => range_element_type(graph, lang, connection.from_node),
            },
        };
        severed.extend(retype_output(graph, node_id, &slot_key("val", i), &slot_key("typeName", i), element));
    }
    severed
}

/// Element type of a range constructor: the type of its first value input
fn range_element_type<'l>(graph: &Graph, lang: &'l LanguageContext, producer: NodeId) -> &'l LangType {
    let first_input = graph
        .node(producer)
        .and_then(|node| node.inputs().find_map(Port::socket))
        .map(|socket| socket.type_name.as_str());
    lang.types().resolve_or_any(first_input)
}

fn reshape_function(graph: &mut Graph, lang: &LanguageContext, node_id: NodeId) -> Vec<Connection> {
    let Some(required) = graph.node(node_id).map(|node| node.data_usize("numArgs").unwrap_or(0)) else {
        return Vec::new();
    };
    let mut severed = resize_arg_slots(graph, lang, node_id, ("arg", "Argument"), ("out", "Output"), required);

    for i in 0..required {
        let type_key = slot_key("typeName", i);
        let declared = graph.node(node_id).and_then(|node| node.data_str(&type_key));
        let declared = lang.types().resolve_or_any(declared.as_deref());
        let lang_type = local_input_type(graph, lang, node_id, &slot_key("arg", i), declared, &mut severed);
        severed.extend(retype_output(graph, node_id, &slot_key("out", i), &type_key, lang_type));
    }
    severed
}

fn reshape_sequence(graph: &mut Graph, node_id: NodeId) -> Vec<Connection> {
    let mut severed = Vec::new();
    let Some(node) = graph.node_mut(node_id) else {
        return severed;
    };
    let required = node.data_usize("numExits").unwrap_or(0);
    let present = slot_count(node.outputs(), "out");

    for i in present..required {
        node.add_output(Port::flow_out(slot_key("out", i)).with_title(format!("Output {}", i + 1)));
    }
    for i in required..present {
        severed.extend(graph.remove_output(node_id, &slot_key("out", i)));
    }
    severed
}

fn trim_struct_fields(graph: &mut Graph, node_id: NodeId) {
    let Some(node) = graph.node_mut(node_id) else {
        return;
    };
    let required = node.data_usize("numArgs").unwrap_or(0);
    let stale: Vec<String> = node
        .data
        .keys()
        .filter(|key| slot_index(key, "valueArg").is_some_and(|i| i >= required))
        .cloned()
        .collect();
    for key in stale {
        node.remove_data(&key);
    }
}

fn remove_set_fields(graph: &mut Graph, node_id: NodeId, from: usize, to: usize) -> Vec<Connection> {
    let mut severed = Vec::new();
    for i in from..to {
        let key = slot_key("inValue", i);
        let Some(title) = graph.node(node_id).and_then(|node| node.input(&key)).map(|port| port.title.clone()) else {
            continue;
        };
        severed.extend(graph.remove_input(node_id, &key));
        if let Some(node) = graph.node_mut(node_id) {
            node.remove_data(&set_field_type_key(i, &title));
            node.remove_data(&set_field_value_key(i, &title));
        }
    }
    severed
}

fn reshape_set(graph: &mut Graph, lang: &LanguageContext, node_id: NodeId) -> Vec<Connection> {
    let types = lang.types();
    let mut severed = Vec::new();
    let target_type = local_input_type(graph, lang, node_id, "inVariable", types.any_type(), &mut severed);

    // Aggregate targets get one input per field, primitives a single one
    let target = graph
        .source_of(node_id, "inVariable")
        .and_then(|connection| graph.node(connection.from_node));
    let fields = target
        .and_then(|target| target.data_str("typeName"))
        .and_then(|mn| types.resolve(&mn))
        .and_then(|lang_type| lang_type.desc().args.clone());
    let required = match (&fields, target) {
        (Some(fields), _) => fields.len(),
        (None, Some(_)) => 1,
        (None, None) => 0,
    };

    let Some(node) = graph.node(node_id) else {
        return severed;
    };
    let mut present = slot_count(node.inputs(), "inValue");
    let retyped = node.output(RESULT).map(|port| &port.tag) != Some(&target_type.tag());

    if retyped {
        severed.extend(remove_set_fields(graph, node_id, 0, present));
        present = 0;
    }

    if present < required {
        let Some(node) = graph.node_mut(node_id) else {
            return severed;
        };
        for i in present..required {
            let (title, field_type) = match &fields {
                Some(fields) => (fields[i].name.clone(), types.resolve_or_any(Some(&fields[i].mn))),
                None => ("value".to_string(), target_type),
            };
            node.add_input(Port::input(slot_key("inValue", i), title.clone(), field_type.socket().clone()));
            node.set_data_default(set_field_type_key(i, &title), field_type.mn());
            if let Some(default) = &field_type.desc().default {
                node.set_data_default(set_field_value_key(i, &title), default.clone());
            }
        }
    } else {
        severed.extend(remove_set_fields(graph, node_id, required, present));
    }

    if let Some(node) = graph.node_mut(node_id) {
        node.set_data("numArgs", required);
    }
    severed.extend(retype_output(graph, node_id, RESULT, "typeName", target_type));
    severed
}

fn reshape_module(graph: &mut Graph, lang: &LanguageContext, modules: &ModuleLibrary, node_id: NodeId) -> Vec<Connection> {
    let mut severed = Vec::new();
    let Some(node) = graph.node(node_id) else {
        return severed;
    };
    let desired = node
        .data_str(MODULE_NAME_KEY)
        .and_then(|name| modules.get(&name))
        .map(|callee| module_ports(callee, lang))
        .unwrap_or_default();

    let stale_inputs: Vec<String> = node
        .inputs()
        .filter(|port| !desired.iter().any(|d| d.direction == PortDirection::Input && d.key == port.key))
        .map(|port| port.key.clone())
        .collect();
    let stale_outputs: Vec<String> = node
        .outputs()
        .filter(|port| !desired.iter().any(|d| d.direction == PortDirection::Output && d.key == port.key))
        .map(|port| port.key.clone())
        .collect();
    for key in stale_inputs {
        severed.extend(graph.remove_input(node_id, &key));
    }
    for key in stale_outputs {
        severed.extend(graph.remove_output(node_id, &key));
    }

    for port in desired {
        let Some(node) = graph.node_mut(node_id) else {
            break;
        };
        match port.direction {
            PortDirection::Input if node.input(&port.key).is_some() => {
                severed.extend(graph.set_input_tag(node_id, &port.key, port.tag));
            }
            PortDirection::Output if node.output(&port.key).is_some() => {
                severed.extend(graph.set_output_tag(node_id, &port.key, port.tag));
            }
            PortDirection::Input => node.add_input(port),
            PortDirection::Output => node.add_output(port),
        }
    }
    severed
}
