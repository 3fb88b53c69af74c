//! # Node Handlers
//!
//! Per-kind generation rules. Each handler writes the node's own lines into the
//! current scope and resolves the value inputs it needs through the generator;
//! following flow is left to [`DasCodeGenerator::construct`] unless the kind
//! owns nested scopes.

use crate::codegen::context::{CompileContext, NodeKey};
use crate::codegen::das_codegen::DasCodeGenerator;
use crate::components::{
    set_field_value_key, slot_index, slot_key, Component, ComponentKind, FLOW_OUT, RESULT,
};
use crate::graph::Node;
use crate::metadata::LangType;
use indexmap::IndexMap;
use serde_json::Value;

/// Run the generation rule of `node`'s kind
pub(crate) fn generate(
    gen: &DasCodeGenerator<'_>,
    ctx: &mut CompileContext<'_>,
    key: &NodeKey,
    node: &Node,
    component: &Component,
) {
    match component.kind() {
        ComponentKind::TypeCtor { type_mn } => type_ctor(gen, ctx, key, node, type_mn),
        ComponentKind::Call { function_mn, side_effect } => {
            call(gen, ctx, key, node, function_mn, *side_effect)
        }
        ComponentKind::InjectTopLevelCode => {
            inject_code(ctx, key, node);
            gen.flow_out(ctx, key, FLOW_OUT);
        }
        ComponentKind::InjectCode => inject_code(ctx, key, node),
        ComponentKind::Sequence => {
            let exits = node
                .outputs()
                .filter(|port| slot_index(&port.key, "out").is_some())
                .count();
            for i in 0..exits {
                gen.flow_out(ctx, key, &slot_key("out", i));
            }
        }
        ComponentKind::Variable => {
            let type_mn = node.data_str("typeName");
            let lang_type = gen.lang().types().resolve_or_any(type_mn.as_deref());
            let line = format!("var {}: {}", key.ident(), lang_type.type_name());
            ctx.write_line(Some(key.root_id()), &line);
        }
        ComponentKind::Function => function(gen, ctx, key, node),
        ComponentKind::Struct => structure(gen, ctx, key, node),
        ComponentKind::If => branch(gen, ctx, key),
        ComponentKind::While => {
            let Some(cond) = gen.required_in(ctx, key, "inValue") else {
                return;
            };
            let cond = gen.arg_name(ctx, &cond);
            ctx.write_line(Some(key.root_id()), &format!("while ({cond})"));
            flow_block(gen, ctx, key, "body");
        }
        ComponentKind::For => range_loop(gen, ctx, key, node),
        ComponentKind::Set => assignment(gen, ctx, key, node),
        ComponentKind::Module
        | ComponentKind::Input
        | ComponentKind::Output
        | ComponentKind::InputFlow
        | ComponentKind::OutputFlow => {}
    }
}

/// Compile the flow behind `port` into a nested scope. An empty scope gets the placeholder.
///
/// Returns whether anything was connected.
fn flow_block(
    gen: &DasCodeGenerator<'_>,
    ctx: &mut CompileContext<'_>,
    key: &NodeKey,
    port: &str,
) -> bool {
    let mut child = ctx.child();
    let connected = gen.flow_out(&mut child, key, port);
    if child.line_count() == 0 {
        let placeholder = child.pass().config().placeholder.clone();
        child.write_line(Some(key.root_id()), &placeholder);
    }
    let block = child.into_block();
    ctx.close_child(block);
    connected
}

/// Bind or memoize a value node's expression.
///
/// Bound nodes get a `let` line, or a bare statement when nobody reads the result.
fn record_value(
    ctx: &mut CompileContext<'_>,
    key: &NodeKey,
    value: String,
    res_type: &LangType,
    bind: bool,
    readers: usize,
) {
    if !bind {
        ctx.pass_mut().set_node_result(key.clone(), value);
    } else if res_type.is_void() || readers == 0 {
        ctx.write_line(Some(key.root_id()), &value);
    } else {
        ctx.write_line(Some(key.root_id()), &format!("let {} = {}", key.ident(), value));
    }
}

/// Whether a local value must be let-bound rather than inlined
fn must_bind(ctx: &CompileContext<'_>, res_type: &LangType, readers: usize) -> bool {
    res_type.is_local() && (readers > 1 || !ctx.pass().config().optimize_flow)
}

fn type_ctor(
    gen: &DasCodeGenerator<'_>,
    ctx: &mut CompileContext<'_>,
    key: &NodeKey,
    node: &Node,
    type_mn: &str,
) {
    let Some(lang_type) = gen.lang().types().resolve(type_mn) else {
        gen.error(ctx, key, format!("Unknown type: {type_mn}"));
        return;
    };
    ctx.pass_mut().add_req_modules(&lang_type.desc().requirements);

    let literal = node.data_str("value").unwrap_or_default();
    let value = lang_type.ctor(&literal, &IndexMap::new());
    let readers = gen.fan_out(key, RESULT);
    let bind = must_bind(ctx, lang_type, readers);
    record_value(ctx, key, value, lang_type, bind, readers);
}

fn call(
    gen: &DasCodeGenerator<'_>,
    ctx: &mut CompileContext<'_>,
    key: &NodeKey,
    node: &Node,
    function_mn: &str,
    side_effect: bool,
) {
    let types = gen.lang().types();
    let Some(function) = gen.lang().functions().get(function_mn) else {
        gen.error(ctx, key, format!("Unknown function: {function_mn}"));
        return;
    };

    let mut args = IndexMap::new();
    for arg in &function.desc().args {
        let Some(arg_type) = types.resolve(&arg.mn) else {
            tracing::error!("[DFGC] type {} not found", arg.mn);
            continue;
        };
        let input = if arg_type.supports_text_input() {
            gen.optional_in(ctx, key, &arg.name)
        } else {
            gen.required_in(ctx, key, &arg.name)
        };
        let text = match input {
            Some(resolved) => gen.arg_name(ctx, &resolved),
            None => {
                ctx.pass_mut().add_req_modules(&arg_type.desc().requirements);
                let literal = node.data_str(&arg.name).unwrap_or_default();
                arg_type.ctor(&literal, &IndexMap::new())
            }
        };
        args.insert(arg.name.clone(), text);
    }

    let res_type = types.resolve_or_any(Some(&function.desc().res_mn));
    ctx.pass_mut().add_req_modules(&res_type.desc().requirements);
    ctx.pass_mut().add_req_modules(&function.desc().requirements);

    let value = function.ctor(&args);
    let readers = gen.fan_out(key, RESULT);
    let bind = side_effect || must_bind(ctx, res_type, readers);
    record_value(ctx, key, value, res_type, bind, readers);
}

fn inject_code(ctx: &mut CompileContext<'_>, key: &NodeKey, node: &Node) {
    if let Some(code) = node.data_str("code").filter(|code| !code.is_empty()) {
        ctx.write_line(Some(key.root_id()), &code);
    }
}

fn branch(gen: &DasCodeGenerator<'_>, ctx: &mut CompileContext<'_>, key: &NodeKey) {
    let Some(cond) = gen.required_in(ctx, key, "inValue") else {
        return;
    };
    let cond = gen.arg_name(ctx, &cond);
    ctx.write_line(Some(key.root_id()), &format!("if ({cond})"));
    if !flow_block(gen, ctx, key, "then") {
        gen.report(ctx, key, "then exit expected");
    }
    ctx.write_line(Some(key.root_id()), "else");
    flow_block(gen, ctx, key, "else");
}

fn range_loop(
    gen: &DasCodeGenerator<'_>,
    ctx: &mut CompileContext<'_>,
    key: &NodeKey,
    node: &Node,
) {
    let slots = node.inputs().filter(|port| slot_index(&port.key, "range").is_some()).count();
    let mut indices = Vec::new();
    let mut ranges = Vec::new();
    for i in 0..slots {
        let Some(range) = gen.optional_in(ctx, key, &slot_key("range", i)) else {
            continue;
        };
        indices.push(format!("x{}_{}", i, key.suffix()));
        ranges.push(gen.arg_name(ctx, &range));
    }

    if ranges.is_empty() {
        gen.error(ctx, key, "input expected");
        return;
    }
    ctx.write_line(
        Some(key.root_id()),
        &format!("for {} in {}", indices.join(", "), ranges.join(", ")),
    );
    flow_block(gen, ctx, key, "body");
}

fn function(gen: &DasCodeGenerator<'_>, ctx: &mut CompileContext<'_>, key: &NodeKey, node: &Node) {
    let types = gen.lang().types();
    let graph = gen.graph_of(&key.path);
    let mut params = Vec::new();

    for i in 0..node.data_usize("numArgs").unwrap_or(0) {
        let param = format!("{}_{}", key.ident(), i);
        let prefill = graph.and_then(|graph| {
            let connection = graph.source_of(key.id, &slot_key("arg", i))?;
            graph.node(connection.from_node)
        });

        let Some(literal) = prefill else {
            let declared = node.data_str(&slot_key("typeName", i));
            match declared.as_deref().and_then(|mn| types.resolve(mn)) {
                Some(lang_type) => params.push(format!("{}: {}", param, lang_type.type_name())),
                None => params.push(param),
            }
            continue;
        };

        let literal_key = NodeKey::scoped(&key.path, literal.id);
        match gen.component(literal).map(Component::kind) {
            Some(ComponentKind::TypeCtor { type_mn }) => {
                let Some(lang_type) = types.resolve(type_mn) else {
                    continue;
                };
                ctx.pass_mut().add_req_modules(&lang_type.desc().requirements);
                ctx.pass_mut().mark_processed(literal_key);
                let value = literal.data_str("value").unwrap_or_default();
                params.push(format!("{} = {}", param, lang_type.ctor(&value, &IndexMap::new())));
            }
            _ => {
                gen.error(ctx, key, format!("Unsupported argument type: {}", literal.component));
                params.push(param);
            }
        }
    }

    let name = node.data_str("name").filter(|name| !name.is_empty()).unwrap_or_else(|| key.ident());
    if node.data_bool("mainFuncMark") {
        if let Some(main) = ctx.pass().main_func() {
            tracing::warn!(
                "[DFGC] '{}' is already the main function, ignoring mark on '{}'",
                main,
                name
            );
        } else {
            ctx.pass_mut().set_main_func(name.clone());
        }
    }
    if let Some(annotation) = node.data_str("annotation").filter(|a| !a.is_empty()) {
        ctx.write_line(Some(key.root_id()), &format!("[{annotation}]"));
    }
    ctx.write_line(Some(key.root_id()), &format!("def {}({})", name, params.join("; ")));
    flow_block(gen, ctx, key, FLOW_OUT);
    ctx.write_line(Some(key.root_id()), "");
}

/// One field line of a struct definition: `name[: type][ = default]`
fn struct_field(gen: &DasCodeGenerator<'_>, field: &Value) -> Option<String> {
    let text = |name: &str| match field.get(name)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    };

    let mut line = text("valueName")?;
    let default = text("value");
    match text("valueType").and_then(|mn| gen.lang().types().resolve(&mn)) {
        Some(lang_type) => {
            line.push_str(&format!(": {}", lang_type.type_name()));
            if let Some(default) = default {
                line.push_str(&format!(" = {}", lang_type.ctor(&default, &IndexMap::new())));
            }
        }
        None => {
            if let Some(default) = default {
                line.push_str(&format!(" = {default}"));
            }
        }
    }
    Some(line)
}

fn structure(gen: &DasCodeGenerator<'_>, ctx: &mut CompileContext<'_>, key: &NodeKey, node: &Node) {
    let name = node.data_str("name").filter(|name| !name.is_empty()).unwrap_or_else(|| key.ident());
    ctx.write_line(Some(key.root_id()), &format!("struct {name}"));

    let mut child = ctx.child();
    for i in 0..node.data_usize("numArgs").unwrap_or(0) {
        let field = node
            .data
            .get(&slot_key("valueArg", i))
            .and_then(|field| struct_field(gen, field));
        if let Some(line) = field {
            child.write_line(Some(key.root_id()), &line);
        }
    }
    if child.line_count() == 0 {
        let placeholder = child.pass().config().placeholder.clone();
        child.write_line(Some(key.root_id()), &placeholder);
    }
    let block = child.into_block();
    ctx.close_child(block);
    ctx.write_line(Some(key.root_id()), "");
}

fn assignment(
    gen: &DasCodeGenerator<'_>,
    ctx: &mut CompileContext<'_>,
    key: &NodeKey,
    node: &Node,
) {
    let Some(resolved) = gen.required_in(ctx, key, "inVariable") else {
        return;
    };
    let target = gen.arg_name(ctx, &resolved);

    // Fields follow the live target, not the type cached on this node
    let types = gen.lang().types();
    let target_mn = gen
        .node(&resolved.key)
        .and_then(|target| target.data_str("typeName"))
        .or_else(|| node.data_str("typeName"));
    let target_type = types.resolve_or_any(target_mn.as_deref());
    let literal = |index: usize, title: &str, lang_type: &LangType| {
        node.data_str(&set_field_value_key(index, title))
            .map(|value| lang_type.ctor(&value, &IndexMap::new()))
    };

    let Some(fields) = &target_type.desc().args else {
        let value = match gen.optional_in(ctx, key, &slot_key("inValue", 0)) {
            Some(resolved) => Some(gen.arg_name(ctx, &resolved)),
            None => literal(0, "value", target_type),
        };
        match value {
            Some(value) => ctx.write_line(Some(key.root_id()), &format!("{target} = {value}")),
            None => gen.error(ctx, key, "input expected"),
        }
        return;
    };

    let num_fields = node.data_usize("numArgs").unwrap_or(0).min(fields.len());
    for (i, field) in fields.iter().enumerate().take(num_fields) {
        let field_type = types.resolve_or_any(Some(&field.mn));
        let value = match gen.optional_in(ctx, key, &slot_key("inValue", i)) {
            Some(resolved) => Some(gen.arg_name(ctx, &resolved)),
            // An untouched default is not an assignment
            None => literal(i, &field.name, field_type)
                .filter(|_| {
                    node.data_str(&set_field_value_key(i, &field.name)) != field_type.desc().default
                }),
        };
        if let Some(value) = value {
            ctx.write_line(Some(key.root_id()), &format!("{}.{} = {}", target, field.name, value));
        }
    }
}
