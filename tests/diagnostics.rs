mod common;

use common::{lang, Builder};
use dfgc::components::reshape;
use dfgc::{compile_graph, ConnectionError, NativeError};

fn native(line: usize, message: &str) -> NativeError {
    NativeError {
        file: "/tmp/project/main.das".into(),
        line,
        message: message.into(),
        ..Default::default()
    }
}

#[test]
fn test_toolchain_errors_map_back_to_nodes() {
    let lang = lang();
    let mut b = Builder::new(&lang, "main");
    let main = b.main_function();
    let random = b.node("random", &[]);
    let print = b.node("print", &[]);
    let text = b.node("to_string", &[]);
    b.connect(main, "fout", random, "fin");
    b.connect(random, "fout", print, "fin");
    b.connect(random, "result", text, "v");
    b.connect(text, "result", print, "text");

    let mut output = compile_graph(&b.graph, &lang);
    // 3 header lines, then 1 import and 2 blank lines, then the body
    let body_start = 3 + 3 + 1;
    output.remap_native_errors(
        &[
            native(body_start + 1, "cannot infer type"),
            NativeError {
                fixme: "wrap it in string()".into(),
                ..native(body_start + 2, "no matching call")
            },
            native(2, "bad options"),
            NativeError {
                file: "other.das".into(),
                ..native(body_start, "elsewhere")
            },
        ],
        "main.das",
    );

    assert_eq!(output.diagnostics.errors_for(random), ["cannot infer type".to_string()]);
    assert_eq!(
        output.diagnostics.errors_for(print),
        ["no matching call\nfixme: wrap it in string()".to_string()]
    );
    assert_eq!(output.diagnostics.global_text(), "bad options in line -1");
    assert!(output.diagnostics.errors_for(main).is_empty());
}

#[test]
fn test_annotations_for_diagnosed_nodes() {
    let lang = lang();
    let mut b = Builder::new(&lang, "main");
    let main = b.main_function();
    let branch = b.node("If", &[]);
    b.graph.node_mut(branch).unwrap().position = [40.0, 80.0];
    b.connect(main, "fout", branch, "fin");

    let output = compile_graph(&b.graph, &lang);
    let annotations = output.diagnostics.annotations(&b.graph);
    assert_eq!(annotations.len(), 1);
    assert_eq!(annotations[0].node, branch);
    assert_eq!(annotations[0].position, [40.0, 80.0]);
    assert_eq!(annotations[0].text, "input expected");
}

#[test]
fn test_retyping_a_variable_severs_incompatible_readers() {
    let lang = lang();
    let mut b = Builder::new(&lang, "main");
    let var = b.node("Variable", &[("typeName", "int".into())]);
    let text = b.node("to_string", &[]);
    let set = b.node("Set", &[]);
    b.connect(var, "result", text, "v");
    b.connect(var, "result", set, "inVariable");

    b.graph.node_mut(var).unwrap().set_data("typeName", "string");
    let severed = reshape(&mut b.graph, &lang, &b.modules, var);

    assert_eq!(severed.len(), 1);
    assert_eq!(severed[0].to_node, text);
    assert_eq!(b.graph.connection_count(), 1);
    assert_eq!(b.graph.fan_out(var, "result"), 1);
}

#[test]
fn test_connect_refuses_incompatible_types() {
    let lang = lang();
    let mut b = Builder::new(&lang, "main");
    let flag = b.node("bool", &[]);
    let text = b.node("to_string", &[]);
    let print = b.node("print", &[]);

    assert!(matches!(
        b.graph.connect(flag, "result", text, "v"),
        Err(ConnectionError::IncompatiblePorts { .. })
    ));
    assert!(matches!(
        b.graph.connect(flag, "result", print, "fin"),
        Err(ConnectionError::IncompatiblePorts { .. })
    ));
}
