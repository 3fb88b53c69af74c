mod common;

use common::{lang, Builder};
use dfgc::components::reshape;
use dfgc::diagnostics::NOT_PROCESSED;
use dfgc::{compile_graph, compile_graph_with_config, CompilerConfig, Connection, NodeId};

#[test]
fn test_side_effect_call_in_function_body() {
    let lang = lang();
    let mut b = Builder::new(&lang, "main");
    let main = b.main_function();
    let print = b.node("print", &[("text", "hi".into())]);
    b.connect(main, "fout", print, "fin");

    let output = compile_graph(&b.graph, &lang);
    assert_eq!(output.code, "def main()\n\tprint(\"hi\")\n\n");
    assert_eq!(output.main_function.as_deref(), Some("main"));
    assert!(output.imports.is_empty());
    assert!(output.diagnostics.is_empty());
}

#[test]
fn test_shared_value_is_generated_once() {
    let lang = lang();
    let mut b = Builder::new(&lang, "main");
    let main = b.main_function();
    let first = b.node("print", &[]);
    let second = b.node("print", &[]);
    let add = b.node("op_add", &[("a", "2".into()), ("b", "3".into())]);
    let text = b.node("to_string", &[]);
    b.connect(main, "fout", first, "fin");
    b.connect(first, "fout", second, "fin");
    b.connect(add, "result", text, "v");
    b.connect(text, "result", first, "text");
    b.connect(text, "result", second, "text");

    let output = compile_graph(&b.graph, &lang);
    assert_eq!(
        output.code,
        "def main()\n\tlet _5 = string((2 + 3))\n\tprint(_5)\n\tprint(_5)\n\n"
    );
    assert_eq!(output.line_map.lines_of(text), vec![1]);
    assert_eq!(output.line_map.lines_of(main), vec![0, 4]);
}

#[test]
fn test_disabled_flow_optimization_binds_every_local() {
    let lang = lang();
    let mut b = Builder::new(&lang, "main");
    let main = b.main_function();
    let print = b.node("print", &[]);
    let text = b.node("to_string", &[("v", "4".into())]);
    b.connect(main, "fout", print, "fin");
    b.connect(text, "result", print, "text");

    let config = CompilerConfig {
        optimize_flow: false,
        ..Default::default()
    };
    let output = compile_graph_with_config(&b.graph, &lang, &b.modules, &config);
    assert_eq!(output.code, "def main()\n\tlet _3 = string(4)\n\tprint(_3)\n\n");
}

#[test]
fn test_side_effect_result_is_bound_and_imported() {
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

    let output = compile_graph(&b.graph, &lang);
    assert_eq!(
        output.code,
        "require random\n\n\ndef main()\n\tlet _2 = random_int()\n\tprint(string(_2))\n\n"
    );
    assert_eq!(output.imports, vec!["random"]);
    assert_eq!(output.line_map.req_offset(), 3);
}

#[test]
fn test_if_with_empty_else() {
    let lang = lang();
    let mut b = Builder::new(&lang, "main");
    let main = b.main_function();
    let branch = b.node("If", &[]);
    let cond = b.node("op_lt", &[("a", "1".into()), ("b", "2".into())]);
    let print = b.node("print", &[("text", "yes".into())]);
    b.connect(main, "fout", branch, "fin");
    b.connect(cond, "result", branch, "inValue");
    b.connect(branch, "then", print, "fin");

    let output = compile_graph(&b.graph, &lang);
    assert_eq!(
        output.code,
        "def main()\n\tif ((1 < 2))\n\t\tprint(\"yes\")\n\telse\n\t\tpass\n\n"
    );
    assert!(output.diagnostics.is_empty());
}

#[test]
fn test_if_without_then_exit() {
    let lang = lang();
    let mut b = Builder::new(&lang, "main");
    let main = b.main_function();
    let branch = b.node("If", &[]);
    let cond = b.node("bool", &[("value", "true".into())]);
    b.connect(main, "fout", branch, "fin");
    b.connect(cond, "result", branch, "inValue");

    let output = compile_graph(&b.graph, &lang);
    assert_eq!(output.code, "def main()\n\tif (true)\n\t\tpass\n\telse\n\t\tpass\n\n");
    assert_eq!(output.diagnostics.errors_for(branch), ["then exit expected".to_string()]);
}

#[test]
fn test_if_without_condition_is_discarded() {
    let lang = lang();
    let mut b = Builder::new(&lang, "main");
    let main = b.main_function();
    let branch = b.node("If", &[]);
    b.connect(main, "fout", branch, "fin");

    let output = compile_graph(&b.graph, &lang);
    assert_eq!(
        output.code,
        "def main()\n\t//ERROR: node error here, code discarded\n\n"
    );
    assert_eq!(output.diagnostics.errors_for(branch), ["input expected".to_string()]);
}

#[test]
fn test_for_over_two_ranges() {
    let lang = lang();
    let mut b = Builder::new(&lang, "main");
    let main = b.main_function();
    let for_loop = b.node("For", &[("numArgs", 2.into())]);
    let outer = b.node("make_range", &[("n", "3".into())]);
    let inner = b.node("make_range", &[("n", "4".into())]);
    let print = b.node("print", &[]);
    let text = b.node("to_string", &[]);
    b.connect(main, "fout", for_loop, "fin");
    b.connect(outer, "result", for_loop, "range0");
    b.connect(inner, "result", for_loop, "range1");
    assert!(reshape(&mut b.graph, &lang, &b.modules, for_loop).is_empty());

    b.connect(for_loop, "body", print, "fin");
    b.connect(for_loop, "val1", text, "v");
    b.connect(text, "result", print, "text");

    let output = compile_graph(&b.graph, &lang);
    assert_eq!(
        output.code,
        "def main()\n\tfor x0_2, x1_2 in range(3), range(4)\n\t\tprint(string(x1_2))\n\n"
    );
}

#[test]
fn test_for_skips_unconnected_ranges() {
    let lang = lang();
    let mut b = Builder::new(&lang, "main");
    let main = b.main_function();
    let for_loop = b.node("For", &[("numArgs", 2.into())]);
    let range = b.node("make_range", &[("n", "3".into())]);
    b.connect(main, "fout", for_loop, "fin");
    b.connect(range, "result", for_loop, "range1");

    let output = compile_graph(&b.graph, &lang);
    assert_eq!(output.code, "def main()\n\tfor x1_2 in range(3)\n\t\tpass\n\n");

    let mut b = Builder::new(&lang, "main");
    let main = b.main_function();
    let for_loop = b.node("For", &[]);
    b.connect(main, "fout", for_loop, "fin");
    let output = compile_graph(&b.graph, &lang);
    assert_eq!(output.diagnostics.errors_for(for_loop), ["input expected".to_string()]);
}

#[test]
fn test_while_loop() {
    let lang = lang();
    let mut b = Builder::new(&lang, "main");
    let main = b.main_function();
    let looping = b.node("While", &[]);
    let cond = b.node("bool", &[("value", "false".into())]);
    b.connect(main, "fout", looping, "fin");
    b.connect(cond, "result", looping, "inValue");

    let output = compile_graph(&b.graph, &lang);
    assert_eq!(output.code, "def main()\n\twhile (false)\n\t\tpass\n\n");
}

#[test]
fn test_function_parameters_and_prefilled_literal() {
    let lang = lang();
    let mut b = Builder::new(&lang, "main");
    let f = b.node(
        "Function",
        &[
            ("name", "f".into()),
            ("numArgs", 2.into()),
            ("typeName0", "int".into()),
            ("typeName1", "bool".into()),
            ("annotation", "export".into()),
        ],
    );
    let print = b.node("print", &[]);
    let text = b.node("to_string", &[]);
    b.connect(f, "fout", print, "fin");
    b.connect(f, "out0", text, "v");
    b.connect(text, "result", print, "text");

    let g = b.node("Function", &[("name", "g".into()), ("numArgs", 1.into())]);
    let five = b.node("int", &[("value", "5".into())]);
    b.connect(five, "result", g, "arg0");

    let output = compile_graph(&b.graph, &lang);
    assert_eq!(
        output.code,
        "[export]\ndef f(_1_0: int; _1_1: bool)\n\tprint(string(_1_0))\n\ndef g(_4_0 = 5)\n\tpass\n\n"
    );
    assert!(output.diagnostics.is_empty());
    assert_eq!(output.main_function, None);
}

#[test]
fn test_function_rejects_computed_prefill() {
    let lang = lang();
    let mut b = Builder::new(&lang, "main");
    let f = b.node("Function", &[("name", "f".into()), ("numArgs", 1.into())]);
    let add = b.node("op_add", &[]);
    b.connect(add, "result", f, "arg0");

    let output = compile_graph(&b.graph, &lang);
    assert_eq!(output.diagnostics.errors_for(f), ["Unsupported argument type: op_add".to_string()]);
    assert!(output.code.contains("def f(_1_0)"));
}

#[test]
fn test_first_main_mark_wins() {
    let lang = lang();
    let mut b = Builder::new(&lang, "main");
    b.node("Function", &[("name", "first".into()), ("mainFuncMark", true.into())]);
    b.node("Function", &[("name", "second".into()), ("mainFuncMark", true.into())]);

    let output = compile_graph(&b.graph, &lang);
    assert_eq!(output.main_function.as_deref(), Some("first"));
}

#[test]
fn test_struct_definition() {
    let lang = lang();
    let mut b = Builder::new(&lang, "main");
    b.node(
        "Struct",
        &[
            ("name", "Point".into()),
            ("numArgs", 3.into()),
            ("valueArg0", serde_json::json!({ "valueName": "x", "valueType": "int", "value": "1" })),
            ("valueArg1", serde_json::json!({ "valueName": "label", "valueType": "string" })),
            ("valueArg2", serde_json::json!({ "valueName": "raw", "value": "[]" })),
        ],
    );
    let empty = b.node("Struct", &[]);

    let output = compile_graph(&b.graph, &lang);
    assert_eq!(
        output.code,
        format!(
            "struct Point\n\tx: int = 1\n\tlabel: string\n\traw = []\n\nstruct _{}\n\tpass\n\n",
            empty
        )
    );
}

#[test]
fn test_inject_code() {
    let lang = lang();
    let mut b = Builder::new(&lang, "main");
    let top = b.node("InjectTopLevelCode", &[("code", "options gen2\nlet PI = 3.14".into())]);
    let main = b.main_function();
    let inline = b.node("InjectCode", &[("code", "debug(1)".into())]);
    let print = b.node("print", &[("text", "x".into())]);
    b.connect(main, "fout", inline, "fin");
    b.connect(inline, "fout", print, "fin");

    let output = compile_graph(&b.graph, &lang);
    assert_eq!(
        output.code,
        "options gen2\nlet PI = 3.14\ndef main()\n\tdebug(1)\n\tprint(\"x\")\n\n"
    );
    assert_eq!(output.line_map.lines_of(top), vec![0, 1]);
}

#[test]
fn test_sequence_runs_exits_in_order() {
    let lang = lang();
    let mut b = Builder::new(&lang, "main");
    let main = b.main_function();
    let seq = b.node("Sequence", &[("numExits", 3.into())]);
    let a = b.node("print", &[("text", "a".into())]);
    let c = b.node("print", &[("text", "c".into())]);
    b.connect(main, "fout", seq, "fin");
    b.connect(seq, "out2", c, "fin");
    b.connect(seq, "out0", a, "fin");

    let output = compile_graph(&b.graph, &lang);
    assert_eq!(output.code, "def main()\n\tprint(\"a\")\n\tprint(\"c\")\n\n");
}

#[test]
fn test_flow_reentry_is_emitted_once() {
    let lang = lang();
    let mut b = Builder::new(&lang, "main");
    let main = b.main_function();
    let seq = b.node("Sequence", &[("numExits", 2.into())]);
    let shared = b.node("print", &[("text", "x".into())]);
    b.connect(main, "fout", seq, "fin");
    b.connect(seq, "out0", shared, "fin");
    // A second wire into a single-connection flow input, as restored from storage
    b.graph.add_connection(Connection::new(seq, "out1", shared, "fin"));

    let output = compile_graph(&b.graph, &lang);
    assert_eq!(output.code, "def main()\n\tprint(\"x\")\n\n");
    assert_eq!(
        output.diagnostics.errors_for(shared),
        ["Flow node is reached more than once".to_string()]
    );
    assert_eq!(output.line_map.lines_of(shared), vec![1]);
}

#[test]
fn test_set_primitive_variable() {
    let lang = lang();
    let mut b = Builder::new(&lang, "main");
    let main = b.main_function();
    let set = b.node("Set", &[]);
    let var = b.node("Variable", &[("typeName", "int".into())]);
    b.connect(main, "fout", set, "fin");
    b.connect(var, "result", set, "inVariable");
    reshape(&mut b.graph, &lang, &b.modules, set);
    b.graph.node_mut(set).unwrap().set_data("0_valueValue", "7");

    let output = compile_graph(&b.graph, &lang);
    assert_eq!(output.code, "def main()\n\tvar _3: int\n\t_3 = 7\n\n");
}

#[test]
fn test_set_aggregate_fields() {
    let lang = lang();
    let mut b = Builder::new(&lang, "main");
    let main = b.main_function();
    let set = b.node("Set", &[]);
    let var = b.node("Variable", &[("typeName", "float2".into())]);
    b.connect(main, "fout", set, "fin");
    b.connect(var, "result", set, "inVariable");
    reshape(&mut b.graph, &lang, &b.modules, set);
    b.graph.node_mut(set).unwrap().set_data("0_xValue", "1");
    let four = b.node("int", &[("value", "4".into())]);
    b.connect(four, "result", set, "inValue1");

    let output = compile_graph(&b.graph, &lang);
    assert_eq!(output.code, "def main()\n\tvar _3: float2\n\t_3.x = 1\n\t_3.y = 4\n\n");
}

#[test]
fn test_set_follows_retyped_variable() {
    let lang = lang();
    let mut b = Builder::new(&lang, "main");
    let main = b.main_function();
    let set = b.node("Set", &[]);
    let var = b.node("Variable", &[("typeName", "float2".into())]);
    b.connect(main, "fout", set, "fin");
    b.connect(var, "result", set, "inVariable");
    reshape(&mut b.graph, &lang, &b.modules, set);
    b.graph.node_mut(set).unwrap().set_data("0_xValue", "1");

    b.graph.node_mut(var).unwrap().set_data("typeName", "int");
    assert!(reshape(&mut b.graph, &lang, &b.modules, var).is_empty());

    let output = compile_graph(&b.graph, &lang);
    assert!(output.code.starts_with("def main()\n\tvar _3: int\n"));
    assert!(!output.code.contains("_3.x"));
    assert_eq!(output.diagnostics.errors_for(set), ["input expected".to_string()]);
}

#[test]
fn test_unreached_flow_node_is_not_processed() {
    let lang = lang();
    let mut b = Builder::new(&lang, "main");
    let main = b.main_function();
    let first = b.node("print", &[]);
    let second = b.node("print", &[]);
    let random = b.node("random", &[]);
    let a = b.node("to_string", &[]);
    let c = b.node("to_string", &[]);
    b.connect(main, "fout", first, "fin");
    b.connect(first, "fout", second, "fin");
    b.connect(random, "result", a, "v");
    b.connect(random, "result", c, "v");
    b.connect(a, "result", first, "text");
    b.connect(c, "result", second, "text");

    let output = compile_graph(&b.graph, &lang);
    assert_eq!(output.diagnostics.errors_for(random), [NOT_PROCESSED.to_string()]);
    assert!(output.code.contains("print(string(_4))"));
}

#[test]
fn test_value_cycle_is_reported() {
    let lang = lang();
    let mut b = Builder::new(&lang, "main");
    let main = b.main_function();
    let print = b.node("print", &[]);
    let text = b.node("to_string", &[]);
    let x = b.node("op_add", &[("b", "1".into())]);
    let y = b.node("op_add", &[("b", "2".into())]);
    b.connect(main, "fout", print, "fin");
    b.connect(text, "result", print, "text");
    b.connect(x, "result", text, "v");
    b.connect(y, "result", x, "a");
    b.connect(x, "result", y, "a");

    let output = compile_graph(&b.graph, &lang);
    assert!(output
        .diagnostics
        .errors_for(x)
        .contains(&"cyclic value dependency".to_string()));
}

#[test]
fn test_unknown_component_is_a_diagnostic() {
    let lang = lang();
    let mut b = Builder::new(&lang, "main");
    let main = b.main_function();
    b.graph.add_node(dfgc::Node::new(NodeId(9), "Gone"));
    b.graph.add_connection(dfgc::Connection::new(main, "fout", NodeId(9), "fin"));

    let output = compile_graph(&b.graph, &lang);
    assert_eq!(output.diagnostics.errors_for(NodeId(9)), ["Unknown component: Gone".to_string()]);
}
