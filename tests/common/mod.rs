//! Shared language fixture and graph-building helpers.

#![allow(dead_code)]

use dfgc::{Graph, LanguageContext, ModuleLibrary, NodeData, NodeId};
use serde_json::Value;

pub const CORE: &str = r#"{
    "types": [
        { "mn": "int", "ctor": "$", "validator": "^-?[0-9]+$", "default": "0" },
        { "mn": "bool", "enum": ["true", "false"], "default": "false" },
        { "mn": "string", "ctor": "\"$\"", "default": "" }
    ],
    "functions": [
        { "mn": "op_add", "name": "+", "resMn": "int", "ctor": "($a + $b)",
          "args": [{ "name": "a", "mn": "int" }, { "name": "b", "mn": "int" }] },
        { "mn": "op_lt", "name": "<", "resMn": "bool", "ctor": "($a < $b)",
          "args": [{ "name": "a", "mn": "int" }, { "name": "b", "mn": "int" }] }
    ],
    "anyTypes": ["auto"],
    "voidTypes": ["void"],
    "logicType": "bool"
}"#;

pub const LANG: &str = r#"{
    "types": [
        { "mn": "auto", "typeName": "auto", "isLocal": true },
        { "mn": "void", "typeName": "void" },
        { "mn": "int", "typeName": "int", "isLocal": true },
        { "mn": "bool", "typeName": "bool", "isLocal": true },
        { "mn": "string", "typeName": "string", "isLocal": true },
        { "mn": "range", "typeName": "range", "isLocal": true, "isIterable": true },
        { "mn": "float2", "typeName": "float2", "isLocal": true, "requirements": ["math"],
          "args": [{ "name": "x", "mn": "int" }, { "name": "y", "mn": "int" }] }
    ],
    "functions": [
        { "mn": "print", "name": "print", "resMn": "void", "sideeffect": true,
          "args": [{ "name": "text", "mn": "string" }] },
        { "mn": "make_range", "name": "range", "resMn": "range",
          "args": [{ "name": "n", "mn": "int" }] },
        { "mn": "random", "name": "random_int", "resMn": "int", "sideeffect": true,
          "requirements": ["random"], "args": [] },
        { "mn": "to_string", "name": "string", "resMn": "string",
          "args": [{ "name": "v", "mn": "int" }] }
    ]
}"#;

/// Route library logs through the test harness output
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn lang() -> LanguageContext {
    init_tracing();
    LanguageContext::from_json(CORE, LANG, Some(r#"{ "funcAnnotations": ["export"] }"#)).unwrap()
}

pub fn data(pairs: &[(&str, Value)]) -> NodeData {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

/// Test-side graph builder over one language and module library
pub struct Builder<'l> {
    pub lang: &'l LanguageContext,
    pub modules: ModuleLibrary,
    pub graph: Graph,
}

impl<'l> Builder<'l> {
    pub fn new(lang: &'l LanguageContext, name: &str) -> Self {
        Self {
            lang,
            modules: ModuleLibrary::new(),
            graph: Graph::new(name),
        }
    }

    pub fn node(&mut self, component: &str, pairs: &[(&str, Value)]) -> NodeId {
        self.graph
            .create_node(self.lang, &self.modules, component, data(pairs))
            .unwrap()
    }

    pub fn connect(&mut self, from: NodeId, from_port: &str, to: NodeId, to_port: &str) {
        self.graph.connect(from, from_port, to, to_port).unwrap();
    }

    /// A `main` function definition
    pub fn main_function(&mut self) -> NodeId {
        self.node("Function", &[("name", "main".into()), ("mainFuncMark", true.into())])
    }
}
