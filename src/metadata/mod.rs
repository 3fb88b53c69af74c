//! # Language Metadata
//!
//! Everything the compiler knows about the target language: its types, its
//! callable functions and the components built from them. A [`LanguageContext`]
//! is loaded once from the backend's descriptors and shared read-only by every
//! compile pass.

pub mod descriptors;
mod functions;
mod types;

pub use descriptors::{LangCoreDesc, LangDesc, LangExtraInfo, LangFunctionDesc, LangTypeDesc, TypeArgDesc};
pub use functions::{FunctionCatalog, LangFunction};
pub use types::{LangType, TypeRegistry};

use crate::components::{Component, ComponentKind, ComponentRegistry};
use crate::error::{CatalogError, Result};

/// Substitute every `$name` of `template` in one left-to-right pass.
///
/// The longest matching argument name wins; substituted text is never rescanned.
pub(crate) fn substitute_args(template: &str, args: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        let hit = args
            .iter()
            .filter(|(name, _)| !name.is_empty() && after.starts_with(*name))
            .max_by_key(|(name, _)| name.len());
        match hit {
            Some((name, value)) => {
                out.push_str(value);
                rest = &after[name.len()..];
            }
            None => {
                out.push('$');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Loaded language: types, functions and registered components
#[derive(Debug, Clone)]
pub struct LanguageContext {
    types: TypeRegistry,
    functions: FunctionCatalog,
    components: ComponentRegistry,
    func_annotations: Vec<String>,
    issues: Vec<CatalogError>,
}

impl LanguageContext {
    /// Build the context from parsed descriptors.
    ///
    /// Components are registered in a fixed order: built-in kinds, literal
    /// constructors for text-enterable core types, language functions, core
    /// functions. Invalid catalog entries are dropped and kept in [`Self::issues`].
    pub fn load(core: &LangCoreDesc, lang: &LangDesc, extra: &LangExtraInfo) -> Result<Self> {
        tracing::info!(
            "[DFGC] Loading language: {} type(s), {} function(s), {} core function(s)",
            lang.types.len(),
            lang.functions.len(),
            core.functions.len()
        );

        let mut issues = Vec::new();
        let types = TypeRegistry::load(core, lang, &mut issues)?;
        let mut components = ComponentRegistry::with_builtins();

        for core_type in &core.types {
            let is_special = core.void_types.contains(&core_type.mn) || core.any_types.contains(&core_type.mn);
            if is_special {
                continue;
            }
            let Some(lang_type) = types.resolve(&core_type.mn) else {
                continue;
            };
            if lang_type.supports_text_input() {
                components.register(Component::new(
                    lang_type.type_name(),
                    ComponentKind::TypeCtor {
                        type_mn: lang_type.mn().to_string(),
                    },
                ));
            }
        }

        let mut functions = FunctionCatalog::new();
        for descs in [&lang.functions, &core.functions] {
            functions.load(descs.iter(), &types, &mut issues);
            for desc in descs {
                let Some(function) = functions.get(&desc.mn) else {
                    continue;
                };
                if components.get(function.mn()).is_none() {
                    components.register(Component::new(
                        function.mn(),
                        ComponentKind::Call {
                            function_mn: function.mn().to_string(),
                            side_effect: function.has_side_effect(),
                        },
                    ));
                }
            }
        }

        tracing::info!(
            "[DFGC] Language loaded: {} type(s), {} function(s), {} component(s), {} issue(s)",
            types.len(),
            functions.len(),
            components.len(),
            issues.len()
        );

        Ok(Self {
            types,
            functions,
            components,
            func_annotations: extra.func_annotations.clone(),
            issues,
        })
    }

    /// Parse the three descriptor documents and load them
    pub fn from_json(core: &str, lang: &str, extra: Option<&str>) -> Result<Self> {
        let core: LangCoreDesc = serde_json::from_str(core)?;
        let lang: LangDesc = serde_json::from_str(lang)?;
        let extra: LangExtraInfo = extra.map(serde_json::from_str).transpose()?.unwrap_or_default();
        Self::load(&core, &lang, &extra)
    }

    /// Type registry
    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// Function catalog
    pub fn functions(&self) -> &FunctionCatalog {
        &self.functions
    }

    /// Component by registered name
    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.get(name)
    }

    /// All components in registration order
    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.components.components()
    }

    /// Annotations offered for function definitions
    pub fn func_annotations(&self) -> &[String] {
        &self.func_annotations
    }

    /// Catalog entries rejected while loading
    pub fn issues(&self) -> &[CatalogError] {
        &self.issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CORE: &str = r#"{
        "types": [
            { "mn": "i", "ctor": "$", "validator": "^-?[0-9]+$", "default": "0" },
            { "mn": "v" },
            { "mn": "b", "enum": ["true", "false"], "default": "false" }
        ],
        "functions": [
            { "mn": "op_add", "name": "+", "resMn": "i", "ctor": "($a + $b)",
              "args": [{ "name": "a", "mn": "i" }, { "name": "b", "mn": "i" }] }
        ],
        "anyTypes": ["auto"],
        "voidTypes": ["v"],
        "logicType": "b"
    }"#;

    const LANG: &str = r#"{
        "types": [
            { "mn": "auto", "typeName": "auto" },
            { "mn": "i", "typeName": "int", "isLocal": true },
            { "mn": "b", "typeName": "bool", "isLocal": true },
            { "mn": "v", "typeName": "void" }
        ],
        "functions": [
            { "mn": "print", "name": "print", "resMn": "v", "sideeffect": true,
              "args": [{ "name": "text", "mn": "i" }] },
            { "mn": "broken", "name": "broken", "resMn": "i",
              "args": [{ "name": "x", "mn": "nope" }] }
        ]
    }"#;

    #[test]
    fn test_registration_order() {
        let lang = LanguageContext::from_json(CORE, LANG, Some(r#"{ "funcAnnotations": ["[export]"] }"#)).unwrap();

        let names: Vec<_> = lang.components().map(Component::name).skip(15).collect();
        assert_eq!(names, vec!["int", "bool", "print", "op_add"]);
        assert_eq!(lang.func_annotations(), ["[export]".to_string()]);
        assert_eq!(lang.issues().len(), 1);
        assert_eq!(
            lang.component("print").map(Component::kind),
            Some(&ComponentKind::Call {
                function_mn: "print".into(),
                side_effect: true
            })
        );
    }

    #[test]
    fn test_substitution_scans_once() {
        let args = [("a", "\"$b\""), ("b", "2"), ("ab", "x")];
        assert_eq!(substitute_args("($a + $b)", &args), "(\"$b\" + 2)");
        assert_eq!(substitute_args("$ab|$a|$c|$", &args), "x|\"$b\"|$c|$");
    }

    #[test]
    fn test_malformed_json_is_fatal() {
        assert!(LanguageContext::from_json("{", LANG, None).is_err());
    }
}
