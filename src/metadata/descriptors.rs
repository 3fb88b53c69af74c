//! Serde descriptors for a target language, as shipped by the language backend.

use serde::{Deserialize, Serialize};

/// Named, typed slot: a function argument or an aggregate field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeArgDesc {
    /// Argument or field name
    pub name: String,
    /// Machine name of its type
    pub mn: String,
}

impl TypeArgDesc {
    /// Create a new slot descriptor
    pub fn new(name: impl Into<String>, mn: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mn: mn.into(),
        }
    }
}

/// Type descriptor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LangTypeDesc {
    /// Machine name (unique key)
    pub mn: String,
    /// Display name, also the spelling used in generated code
    pub type_name: String,
    /// Machine name of the base type, if this is a derived type
    pub base_mn: Option<String>,
    /// Reference types never merge with their base's core descriptor
    pub is_ref: bool,
    /// Construction template (`$` or `$argName` placeholders)
    pub ctor: Option<String>,
    /// Literal validation pattern
    pub validator: Option<String>,
    /// Enumerated literal choices
    #[serde(rename = "enum")]
    pub enum_values: Option<Vec<String>>,
    /// Default literal
    pub default: Option<String>,
    /// Values may be bound to a local identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_local: Option<bool>,
    /// Values can be iterated by a `for` loop
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_iterable: Option<bool>,
    /// Modules the generated code must import to use this type
    pub requirements: Vec<String>,
    /// Aggregate fields, in declaration order
    pub args: Option<Vec<TypeArgDesc>>,
}

impl LangTypeDesc {
    /// Overlay a core descriptor on a language descriptor. Core fields win where
    /// present; the machine name always stays the language type's own.
    pub fn merged_with(&self, core: &LangTypeDesc) -> LangTypeDesc {
        fn pick<T: Clone>(core: &Option<T>, own: &Option<T>) -> Option<T> {
            core.clone().or_else(|| own.clone())
        }

        LangTypeDesc {
            mn: self.mn.clone(),
            type_name: if core.type_name.is_empty() {
                self.type_name.clone()
            } else {
                core.type_name.clone()
            },
            base_mn: pick(&core.base_mn, &self.base_mn),
            is_ref: self.is_ref || core.is_ref,
            ctor: pick(&core.ctor, &self.ctor),
            validator: pick(&core.validator, &self.validator),
            enum_values: pick(&core.enum_values, &self.enum_values),
            default: pick(&core.default, &self.default),
            is_local: core.is_local.or(self.is_local),
            is_iterable: core.is_iterable.or(self.is_iterable),
            requirements: if core.requirements.is_empty() {
                self.requirements.clone()
            } else {
                core.requirements.clone()
            },
            args: pick(&core.args, &self.args),
        }
    }
}

/// Callable or constructor descriptor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LangFunctionDesc {
    /// Machine name, used as the component name
    pub mn: String,
    /// Name emitted in generated calls
    pub name: String,
    /// Machine name of the result type
    pub res_mn: String,
    /// Ordered arguments
    pub args: Vec<TypeArgDesc>,
    /// Construction template replacing the default `name(args)` spelling
    pub ctor: Option<String>,
    /// Calls must run in program order
    #[serde(rename = "sideeffect")]
    pub side_effect: bool,
    /// Modules the generated code must import to use this function
    pub requirements: Vec<String>,
}

/// Core descriptor: the language-independent part every backend provides
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LangCoreDesc {
    /// Core type descriptors, merged over matching language types
    pub types: Vec<LangTypeDesc>,
    /// Core functions (operators and the like)
    pub functions: Vec<LangFunctionDesc>,
    /// Machine names that act as the "any" type
    pub any_types: Vec<String>,
    /// Machine names that act as void
    pub void_types: Vec<String>,
    /// Machine name of the boolean type used by conditions
    pub logic_type: String,
}

/// Language descriptor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LangDesc {
    /// Type descriptors
    pub types: Vec<LangTypeDesc>,
    /// Function descriptors
    pub functions: Vec<LangFunctionDesc>,
}

/// Editor extras
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LangExtraInfo {
    /// Annotations offered for function definitions
    pub func_annotations: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_desc_from_json() {
        let desc: LangTypeDesc = serde_json::from_str(
            r#"{ "mn": "i", "typeName": "int", "ctor": "int($)", "enum": ["1", "2"],
                 "isLocal": true, "requirements": ["math"] }"#,
        )
        .unwrap();
        assert_eq!(desc.type_name, "int");
        assert_eq!(desc.enum_values.as_deref(), Some(&["1".to_string(), "2".to_string()][..]));
        assert_eq!(desc.is_local, Some(true));
        assert_eq!(desc.is_iterable, None);
        assert_eq!(desc.requirements, vec!["math"]);
    }

    #[test]
    fn test_core_fields_win_on_merge() {
        let lang = LangTypeDesc {
            mn: "i".into(),
            type_name: "int".into(),
            default: Some("1".into()),
            validator: Some("^[0-9]+$".into()),
            ..Default::default()
        };
        let core = LangTypeDesc {
            mn: "i".into(),
            default: Some("0".into()),
            is_local: Some(true),
            ..Default::default()
        };

        let merged = lang.merged_with(&core);
        assert_eq!(merged.type_name, "int");
        assert_eq!(merged.default.as_deref(), Some("0"));
        assert_eq!(merged.validator.as_deref(), Some("^[0-9]+$"));
        assert_eq!(merged.is_local, Some(true));
    }

    #[test]
    fn test_explicit_core_flags_override_language_flags() {
        let lang = LangTypeDesc {
            mn: "r".into(),
            type_name: "range".into(),
            is_local: Some(true),
            is_iterable: Some(true),
            ..Default::default()
        };
        let core = LangTypeDesc {
            mn: "r".into(),
            is_local: Some(false),
            ..Default::default()
        };

        let merged = lang.merged_with(&core);
        assert_eq!(merged.is_local, Some(false));
        assert_eq!(merged.is_iterable, Some(true));
    }

    #[test]
    fn test_function_side_effect_key() {
        let desc: LangFunctionDesc = serde_json::from_str(
            r#"{ "mn": "print", "name": "print", "resMn": "v", "sideeffect": true,
                 "args": [{ "name": "text", "mn": "s" }] }"#,
        )
        .unwrap();
        assert!(desc.side_effect);
        assert_eq!(desc.args[0], TypeArgDesc::new("text", "s"));
    }
}
