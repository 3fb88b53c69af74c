//! # Type Registry
//!
//! Resolved type descriptors keyed by machine name, plus the designated "any"
//! and logic types of the active language.

use crate::error::{CatalogError, DfgcError, Result};
use crate::graph::{PortTag, Socket};
use crate::metadata::descriptors::{LangCoreDesc, LangDesc, LangTypeDesc};
use crate::metadata::substitute_args;
use indexmap::IndexMap;
use regex::Regex;
use std::collections::HashMap;

/// A loaded type
#[derive(Debug, Clone)]
pub struct LangType {
    desc: LangTypeDesc,
    is_void: bool,
    is_any: bool,
    validator: Option<Regex>,
    socket: Socket,
}

impl LangType {
    /// Build a type from its (already merged) descriptor
    pub fn new(desc: LangTypeDesc, is_void: bool, is_any: bool) -> Result<Self, CatalogError> {
        let validator = desc
            .validator
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(|e| CatalogError::InvalidValidator {
                type_mn: desc.mn.clone(),
                reason: e.to_string(),
            })?;
        let socket = Socket::new(desc.base_mn.clone().unwrap_or_else(|| desc.mn.clone()), is_any);

        Ok(Self {
            desc,
            is_void,
            is_any,
            validator,
            socket,
        })
    }

    /// Descriptor
    pub fn desc(&self) -> &LangTypeDesc {
        &self.desc
    }

    /// Machine name
    pub fn mn(&self) -> &str {
        &self.desc.mn
    }

    /// Spelling in generated code
    pub fn type_name(&self) -> &str {
        &self.desc.type_name
    }

    /// Whether this is a void type
    pub fn is_void(&self) -> bool {
        self.is_void
    }

    /// Whether this is the designated "any" type
    pub fn is_any(&self) -> bool {
        self.is_any
    }

    /// Whether values may be bound to a local identifier
    pub fn is_local(&self) -> bool {
        self.desc.is_local.unwrap_or(false)
    }

    /// Whether values can drive a `for` loop
    pub fn is_iterable(&self) -> bool {
        self.desc.is_iterable.unwrap_or(false)
    }

    /// Socket of ports carrying this type
    pub fn socket(&self) -> &Socket {
        &self.socket
    }

    /// Port tag of ports carrying this type
    pub fn tag(&self) -> PortTag {
        PortTag::Value(self.socket.clone())
    }

    /// Whether a literal can be typed in rather than only wired
    pub fn supports_text_input(&self) -> bool {
        self.desc.validator.is_some() || self.desc.ctor.is_some() || self.desc.enum_values.is_some()
    }

    /// Check a literal against the validator and the enumerated choices
    pub fn accepts_literal(&self, literal: &str) -> bool {
        if let Some(choices) = &self.desc.enum_values {
            if !choices.iter().any(|choice| choice == literal) {
                return false;
            }
        }
        self.validator.as_ref().map_or(true, |re| re.is_match(literal))
    }

    /// Render a literal or expression through the construction template.
    ///
    /// Without a template the text is returned verbatim. With named arguments each
    /// `$name` is substituted; otherwise the single `$` receives `text`.
    pub fn ctor(&self, text: &str, args: &IndexMap<String, String>) -> String {
        let Some(template) = &self.desc.ctor else {
            return text.to_string();
        };
        if args.is_empty() {
            return template.replacen('$', text, 1);
        }
        let named: Vec<(&str, &str)> = args
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
            .collect();
        substitute_args(template, &named)
    }
}

/// All types of the active language
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    types: IndexMap<String, LangType>,
    any_mn: String,
    logic_mn: String,
}

impl TypeRegistry {
    /// Load the language's types, overlaying matching core descriptors.
    ///
    /// Rejected entries are pushed onto `issues`; a missing "any" or logic type is fatal.
    pub fn load(core: &LangCoreDesc, lang: &LangDesc, issues: &mut Vec<CatalogError>) -> Result<Self> {
        let core_types: HashMap<&str, &LangTypeDesc> =
            core.types.iter().map(|desc| (desc.mn.as_str(), desc)).collect();
        let is_void = |mn: &str| core.void_types.iter().any(|v| v == mn);
        let is_any = |mn: &str| core.any_types.iter().any(|a| a == mn);

        let mut types = IndexMap::new();

        let any_desc = lang
            .types
            .iter()
            .find(|desc| is_any(&desc.mn))
            .ok_or(DfgcError::MissingAnyType)?;
        let any_type = LangType::new(any_desc.clone(), is_void(&any_desc.mn), true).map_err(|e| {
            tracing::error!("[DFGC] {}", e);
            DfgcError::MissingAnyType
        })?;
        let any_mn = any_type.mn().to_string();
        types.insert(any_mn.clone(), any_type);

        for desc in &lang.types {
            if is_any(&desc.mn) {
                continue;
            }
            if types.contains_key(&desc.mn) {
                let issue = CatalogError::DuplicateType(desc.mn.clone());
                tracing::error!("[DFGC] {}", issue);
                issues.push(issue);
                continue;
            }

            let core_desc = match (&desc.base_mn, desc.is_ref) {
                (Some(base), false) => core_types
                    .get(base.as_str())
                    .or_else(|| core_types.get(desc.mn.as_str())),
                _ => core_types.get(desc.mn.as_str()),
            };
            let merged = core_desc.map_or_else(|| desc.clone(), |core_desc| desc.merged_with(core_desc));

            match LangType::new(merged, is_void(&desc.mn), false) {
                Ok(lang_type) => {
                    types.insert(desc.mn.clone(), lang_type);
                }
                Err(issue) => {
                    tracing::error!("[DFGC] {}", issue);
                    issues.push(issue);
                }
            }
        }

        if !types.contains_key(&core.logic_type) {
            return Err(DfgcError::MissingLogicType(core.logic_type.clone()));
        }

        Ok(Self {
            types,
            any_mn,
            logic_mn: core.logic_type.clone(),
        })
    }

    /// Look a type up by machine name
    pub fn resolve(&self, mn: &str) -> Option<&LangType> {
        self.types.get(mn)
    }

    /// Look a type up, falling back to the "any" type
    pub fn resolve_or_any(&self, mn: Option<&str>) -> &LangType {
        mn.and_then(|mn| self.resolve(mn)).unwrap_or_else(|| self.any_type())
    }

    /// The designated "any" type
    pub fn any_type(&self) -> &LangType {
        &self.types[&self.any_mn]
    }

    /// The designated boolean type
    pub fn logic_type(&self) -> &LangType {
        &self.types[&self.logic_mn]
    }

    /// Whether `lang_type` is the "any" type
    pub fn is_any(&self, lang_type: &LangType) -> bool {
        lang_type.is_any()
    }

    /// Whether `lang_type` is void
    pub fn is_void(&self, lang_type: &LangType) -> bool {
        lang_type.is_void()
    }

    /// Whether `lang_type` can be entered as a literal
    pub fn supports_text_input(&self, lang_type: &LangType) -> bool {
        lang_type.supports_text_input()
    }

    /// Render a literal or expression through `lang_type`'s template
    pub fn render(&self, lang_type: &LangType, text: &str, args: &IndexMap<String, String>) -> String {
        lang_type.ctor(text, args)
    }

    /// All types in load order
    pub fn types(&self) -> impl Iterator<Item = &LangType> {
        self.types.values()
    }

    /// Number of loaded types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether no types are loaded
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
