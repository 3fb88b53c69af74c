//! # Function Catalog
//!
//! Callable and constructor descriptors that survived validation against the
//! type registry.

use crate::error::CatalogError;
use crate::metadata::descriptors::LangFunctionDesc;
use crate::metadata::substitute_args;
use crate::metadata::types::TypeRegistry;
use indexmap::IndexMap;

/// A validated function
#[derive(Debug, Clone)]
pub struct LangFunction {
    desc: LangFunctionDesc,
}

impl LangFunction {
    /// Validate `desc` and wrap it
    pub fn new(desc: LangFunctionDesc, registry: &TypeRegistry) -> Result<Self, CatalogError> {
        Self::validate(&desc, registry)?;
        Ok(Self { desc })
    }

    /// Every argument type must resolve and be non-void; the result type must resolve.
    pub fn validate(desc: &LangFunctionDesc, registry: &TypeRegistry) -> Result<(), CatalogError> {
        for arg in &desc.args {
            let arg_type = registry
                .resolve(&arg.mn)
                .ok_or_else(|| CatalogError::UnknownArgumentType {
                    function: desc.name.clone(),
                    argument: arg.name.clone(),
                    type_mn: arg.mn.clone(),
                })?;
            if arg_type.is_void() {
                return Err(CatalogError::VoidArgument {
                    function: desc.name.clone(),
                    argument: arg.name.clone(),
                });
            }
        }
        if registry.resolve(&desc.res_mn).is_none() {
            return Err(CatalogError::UnknownResultType {
                function: desc.name.clone(),
                type_mn: desc.res_mn.clone(),
            });
        }
        Ok(())
    }

    /// Descriptor
    pub fn desc(&self) -> &LangFunctionDesc {
        &self.desc
    }

    /// Machine name
    pub fn mn(&self) -> &str {
        &self.desc.mn
    }

    /// Whether calls must run in program order
    pub fn has_side_effect(&self) -> bool {
        self.desc.side_effect
    }

    /// Render a call from per-argument texts.
    ///
    /// Without a template this is `name(a, b, ...)` in declaration order; with one,
    /// each `$argName` is substituted. Missing arguments render as empty text.
    pub fn ctor(&self, args: &IndexMap<String, String>) -> String {
        let arg_text = |name: &str| args.get(name).map_or("", String::as_str);

        match &self.desc.ctor {
            None => {
                let joined = self
                    .desc
                    .args
                    .iter()
                    .map(|arg| arg_text(&arg.name))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{}({})", self.desc.name, joined)
            }
            Some(template) => {
                let named: Vec<(&str, &str)> = self
                    .desc
                    .args
                    .iter()
                    .map(|arg| (arg.name.as_str(), args.get(&arg.name).map_or("", String::as_str)))
                    .collect();
                substitute_args(template, &named)
            }
        }
    }
}

/// Validated functions keyed by machine name
#[derive(Debug, Clone, Default)]
pub struct FunctionCatalog {
    functions: IndexMap<String, LangFunction>,
}

impl FunctionCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and add every descriptor. Rejected ones are pushed onto `issues`.
    pub fn load<'d>(
        &mut self,
        descs: impl IntoIterator<Item = &'d LangFunctionDesc>,
        registry: &TypeRegistry,
        issues: &mut Vec<CatalogError>,
    ) {
        for desc in descs {
            match LangFunction::new(desc.clone(), registry) {
                Ok(function) => {
                    self.functions.insert(desc.mn.clone(), function);
                }
                Err(issue) => {
                    tracing::error!("[DFGC] {}", issue);
                    issues.push(issue);
                }
            }
        }
    }

    /// Look a function up by machine name
    pub fn get(&self, mn: &str) -> Option<&LangFunction> {
        self.functions.get(mn)
    }

    /// All functions in load order
    pub fn functions(&self) -> impl Iterator<Item = &LangFunction> {
        self.functions.values()
    }

    /// Number of functions
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Whether the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}
