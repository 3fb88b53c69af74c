//! # Graph Compiler
//!
//! Main entry points for compiling flow graphs to daScript source.

use crate::codegen::DasCodeGenerator;
use crate::config::CompilerConfig;
use crate::diagnostics::{Diagnostics, LineMap, NativeError};
use crate::error::Result;
use crate::graph::{Graph, ModuleLibrary, ModuleSource};
use crate::metadata::LanguageContext;

/// Result of one compile pass
#[derive(Debug)]
pub struct CompileOutput {
    /// Import lines followed by the generated body
    pub code: String,
    /// Node and file-level diagnostics
    pub diagnostics: Diagnostics,
    /// Name of the definition marked as main, if any
    pub main_function: Option<String>,
    /// Imported modules, in first-use order
    pub imports: Vec<String>,
    /// Which node produced each body line
    pub line_map: LineMap,
}

impl CompileOutput {
    /// Attach errors the backend toolchain reported against the generated file.
    ///
    /// Errors on lines owned by a node land on that node; the rest become
    /// file-level diagnostics. Only errors whose file name matches `file` count.
    pub fn remap_native_errors(&mut self, errors: &[NativeError], file: &str) {
        tracing::info!("[DFGC] Remapping {} toolchain error(s) for {}", errors.len(), file);
        self.line_map.remap(&mut self.diagnostics, errors, file);
    }

    /// Whether the pass produced any node diagnostics
    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }
}

/// Compile a flow graph to daScript source
///
/// This is the main entry point for the compiler. It walks every top-level
/// definition of the graph and generates the equivalent indented source text.
/// The graph must not call any modules; see [`compile_graph_with_modules`].
///
/// # Arguments
///
/// * `graph` - The graph to compile
/// * `lang` - The loaded target language
///
/// # Returns
///
/// The generated text with its diagnostics. A pass with diagnostics still
/// returns text, with a discard marker in place of every failed node.
///
/// # Examples
///
/// ```rust,no_run
/// use dfgc::{compile_graph, Graph, LanguageContext};
///
/// let core = std::fs::read_to_string("core.json")?;
/// let lang = std::fs::read_to_string("lang.json")?;
/// let lang = LanguageContext::from_json(&core, &lang, None)?;
///
/// let graph = Graph::new("main");
/// let output = compile_graph(&graph, &lang);
/// println!("Generated:\n{}", output.code);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn compile_graph(graph: &Graph, lang: &LanguageContext) -> CompileOutput {
    compile_graph_with_config(graph, lang, &ModuleLibrary::new(), &CompilerConfig::default())
}

/// Compile a flow graph that calls modules
///
/// Every module the graph calls, directly or through other modules, must already
/// be in `modules`. Use [`compile_graph_with_source`] to fetch them first.
///
/// # Arguments
///
/// * `graph` - The graph to compile
/// * `lang` - The loaded target language
/// * `modules` - Resolved module graphs, by name
pub fn compile_graph_with_modules(graph: &Graph, lang: &LanguageContext, modules: &ModuleLibrary) -> CompileOutput {
    compile_graph_with_config(graph, lang, modules, &CompilerConfig::default())
}

/// Fetch every module the graph calls, then compile it
///
/// # Arguments
///
/// * `graph` - The graph to compile
/// * `lang` - The loaded target language
/// * `source` - Storage the module graphs are fetched from
/// * `config` - Pass settings
///
/// # Returns
///
/// * `Ok(CompileOutput)` - The generated text with its diagnostics
/// * `Err(DfgcError)` - A module could not be fetched
pub fn compile_graph_with_source(
    graph: &Graph,
    lang: &LanguageContext,
    source: &dyn ModuleSource,
    config: &CompilerConfig,
) -> Result<CompileOutput> {
    tracing::info!("[DFGC] Phase 0: Resolving modules...");
    let mut modules = ModuleLibrary::new();
    modules.collect(graph, source)?;
    tracing::info!("[DFGC] Resolved {} module(s)", modules.len());

    Ok(compile_graph_with_config(graph, lang, &modules, config))
}

/// Compile a flow graph with explicit settings
///
/// # Arguments
///
/// * `graph` - The graph to compile
/// * `lang` - The loaded target language
/// * `modules` - Resolved module graphs, by name
/// * `config` - Pass settings (inlining, indentation, toolchain header height)
pub fn compile_graph_with_config(
    graph: &Graph,
    lang: &LanguageContext,
    modules: &ModuleLibrary,
    config: &CompilerConfig,
) -> CompileOutput {
    tracing::info!("[DFGC] Starting graph compilation");
    tracing::info!(
        "[DFGC] Graph: {} ({} nodes, {} connections, {} module(s) available)",
        graph.name,
        graph.node_count(),
        graph.connection_count(),
        modules.len()
    );

    // Phase 1: Generate code
    tracing::info!("[DFGC] Phase 1: Generating daScript code...");
    let generator = DasCodeGenerator::new(graph, lang, modules);
    let built = generator.generate_program(config);
    tracing::info!("[DFGC] Code generation complete ({} lines, {} bytes)", built.line_map.len(), built.code.len());

    // Phase 2: Report
    tracing::info!("[DFGC] Phase 2: Collecting diagnostics...");
    if built.diagnostics.is_empty() {
        tracing::info!("[DFGC] Compilation successful!");
    } else {
        built.diagnostics.log_errors(graph);
        tracing::info!("[DFGC] Compilation finished with diagnostics");
    }

    CompileOutput {
        code: built.code,
        diagnostics: built.diagnostics,
        main_function: built.main_function,
        imports: built.imports,
        line_map: built.line_map,
    }
}
