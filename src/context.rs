//! Context: the module registry and compile orchestrator. Owns the one LLVM
//! context every loaded module's types and every compiled function's IR is
//! built against, grounded in `original_source/libchigraph/include/chi/Context.hpp`.

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use serde_json::Value as Json;

use crate::backend::{llvm as backend_llvm, CachedModule, ConverterCache};
use crate::core::{DataType, Module, NamedDataType, NodeType, parse_qualified_name};
use crate::error::{GraphyError, LoadResult, Result};
use crate::graph_module::json::{self, NodeTypeResolver, TypeResolver};
use crate::graph_module::GraphModule;
use crate::lang::primitives::{ConversionCodegen, ConversionKind};
use crate::lang::{LangModule, LANG_MODULE_NAME};

/// Which of the two kinds of artifact-reuse to apply when compiling a
/// module: return an already-compiled backend module if one is cached, and
/// whether to link in the (also compiled) modules it depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    pub use_cache: bool,
    pub link_dependencies: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            use_cache: true,
            link_dependencies: true,
        }
    }
}

/// The module registry, type/node-type resolver, and compile cache. One
/// `Context` owns exactly one `inkwell::context::Context`; every `DataType`
/// handed out by any loaded module is backed by a type from that context.
pub struct Context {
    workspace_path: PathBuf,
    llvm: inkwell::context::Context,
    modules: Vec<Box<dyn Module>>,
    module_index: FxHashMap<String, usize>,
    lang_module_index: usize,
    compile_cache: FxHashMap<String, CachedModule>,
    converter_cache: ConverterCache,
    /// Memoized `const i32` values keyed by literal — LLVM constants are
    /// cheap to rebuild, but `const-int` nodes tend to repeat the same few
    /// literals (0, 1) across a large graph, so reusing the `IntValue`
    /// avoids re-querying LLVM's own constant uniquing table on every hit.
    const_i32_cache: RefCell<FxHashMap<i64, inkwell::values::IntValue<'static>>>,
    loading: Vec<String>,
}

impl Context {
    pub fn new(workspace_path: impl Into<PathBuf>) -> Self {
        let llvm = inkwell::context::Context::create();
        let mut ctx = Context {
            workspace_path: workspace_path.into(),
            llvm,
            modules: Vec::new(),
            module_index: FxHashMap::default(),
            lang_module_index: 0,
            compile_cache: FxHashMap::default(),
            converter_cache: ConverterCache::new(),
            const_i32_cache: RefCell::new(FxHashMap::default()),
            loading: Vec::new(),
        };
        let lang = LangModule::new(&ctx.llvm);
        ctx.add_module(Box::new(lang));
        ctx.lang_module_index = ctx.module_index[LANG_MODULE_NAME];
        ctx
    }

    pub fn llvm(&self) -> &inkwell::context::Context {
        &self.llvm
    }

    pub fn workspace_path(&self) -> &Path {
        &self.workspace_path
    }

    /// The always-present builtin module, kept at a stable index so this
    /// doesn't pay a hash lookup on the hot path of resolving `lang:*`
    /// names.
    pub fn lang_module(&self) -> &dyn Module {
        self.modules[self.lang_module_index].as_ref()
    }

    /// Register an already-constructed module (used for `LangModule` at
    /// startup, and by tests that build a `GraphModule` in memory without a
    /// backing JSON file).
    pub fn add_module(&mut self, module: Box<dyn Module>) {
        let name = module.full_name().to_string();
        let index = self.modules.len();
        self.modules.push(module);
        self.module_index.insert(name, index);
    }

    pub fn unload_module(&mut self, full_name: &str) -> Result<()> {
        let index = self
            .module_index
            .remove(full_name)
            .ok_or_else(|| GraphyError::UnknownModule(full_name.to_string()))?;
        self.modules.remove(index);
        // Shift every index after the removed one down by one.
        for idx in self.module_index.values_mut() {
            if *idx > index {
                *idx -= 1;
            }
        }
        self.compile_cache.remove(full_name);
        if self.lang_module_index > index {
            self.lang_module_index -= 1;
        }
        Ok(())
    }

    pub fn is_loaded(&self, full_name: &str) -> bool {
        self.module_index.contains_key(full_name)
    }

    fn module_by_name(&self, full_name: &str) -> Result<&dyn Module> {
        let index = self
            .module_index
            .get(full_name)
            .ok_or_else(|| GraphyError::UnknownModule(full_name.to_string()))?;
        Ok(self.modules[*index].as_ref())
    }

    /// Loads `full_name` and every dependency it transitively declares, from
    /// `<workspace_path>/<full_name>.json`. Returns an accumulating
    /// `LoadResult`: a malformed node in one function doesn't prevent the
    /// rest of the module (or its dependents) from loading.
    pub fn load_module(&mut self, full_name: &str) -> Result<LoadResult> {
        let mut result = LoadResult::new();
        self.load_module_inner(full_name, &mut result)?;
        Ok(result)
    }

    fn load_module_inner(&mut self, full_name: &str, result: &mut LoadResult) -> Result<()> {
        if self.is_loaded(full_name) {
            return Ok(());
        }
        if self.loading.iter().any(|m| m == full_name) {
            return Err(GraphyError::DependencyCycle(full_name.to_string()));
        }

        let path = self.workspace_path.join(format!("{full_name}.json"));
        let text = std::fs::read_to_string(&path).map_err(|e| GraphyError::Io(format!("{}: {e}", path.display())))?;
        let json: Json = serde_json::from_str(&text).map_err(|e| GraphyError::Parse(e.to_string()))?;

        let dependencies = json::read_dependencies(&json)?;
        self.loading.push(full_name.to_string());
        for dep in &dependencies {
            self.load_module_inner(dep, result)?;
        }
        self.loading.pop();

        let types = ContextTypeResolver { ctx: &*self };
        let (_, mut module) = json::parse_module_shell(&self.llvm, full_name, &json, &types)?;

        // NodeTypes local to this module (struct make/break, sibling
        // function re-export) can be built from the shell alone, before
        // bodies exist — each ignores its JSON data payload.
        let mut local: FxHashMap<String, NodeType> = FxHashMap::default();
        for name in module.node_type_names() {
            let nt = module.node_type_from_name(&name, &Json::Null)?;
            local.insert(name, nt);
        }

        let resolver = ContextNodeTypeResolver { ctx: &*self, local_module: full_name, local: &local };
        let body_result = json::parse_module_bodies(&mut module, &json, &resolver);
        *result += body_result;

        self.add_module(Box::new(module));
        Ok(())
    }

    /// Resolves a qualified `module:name` type, for use by callers building
    /// signatures or struct fields outside the JSON loader (e.g. tests).
    pub fn type_from_module(&self, module: &str, name: &str) -> Result<DataType> {
        self.module_by_name(module)?.type_from_name(name).ok_or_else(|| GraphyError::UnknownType {
            module: module.to_string(),
            name: name.to_string(),
        })
    }

    pub fn node_type_from_module(&self, module: &str, name: &str, json: &Json) -> Result<NodeType> {
        self.module_by_name(module)?.node_type_from_name(name, json)
    }

    /// Synthesizes (and caches) a converter NodeType for one of the six
    /// fixed primitive conversions the backend can always perform without a
    /// user-declared node, per `lang::primitives::conversion_kind_for`.
    /// Anything else is a `TypeMismatch` — chigraph does not auto-convert
    /// between unrelated or user-defined types.
    pub fn create_converter_node_type(&mut self, from: &str, to: &str) -> Result<NodeType> {
        if let Some(existing) = self.converter_cache.get(&(from.to_string(), to.to_string())) {
            return Ok(existing.clone_type());
        }

        let (from_module, from_name) = parse_qualified_name(from)?;
        let (to_module, to_name) = parse_qualified_name(to)?;
        if from_module != LANG_MODULE_NAME || to_module != LANG_MODULE_NAME {
            return Err(GraphyError::TypeMismatch {
                expected: to.to_string(),
                actual: from.to_string(),
            });
        }

        let kind = crate::lang::primitives::conversion_kind_for(from_name, to_name).ok_or_else(|| GraphyError::TypeMismatch {
            expected: to.to_string(),
            actual: from.to_string(),
        })?;

        let from_ty = self.type_from_module(from_module, from_name)?;
        let to_ty = self.type_from_module(to_module, to_name)?;
        let node_type = NodeType::new(
            LANG_MODULE_NAME,
            format!("convert-{from_name}-{to_name}"),
            format!("implicit conversion {from_name} -> {to_name}"),
            vec![NamedDataType::new("in", from_ty)],
            vec![NamedDataType::new("out", to_ty)],
            vec![],
            vec![],
            true,
            Box::new(ConversionCodegen { kind }),
        )?;
        self.converter_cache.insert((from.to_string(), to.to_string()), node_type.clone_type());
        Ok(node_type)
    }

    pub fn const_i32(&self, value: i64) -> inkwell::values::IntValue<'_> {
        if let Some(cached) = self.const_i32_cache.borrow().get(&value) {
            return unsafe { std::mem::transmute::<inkwell::values::IntValue<'static>, inkwell::values::IntValue<'_>>(*cached) };
        }
        let v = backend_llvm::const_i32(&self.llvm, value);
        let erased: inkwell::values::IntValue<'static> = unsafe { std::mem::transmute(v) };
        self.const_i32_cache.borrow_mut().insert(value, erased);
        v
    }

    pub fn const_f64(&self, value: f64) -> inkwell::values::FloatValue<'_> {
        backend_llvm::const_f64(&self.llvm, value)
    }

    pub fn const_bool(&self, value: bool) -> inkwell::values::IntValue<'_> {
        backend_llvm::const_bool(&self.llvm, value)
    }

    /// Every `NodeInstance` across every loaded `GraphModule` whose
    /// `node_type` is `qualified_name`, used by editor-facing tooling to
    /// find usages before a NodeType is edited or removed.
    pub fn find_instances_of_type(&self, qualified_name: &str) -> Vec<(String, String, String)> {
        let mut out = Vec::new();
        for module in &self.modules {
            if let Some(gm) = module.as_any().downcast_ref::<GraphModule>() {
                for func in &gm.functions {
                    for (node_id, node) in &func.graph.nodes {
                        if node.node_type == qualified_name {
                            out.push((module.full_name().to_string(), func.name.clone(), node_id.clone()));
                        }
                    }
                }
            }
        }
        out
    }

    /// Compiles `full_name` into its own backend `inkwell::module::Module`,
    /// reusing the cache when `options.use_cache`. Every dependency is
    /// compiled first, unconditionally, so its cached artifact exists
    /// before `full_name`'s own `generate_module` runs and may emit a call
    /// into it (a call site that finds no definition for the callee in its
    /// own module declares it extern — `CallCodegen::declare`).
    ///
    /// When `options.link_dependencies`, each dependency is additionally
    /// regenerated into a disposable backend module and merged into
    /// `full_name`'s own via `Module::link_in_module`, which resolves those
    /// extern declarations against the dependency's real definitions —
    /// LLVM's linker, not a hand-rolled symbol table. The disposable copy
    /// (not the cached one from the unconditional compile above) is what
    /// gets consumed, since `link_in_module` takes its argument by value;
    /// the dependency's own cached, independently-compiled module is left
    /// untouched for anyone who later compiles it (or one of its other
    /// dependents) directly. With `link_dependencies` false, dependency
    /// functions are left as bare declarations, resolved only by whatever
    /// later adds both compiled modules to one `ExecutionEngine`. Rayon is
    /// deliberately not used here (`IRBuilder`/`Module` aren't `Send`); the
    /// only parallel pass in this crate is the pure-dependency sort inside
    /// `FunctionCompiler`.
    pub fn compile_module(&mut self, full_name: &str, options: CompileOptions) -> Result<()> {
        if options.use_cache && self.compile_cache.contains_key(full_name) {
            return Ok(());
        }

        let deps: Vec<String> = self.module_by_name(full_name)?.dependencies().iter().cloned().collect();
        for dep in &deps {
            self.compile_module(dep, options)?;
        }

        let backend_module = self.llvm.create_module(&full_name.replace('/', "."));
        {
            let module = self.module_by_name(full_name)?;
            module.generate_module(&self.llvm, &backend_module)?;
        }

        if options.link_dependencies {
            for dep in &deps {
                let link_module = self.llvm.create_module(&format!("{}.link", dep.replace('/', ".")));
                self.module_by_name(dep)?.generate_module(&self.llvm, &link_module)?;
                backend_module
                    .link_in_module(link_module)
                    .map_err(|e| GraphyError::BackendError(e.to_string()))?;
            }
        }

        backend_llvm::verify_module(&backend_module)?;
        self.compile_cache.insert(full_name.to_string(), CachedModule::new(backend_module));
        Ok(())
    }

    pub fn compiled_module(&self, full_name: &str) -> Option<&inkwell::module::Module<'_>> {
        self.compile_cache.get(full_name).map(|c| c.get())
    }
}

struct ContextTypeResolver<'a> {
    ctx: &'a Context,
}

impl<'a> TypeResolver for ContextTypeResolver<'a> {
    fn resolve(&self, qualified_name: &str) -> Result<DataType> {
        let (module, name) = parse_qualified_name(qualified_name)?;
        self.ctx.type_from_module(module, name)
    }
}

struct ContextNodeTypeResolver<'a> {
    ctx: &'a Context,
    local_module: &'a str,
    local: &'a FxHashMap<String, NodeType>,
}

impl<'a> NodeTypeResolver for ContextNodeTypeResolver<'a> {
    fn resolve(&self, qualified_name: &str, data: &Json) -> Result<NodeType> {
        let (module, name) = parse_qualified_name(qualified_name)?;
        if module == self.local_module {
            if let Some(nt) = self.local.get(name) {
                return Ok(nt.clone_type());
            }
            return Err(GraphyError::UnknownNodeType {
                module: module.to_string(),
                name: name.to_string(),
            });
        }
        self.ctx.node_type_from_module(module, name, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_context_has_only_lang_module() {
        let ctx = Context::new(".");
        assert!(ctx.is_loaded("lang"));
        assert_eq!(ctx.modules.len(), 1);
    }

    #[test]
    fn converter_i32_to_float_is_pure_and_cached() {
        let mut ctx = Context::new(".");
        let nt = ctx.create_converter_node_type("lang:i32", "lang:float").unwrap();
        assert!(nt.pure);
        assert_eq!(nt.data_inputs.len(), 1);
        assert_eq!(nt.data_outputs.len(), 1);
        assert!(ctx.converter_cache.contains_key(&("lang:i32".to_string(), "lang:float".to_string())));
    }

    #[test]
    fn converter_between_unrelated_types_is_rejected() {
        let mut ctx = Context::new(".");
        let err = ctx.create_converter_node_type("lang:i8*", "lang:float").unwrap_err();
        assert!(matches!(err, GraphyError::TypeMismatch { .. }));
    }

    #[test]
    fn load_module_reports_missing_file_as_io_error() {
        let mut ctx = Context::new("/nonexistent/workspace");
        let err = ctx.load_module("examples/missing").unwrap_err();
        assert!(matches!(err, GraphyError::Io(_)));
    }
}
