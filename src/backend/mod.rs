//! Backend abstractions over inkwell: module caching and the small
//! constant/verification helpers in [`llvm`].

pub mod llvm;

use std::collections::HashMap;

use crate::core::NodeType;

/// A compiled backend module, cached by owning-module full name in
/// `Context::compile_cache`. The LLVM context lifetime is erased the same
/// way `DataType` erases it — valid for as long as the owning `Context`'s
/// `inkwell::context::Context` is alive.
#[derive(Debug)]
pub struct CachedModule {
    module: inkwell::module::Module<'static>,
}

impl CachedModule {
    pub fn new<'ctx>(module: inkwell::module::Module<'ctx>) -> Self {
        let module: inkwell::module::Module<'static> = unsafe { std::mem::transmute(module) };
        CachedModule { module }
    }

    /// Recover the module at the caller's context lifetime. Callers must
    /// only call this while the owning `Context` is alive.
    pub fn get<'ctx>(&self) -> &inkwell::module::Module<'ctx> {
        unsafe { std::mem::transmute(&self.module) }
    }
}

/// Synthesized converter NodeTypes (`Context::create_converter_node_type`),
/// cached by `(from qualified name, to qualified name)` so repeated
/// requests for the same conversion return the same capability object
/// rather than re-synthesizing it on every data edge that needs it.
pub type ConverterCache = HashMap<(String, String), NodeType>;
