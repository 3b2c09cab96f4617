//! GraphModule: user-defined functions as graphs, plus structs; JSON
//! round-trip; exposes each graph function as a callable NodeType to other
//! modules.

pub mod graph_function;
pub mod json;
pub mod struct_type;

use std::collections::HashSet;

use serde_json::Value as Json;

use crate::core::{CodegenRequest, DataType, Module, NamedDataType, NodeType, NodeTypeCodegen};
use crate::error::{GraphyError, Result};

pub use graph_function::GraphFunction;
pub use struct_type::GraphStruct;

/// Holds an ordered list of GraphFunctions and GraphStructs plus the JSON
/// originals, mirroring `JsonModule` in the original implementation.
#[derive(Debug)]
pub struct GraphModule {
    llvm: &'static inkwell::context::Context,
    full_name: String,
    dependencies: HashSet<String>,
    pub functions: Vec<GraphFunction>,
    pub structs: Vec<GraphStruct>,
    /// Each function's declared signature, synthesized into a call-through
    /// NodeType the first time it's requested, grounded in
    /// `JsonModule.hpp`'s `JsonFuncCallNodeType`.
    json_originals: Json,
}

impl GraphModule {
    pub fn new<'ctx>(llvm: &'ctx inkwell::context::Context, full_name: impl Into<String>) -> Self {
        let llvm: &'static inkwell::context::Context = unsafe { std::mem::transmute(llvm) };
        GraphModule {
            llvm,
            full_name: full_name.into(),
            dependencies: HashSet::new(),
            functions: Vec::new(),
            structs: Vec::new(),
            json_originals: Json::Null,
        }
    }

    pub fn llvm(&self) -> &'static inkwell::context::Context {
        self.llvm
    }

    pub fn function_by_name(&self, name: &str) -> Option<&GraphFunction> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn function_by_name_mut(&mut self, name: &str) -> Option<&mut GraphFunction> {
        self.functions.iter_mut().find(|f| f.name == name)
    }

    pub fn struct_by_name(&self, name: &str) -> Option<&GraphStruct> {
        self.structs.iter().find(|s| s.name == name)
    }

    pub fn to_json(&self) -> Json {
        json::graph_module_to_json(self)
    }
}

impl Module for GraphModule {
    fn full_name(&self) -> &str {
        &self.full_name
    }

    fn node_type_from_name(&self, name: &str, json: &Json) -> Result<NodeType> {
        if let Some(struct_name) = name.strip_prefix("make-") {
            let gs = self
                .struct_by_name(struct_name)
                .ok_or_else(|| GraphyError::UnknownNodeType {
                    module: self.full_name.clone(),
                    name: name.to_string(),
                })?;
            return gs.make_node_type(self.llvm, &self.full_name);
        }
        if let Some(struct_name) = name.strip_prefix("break-") {
            let gs = self
                .struct_by_name(struct_name)
                .ok_or_else(|| GraphyError::UnknownNodeType {
                    module: self.full_name.clone(),
                    name: name.to_string(),
                })?;
            return gs.break_node_type(self.llvm, &self.full_name);
        }
        let _ = json;
        let func = self.function_by_name(name).ok_or_else(|| GraphyError::UnknownNodeType {
            module: self.full_name.clone(),
            name: name.to_string(),
        })?;
        call_node_type(self.full_name.clone(), func)
    }

    fn type_from_name(&self, name: &str) -> Option<DataType> {
        let gs = self.struct_by_name(name)?;
        Some(gs.data_type(self.llvm, &self.full_name))
    }

    fn node_type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.functions.iter().map(|f| f.name.clone()).collect();
        for s in &self.structs {
            names.push(format!("make-{}", s.name));
            names.push(format!("break-{}", s.name));
        }
        names
    }

    fn type_names(&self) -> Vec<String> {
        self.structs.iter().map(|s| s.name.clone()).collect()
    }

    fn generate_module<'ctx>(
        &self,
        llvm: &'ctx inkwell::context::Context,
        backend_module: &inkwell::module::Module<'ctx>,
    ) -> Result<()> {
        for func in &self.functions {
            crate::compiler::FunctionCompiler::new(llvm, backend_module, &self.full_name, func).compile()?;
        }
        Ok(())
    }

    fn dependencies(&self) -> &HashSet<String> {
        &self.dependencies
    }

    fn add_dependency(&mut self, name: String) {
        self.dependencies.insert(name);
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Synthesizes the NodeType a GraphFunction is re-exported as: calling its
/// codegen emits a direct backend call to the compiled IR function, passing
/// (entry-exec-id, input-data-values) and reading back the return integer
/// and the output-data slots the callee filled in.
fn call_node_type(owning_module: String, func: &GraphFunction) -> Result<NodeType> {
    NodeType::new(
        owning_module.clone(),
        func.name.clone(),
        func.description.clone(),
        func.data_inputs.clone(),
        func.data_outputs.clone(),
        func.exec_inputs.clone(),
        func.exec_outputs.clone(),
        func.exec_inputs.is_empty() && func.exec_outputs.is_empty(),
        Box::new(CallCodegen {
            owning_module,
            function_name: func.name.clone(),
            data_input_types: func.data_inputs.iter().map(|n| n.ty.clone()).collect(),
            data_output_types: func.data_outputs.iter().map(|n| n.ty.clone()).collect(),
        }),
    )
}

#[derive(Debug, Clone)]
struct CallCodegen {
    owning_module: String,
    function_name: String,
    data_input_types: Vec<DataType>,
    data_output_types: Vec<DataType>,
}

impl CallCodegen {
    /// Declares the callee as an external function in `module` when it
    /// isn't already present. With `CompileOptions::link_dependencies` (the
    /// default), `Context::compile_module` later merges the callee's own
    /// module in via `Module::link_in_module`, which resolves this
    /// declaration against the real definition. Without it, the
    /// declaration stays extern, and resolving the call at runtime is left
    /// to whatever adds both compiled modules to one `ExecutionEngine`, the
    /// way a JIT resolves symbols across separately-added modules.
    fn declare<'ctx>(
        &self,
        module: &inkwell::module::Module<'ctx>,
        llvm: inkwell::context::ContextRef<'ctx>,
    ) -> inkwell::values::FunctionValue<'ctx> {
        use inkwell::types::BasicType;
        let i32_ty = llvm.i32_type();
        let mut params: Vec<inkwell::types::BasicMetadataTypeEnum> = vec![i32_ty.into()];
        params.extend(self.data_input_types.iter().map(|t| t.backend::<'ctx>().into()));
        params.extend(
            self.data_output_types
                .iter()
                .map(|t| t.backend::<'ctx>().ptr_type(inkwell::AddressSpace::default()).into()),
        );
        let fn_type = i32_ty.fn_type(&params, false);
        let callee_name = mangled_function_name(&self.owning_module, &self.function_name);
        module.add_function(&callee_name, fn_type, Some(inkwell::module::Linkage::External))
    }
}

impl NodeTypeCodegen for CallCodegen {
    fn codegen(&self, request: CodegenRequest<'_, '_>) -> Result<()> {
        let callee_name = mangled_function_name(&self.owning_module, &self.function_name);
        let llvm = request.builder.get_insert_block().unwrap().get_context();
        let callee = match request.module.get_function(&callee_name) {
            Some(f) => f,
            None => self.declare(request.module, llvm),
        };

        let exec_id = llvm.i32_type().const_int(request.exec_input as u64, false);

        let mut args: Vec<inkwell::values::BasicMetadataValueEnum> = vec![exec_id.into()];
        args.extend(request.inputs.iter().map(|v| (*v).into()));
        args.extend(request.output_slots.iter().map(|p| (*p).into()));

        let call = request
            .builder
            .build_call(callee, &args, "call")
            .map_err(|e| GraphyError::BackendError(e.to_string()))?;
        let exit_index = call
            .try_as_basic_value()
            .left()
            .ok_or_else(|| GraphyError::BackendError("callee did not return a value".into()))?
            .into_int_value();

        // Data outputs were already written through the passed pointer
        // arguments by the callee; nothing further to store here.
        if request.output_blocks.len() == 1 {
            request
                .builder
                .build_unconditional_branch(request.output_blocks[0])
                .map_err(|e| GraphyError::BackendError(e.to_string()))?;
        } else if !request.output_blocks.is_empty() {
            let switch_cases: Vec<_> = request
                .output_blocks
                .iter()
                .enumerate()
                .skip(1)
                .map(|(i, block)| (llvm.i32_type().const_int(i as u64, false), *block))
                .collect();
            request
                .builder
                .build_switch(exit_index, request.output_blocks[0], &switch_cases)
                .map_err(|e| GraphyError::BackendError(e.to_string()))?;
        }
        Ok(())
    }

    fn clone_capability(&self) -> Box<dyn NodeTypeCodegen> {
        Box::new(self.clone())
    }

    fn serialize_capability(&self) -> Json {
        Json::Null
    }
}

/// The symbol name a GraphFunction is compiled under: module full-name and
/// function name joined by `::`, disambiguating same-named functions across
/// modules when dependencies are linked into one backend module.
pub fn mangled_function_name(module_full_name: &str, function_name: &str) -> String {
    format!("{}::{}", module_full_name.replace('/', "."), function_name)
}
