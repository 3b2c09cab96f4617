//! `FunctionCompiler`: one `GraphFunction` to one LLVM IR function, under the
//! fixed calling convention `i32 f(i32 execIn, data-inputs..., data-output
//! pointers...)` — the return value selects which exec-output fired.
//!
//! Stages, per the compiled function:
//! - A: validate `entry`/`exit` node signatures against the declared
//!   function signature.
//! - B: block layout (`block_layout::layout_blocks`) — one block per
//!   exec-input of every impure node.
//! - C: data storage — a stack slot per impure node's data output; `entry`'s
//!   outputs are the function's own parameters, needing no slot.
//! - D: pure-node inlining (`pure_inline::Materializer`).
//! - E: exec-driven codegen — fill every block via `NodeType::codegen`.
//! - F: `entry`/`exit` are special-cased, bypassing generic dispatch: only
//!   `FunctionCompiler` has the function's own parameter/return-pointer
//!   values `EntryCodegen`/`ExitCodegen` would otherwise need handed to them.
//! - G: debug info (`debug_info::attach_subprogram`).

use std::collections::{HashMap, HashSet};

use inkwell::basic_block::BasicBlock;
use inkwell::context::Context as LlvmContext;
use inkwell::module::Module as LlvmModule;
use inkwell::types::BasicType;
use inkwell::values::{BasicValueEnum, FunctionValue, PointerValue};
use inkwell::AddressSpace;

use crate::core::{NamedDataType, NodeId, NodeInstance, NodeType};
use crate::error::{GraphyError, Result};
use crate::graph_module::{mangled_function_name, GraphFunction};

use super::block_layout::{layout_blocks, BlockKey};
use super::debug_info;
use super::pure_inline::Materializer;

pub struct FunctionCompiler<'ctx, 'a> {
    llvm: &'ctx LlvmContext,
    module: &'a LlvmModule<'ctx>,
    owning_module: &'a str,
    func: &'a GraphFunction,
}

impl<'ctx, 'a> FunctionCompiler<'ctx, 'a> {
    pub fn new(llvm: &'ctx LlvmContext, module: &'a LlvmModule<'ctx>, owning_module: &'a str, func: &'a GraphFunction) -> Self {
        FunctionCompiler {
            llvm,
            module,
            owning_module,
            func,
        }
    }

    pub fn compile(&self) -> Result<()> {
        let (entry_id, entry_type) = self.find_entry()?;
        let exit_ids = self.find_exits()?;
        self.validate(entry_type, &exit_ids)?;

        let function = self.declare_function();
        let builder = self.llvm.create_builder();

        let alloca_block = self.llvm.append_basic_block(function, "entry");
        builder.position_at_end(alloca_block);
        let entry_values = self.entry_param_values(function);
        let impure_slots = self.allocate_output_slots(&builder)?;

        let blocks = layout_blocks(self.llvm, function, self.func);

        let default_exit = self.llvm.append_basic_block(function, "default_exit");
        builder.position_at_end(default_exit);
        let trap_value = self.llvm.i32_type().const_int(u64::MAX, true);
        builder
            .build_return(Some(&trap_value))
            .map_err(|e| GraphyError::BackendError(e.to_string()))?;

        let materializer = Materializer::new(self.module, &builder, self.func, &entry_id, &entry_values, &impure_slots);

        for (node_id, node_type) in &self.func.node_types {
            if node_type.pure || *node_id == entry_id {
                continue;
            }
            let node = &self.func.graph.nodes[node_id];
            for i in 0..node_type.exec_inputs.len() {
                let block = blocks[&(node_id.clone(), i)];
                builder.position_at_end(block);

                let inputs = self.gather_inputs(node_id, node, node_type, &materializer, block)?;

                if exit_ids.contains(node_id) {
                    self.emit_exit(&builder, function, &inputs, i)?;
                    continue;
                }

                let output_slots: Vec<PointerValue<'ctx>> = (0..node_type.data_outputs.len())
                    .map(|p| impure_slots[&(node_id.clone(), p)])
                    .collect();
                let output_blocks = self.resolve_output_blocks(node, node_type, &blocks, default_exit);

                node_type.codegen(crate::core::CodegenRequest {
                    exec_input: i,
                    inputs,
                    output_slots,
                    block,
                    output_blocks,
                    builder: &builder,
                    module: self.module,
                })?;
            }
        }

        self.emit_entry_dispatch(&builder, function, alloca_block, &entry_id, &blocks, default_exit)?;

        debug_info::attach_subprogram(self.module, function, self.owning_module, &self.func.name);

        Ok(())
    }

    fn find_entry(&self) -> Result<(NodeId, &'a NodeType)> {
        let mut found: Option<NodeId> = None;
        for (id, node) in &self.func.graph.nodes {
            if node.node_type == "lang:entry" {
                if found.is_some() {
                    return Err(GraphyError::InvalidSignature(format!(
                        "function {} has more than one entry node",
                        self.func.name
                    )));
                }
                found = Some(id.clone());
            }
        }
        let id = found.ok_or_else(|| {
            GraphyError::InvalidSignature(format!("function {} has no entry node", self.func.name))
        })?;
        let node_type = self.func.node_types.get(&id).ok_or_else(|| GraphyError::UnknownNodeType {
            module: self.owning_module.to_string(),
            name: id.clone(),
        })?;
        Ok((id, node_type))
    }

    fn find_exits(&self) -> Result<HashSet<NodeId>> {
        let ids: HashSet<NodeId> = self.func.exit_node_ids().map(str::to_string).collect();
        if ids.is_empty() {
            return Err(GraphyError::InvalidSignature(format!(
                "function {} has no exit node",
                self.func.name
            )));
        }
        Ok(ids)
    }

    fn validate(&self, entry_type: &NodeType, exit_ids: &HashSet<NodeId>) -> Result<()> {
        if !signatures_match(&entry_type.data_outputs, &self.func.data_inputs) {
            return Err(GraphyError::InvalidSignature(format!(
                "entry data outputs don't match function {}'s data inputs",
                self.func.name
            )));
        }
        if entry_type.exec_outputs.len() != self.func.exec_inputs.len() {
            return Err(GraphyError::InvalidSignature(format!(
                "entry exec outputs don't match function {}'s exec inputs",
                self.func.name
            )));
        }
        for exit_id in exit_ids {
            let exit_type = self.func.node_types.get(exit_id).ok_or_else(|| GraphyError::UnknownNodeType {
                module: self.owning_module.to_string(),
                name: exit_id.clone(),
            })?;
            if !signatures_match(&exit_type.data_inputs, &self.func.data_outputs) {
                return Err(GraphyError::InvalidSignature(format!(
                    "exit data inputs don't match function {}'s data outputs",
                    self.func.name
                )));
            }
            if exit_type.exec_inputs.len() != self.func.exec_outputs.len() {
                return Err(GraphyError::InvalidSignature(format!(
                    "exit exec inputs don't match function {}'s exec outputs",
                    self.func.name
                )));
            }
        }
        Ok(())
    }

    fn declare_function(&self) -> FunctionValue<'ctx> {
        let i32_ty = self.llvm.i32_type();
        let mut params: Vec<inkwell::types::BasicMetadataTypeEnum> = vec![i32_ty.into()];
        params.extend(self.func.data_inputs.iter().map(|n| n.ty.backend::<'ctx>().into()));
        params.extend(
            self.func
                .data_outputs
                .iter()
                .map(|n| n.ty.backend::<'ctx>().ptr_type(AddressSpace::default()).into()),
        );
        let fn_type = i32_ty.fn_type(&params, false);
        let name = mangled_function_name(self.owning_module, &self.func.name);
        self.module.add_function(&name, fn_type, None)
    }

    fn entry_param_values(&self, function: FunctionValue<'ctx>) -> Vec<BasicValueEnum<'ctx>> {
        (0..self.func.data_inputs.len())
            .map(|i| function.get_nth_param(1 + i as u32).expect("declared data-input param"))
            .collect()
    }

    fn allocate_output_slots(
        &self,
        builder: &inkwell::builder::Builder<'ctx>,
    ) -> Result<HashMap<(NodeId, usize), PointerValue<'ctx>>> {
        let mut slots = HashMap::new();
        for (node_id, node_type) in &self.func.node_types {
            if node_type.pure || node_type.qualified_name() == "lang:entry" {
                continue;
            }
            for (i, out) in node_type.data_outputs.iter().enumerate() {
                let alloca = builder
                    .build_alloca(out.ty.backend(), &format!("{node_id}.{i}"))
                    .map_err(|e| GraphyError::BackendError(e.to_string()))?;
                slots.insert((node_id.clone(), i), alloca);
            }
        }
        Ok(slots)
    }

    fn gather_inputs(
        &self,
        node_id: &str,
        node: &NodeInstance,
        node_type: &NodeType,
        materializer: &Materializer<'ctx, '_>,
        block: BasicBlock<'ctx>,
    ) -> Result<Vec<BasicValueEnum<'ctx>>> {
        let mut inputs = Vec::with_capacity(node_type.data_inputs.len());
        for (i, slot) in node.input_data_connections.iter().enumerate() {
            let (src, src_port) = slot.clone().ok_or_else(|| GraphyError::UnconnectedInput {
                node: node_id.to_string(),
                input: node_type.data_inputs.get(i).map(|n| n.label.clone()).unwrap_or_default(),
            })?;
            let expected = &node_type.data_inputs[i].ty;
            inputs.push(materializer.resolve_input(&src, src_port, expected, block)?);
        }
        Ok(inputs)
    }

    fn resolve_output_blocks(
        &self,
        node: &NodeInstance,
        node_type: &NodeType,
        blocks: &HashMap<BlockKey, BasicBlock<'ctx>>,
        default_exit: BasicBlock<'ctx>,
    ) -> Vec<BasicBlock<'ctx>> {
        (0..node_type.exec_outputs.len())
            .map(|k| {
                node.output_exec_connections
                    .get(k)
                    .cloned()
                    .flatten()
                    .and_then(|(dst, dst_port)| blocks.get(&(dst, dst_port)).copied())
                    .unwrap_or(default_exit)
            })
            .collect()
    }

    fn emit_exit(
        &self,
        builder: &inkwell::builder::Builder<'ctx>,
        function: FunctionValue<'ctx>,
        inputs: &[BasicValueEnum<'ctx>],
        exec_input_index: usize,
    ) -> Result<()> {
        let base = 1 + self.func.data_inputs.len() as u32;
        for (i, value) in inputs.iter().enumerate() {
            let ptr = function
                .get_nth_param(base + i as u32)
                .expect("declared data-output param")
                .into_pointer_value();
            builder.build_store(ptr, *value).map_err(|e| GraphyError::BackendError(e.to_string()))?;
        }
        let idx = self.llvm.i32_type().const_int(exec_input_index as u64, false);
        builder.build_return(Some(&idx)).map_err(|e| GraphyError::BackendError(e.to_string()))?;
        Ok(())
    }

    fn emit_entry_dispatch(
        &self,
        builder: &inkwell::builder::Builder<'ctx>,
        function: FunctionValue<'ctx>,
        alloca_block: BasicBlock<'ctx>,
        entry_id: &str,
        blocks: &HashMap<BlockKey, BasicBlock<'ctx>>,
        default_exit: BasicBlock<'ctx>,
    ) -> Result<()> {
        builder.position_at_end(alloca_block);
        let entry_node = &self.func.graph.nodes[entry_id];
        let targets: Vec<BasicBlock<'ctx>> = (0..self.func.exec_inputs.len())
            .map(|i| {
                entry_node
                    .output_exec_connections
                    .get(i)
                    .cloned()
                    .flatten()
                    .and_then(|(dst, dst_port)| blocks.get(&(dst, dst_port)).copied())
                    .unwrap_or(default_exit)
            })
            .collect();

        if targets.is_empty() {
            builder
                .build_unconditional_branch(default_exit)
                .map_err(|e| GraphyError::BackendError(e.to_string()))?;
        } else if targets.len() == 1 {
            builder
                .build_unconditional_branch(targets[0])
                .map_err(|e| GraphyError::BackendError(e.to_string()))?;
        } else {
            let exec_id = function.get_nth_param(0).expect("exec-id param").into_int_value();
            let cases: Vec<_> = targets
                .iter()
                .enumerate()
                .skip(1)
                .map(|(i, block)| (self.llvm.i32_type().const_int(i as u64, false), *block))
                .collect();
            builder
                .build_switch(exec_id, targets[0], &cases)
                .map_err(|e| GraphyError::BackendError(e.to_string()))?;
        }
        Ok(())
    }
}

/// Compares two NamedDataType lists by type only — labels are display-only
/// and may legitimately differ between e.g. `entry`'s declared data outputs
/// and the function's own `dataInputs` list.
fn signatures_match(a: &[NamedDataType], b: &[NamedDataType]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.ty == y.ty)
}
