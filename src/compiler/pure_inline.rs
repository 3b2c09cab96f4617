//! Stage D: pure-node inlining. A pure node has no exec ports — it's
//! evaluated on demand, once per `(node, block)` pair it's needed in, via
//! [`Materializer::value_of`], memoized so a value fanned out to several
//! consumers in the same block is computed once rather than re-emitted at
//! each use.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use inkwell::basic_block::BasicBlock;
use inkwell::values::{BasicValueEnum, PointerValue};

use crate::core::{CodegenRequest, DataType, NodeId};
use crate::error::{GraphyError, Result};
use crate::graph_module::GraphFunction;
use crate::lang::primitives::{conversion_kind_for, convert_value};

/// Resolves the value on any node's data output, recursing through pure
/// dependencies and reading stack slots for impure ones.
pub struct Materializer<'ctx, 'a> {
    module: &'a inkwell::module::Module<'ctx>,
    builder: &'a inkwell::builder::Builder<'ctx>,
    func: &'a GraphFunction,
    entry_id: &'a str,
    entry_values: &'a [BasicValueEnum<'ctx>],
    impure_slots: &'a HashMap<(NodeId, usize), PointerValue<'ctx>>,
    cache: RefCell<HashMap<(NodeId, String), Vec<BasicValueEnum<'ctx>>>>,
    visiting: RefCell<HashSet<(NodeId, String)>>,
}

impl<'ctx, 'a> Materializer<'ctx, 'a> {
    pub fn new(
        module: &'a inkwell::module::Module<'ctx>,
        builder: &'a inkwell::builder::Builder<'ctx>,
        func: &'a GraphFunction,
        entry_id: &'a str,
        entry_values: &'a [BasicValueEnum<'ctx>],
        impure_slots: &'a HashMap<(NodeId, usize), PointerValue<'ctx>>,
    ) -> Self {
        Materializer {
            module,
            builder,
            func,
            entry_id,
            entry_values,
            impure_slots,
            cache: RefCell::new(HashMap::new()),
            visiting: RefCell::new(HashSet::new()),
        }
    }

    /// Resolves `node_id`'s output `port`, evaluating a pure node's codegen
    /// into `block` the first time it's asked for there.
    pub fn value_of(&self, node_id: &str, port: usize, block: BasicBlock<'ctx>) -> Result<BasicValueEnum<'ctx>> {
        if node_id == self.entry_id {
            return self
                .entry_values
                .get(port)
                .copied()
                .ok_or_else(|| GraphyError::Parse(format!("entry output {port} out of range")));
        }

        let node_type = self.func.node_types.get(node_id).ok_or_else(|| GraphyError::UnknownNodeType {
            module: String::new(),
            name: node_id.to_string(),
        })?;

        if !node_type.pure {
            let slot = self
                .impure_slots
                .get(&(node_id.to_string(), port))
                .ok_or_else(|| GraphyError::Parse(format!("no stack slot for {node_id}.{port}")))?;
            let out_ty = node_type
                .data_outputs
                .get(port)
                .ok_or_else(|| GraphyError::Parse(format!("{node_id} has no output {port}")))?;
            return self
                .builder
                .build_load(out_ty.ty.backend(), *slot, "load")
                .map_err(|e| GraphyError::BackendError(e.to_string()));
        }

        let values = self.materialize(node_id, block)?;
        values
            .get(port)
            .copied()
            .ok_or_else(|| GraphyError::Parse(format!("pure node {node_id} has no output {port}")))
    }

    /// The DataType actually produced at `node_id`'s output `port` — the
    /// `entry` node's outputs are the function's own declared data inputs.
    fn source_type(&self, node_id: &str, port: usize) -> Result<&DataType> {
        if node_id == self.entry_id {
            return self
                .func
                .data_inputs
                .get(port)
                .map(|n| &n.ty)
                .ok_or_else(|| GraphyError::Parse(format!("entry output {port} out of range")));
        }
        let node_type = self.func.node_types.get(node_id).ok_or_else(|| GraphyError::UnknownNodeType {
            module: String::new(),
            name: node_id.to_string(),
        })?;
        node_type
            .data_outputs
            .get(port)
            .map(|n| &n.ty)
            .ok_or_else(|| GraphyError::Parse(format!("{node_id} has no output {port}")))
    }

    /// Resolves `src`'s output `port`, converting it to `expected` inline
    /// when the provider's declared type differs from what the consumer
    /// wants — the synthetic converter call of Stage E bullet 1.
    /// `connectData` already rejected any edge with no registered
    /// conversion, so a mismatch reaching here always has a `ConversionKind`.
    pub fn resolve_input(&self, src: &str, src_port: usize, expected: &DataType, block: BasicBlock<'ctx>) -> Result<BasicValueEnum<'ctx>> {
        let value = self.value_of(src, src_port, block)?;
        let actual = self.source_type(src, src_port)?;
        if actual == expected {
            return Ok(value);
        }
        let kind = conversion_kind_for(actual.name(), expected.name()).ok_or_else(|| GraphyError::TypeMismatch {
            expected: expected.qualified_name(),
            actual: actual.qualified_name(),
        })?;
        self.builder.position_at_end(block);
        let ctx = self.builder.get_insert_block().unwrap().get_context();
        convert_value(kind, value, self.builder, ctx)
    }

    fn materialize(&self, node_id: &str, block: BasicBlock<'ctx>) -> Result<Vec<BasicValueEnum<'ctx>>> {
        let key = (node_id.to_string(), block.get_name().to_string_lossy().into_owned());
        if let Some(values) = self.cache.borrow().get(&key) {
            return Ok(values.clone());
        }
        if !self.visiting.borrow_mut().insert(key.clone()) {
            return Err(GraphyError::CyclicPureDependency(node_id.to_string()));
        }

        let result = self.materialize_uncached(node_id, block);
        self.visiting.borrow_mut().remove(&key);
        let values = result?;
        self.cache.borrow_mut().insert(key, values.clone());
        Ok(values)
    }

    fn materialize_uncached(&self, node_id: &str, block: BasicBlock<'ctx>) -> Result<Vec<BasicValueEnum<'ctx>>> {
        let node = self.func.graph.nodes.get(node_id).ok_or_else(|| GraphyError::UnknownNodeType {
            module: String::new(),
            name: node_id.to_string(),
        })?;
        let node_type = self.func.node_types.get(node_id).expect("checked by value_of");

        let mut inputs = Vec::with_capacity(node_type.data_inputs.len());
        for (i, slot) in node.input_data_connections.iter().enumerate() {
            let (src, src_port) = slot.clone().ok_or_else(|| GraphyError::UnconnectedInput {
                node: node_id.to_string(),
                input: node_type.data_inputs.get(i).map(|n| n.label.clone()).unwrap_or_default(),
            })?;
            let expected = &node_type.data_inputs[i].ty;
            inputs.push(self.resolve_input(&src, src_port, expected, block)?);
        }

        self.builder.position_at_end(block);
        let mut slots = Vec::with_capacity(node_type.data_outputs.len());
        for out in &node_type.data_outputs {
            let alloca = self
                .builder
                .build_alloca(out.ty.backend(), "pure.out")
                .map_err(|e| GraphyError::BackendError(e.to_string()))?;
            slots.push(alloca);
        }

        node_type.codegen(CodegenRequest {
            exec_input: 0,
            inputs,
            output_slots: slots.clone(),
            block,
            output_blocks: vec![],
            builder: self.builder,
            module: self.module,
        })?;

        self.builder.position_at_end(block);
        let mut values = Vec::with_capacity(slots.len());
        for (slot, out) in slots.iter().zip(&node_type.data_outputs) {
            let loaded = self
                .builder
                .build_load(out.ty.backend(), *slot, "pure.load")
                .map_err(|e| GraphyError::BackendError(e.to_string()))?;
            values.push(loaded);
        }
        Ok(values)
    }
}
