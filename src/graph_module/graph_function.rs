//! GraphFunction: a Graph plus a declared signature.

use std::collections::HashMap;

use crate::core::{Graph, NamedDataType, NodeId, NodeInstance, NodeType, Position};
use crate::error::{GraphyError, Result};
use crate::lang::primitives::conversion_kind_for;
use crate::lang::LANG_MODULE_NAME;

/// A Graph plus a declared signature: `(dataInputs, dataOutputs,
/// execInputs, execOutputs, entryId?, exitId?)`. A function with a
/// declared signature must contain at most one entry node whose outputs
/// match `dataInputs`/`execInputs`, and any number of exit nodes whose
/// inputs match `dataOutputs`/`execOutputs` — `FunctionCompiler` Stage A
/// is what actually checks this; `GraphFunction` just carries the
/// declaration.
#[derive(Debug, Clone)]
pub struct GraphFunction {
    pub name: String,
    pub description: String,
    pub data_inputs: Vec<NamedDataType>,
    pub data_outputs: Vec<NamedDataType>,
    pub exec_inputs: Vec<String>,
    pub exec_outputs: Vec<String>,
    pub graph: Graph,
    pub entry_id: Option<String>,
    /// Each node's resolved NodeType, recorded at load time (or by whoever
    /// builds the graph in memory) so `FunctionCompiler` never needs a
    /// `Context` handle of its own to re-resolve qualified names.
    pub node_types: HashMap<NodeId, NodeType>,
}

impl GraphFunction {
    pub fn new(name: impl Into<String>) -> Self {
        GraphFunction {
            name: name.into(),
            description: String::new(),
            data_inputs: Vec::new(),
            data_outputs: Vec::new(),
            exec_inputs: Vec::new(),
            exec_outputs: Vec::new(),
            graph: Graph::new(),
            entry_id: None,
            node_types: HashMap::new(),
        }
    }

    /// Records the NodeType a node was constructed from — must be called
    /// alongside `insert_node` for `FunctionCompiler` to later find it.
    pub fn set_node_type(&mut self, id: impl Into<String>, node_type: NodeType) {
        self.node_types.insert(id.into(), node_type);
    }

    /// Validates uniqueness of `id` (delegating to `Graph::insert_node`).
    pub fn insert_node(
        &mut self,
        id: impl Into<String>,
        node_type: impl Into<String>,
        position: Position,
        num_data_inputs: usize,
        num_exec_inputs: usize,
        num_exec_outputs: usize,
        data: serde_json::Value,
    ) -> Result<&mut NodeInstance> {
        let node = NodeInstance::new(
            id,
            node_type,
            position,
            num_data_inputs,
            num_exec_inputs,
            num_exec_outputs,
            data,
        );
        self.graph.insert_node(node)
    }

    /// Disconnects then erases.
    pub fn remove_node(&mut self, id: &str) -> Result<()> {
        self.graph.remove_node(id)
    }

    /// Checks type equality before delegating index-bound checking to
    /// `Graph::connect_data`: if the endpoints' DataTypes differ and no
    /// `lang` primitive conversion exists between them (`lang::primitives
    /// ::conversion_kind_for`), fails with `TypeMismatch` rather than
    /// wiring the edge. A mismatch the compiler *can* bridge is still
    /// wired here — `FunctionCompiler`'s `Materializer` inserts the actual
    /// converter inline at compile time (Stage E), since only it has a
    /// `Builder` to emit the conversion instruction into.
    pub fn connect_data(&mut self, src: &str, src_out: usize, dst: &str, dst_in: usize) -> Result<()> {
        if let (Some(src_type), Some(dst_type)) = (self.node_types.get(src), self.node_types.get(dst)) {
            if let (Some(src_port), Some(dst_port)) = (src_type.data_outputs.get(src_out), dst_type.data_inputs.get(dst_in)) {
                if src_port.ty != dst_port.ty {
                    let (from, to) = (&src_port.ty, &dst_port.ty);
                    let convertible = from.module() == LANG_MODULE_NAME
                        && to.module() == LANG_MODULE_NAME
                        && conversion_kind_for(from.name(), to.name()).is_some();
                    if !convertible {
                        return Err(GraphyError::TypeMismatch {
                            expected: to.qualified_name(),
                            actual: from.qualified_name(),
                        });
                    }
                }
            }
        }
        self.graph.connect_data(src, src_out, dst, dst_in)
    }

    pub fn connect_exec(&mut self, src: &str, src_out: usize, dst: &str, dst_in: usize) -> Result<()> {
        self.graph.connect_exec(src, src_out, dst, dst_in)
    }

    pub fn disconnect_data(&mut self, dst: &str, dst_in: usize) -> Result<()> {
        self.graph.disconnect_data(dst, dst_in)
    }

    pub fn disconnect_exec(&mut self, src: &str, src_out: usize) -> Result<()> {
        self.graph.disconnect_exec(src, src_out)
    }

    /// Must not clash with a sibling function name; the check itself is
    /// performed by the owning `GraphModule`, which has visibility into
    /// its sibling functions.
    pub fn set_name(&mut self, new_name: impl Into<String>) -> Result<()> {
        let new_name = new_name.into();
        if new_name.is_empty() {
            return Err(GraphyError::InvalidSignature("function name cannot be empty".into()));
        }
        self.name = new_name;
        Ok(())
    }

    /// All `exit`-typed nodes in the graph, by id.
    pub fn exit_node_ids<'a>(&'a self) -> impl Iterator<Item = &'a str> + 'a {
        self.graph
            .nodes
            .iter()
            .filter(|(_, n)| n.node_type == "lang:exit")
            .map(|(id, _)| id.as_str())
    }
}
