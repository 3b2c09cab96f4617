//! NodeInstance: a placement of a NodeType in a Graph, with the three
//! connection-slot kinds that encode the graph's adjacency symmetrically.

use std::collections::HashSet;

use super::types::Position;

/// Stable within the owning Graph; used for serialization and lookup.
pub type NodeId = String;

/// A placement of a NodeType in a Graph.
///
/// Connection slots are indexed in parallel to the owning NodeType's port
/// lists (`data_inputs[i]` corresponds to `input_data_connections[i]`, etc).
/// `Graph::insert_node` is responsible for sizing these vectors to match the
/// NodeType; `connect*`/`disconnect*` maintain the symmetric-adjacency
/// invariant across both endpoints.
#[derive(Debug, Clone)]
pub struct NodeInstance {
    pub id: NodeId,
    pub node_type: String,
    pub position: Position,

    /// One slot per data input; at most one source each.
    pub input_data_connections: Vec<Option<(NodeId, usize)>>,
    /// One slot per exec input; many-to-one allowed, so each slot is a set.
    pub input_exec_connections: Vec<HashSet<(NodeId, usize)>>,
    /// One slot per exec output; strict single-successor, at most one target.
    pub output_exec_connections: Vec<Option<(NodeId, usize)>>,

    /// Per-node-type JSON payload (e.g. the integer literal for `const-int`).
    pub data: serde_json::Value,
}

impl NodeInstance {
    /// Construct a NodeInstance whose connection slots are sized from the
    /// owning NodeType's port-list lengths, per the invariant that
    /// `input_data_connections.len() == node_type.data_inputs.len()` (and
    /// similarly for exec ports).
    pub fn new(
        id: impl Into<String>,
        node_type: impl Into<String>,
        position: Position,
        num_data_inputs: usize,
        num_exec_inputs: usize,
        num_exec_outputs: usize,
        data: serde_json::Value,
    ) -> Self {
        NodeInstance {
            id: id.into(),
            node_type: node_type.into(),
            position,
            input_data_connections: vec![None; num_data_inputs],
            input_exec_connections: vec![HashSet::new(); num_exec_inputs],
            output_exec_connections: vec![None; num_exec_outputs],
            data,
        }
    }
}
