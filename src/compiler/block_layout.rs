//! Stage B: block layout. One basic block per exec-input, for every impure
//! node — shared across however many edges fan into that input (Open
//! Question (a), resolved: one block per input, not one per incoming edge).
//! Pure nodes never reach here (`NodeType::new` rejects a pure node with
//! exec ports), and `entry` has zero exec-inputs by construction, so it
//! never gets a block from this pass either — its routing is built
//! directly from the function's real entry block instead.

use std::collections::HashMap;

use inkwell::basic_block::BasicBlock;
use inkwell::values::FunctionValue;

use crate::core::NodeId;
use crate::graph_module::GraphFunction;

/// Key into the block map: a node id and one of its exec-input indices.
pub type BlockKey = (NodeId, usize);

pub fn layout_blocks<'ctx>(
    llvm: &'ctx inkwell::context::Context,
    function: FunctionValue<'ctx>,
    func: &GraphFunction,
) -> HashMap<BlockKey, BasicBlock<'ctx>> {
    let mut blocks = HashMap::new();
    for (node_id, node_type) in &func.node_types {
        if node_type.pure {
            continue;
        }
        for i in 0..node_type.exec_inputs.len() {
            let label = format!("{node_id}_{i}");
            let block = llvm.append_basic_block(function, &label);
            blocks.insert((node_id.clone(), i), block);
        }
    }
    blocks
}
