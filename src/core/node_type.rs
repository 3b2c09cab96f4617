//! NodeType: the template every NodeInstance is an instantiation of.

use crate::error::Result;
use inkwell::basic_block::BasicBlock;
use inkwell::values::BasicValueEnum;
use serde_json::Value as Json;

use super::types::{DataType, NamedDataType};

/// Which exec-input fired, the backend values for every data port in
/// io-order (inputs then outputs, outputs passed as pointer-backed slots
/// the codegen writes through), the block to emit into, and one target
/// block per exec-output.
pub struct CodegenRequest<'ctx, 'b> {
    pub exec_input: usize,
    pub inputs: Vec<BasicValueEnum<'ctx>>,
    /// One pointer value per data output — the stack slot codegen must
    /// store its result into.
    pub output_slots: Vec<inkwell::values::PointerValue<'ctx>>,
    pub block: BasicBlock<'ctx>,
    pub output_blocks: Vec<BasicBlock<'ctx>>,
    pub builder: &'b inkwell::builder::Builder<'ctx>,
    /// The backend module the enclosing function lives in — needed by
    /// call-through codegen (graph-function-derived NodeTypes) to look up
    /// the callee by name.
    pub module: &'b inkwell::module::Module<'ctx>,
}

/// The capability trio a NodeType must provide: codegen, clone, serialize.
/// Grounded in the `codegen`/`toJSON`/`clone` virtual trio of the original
/// node-type interface and in the trait-object metadata-provider pattern
/// the teacher uses to keep node behavior polymorphic without cross-casting.
pub trait NodeTypeCodegen: std::fmt::Debug {
    /// Emit IR for one firing of this node type. Must terminate
    /// `request.block` with a branch or switch into one of
    /// `request.output_blocks` (or, for an `exit` node, a `ret`).
    fn codegen(&self, request: CodegenRequest<'_, '_>) -> Result<()>;

    /// An independent capability object carrying the same behavior, so
    /// instances keep a stable identity after edits to the owning template.
    fn clone_capability(&self) -> Box<dyn NodeTypeCodegen>;

    /// A JSON value that, together with the NodeType's qualified name,
    /// round-trips through the owning module's factory.
    fn serialize_capability(&self) -> Json;
}

/// A template for nodes: the shared shape of every instantiable node kind,
/// whether builtin (LangModule dispatch table) or graph-function-derived
/// (GraphModule re-export).
pub struct NodeType {
    pub module: String,
    pub name: String,
    pub description: String,
    pub data_inputs: Vec<NamedDataType>,
    pub data_outputs: Vec<NamedDataType>,
    pub exec_inputs: Vec<String>,
    pub exec_outputs: Vec<String>,
    /// A pure node has no exec ports and is evaluated on demand at each use.
    pub pure: bool,
    codegen: Box<dyn NodeTypeCodegen>,
}

impl NodeType {
    /// Construct a NodeType, rejecting the one statically-checkable
    /// ill-formed shape: a pure node with zero data outputs (Open Question
    /// (b), resolved as ill-formed).
    pub fn new(
        module: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        data_inputs: Vec<NamedDataType>,
        data_outputs: Vec<NamedDataType>,
        exec_inputs: Vec<String>,
        exec_outputs: Vec<String>,
        pure: bool,
        codegen: Box<dyn NodeTypeCodegen>,
    ) -> Result<Self> {
        if pure && (!exec_inputs.is_empty() || !exec_outputs.is_empty()) {
            return Err(crate::error::GraphyError::InvalidSignature(format!(
                "pure node type {}:{} declares exec ports",
                module.into(),
                name.into()
            )));
        }
        let module = module.into();
        let name = name.into();
        if pure && data_outputs.is_empty() {
            return Err(crate::error::GraphyError::InvalidSignature(format!(
                "pure node type {module}:{name} has zero data outputs"
            )));
        }
        Ok(NodeType {
            module,
            name,
            description: description.into(),
            data_inputs,
            data_outputs,
            exec_inputs,
            exec_outputs,
            pure,
            codegen,
        })
    }

    pub fn qualified_name(&self) -> String {
        format!("{}:{}", self.module, self.name)
    }

    pub fn codegen(&self, request: CodegenRequest<'_, '_>) -> Result<()> {
        self.codegen.codegen(request)
    }

    pub fn clone_type(&self) -> NodeType {
        NodeType {
            module: self.module.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            data_inputs: self.data_inputs.clone(),
            data_outputs: self.data_outputs.clone(),
            exec_inputs: self.exec_inputs.clone(),
            exec_outputs: self.exec_outputs.clone(),
            pure: self.pure,
            codegen: self.codegen.clone_capability(),
        }
    }

    pub fn serialize(&self) -> Json {
        self.codegen.serialize_capability()
    }
}

impl Clone for NodeType {
    fn clone(&self) -> Self {
        self.clone_type()
    }
}

impl std::fmt::Debug for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeType")
            .field("qualified_name", &self.qualified_name())
            .field("pure", &self.pure)
            .field("data_inputs", &self.data_inputs.len())
            .field("data_outputs", &self.data_outputs.len())
            .field("exec_inputs", &self.exec_inputs.len())
            .field("exec_outputs", &self.exec_outputs.len())
            .finish()
    }
}
