//! GraphStruct: a named product type owned by a GraphModule, inducing
//! `make-StructName` / `break-StructName` NodeTypes the way the original
//! JSON-backed module generates struct accessor nodes.

use inkwell::types::BasicType;
use inkwell::values::BasicValue;
use serde_json::Value as Json;

use crate::core::{CodegenRequest, DataType, NamedDataType, NodeType, NodeTypeCodegen};
use crate::error::{GraphyError, Result};

#[derive(Debug, Clone)]
pub struct GraphStruct {
    pub name: String,
    pub fields: Vec<NamedDataType>,
}

impl GraphStruct {
    pub fn new(name: impl Into<String>, fields: Vec<NamedDataType>) -> Self {
        GraphStruct { name: name.into(), fields }
    }

    /// The struct's own DataType, backed by an LLVM struct type built from
    /// its fields' backend types in declared order.
    pub fn data_type<'ctx>(&self, llvm: &'ctx inkwell::context::Context, module_full_name: &str) -> DataType {
        let field_types: Vec<_> = self.fields.iter().map(|f| f.ty.backend::<'ctx>()).collect();
        let struct_ty = llvm.struct_type(&field_types, false);
        DataType::new(module_full_name, self.name.clone(), struct_ty.into())
    }

    /// Synthesizes the `make-StructName` NodeType: one data input per
    /// field, one data output (the assembled struct), pure.
    pub fn make_node_type<'ctx>(&self, llvm: &'ctx inkwell::context::Context, module_full_name: &str) -> Result<NodeType> {
        let struct_ty = self.data_type(llvm, module_full_name);
        NodeType::new(
            module_full_name,
            format!("make-{}", self.name),
            format!("construct a {}", self.name),
            self.fields.clone(),
            vec![NamedDataType::new("out", struct_ty.clone())],
            vec![],
            vec![],
            true,
            Box::new(MakeStructCodegen {
                struct_name: self.name.clone(),
                field_count: self.fields.len(),
            }),
        )
    }

    /// Synthesizes the `break-StructName` NodeType: one data input (the
    /// struct), one data output per field, pure.
    pub fn break_node_type<'ctx>(&self, llvm: &'ctx inkwell::context::Context, module_full_name: &str) -> Result<NodeType> {
        let struct_ty = self.data_type(llvm, module_full_name);
        NodeType::new(
            module_full_name,
            format!("break-{}", self.name),
            format!("decompose a {}", self.name),
            vec![NamedDataType::new("in", struct_ty)],
            self.fields.clone(),
            vec![],
            vec![],
            true,
            Box::new(BreakStructCodegen {
                struct_name: self.name.clone(),
                field_count: self.fields.len(),
            }),
        )
    }

    pub fn to_json(&self) -> Json {
        let mut fields = serde_json::Map::new();
        for field in &self.fields {
            fields.insert(field.label.clone(), Json::String(field.ty.qualified_name()));
        }
        Json::Object(fields)
    }
}

#[derive(Debug, Clone)]
struct MakeStructCodegen {
    struct_name: String,
    field_count: usize,
}

impl NodeTypeCodegen for MakeStructCodegen {
    fn codegen(&self, request: CodegenRequest<'_, '_>) -> Result<()> {
        let out_slot = request.output_slots[0];
        let pointee = out_slot
            .get_type()
            .get_element_type()
            .into_struct_type();
        let mut aggregate = pointee.get_undef();
        for (i, value) in request.inputs.iter().enumerate().take(self.field_count) {
            aggregate = request
                .builder
                .build_insert_value(aggregate, *value, i as u32, "field")
                .map_err(|e| GraphyError::BackendError(e.to_string()))?
                .into_struct_value();
        }
        request
            .builder
            .build_store(out_slot, aggregate)
            .map_err(|e| GraphyError::BackendError(e.to_string()))?;
        Ok(())
    }

    fn clone_capability(&self) -> Box<dyn NodeTypeCodegen> {
        Box::new(self.clone())
    }

    fn serialize_capability(&self) -> Json {
        Json::Null
    }
}

#[derive(Debug, Clone)]
struct BreakStructCodegen {
    struct_name: String,
    field_count: usize,
}

impl NodeTypeCodegen for BreakStructCodegen {
    fn codegen(&self, request: CodegenRequest<'_, '_>) -> Result<()> {
        let aggregate = request.inputs[0].into_struct_value();
        for i in 0..self.field_count {
            let field = request
                .builder
                .build_extract_value(aggregate, i as u32, "field")
                .map_err(|e| GraphyError::BackendError(e.to_string()))?;
            request
                .builder
                .build_store(request.output_slots[i], field.as_basic_value_enum())
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
