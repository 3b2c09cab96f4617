//! Primitive node types: `if`, `entry`, `exit`, the `const-*` family,
//! `strliteral`, the numeric conversions, and the arithmetic/comparison
//! families over `{i32, float}`.
//!
//! Grounded in `original_source/libchigraph/src/LangModule.cpp`'s
//! `NodeTypeFactories` dispatch table: each entry here is a
//! [`crate::core::NodeTypeCodegen`] impl constructed from the same fixed
//! name set (`"entry"`, `"exit"`, `"const-int"`, `"const-float"`,
//! `"const-bool"`, `"strliteral"`, `"inttofloat"`, `"floattoint"`, `"if"`,
//! plus the arithmetic/comparison family).

use inkwell::values::BasicValue;
use inkwell::{FloatPredicate, IntPredicate};
use serde_json::Value as Json;

use crate::core::{CodegenRequest, NodeTypeCodegen};
use crate::error::{GraphyError, Result};

/// `const-int`: pure node, data-out i32, value from JSON integer.
#[derive(Debug, Clone)]
pub struct ConstIntCodegen {
    pub value: i64,
}

impl NodeTypeCodegen for ConstIntCodegen {
    fn codegen(&self, request: CodegenRequest<'_, '_>) -> Result<()> {
        let ty = request.builder.get_insert_block().unwrap().get_context().i32_type();
        let value = ty.const_int(self.value as u64, true);
        request
            .builder
            .build_store(request.output_slots[0], value)
            .map_err(|e| GraphyError::BackendError(e.to_string()))?;
        Ok(())
    }

    fn clone_capability(&self) -> Box<dyn NodeTypeCodegen> {
        Box::new(self.clone())
    }

    fn serialize_capability(&self) -> Json {
        Json::Number(self.value.into())
    }
}

/// `const-float`: pure node, data-out float (64-bit IEEE), value from JSON number.
#[derive(Debug, Clone)]
pub struct ConstFloatCodegen {
    pub value: f64,
}

impl NodeTypeCodegen for ConstFloatCodegen {
    fn codegen(&self, request: CodegenRequest<'_, '_>) -> Result<()> {
        let ty = request.builder.get_insert_block().unwrap().get_context().f64_type();
        let value = ty.const_float(self.value);
        request
            .builder
            .build_store(request.output_slots[0], value)
            .map_err(|e| GraphyError::BackendError(e.to_string()))?;
        Ok(())
    }

    fn clone_capability(&self) -> Box<dyn NodeTypeCodegen> {
        Box::new(self.clone())
    }

    fn serialize_capability(&self) -> Json {
        Json::from(self.value)
    }
}

/// `const-bool`: pure node, data-out i1, value from JSON boolean.
#[derive(Debug, Clone)]
pub struct ConstBoolCodegen {
    pub value: bool,
}

impl NodeTypeCodegen for ConstBoolCodegen {
    fn codegen(&self, request: CodegenRequest<'_, '_>) -> Result<()> {
        let ty = request.builder.get_insert_block().unwrap().get_context().bool_type();
        let value = ty.const_int(self.value as u64, false);
        request
            .builder
            .build_store(request.output_slots[0], value)
            .map_err(|e| GraphyError::BackendError(e.to_string()))?;
        Ok(())
    }

    fn clone_capability(&self) -> Box<dyn NodeTypeCodegen> {
        Box::new(self.clone())
    }

    fn serialize_capability(&self) -> Json {
        Json::Bool(self.value)
    }
}

/// `strliteral`: pure node, data-out i8*, value from JSON string.
///
/// Codegen builds a global string constant lazily on first use and stores
/// its pointer into the output slot.
#[derive(Debug, Clone)]
pub struct StrLiteralCodegen {
    pub value: String,
}

impl NodeTypeCodegen for StrLiteralCodegen {
    fn codegen(&self, request: CodegenRequest<'_, '_>) -> Result<()> {
        let global = request
            .builder
            .build_global_string_ptr(&self.value, "strlit")
            .map_err(|e| GraphyError::BackendError(e.to_string()))?;
        request
            .builder
            .build_store(request.output_slots[0], global.as_pointer_value())
            .map_err(|e| GraphyError::BackendError(e.to_string()))?;
        Ok(())
    }

    fn clone_capability(&self) -> Box<dyn NodeTypeCodegen> {
        Box::new(self.clone())
    }

    fn serialize_capability(&self) -> Json {
        Json::String(self.value.clone())
    }
}

/// `inttofloat` / `floattoint`: pure conversion nodes, and the converter
/// node types synthesized by `Context::create_converter_node_type` for
/// `{i1, i32, float}` pairs (sign-extend / truncate / int-to-float /
/// float-to-int / bool-to-float / float-to-bool).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionKind {
    IntToFloat,
    FloatToInt,
    SignExtend,
    Truncate,
    BoolToFloat,
    FloatToBool,
}

/// Maps an ordered pair of `lang` primitive-type names to the conversion the
/// backend can synthesize between them, or `None` if the pair isn't one of
/// the six fixed numeric conversions among `{i1, i32, float}` (same-type
/// pairs aren't conversions). The sole source of truth for which pairs
/// `connectData` may accept across a type mismatch and which pairs
/// `Context::create_converter_node_type` can build.
pub fn conversion_kind_for(from_name: &str, to_name: &str) -> Option<ConversionKind> {
    match (from_name, to_name) {
        ("i32", "float") => Some(ConversionKind::IntToFloat),
        ("float", "i32") => Some(ConversionKind::FloatToInt),
        ("i1", "i32") => Some(ConversionKind::SignExtend),
        ("i32", "i1") => Some(ConversionKind::Truncate),
        ("i1", "float") => Some(ConversionKind::BoolToFloat),
        ("float", "i1") => Some(ConversionKind::FloatToBool),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct ConversionCodegen {
    pub kind: ConversionKind,
}

/// Emits the backend instruction for `kind` and returns the converted
/// value, shared by `ConversionCodegen::codegen` (converter nodes with
/// their own output slot) and `Materializer::resolve_input` (implicit
/// conversion inserted inline at a mismatched data edge).
pub fn convert_value<'ctx>(
    kind: ConversionKind,
    input: inkwell::values::BasicValueEnum<'ctx>,
    builder: &inkwell::builder::Builder<'ctx>,
    ctx: inkwell::context::ContextRef<'ctx>,
) -> Result<inkwell::values::BasicValueEnum<'ctx>> {
    let result = match kind {
        ConversionKind::IntToFloat => builder
            .build_signed_int_to_float(input.into_int_value(), ctx.f64_type(), "i2f")
            .map_err(|e| GraphyError::BackendError(e.to_string()))?
            .as_basic_value_enum(),
        ConversionKind::FloatToInt => builder
            .build_float_to_signed_int(input.into_float_value(), ctx.i32_type(), "f2i")
            .map_err(|e| GraphyError::BackendError(e.to_string()))?
            .as_basic_value_enum(),
        ConversionKind::SignExtend => builder
            .build_int_s_extend(input.into_int_value(), ctx.i32_type(), "sext")
            .map_err(|e| GraphyError::BackendError(e.to_string()))?
            .as_basic_value_enum(),
        ConversionKind::Truncate => builder
            .build_int_truncate(input.into_int_value(), ctx.bool_type(), "trunc")
            .map_err(|e| GraphyError::BackendError(e.to_string()))?
            .as_basic_value_enum(),
        ConversionKind::BoolToFloat => builder
            .build_unsigned_int_to_float(input.into_int_value(), ctx.f64_type(), "b2f")
            .map_err(|e| GraphyError::BackendError(e.to_string()))?
            .as_basic_value_enum(),
        ConversionKind::FloatToBool => builder
            .build_float_compare(FloatPredicate::ONE, input.into_float_value(), ctx.f64_type().const_float(0.0), "f2b")
            .map_err(|e| GraphyError::BackendError(e.to_string()))?
            .as_basic_value_enum(),
    };
    Ok(result)
}

impl NodeTypeCodegen for ConversionCodegen {
    fn codegen(&self, request: CodegenRequest<'_, '_>) -> Result<()> {
        let input = request.inputs[0];
        let out_slot = request.output_slots[0];
        let ctx = request.builder.get_insert_block().unwrap().get_context();
        let result = convert_value(self.kind, input, request.builder, ctx)?;
        request
            .builder
            .build_store(out_slot, result)
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

/// The numeric kind an arithmetic/comparison primitive operates over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericKind {
    I32,
    Float,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// `{i32,float}{+,-,*,/}`: pure binary arithmetic on matching operand type.
#[derive(Debug, Clone)]
pub struct ArithmeticCodegen {
    pub kind: NumericKind,
    pub op: ArithmeticOp,
}

impl NodeTypeCodegen for ArithmeticCodegen {
    fn codegen(&self, request: CodegenRequest<'_, '_>) -> Result<()> {
        let lhs = request.inputs[0];
        let rhs = request.inputs[1];
        let out_slot = request.output_slots[0];
        let result: inkwell::values::BasicValueEnum = match self.kind {
            NumericKind::I32 => {
                let (l, r) = (lhs.into_int_value(), rhs.into_int_value());
                let v = match self.op {
                    ArithmeticOp::Add => request.builder.build_int_add(l, r, "add"),
                    ArithmeticOp::Sub => request.builder.build_int_sub(l, r, "sub"),
                    ArithmeticOp::Mul => request.builder.build_int_mul(l, r, "mul"),
                    ArithmeticOp::Div => request.builder.build_int_signed_div(l, r, "sdiv"),
                }
                .map_err(|e| GraphyError::BackendError(e.to_string()))?;
                v.as_basic_value_enum()
            }
            NumericKind::Float => {
                let (l, r) = (lhs.into_float_value(), rhs.into_float_value());
                let v = match self.op {
                    ArithmeticOp::Add => request.builder.build_float_add(l, r, "fadd"),
                    ArithmeticOp::Sub => request.builder.build_float_sub(l, r, "fsub"),
                    ArithmeticOp::Mul => request.builder.build_float_mul(l, r, "fmul"),
                    ArithmeticOp::Div => request.builder.build_float_div(l, r, "fdiv"),
                }
                .map_err(|e| GraphyError::BackendError(e.to_string()))?;
                v.as_basic_value_enum()
            }
        };
        request
            .builder
            .build_store(out_slot, result)
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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
}

/// `{i32,float}{<,>,<=,>=,==,!=}`: pure comparison producing i1.
#[derive(Debug, Clone)]
pub struct ComparisonCodegen {
    pub kind: NumericKind,
    pub op: CompareOp,
}

impl NodeTypeCodegen for ComparisonCodegen {
    fn codegen(&self, request: CodegenRequest<'_, '_>) -> Result<()> {
        let lhs = request.inputs[0];
        let rhs = request.inputs[1];
        let out_slot = request.output_slots[0];
        let result = match self.kind {
            NumericKind::I32 => {
                let (l, r) = (lhs.into_int_value(), rhs.into_int_value());
                let pred = match self.op {
                    CompareOp::Lt => IntPredicate::SLT,
                    CompareOp::Gt => IntPredicate::SGT,
                    CompareOp::Le => IntPredicate::SLE,
                    CompareOp::Ge => IntPredicate::SGE,
                    CompareOp::Eq => IntPredicate::EQ,
                    CompareOp::Ne => IntPredicate::NE,
                };
                request
                    .builder
                    .build_int_compare(pred, l, r, "icmp")
                    .map_err(|e| GraphyError::BackendError(e.to_string()))?
            }
            NumericKind::Float => {
                let (l, r) = (lhs.into_float_value(), rhs.into_float_value());
                let pred = match self.op {
                    CompareOp::Lt => FloatPredicate::OLT,
                    CompareOp::Gt => FloatPredicate::OGT,
                    CompareOp::Le => FloatPredicate::OLE,
                    CompareOp::Ge => FloatPredicate::OGE,
                    CompareOp::Eq => FloatPredicate::OEQ,
                    CompareOp::Ne => FloatPredicate::ONE,
                };
                request
                    .builder
                    .build_float_compare(pred, l, r, "fcmp")
                    .map_err(|e| GraphyError::BackendError(e.to_string()))?
            }
        };
        request
            .builder
            .build_store(out_slot, result)
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

/// `if`: exec-in 1, exec-out 2 (True/False), data-in (i1).
#[derive(Debug, Clone)]
pub struct IfCodegen;

impl NodeTypeCodegen for IfCodegen {
    fn codegen(&self, request: CodegenRequest<'_, '_>) -> Result<()> {
        let cond = request.inputs[0].into_int_value();
        request
            .builder
            .build_conditional_branch(cond, request.output_blocks[0], request.output_blocks[1])
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

/// `entry`/`exit`: signature read from JSON `{ "data": [...], "exec": [...] }`.
/// `FunctionCompiler` special-cases both by qualified name (`lang:entry`,
/// `lang:exit`) for Stage C argument storage and Stage F return emission
/// respectively — these codegen impls are never invoked by the normal
/// exec-walk dispatch and exist only to satisfy the NodeType capability
/// contract (clone/serialize) and as a defensive fallback.
#[derive(Debug, Clone)]
pub struct EntryCodegen;

impl NodeTypeCodegen for EntryCodegen {
    fn codegen(&self, request: CodegenRequest<'_, '_>) -> Result<()> {
        if let Some(&target) = request.output_blocks.first() {
            request
                .builder
                .build_unconditional_branch(target)
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

#[derive(Debug, Clone)]
pub struct ExitCodegen;

impl NodeTypeCodegen for ExitCodegen {
    fn codegen(&self, request: CodegenRequest<'_, '_>) -> Result<()> {
        let ctx = request.builder.get_insert_block().unwrap().get_context();
        let idx = ctx.i32_type().const_int(request.exec_input as u64, false);
        request
            .builder
            .build_return(Some(&idx))
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

/// Parses an operator-family node type name (`"i32+i32"`, `"float<=float"`,
/// etc) into its numeric kind and operation, or `None` if `name` isn't one
/// of the fixed arithmetic/comparison names.
pub fn parse_arithmetic_name(name: &str) -> Option<(NumericKind, ArithmeticOp)> {
    for (kind, prefix) in [(NumericKind::I32, "i32"), (NumericKind::Float, "float")] {
        let Some(rest) = name.strip_prefix(prefix) else { continue };
        let Some(op_str) = rest.strip_suffix(prefix) else { continue };
        let op = match op_str {
            "+" => ArithmeticOp::Add,
            "-" => ArithmeticOp::Sub,
            "*" => ArithmeticOp::Mul,
            "/" => ArithmeticOp::Div,
            _ => continue,
        };
        return Some((kind, op));
    }
    None
}

pub fn parse_comparison_name(name: &str) -> Option<(NumericKind, CompareOp)> {
    for (kind, prefix) in [(NumericKind::I32, "i32"), (NumericKind::Float, "float")] {
        let Some(rest) = name.strip_prefix(prefix) else { continue };
        let Some(op_str) = rest.strip_suffix(prefix) else { continue };
        let op = match op_str {
            "<" => CompareOp::Lt,
            ">" => CompareOp::Gt,
            "<=" => CompareOp::Le,
            ">=" => CompareOp::Ge,
            "==" => CompareOp::Eq,
            "!=" => CompareOp::Ne,
            _ => continue,
        };
        return Some((kind, op));
    }
    None
}
