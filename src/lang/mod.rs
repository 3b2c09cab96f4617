//! LangModule: the always-present builtin module providing the primitive
//! types (`i32`, `i1`, `float`, `i8*`) and primitive nodes.

pub mod primitives;

use std::collections::HashSet;

use inkwell::AddressSpace;
use serde_json::Value as Json;

use crate::core::{DataType, Module, NamedDataType, NodeType};
use crate::error::{GraphyError, Result};

use primitives::{
    parse_arithmetic_name, parse_comparison_name, ArithmeticCodegen, ComparisonCodegen, ConstBoolCodegen,
    ConstFloatCodegen, ConstIntCodegen, ConversionCodegen, ConversionKind, EntryCodegen, ExitCodegen, IfCodegen,
    StrLiteralCodegen,
};

pub const LANG_MODULE_NAME: &str = "lang";

/// The builtin module. Holds no state beyond its dependency set (always
/// empty) — every type/node is synthesized on demand from the fixed
/// dispatch table, grounded in `LangModule.cpp`'s `NodeTypeFactories` map.
///
/// `llvm` borrows the owning `Context`'s backend context with the lifetime
/// erased the same way `DataType::new` does, so every type handle this
/// module hands out belongs to the one LLVM context the whole `Context`
/// compiles against (back-reference design note in spec.md §9).
#[derive(Debug)]
pub struct LangModule {
    llvm: &'static inkwell::context::Context,
    dependencies: HashSet<String>,
}

impl LangModule {
    pub fn new<'ctx>(llvm: &'ctx inkwell::context::Context) -> Self {
        let llvm: &'static inkwell::context::Context = unsafe { std::mem::transmute(llvm) };
        LangModule {
            llvm,
            dependencies: HashSet::new(),
        }
    }

    fn i32_ty(&self) -> DataType {
        DataType::new(LANG_MODULE_NAME, "i32", self.llvm.i32_type().into())
    }

    fn i1_ty(&self) -> DataType {
        DataType::new(LANG_MODULE_NAME, "i1", self.llvm.bool_type().into())
    }

    fn float_ty(&self) -> DataType {
        DataType::new(LANG_MODULE_NAME, "float", self.llvm.f64_type().into())
    }

    fn ptr_ty(&self) -> DataType {
        DataType::new(
            LANG_MODULE_NAME,
            "i8*",
            self.llvm.i8_type().ptr_type(AddressSpace::default()).into(),
        )
    }

    fn named_from_type_string(&self, label: &str, qualified: &str) -> Result<NamedDataType> {
        let (module, name) = crate::core::parse_qualified_name(qualified)?;
        if module != LANG_MODULE_NAME {
            // Non-lang types in an entry/exit signature are resolved later
            // by Context against the owning module's dependency set.
            return Err(GraphyError::UnknownType {
                module: module.to_string(),
                name: name.to_string(),
            });
        }
        let ty = self.type_from_name(name).ok_or_else(|| GraphyError::UnknownType {
            module: module.to_string(),
            name: name.to_string(),
        })?;
        Ok(NamedDataType::new(label, ty))
    }

    fn signature_from_json(json: &Json) -> Result<(Vec<(String, String)>, Vec<String>)> {
        let data = json
            .get("data")
            .and_then(Json::as_array)
            .ok_or_else(|| GraphyError::Parse("entry/exit node missing \"data\" array".into()))?;
        let mut data_ports = Vec::with_capacity(data.len());
        for port in data {
            let obj = port
                .as_object()
                .ok_or_else(|| GraphyError::Parse("entry/exit data port must be an object".into()))?;
            let (label, ty) = obj
                .iter()
                .next()
                .ok_or_else(|| GraphyError::Parse("entry/exit data port is empty".into()))?;
            let ty_str = ty
                .as_str()
                .ok_or_else(|| GraphyError::Parse("entry/exit data port type must be a string".into()))?;
            data_ports.push((label.clone(), ty_str.to_string()));
        }
        let exec = json
            .get("exec")
            .and_then(Json::as_array)
            .ok_or_else(|| GraphyError::Parse("entry/exit node missing \"exec\" array".into()))?;
        let exec_labels = exec
            .iter()
            .map(|v| v.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| GraphyError::Parse("entry/exit exec labels must be strings".into()))?;
        Ok((data_ports, exec_labels))
    }
}

impl Module for LangModule {
    fn full_name(&self) -> &str {
        LANG_MODULE_NAME
    }

    fn node_type_from_name(&self, name: &str, json: &Json) -> Result<NodeType> {
        match name {
            "const-int" => {
                let value = json
                    .as_i64()
                    .ok_or_else(|| GraphyError::Parse("const-int requires an integer JSON payload".into()))?;
                NodeType::new(
                    LANG_MODULE_NAME,
                    "const-int",
                    "integer literal",
                    vec![],
                    vec![NamedDataType::new("out", self.i32_ty())],
                    vec![],
                    vec![],
                    true,
                    Box::new(ConstIntCodegen { value }),
                )
            }
            "const-float" => {
                let value = json
                    .as_f64()
                    .ok_or_else(|| GraphyError::Parse("const-float requires a numeric JSON payload".into()))?;
                NodeType::new(
                    LANG_MODULE_NAME,
                    "const-float",
                    "float literal",
                    vec![],
                    vec![NamedDataType::new("out", self.float_ty())],
                    vec![],
                    vec![],
                    true,
                    Box::new(ConstFloatCodegen { value }),
                )
            }
            "const-bool" => {
                let value = json
                    .as_bool()
                    .ok_or_else(|| GraphyError::Parse("const-bool requires a boolean JSON payload".into()))?;
                NodeType::new(
                    LANG_MODULE_NAME,
                    "const-bool",
                    "boolean literal",
                    vec![],
                    vec![NamedDataType::new("out", self.i1_ty())],
                    vec![],
                    vec![],
                    true,
                    Box::new(ConstBoolCodegen { value }),
                )
            }
            "strliteral" => {
                let value = json
                    .as_str()
                    .ok_or_else(|| GraphyError::Parse("strliteral requires a string JSON payload".into()))?
                    .to_string();
                NodeType::new(
                    LANG_MODULE_NAME,
                    "strliteral",
                    "string literal",
                    vec![],
                    vec![NamedDataType::new("out", self.ptr_ty())],
                    vec![],
                    vec![],
                    true,
                    Box::new(StrLiteralCodegen { value }),
                )
            }
            "inttofloat" => NodeType::new(
                LANG_MODULE_NAME,
                "inttofloat",
                "int to float conversion",
                vec![NamedDataType::new("in", self.i32_ty())],
                vec![NamedDataType::new("out", self.float_ty())],
                vec![],
                vec![],
                true,
                Box::new(ConversionCodegen {
                    kind: ConversionKind::IntToFloat,
                }),
            ),
            "floattoint" => NodeType::new(
                LANG_MODULE_NAME,
                "floattoint",
                "float to int conversion",
                vec![NamedDataType::new("in", self.float_ty())],
                vec![NamedDataType::new("out", self.i32_ty())],
                vec![],
                vec![],
                true,
                Box::new(ConversionCodegen {
                    kind: ConversionKind::FloatToInt,
                }),
            ),
            "if" => NodeType::new(
                LANG_MODULE_NAME,
                "if",
                "conditional branch",
                vec![NamedDataType::new("cond", self.i1_ty())],
                vec![],
                vec!["in".into()],
                vec!["True".into(), "False".into()],
                false,
                Box::new(IfCodegen),
            ),
            "entry" => {
                let (data, exec) = Self::signature_from_json(json)?;
                let data_outputs = data
                    .iter()
                    .map(|(label, ty)| self.named_from_type_string(label, ty))
                    .collect::<Result<Vec<_>>>()?;
                NodeType::new(
                    LANG_MODULE_NAME,
                    "entry",
                    "function entry",
                    vec![],
                    data_outputs,
                    vec![],
                    exec,
                    false,
                    Box::new(EntryCodegen),
                )
            }
            "exit" => {
                let (data, exec) = Self::signature_from_json(json)?;
                let data_inputs = data
                    .iter()
                    .map(|(label, ty)| self.named_from_type_string(label, ty))
                    .collect::<Result<Vec<_>>>()?;
                NodeType::new(
                    LANG_MODULE_NAME,
                    "exit",
                    "function exit",
                    data_inputs,
                    vec![],
                    exec,
                    vec![],
                    false,
                    Box::new(ExitCodegen),
                )
            }
            _ => {
                if let Some((kind, op)) = parse_arithmetic_name(name) {
                    let ty = match kind {
                        primitives::NumericKind::I32 => self.i32_ty(),
                        primitives::NumericKind::Float => self.float_ty(),
                    };
                    NodeType::new(
                        LANG_MODULE_NAME,
                        name,
                        "arithmetic",
                        vec![NamedDataType::new("lhs", ty.clone()), NamedDataType::new("rhs", ty.clone())],
                        vec![NamedDataType::new("out", ty)],
                        vec![],
                        vec![],
                        true,
                        Box::new(ArithmeticCodegen { kind, op }),
                    )
                } else if let Some((kind, op)) = parse_comparison_name(name) {
                    let operand_ty = match kind {
                        primitives::NumericKind::I32 => self.i32_ty(),
                        primitives::NumericKind::Float => self.float_ty(),
                    };
                    NodeType::new(
                        LANG_MODULE_NAME,
                        name,
                        "comparison",
                        vec![
                            NamedDataType::new("lhs", operand_ty.clone()),
                            NamedDataType::new("rhs", operand_ty),
                        ],
                        vec![NamedDataType::new("out", self.i1_ty())],
                        vec![],
                        vec![],
                        true,
                        Box::new(ComparisonCodegen { kind, op }),
                    )
                } else {
                    Err(GraphyError::UnknownNodeType {
                        module: LANG_MODULE_NAME.to_string(),
                        name: name.to_string(),
                    })
                }
            }
        }
    }

    fn type_from_name(&self, name: &str) -> Option<DataType> {
        match name {
            "i32" => Some(self.i32_ty()),
            "i1" => Some(self.i1_ty()),
            "float" => Some(self.float_ty()),
            "i8*" => Some(self.ptr_ty()),
            _ => None,
        }
    }

    fn node_type_names(&self) -> Vec<String> {
        vec![
            "if".into(),
            "entry".into(),
            "exit".into(),
            "const-int".into(),
            "const-float".into(),
            "const-bool".into(),
            "strliteral".into(),
            "inttofloat".into(),
            "floattoint".into(),
        ]
    }

    fn type_names(&self) -> Vec<String> {
        vec!["i32".into(), "i1".into(), "float".into(), "i8*".into()]
    }

    fn generate_module<'ctx>(
        &self,
        _llvm: &'ctx inkwell::context::Context,
        _backend_module: &inkwell::module::Module<'ctx>,
    ) -> Result<()> {
        // LangModule has no artifacts of its own to emit: its nodes are
        // inlined directly into the consuming function by FunctionCompiler.
        Ok(())
    }

    fn dependencies(&self) -> &HashSet<String> {
        &self.dependencies
    }

    fn add_dependency(&mut self, _name: String) {
        // lang has no dependencies by construction; calls are ignored
        // rather than panicking so generic Module-trait callers don't need
        // a special case.
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
