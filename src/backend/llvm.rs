//! Small free functions over inkwell: constant builders and module
//! verification. Kept separate from `Context`/`FunctionCompiler` so both can
//! share them without a backend handle threading through every call site.

use inkwell::context::Context as LlvmContext;
use inkwell::module::Module as LlvmModule;
use inkwell::values::{FloatValue, IntValue};

use crate::error::{GraphyError, Result};

pub fn const_i32(llvm: &LlvmContext, value: i64) -> IntValue<'_> {
    llvm.i32_type().const_int(value as u64, true)
}

pub fn const_f64(llvm: &LlvmContext, value: f64) -> FloatValue<'_> {
    llvm.f64_type().const_float(value)
}

pub fn const_bool(llvm: &LlvmContext, value: bool) -> IntValue<'_> {
    llvm.bool_type().const_int(value as u64, false)
}

/// Runs LLVM's module verifier, turning its textual diagnostic into a
/// `BackendError` — the last check before a compiled module is handed to an
/// `ExecutionEngine` or written out, mirroring the original's
/// `LLVMVerifyModule` call at the end of `Context::compileModule`.
pub fn verify_module(module: &LlvmModule) -> Result<()> {
    module.verify().map_err(|msg| GraphyError::BackendError(msg.to_string()))
}
