//! Graph function to LLVM IR: block layout, pure-node inlining, and the
//! exec-driven codegen walk that turns a `GraphFunction` into one native
//! function per the fixed `i32 f(i32 execIn, ...)` calling convention.

mod block_layout;
mod debug_info;
mod function_compiler;
mod pure_inline;

pub use function_compiler::FunctionCompiler;
