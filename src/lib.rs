//! # Chirust — a visual dataflow programming language core
//!
//! A module/type/node model, a graph data structure with connection
//! invariants, an on-disk JSON dialect, and an LLVM (inkwell) code
//! generator compiling graph functions into native functions under a fixed
//! calling convention: `i32 f(i32 execIn, data-inputs..., data-output
//! pointers...)`, the return value selecting which exec-output fired.
//!
//! ## Layout
//!
//! - [`core`] — DataType/NodeType/NodeInstance/Graph/Module: the pure data
//!   model, independent of any one module kind.
//! - [`lang`] — the always-present builtin module (primitive types, `if`,
//!   `entry`/`exit`, arithmetic/comparison, literals, conversions).
//! - [`graph_module`] — user-defined functions-as-graphs and structs, JSON
//!   (de)serialization, and graph-function-as-NodeType re-export.
//! - [`backend`] — small helpers over inkwell (constants, verification,
//!   compiled-module caching).
//! - [`context`] — the module registry and compile orchestrator.
//! - [`compiler`] — `FunctionCompiler`: graph function to LLVM IR function.

pub mod backend;
pub mod compiler;
pub mod context;
pub mod core;
pub mod error;
pub mod graph_module;
pub mod lang;
pub mod logging;
pub mod parallel;

pub use context::{CompileOptions, Context};
pub use error::{GraphyError, LoadResult, Result};
