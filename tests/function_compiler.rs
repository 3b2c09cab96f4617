//! End-to-end `FunctionCompiler` scenarios: a `GraphFunction` built directly
//! in memory (no JSON loader involved), compiled to LLVM IR, and executed
//! through an `inkwell` JIT to check the emitted calling convention
//! (`i32 f(i32 execIn, data-inputs..., data-output pointers...)`) actually
//! does what the graph says.

use inkwell::execution_engine::JitFunction;
use inkwell::OptimizationLevel;
use serde_json::json;

use chirust_core::compiler::FunctionCompiler;
use chirust_core::core::{Module, NamedDataType, Position};
use chirust_core::error::GraphyError;
use chirust_core::graph_module::{mangled_function_name, GraphFunction};
use chirust_core::lang::LangModule;

/// `entry -> exit`, wiring the single data input straight through with no
/// processing node in between.
#[test]
fn identity_function_returns_its_input() {
    let llvm = inkwell::context::Context::create();
    let lang = LangModule::new(&llvm);
    let i32_ty = lang.type_from_name("i32").unwrap();

    let entry_nt = lang
        .node_type_from_name("entry", &json!({"data": [{"x": "lang:i32"}], "exec": ["in"]}))
        .unwrap();
    let exit_nt = lang
        .node_type_from_name("exit", &json!({"data": [{"x": "lang:i32"}], "exec": ["out"]}))
        .unwrap();

    let mut func = GraphFunction::new("identity");
    func.data_inputs = vec![NamedDataType::new("x", i32_ty.clone())];
    func.data_outputs = vec![NamedDataType::new("x", i32_ty)];
    func.exec_inputs = vec!["in".to_string()];
    func.exec_outputs = vec!["out".to_string()];

    func.insert_node("entry", "lang:entry", Position::new(0.0, 0.0), 0, 0, 1, json!(null)).unwrap();
    func.set_node_type("entry", entry_nt);
    func.insert_node("exit", "lang:exit", Position::new(100.0, 0.0), 1, 1, 0, json!(null)).unwrap();
    func.set_node_type("exit", exit_nt);

    func.connect_data("entry", 0, "exit", 0).unwrap();
    func.connect_exec("entry", 0, "exit", 0).unwrap();

    let backend_module = llvm.create_module("identity_test");
    FunctionCompiler::new(&llvm, &backend_module, "identitymod", &func).compile().unwrap();

    let ee = backend_module.create_jit_execution_engine(OptimizationLevel::None).unwrap();
    let name = mangled_function_name("identitymod", "identity");
    unsafe {
        let f: JitFunction<unsafe extern "C" fn(i32, i32, *mut i32) -> i32> = ee.get_function(&name).unwrap();
        let mut out: i32 = -1;
        let selected = f.call(0, 42, &mut out as *mut i32);
        assert_eq!(selected, 0);
        assert_eq!(out, 42);
    }
}

/// `entry -> const-int(7) -> exit`, exercising pure-node inlining
/// (Stage D) with no data inputs at all.
#[test]
fn constant_function_ignores_entry_and_returns_literal() {
    let llvm = inkwell::context::Context::create();
    let lang = LangModule::new(&llvm);
    let i32_ty = lang.type_from_name("i32").unwrap();

    let entry_nt = lang.node_type_from_name("entry", &json!({"data": [], "exec": ["in"]})).unwrap();
    let exit_nt = lang
        .node_type_from_name("exit", &json!({"data": [{"v": "lang:i32"}], "exec": ["out"]}))
        .unwrap();
    let const_nt = lang.node_type_from_name("const-int", &json!(7)).unwrap();

    let mut func = GraphFunction::new("constant");
    func.data_outputs = vec![NamedDataType::new("v", i32_ty)];
    func.exec_inputs = vec!["in".to_string()];
    func.exec_outputs = vec!["out".to_string()];

    func.insert_node("entry", "lang:entry", Position::new(0.0, 0.0), 0, 0, 1, json!(null)).unwrap();
    func.set_node_type("entry", entry_nt);
    func.insert_node("seven", "lang:const-int", Position::new(50.0, 50.0), 0, 0, 0, json!(7)).unwrap();
    func.set_node_type("seven", const_nt);
    func.insert_node("exit", "lang:exit", Position::new(100.0, 0.0), 1, 1, 0, json!(null)).unwrap();
    func.set_node_type("exit", exit_nt);

    func.connect_data("seven", 0, "exit", 0).unwrap();
    func.connect_exec("entry", 0, "exit", 0).unwrap();

    let backend_module = llvm.create_module("constant_test");
    FunctionCompiler::new(&llvm, &backend_module, "constmod", &func).compile().unwrap();

    let ee = backend_module.create_jit_execution_engine(OptimizationLevel::None).unwrap();
    let name = mangled_function_name("constmod", "constant");
    unsafe {
        let f: JitFunction<unsafe extern "C" fn(i32, *mut i32) -> i32> = ee.get_function(&name).unwrap();
        let mut out: i32 = -1;
        let selected = f.call(0, &mut out as *mut i32);
        assert_eq!(selected, 0);
        assert_eq!(out, 7);
    }
}

/// Two pure conversion nodes feeding each other's input: `a`'s only data
/// input is `b`'s output and vice versa. `compile()` must reject this
/// before emitting anything, rather than looping or miscompiling.
#[test]
fn cyclic_pure_dependency_is_rejected() {
    let llvm = inkwell::context::Context::create();
    let lang = LangModule::new(&llvm);
    let float_ty = lang.type_from_name("float").unwrap();

    let entry_nt = lang.node_type_from_name("entry", &json!({"data": [], "exec": ["in"]})).unwrap();
    let exit_nt = lang
        .node_type_from_name("exit", &json!({"data": [{"v": "lang:float"}], "exec": ["out"]}))
        .unwrap();
    let to_float = lang.node_type_from_name("inttofloat", &json!(null)).unwrap();
    let to_int = lang.node_type_from_name("floattoint", &json!(null)).unwrap();

    let mut func = GraphFunction::new("cyclic");
    func.data_outputs = vec![NamedDataType::new("v", float_ty)];
    func.exec_inputs = vec!["in".to_string()];
    func.exec_outputs = vec!["out".to_string()];

    func.insert_node("entry", "lang:entry", Position::new(0.0, 0.0), 0, 0, 1, json!(null)).unwrap();
    func.set_node_type("entry", entry_nt);
    func.insert_node("a", "lang:inttofloat", Position::new(50.0, 0.0), 1, 0, 0, json!(null)).unwrap();
    func.set_node_type("a", to_float);
    func.insert_node("b", "lang:floattoint", Position::new(50.0, 50.0), 1, 0, 0, json!(null)).unwrap();
    func.set_node_type("b", to_int);
    func.insert_node("exit", "lang:exit", Position::new(100.0, 0.0), 1, 1, 0, json!(null)).unwrap();
    func.set_node_type("exit", exit_nt);

    func.connect_data("b", 0, "a", 0).unwrap();
    func.connect_data("a", 0, "b", 0).unwrap();
    func.connect_data("a", 0, "exit", 0).unwrap();
    func.connect_exec("entry", 0, "exit", 0).unwrap();

    let backend_module = llvm.create_module("cyclic_test");
    let err = FunctionCompiler::new(&llvm, &backend_module, "cyclicmod", &func).compile().unwrap_err();
    assert!(matches!(err, GraphyError::CyclicPureDependency(_)));
}

/// `entry -> if(entry.x < 0)`, `True -> exitNeg(0 - entry.x)`,
/// `False -> exitPos(entry.x)` — two separate `lang:exit` instances, each
/// with their own data-input wiring, both mapping to the function's single
/// exec-output slot (`exit_node_ids()` collects every node of type
/// `lang:exit`, not just one).
#[test]
fn branch_function_computes_absolute_value() {
    let llvm = inkwell::context::Context::create();
    let lang = LangModule::new(&llvm);
    let i32_ty = lang.type_from_name("i32").unwrap();

    let entry_nt = lang.node_type_from_name("entry", &json!({"data": [{"x": "lang:i32"}], "exec": ["in"]})).unwrap();
    let if_nt = lang.node_type_from_name("if", &json!(null)).unwrap();
    let zero_nt = lang.node_type_from_name("const-int", &json!(0)).unwrap();
    let lt_nt = lang.node_type_from_name("i32<i32", &json!(null)).unwrap();
    let sub_nt = lang.node_type_from_name("i32-i32", &json!(null)).unwrap();
    let exit_neg_nt = lang.node_type_from_name("exit", &json!({"data": [{"v": "lang:i32"}], "exec": ["out"]})).unwrap();
    let exit_pos_nt = lang.node_type_from_name("exit", &json!({"data": [{"v": "lang:i32"}], "exec": ["out"]})).unwrap();

    let mut func = GraphFunction::new("abs");
    func.data_inputs = vec![NamedDataType::new("x", i32_ty.clone())];
    func.data_outputs = vec![NamedDataType::new("v", i32_ty)];
    func.exec_inputs = vec!["in".to_string()];
    func.exec_outputs = vec!["out".to_string()];

    func.insert_node("entry", "lang:entry", Position::new(0.0, 0.0), 0, 0, 1, json!(null)).unwrap();
    func.set_node_type("entry", entry_nt);
    func.insert_node("zero", "lang:const-int", Position::new(0.0, 100.0), 0, 0, 0, json!(0)).unwrap();
    func.set_node_type("zero", zero_nt);
    func.insert_node("cmp", "lang:i32<i32", Position::new(50.0, 50.0), 2, 0, 0, json!(null)).unwrap();
    func.set_node_type("cmp", lt_nt);
    func.insert_node("sub", "lang:i32-i32", Position::new(50.0, 150.0), 2, 0, 0, json!(null)).unwrap();
    func.set_node_type("sub", sub_nt);
    func.insert_node("if", "lang:if", Position::new(100.0, 0.0), 1, 1, 2, json!(null)).unwrap();
    func.set_node_type("if", if_nt);
    func.insert_node("exitNeg", "lang:exit", Position::new(200.0, 0.0), 1, 1, 0, json!(null)).unwrap();
    func.set_node_type("exitNeg", exit_neg_nt);
    func.insert_node("exitPos", "lang:exit", Position::new(200.0, 100.0), 1, 1, 0, json!(null)).unwrap();
    func.set_node_type("exitPos", exit_pos_nt);

    func.connect_data("entry", 0, "cmp", 0).unwrap();
    func.connect_data("zero", 0, "cmp", 1).unwrap();
    func.connect_data("zero", 0, "sub", 0).unwrap();
    func.connect_data("entry", 0, "sub", 1).unwrap();
    func.connect_data("cmp", 0, "if", 0).unwrap();
    func.connect_data("sub", 0, "exitNeg", 0).unwrap();
    func.connect_data("entry", 0, "exitPos", 0).unwrap();

    func.connect_exec("entry", 0, "if", 0).unwrap();
    func.connect_exec("if", 0, "exitNeg", 0).unwrap();
    func.connect_exec("if", 1, "exitPos", 0).unwrap();

    let backend_module = llvm.create_module("abs_test");
    FunctionCompiler::new(&llvm, &backend_module, "absmod", &func).compile().unwrap();

    let ee = backend_module.create_jit_execution_engine(OptimizationLevel::None).unwrap();
    let name = mangled_function_name("absmod", "abs");
    unsafe {
        let f: JitFunction<unsafe extern "C" fn(i32, i32, *mut i32) -> i32> = ee.get_function(&name).unwrap();

        let mut out: i32 = 0;
        let selected = f.call(0, -5, &mut out as *mut i32);
        assert_eq!(selected, 0);
        assert_eq!(out, 5);

        let mut out: i32 = 0;
        let selected = f.call(0, 3, &mut out as *mut i32);
        assert_eq!(selected, 0);
        assert_eq!(out, 3);
    }
}

/// `entry -> exit` with `entry.x: i32` connected straight to `exit.v: float`
/// — no converter node in the graph at all. `connectData` accepts the
/// mismatched edge because `i32 -> float` is a registered conversion, and
/// `FunctionCompiler`'s Materializer inserts the actual `inttofloat`
/// instruction inline when it resolves the edge at compile time.
#[test]
fn conversion_function_widens_int_to_float() {
    let llvm = inkwell::context::Context::create();
    let lang = LangModule::new(&llvm);
    let i32_ty = lang.type_from_name("i32").unwrap();
    let float_ty = lang.type_from_name("float").unwrap();

    let entry_nt = lang.node_type_from_name("entry", &json!({"data": [{"x": "lang:i32"}], "exec": ["in"]})).unwrap();
    let exit_nt = lang
        .node_type_from_name("exit", &json!({"data": [{"v": "lang:float"}], "exec": ["out"]}))
        .unwrap();

    let mut func = GraphFunction::new("toF");
    func.data_inputs = vec![NamedDataType::new("x", i32_ty)];
    func.data_outputs = vec![NamedDataType::new("v", float_ty)];
    func.exec_inputs = vec!["in".to_string()];
    func.exec_outputs = vec!["out".to_string()];

    func.insert_node("entry", "lang:entry", Position::new(0.0, 0.0), 0, 0, 1, json!(null)).unwrap();
    func.set_node_type("entry", entry_nt);
    func.insert_node("exit", "lang:exit", Position::new(100.0, 0.0), 1, 1, 0, json!(null)).unwrap();
    func.set_node_type("exit", exit_nt);

    func.connect_data("entry", 0, "exit", 0).unwrap();
    func.connect_exec("entry", 0, "exit", 0).unwrap();

    let backend_module = llvm.create_module("conversion_test");
    FunctionCompiler::new(&llvm, &backend_module, "convmod", &func).compile().unwrap();

    let ee = backend_module.create_jit_execution_engine(OptimizationLevel::None).unwrap();
    let name = mangled_function_name("convmod", "toF");
    unsafe {
        let f: JitFunction<unsafe extern "C" fn(i32, i32, *mut f64) -> i32> = ee.get_function(&name).unwrap();
        let mut out: f64 = -1.0;
        let selected = f.call(0, 3, &mut out as *mut f64);
        assert_eq!(selected, 0);
        assert_eq!(out, 3.0);
    }
}

/// `connectData` rejects an edge between two types with no registered
/// conversion (`lang:i8*` has no numeric conversion to `lang:i32`), without
/// ever reaching `FunctionCompiler`.
#[test]
fn connect_data_rejects_an_edge_with_no_conversion() {
    let llvm = inkwell::context::Context::create();
    let lang = LangModule::new(&llvm);
    let i32_ty = lang.type_from_name("i32").unwrap();

    let str_nt = lang.node_type_from_name("strliteral", &json!("hi")).unwrap();
    let exit_nt = lang
        .node_type_from_name("exit", &json!({"data": [{"v": "lang:i32"}], "exec": ["out"]}))
        .unwrap();

    let mut func = GraphFunction::new("bad");
    func.data_outputs = vec![NamedDataType::new("v", i32_ty)];
    func.exec_outputs = vec!["out".to_string()];

    func.insert_node("lit", "lang:strliteral", Position::new(0.0, 0.0), 0, 0, 0, json!("hi")).unwrap();
    func.set_node_type("lit", str_nt);
    func.insert_node("exit", "lang:exit", Position::new(100.0, 0.0), 1, 1, 0, json!(null)).unwrap();
    func.set_node_type("exit", exit_nt);

    let err = func.connect_data("lit", 0, "exit", 0).unwrap_err();
    assert!(matches!(err, GraphyError::TypeMismatch { .. }));
}

/// A function with no entry node at all is rejected before any IR is built.
#[test]
fn missing_entry_node_is_rejected() {
    let llvm = inkwell::context::Context::create();
    let lang = LangModule::new(&llvm);
    let exit_nt = lang.node_type_from_name("exit", &json!({"data": [], "exec": ["out"]})).unwrap();

    let mut func = GraphFunction::new("no_entry");
    func.exec_outputs = vec!["out".to_string()];
    func.insert_node("exit", "lang:exit", Position::new(0.0, 0.0), 0, 1, 0, json!(null)).unwrap();
    func.set_node_type("exit", exit_nt);

    let backend_module = llvm.create_module("no_entry_test");
    let err = FunctionCompiler::new(&llvm, &backend_module, "m", &func).compile().unwrap_err();
    assert!(matches!(err, GraphyError::InvalidSignature(_)));
}
