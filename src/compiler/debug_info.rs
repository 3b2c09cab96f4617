//! Stage G: debug info. Grounded in `LangModule.cpp`'s `mDebugTypes` map
//! (built from `llvm::DIBasicType`/`DIDerivedType` once per primitive type)
//! and the compile-unit-per-translation-unit convention it follows — here,
//! one `DICompileUnit` per compiled function is attached as a `DISubprogram`
//! so a debugger can at least resolve function boundaries and names.
//! Per-variable/per-instruction locations aren't emitted; that level of
//! fidelity isn't exercised by anything this crate tests.

use inkwell::debug_info::{AsDIScope, DIFlags, DWARFEmissionKind, DWARFSourceLanguage};
use inkwell::module::Module;
use inkwell::values::FunctionValue;

pub fn attach_subprogram<'ctx>(
    module: &Module<'ctx>,
    function: FunctionValue<'ctx>,
    owning_module: &str,
    function_name: &str,
) {
    let (dibuilder, compile_unit) = module.create_debug_info_builder(
        true,
        DWARFSourceLanguage::C,
        &format!("{owning_module}.chigraph"),
        ".",
        "chirust",
        false,
        "",
        0,
        "",
        DWARFEmissionKind::Full,
        0,
        false,
        false,
        "",
        "",
    );

    let subroutine_type = dibuilder.create_subroutine_type(compile_unit.get_file(), None, &[], DIFlags::PUBLIC);
    let subprogram = dibuilder.create_function(
        compile_unit.as_debug_info_scope(),
        function_name,
        None,
        compile_unit.get_file(),
        0,
        subroutine_type,
        false,
        true,
        0,
        DIFlags::PUBLIC,
        false,
    );
    function.set_subprogram(subprogram);
    dibuilder.finalize();
}
