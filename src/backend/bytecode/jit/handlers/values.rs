//! Literal handlers for JIT compilation
//!
//! Handles: RealValue, Int32Value

use crate::backend::bytecode::jit::codegen::CodegenContext;
use crate::backend::bytecode::jit::types::JitResult;

pub fn compile_int_literal(codegen: &mut CodegenContext<'_, '_>, n: i32) -> JitResult<()> {
    let val = codegen.const_int(n);
    codegen.push(val)
}

pub fn compile_real_literal(codegen: &mut CodegenContext<'_, '_>, x: f64) -> JitResult<()> {
    let val = codegen.const_real(x);
    codegen.push(val)
}
