//! Extended math operation handlers for JIT compilation
//!
//! Handles: Abs, Unary(..), Binary(..) and RemReal, all as calls into the
//! math runtime

use cranelift::prelude::*;
use cranelift_jit::JITModule;

use crate::backend::bytecode::jit::codegen::CodegenContext;
use crate::backend::bytecode::jit::compiler::init::{uniform_signature, MathImports, INT_ABS_SYMBOL};
use crate::backend::bytecode::jit::types::JitResult;
use crate::backend::bytecode::opcodes::{BinaryMath, UnaryMath};

/// Context for math handlers that need runtime function access
pub struct MathHandlerContext<'m> {
    pub module: &'m mut JITModule,
    pub imports: &'m mut MathImports,
    /// Appended to real-valued symbol names
    pub suffix: &'static str,
}

impl MathHandlerContext<'_> {
    fn call(
        &mut self,
        codegen: &mut CodegenContext<'_, '_>,
        name: &str,
        ty: Type,
        args: &[Value],
    ) -> JitResult<Value> {
        let sig = uniform_signature(self.module, ty, args.len());
        let func_ref = self.imports.import(self.module, codegen.builder.func, name, &sig)?;
        let call = codegen.builder.ins().call(func_ref, args);
        Ok(codegen.builder.inst_results(call)[0])
    }

    fn real_symbol(&self, base: &str) -> String {
        format!("{}{}", base, self.suffix)
    }
}

/// Integer absolute value
pub fn compile_abs(
    ctx: &mut MathHandlerContext<'_>,
    codegen: &mut CodegenContext<'_, '_>,
) -> JitResult<()> {
    let v = codegen.pop_int()?;
    let result = ctx.call(codegen, INT_ABS_SYMBOL, types::I32, &[v])?;
    codegen.push(result)
}

pub fn compile_unary_math(
    ctx: &mut MathHandlerContext<'_>,
    codegen: &mut CodegenContext<'_, '_>,
    op: UnaryMath,
) -> JitResult<()> {
    let x = codegen.pop_real()?;
    let name = ctx.real_symbol(op.c_name());
    let ty = codegen.real_type();
    let result = ctx.call(codegen, &name, ty, &[x])?;
    codegen.push(result)
}

/// Arguments are `(pop(), pop())`
pub fn compile_binary_math(
    ctx: &mut MathHandlerContext<'_>,
    codegen: &mut CodegenContext<'_, '_>,
    op: BinaryMath,
) -> JitResult<()> {
    let a = codegen.pop_real()?;
    let b = codegen.pop_real()?;
    let name = ctx.real_symbol(op.c_name());
    let ty = codegen.real_type();
    let result = ctx.call(codegen, &name, ty, &[a, b])?;
    codegen.push(result)
}
