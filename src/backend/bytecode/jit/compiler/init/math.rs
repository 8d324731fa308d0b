//! Math runtime initialization for JIT compiler
//!
//! Handles symbol registration with the JIT builder and the per-compilation
//! memo of imported math functions.

use std::collections::HashMap;

use cranelift::codegen::ir::{FuncRef, Function};
use cranelift::prelude::*;
use cranelift_jit::{JITBuilder, JITModule};
use cranelift_module::{FuncId, Linkage, Module};

use crate::backend::bytecode::jit::runtime;
use crate::backend::bytecode::jit::types::{JitError, JitResult};
use crate::backend::bytecode::opcodes::{BinaryMath, UnaryMath};
use crate::backend::bytecode::real::Real;

/// Symbol name of the integer absolute value; never suffixed
pub const INT_ABS_SYMBOL: &str = "abs";

/// Register every math runtime symbol at precision `R`
pub fn register_math_symbols<R: Real>(builder: &mut JITBuilder) {
    for op in UnaryMath::ALL {
        builder.symbol(R::math_symbol(op.c_name()), R::unary_fn(op) as *const u8);
    }
    for op in BinaryMath::ALL {
        builder.symbol(R::math_symbol(op.c_name()), R::binary_fn(op) as *const u8);
    }
    builder.symbol(INT_ABS_SYMBOL, runtime::abs as *const u8);
}

/// Math functions imported into the module being built
///
/// Each symbol is declared on first use and reused afterwards. The memo
/// belongs to one compilation and is dropped with it.
#[derive(Default)]
pub struct MathImports {
    declared: HashMap<String, (FuncId, Signature)>,
    refs: HashMap<FuncId, FuncRef>,
}

impl MathImports {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct symbols declared so far
    pub fn len(&self) -> usize {
        self.declared.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declared.is_empty()
    }

    /// Reference to `name` usable from `func`, declaring it if needed
    pub fn import(
        &mut self,
        module: &mut JITModule,
        func: &mut Function,
        name: &str,
        sig: &Signature,
    ) -> JitResult<FuncRef> {
        let func_id = match self.declared.get(name) {
            Some((id, declared)) if declared == sig => *id,
            Some(_) => return Err(JitError::SymbolSignatureMismatch(name.to_string())),
            None => {
                let id = module
                    .declare_function(name, Linkage::Import, sig)
                    .map_err(|e| {
                        JitError::CompilationError(format!("Failed to declare {}: {}", name, e))
                    })?;
                self.declared.insert(name.to_string(), (id, sig.clone()));
                id
            }
        };

        Ok(*self
            .refs
            .entry(func_id)
            .or_insert_with(|| module.declare_func_in_func(func_id, func)))
    }
}

/// `fn(T, ..) -> T` with `arity` parameters
pub fn uniform_signature(module: &JITModule, ty: Type, arity: usize) -> Signature {
    let mut sig = module.make_signature();
    sig.params.extend(std::iter::repeat(AbiParam::new(ty)).take(arity));
    sig.returns.push(AbiParam::new(ty));
    sig
}
