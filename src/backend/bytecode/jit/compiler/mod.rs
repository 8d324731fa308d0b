//! Bytecode-to-Cranelift JIT Compiler
//!
//! This module translates a bytecode block tree into native code using
//! Cranelift. The compilation process:
//!
//! 1. Scan the block tree for the frame extent it needs
//! 2. Build Cranelift IR by recursive descent over nested blocks
//! 3. Verify the function (optional) and generate native code
//! 4. Hand the finalized module over to a [`CompiledBlock`]
//!
//! Every compiled block gets its own `JITModule`, so dropping a
//! [`CompiledBlock`] releases exactly the code memory it owns.
//!
//! The generated function has the signature
//! `fn(int_heap: *mut i32, real_heap: *mut u8, inputs: *const *const u8, outputs: *const *mut u8, bounds: *mut i64) -> i32`.

pub mod init;
mod analysis;

#[cfg(test)]
mod compiler_tests;

use std::marker::PhantomData;

use cranelift::codegen;
use cranelift::codegen::isa::TargetIsa;
use cranelift::prelude::*;
use cranelift_jit::{JITBuilder, JITModule};
use cranelift_module::{FuncId, Linkage, Module};
use tracing::{debug, trace};

use super::codegen::{real_type, CodegenContext, FrameParams};
use super::engine::{host_isa, CompiledBlock, OptLevel};
use super::handlers::HeapIndex::{Dynamic, Static};
use super::handlers::{self, BlockHead, BlockTranslator, MathHandlerContext};
use super::types::{JitError, JitResult, EXECUTE_PARAMS};
use crate::backend::bytecode::block::{Block as CodeBlock, Flow};
use crate::backend::bytecode::heap::HeapKind;
use crate::backend::bytecode::opcodes::{BinaryMath, Instruction};
use crate::backend::bytecode::real::Real;

pub use analysis::FrameLayout;
use init::MathImports;

/// Symbol name of every compiled entry point
const ENTRY_SYMBOL: &str = "dsp_execute";

/// Knobs for a single compilation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    pub opt_level: OptLevel,
    /// Run the Cranelift verifier before code generation
    pub verify: bool,
    /// Keep the textual IR on the compiled block
    pub keep_ir: bool,
    /// Operand stack limit, matching the interpreter's
    pub max_stack_depth: usize,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            opt_level: OptLevel::Speed,
            verify: true,
            keep_ir: false,
            max_stack_depth: 512,
        }
    }
}

/// JIT compiler for bytecode blocks at sample precision `R`
///
/// The compiler itself holds no Cranelift state; each call to
/// [`compile`](Self::compile) builds a fresh module.
#[derive(Debug, Clone, Default)]
pub struct BlockCompiler<R> {
    options: CompileOptions,
    _real: PhantomData<fn() -> R>,
}

impl<R: Real> BlockCompiler<R> {
    pub fn new() -> Self {
        Self::with_options(CompileOptions::default())
    }

    pub fn with_options(options: CompileOptions) -> Self {
        Self {
            options,
            _real: PhantomData,
        }
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Compile `block` and everything nested in it to native code
    pub fn compile(&self, block: &CodeBlock) -> JitResult<CompiledBlock<R>> {
        let isa = host_isa(self.options.opt_level)?;

        let mut builder =
            JITBuilder::with_isa(isa.clone(), cranelift_module::default_libcall_names());
        init::register_math_symbols::<R>(&mut builder);
        let mut module = JITModule::new(builder);
        let layout = FrameLayout::of(block);

        match self.define(&mut module, &*isa, block, &layout) {
            Ok((func_id, ir)) => {
                let entry = module.get_finalized_function(func_id);
                debug!(
                    target: "dspjit::jit::compiler",
                    block = block.name(),
                    instructions = block.deep_len(),
                    "Compiled block"
                );
                // SAFETY: `entry` was generated from a signature with
                // EXECUTE_PARAMS pointer parameters and an i32 status, and
                // its bounds table follows `layout`.
                Ok(unsafe { CompiledBlock::from_parts(block.name(), module, entry, ir, layout) })
            }
            Err(e) => {
                // SAFETY: nothing from this module has been handed out.
                unsafe { module.free_memory() };
                Err(e)
            }
        }
    }

    /// Declare, build, verify and finalize the entry function
    fn define(
        &self,
        module: &mut JITModule,
        isa: &dyn TargetIsa,
        block: &CodeBlock,
        layout: &FrameLayout,
    ) -> JitResult<(FuncId, Option<String>)> {
        let pointer_type = module.target_config().pointer_type();

        let mut sig = module.make_signature();
        for _ in 0..EXECUTE_PARAMS {
            sig.params.push(AbiParam::new(pointer_type));
        }
        sig.returns.push(AbiParam::new(types::I32));

        let func_id = module
            .declare_function(ENTRY_SYMBOL, Linkage::Local, &sig)
            .map_err(|e| JitError::CompilationError(format!("Failed to declare function: {}", e)))?;

        let mut ctx = module.make_context();
        ctx.func.signature = sig;

        self.build_function(module, &mut ctx.func, block, layout, pointer_type)?;

        trace!(
            target: "dspjit::jit::compiler::ir",
            block = block.name(),
            ir = %ctx.func.display(),
            "Generated IR"
        );
        let ir = self.options.keep_ir.then(|| ctx.func.display().to_string());

        if self.options.verify {
            codegen::verify_function(&ctx.func, isa)
                .map_err(|errors| JitError::Verification(errors.to_string()))?;
        }

        module
            .define_function(func_id, &mut ctx)
            .map_err(|e| JitError::CompilationError(format!("Failed to define function: {}", e)))?;
        module.clear_context(&mut ctx);

        module.finalize_definitions().map_err(|e| {
            JitError::CompilationError(format!("Failed to finalize definitions: {}", e))
        })?;

        Ok((func_id, ir))
    }

    /// Build the Cranelift IR for a block tree
    fn build_function(
        &self,
        module: &mut JITModule,
        func: &mut codegen::ir::Function,
        block: &CodeBlock,
        layout: &FrameLayout,
        pointer_type: Type,
    ) -> JitResult<()> {
        let mut func_ctx = FunctionBuilderContext::new();
        let mut builder = FunctionBuilder::new(func, &mut func_ctx);

        let entry_block = builder.create_block();
        builder.append_block_params_for_function_params(entry_block);
        builder.switch_to_block(entry_block);

        let params = builder.block_params(entry_block).to_vec();
        let frame = FrameParams {
            int_heap: params[0],
            real_heap: params[1],
            inputs: params[2],
            outputs: params[3],
            bounds: params[4],
            input_ports: layout.inputs,
        };

        // Use a scoping block so codegen's borrow of builder ends before finalize
        {
            let mut codegen = CodegenContext::new(
                &mut builder,
                frame,
                pointer_type,
                real_type::<R>(),
                self.options.max_stack_depth,
            );
            let mut translator = Translator::<R> {
                module,
                imports: MathImports::new(),
                _real: PhantomData,
            };

            translator.translate_block(&mut codegen, block)?;

            // Ensure function ends with return
            if !codegen.is_terminated() {
                codegen.return_ok();
            }

            trace!(
                target: "dspjit::jit::compiler",
                block = block.name(),
                math_imports = translator.imports.len(),
                left_on_stack = codegen.stack_depth(),
                "Translated block"
            );
        }

        builder.seal_all_blocks();
        builder.finalize();
        Ok(())
    }
}

/// Walks the block tree and dispatches each instruction to its handler
struct Translator<'m, R> {
    module: &'m mut JITModule,
    imports: MathImports,
    _real: PhantomData<fn() -> R>,
}

impl<R: Real> Translator<'_, R> {
    fn math(&mut self) -> MathHandlerContext<'_> {
        MathHandlerContext {
            module: &mut *self.module,
            imports: &mut self.imports,
            suffix: R::MATH_SUFFIX,
        }
    }

    /// Translate a single instruction; `Some(flow)` stops the enclosing block
    fn translate_instruction(
        &mut self,
        codegen: &mut CodegenContext<'_, '_>,
        ins: &Instruction,
        head: Option<&BlockHead>,
    ) -> JitResult<Option<Flow>> {
        use Instruction::*;

        match ins {
            RealValue(x) => handlers::compile_real_literal(codegen, *x)?,
            Int32Value(n) => handlers::compile_int_literal(codegen, *n)?,

            LoadReal(o) => handlers::compile_heap_load(codegen, HeapKind::Real, Static(*o))?,
            LoadInt(o) => handlers::compile_heap_load(codegen, HeapKind::Int, Static(*o))?,
            StoreReal(o) => handlers::compile_heap_store(codegen, HeapKind::Real, Static(*o))?,
            StoreInt(o) => handlers::compile_heap_store(codegen, HeapKind::Int, Static(*o))?,
            LoadIndexedReal(o) => {
                handlers::compile_heap_load(codegen, HeapKind::Real, Dynamic(*o))?
            }
            LoadIndexedInt(o) => handlers::compile_heap_load(codegen, HeapKind::Int, Dynamic(*o))?,
            StoreIndexedReal(o) => {
                handlers::compile_heap_store(codegen, HeapKind::Real, Dynamic(*o))?
            }
            StoreIndexedInt(o) => {
                handlers::compile_heap_store(codegen, HeapKind::Int, Dynamic(*o))?
            }
            BlockShiftReal { from, to } => {
                handlers::compile_block_shift(codegen, HeapKind::Real, *from, *to)?
            }
            BlockShiftInt { from, to } => {
                handlers::compile_block_shift(codegen, HeapKind::Int, *from, *to)?
            }
            LoadInput(port) => handlers::compile_load_input(codegen, *port)?,
            StoreOutput(port) => handlers::compile_store_output(codegen, *port)?,

            CastReal | CastInt | BitcastInt | BitcastReal => {
                handlers::compile_conversion_op(codegen, ins)?
            }

            AddReal | SubReal | MulReal | DivReal => {
                handlers::compile_real_arithmetic_op(codegen, ins)?
            }
            AddInt | SubInt | MulInt | DivInt | RemInt | LshInt | RshInt | AndInt | OrInt
            | XorInt => handlers::compile_int_arithmetic_op(codegen, ins)?,
            RemReal => {
                handlers::compile_binary_math(&mut self.math(), codegen, BinaryMath::Remainder)?
            }

            GtReal | GtInt | LtReal | LtInt | GeReal | GeInt | LeReal | LeInt | EqReal | EqInt
            | NeReal | NeInt => handlers::compile_comparison_op(codegen, ins)?,
            MinInt | MaxInt | MinReal | MaxReal => handlers::compile_min_max_op(codegen, ins)?,

            Abs => handlers::compile_abs(&mut self.math(), codegen)?,
            Unary(op) => handlers::compile_unary_math(&mut self.math(), codegen, *op)?,
            Binary(op) => handlers::compile_binary_math(&mut self.math(), codegen, *op)?,

            Return => return Ok(Some(handlers::compile_return(codegen))),
            If { then_block, else_block } => {
                return handlers::compile_if(self, codegen, then_block, else_block)
            }
            SelectReal { first, second } => {
                let ty = codegen.real_type();
                return handlers::compile_select(self, codegen, first, second, ty);
            }
            SelectInt { first, second } => {
                return handlers::compile_select(self, codegen, first, second, types::I32)
            }
            Loop { init, body } => return handlers::compile_loop(self, codegen, init, body),
            CondBranch => handlers::compile_cond_branch(codegen, head)?,
        }
        Ok(None)
    }
}

impl<R: Real> BlockTranslator for Translator<'_, R> {
    fn translate_block(
        &mut self,
        codegen: &mut CodegenContext<'_, '_>,
        block: &CodeBlock,
    ) -> JitResult<Flow> {
        // A block that can restart itself gets its own head, parameterized
        // by the stack it was entered with
        let head = block.has_cond_branch().then(|| {
            let ir_block = codegen.open_block_with_stack();
            BlockHead {
                block: ir_block,
                types: codegen.stack_types(),
            }
        });

        for ins in block.instructions() {
            if let Some(flow) = self.translate_instruction(codegen, ins, head.as_ref())? {
                return Ok(flow);
            }
        }
        Ok(Flow::FallThrough)
    }
}
