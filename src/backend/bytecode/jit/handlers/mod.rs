//! Opcode handlers for JIT compilation
//!
//! This module contains handlers for each category of bytecode opcodes.
//! Each handler module compiles specific opcodes to Cranelift IR against a
//! shared [`CodegenContext`](super::codegen::CodegenContext).

mod arithmetic;
mod comparison;
mod control_flow;
mod math;
mod memory;
mod values;

pub use arithmetic::{compile_conversion_op, compile_int_arithmetic_op, compile_real_arithmetic_op};
pub use comparison::{compile_comparison_op, compile_min_max_op};
pub use control_flow::{
    compile_cond_branch, compile_if, compile_loop, compile_return, compile_select, BlockHead,
    BlockTranslator,
};
pub use math::{compile_abs, compile_binary_math, compile_unary_math, MathHandlerContext};
pub use memory::{
    compile_block_shift, compile_heap_load, compile_heap_store, compile_load_input,
    compile_store_output, HeapIndex,
};
pub use values::{compile_int_literal, compile_real_literal};
