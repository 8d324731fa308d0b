//! Cranelift IR Generation Helpers
//!
//! This module provides helper functions for generating Cranelift IR,
//! abstracting common patterns like the compile-time operand stack, operand
//! kind checks and heap addressing.

use cranelift::codegen::ir::BlockArg;
use cranelift::prelude::*;

use super::types::{FaultCode, JitError, JitResult, FAULT_INDEX, FAULT_PORT, PORT_LENS};
use crate::backend::bytecode::real::Real;

/// Cranelift type of a real sample
pub fn real_type<R: Real>() -> Type {
    if R::BITS == 32 {
        types::F32
    } else {
        types::F64
    }
}

/// Operand kind name used in type errors
pub fn kind_of(ty: Type) -> &'static str {
    if ty.is_int() {
        "int"
    } else {
        "real"
    }
}

/// Entry block parameters: the two heaps, the two port tables and the
/// bounds table
#[derive(Debug, Clone, Copy)]
pub struct FrameParams {
    pub int_heap: Value,
    pub real_heap: Value,
    pub inputs: Value,
    pub outputs: Value,
    pub bounds: Value,
    /// Input ports with a length in the bounds table; output lengths follow
    pub input_ports: usize,
}

/// Code generation context wrapping a Cranelift FunctionBuilder
///
/// Provides high-level operations for:
/// - Stack manipulation (push/pop with kind checks)
/// - Block bookkeeping (terminated flag, pending nested constructs)
/// - Heap and port addressing
pub struct CodegenContext<'a, 'b> {
    pub builder: &'a mut FunctionBuilder<'b>,

    frame: FrameParams,

    pointer_type: Type,

    real_type: Type,

    /// Simulated stack for values (we track SSA values, not memory)
    value_stack: Vec<Value>,

    max_depth: usize,

    /// Flag indicating if current block is terminated
    terminated: bool,

    /// Number of `If`/`Select`/`Loop` constructs being translated
    nested_depth: usize,
}

impl<'a, 'b> CodegenContext<'a, 'b> {
    /// Create a new codegen context
    pub fn new(
        builder: &'a mut FunctionBuilder<'b>,
        frame: FrameParams,
        pointer_type: Type,
        real_type: Type,
        max_depth: usize,
    ) -> Self {
        CodegenContext {
            builder,
            frame,
            pointer_type,
            real_type,
            value_stack: Vec::with_capacity(max_depth.min(32)),
            max_depth,
            terminated: false,
            nested_depth: 0,
        }
    }

    // =========================================================================
    // Stack Operations
    // =========================================================================

    /// Push a value onto the simulated stack
    pub fn push(&mut self, val: Value) -> JitResult<()> {
        if self.value_stack.len() >= self.max_depth {
            return Err(JitError::StackOverflow {
                limit: self.max_depth,
            });
        }
        self.value_stack.push(val);
        Ok(())
    }

    /// Pop a value from the simulated stack
    pub fn pop(&mut self) -> JitResult<Value> {
        self.value_stack.pop().ok_or(JitError::StackUnderflow)
    }

    /// Pop a value that must have type `ty`
    pub fn pop_typed(&mut self, ty: Type) -> JitResult<Value> {
        let val = self.pop()?;
        let got = self.value_type(val);
        if got != ty {
            return Err(JitError::TypeMismatch {
                expected: kind_of(ty),
                got: kind_of(got),
            });
        }
        Ok(val)
    }

    pub fn pop_int(&mut self) -> JitResult<Value> {
        self.pop_typed(types::I32)
    }

    pub fn pop_real(&mut self) -> JitResult<Value> {
        self.pop_typed(self.real_type)
    }

    /// Get current stack depth
    pub fn stack_depth(&self) -> usize {
        self.value_stack.len()
    }

    /// Copy of the current stack, bottom first
    pub fn snapshot(&self) -> Vec<Value> {
        self.value_stack.clone()
    }

    /// Replace the stack with a snapshot
    pub fn restore(&mut self, stack: Vec<Value>) {
        self.value_stack = stack;
    }

    /// Types of the stack slots, bottom first
    pub fn stack_types(&self) -> Vec<Type> {
        self.value_stack
            .iter()
            .map(|&v| self.builder.func.dfg.value_type(v))
            .collect()
    }

    /// The stack as branch arguments
    pub fn stack_args(&self) -> Vec<BlockArg> {
        self.value_stack.iter().map(|&v| BlockArg::Value(v)).collect()
    }

    pub fn value_type(&self, val: Value) -> Type {
        self.builder.func.dfg.value_type(val)
    }

    // =========================================================================
    // Block State
    // =========================================================================

    /// Check if current block is terminated
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Mark current block as terminated
    pub fn mark_terminated(&mut self) {
        self.terminated = true;
    }

    /// Make `block` the insertion point
    pub fn switch_to(&mut self, block: Block) {
        self.builder.switch_to_block(block);
        self.terminated = false;
    }

    /// Jump to a fresh block whose parameters carry the current stack
    ///
    /// The stack is replaced by the new block's parameters, so later
    /// branches back to it can pass a different set of values.
    pub fn open_block_with_stack(&mut self) -> Block {
        let block = self.builder.create_block();
        for ty in self.stack_types() {
            self.builder.append_block_param(block, ty);
        }
        let args = self.stack_args();
        self.builder.ins().jump(block, &args);
        self.switch_to(block);
        self.value_stack = self.builder.block_params(block).to_vec();
        block
    }

    pub fn enter_nested(&mut self) {
        self.nested_depth += 1;
    }

    pub fn leave_nested(&mut self) {
        self.nested_depth = self.nested_depth.saturating_sub(1);
    }

    /// Check if a `Return` would resume an enclosing construct
    pub fn in_nested(&self) -> bool {
        self.nested_depth > 0
    }

    // =========================================================================
    // Frame Access
    // =========================================================================

    pub fn frame(&self) -> FrameParams {
        self.frame
    }

    pub fn pointer_type(&self) -> Type {
        self.pointer_type
    }

    pub fn real_type(&self) -> Type {
        self.real_type
    }

    // =========================================================================
    // Constant Creation
    // =========================================================================

    pub fn const_int(&mut self, n: i32) -> Value {
        self.builder.ins().iconst(types::I32, n as i64)
    }

    /// Real literal narrowed to the configured precision
    pub fn const_real(&mut self, x: f64) -> Value {
        if self.real_type == types::F32 {
            self.builder.ins().f32const(x as f32)
        } else {
            self.builder.ins().f64const(x)
        }
    }

    /// Materialize a comparison flag as an i32 1 or 0
    pub fn flag_to_int(&mut self, flag: Value) -> Value {
        let one = self.const_int(1);
        let zero = self.const_int(0);
        self.builder.ins().select(flag, one, zero)
    }

    // =========================================================================
    // Addressing
    // =========================================================================

    /// `base + index * size` for a static element index
    pub fn static_addr(&mut self, base: Value, index: u32, size: u32) -> Value {
        self.builder
            .ins()
            .iadd_imm(base, index as i64 * size as i64)
    }

    /// `base + sext(index) * size` for a dynamic i32 element index
    pub fn dynamic_addr(&mut self, base: Value, index: Value, size: u32) -> Value {
        let index = if self.pointer_type == types::I32 {
            index
        } else {
            self.builder.ins().sextend(self.pointer_type, index)
        };
        let scaled = self.builder.ins().imul_imm(index, size as i64);
        self.builder.ins().iadd(base, scaled)
    }

    /// Bounds table slot of input port `port`'s sample count
    pub fn input_len_slot(&self, port: u32) -> usize {
        PORT_LENS + port as usize
    }

    /// Bounds table slot of output port `port`'s sample count
    pub fn output_len_slot(&self, port: u32) -> usize {
        PORT_LENS + self.frame.input_ports + port as usize
    }

    /// Leave the function with `fault` unless `0 <= index < bounds[slot]`
    ///
    /// Execution continues in a fresh block on the in-bounds path.
    pub fn guard_index(&mut self, index: Value, slot: usize, fault: FaultCode, port: u32) {
        let bounds = self.frame.bounds;
        let len = self
            .builder
            .ins()
            .load(types::I64, MemFlags::trusted(), bounds, table_offset(slot));
        // Negative indices wrap to huge unsigned ones
        let wide = self.builder.ins().sextend(types::I64, index);
        let in_bounds = self.builder.ins().icmp(IntCC::UnsignedLessThan, wide, len);

        let ok = self.builder.create_block();
        let fail = self.builder.create_block();
        self.builder.set_cold_block(fail);
        self.builder.ins().brif(in_bounds, ok, &[], fail, &[]);

        self.builder.switch_to_block(fail);
        self.builder
            .ins()
            .store(MemFlags::trusted(), wide, bounds, table_offset(FAULT_INDEX));
        let port = self.builder.ins().iconst(types::I64, port as i64);
        self.builder
            .ins()
            .store(MemFlags::trusted(), port, bounds, table_offset(FAULT_PORT));
        let status = self.builder.ins().iconst(types::I32, fault as i64);
        self.builder.ins().return_(&[status]);

        self.switch_to(ok);
    }

    /// Return from the entry function with a success status
    pub fn return_ok(&mut self) {
        let status = self.builder.ins().iconst(types::I32, 0);
        self.builder.ins().return_(&[status]);
    }

    /// Load the sample buffer pointer of `port` from a port table
    pub fn port_buffer(&mut self, table: Value, port: u32) -> Value {
        let size = self.pointer_type.bytes();
        let slot = self.static_addr(table, port, size);
        self.builder
            .ins()
            .load(self.pointer_type, MemFlags::trusted(), slot, 0)
    }
}

fn table_offset(slot: usize) -> i32 {
    (slot * std::mem::size_of::<i64>()) as i32
}
