//! Heap and I/O handlers for JIT compilation
//!
//! Handles: Load/Store Real/Int at static and dynamic offsets, BlockShift,
//! LoadInput, StoreOutput
//!
//! Static offsets are covered by the frame check before a block runs.
//! Run-time indices are checked in the generated code and leave the block
//! with a fault status.

use cranelift::prelude::*;

use crate::backend::bytecode::heap::HeapKind;
use crate::backend::bytecode::jit::codegen::CodegenContext;
use crate::backend::bytecode::jit::types::{FaultCode, JitResult, INT_HEAP_LEN, REAL_HEAP_LEN};

/// Where a heap access lands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapIndex {
    /// A constant element offset
    Static(u32),
    /// A base offset plus an index popped from the stack
    Dynamic(u32),
}

fn heap_layout(codegen: &CodegenContext<'_, '_>, heap: HeapKind) -> (Value, Type) {
    let frame = codegen.frame();
    match heap {
        HeapKind::Int => (frame.int_heap, types::I32),
        HeapKind::Real => (frame.real_heap, codegen.real_type()),
    }
}

fn element_addr(
    codegen: &mut CodegenContext<'_, '_>,
    heap: HeapKind,
    index: HeapIndex,
) -> JitResult<(Value, Type)> {
    let (base, ty) = heap_layout(codegen, heap);
    let addr = match index {
        HeapIndex::Static(offset) => codegen.static_addr(base, offset, ty.bytes()),
        HeapIndex::Dynamic(offset) => {
            let popped = codegen.pop_int()?;
            // i32 wrap-around before widening
            let slot = codegen.builder.ins().iadd_imm(popped, offset as i32 as i64);
            let (len_slot, fault) = match heap {
                HeapKind::Int => (INT_HEAP_LEN, FaultCode::IntHeap),
                HeapKind::Real => (REAL_HEAP_LEN, FaultCode::RealHeap),
            };
            codegen.guard_index(slot, len_slot, fault, 0);
            codegen.dynamic_addr(base, slot, ty.bytes())
        }
    };
    Ok((addr, ty))
}

pub fn compile_heap_load(
    codegen: &mut CodegenContext<'_, '_>,
    heap: HeapKind,
    index: HeapIndex,
) -> JitResult<()> {
    let (addr, ty) = element_addr(codegen, heap, index)?;
    let val = codegen.builder.ins().load(ty, MemFlags::trusted(), addr, 0);
    codegen.push(val)
}

/// Dynamic stores pop the index before the value
pub fn compile_heap_store(
    codegen: &mut CodegenContext<'_, '_>,
    heap: HeapKind,
    index: HeapIndex,
) -> JitResult<()> {
    let (addr, ty) = element_addr(codegen, heap, index)?;
    let val = codegen.pop_typed(ty)?;
    codegen.builder.ins().store(MemFlags::trusted(), val, addr, 0);
    Ok(())
}

/// `heap[i] = heap[i - 1]` for `i` from `from` down to `to + 1`, unrolled
pub fn compile_block_shift(
    codegen: &mut CodegenContext<'_, '_>,
    heap: HeapKind,
    from: u32,
    to: u32,
) -> JitResult<()> {
    let (base, ty) = heap_layout(codegen, heap);
    let size = ty.bytes();
    for i in (to.saturating_add(1)..=from).rev() {
        let src = codegen.static_addr(base, i - 1, size);
        let val = codegen.builder.ins().load(ty, MemFlags::trusted(), src, 0);
        let dst = codegen.static_addr(base, i, size);
        codegen.builder.ins().store(MemFlags::trusted(), val, dst, 0);
    }
    Ok(())
}

/// Pop a sample index and push `inputs[port][index]`
pub fn compile_load_input(codegen: &mut CodegenContext<'_, '_>, port: u32) -> JitResult<()> {
    let index = codegen.pop_int()?;
    let len_slot = codegen.input_len_slot(port);
    codegen.guard_index(index, len_slot, FaultCode::Input, port);
    let table = codegen.frame().inputs;
    let buffer = codegen.port_buffer(table, port);
    let ty = codegen.real_type();
    let addr = codegen.dynamic_addr(buffer, index, ty.bytes());
    let val = codegen.builder.ins().load(ty, MemFlags::trusted(), addr, 0);
    codegen.push(val)
}

/// Pop a sample index, then a value, and store `outputs[port][index] = value`
pub fn compile_store_output(codegen: &mut CodegenContext<'_, '_>, port: u32) -> JitResult<()> {
    let index = codegen.pop_int()?;
    let val = codegen.pop_real()?;
    let len_slot = codegen.output_len_slot(port);
    codegen.guard_index(index, len_slot, FaultCode::Output, port);
    let table = codegen.frame().outputs;
    let buffer = codegen.port_buffer(table, port);
    let addr = codegen.dynamic_addr(buffer, index, codegen.real_type().bytes());
    codegen.builder.ins().store(MemFlags::trusted(), val, addr, 0);
    Ok(())
}
