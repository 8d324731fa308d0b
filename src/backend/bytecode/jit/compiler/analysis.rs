//! Bytecode analysis for JIT compilation
//!
//! Compiled code indexes heaps and port tables at static offsets without
//! bounds checks. Before a compiled block runs, the frame it is handed is
//! checked against the static extent recorded here. Run-time indices are
//! checked by the generated code itself.

use crate::backend::bytecode::block::Block;
use crate::backend::bytecode::heap::Heaps;
use crate::backend::bytecode::jit::types::{JitError, JitResult};
use crate::backend::bytecode::opcodes::Instruction;

/// Minimum frame a compiled block needs, gathered from static operands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameLayout {
    /// One past the highest static int heap slot touched
    pub int_heap_len: usize,
    /// One past the highest static real heap slot touched
    pub real_heap_len: usize,
    /// One past the highest input port read
    pub inputs: usize,
    /// One past the highest output port written
    pub outputs: usize,
    /// Whether any access uses a run-time index
    pub indexed_access: bool,
}

impl FrameLayout {
    /// Scan `block` and all of its children
    pub fn of(block: &Block) -> Self {
        let mut layout = FrameLayout::default();
        layout.scan(block);
        layout
    }

    fn scan(&mut self, block: &Block) {
        for ins in block.instructions() {
            self.visit(ins);
            if let Some((first, second)) = ins.children() {
                self.scan(first);
                self.scan(second);
            }
        }
    }

    fn visit(&mut self, ins: &Instruction) {
        use Instruction::*;
        match *ins {
            LoadInt(o) | StoreInt(o) => bump(&mut self.int_heap_len, o),
            LoadReal(o) | StoreReal(o) => bump(&mut self.real_heap_len, o),
            BlockShiftInt { from, to } if from > to => bump(&mut self.int_heap_len, from),
            BlockShiftReal { from, to } if from > to => bump(&mut self.real_heap_len, from),
            LoadIndexedInt(_) | StoreIndexedInt(_) | LoadIndexedReal(_) | StoreIndexedReal(_) => {
                self.indexed_access = true
            }
            LoadInput(p) => {
                bump(&mut self.inputs, p);
                self.indexed_access = true;
            }
            StoreOutput(p) => {
                bump(&mut self.outputs, p);
                self.indexed_access = true;
            }
            _ => {}
        }
    }

    /// Check that a frame covers every static access
    ///
    /// Run-time indices (indexed heap access, sample indices) are not
    /// covered here.
    pub fn check<R>(&self, heaps: &Heaps<R>, inputs: usize, outputs: usize) -> JitResult<()> {
        let checks = [
            ("int heap", self.int_heap_len, heaps.int.len()),
            ("real heap", self.real_heap_len, heaps.real.len()),
            ("input ports", self.inputs, inputs),
            ("output ports", self.outputs, outputs),
        ];
        for (what, needed, available) in checks {
            if available < needed {
                return Err(JitError::FrameMismatch(format!(
                    "{} has {} entries, block needs {}",
                    what, available, needed
                )));
            }
        }
        Ok(())
    }
}

fn bump(extent: &mut usize, index: u32) {
    *extent = (*extent).max(index as usize + 1);
}
