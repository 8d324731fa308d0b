//! Integer and real heaps
//!
//! A DSP instance keeps all of its state in two flat arrays addressed by
//! element offset. Compiled code indexes them without bounds checks; the
//! accessors here are what the interpreter uses and they do check.

use std::fmt;

use super::real::Real;
use super::vm::{VmError, VmResult};

/// Which heap an access targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapKind {
    Int,
    Real,
}

impl fmt::Display for HeapKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeapKind::Int => write!(f, "int"),
            HeapKind::Real => write!(f, "real"),
        }
    }
}

/// The two heaps of one DSP instance
#[derive(Debug, Clone, PartialEq)]
pub struct Heaps<R> {
    pub int: Vec<i32>,
    pub real: Vec<R>,
}

impl<R: Real> Heaps<R> {
    /// Create zero-initialized heaps
    pub fn new(int_size: usize, real_size: usize) -> Self {
        Self {
            int: vec![0; int_size],
            real: vec![R::default(); real_size],
        }
    }

    /// Reset every slot to zero
    pub fn clear(&mut self) {
        self.int.iter_mut().for_each(|v| *v = 0);
        self.real.iter_mut().for_each(|v| *v = R::default());
    }

    #[inline]
    pub fn load_int(&self, index: i64) -> VmResult<i32> {
        slot(&self.int, HeapKind::Int, index).map(|i| self.int[i])
    }

    #[inline]
    pub fn store_int(&mut self, index: i64, value: i32) -> VmResult<()> {
        let i = slot(&self.int, HeapKind::Int, index)?;
        self.int[i] = value;
        Ok(())
    }

    #[inline]
    pub fn load_real(&self, index: i64) -> VmResult<R> {
        slot(&self.real, HeapKind::Real, index).map(|i| self.real[i])
    }

    #[inline]
    pub fn store_real(&mut self, index: i64, value: R) -> VmResult<()> {
        let i = slot(&self.real, HeapKind::Real, index)?;
        self.real[i] = value;
        Ok(())
    }

    /// Move `[to, from)` up one slot into `(to, from]`, highest slot first
    pub fn shift(&mut self, heap: HeapKind, from: u32, to: u32) -> VmResult<()> {
        match heap {
            HeapKind::Int => shift_slots(&mut self.int, heap, from, to),
            HeapKind::Real => shift_slots(&mut self.real, heap, from, to),
        }
    }
}

fn slot<T>(heap: &[T], kind: HeapKind, index: i64) -> VmResult<usize> {
    usize::try_from(index)
        .ok()
        .filter(|&i| i < heap.len())
        .ok_or(VmError::HeapOutOfBounds {
            heap: kind,
            index,
            len: heap.len(),
        })
}

fn shift_slots<T: Copy>(heap: &mut [T], kind: HeapKind, from: u32, to: u32) -> VmResult<()> {
    if from <= to {
        return Ok(());
    }
    let from = slot(heap, kind, from as i64)?;
    let to = to as usize;
    // Element by element, descending, so overlapping reads see old values
    for i in (to + 1..=from).rev() {
        heap[i] = heap[i - 1];
    }
    Ok(())
}
