//! Comparison and min/max operations for the bytecode VM.

use super::types::{Value, VmResult};
use super::BytecodeVM;
use crate::backend::bytecode::real::Real;

impl<R: Real> BytecodeVM<R> {
    /// Compare `lhs` (top of stack) with `rhs` and push 1 or 0
    #[inline]
    pub(super) fn compare_int(&mut self, op: impl FnOnce(i32, i32) -> bool) -> VmResult<()> {
        let lhs = self.pop_int()?;
        let rhs = self.pop_int()?;
        self.push(Value::Int(op(lhs, rhs) as i32))
    }

    /// Real comparisons are ordered: any NaN operand yields 0
    #[inline]
    pub(super) fn compare_real(&mut self, op: impl FnOnce(R, R) -> bool) -> VmResult<()> {
        let lhs = self.pop_real()?;
        let rhs = self.pop_real()?;
        self.push(Value::Int(op(lhs, rhs) as i32))
    }

    pub(super) fn op_min_int(&mut self) -> VmResult<()> {
        let lhs = self.pop_int()?;
        let rhs = self.pop_int()?;
        self.push(Value::Int(if lhs < rhs { lhs } else { rhs }))
    }

    pub(super) fn op_max_int(&mut self) -> VmResult<()> {
        let lhs = self.pop_int()?;
        let rhs = self.pop_int()?;
        self.push(Value::Int(if lhs < rhs { rhs } else { lhs }))
    }

    // With a NaN operand `lhs < rhs` is false, so the other arm is taken.

    pub(super) fn op_min_real(&mut self) -> VmResult<()> {
        let lhs = self.pop_real()?;
        let rhs = self.pop_real()?;
        self.push(Value::Real(if lhs < rhs { lhs } else { rhs }))
    }

    pub(super) fn op_max_real(&mut self) -> VmResult<()> {
        let lhs = self.pop_real()?;
        let rhs = self.pop_real()?;
        self.push(Value::Real(if lhs < rhs { rhs } else { lhs }))
    }
}
