//! Arithmetic, conversion and math operations for the bytecode VM.
//!
//! Binary operators pop the left operand first. Integer arithmetic wraps;
//! division and remainder by zero are reported instead of trapping.

use super::types::{Value, VmError, VmResult};
use super::BytecodeVM;
use crate::backend::bytecode::jit::runtime;
use crate::backend::bytecode::opcodes::{BinaryMath, UnaryMath};
use crate::backend::bytecode::real::Real;

impl<R: Real> BytecodeVM<R> {
    #[inline]
    pub(super) fn binary_int(&mut self, op: impl FnOnce(i32, i32) -> VmResult<i32>) -> VmResult<()> {
        let lhs = self.pop_int()?;
        let rhs = self.pop_int()?;
        self.push(Value::Int(op(lhs, rhs)?))
    }

    #[inline]
    pub(super) fn binary_real(&mut self, op: impl FnOnce(R, R) -> R) -> VmResult<()> {
        let lhs = self.pop_real()?;
        let rhs = self.pop_real()?;
        self.push(Value::Real(op(lhs, rhs)))
    }

    pub(super) fn op_div_int(&mut self) -> VmResult<()> {
        self.binary_int(|a, b| {
            if b == 0 {
                return Err(VmError::DivisionByZero);
            }
            Ok(a.wrapping_div(b))
        })
    }

    pub(super) fn op_rem_int(&mut self) -> VmResult<()> {
        self.binary_int(|a, b| {
            if b == 0 {
                return Err(VmError::DivisionByZero);
            }
            Ok(a.wrapping_rem(b))
        })
    }

    // === Conversions ===

    pub(super) fn op_cast_real(&mut self) -> VmResult<()> {
        let v = self.pop_int()?;
        self.push(Value::Real(R::from_i32(v)))
    }

    pub(super) fn op_cast_int(&mut self) -> VmResult<()> {
        let v = self.pop_real()?;
        self.push(Value::Int(v.to_i32()))
    }

    pub(super) fn op_bitcast_int(&mut self) -> VmResult<()> {
        let v = self.pop_real()?;
        self.push(Value::Int(v.to_int_bits()))
    }

    pub(super) fn op_bitcast_real(&mut self) -> VmResult<()> {
        let v = self.pop_int()?;
        self.push(Value::Real(R::from_int_bits(v)))
    }

    // === Extended math ===

    pub(super) fn op_abs(&mut self) -> VmResult<()> {
        let v = self.pop_int()?;
        self.push(Value::Int(runtime::abs(v)))
    }

    pub(super) fn op_unary_math(&mut self, op: UnaryMath) -> VmResult<()> {
        let x = self.pop_real()?;
        self.push(Value::Real(R::unary_fn(op)(x)))
    }

    pub(super) fn op_binary_math(&mut self, op: BinaryMath) -> VmResult<()> {
        let a = self.pop_real()?;
        let b = self.pop_real()?;
        self.push(Value::Real(R::binary_fn(op)(a, b)))
    }
}
