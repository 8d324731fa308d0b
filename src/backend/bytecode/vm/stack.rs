//! Operand stack manipulation for the bytecode VM.

use super::types::{Value, VmError, VmResult};
use super::BytecodeVM;
use crate::backend::bytecode::real::Real;

impl<R: Real> BytecodeVM<R> {
    #[inline]
    pub(super) fn push(&mut self, value: Value<R>) -> VmResult<()> {
        if self.value_stack.len() >= self.config.max_stack_depth {
            return Err(VmError::ValueStackOverflow {
                limit: self.config.max_stack_depth,
            });
        }
        self.value_stack.push(value);
        Ok(())
    }

    #[inline]
    pub(super) fn pop(&mut self) -> VmResult<Value<R>> {
        self.value_stack.pop().ok_or(VmError::StackUnderflow)
    }

    #[inline]
    pub(super) fn pop_int(&mut self) -> VmResult<i32> {
        match self.pop()? {
            Value::Int(v) => Ok(v),
            other => Err(VmError::TypeError {
                expected: "int",
                got: other.type_name(),
            }),
        }
    }

    #[inline]
    pub(super) fn pop_real(&mut self) -> VmResult<R> {
        match self.pop()? {
            Value::Real(v) => Ok(v),
            other => Err(VmError::TypeError {
                expected: "real",
                got: other.type_name(),
            }),
        }
    }

    /// Pop an index and add it to a static offset (wrapping, as i32)
    #[inline]
    pub(super) fn indexed(&mut self, offset: u32) -> VmResult<i64> {
        let index = self.pop_int()?;
        Ok((offset as i32).wrapping_add(index) as i64)
    }
}
