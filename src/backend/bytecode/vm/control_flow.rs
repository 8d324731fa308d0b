//! Structured control flow for the bytecode VM.
//!
//! `Return` unwinds to the innermost pending `If`/`Select`/`Loop`; with none
//! pending it halts the whole computation. `CondBranch` restarts the block it is a
//! direct member of.

use std::sync::Arc;

use super::types::{VmError, VmResult};
use super::{BytecodeVM, Frame};
use crate::backend::bytecode::block::{Block, Flow};
use crate::backend::bytecode::real::Real;

impl<R: Real> BytecodeVM<R> {
    pub(super) fn op_return(&self) -> Flow {
        if self.nested_depth > 0 {
            Flow::Resume
        } else {
            Flow::Halt
        }
    }

    /// Returns `Some(flow)` when the enclosing block must stop
    pub(super) fn op_if(
        &mut self,
        then_block: &Arc<Block>,
        else_block: &Arc<Block>,
        frame: &mut Frame<'_, '_, R>,
    ) -> VmResult<Option<Flow>> {
        let cond = self.pop_int()?;
        let branch = if cond == 1 { then_block } else { else_block };

        self.nested_depth += 1;
        let flow = self.run_block(branch, frame);
        self.nested_depth -= 1;

        match flow? {
            Flow::Halt => Ok(Some(Flow::Halt)),
            Flow::FallThrough | Flow::Resume => Ok(None),
        }
    }

    /// Both arms always run; the result is the second arm's value when the
    /// condition is non-zero and the first arm's value otherwise
    pub(super) fn op_select(
        &mut self,
        first: &Arc<Block>,
        second: &Arc<Block>,
        kind: &'static str,
        frame: &mut Frame<'_, '_, R>,
    ) -> VmResult<Option<Flow>> {
        let cond = self.pop_int()?;

        self.nested_depth += 1;
        let flows = self.run_arms(first, second, frame);
        self.nested_depth -= 1;

        if let (Flow::Halt, _) | (_, Flow::Halt) = flows? {
            return Ok(Some(Flow::Halt));
        }

        let b = self.pop()?;
        let a = self.pop()?;
        for v in [&a, &b] {
            if v.type_name() != kind {
                return Err(VmError::TypeError {
                    expected: kind,
                    got: v.type_name(),
                });
            }
        }
        self.push(if cond != 0 { b } else { a })?;
        Ok(None)
    }

    fn run_arms(
        &mut self,
        first: &Block,
        second: &Block,
        frame: &mut Frame<'_, '_, R>,
    ) -> VmResult<(Flow, Flow)> {
        let a = self.run_block(first, frame)?;
        let b = self.run_block(second, frame)?;
        Ok((a, b))
    }

    /// Run `init` once, then `body`; repetition comes from a `CondBranch`
    /// inside `body`. A `Return` ends only the child it appears in.
    pub(super) fn op_loop(
        &mut self,
        init: &Arc<Block>,
        body: &Arc<Block>,
        frame: &mut Frame<'_, '_, R>,
    ) -> VmResult<Option<Flow>> {
        self.nested_depth += 1;
        let flows = self.run_arms(init, body, frame);
        self.nested_depth -= 1;

        match flows? {
            (Flow::Halt, _) | (_, Flow::Halt) => Ok(Some(Flow::Halt)),
            _ => Ok(None),
        }
    }

    /// Pop the condition; `true` means jump back to the head of the block
    pub(super) fn op_cond_branch(&mut self, head_depth: usize) -> VmResult<bool> {
        let cond = self.pop_int()?;
        if cond & 1 == 0 {
            return Ok(false);
        }
        if self.value_stack.len() != head_depth {
            return Err(VmError::StackMismatch {
                expected: head_depth,
                got: self.value_stack.len(),
            });
        }
        Ok(true)
    }
}
