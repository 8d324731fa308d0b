//! Heap and I/O access for the bytecode VM.

use super::types::{Value, VmError, VmResult};
use super::{BytecodeVM, Frame};
use crate::backend::bytecode::real::Real;

impl<R: Real> BytecodeVM<R> {
    pub(super) fn op_load_int(&mut self, frame: &mut Frame<'_, '_, R>, index: i64) -> VmResult<()> {
        let v = frame.heaps.load_int(index)?;
        self.push(Value::Int(v))
    }

    pub(super) fn op_load_real(&mut self, frame: &mut Frame<'_, '_, R>, index: i64) -> VmResult<()> {
        let v = frame.heaps.load_real(index)?;
        self.push(Value::Real(v))
    }

    pub(super) fn op_store_int(&mut self, frame: &mut Frame<'_, '_, R>, index: i64) -> VmResult<()> {
        let v = self.pop_int()?;
        frame.heaps.store_int(index, v)
    }

    pub(super) fn op_store_real(&mut self, frame: &mut Frame<'_, '_, R>, index: i64) -> VmResult<()> {
        let v = self.pop_real()?;
        frame.heaps.store_real(index, v)
    }

    /// Pop a sample index and push `inputs[port][index]`
    pub(super) fn op_load_input(&mut self, frame: &mut Frame<'_, '_, R>, port: u32) -> VmResult<()> {
        let index = self.pop_int()?;
        let buffer = frame
            .inputs
            .get(port as usize)
            .ok_or(VmError::PortOutOfBounds {
                port,
                available: frame.inputs.len(),
            })?;
        let sample = sample_slot(port, index, buffer.len()).map(|i| buffer[i])?;
        self.push(Value::Real(sample))
    }

    /// Pop a sample index, then a value, and write `outputs[port][index]`
    pub(super) fn op_store_output(&mut self, frame: &mut Frame<'_, '_, R>, port: u32) -> VmResult<()> {
        let index = self.pop_int()?;
        let value = self.pop_real()?;
        let available = frame.outputs.len();
        let buffer = frame
            .outputs
            .get_mut(port as usize)
            .ok_or(VmError::PortOutOfBounds { port, available })?;
        let i = sample_slot(port, index, buffer.len())?;
        buffer[i] = value;
        Ok(())
    }
}

fn sample_slot(port: u32, index: i32, len: usize) -> VmResult<usize> {
    usize::try_from(index)
        .ok()
        .filter(|&i| i < len)
        .ok_or(VmError::SampleOutOfBounds {
            port,
            index: index as i64,
            len,
        })
}
