//! Bytecode Virtual Machine
//!
//! The VM interprets a bytecode block tree directly. It is the fallback tier
//! of the hybrid executor: any block that is not compiled runs here, and the
//! compiled code for a block must be observably equivalent to running it here.
//!
//! This module is organized into submodules by functionality:
//! - `types`: Core type definitions (VmError, VmConfig, Value)
//! - `stack`: Operand stack manipulation
//! - `arithmetic`: Arithmetic, bitwise, conversion and math operations
//! - `comparison`: Comparisons and min/max
//! - `memory`: Heap and I/O access
//! - `control_flow`: If, select, loop and conditional branch

use tracing::trace;

use super::block::{Block, Flow};
use super::heap::{HeapKind, Heaps};
use super::opcodes::Instruction;
use super::real::Real;

mod arithmetic;
mod comparison;
mod control_flow;
mod memory;
mod stack;
mod types;


// === Re-exports ===

pub use types::{Value, VmConfig, VmError, VmResult};

/// Heap and I/O state threaded through one execution
pub(super) struct Frame<'a, 'o, R> {
    pub(super) heaps: &'a mut Heaps<R>,
    pub(super) inputs: &'a [&'a [R]],
    pub(super) outputs: &'a mut [&'o mut [R]],
}

/// What the dispatch loop does after an instruction
enum Step {
    Next,
    Restart,
    Exit(Flow),
}

// === BytecodeVM Struct ===

/// The Bytecode Virtual Machine
#[derive(Debug)]
pub struct BytecodeVM<R: Real> {
    /// Value stack for operands and results
    pub(super) value_stack: Vec<Value<R>>,

    /// Number of `If`/`Select` constructs currently being executed
    pub(super) nested_depth: usize,

    /// VM configuration
    pub(super) config: VmConfig,
}

impl<R: Real> Default for BytecodeVM<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Real> BytecodeVM<R> {
    // === Constructors ===

    /// Create a new VM
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    /// Create a new VM with custom configuration
    pub fn with_config(config: VmConfig) -> Self {
        Self {
            value_stack: Vec::with_capacity(64),
            nested_depth: 0,
            config,
        }
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    /// Values left on the operand stack by the last execution
    pub fn stack(&self) -> &[Value<R>] {
        &self.value_stack
    }

    // === Execution ===

    /// Execute a block against the given heaps and I/O buffers
    ///
    /// The operand stack is cleared first; whatever the block leaves on it
    /// stays available through [`stack`](Self::stack).
    pub fn execute(
        &mut self,
        block: &Block,
        heaps: &mut Heaps<R>,
        inputs: &[&[R]],
        outputs: &mut [&mut [R]],
    ) -> VmResult<()> {
        self.value_stack.clear();
        self.nested_depth = 0;

        let mut frame = Frame { heaps, inputs, outputs };
        let flow = self.run_block(block, &mut frame)?;

        if self.config.trace {
            trace!(target: "dspjit::vm", block = block.name(), ?flow, depth = self.value_stack.len(), "Block finished");
        }
        Ok(())
    }

    /// Run one block until it falls off the end or returns
    pub(super) fn run_block(&mut self, block: &Block, frame: &mut Frame<'_, '_, R>) -> VmResult<Flow> {
        let instructions = block.instructions();
        let entry_depth = self.value_stack.len();
        let mut pc = 0;

        while let Some(ins) = instructions.get(pc) {
            if self.config.trace {
                trace!(target: "dspjit::vm", block = block.name(), pc, %ins, depth = self.value_stack.len(), "Step");
            }

            match self.step(ins, entry_depth, frame)? {
                Step::Next => pc += 1,
                Step::Restart => pc = 0,
                Step::Exit(flow) => return Ok(flow),
            }
        }

        Ok(Flow::FallThrough)
    }

    fn step(&mut self, ins: &Instruction, entry_depth: usize, frame: &mut Frame<'_, '_, R>) -> VmResult<Step> {
        use Instruction::*;

        match ins {
            // Literals
            RealValue(v) => self.push(Value::Real(R::from_f64(*v)))?,
            Int32Value(v) => self.push(Value::Int(*v))?,

            // Heap
            LoadReal(offset) => self.op_load_real(frame, *offset as i64)?,
            LoadInt(offset) => self.op_load_int(frame, *offset as i64)?,
            StoreReal(offset) => self.op_store_real(frame, *offset as i64)?,
            StoreInt(offset) => self.op_store_int(frame, *offset as i64)?,
            LoadIndexedReal(offset) => {
                let index = self.indexed(*offset)?;
                self.op_load_real(frame, index)?
            }
            LoadIndexedInt(offset) => {
                let index = self.indexed(*offset)?;
                self.op_load_int(frame, index)?
            }
            StoreIndexedReal(offset) => {
                let index = self.indexed(*offset)?;
                self.op_store_real(frame, index)?
            }
            StoreIndexedInt(offset) => {
                let index = self.indexed(*offset)?;
                self.op_store_int(frame, index)?
            }
            BlockShiftReal { from, to } => frame.heaps.shift(HeapKind::Real, *from, *to)?,
            BlockShiftInt { from, to } => frame.heaps.shift(HeapKind::Int, *from, *to)?,

            // I/O
            LoadInput(port) => self.op_load_input(frame, *port)?,
            StoreOutput(port) => self.op_store_output(frame, *port)?,

            // Conversions
            CastReal => self.op_cast_real()?,
            CastInt => self.op_cast_int()?,
            BitcastInt => self.op_bitcast_int()?,
            BitcastReal => self.op_bitcast_real()?,

            // Arithmetic
            AddReal => self.binary_real(|a, b| a + b)?,
            AddInt => self.binary_int(|a, b| Ok(a.wrapping_add(b)))?,
            SubReal => self.binary_real(|a, b| a - b)?,
            SubInt => self.binary_int(|a, b| Ok(a.wrapping_sub(b)))?,
            MulReal => self.binary_real(|a, b| a * b)?,
            MulInt => self.binary_int(|a, b| Ok(a.wrapping_mul(b)))?,
            DivReal => self.binary_real(|a, b| a / b)?,
            DivInt => self.op_div_int()?,
            RemReal => self.op_binary_math(super::opcodes::BinaryMath::Remainder)?,
            RemInt => self.op_rem_int()?,
            LshInt => self.binary_int(|a, b| Ok(a.wrapping_shl(b as u32)))?,
            RshInt => self.binary_int(|a, b| Ok((a as u32).wrapping_shr(b as u32) as i32))?,

            // Comparisons
            GtReal => self.compare_real(|a, b| a > b)?,
            GtInt => self.compare_int(|a, b| a > b)?,
            LtReal => self.compare_real(|a, b| a < b)?,
            LtInt => self.compare_int(|a, b| a < b)?,
            GeReal => self.compare_real(|a, b| a >= b)?,
            GeInt => self.compare_int(|a, b| a >= b)?,
            LeReal => self.compare_real(|a, b| a <= b)?,
            LeInt => self.compare_int(|a, b| a <= b)?,
            EqReal => self.compare_real(|a, b| a == b)?,
            EqInt => self.compare_int(|a, b| a == b)?,
            NeReal => self.compare_real(|a, b| a < b || a > b)?,
            NeInt => self.compare_int(|a, b| a != b)?,

            // Bitwise
            AndInt => self.binary_int(|a, b| Ok(a & b))?,
            OrInt => self.binary_int(|a, b| Ok(a | b))?,
            XorInt => self.binary_int(|a, b| Ok(a ^ b))?,

            // Extended math
            Abs => self.op_abs()?,
            Unary(op) => self.op_unary_math(*op)?,
            Binary(op) => self.op_binary_math(*op)?,

            // Min/max
            MinInt => self.op_min_int()?,
            MaxInt => self.op_max_int()?,
            MinReal => self.op_min_real()?,
            MaxReal => self.op_max_real()?,

            // Control
            Return => return Ok(Step::Exit(self.op_return())),
            If { then_block, else_block } => {
                if let Some(flow) = self.op_if(then_block, else_block, frame)? {
                    return Ok(Step::Exit(flow));
                }
            }
            SelectReal { first, second } => {
                if let Some(flow) = self.op_select(first, second, "real", frame)? {
                    return Ok(Step::Exit(flow));
                }
            }
            SelectInt { first, second } => {
                if let Some(flow) = self.op_select(first, second, "int", frame)? {
                    return Ok(Step::Exit(flow));
                }
            }
            CondBranch => {
                if self.op_cond_branch(entry_depth)? {
                    return Ok(Step::Restart);
                }
            }
            Loop { init, body } => {
                if let Some(flow) = self.op_loop(init, body, frame)? {
                    return Ok(Step::Exit(flow));
                }
            }
        }

        Ok(Step::Next)
    }
}
