//! Bytecode block representation
//!
//! A [`Block`] is an ordered instruction sequence; nested control flow owns
//! its child blocks. Blocks are immutable once built and are shared behind
//! `Arc` so that caches can key on *which* block object they hold rather
//! than on its contents.

use std::fmt::Write as _;
use std::sync::Arc;

use super::opcodes::Instruction;

/// A bytecode block
#[derive(Debug, Clone, Default)]
pub struct Block {
    /// Name of this block (for debugging)
    name: String,

    /// The instructions, in execution order
    instructions: Vec<Instruction>,
}

/// How translation or interpretation of a block ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Ran off the end of the instruction list; the parent continues
    FallThrough,
    /// `Return` inside a pending `If`/`Select`/`Loop`; unwind to that construct
    Resume,
    /// `Return` with nothing pending; the whole computation is finished
    Halt,
}

impl Block {
    /// Create a block from a list of instructions
    pub fn new(name: impl Into<String>, instructions: Vec<Instruction>) -> Self {
        Self {
            name: name.into(),
            instructions,
        }
    }

    /// Create a builder for constructing a block
    pub fn builder(name: impl Into<String>) -> BlockBuilder {
        BlockBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Check if this block branches back to its own head
    ///
    /// Only direct instructions count; a `CondBranch` inside a child block
    /// targets the child's head.
    pub fn has_cond_branch(&self) -> bool {
        self.instructions
            .iter()
            .any(|ins| matches!(ins, Instruction::CondBranch))
    }

    /// Check if this block or any nested block contains control flow
    pub fn contains_control_flow(&self) -> bool {
        self.instructions.iter().any(|ins| {
            matches!(
                ins,
                Instruction::If { .. }
                    | Instruction::SelectReal { .. }
                    | Instruction::SelectInt { .. }
                    | Instruction::CondBranch
                    | Instruction::Loop { .. }
            )
        })
    }

    /// Total instruction count including nested blocks
    pub fn deep_len(&self) -> usize {
        self.instructions
            .iter()
            .map(|ins| match ins.children() {
                Some((a, b)) => 1 + a.deep_len() + b.deep_len(),
                None => 1,
            })
            .sum()
    }

    /// Disassemble this block and all nested blocks
    pub fn disassemble(&self) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "=== {} ===", self.name);
        self.disassemble_into(&mut output, 0);
        output
    }

    fn disassemble_into(&self, output: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        for (index, ins) in self.instructions.iter().enumerate() {
            let _ = writeln!(output, "{}{:04} {}", indent, index, ins);
            if let Some((first, second)) = ins.children() {
                let labels = match ins {
                    Instruction::If { .. } => ("then", "else"),
                    Instruction::Loop { .. } => ("init", "body"),
                    _ => ("first", "second"),
                };
                let _ = writeln!(output, "{}  {}: [{}]", indent, labels.0, first.name);
                first.disassemble_into(output, depth + 2);
                let _ = writeln!(output, "{}  {}: [{}]", indent, labels.1, second.name);
                second.disassemble_into(output, depth + 2);
            }
        }
    }
}

/// Builder for constructing blocks
#[derive(Debug, Default)]
pub struct BlockBuilder {
    name: String,
    instructions: Vec<Instruction>,
}

impl BlockBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instructions: Vec::new(),
        }
    }

    /// Emit an instruction
    pub fn emit(&mut self, ins: Instruction) -> &mut Self {
        self.instructions.push(ins);
        self
    }

    /// Emit a sequence of instructions
    pub fn emit_all(&mut self, ins: impl IntoIterator<Item = Instruction>) -> &mut Self {
        self.instructions.extend(ins);
        self
    }

    pub fn emit_return(&mut self) -> &mut Self {
        self.emit(Instruction::Return)
    }

    pub fn emit_if(&mut self, then_block: Arc<Block>, else_block: Arc<Block>) -> &mut Self {
        self.emit(Instruction::If { then_block, else_block })
    }

    pub fn emit_select_real(&mut self, first: Arc<Block>, second: Arc<Block>) -> &mut Self {
        self.emit(Instruction::SelectReal { first, second })
    }

    pub fn emit_select_int(&mut self, first: Arc<Block>, second: Arc<Block>) -> &mut Self {
        self.emit(Instruction::SelectInt { first, second })
    }

    pub fn emit_loop(&mut self, init: Arc<Block>, body: Arc<Block>) -> &mut Self {
        self.emit(Instruction::Loop { init, body })
    }

    /// Get current instruction count
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Build the block, shared for identity-keyed caching
    pub fn build(self) -> Arc<Block> {
        Arc::new(Block::new(self.name, self.instructions))
    }
}

/// A lowered DSP program as handed over by the front end
///
/// `compute` is the per-sample block; it is the only block compiled under the
/// default policy. `control` runs once per buffer before it and is interpreted.
#[derive(Debug, Clone)]
pub struct Program {
    pub compute: Arc<Block>,
    pub control: Option<Arc<Block>>,
    pub int_heap_size: usize,
    pub real_heap_size: usize,
    pub num_inputs: usize,
    pub num_outputs: usize,
}

impl Program {
    pub fn new(compute: Arc<Block>, int_heap_size: usize, real_heap_size: usize) -> Self {
        Self {
            compute,
            control: None,
            int_heap_size,
            real_heap_size,
            num_inputs: 0,
            num_outputs: 0,
        }
    }

    pub fn with_control(mut self, control: Arc<Block>) -> Self {
        self.control = Some(control);
        self
    }

    pub fn with_ports(mut self, num_inputs: usize, num_outputs: usize) -> Self {
        self.num_inputs = num_inputs;
        self.num_outputs = num_outputs;
        self
    }

    /// Check if `block` is this program's compute block (by identity)
    pub fn is_compute(&self, block: &Arc<Block>) -> bool {
        Arc::ptr_eq(&self.compute, block)
    }
}
