// Backend module for structured DSP bytecode
//
// - `bytecode`: block tree, interpreter, Cranelift JIT and tiered dispatch

pub mod bytecode;

pub use bytecode::{
    Block, BlockBuilder, BytecodeVM, HybridConfig, HybridExecutor, Instruction, Program,
};
