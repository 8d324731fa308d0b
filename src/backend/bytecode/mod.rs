//! Bytecode Module
//!
//! This module holds the structured DSP bytecode, its interpreter and the
//! Cranelift JIT that compiles it.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                    DSP front end (external)                       │
//! │              Signal graph → Program (block tree)                  │
//! └───────────────────────────────────────────────────────────────────┘
//!                                 │
//!                                 ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                    HybridExecutor                                 │
//! │                                                                   │
//! │  ┌──────────────────────┐        ┌──────────────────────────┐     │
//! │  │ BlockCache           │  miss  │ BlockCompiler            │     │
//! │  │ Arc<Block> → native  │ ─────► │ Block → Cranelift → code │     │
//! │  └──────────────────────┘        └──────────────────────────┘     │
//! │             │ hit                                                 │
//! │             ▼                                                     │
//! │  ┌──────────────────────┐        ┌──────────────────────────┐     │
//! │  │ CompiledBlock        │        │ BytecodeVM (fallback)    │     │
//! │  └──────────────────────┘        └──────────────────────────┘     │
//! │                      Heaps + I/O buffers                          │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`opcodes`]: The closed instruction set
//! - [`block`]: Blocks, the block builder and programs
//! - [`heap`]: The integer and real heaps
//! - [`real`]: Sample precision (`f32` or `f64`)
//! - [`vm`]: Virtual machine execution engine
//! - [`jit`]: Native code generation and tiered dispatch
//!
//! # Example
//!
//! ```ignore
//! use dspjit::backend::bytecode::{BlockBuilder, BytecodeVM, Heaps, Instruction};
//!
//! // out[0] = 40 + 2
//! let mut builder = BlockBuilder::new("example");
//! builder.emit_all([
//!     Instruction::RealValue(40.0),
//!     Instruction::RealValue(2.0),
//!     Instruction::AddReal,
//!     Instruction::Int32Value(0),
//!     Instruction::StoreOutput(0),
//! ]);
//! let block = builder.build();
//!
//! let mut out = [0.0f32; 1];
//! let mut vm = BytecodeVM::<f32>::new();
//! vm.execute(&block, &mut Heaps::new(0, 0), &[], &mut [&mut out[..]])?;
//! assert_eq!(out[0], 42.0);
//! ```

pub mod block;
pub mod heap;
pub mod jit;
pub mod opcodes;
pub mod real;
pub mod vm;

// Re-export main types
pub use block::{Block, BlockBuilder, Flow, Program};
pub use heap::{HeapKind, Heaps};
pub use opcodes::{BinaryMath, Instruction, UnaryMath};
pub use real::Real;
pub use vm::{BytecodeVM, Value, VmConfig, VmError, VmResult};

pub use jit::{
    // Hybrid executor
    CompilePolicy, HybridConfig, HybridExecutor, HybridStats,
    // Block cache
    BlockCache, BlockId, CompileState, Tier,
    // Compiler and engine
    BlockCompiler, CompileOptions, CompiledBlock, OptLevel,
    // JIT types
    BoundsTarget, JitError, JitResult,
};
