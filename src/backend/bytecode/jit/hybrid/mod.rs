//! Hybrid JIT/Bytecode Executor
//!
//! This module provides execution that switches per block between native
//! code and bytecode interpretation, based on a compile policy and the
//! caller's compile hint.
//!
//! # Execution Strategy
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                 HybridExecutor.execute_block()                      │
//! │                                                                     │
//! │  1. Check BlockCache for compiled native code                       │
//! │     └─ If found → Execute native code                               │
//! │                                                                     │
//! │  2. On a miss, consult the CompilePolicy and the compile hint       │
//! │     └─ If allowed and not failed before → Compile once, cache       │
//! │                                                                     │
//! │  3. Execute:                                                        │
//! │     └─ Native code available → Native execution                     │
//! │     └─ Otherwise → Bytecode VM fallback                             │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use dspjit::backend::bytecode::jit::hybrid::HybridExecutor;
//!
//! let mut executor = HybridExecutor::<f32>::new(program);
//! executor.compute(&[&input[..]], &mut [&mut output[..]])?;
//! ```

mod config;
mod executor;


// Re-export public API
pub use config::{CompilePolicy, ConfigError, HybridConfig, HybridStats};
pub use executor::HybridExecutor;
